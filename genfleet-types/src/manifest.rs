use serde::{Deserialize, Serialize};

/// The consolidated description of all generation targets, fed to the
/// external code generator.
///
/// Entries are serialized as an ordered array so that identical registries
/// always produce byte-identical manifests, independent of any map
/// iteration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema identifier, e.g. "genfleet.manifest.v1".
    pub schema: String,

    /// Generator plugin every entry is generated with.
    pub plugin: String,

    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            schema: crate::schema::GENFLEET_MANIFEST_V1.to_string(),
            plugin: plugin.into(),
            entries: vec![],
        }
    }

    pub fn entry(&self, module: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.module == module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.module.as_str())
    }
}

/// One target's generation settings inside the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub module: String,

    pub entry: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,

    pub plugin: String,

    /// Merged generation configuration (base config plus the target's
    /// override fragment).
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub config: serde_json::Value,

    /// Targets flagged out of workspace assembly are still generated.
    #[serde(default)]
    pub exclude_from_workspace: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_lookup_by_module() {
        let mut m = Manifest::new("rust-server-codegen");
        m.entries.push(ManifestEntry {
            module: "simple".into(),
            entry: "com.x#Simple".into(),
            imports: vec![],
            plugin: "rust-server-codegen".into(),
            config: serde_json::Value::Null,
            exclude_from_workspace: false,
        });

        assert!(m.entry("simple").is_some());
        assert!(m.entry("missing").is_none());
        assert_eq!(m.modules().collect::<Vec<_>>(), vec!["simple"]);
    }
}
