use serde::{Deserialize, Serialize};

use crate::run::PipelineRun;

/// The final pipeline report written to `report.json`.
///
/// One envelope per orchestration run; every (module, stage) pair appears
/// exactly once in `run.results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub schema: String,
    pub tool: ReportToolInfo,
    pub run: ReportRunInfo,
    pub verdict: ReportVerdict,

    #[serde(default)]
    pub results: PipelineRun,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportToolInfo {
    pub name: String,
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRunInfo {
    /// Unique id for this orchestration run.
    pub run_id: String,

    pub started_at: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportVerdict {
    pub status: ReportStatus,
    pub counts: ReportCounts,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportCounts {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::{RunResult, stage};
    use pretty_assertions::assert_eq;

    #[test]
    fn report_round_trips_through_json() {
        let mut results = PipelineRun::default();
        results.push(RunResult::succeeded("simple", stage::GENERATE));

        let report = PipelineReport {
            schema: crate::schema::GENFLEET_REPORT_V1.to_string(),
            tool: ReportToolInfo {
                name: "genfleet".into(),
                version: "0.0.0-test".into(),
                commit: None,
            },
            run: ReportRunInfo {
                run_id: "test-run".into(),
                started_at: "2026-01-01T00:00:00Z".into(),
                ended_at: None,
                duration_ms: None,
            },
            verdict: ReportVerdict {
                status: ReportStatus::Pass,
                counts: ReportCounts {
                    succeeded: 1,
                    failed: 0,
                    skipped: 0,
                },
                reasons: vec![],
            },
            results,
            data: None,
        };

        let json = serde_json::to_string_pretty(&report).expect("serialize");
        let back: PipelineReport = serde_json::from_str(&json).expect("parse");
        assert_eq!(back.schema, crate::schema::GENFLEET_REPORT_V1);
        assert_eq!(back.verdict.status, ReportStatus::Pass);
        assert_eq!(back.results.results.len(), 1);
    }
}
