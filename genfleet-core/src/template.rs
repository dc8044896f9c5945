//! Placeholder substitution for command and generator argv templates.

/// Replace `{name}` placeholders in one argument.
pub(crate) fn render(arg: &str, vars: &[(&str, &str)]) -> String {
    let mut out = arg.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// Render a whole argv template.
pub(crate) fn render_args(args: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    args.iter().map(|a| render(a, vars)).collect()
}
