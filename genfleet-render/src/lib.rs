//! Rendering helpers (markdown) for human-readable artifacts.

use genfleet_types::report::{PipelineReport, ReportStatus};
use genfleet_types::run::UnitStatus;

pub fn render_report_md(report: &PipelineReport) -> String {
    let mut out = String::new();
    out.push_str("# genfleet report\n\n");
    out.push_str(&format!("- Run: `{}`\n", report.run.run_id));
    out.push_str(&format!("- Started: {}\n", report.run.started_at));
    out.push_str(&format!("- Verdict: `{}`\n", status_label(report.verdict.status)));
    out.push_str(&format!(
        "- Units: {} succeeded, {} failed, {} skipped\n\n",
        report.verdict.counts.succeeded, report.verdict.counts.failed, report.verdict.counts.skipped
    ));

    if !report.results.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for warning in &report.results.warnings {
            out.push_str(&format!("- {}\n", warning));
        }
        out.push('\n');
    }

    out.push_str("## Units\n\n");
    if report.results.results.is_empty() {
        out.push_str("_No units ran._\n");
        return out;
    }

    for result in &report.results.results {
        out.push_str(&format!(
            "- `{}` / `{}`: {}",
            result.module,
            result.stage,
            unit_label(result.status)
        ));
        if let Some(code) = result.exit_code
            && code != 0
        {
            out.push_str(&format!(" (exit {})", code));
        }
        if let Some(reason) = &result.reason {
            out.push_str(&format!(" ({})", reason));
        }
        if let Some(log) = &result.log {
            out.push_str(&format!(" [log]({})", log));
        }
        out.push('\n');
    }

    out
}

fn status_label(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Pass => "pass",
        ReportStatus::Warn => "warn",
        ReportStatus::Fail => "fail",
    }
}

fn unit_label(status: UnitStatus) -> &'static str {
    match status {
        UnitStatus::Succeeded => "succeeded",
        UnitStatus::Failed => "**failed**",
        UnitStatus::Skipped => "skipped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genfleet_types::report::{ReportCounts, ReportRunInfo, ReportToolInfo, ReportVerdict};
    use genfleet_types::run::{PipelineRun, RunResult};

    fn report_with(results: Vec<RunResult>) -> PipelineReport {
        let mut run = PipelineRun::default();
        for r in results {
            run.push(r);
        }
        let failed = run.failed_count();
        PipelineReport {
            schema: genfleet_types::schema::GENFLEET_REPORT_V1.to_string(),
            tool: ReportToolInfo {
                name: "genfleet".into(),
                version: "0.0.0-test".into(),
                commit: None,
            },
            run: ReportRunInfo {
                run_id: "render-test".into(),
                started_at: "2026-01-01T00:00:00Z".into(),
                ended_at: None,
                duration_ms: None,
            },
            verdict: ReportVerdict {
                status: if failed > 0 {
                    ReportStatus::Fail
                } else {
                    ReportStatus::Pass
                },
                counts: ReportCounts {
                    succeeded: run.succeeded_count(),
                    failed,
                    skipped: run.skipped_count(),
                },
                reasons: vec![],
            },
            results: run,
            data: None,
        }
    }

    #[test]
    fn renders_empty_report() {
        let md = render_report_md(&report_with(vec![]));
        assert!(md.contains("_No units ran._"));
        assert!(md.contains("`pass`"));
    }

    #[test]
    fn renders_failures_with_exit_codes() {
        let mut failed = RunResult::failed("ebs", "build", "exited with Some(101)");
        failed.exit_code = Some(101);
        let md = render_report_md(&report_with(vec![
            RunResult::succeeded("simple", "build"),
            failed,
        ]));
        assert!(md.contains("`fail`"));
        assert!(md.contains("`ebs` / `build`: **failed** (exit 101)"));
        assert!(md.contains("`simple` / `build`: succeeded"));
    }
}
