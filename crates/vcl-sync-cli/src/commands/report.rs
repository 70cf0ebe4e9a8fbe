use colored::Colorize;
use vcl_sync::{
    Feedback, FragmentOutcome, FragmentResult, ServiceVersion, SyncReport, VersionStatus,
};

/// Print every fragment outcome followed by a one-line summary.
pub fn print_report(report: &SyncReport) {
    for result in &report.results {
        for feedback in &result.feedback {
            eprintln!("{}", render_feedback(feedback));
        }
        println!("{}", render_result(result));
    }

    println!();
    println!("{}", render_summary(report));
}

pub fn render_result(result: &FragmentResult) -> String {
    match &result.outcome {
        FragmentOutcome::Uploaded { .. } => {
            format!("Yay, the file '{}' was uploaded successfully", result.name.green())
        }
        FragmentOutcome::Failed { error } => format!(
            "Whoops, the file '{}' didn't upload because of the following error:\n\t{}",
            result.name.yellow(),
            error.red()
        ),
    }
}

pub fn render_feedback(feedback: &Feedback) -> String {
    if feedback.is_warning() {
        feedback.to_string().yellow().to_string()
    } else {
        feedback.to_string()
    }
}

pub fn render_summary(report: &SyncReport) -> String {
    let failed = report.failed();
    let counts = format!(
        "{} uploaded, {} failed",
        report.succeeded(),
        failed
    );
    let counts = if failed > 0 { counts.red() } else { counts.green() };

    format!("{counts} (version {})", report.version.number)
}

/// Status text, red when the version can no longer be edited.
pub fn render_status(version: &ServiceVersion) -> String {
    let status = version.status();
    match status {
        VersionStatus::Active => status.to_string().red().to_string(),
        VersionStatus::Inactive => status.to_string().green().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn result(name: &str, outcome: FragmentOutcome) -> FragmentResult {
        FragmentResult {
            path: PathBuf::from(format!("vcl/{name}.vcl")),
            name: name.to_owned(),
            outcome,
            feedback: vec![Feedback::warning("could not create")],
        }
    }

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn success_line_names_the_fragment() {
        plain();
        let line = render_result(&result(
            "recv",
            FragmentOutcome::Uploaded {
                content: "x".into(),
            },
        ));
        assert_eq!(line, "Yay, the file 'recv' was uploaded successfully");
    }

    #[test]
    fn failure_line_includes_error_not_path() {
        plain();
        let line = render_result(&result(
            "fetch",
            FragmentOutcome::Failed {
                error: "request rejected (HTTP 500): boom".into(),
            },
        ));
        assert!(line.contains("'fetch'"));
        assert!(line.contains("HTTP 500"));
        assert!(!line.contains("vcl/fetch.vcl"));
    }

    #[test]
    fn summary_counts_outcomes() {
        plain();
        let report = SyncReport {
            version: ServiceVersion::new(7, false),
            results: vec![
                result("a", FragmentOutcome::Uploaded { content: "x".into() }),
                result("b", FragmentOutcome::Failed { error: "e".into() }),
                result("c", FragmentOutcome::Uploaded { content: "y".into() }),
            ],
        };
        assert_eq!(render_summary(&report), "2 uploaded, 1 failed (version 7)");
    }

    #[test]
    fn feedback_lines_keep_their_level_prefix() {
        plain();
        assert_eq!(
            render_feedback(&Feedback::warning("could not create 'recv'")),
            "warning: could not create 'recv'"
        );
        assert_eq!(
            render_feedback(&Feedback::info("updated existing fragment 'recv'")),
            "updated existing fragment 'recv'"
        );
    }

    #[test]
    fn status_text() {
        plain();
        assert_eq!(render_status(&ServiceVersion::new(1, true)), "already activated");
        assert_eq!(render_status(&ServiceVersion::new(1, false)), "not activated");
    }
}
