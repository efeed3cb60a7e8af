//! Output formatting for resolved trees and reports.

use crate::config::{ConfigTree, MergeReport, SectionReport};
use anyhow::Result;
use clap::ValueEnum;

/// Output format for resolved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Render a tree in the requested format.
pub fn render_tree(tree: &ConfigTree, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(tree)?,
        OutputFormat::Json => {
            let mut s = serde_json::to_string_pretty(tree)?;
            s.push('\n');
            s
        }
    })
}

/// Summarize fragments skipped by a merge, one per line.
pub fn format_merge_errors(report: &MergeReport) -> String {
    let mut out = String::new();
    for err in &report.errors {
        out.push_str(&format!("{}: {}\n", err.path.display(), err.error));
    }
    out
}

/// Summarize validation findings, one violation per line.
pub fn format_section_reports(reports: &[SectionReport]) -> String {
    let mut out = String::new();
    for report in reports {
        for v in &report.violations {
            out.push_str(&format!(
                "{}.{}.{}: {}\n",
                report.service, report.section, v.key, v.message
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleViolation;
    use serde_json::json;

    #[test]
    fn test_render_yaml_and_json() {
        let tree = json!({"net": {"port": 8080}});
        assert_eq!(
            render_tree(&tree, OutputFormat::Yaml).unwrap(),
            "net:\n  port: 8080\n"
        );
        let json_out = render_tree(&tree, OutputFormat::Json).unwrap();
        assert_eq!(serde_json::from_str::<ConfigTree>(&json_out).unwrap(), tree);
    }

    #[test]
    fn test_section_report_lines() {
        let reports = vec![SectionReport {
            service: "memApp".into(),
            section: "watchdog".into(),
            violations: vec![RuleViolation {
                key: "interval".into(),
                message: "min value is 1".into(),
            }],
        }];
        assert_eq!(
            format_section_reports(&reports),
            "memApp.watchdog.interval: min value is 1\n"
        );
    }
}
