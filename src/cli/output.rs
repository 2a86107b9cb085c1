//! Report rendering for the CLI: JSON, YAML and human-readable text

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::report::{BinaryVerdict, StagePayload, StageStatus, VerdictReport};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

/// Result of `truthlens check`
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub valid: bool,
    pub stages: String,
    pub listen: String,
    /// Credential variable -> present
    pub credentials: BTreeMap<String, bool>,
    pub problems: Vec<String>,
}

/// JSON/YAML envelope: the full report plus the derived fields
#[derive(Serialize)]
struct ReportEnvelope<'a> {
    #[serde(flatten)]
    report: &'a VerdictReport,
    binary_verdict: BinaryVerdict,
    metadata_found: bool,
    risk_score: Option<u8>,
    complete: bool,
}

impl<'a> From<&'a VerdictReport> for ReportEnvelope<'a> {
    fn from(report: &'a VerdictReport) -> Self {
        Self {
            report,
            binary_verdict: report.binary_verdict(),
            metadata_found: report.metadata_found(),
            risk_score: report.risk_score(),
            complete: report.is_complete(),
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_report(&self, report: &VerdictReport) -> Result<String> {
        let envelope = ReportEnvelope::from(report);
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&envelope)
                .context("Failed to serialize report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&envelope).context("Failed to serialize report to YAML")
            }
            OutputFormat::Human => Ok(format_report_human(report)),
        }
    }

    pub fn format_check(&self, check: &CheckReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(check)
                .context("Failed to serialize check result to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(check).context("Failed to serialize check result to YAML")
            }
            OutputFormat::Human => Ok(format_check_human(check)),
        }
    }
}

fn status_icon(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Ok => "\u{2713}",
        StageStatus::Unavailable => "\u{23F3}",
        StageStatus::Error => "\u{2717}",
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_report_human(report: &VerdictReport) -> String {
    let mut output = String::new();

    let verdict = report.binary_verdict();
    match verdict {
        BinaryVerdict::Flagged => output.push_str("\u{26A0} Forensic Verdict: Flagged\n"),
        BinaryVerdict::Clear => output.push_str("\u{2713} Forensic Verdict: Clear\n"),
    }
    output.push_str(RULE);
    output.push_str("\n\n");

    output.push_str(&format!(
        "Evidence:     {} (sha256 {})\n",
        report.evidence_kind,
        report.evidence_sha256.get(..12).unwrap_or(&report.evidence_sha256)
    ));
    output.push_str(&format!("Instruction:  {}\n", report.instruction));
    output.push_str(&format!("Run:          {}\n\n", report.run_id));

    output.push_str("Stages:\n");
    for (i, result) in report.stages.iter().enumerate() {
        let connector = if i + 1 == report.stages.len() {
            "\u{2514}"
        } else {
            "\u{251C}"
        };
        output.push_str(&format!(
            "{}\u{2500} {} {:<9} {:<12} {}ms\n",
            connector,
            status_icon(result.status),
            result.stage.as_str(),
            result.status.to_string(),
            result.elapsed.as_millis()
        ));
        let body = match &result.payload {
            StagePayload::Fields(fields) if !fields.is_empty() => fields
                .iter()
                .map(|(key, value)| match value {
                    serde_json::Value::String(s) => format!("{}: {}", key, s),
                    other => format!("{}: {}", key, other),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            payload => payload.summary(),
        };
        output.push_str(&indent(&body, "     "));
        output.push('\n');
    }
    if report.stages.is_empty() {
        output.push_str("  (no stages ran)\n");
    }
    output.push('\n');

    output.push_str(&format!(
        "Metadata found: {}\n",
        if report.metadata_found() { "yes" } else { "no" }
    ));
    if let Some(score) = report.risk_score() {
        output.push_str(&format!("Risk score:     {}/100\n", score));
    }
    if report.verdict.is_none() {
        output.push_str("\n\u{26A0} The logic auditor produced no verdict; the run is incomplete.\n");
    } else if !report.is_complete() {
        output.push_str("\n\u{26A0} Some stages did not complete; see above.\n");
    }

    output.push_str(&format!(
        "\nProcessed in {}ms\n",
        report.elapsed.as_millis()
    ));
    output
}

fn format_check_human(check: &CheckReport) -> String {
    let mut output = String::new();
    if check.valid {
        output.push_str("\u{2713} Configuration OK\n");
    } else {
        output.push_str("\u{2717} Configuration invalid\n");
    }
    output.push_str(RULE);
    output.push_str("\n\n");

    output.push_str(&format!("Stages:  {}\n", check.stages));
    output.push_str(&format!("Listen:  {}\n\n", check.listen));

    output.push_str("Credentials:\n");
    for (variable, present) in &check.credentials {
        let mark = if *present { "\u{2713}" } else { "\u{2717}" };
        output.push_str(&format!("  {} {}\n", mark, variable));
    }

    if !check.problems.is_empty() {
        output.push_str("\nProblems:\n");
        for problem in &check.problems {
            output.push_str(&format!("  - {}\n", problem));
        }
    }
    output
}
