use std::io::{self, Write};

use crossterm::style::Stylize;
use serde::Serialize;

use crate::app::{
    CompletenessResult, CreatorsResult, DeliveryResult, DeriveResult, ReferenceResult, SavedRecord,
    SubmitResult,
};
use crate::submit::{SubmissionOutcome, SubmissionReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn print<T: Serialize + HumanSummary>(self, value: &T) -> io::Result<()> {
        match self {
            OutputMode::Json => JsonOutput::print_json(value),
            OutputMode::Human => {
                let mut stdout = io::stdout().lock();
                for line in value.lines() {
                    writeln!(stdout, "{line}")?;
                }
                Ok(())
            }
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Terminal rendering of an operation result.
pub trait HumanSummary {
    fn lines(&self) -> Vec<String>;
}

impl HumanSummary for SavedRecord {
    fn lines(&self) -> Vec<String> {
        vec![
            format!("{} {}", "saved".green(), self.drs),
            format!("  title: {}", self.title),
            format!("  path:  {}", self.path),
        ]
    }
}

impl HumanSummary for DeriveResult {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} {} experiment record(s) from {}",
            "derived".cyan(),
            self.items.len(),
            self.base_drs
        )];
        for item in &self.items {
            lines.push(format!("  {} -> {}", item.drs, item.path));
        }
        lines
    }
}

impl HumanSummary for SubmitResult {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} {} experiment record(s) from {}",
            "submitted".cyan(),
            self.reports.len(),
            self.base_drs
        )];
        for report in &self.reports {
            lines.extend(report_lines(report));
        }
        lines
    }
}

impl HumanSummary for SubmissionReport {
    fn lines(&self) -> Vec<String> {
        report_lines(self)
    }
}

impl HumanSummary for CreatorsResult {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} {}: {} creator(s)",
            "creators".cyan(),
            self.drs,
            self.creators.len()
        )];
        if self.diff.is_unchanged() {
            lines.push("  roster matches the existing creators".to_string());
        }
        for name in &self.diff.removed {
            lines.push(format!("  {} {name}", "-".red()));
        }
        for name in &self.diff.added {
            lines.push(format!("  {} {name}", "+".green()));
        }
        lines.extend(delivery_lines(&self.delivery));
        lines
    }
}

impl HumanSummary for ReferenceResult {
    fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if self.added {
            lines.push(format!(
                "{} {} to {}",
                "added".green(),
                self.reference,
                self.drs
            ));
        } else {
            lines.push(format!(
                "{} {} already references {}",
                "unchanged".yellow(),
                self.drs,
                self.reference
            ));
        }
        if let Some(delivery) = &self.delivery {
            lines.extend(delivery_lines(delivery));
        }
        lines
    }
}

impl HumanSummary for CompletenessResult {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} {}: {}/{} complete",
            "citations".cyan(),
            self.query,
            self.summary.complete,
            self.summary.total
        )];
        for drs in &self.summary.incomplete {
            lines.push(format!("  {} {drs}", "incomplete".yellow()));
        }
        if let Some(path) = &self.saved {
            lines.push(format!("  snapshot: {path}"));
        }
        lines
    }
}

fn delivery_lines(delivery: &DeliveryResult) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(path) = &delivery.saved {
        lines.push(format!("  {} {path}", "saved".green()));
    }
    if let Some(report) = &delivery.submission {
        lines.extend(report_lines(report));
    }
    lines
}

fn report_lines(report: &SubmissionReport) -> Vec<String> {
    let mut lines = vec![outcome_line(&report.check)];
    if let Some(commit) = &report.commit {
        lines.push(outcome_line(commit));
    }
    lines
}

fn outcome_line(outcome: &SubmissionOutcome) -> String {
    if outcome.is_success() {
        format!("  {} {}", "ok".green(), outcome.summary())
    } else {
        format!("  {} {}", "failed".red(), outcome.summary())
    }
}
