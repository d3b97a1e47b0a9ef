use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::error::Result;
use crate::session::{Bug, Project};

const RULE: &str = "-----------------------------------------";
const NO_BUGS: &str = "No bugs found for this project.";

/// Render a plain-text bug report. Bugs are written in the order given.
pub fn format_report(project: &Project, bugs: &[&Bug], generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&format!("Bug Report for: {}\n", project.name));
    out.push_str(&format!("URL: {}\n", project.url));
    out.push_str(&format!(
        "Date: {}\n",
        generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    out.push('\n');
    out.push_str(RULE);
    out.push_str("\n\n");

    if bugs.is_empty() {
        out.push_str(NO_BUGS);
        out.push('\n');
        return out;
    }

    for (index, bug) in bugs.iter().enumerate() {
        out.push_str(&format!("#{}: {}\n", index + 1, bug.title));
        out.push_str(&format!("Severity: {}\n", bug.severity));
        out.push_str(&format!("Description: {}\n", bug.description));
        out.push('\n');
    }
    out
}

pub fn report_file_name(project: &Project) -> String {
    format!("bug_report_{}.txt", project.id)
}

/// Write the report for `project` into `dir` and return the file path.
pub fn export_report(
    dir: &Path,
    project: &Project,
    bugs: &[&Bug],
    generated_at: DateTime<Utc>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(project));
    std::fs::write(&path, format_report(project, bugs, generated_at))?;
    info!(path = %path.display(), bugs = bugs.len(), "bug report exported");
    Ok(path)
}
