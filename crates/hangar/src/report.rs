//! Run report persistence and rendering.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use hangar_types::{OperationStatus, RunReport};

/// Write a run report as pretty JSON. The file is replaced atomically.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report dir {}", parent.display()))?;
    }

    let tmp = path.with_extension("tmp");
    let data = serde_json::to_vec_pretty(report).context("failed to serialize report JSON")?;
    {
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("failed to create tmp file {}", tmp.display()))?;
        f.write_all(&data)
            .with_context(|| format!("failed to write tmp file {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path).with_context(|| {
        format!(
            "failed to rename tmp file {} to {}",
            tmp.display(),
            path.display()
        )
    })
}

/// Load a report written by [`write_report`].
pub fn load_report(path: &Path) -> Result<RunReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read report {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse report JSON {}", path.display()))
}

/// One line per operation followed by a totals line.
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    for op in &report.operations {
        let outcome = match &op.status {
            OperationStatus::Succeeded { detail: Some(detail) } => format!("ok ({detail})"),
            OperationStatus::Succeeded { detail: None } => "ok".to_string(),
            OperationStatus::Failed { class, message } => format!("failed [{class}]: {message}"),
        };
        out.push_str(&format!(
            "{} {} {}: {}\n",
            op.publication, op.kind, op.target, outcome
        ));
    }
    out.push_str(&format!(
        "{} succeeded, {} failed\n",
        report.success_count(),
        report.failure_count()
    ));
    out
}
