use crate::workflows::Workflow;
use chrono::{DateTime, Duration, Utc};
use std::io::{self, Write};

/// Write the human-readable summary of one workflow
pub fn write_workflow<W: Write>(out: &mut W, workflow: &Workflow, now: DateTime<Utc>) -> io::Result<()> {
    let end_date = workflow
        .end_date
        .map(|date| date.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());

    writeln!(out, "Workflow ID     : {}", workflow.id)?;
    writeln!(
        out,
        "Status          : {} ({})",
        workflow.status,
        workflow.status.code()
    )?;
    writeln!(out, "Message         : {}", workflow.message)?;
    writeln!(out, "Process         : {}", workflow.process)?;
    writeln!(out, "Description     : {}", workflow.description)?;
    writeln!(out, "Created Date    : {}", workflow.created_date.to_rfc3339())?;
    writeln!(out, "End Date        : {end_date}")?;
    writeln!(
        out,
        "Wall Clock Time : {}",
        format_duration(workflow.duration_at(now))
    )?;
    writeln!(out, "Bases Processed : {}", workflow.bases_processed)?;

    Ok(())
}

/// Each workflow followed by a blank line
pub fn write_workflows<W: Write>(
    out: &mut W,
    workflows: &[Workflow],
    now: DateTime<Utc>,
) -> io::Result<()> {
    for workflow in workflows {
        write_workflow(out, workflow, now)?;
        writeln!(out)?;
    }
    Ok(())
}

/// `1h2m3s` style, omitting leading zero units
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}
