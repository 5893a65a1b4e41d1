//! Session status report.

use owo_colors::OwoColorize;
use serde::Serialize;
use unigate_core::ConnectionManager;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusReport {
    url: String,
    site: String,
    connected: bool,
    controller_type: Option<String>,
    detection: Option<String>,
}

pub async fn handle(manager: &ConnectionManager, global: &GlobalOpts) -> Result<(), CliError> {
    manager.initialize().await?;

    let report = StatusReport {
        url: manager.config().url.to_string(),
        site: manager.site(),
        connected: manager.is_connected(),
        controller_type: manager.controller_type().map(|c| c.to_string()),
        detection: manager.detection().map(|d| format!("{d:?}")),
    };

    let color = output::should_color(&global.color);
    let rendered = output::render_single(
        &global.output,
        &report,
        |r| format_status(r, color),
        |r| r.url.clone(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn format_status(report: &StatusReport, color: bool) -> String {
    let state = if report.connected {
        if color {
            "connected".green().to_string()
        } else {
            "connected".into()
        }
    } else if color {
        "disconnected".red().to_string()
    } else {
        "disconnected".into()
    };

    let mut lines = vec![
        format!("Controller:  {}", report.url),
        format!("Site:        {}", report.site),
        format!("Session:     {state}"),
    ];
    if let Some(ref ct) = report.controller_type {
        lines.push(format!("Type:        {ct}"));
    }
    if let Some(ref detection) = report.detection {
        lines.push(format!("Detection:   {detection}"));
    }
    lines.join("\n")
}
