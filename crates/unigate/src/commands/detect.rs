//! Explicit controller-type detection run.

use serde::Serialize;
use unigate_api::Detection;
use unigate_core::ConnectionManager;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct DetectReport {
    detection: String,
    effective_type: Option<String>,
}

pub async fn handle(manager: &ConnectionManager, global: &GlobalOpts) -> Result<(), CliError> {
    manager.initialize().await?;

    let detection = manager.detection();
    let report = DetectReport {
        detection: match detection {
            Some(Detection::Proxied) => "proxied (dual-probe)".into(),
            Some(Detection::Direct) => "direct (dual-probe)".into(),
            Some(Detection::Inconclusive) => "inconclusive -- using login-flavor fallback".into(),
            None => "skipped (type forced by configuration)".into(),
        },
        effective_type: manager.controller_type().map(|c| c.to_string()),
    };

    let rendered = output::render_single(
        &global.output,
        &report,
        |r| {
            let mut out = format!("Detection:  {}", r.detection);
            if let Some(ref ct) = r.effective_type {
                out.push_str(&format!("\nEffective:  {ct}"));
            }
            out
        },
        |r| r.effective_type.clone().unwrap_or_else(|| "unknown".into()),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
