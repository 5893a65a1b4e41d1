//! Health and sysinfo command handlers.

use serde_json::Value;
use tabled::Tabled;
use unigate_core::{ConnectionManager, SystemApi};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct HealthRow {
    #[tabled(rename = "SUBSYSTEM")]
    subsystem: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "USERS")]
    num_user: String,
}

pub async fn health(manager: &ConnectionManager, global: &GlobalOpts) -> Result<(), CliError> {
    let system = SystemApi::new(manager);
    let data = system.get_health().await?;
    let subsystems: Vec<Value> = data.as_array().cloned().unwrap_or_default();

    let rendered = output::render_list(
        &global.output,
        &subsystems,
        |s| HealthRow {
            subsystem: str_field(s, "subsystem"),
            status: str_field(s, "status"),
            num_user: s
                .get("num_user")
                .and_then(Value::as_u64)
                .map(|n| n.to_string())
                .unwrap_or_default(),
        },
        |s| str_field(s, "subsystem"),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

pub async fn sysinfo(manager: &ConnectionManager, global: &GlobalOpts) -> Result<(), CliError> {
    let system = SystemApi::new(manager);
    let info = system.get_sysinfo().await?;

    let rendered = output::render_single(
        &global.output,
        &info,
        |v| format_sysinfo(v),
        |v| str_field(v, "version"),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn format_sysinfo(info: &Value) -> String {
    let mut lines = Vec::new();
    for (label, key) in [
        ("Name:       ", "name"),
        ("Version:    ", "version"),
        ("Build:      ", "build"),
        ("Hostname:   ", "hostname"),
        ("Uptime:     ", "uptime"),
    ] {
        if let Some(v) = info.get(key) {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            lines.push(format!("{label}{text}"));
        }
    }
    if lines.is_empty() {
        // Fallback-shaped sysinfo has none of the usual keys.
        output::render_json_pretty(info)
    } else {
        lines.join("\n")
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}
