//! Site listing and switching.

use serde_json::Value;
use tabled::Tabled;
use unigate_core::{ConnectionManager, SystemApi};

use crate::cli::{GlobalOpts, SitesArgs, SitesCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DESCRIPTION")]
    desc: String,
    #[tabled(rename = "ROLE")]
    role: String,
}

pub async fn handle(
    manager: &ConnectionManager,
    args: SitesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let system = SystemApi::new(manager);

    match args.command {
        SitesCommand::List => {
            let data = system.list_sites().await?;
            let sites: Vec<Value> = data.as_array().cloned().unwrap_or_default();

            let rendered = output::render_list(
                &global.output,
                &sites,
                |s| SiteRow {
                    name: str_field(s, "name"),
                    desc: str_field(s, "desc"),
                    role: str_field(s, "role"),
                },
                |s| str_field(s, "name"),
            );
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        SitesCommand::Switch { name } => {
            system.switch_site(&name).await?;
            if !global.quiet {
                eprintln!("Switched to site '{name}'");
            }
            Ok(())
        }
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}
