//! Configuration inspection and profile selection.

use tabled::Tabled;
use unigate_config as cfg;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "PROFILE")]
    name: String,
    #[tabled(rename = "CONTROLLER")]
    controller: String,
    #[tabled(rename = "SITE")]
    site: String,
    #[tabled(rename = "DEFAULT")]
    default: String,
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let config = cfg::load_config_or_default();
            let profile_name = active_profile_name(global, &config);
            if !global.quiet {
                println!("Config file:    {}", cfg::config_path().display());
                println!("Active profile: {profile_name}");
            }
            if let Ok((_, profile)) = config.profile(Some(&profile_name)) {
                let rendered = output::render_single(
                    &global.output,
                    profile,
                    |p| {
                        format!(
                            "Controller:     {}\nSite:           {}\nType:           {}",
                            p.controller, p.site, p.controller_type
                        )
                    },
                    |p| p.controller.clone(),
                );
                output::print_output(&rendered, global.quiet);
            }
            Ok(())
        }

        ConfigCommand::Profiles => {
            let config = cfg::load_config_or_default();
            let default = config.default_profile.clone().unwrap_or_default();
            let mut entries: Vec<(String, cfg::Profile)> = Vec::new();
            let mut names: Vec<&String> = config.profiles.keys().collect();
            names.sort();
            for name in names {
                if let Some(p) = config.profiles.get(name) {
                    entries.push((
                        name.clone(),
                        cfg::Profile {
                            controller: p.controller.clone(),
                            site: p.site.clone(),
                            username: p.username.clone(),
                            password: None, // never echo secrets
                            controller_type: p.controller_type.clone(),
                            ca_cert: p.ca_cert.clone(),
                            insecure: p.insecure,
                            timeout: p.timeout,
                            cache_ttl: p.cache_ttl,
                            max_retries: p.max_retries,
                            retry_delay: p.retry_delay,
                        },
                    ));
                }
            }

            let rendered = output::render_list(
                &global.output,
                &entries,
                |(name, p)| ProfileRow {
                    name: name.clone(),
                    controller: p.controller.clone(),
                    site: p.site.clone(),
                    default: if *name == default { "*".into() } else { String::new() },
                },
                |(name, _)| name.clone(),
            );
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut config = cfg::load_config_or_default();
            if !config.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound { name });
            }
            config.default_profile = Some(name.clone());
            cfg::save_config(&config)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}
