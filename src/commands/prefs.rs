use crate::config::{
    delete_preferences_at, load_preferences, preferences_path, save_preferences, ApiTarget,
};
use anyhow::Result;
use clap::Subcommand;
use dialoguer::Confirm;

#[derive(Subcommand, Debug)]
pub enum PrefsCommands {
    /// Print the stored preferences
    Get,
    /// Update stored preferences; unspecified fields are kept
    Set {
        /// Default Apigee organization
        #[arg(long = "default-org")]
        org: Option<String>,
        /// Default control plane region; pass an empty string to clear it
        #[arg(long = "default-region")]
        region: Option<String>,
        /// Default control plane
        #[arg(long = "default-api", value_enum)]
        api: Option<ApiTarget>,
        /// HTTP(S) proxy URL; pass an empty string to clear it
        #[arg(long)]
        proxy: Option<String>,
    },
    /// Delete the preferences file
    Delete {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub fn run(cmd: PrefsCommands) -> Result<()> {
    match cmd {
        PrefsCommands::Get => {
            let prefs = load_preferences()?;
            println!("# {}", preferences_path().display());
            print!("{}", serde_yaml::to_string(&prefs)?);
        }
        PrefsCommands::Set {
            org,
            region,
            api,
            proxy,
        } => {
            let mut prefs = load_preferences()?;
            if let Some(org) = org {
                prefs.default_org = Some(org);
            }
            if let Some(region) = region {
                prefs.region = Some(region).filter(|r| !r.is_empty());
            }
            if let Some(api) = api {
                prefs.api = Some(api);
            }
            if let Some(proxy) = proxy {
                prefs.proxy_url = Some(proxy).filter(|p| !p.is_empty());
            }
            let path = save_preferences(&prefs)?;
            println!("Saved preferences to {}", path.display());
        }
        PrefsCommands::Delete { yes } => {
            let path = preferences_path();
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("Delete {}?", path.display()))
                    .default(false)
                    .interact()?;
            if !confirmed {
                return Ok(());
            }
            if delete_preferences_at(&path)? {
                println!("removed {}", path.display());
            } else {
                println!("no preferences file at {}", path.display());
            }
        }
    }
    Ok(())
}
