//! Configuration management for the Apigee CLI
//!
//! This module handles the preferences file and the resolution of the settings
//! every API command needs (organization, token, control plane endpoint):
//! - Loading and saving the preferences file
//! - Environment variable expansion inside the preferences file
//! - Merging preferences with command-line flags and environment variables
//!
//! ## Preferences File
//!
//! Stored in `<config dir>/apigee/preferences.yaml`, or at the path given by
//! `APIGEE_PREFERENCES_PATH`.
//!
//! ## Environment Variable Expansion
//!
//! The preferences file supports environment variable expansion with the following syntax:
//! - `${VAR}` - Simple substitution
//! - `${VAR:-default}` - Use default if VAR is unset or empty
//! - `${VAR-default}` - Use default if VAR is unset
//! - `${VAR:+alt}` - Use alt if VAR is set and non-empty
//! - `${VAR+alt}` - Use alt if VAR is set

use anyhow::{anyhow, Context};
use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use std::{env, fs, path::PathBuf};

use crate::constants::{
    APIGEE_AUTOPUSH_URL, APIGEE_BASE_URL, APIGEE_STAGING_URL, PREFERENCES_FILE,
    PREFERENCES_PATH_ENV,
};
use crate::GlobalArgs;

/// Persisted user preferences
///
/// # Example
///
/// ```yaml
/// defaultOrg: my-org
/// region: europe-west1
/// api: prod
/// proxyUrl: ${HTTPS_PROXY:-}
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    /// Organization used when `--org` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_org: Option<String>,
    /// Data residency region of the control plane
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Control plane flavour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiTarget>,
    /// HTTP(S) proxy for all control plane calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

/// Which Apigee control plane to talk to
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiTarget {
    #[default]
    Prod,
    Staging,
    Autopush,
}

/// Everything needed to build an [`crate::client::ApigeeClient`]
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub org: String,
    pub token: String,
    pub base_url: String,
    pub proxy_url: Option<String>,
    pub timeout: Option<Duration>,
    pub print_responses: bool,
}

impl ClientSettings {
    /// Merge command-line flags (which already carry their environment
    /// fallbacks) with the stored preferences. Flags win.
    ///
    /// # Errors
    /// Returns error if no organization or no access token can be determined
    pub fn resolve(args: &GlobalArgs, prefs: &Preferences) -> anyhow::Result<Self> {
        let org = non_empty(args.org.clone())
            .or_else(|| non_empty(prefs.default_org.clone()))
            .ok_or_else(|| {
                anyhow!("no Apigee organization set; pass --org, set APIGEE_ORG or run 'apigee prefs set --default-org'")
            })?;
        let token = non_empty(args.token.clone())
            .ok_or_else(|| anyhow!("no access token set; pass --token or set APIGEE_TOKEN"))?;

        let region = non_empty(args.region.clone()).or_else(|| non_empty(prefs.region.clone()));
        let api = args.api.or(prefs.api).unwrap_or_default();

        Ok(ClientSettings {
            org,
            token,
            base_url: base_url(region.as_deref(), api),
            proxy_url: non_empty(prefs.proxy_url.clone()),
            timeout: args.timeout.map(Duration::from_secs),
            print_responses: !args.no_output,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Control plane base URL; a region selects the data residency endpoint
pub fn base_url(region: Option<&str>, api: ApiTarget) -> String {
    if let Some(region) = region {
        return format!("https://{region}-apigee.googleapis.com/v1/organizations/");
    }
    match api {
        ApiTarget::Prod => APIGEE_BASE_URL.to_string(),
        ApiTarget::Staging => APIGEE_STAGING_URL.to_string(),
        ApiTarget::Autopush => APIGEE_AUTOPUSH_URL.to_string(),
    }
}

/// Location of the preferences file
pub fn preferences_path() -> PathBuf {
    env::var(PREFERENCES_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
            p.push(PREFERENCES_FILE);
            p
        })
}

/// Load preferences from the default location; a missing file yields defaults
pub fn load_preferences() -> anyhow::Result<Preferences> {
    load_preferences_from(&preferences_path())
}

pub fn load_preferences_from(path: &Path) -> anyhow::Result<Preferences> {
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let data = preprocess_config(path)
        .with_context(|| format!("reading preferences {}", path.display()))?;
    if data.trim().is_empty() {
        return Ok(Preferences::default());
    }
    let prefs: Preferences = serde_yaml::from_str(&data)
        .with_context(|| format!("parsing preferences {}", path.display()))?;
    Ok(prefs)
}

pub fn save_preferences(prefs: &Preferences) -> anyhow::Result<PathBuf> {
    let path = preferences_path();
    save_preferences_to(prefs, &path)?;
    Ok(path)
}

pub fn save_preferences_to(prefs: &Preferences, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_yaml::to_string(prefs)?;
    fs::write(path, data).with_context(|| format!("writing preferences {}", path.display()))?;
    Ok(())
}

/// Remove the preferences file. Returns `false` when there was nothing to delete.
pub fn delete_preferences_at(path: &Path) -> anyhow::Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("deleting preferences {}", path.display()))?;
    Ok(true)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?:(:?[-+])([^}]*))?\}")
            .expect("placeholder pattern is valid")
    })
}

pub fn expand_env_placeholders(input: &str) -> String {
    placeholder_regex()
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let op = caps.get(2).map_or("", |m| m.as_str());
            let val = caps.get(3).map_or("", |m| m.as_str());
            let var = env::var(var_name).ok();

            match (var.as_deref(), op) {
                (Some(v), "") => v.to_string(),
                (Some(v), ":-") if !v.is_empty() => v.to_string(),
                (_, ":-") => val.to_string(),
                (Some(v), "-") => v.to_string(),
                (None, "-") => val.to_string(),
                (Some(v), ":+") if !v.is_empty() => val.to_string(),
                (Some(_), "+") => val.to_string(),
                _ => String::new(),
            }
        })
        .to_string()
}

pub fn preprocess_config(path: &Path) -> anyhow::Result<String> {
    let raw_data = fs::read_to_string(path)?;
    Ok(expand_env_placeholders(&raw_data))
}
