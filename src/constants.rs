//! Well-known endpoints, file names and defaults.

/// Production Apigee control plane
pub const APIGEE_BASE_URL: &str = "https://apigee.googleapis.com/v1/organizations/";
/// Staging control plane
pub const APIGEE_STAGING_URL: &str =
    "https://staging-apigee.sandbox.googleapis.com/v1/organizations/";
/// Autopush control plane
pub const APIGEE_AUTOPUSH_URL: &str =
    "https://autopush-apigee.sandbox.googleapis.com/v1/organizations/";

/// Preferences file, relative to the platform config directory
pub const PREFERENCES_FILE: &str = "apigee/preferences.yaml";
/// Overrides the preferences file location
pub const PREFERENCES_PATH_ENV: &str = "APIGEE_PREFERENCES_PATH";

/// Default number of concurrent connections for bulk jobs
pub const DEFAULT_CONNECTIONS: usize = 4;

/// Page size used when listing app groups
pub const APPGROUPS_PAGE_SIZE: usize = 1000;

pub const APPS_EXPORT_FILE: &str = "apps.json";
pub const DEVELOPERS_EXPORT_FILE: &str = "developers.json";
pub const APPGROUPS_EXPORT_FILE: &str = "appgroups.json";
/// Apps of every app group; a single group uses `<name>_apps.json`
pub const APPGROUP_APPS_EXPORT_FILE: &str = "appgroup_apps.json";
