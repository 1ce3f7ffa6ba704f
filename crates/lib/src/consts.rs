pub const APP_NAME: &str = "kiln";

/// Build description read by the CLI when `-f` is not given.
pub const DEFAULT_MANIFEST: &str = "kiln.json";

/// Settings file stored next to the build description.
pub const DEFAULT_SETTINGS_FILENAME: &str = ".kiln-settings.json";

/// Overrides the settings file location.
pub const SETTINGS_PATH_ENV: &str = "KILN_SETTINGS";

/// Space-separated target names exported to command rules.
pub const TARGETS_ENV: &str = "KILN_TARGETS";

/// Space-separated prerequisite names exported to command rules.
pub const PREREQUISITES_ENV: &str = "KILN_PREREQUISITES";

/// Prefix of the per-setting variables exported to command rules.
pub const SETTING_ENV_PREFIX: &str = "KILN_SETTING_";
