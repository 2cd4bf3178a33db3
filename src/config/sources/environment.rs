//! Environment sources: `BCMAPS__SECTION__KEY` variables, then the legacy
//! deployment variables.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Legacy variable names and the config keys they set.
pub const LEGACY_VARIABLES: [(&str, &str); 6] = [
    ("LEANIX_INSTANCE", "upstream.instance"),
    ("LEANIX_APITOKEN", "upstream.api_token"),
    ("LEANIX_USERNAME", "auth.username"),
    ("LEANIX_PASSWORD", "auth.password"),
    ("HUBSPOT_API_KEY", "publish.api_key"),
    ("HUBSPOT_FOLDER", "publish.folder"),
];

/// Add both environment layers to builder.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder.add_source(Environment::with_prefix("BCMAPS").separator("__"));

    for (variable, key) in LEGACY_VARIABLES {
        let value = std::env::var(variable).ok().filter(|v| !v.is_empty());
        builder = builder.set_override_option(key, value)?;
    }

    Ok(builder)
}
