//! Merge rules: defaults every other source overrides.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 7071)?
        .set_default("publish.base_url", "https://api.hubapi.com")?
        .set_default("publish.file_name", "bcmaps.json")?
        .set_default("publish.folder", "")?
        .set_default("logging.level", "info")
}
