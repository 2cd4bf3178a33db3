//! Config loading entry points.

use super::merge::merge_policy;
use super::sources::{environment, global_file, local_file};
use super::ListenerConfig;
use crate::error::ApiError;
use config::File;
use std::path::{Path, PathBuf};

/// Loads [`ListenerConfig`] from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from defaults, the global file, `{root}/config/`, then the environment.
    pub fn load(root: &Path) -> Result<ListenerConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = local_file::add_to_builder(builder, root)?;
        let builder = environment::add_to_builder(builder)?;

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load from a single required file; the environment still overrides it.
    pub fn load_from_file(path: &Path) -> Result<ListenerConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder)?;

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Where the global config file is looked up, if a home is known.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
