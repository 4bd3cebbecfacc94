//! Configuration system for wesmirror.
//!
//! Provides TOML-based configuration with:
//! - `[database]` location of the local mirror
//! - `[remote]` HTTP settings used when talking to WES servers
//! - `[logging]` file logging settings
//!
//! Config files are layered: the user config directory first, then a
//! project-local `wesmirror.toml`.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
