pub mod config;
pub mod history;
pub mod price;

use std::path::Path;

use scanquote_core::config::{AppConfig, ConfigError, LoadOptions};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }

    pub fn failure(error_class: &str, message: impl Into<String>) -> Self {
        Self { exit_code: 1, output: format!("error ({error_class}): {}", message.into()) }
    }
}

pub(crate) fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    AppConfig::load(LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        overrides: Default::default(),
    })
}
