//! Command-line options shared by both front-ends.

use crate::config::{BotConfig, DevicePreference};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// Device choice on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    /// Accelerated if this build supports it, else CPU.
    Auto,
    /// GPU backend.
    Accelerated,
    /// CPU.
    Portable,
}

impl From<DeviceArg> for DevicePreference {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Auto => Self::Auto,
            DeviceArg::Accelerated => Self::Accelerated,
            DeviceArg::Portable => Self::Portable,
        }
    }
}

/// Options every front-end accepts.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// HuggingFace repo of the GGUF model.
    #[arg(long)]
    pub model: Option<String>,

    /// GGUF filename within the model repo.
    #[arg(long)]
    pub gguf_file: Option<String>,

    /// Where to run the model.
    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,
}

impl CommonArgs {
    /// Load the configuration and apply command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read or parsed.
    pub fn resolve_config(&self) -> crate::Result<BotConfig> {
        let mut config = BotConfig::load_or_default(self.config.as_deref())?;
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut BotConfig) {
        if let Some(model) = &self.model {
            config.model.model_id.clone_from(model);
        }
        if let Some(file) = &self.gguf_file {
            config.model.gguf_file.clone_from(file);
        }
        if let Some(device) = self.device {
            config.model.device = device.into();
        }
    }
}
