//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field has a default so an empty file is valid.

pub mod app;
pub mod auth;
pub mod logging;
pub mod realtime;
pub mod transfer;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::auth::{AuthConfig, AuthMode};
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;
pub use self::transfer::TransferConfig;

use crate::error::AppError;

/// Prefix for environment variable overrides (`FILERELAY__SERVER__PORT=9000`).
const ENV_PREFIX: &str = "FILERELAY";

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Real-time relay settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Transfer session settings (used by clients).
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `config/default.toml`, the `config/{env}.toml`
    /// overlay and `FILERELAY__*` environment variables.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config/default", env)
    }

    /// Load configuration from an explicit base file (with or without the
    /// `.toml` extension) plus the environment overlay next to it.
    pub fn load_from(base: &str, env: &str) -> Result<Self, AppError> {
        let base = base.trim_end_matches(".toml");
        let overlay = match base.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{env}"),
            None => env.to_string(),
        };

        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&overlay).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that depend on each other.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.transfer.chunk_size_bytes == 0 {
            return Err(AppError::configuration(
                "transfer.chunk_size_bytes must be greater than zero",
            ));
        }

        let frame = self.transfer.chunk_frame_bytes();
        if frame > self.realtime.max_message_bytes {
            return Err(AppError::configuration(format!(
                "transfer.chunk_size_bytes = {} encodes to {} byte frames, above realtime.max_message_bytes = {}",
                self.transfer.chunk_size_bytes, frame, self.realtime.max_message_bytes
            )));
        }
        Ok(())
    }
}
