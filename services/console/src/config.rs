//! Environment-driven configuration for the console.

use listenai_realtime::auth::DeviceIdentity;
use listenai_realtime::protocol::{TtsProperties, TurnConfig};
use tracing::Level;
use uuid::Uuid;

const DEFAULT_AUTH_URL: &str = "https://api.listenai.com/v1/auth/tokens";
const DEFAULT_INTERACTION_URL: &str = "wss://api.listenai.com/v1/interaction";
const DEFAULT_VCN: &str = "x4_lingxiaoqi_oral";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub product_id: String,
    pub product_secret: String,
    pub device_id: String,
    pub auth_url: String,
    pub interaction_url: String,
    pub vcn: String,
    pub tts_speed: u32,
    pub tts_volume: u32,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let product_id = std::env::var("XIAOLING_PRODUCT_ID")
            .map_err(|_| ConfigError::MissingVar("XIAOLING_PRODUCT_ID".to_string()))?;
        let product_secret = std::env::var("XIAOLING_PRODUCT_SECRET")
            .map_err(|_| ConfigError::MissingVar("XIAOLING_PRODUCT_SECRET".to_string()))?;

        // Real devices carry ids with this prefix; a fresh suffix per run
        // keeps parallel debug sessions distinct on the server side.
        let device_id = std::env::var("XIAOLING_DEVICE_ID")
            .unwrap_or_else(|_| format!("1638a7ba{}", &Uuid::new_v4().to_string()[..8]));

        let auth_url =
            std::env::var("XIAOLING_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string());
        let interaction_url = std::env::var("XIAOLING_INTERACTION_URL")
            .unwrap_or_else(|_| DEFAULT_INTERACTION_URL.to_string());

        let vcn = std::env::var("XIAOLING_VCN").unwrap_or_else(|_| DEFAULT_VCN.to_string());
        let tts_speed = parse_u32_var("XIAOLING_TTS_SPEED", 50)?;
        let tts_volume = parse_u32_var("XIAOLING_TTS_VOLUME", 50)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            product_id,
            product_secret,
            device_id,
            auth_url,
            interaction_url,
            vcn,
            tts_speed,
            tts_volume,
            log_level,
        })
    }

    /// The immutable credentials for this run.
    pub fn device_identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            product_id: self.product_id.clone(),
            product_secret: self.product_secret.clone(),
            device_id: self.device_id.clone(),
        }
    }

    /// Per-turn parameters derived from the voice settings.
    pub fn turn_config(&self) -> TurnConfig {
        TurnConfig {
            tts: TtsProperties {
                vcn: self.vcn.clone(),
                speed: self.tts_speed,
                volume: self.tts_volume,
            },
            ..TurnConfig::default()
        }
    }
}

fn parse_u32_var(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<u32>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' is not an integer", raw))
        }),
        Err(_) => Ok(default),
    }
}
