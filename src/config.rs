//! Configuration management with validation and defaults
//!
//! Values come from an optional TOML file, then `ASCENT_*` environment
//! overrides, and are validated once at startup.

use crate::errors::{AscentResult, ConfigurationError, GameResult};
use crate::games::{
    randomness::{OsEntropySource, RandomSource},
    round_engine::RoundEngine,
    session::DEFAULT_HISTORY_LIMIT,
    types::Amount,
    vrf_engine::VrfRandomSource,
};
use crate::session_store::{SessionLimits, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE_SECS};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AscentConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Where round draws come from
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RandomnessMode {
    /// Operating-system CSPRNG
    Os,
    /// Per-round VRF proofs under a keypair generated at startup
    Vrf,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub house_edge: f64,
    /// Balance granted to a new session, in currency units
    pub starting_balance: f64,
    pub history_limit: usize,
    pub randomness: RandomnessMode,
    /// Seconds without a request before a session is dropped
    pub session_idle_secs: u64,
    pub max_sessions: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            house_edge: 0.01,
            starting_balance: 1000.0,
            history_limit: DEFAULT_HISTORY_LIMIT,
            randomness: RandomnessMode::Vrf,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl GameConfig {
    pub fn starting_amount(&self) -> Result<Amount, ConfigurationError> {
        Amount::from_decimal(self.starting_balance).ok_or_else(|| ConfigurationError::InvalidValue {
            field: "game.starting_balance".to_string(),
            value: self.starting_balance.to_string(),
            reason: "Must be a finite, non-negative amount".to_string(),
        })
    }

    pub fn build_source(&self) -> Arc<dyn RandomSource> {
        match self.randomness {
            RandomnessMode::Os => Arc::new(OsEntropySource),
            RandomnessMode::Vrf => Arc::new(VrfRandomSource::new_random()),
        }
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            idle_ttl: Duration::from_secs(self.session_idle_secs),
            max_sessions: self.max_sessions,
        }
    }

    /// Fails with `InvalidParameter` for a bad house edge
    pub fn build_engine(&self) -> GameResult<Arc<RoundEngine>> {
        Ok(Arc::new(RoundEngine::new(self.house_edge, self.build_source())?))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> AscentResult<AscentConfig> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as `load`, reading overrides through `lookup`
    pub fn load_with<F>(&self, lookup: F) -> AscentResult<AscentConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => AscentConfig::default(),
        };

        Self::apply_overrides(&mut config, lookup)?;
        Self::validate(&config)?;

        Ok(config)
    }

    fn load_from_file(path: &str) -> Result<AscentConfig, ConfigurationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }

    fn apply_overrides<F>(config: &mut AscentConfig, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(edge) = lookup("ASCENT_HOUSE_EDGE") {
            config.game.house_edge = parse_var("ASCENT_HOUSE_EDGE", edge, "Invalid house edge")?;
        }
        if let Some(balance) = lookup("ASCENT_STARTING_BALANCE") {
            config.game.starting_balance =
                parse_var("ASCENT_STARTING_BALANCE", balance, "Invalid amount")?;
        }
        if let Some(mode) = lookup("ASCENT_RANDOMNESS") {
            config.game.randomness = match mode.to_ascii_lowercase().as_str() {
                "os" => RandomnessMode::Os,
                "vrf" => RandomnessMode::Vrf,
                _ => {
                    return Err(ConfigurationError::InvalidValue {
                        field: "ASCENT_RANDOMNESS".to_string(),
                        value: mode,
                        reason: "Expected 'os' or 'vrf'".to_string(),
                    })
                }
            };
        }
        if let Some(secs) = lookup("ASCENT_SESSION_IDLE_SECS") {
            config.game.session_idle_secs =
                parse_var("ASCENT_SESSION_IDLE_SECS", secs, "Invalid number of seconds")?;
        }
        if let Some(max) = lookup("ASCENT_MAX_SESSIONS") {
            config.game.max_sessions = parse_var("ASCENT_MAX_SESSIONS", max, "Invalid session count")?;
        }
        if let Some(host) = lookup("ASCENT_API_HOST") {
            config.api.host = host;
        }
        if let Some(port) = lookup("ASCENT_API_PORT") {
            config.api.port = parse_var("ASCENT_API_PORT", port, "Invalid port number")?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(config: &AscentConfig) -> Result<(), ConfigurationError> {
        let edge = config.game.house_edge;
        if !(edge > 0.0 && edge < 1.0) {
            return Err(ConfigurationError::InvalidValue {
                field: "game.house_edge".to_string(),
                value: edge.to_string(),
                reason: "House edge must be strictly between 0 and 1".to_string(),
            });
        }

        config.game.starting_amount()?;

        if config.game.history_limit == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "game.history_limit".to_string(),
                value: "0".to_string(),
                reason: "History limit cannot be zero".to_string(),
            });
        }

        if config.game.session_idle_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "game.session_idle_secs".to_string(),
                value: "0".to_string(),
                reason: "Session idle timeout cannot be zero".to_string(),
            });
        }

        if config.game.max_sessions == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "game.max_sessions".to_string(),
                value: "0".to_string(),
                reason: "Session capacity cannot be zero".to_string(),
            });
        }

        if config.api.port == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "api.port".to_string(),
                value: "0".to_string(),
                reason: "Port cannot be zero".to_string(),
            });
        }

        if config.api.host.is_empty() {
            return Err(ConfigurationError::ValidationFailed(
                "api.host must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    field: &str,
    value: String,
    reason: &str,
) -> Result<T, ConfigurationError> {
    value.parse().map_err(|_| ConfigurationError::InvalidValue {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AscentError;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = ConfigLoader::new().load_with(no_env).unwrap();
        assert_eq!(config.game.house_edge, 0.01);
        assert_eq!(config.game.starting_amount().unwrap(), Amount::from_minor(100_000));
        assert_eq!(config.game.randomness, RandomnessMode::Vrf);
        assert_eq!(config.api.port, 8080);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AscentConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());

        config.game.house_edge = 1.0;
        assert!(ConfigLoader::validate(&config).is_err());

        config.game.house_edge = 0.02;
        config.game.starting_balance = -5.0;
        assert!(ConfigLoader::validate(&config).is_err());

        config.game.starting_balance = 10.0;
        config.game.max_sessions = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        config.game.max_sessions = 5;
        config.game.session_idle_secs = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        config.game.session_idle_secs = 60;
        config.api.port = 0;
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ASCENT_HOUSE_EDGE", "0.03"),
            ("ASCENT_RANDOMNESS", "OS"),
            ("ASCENT_API_PORT", "9100"),
            ("ASCENT_SESSION_IDLE_SECS", "120"),
        ]
        .into_iter()
        .collect();

        let config = ConfigLoader::new()
            .load_with(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.game.house_edge, 0.03);
        assert_eq!(config.game.randomness, RandomnessMode::Os);
        assert_eq!(config.api.port, 9100);
        assert_eq!(config.game.session_limits().idle_ttl, Duration::from_secs(120));
        assert_eq!(config.game.session_limits().max_sessions, DEFAULT_MAX_SESSIONS);
    }

    #[test]
    fn test_bad_env_override() {
        let result = ConfigLoader::new().load_with(|k| {
            (k == "ASCENT_API_PORT").then(|| "not-a-port".to_string())
        });
        assert!(matches!(
            result,
            Err(AscentError::Configuration(ConfigurationError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[game]\nhouse_edge = 0.05\nstarting_balance = 250.5\nrandomness = \"os\"\n\n[api]\nport = 9001"
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_path(file.path())
            .load_with(no_env)
            .unwrap();
        assert_eq!(config.game.house_edge, 0.05);
        assert_eq!(config.game.starting_amount().unwrap(), Amount::from_minor(25_050));
        assert_eq!(config.game.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.api.port, 9001);
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_build_engine() {
        let mut game = GameConfig {
            randomness: RandomnessMode::Os,
            ..GameConfig::default()
        };
        let engine = game.build_engine().unwrap();
        assert_eq!(engine.source().name(), "os");
        assert!(engine.generate_crash_point("r").unwrap().crash_point >= 1.0);

        game.house_edge = 0.0;
        assert!(game.build_engine().is_err());
    }
}
