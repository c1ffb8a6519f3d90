/// CLI configuration
use crate::error::{CliError, Result};
use sama_playback::{LoadScript, SessionConfig, SimulatedBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// Behaviour of the simulated backend used for dry runs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    #[serde(default = "default_prepare_delay_ms")]
    pub prepare_delay_ms: u64,

    /// Shorten every track to this length, so a dry run finishes quickly
    #[serde(default)]
    pub track_length_ms: Option<u64>,

    /// Audio URLs whose loads always fail
    #[serde(default)]
    pub failing_urls: Vec<String>,

    /// Audio URLs whose first load attempt fails
    #[serde(default)]
    pub flaky_urls: Vec<String>,

    /// Fail backend initialisation with this reason
    #[serde(default)]
    pub unavailable: Option<String>,
}

fn default_prepare_delay_ms() -> u64 {
    250
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            prepare_delay_ms: default_prepare_delay_ms(),
            track_length_ms: None,
            failing_urls: vec![],
            flaky_urls: vec![],
            unavailable: None,
        }
    }
}

impl SimulationSettings {
    /// Build a backend with these settings applied to `urls`
    pub fn backend<'a>(&self, urls: impl IntoIterator<Item = &'a str>) -> SimulatedBackend {
        let backend = match &self.unavailable {
            Some(reason) => SimulatedBackend::unavailable(reason.clone()),
            None => SimulatedBackend::new(),
        }
        .with_prepare_delay(Duration::from_millis(self.prepare_delay_ms));

        if let Some(length) = self.track_length_ms {
            for url in urls {
                backend.set_duration(url, Duration::from_millis(length));
            }
        }
        for url in &self.flaky_urls {
            backend.script(url, LoadScript::FailTimes(1));
        }
        for url in &self.failing_urls {
            backend.script(url, LoadScript::FailAlways);
        }
        backend
    }
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// `path` defaults to `sama.toml` in the working directory and is
    /// optional. Environment variables prefixed with `SAMA_` override file
    /// values, with `__` between nesting levels
    /// (`SAMA_SESSION__TICK_INTERVAL_MS=500`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path));
            }
            None => {
                let default_path = Path::new("sama.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SAMA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.session
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if self.simulation.track_length_ms == Some(0) {
            return Err(CliError::Config(
                "simulation.track_length_ms must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.tick_interval_ms, 1000);
        assert_eq!(config.simulation.prepare_delay_ms, 250);
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("sama-cli-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sama.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[session]\ntick_interval_ms = 500\n\n[session.retry]\nmax_attempts = 2\n\n[simulation]\nfailing_urls = [\"sim://bad\"]"
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();

        assert_eq!(config.session.tick_interval_ms, 500);
        assert_eq!(config.session.retry.max_attempts, 2);
        assert_eq!(config.session.retry.backoff_ms, 500);
        assert_eq!(config.simulation.failing_urls, vec!["sim://bad".to_string()]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_track_length_rejected() {
        let mut config = CliConfig::default();
        config.simulation.track_length_ms = Some(0);
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }

    #[test]
    fn test_backend_applies_scripts() {
        let settings = SimulationSettings {
            unavailable: Some("no device".to_string()),
            ..SimulationSettings::default()
        };
        let backend = settings.backend(["sim://a"]);
        assert!(sama_playback::MediaBackend::initialize(&backend).is_err());
    }
}
