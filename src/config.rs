/// Configuration management for the causal graphical model CLI
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Largest accepted warning threshold. Power sets beyond 2^63 subsets are
/// out of reach for any exhaustive search.
pub const MAX_POOL_LIMIT: usize = 63;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub analysis: AnalysisSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Candidate pools larger than this trigger a warning before an
    /// exhaustive adjustment or independence search.
    pub max_candidate_pool: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(anyhow::anyhow!("Unknown output format '{}'", other)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis: AnalysisSettings { max_candidate_pool: 16 },
            output: OutputSettings {
                format: OutputFormat::Text,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(level) = std::env::var("CGM_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(format) = std::env::var("CGM_OUTPUT_FORMAT") {
            config.output.format = format.parse()?;
        }

        if let Ok(pool) = std::env::var("CGM_MAX_CANDIDATE_POOL") {
            config.analysis.max_candidate_pool = pool.parse()?;
        }

        Ok(config)
    }

    /// Merge with another configuration (other takes precedence where it
    /// differs from the defaults)
    pub fn merge_with(&mut self, other: Config) {
        let defaults = Config::default();

        if other.analysis.max_candidate_pool != defaults.analysis.max_candidate_pool {
            self.analysis.max_candidate_pool = other.analysis.max_candidate_pool;
        }
        if other.output.format != defaults.output.format {
            self.output.format = other.output.format;
        }
        if other.logging.level != defaults.logging.level {
            self.logging.level = other.logging.level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.analysis.max_candidate_pool == 0 {
            return Err(anyhow::anyhow!("Candidate pool warning threshold must be greater than 0"));
        }

        if self.analysis.max_candidate_pool > MAX_POOL_LIMIT {
            return Err(anyhow::anyhow!(
                "Candidate pool warning threshold must be at most {}",
                MAX_POOL_LIMIT
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(anyhow::anyhow!("Log level must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_config_save_and_load() {
        let mut config = Config::default();
        config.output.format = OutputFormat::Markdown;
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).await.unwrap();
        let loaded_config = Config::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config, loaded_config);
    }

    #[tokio::test]
    async fn test_config_load_rejects_bad_yaml() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "analysis: [").await.unwrap();

        assert!(Config::load_from_file(temp_file.path()).await.is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.analysis.max_candidate_pool = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.analysis.max_candidate_pool = MAX_POOL_LIMIT + 1;
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.level = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_merge() {
        let mut base_config = Config::default();
        let mut override_config = Config::default();

        override_config.analysis.max_candidate_pool = 10;
        override_config.output.format = OutputFormat::Json;

        base_config.merge_with(override_config);

        assert_eq!(base_config.analysis.max_candidate_pool, 10);
        assert_eq!(base_config.output.format, OutputFormat::Json);
        assert_eq!(base_config.logging.level, "info");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
