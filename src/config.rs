// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::DEFAULT_ENDPOINT;
use crate::view::TypeCase;

pub const ENDPOINT_ENV: &str = "CURRENCY_RATES_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub request_timeout_secs: u64,
    pub type_case: TypeCase,
    /// Where logs go while the terminal UI owns the screen
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 10,
            type_case: TypeCase::Sentence,
            log_file: PathBuf::from("currency-rates.log"),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Applies overrides; the first `Some` endpoint wins.
    pub fn with_overrides(
        mut self,
        endpoints: impl IntoIterator<Item = Option<String>>,
        type_case: Option<TypeCase>,
    ) -> Self {
        if let Some(endpoint) = endpoints.into_iter().flatten().find(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(type_case) = type_case {
            self.type_case = type_case;
        }
        self
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

/// Reads the config file. A missing file gives the defaults, a broken one is an error.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load_config(&dir.path().join("config.toml"))?;
        assert_eq!(config, Config::default());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "endpoint = \"http://localhost:8080/rates\"")?;
        writeln!(file, "type_case = \"verbatim\"")?;

        let config = load_config(file.path())?;
        assert_eq!(config.endpoint, "http://localhost:8080/rates");
        assert_eq!(config.type_case, TypeCase::Verbatim);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn test_broken_file_is_an_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "request_timeout_secs = \"soon\"")?;
        assert!(load_config(file.path()).is_err());
        Ok(())
    }

    #[test]
    fn test_overrides() {
        let config = Config::default().with_overrides(
            [None, Some(" ".to_string()), Some("http://env/rates".to_string())],
            Some(TypeCase::Verbatim),
        );
        assert_eq!(config.endpoint, "http://env/rates");
        assert_eq!(config.type_case, TypeCase::Verbatim);

        let config = Config::default().with_overrides(
            [Some("http://cli/rates".to_string()), Some("http://env/rates".to_string())],
            None,
        );
        assert_eq!(config.endpoint, "http://cli/rates");
        assert_eq!(config.type_case, TypeCase::Sentence);
    }
}
