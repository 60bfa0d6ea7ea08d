use crate::constants;
use crate::error::{Result, TerritorialError};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default config file, overridable with `TERRITORIAL_CONFIG`
pub const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub supabase: SupabaseConfig,
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub read: ReadConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub table: String,
    /// Column used to keep page windows stable; `None` leaves ordering to the store
    pub order_column: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: constants::POINTS_TABLE.to_string(),
            order_column: Some("id".to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub progress_every: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: constants::DEFAULT_BATCH_SIZE,
            progress_every: constants::DEFAULT_PROGRESS_EVERY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    pub page_size: usize,
    pub cache_ttl_secs: u64,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            page_size: constants::DEFAULT_PAGE_SIZE,
            cache_ttl_secs: constants::DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl ReadConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            metrics_port: 9898,
        }
    }
}

impl Config {
    /// Load `config.toml` (or `$TERRITORIAL_CONFIG`), then apply env overrides.
    /// A missing file is not an error; every section has defaults.
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("TERRITORIAL_CONFIG").unwrap_or_else(|_| CONFIG_PATH.to_string());
        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_content = fs::read_to_string(path).map_err(|e| {
            TerritorialError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&config_content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// `SUPABASE_URL` / `SUPABASE_KEY` win over the file
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            if !url.trim().is_empty() {
                self.supabase.url = Some(url);
            }
        }
        if let Ok(key) = std::env::var("SUPABASE_KEY") {
            if !key.trim().is_empty() {
                self.supabase.anon_key = Some(key);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ingest.batch_size == 0 {
            return Err(TerritorialError::Config(
                "ingest.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.ingest.progress_every == 0 {
            return Err(TerritorialError::Config(
                "ingest.progress_every must be greater than zero".to_string(),
            ));
        }
        if self.read.page_size == 0 {
            return Err(TerritorialError::Config(
                "read.page_size must be greater than zero".to_string(),
            ));
        }
        if self.store.table.trim().is_empty() {
            return Err(TerritorialError::Config("store.table must not be empty".to_string()));
        }
        Ok(())
    }

    /// Supabase URL and key, required only when the remote adapters are built
    pub fn supabase_credentials(&self) -> Result<(String, String)> {
        let url = self.supabase.url.clone().ok_or_else(|| {
            TerritorialError::Config("SUPABASE_URL is not configured".to_string())
        })?;
        let key = self.supabase.anon_key.clone().ok_or_else(|| {
            TerritorialError::Config("SUPABASE_KEY is not configured".to_string())
        })?;
        Ok((url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.store.table, "puntos_territoriales");
        assert_eq!(config.store.order_column.as_deref(), Some("id"));
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.ingest.progress_every, 100);
        assert_eq!(config.read.page_size, 1000);
        assert_eq!(config.read.cache_ttl(), Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [ingest]
            batch_size = 50

            [supabase]
            url = "https://example.supabase.co"
            "#,
        )
        .unwrap();
        assert_eq!(config.ingest.batch_size, 50);
        assert_eq!(config.ingest.progress_every, 100);
        assert_eq!(config.supabase.url.as_deref(), Some("https://example.supabase.co"));
        assert!(config.supabase.anon_key.is_none());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = Config::from_toml("[read]\npage_size = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(TerritorialError::Config(_))));
    }

    #[test]
    fn missing_credentials_are_config_errors() {
        let config = Config::default();
        assert!(matches!(
            config.supabase_credentials(),
            Err(TerritorialError::Config(_))
        ));
    }

    #[test]
    fn unreadable_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        match Config::from_file(dir.path().join("missing.toml")) {
            Err(TerritorialError::Config(message)) => assert!(message.contains("missing.toml")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn reads_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9000").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.metrics_port, 9898);
    }
}
