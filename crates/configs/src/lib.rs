use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

/// Default HERE geocoding endpoint used by the location search.
pub const DEFAULT_GEOCODING_ENDPOINT: &str = "https://geocode.search.hereapi.com/v1/geocode";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    /// Trip that receives images found under the legacy flat `images` key.
    #[serde(default = "default_legacy_trip_name")]
    pub legacy_trip_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: default_file_name(),
            legacy_trip_name: default_legacy_trip_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct PersistenceConfig {
    /// Window in which successive saves are coalesced into one write. 0 writes immediately.
    #[serde(default)]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_geocoding_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geocoding_endpoint(),
            api_key: None,
            timeout_secs: default_geocoding_timeout(),
        }
    }
}

fn default_data_dir() -> String { "data".into() }
fn default_file_name() -> String { "scrapbook.json".into() }
fn default_legacy_trip_name() -> String { "Scrapbook".into() }
fn default_geocoding_endpoint() -> String { DEFAULT_GEOCODING_ENDPOINT.into() }
fn default_geocoding_timeout() -> u64 { 10 }

/// Path of the config file: `CONFIG_PATH` or `config.toml`.
pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

/// Like [`load_from_file`], but a missing file yields the defaults.
/// A file that exists and fails to parse is still an error.
pub fn load_or_default(path: &str) -> Result<AppConfig> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(anyhow!("cannot read {path}: {e}")),
    }
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_or_default(&config_path())?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.storage.normalize()?;
        self.geocoding.normalize_from_env();
        self.geocoding.validate()?;
        Ok(())
    }

    /// Full path of the JSON blob file.
    pub fn store_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.storage.data_dir).join(&self.storage.file_name)
    }
}

impl StorageConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
        self.file_name = self.file_name.trim().to_string();
        if self.file_name.is_empty() {
            return Err(anyhow!("storage.file_name must not be empty"));
        }
        if self.file_name.contains('/') || self.file_name.contains('\\') {
            return Err(anyhow!("storage.file_name must be a bare file name, not a path"));
        }
        self.legacy_trip_name = self.legacy_trip_name.trim().to_string();
        if self.legacy_trip_name.is_empty() {
            self.legacy_trip_name = default_legacy_trip_name();
        }
        Ok(())
    }
}

impl GeocodingConfig {
    pub fn normalize_from_env(&mut self) {
        // an explicit key in config.toml wins over the environment
        let blank = self.api_key.as_deref().map(|k| k.trim().is_empty()).unwrap_or(true);
        if blank {
            self.api_key = std::env::var("GEOCODING_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
    }

    pub fn validate(&self) -> Result<()> {
        let lower = self.endpoint.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("geocoding.endpoint must start with http:// or https://"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("geocoding.timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.storage.data_dir, "data");
        assert_eq!(cfg.storage.file_name, "scrapbook.json");
        assert_eq!(cfg.persistence.debounce_ms, 0);
        assert_eq!(cfg.geocoding.endpoint, DEFAULT_GEOCODING_ENDPOINT);
        assert_eq!(cfg.geocoding.timeout_secs, 10);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
[storage]
data_dir = "/var/lib/scrapbook"

[persistence]
debounce_ms = 250

[geocoding]
api_key = "abc"
"#,
        )
        .unwrap();
        assert_eq!(cfg.storage.data_dir, "/var/lib/scrapbook");
        assert_eq!(cfg.storage.file_name, "scrapbook.json");
        assert_eq!(cfg.persistence.debounce_ms, 250);
        assert_eq!(cfg.geocoding.api_key.as_deref(), Some("abc"));
        assert_eq!(cfg.store_path(), std::path::Path::new("/var/lib/scrapbook/scrapbook.json"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.storage.file_name = "  ".into();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.storage.file_name = "a/b.json".into();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.geocoding.endpoint = "ftp://geo".into();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.geocoding.timeout_secs = 0;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn normalize_fills_blank_values() {
        let mut cfg = AppConfig::default();
        cfg.storage.data_dir = " ".into();
        cfg.storage.legacy_trip_name = "".into();
        cfg.storage.file_name = " trips.json ".into();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.storage.data_dir, "data");
        assert_eq!(cfg.storage.legacy_trip_name, "Scrapbook");
        assert_eq!(cfg.storage.file_name, "trips.json");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join(format!("scrapbook_cfg_{}.toml", uuid::Uuid::new_v4()));
        let cfg = load_or_default(&path.to_string_lossy()).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert!(load_from_file(&path.to_string_lossy()).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("scrapbook_cfg_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[storage\nbroken").unwrap();
        assert!(load_or_default(&path.to_string_lossy()).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
