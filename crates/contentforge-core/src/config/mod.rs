//! Configuration management with file persistence
//!
//! Settings live in `config.toml`; provider and datastore credentials are
//! only ever read from the environment.

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::providers::ProviderKind;

/// ContentForge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub text: TextConfig,
    pub image: ImageConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub default_text: ProviderKind,
    pub default_image: ProviderKind,
    pub huggingface: HuggingFaceConfig,
    pub gemini: GeminiConfig,
    pub mistral: MistralConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HuggingFaceConfig {
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MistralConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub default_template: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Supabase,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "local" => Some(Self::Sqlite),
            "supabase" | "hosted" => Some(Self::Supabase),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Supabase => "supabase",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite file; empty means `<config_dir>/contentforge.db`
    pub sqlite_path: String,
    pub list_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub require_auth: bool,
    pub keepalive_interval_secs: u64,
    pub refresh_margin_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            body_limit_bytes: 4 * 1024 * 1024,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default_text: ProviderKind::HuggingFace,
            default_image: ProviderKind::HuggingFace,
            huggingface: HuggingFaceConfig::default(),
            gemini: GeminiConfig::default(),
            mistral: MistralConfig::default(),
        }
    }
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co".to_string(),
            text_model: "HuggingFaceH4/zephyr-7b-beta".to_string(),
            image_model: "stabilityai/stable-diffusion-xl-base-1.0".to_string(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_model: "gemini-2.0-flash".to_string(),
            image_model: "gemini-2.0-flash-preview-image-generation".to_string(),
        }
    }
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mistral.ai/v1".to_string(),
            model: "mistral-small-latest".to_string(),
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            default_template: "content-creator".to_string(),
            max_new_tokens: 1024,
            temperature: 0.7,
            top_p: 0.95,
            timeout_secs: 60,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self { timeout_secs: 180 }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            sqlite_path: String::new(),
            list_limit: 50,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            keepalive_interval_secs: 5 * 60,
            refresh_margin_secs: 30 * 60,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
        }
    }
}

/// Secrets resolved from the process environment
#[derive(Clone, Default)]
pub struct Credentials {
    pub huggingface_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub mistral_api_key: Option<String>,
    pub supabase: Option<SupabaseCredentials>,
}

#[derive(Clone)]
pub struct SupabaseCredentials {
    pub url: String,
    pub anon_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("huggingface_token", &redact(self.huggingface_token.as_deref()))
            .field("gemini_api_key", &redact(self.gemini_api_key.as_deref()))
            .field("mistral_api_key", &redact(self.mistral_api_key.as_deref()))
            .field("supabase_url", &self.supabase.as_ref().map(|s| s.url.as_str()))
            .finish()
    }
}

impl std::fmt::Debug for SupabaseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseCredentials")
            .field("url", &self.url)
            .field("anon_key", &redact(Some(&self.anon_key)))
            .finish()
    }
}

/// Show only the last four characters of a secret
pub fn redact(secret: Option<&str>) -> Option<String> {
    secret.map(|key| {
        let count = key.chars().count();
        if count <= 4 {
            "***".to_string()
        } else {
            let tail: String = key.chars().skip(count - 4).collect();
            format!("***{}", tail)
        }
    })
}

impl Credentials {
    /// Resolve credentials from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |names: &[&str]| {
            names
                .iter()
                .filter_map(|n| lookup(*n))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let supabase_url = get(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]);
        let supabase_key = get(&["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"]);

        let supabase = match (supabase_url, supabase_key) {
            (Some(url), Some(anon_key)) => {
                reqwest::Url::parse(&url).map_err(|_| anyhow!("Invalid Supabase URL format"))?;
                Some(SupabaseCredentials {
                    url: url.trim_end_matches('/').to_string(),
                    anon_key,
                })
            }
            (None, None) => None,
            _ => return Err(anyhow!("Missing Supabase environment variables")),
        };

        Ok(Self {
            huggingface_token: get(&[ProviderKind::HuggingFace.credential_env()]),
            gemini_api_key: get(&[ProviderKind::Gemini.credential_env()]),
            mistral_api_key: get(&[ProviderKind::Mistral.credential_env()]),
            supabase,
        })
    }

    pub fn api_key(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::HuggingFace => self.huggingface_token.as_deref(),
            ProviderKind::Gemini => self.gemini_api_key.as_deref(),
            ProviderKind::Mistral => self.mistral_api_key.as_deref(),
        }
    }
}

/// Keys accepted by `get`/`set`
const KEYS: &[&str] = &[
    "server.host",
    "server.port",
    "server.body_limit_bytes",
    "providers.default_text",
    "providers.default_image",
    "providers.huggingface.text_model",
    "providers.huggingface.image_model",
    "providers.gemini.text_model",
    "providers.gemini.image_model",
    "providers.mistral.model",
    "text.default_template",
    "text.max_new_tokens",
    "text.temperature",
    "text.top_p",
    "text.timeout_secs",
    "image.timeout_secs",
    "storage.backend",
    "storage.sqlite_path",
    "storage.list_limit",
    "auth.require_auth",
    "auth.keepalive_interval_secs",
    "auth.refresh_margin_secs",
    "client.server_url",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("CONTENTFORGE_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("contentforge")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Resolved SQLite path for the local store
    pub fn sqlite_path(&self) -> anyhow::Result<PathBuf> {
        if self.storage.sqlite_path.is_empty() {
            Ok(Self::config_dir()?.join("contentforge.db"))
        } else {
            Ok(PathBuf::from(&self.storage.sqlite_path))
        }
    }

    /// Load configuration from file, or the defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let raw: toml::Value = toml::from_str(contents)?;
        reject_stored_secrets(&raw)?;
        let config = raw.try_into::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=2.0).contains(&self.text.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
        }
        if !(0.0..=1.0).contains(&self.text.top_p) {
            return Err(anyhow!("top_p must be between 0.0 and 1.0"));
        }
        if self.text.timeout_secs == 0 || self.image.timeout_secs == 0 {
            return Err(anyhow!("Timeouts must be at least one second"));
        }
        if self.providers.default_image == ProviderKind::Mistral {
            return Err(anyhow!("mistral cannot be the default image provider"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        let value = match key {
            "server.host" => self.server.host.clone(),
            "server.port" => self.server.port.to_string(),
            "server.body_limit_bytes" => self.server.body_limit_bytes.to_string(),
            "providers.default_text" => self.providers.default_text.to_string(),
            "providers.default_image" => self.providers.default_image.to_string(),
            "providers.huggingface.text_model" => self.providers.huggingface.text_model.clone(),
            "providers.huggingface.image_model" => self.providers.huggingface.image_model.clone(),
            "providers.gemini.text_model" => self.providers.gemini.text_model.clone(),
            "providers.gemini.image_model" => self.providers.gemini.image_model.clone(),
            "providers.mistral.model" => self.providers.mistral.model.clone(),
            "text.default_template" => self.text.default_template.clone(),
            "text.max_new_tokens" => self.text.max_new_tokens.to_string(),
            "text.temperature" => self.text.temperature.to_string(),
            "text.top_p" => self.text.top_p.to_string(),
            "text.timeout_secs" => self.text.timeout_secs.to_string(),
            "image.timeout_secs" => self.image.timeout_secs.to_string(),
            "storage.backend" => self.storage.backend.as_str().to_string(),
            "storage.sqlite_path" => self.storage.sqlite_path.clone(),
            "storage.list_limit" => self.storage.list_limit.to_string(),
            "auth.require_auth" => self.auth.require_auth.to_string(),
            "auth.keepalive_interval_secs" => self.auth.keepalive_interval_secs.to_string(),
            "auth.refresh_margin_secs" => self.auth.refresh_margin_secs.to_string(),
            "client.server_url" => self.client.server_url.clone(),
            k if is_secret_key(k) => {
                return Err(anyhow!(
                    "{} is read from the environment and is never stored in configuration",
                    k
                ));
            }
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "server.host" => self.server.host = value.to_string(),
            "server.port" => {
                self.server.port = value
                    .parse()
                    .with_context(|| format!("Invalid port value: {}", value))?;
            }
            "server.body_limit_bytes" => {
                self.server.body_limit_bytes = value
                    .parse()
                    .with_context(|| format!("Invalid body_limit_bytes value: {}", value))?;
            }
            "providers.default_text" => {
                self.providers.default_text = parse_provider(value)?;
            }
            "providers.default_image" => {
                let kind = parse_provider(value)?;
                if kind == ProviderKind::Mistral {
                    return Err(anyhow!("mistral does not support image generation"));
                }
                self.providers.default_image = kind;
            }
            "providers.huggingface.text_model" => {
                self.providers.huggingface.text_model = value.to_string()
            }
            "providers.huggingface.image_model" => {
                self.providers.huggingface.image_model = value.to_string()
            }
            "providers.gemini.text_model" => self.providers.gemini.text_model = value.to_string(),
            "providers.gemini.image_model" => self.providers.gemini.image_model = value.to_string(),
            "providers.mistral.model" => self.providers.mistral.model = value.to_string(),
            "text.default_template" => self.text.default_template = value.to_string(),
            "text.max_new_tokens" => {
                self.text.max_new_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_new_tokens value: {}", value))?;
            }
            "text.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.text.temperature = temp;
            }
            "text.top_p" => {
                let top_p: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid top_p value: {}", value))?;
                if !(0.0..=1.0).contains(&top_p) {
                    return Err(anyhow!("top_p must be between 0.0 and 1.0"));
                }
                self.text.top_p = top_p;
            }
            "text.timeout_secs" => self.text.timeout_secs = parse_timeout(value)?,
            "image.timeout_secs" => self.image.timeout_secs = parse_timeout(value)?,
            "storage.backend" => {
                self.storage.backend = StorageBackend::parse(value).ok_or_else(|| {
                    anyhow!("Invalid storage backend: {}. Valid options: sqlite, supabase", value)
                })?;
            }
            "storage.sqlite_path" => self.storage.sqlite_path = value.to_string(),
            "storage.list_limit" => {
                self.storage.list_limit = value
                    .parse()
                    .with_context(|| format!("Invalid list_limit value: {}", value))?;
            }
            "auth.require_auth" => {
                self.auth.require_auth = value
                    .parse()
                    .with_context(|| format!("Invalid boolean value: {}", value))?;
            }
            "auth.keepalive_interval_secs" => {
                self.auth.keepalive_interval_secs = parse_timeout(value)?;
            }
            "auth.refresh_margin_secs" => {
                self.auth.refresh_margin_secs = value
                    .parse()
                    .with_context(|| format!("Invalid refresh_margin_secs value: {}", value))?;
            }
            "client.server_url" => {
                reqwest::Url::parse(value)
                    .with_context(|| format!("Invalid server URL: {}", value))?;
                self.client.server_url = value.trim_end_matches('/').to_string();
            }
            k if is_secret_key(k) => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set HF_TOKEN, GEMINI_API_KEY, MISTRAL_API_KEY or SUPABASE_ANON_KEY instead."
                ));
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn parse_provider(value: &str) -> anyhow::Result<ProviderKind> {
    ProviderKind::parse(value).ok_or_else(|| {
        anyhow!(
            "Invalid provider: {}. Valid options: huggingface, gemini, mistral",
            value
        )
    })
}

fn parse_timeout(value: &str) -> anyhow::Result<u64> {
    let secs: u64 = value
        .parse()
        .with_context(|| format!("Invalid seconds value: {}", value))?;
    if secs == 0 {
        return Err(anyhow!("Value must be at least one second"));
    }
    Ok(secs)
}

fn is_secret_key(key: &str) -> bool {
    key.ends_with("api_key") || key.ends_with("token") || key.ends_with("anon_key")
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow!(
        "Unknown configuration key: {}. Use `contentforge config list` to see available keys.",
        key
    )
}

fn reject_stored_secrets(value: &toml::Value) -> anyhow::Result<()> {
    if let toml::Value::Table(table) = value {
        for (key, child) in table {
            if is_secret_key(key) {
                return Err(anyhow!(
                    "Credentials must be provided via environment variables, not stored in configuration (found `{}`)",
                    key
                ));
            }
            reject_stored_secrets(child)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml(&text).unwrap();
        assert_eq!(parsed.server.port, 3000);
        assert_eq!(parsed.image.timeout_secs, 180);
        assert_eq!(parsed.providers.default_text, ProviderKind::HuggingFace);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = Config::from_toml("[server]\nport = 8080\n").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.text.max_new_tokens, 1024);
    }

    #[test]
    fn test_stored_secret_rejected() {
        let err = Config::from_toml("[providers.huggingface]\napi_key = \"hf_x\"\n").unwrap_err();
        assert!(err.to_string().contains("environment variables"));
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();
        config.set("text.temperature", "1.2").unwrap();
        assert_eq!(config.get("text.temperature").unwrap(), "1.2");

        assert!(config.set("text.temperature", "3.0").is_err());
        assert!(config.set("providers.default_image", "mistral").is_err());
        assert!(config.set("providers.gemini.api_key", "x").is_err());
        assert!(config.set("nope", "x").is_err());

        config.set("storage.backend", "hosted").unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Supabase);
    }

    #[test]
    fn test_list_covers_all_keys() {
        let list = Config::default().list().unwrap();
        assert_eq!(list.len(), KEYS.len());
        assert!(list.iter().any(|(k, v)| k == "client.server_url" && v.starts_with("http")));
    }

    #[test]
    fn test_credentials_from_lookup() {
        let creds = Credentials::from_lookup(lookup(&[
            ("HF_TOKEN", "hf_secret1234"),
            ("NEXT_PUBLIC_SUPABASE_URL", "https://abc.supabase.co/"),
            ("NEXT_PUBLIC_SUPABASE_ANON_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(creds.api_key(ProviderKind::HuggingFace), Some("hf_secret1234"));
        assert_eq!(creds.api_key(ProviderKind::Gemini), None);
        let supabase = creds.supabase.as_ref().unwrap();
        assert_eq!(supabase.url, "https://abc.supabase.co");

        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hf_secret1234"));
        assert!(debug.contains("***1234"));
    }

    #[test]
    fn test_blank_credentials_ignored() {
        let creds = Credentials::from_lookup(lookup(&[("GEMINI_API_KEY", "   ")])).unwrap();
        assert!(creds.gemini_api_key.is_none());
    }

    #[test]
    fn test_half_configured_supabase_is_an_error() {
        let err = Credentials::from_lookup(lookup(&[("SUPABASE_URL", "https://x.supabase.co")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing Supabase environment variables");

        let err = Credentials::from_lookup(lookup(&[
            ("SUPABASE_URL", "not a url"),
            ("SUPABASE_ANON_KEY", "k"),
        ]))
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid Supabase URL format");
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact(Some("abc")), Some("***".to_string()));
        assert_eq!(redact(Some("abcdefgh")), Some("***efgh".to_string()));
        assert_eq!(redact(None), None);
    }

    #[test]
    fn test_redact_multibyte_tail() {
        assert_eq!(redact(Some("key-ünïcødé")), Some("***cødé".to_string()));
        assert_eq!(redact(Some("ßßßß")), Some("***".to_string()));

        let credentials = Credentials::from_lookup(|name| {
            (name == "GEMINI_API_KEY").then(|| "gem-秘密鍵です".to_string())
        })
        .unwrap();
        assert!(format!("{:?}", credentials).contains("***密鍵です"));
    }
}
