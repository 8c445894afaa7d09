//! Configuration management for complaint-lens

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Complaint corpus location
    pub data: DataConfig,

    /// Report output settings
    pub output: OutputConfig,

    /// Hosted language model settings
    pub llm: LlmConfig,

    /// Outbound mail settings
    pub mail: MailConfig,

    /// HTTP chat server settings
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the complaint JSON document
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory where PDF reports are written and served from
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Use hosted models at all; when false only the rule-based responder answers
    pub enabled: bool,

    /// Provider tried first
    pub default_provider: String,

    /// Providers tried after the default one, in order
    pub fallback_order: Vec<String>,

    /// Per-call timeout; expiry counts as the service being unavailable
    pub timeout_secs: u64,

    /// Provider configurations
    pub providers: HashMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API endpoint URL
    pub endpoint: String,

    /// API key (can be env var reference like $OPENAI_API_KEY)
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// Whether this provider is enabled
    pub enabled: bool,

    /// Max tokens for responses
    pub max_tokens: Option<u32>,

    /// Temperature setting
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Sender address (can be env var reference like $EMAIL_SENDER)
    pub sender: String,

    /// Sender password (can be env var reference like $EMAIL_PASSWORD)
    pub password: String,

    /// Explicit SMTP host; when absent the host is looked up by sender domain
    pub smtp_host: Option<String>,

    /// Submission port for the explicit-TLS attempt
    pub smtp_port: u16,

    /// Timeout for each connection strategy
    pub timeout_secs: u64,

    /// Record messages locally instead of contacting a mail server
    pub dry_run: bool,

    /// Sender domains that always use the dry-run transport
    pub dry_run_domains: Vec<String>,

    /// Where dry-run records and failed-delivery backups are written
    pub outbox_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the chat server
    pub addr: String,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();

        providers.insert(
            "ollama".to_string(),
            ProviderConfig {
                endpoint: "http://localhost:11434".to_string(),
                api_key: String::new(),
                model: "llama3.2".to_string(),
                enabled: true,
                max_tokens: Some(1000),
                temperature: Some(0.7),
            },
        );

        providers.insert(
            "openai".to_string(),
            ProviderConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key: "$OPENAI_API_KEY".to_string(),
                model: "gpt-4o-mini".to_string(),
                enabled: false,
                max_tokens: Some(1000),
                temperature: Some(0.7),
            },
        );

        providers.insert(
            "anthropic".to_string(),
            ProviderConfig {
                endpoint: "https://api.anthropic.com/v1".to_string(),
                api_key: "$ANTHROPIC_API_KEY".to_string(),
                model: "claude-3-5-haiku-20241022".to_string(),
                enabled: false,
                max_tokens: Some(1000),
                temperature: Some(0.7),
            },
        );

        Self {
            data: DataConfig {
                path: PathBuf::from("data").join("reclamacoes.json"),
            },
            output: OutputConfig {
                directory: PathBuf::from("results"),
            },
            llm: LlmConfig {
                enabled: true,
                default_provider: "ollama".to_string(),
                fallback_order: vec!["openai".to_string(), "anthropic".to_string()],
                timeout_secs: 20,
                providers,
            },
            mail: MailConfig {
                sender: "$EMAIL_SENDER".to_string(),
                password: "$EMAIL_PASSWORD".to_string(),
                smtp_host: None,
                smtp_port: 587,
                timeout_secs: 20,
                dry_run: false,
                dry_run_domains: Vec::new(),
                outbox_directory: PathBuf::from("outbox"),
            },
            server: ServerConfig {
                addr: "0.0.0.0:5000".to_string(),
            },
        }
    }
}

impl Config {
    /// Load config from file or create default
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else if path.is_some() {
            Err(anyhow::anyhow!(
                "Config file not found: {}",
                config_path.display()
            ))
        } else {
            let config = Config::default();
            if let Err(e) = config.save(&config_path) {
                tracing::warn!(
                    "Could not write default config to {}: {}",
                    config_path.display(),
                    e
                );
            }
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("complaint-lens")
            .join("config.toml")
    }

    /// Resolve API key from config (handles env var references)
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        self.llm
            .providers
            .get(provider)
            .and_then(|p| resolve_secret(&p.api_key))
    }

    /// Resolve the mail sender address and password
    pub fn resolve_mail_credentials(&self) -> (Option<String>, Option<String>) {
        (
            resolve_secret(&self.mail.sender),
            resolve_secret(&self.mail.password),
        )
    }

    /// Providers in the order they should be tried
    pub fn provider_order(&self) -> Vec<String> {
        let mut order = vec![self.llm.default_provider.clone()];
        for name in &self.llm.fallback_order {
            if !order.contains(name) {
                order.push(name.clone());
            }
        }
        order
    }
}

/// Resolve a value that may be a `$VAR` environment reference
pub fn resolve_secret(value: &str) -> Option<String> {
    if let Some(var) = value.strip_prefix('$') {
        std::env::var(var).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
