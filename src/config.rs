use std::net::SocketAddr;
use std::path::PathBuf;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::core::conversation::ChatSettings;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Data directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Usually supplied via `CONFIDANT_LLM__API_KEY`.
    pub api_key: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Conversation behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum number of prior turns fed back to the model.
    pub history_limit: u32,
    /// Reply suggestions generated per request.
    pub suggestion_count: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            data: DataConfig::default(),
            llm: LlmConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { data_dir: None }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key: String::new(),
            temperature: 0.8,
            max_output_tokens: 1024,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            suggestion_count: 3,
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then `~/.config/confidant/config.toml`,
    /// then `CONFIDANT_*` environment variables (double underscore for
    /// nesting, e.g. `CONFIDANT_SERVER__PORT`).
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(Self::config_path()))
            .merge(Env::prefixed("CONFIDANT_").split("__"))
            .extract()
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("confidant"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            history_limit: self.chat.history_limit,
            suggestion_count: self.chat.suggestion_count,
            temperature: self.llm.temperature,
            max_output_tokens: self.llm.max_output_tokens,
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("confidant").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
