//! Configuration management for rolerag
//!
//! TOML-based configuration with defaults and validation.
//! Location: ~/.rolerag/config.toml

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::{RagError, Result};
use crate::retrieval::RetrievalConfig;

/// Complete configuration for rolerag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qdrant: Option<QdrantConfig>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub access: AccessConfig,
}

/// Ollama connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
}

/// Qdrant backend configuration; absent means the in-process index is used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
    pub dimension: u64,
}

/// File system paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: String,
}

/// Department to role mapping plus per-role capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Department readable by every role
    pub universal: String,
    /// Department -> roles allowed to read it
    pub departments: BTreeMap<String, Vec<String>>,
    /// Capability flags for roles that need them
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub name: String,
    /// Sees every document regardless of its allowed roles
    #[serde(default)]
    pub bypass_filter: bool,
    /// May add documents at runtime
    #[serde(default)]
    pub can_ingest: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            model: "llama3.2:3b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "rbac_documents".to_string(),
            dimension: 768,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "resources/data".to_string(),
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        let all = ["finance", "marketing", "hr", "engineering", "c-level", "employee"];
        let mut departments = BTreeMap::new();
        for dept in ["finance", "marketing", "hr", "engineering"] {
            departments.insert(dept.to_string(), vec![dept.to_string(), "c-level".to_string()]);
        }
        departments.insert(
            "general".to_string(),
            all.iter().map(|r| r.to_string()).collect(),
        );

        Self {
            universal: "general".to_string(),
            departments,
            roles: vec![RoleConfig {
                name: "c-level".to_string(),
                bypass_filter: true,
                can_ingest: true,
            }],
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| RagError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from the standard location, creating it with defaults when missing
    pub fn load_default() -> Result<Self> {
        let Some(config_path) = Self::default_path() else {
            return Ok(Config::default());
        };

        if config_path.exists() {
            return Self::load_from_file(&config_path);
        }

        let config = Config::default();
        if let Err(e) = config.save(&config_path) {
            tracing::debug!(error = %e, path = %config_path.display(), "could not write default config");
        }
        Ok(config)
    }

    /// Standard configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".rolerag").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.default_limit == 0 {
            return Err(RagError::ConfigError(
                "default_limit must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.overfetch_multiplier == 0 {
            return Err(RagError::ConfigError(
                "overfetch_multiplier must be greater than 0".to_string(),
            ));
        }

        if self.retrieval.index_timeout_ms == 0 {
            return Err(RagError::ConfigError(
                "index_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(qdrant) = &self.qdrant {
            if qdrant.dimension == 0 {
                return Err(RagError::ConfigError(
                    "qdrant dimension must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RagError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RagError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get document data directory
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.data_dir)
    }
}
