use std::{env, fs};

use crate::naming;
use crate::rules::{DetectionRules, RulesError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Failed to read rules file {path}: {source}")]
    RulesFile {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid rules file {path}: {source}")]
    Rules { path: String, source: RulesError },
}

/// Which database the generated server is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistenceProfile {
    /// In-memory H2, no setup.
    #[default]
    Embedded,
    /// PostgreSQL in a container, with compose files.
    Server,
}

impl PersistenceProfile {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "embedded" | "h2" | "h2-embedded" => Some(Self::Embedded),
            "server" | "postgres" | "postgresql" | "postgresql-docker" => Some(Self::Server),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Server => "server",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub persistence: PersistenceProfile,
    /// Root Java package of the server project.
    pub base_package: String,
    pub server_port: u16,
    /// Base URL the client and the API collection call.
    pub api_base_url: String,
    pub rules: DetectionRules,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            persistence: PersistenceProfile::Embedded,
            base_package: "com.example.demo".to_string(),
            server_port: 8080,
            api_base_url: "http://localhost:8080".to_string(),
            rules: DetectionRules::default(),
        }
    }
}

impl GeneratorConfig {
    /// Read `UMLGEN_*` variables, defaulting anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let persistence = match lookup("UMLGEN_PERSISTENCE") {
            Some(v) => PersistenceProfile::from_str(&v).ok_or(ConfigError::InvalidValue {
                key: "UMLGEN_PERSISTENCE",
                value: v,
            })?,
            None => defaults.persistence,
        };

        let base_package = lookup("UMLGEN_BASE_PACKAGE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.base_package);
        if !is_java_package(&base_package) {
            return Err(ConfigError::InvalidValue {
                key: "UMLGEN_BASE_PACKAGE",
                value: base_package,
            });
        }

        let server_port = match lookup("UMLGEN_SERVER_PORT") {
            Some(v) => match v.trim().parse::<u16>() {
                Ok(port) if port > 0 => port,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "UMLGEN_SERVER_PORT",
                        value: v,
                    });
                }
            },
            None => defaults.server_port,
        };

        let api_base_url = lookup("UMLGEN_API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", server_port));

        let rules = match lookup("UMLGEN_RULES_FILE") {
            Some(path) => load_rules(&path)?,
            None => defaults.rules,
        };

        Ok(Self {
            persistence,
            base_package,
            server_port,
            api_base_url,
            rules,
        })
    }

    /// `com.example.demo` -> `com.example`.
    pub fn group_id(&self) -> &str {
        self.base_package
            .rsplit_once('.')
            .map(|(group, _)| group)
            .unwrap_or(&self.base_package)
    }

    /// `com.example.demo` -> `demo`.
    pub fn artifact_id(&self) -> &str {
        self.base_package
            .rsplit_once('.')
            .map(|(_, artifact)| artifact)
            .unwrap_or(&self.base_package)
    }

    /// `demo` -> `DemoApplication`.
    pub fn application_class(&self) -> String {
        format!("{}Application", naming::upper_first(self.artifact_id()))
    }

    /// Source directory of the base package, e.g. `com/example/demo`.
    pub fn package_path(&self) -> String {
        self.base_package.replace('.', "/")
    }
}

fn is_java_package(s: &str) -> bool {
    s.split('.').all(|part| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

pub fn load_rules(path: &str) -> Result<DetectionRules, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::RulesFile {
        path: path.to_string(),
        source,
    })?;
    DetectionRules::from_json(&raw).map_err(|source| ConfigError::Rules {
        path: path.to_string(),
        source,
    })
}
