use std::{env, fs, path::PathBuf, sync::Arc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::id::{IdGenerator, SequenceGenerator, UuidGenerator};

pub const SEAL_ON_START: &str = "ROUTEKIT_SEAL_ON_START";
pub const ID_STRATEGY: &str = "ROUTEKIT_ID_STRATEGY";
pub const NODE_TAG: &str = "ROUTEKIT_NODE_TAG";

#[typetag::serde]
pub trait ConfigManagerType: Send + Sync {
    fn as_vec(&self) -> Vec<(String, String)> {
        let mut config = vec![];
        for key in self.keys() {
            if let Some(value) = self.get(&key) {
                config.push((key, value));
            }
        }
        config
    }
    fn keys(&self) -> Vec<String>;
    fn get(&self, key: &str) -> Option<String>;
    fn del(&self, key: &str);
    fn set(&self, key: &str, value: &str) -> Result<(), String>;
    fn clone_box(&self) -> Box<dyn ConfigManagerType>;
    fn debug_box(&self) -> String;
}

/// Configuration shared by the context and every component it creates.
#[derive(Serialize, Deserialize)]
pub struct ConfigManager(pub Box<dyn ConfigManagerType>);

impl ConfigManager {
    pub fn into_inner(self) -> Box<dyn ConfigManagerType> {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.0.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(|value| {
            matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        ConfigManager(MapConfigManager::new())
    }
}

impl Clone for ConfigManager {
    fn clone(&self) -> Self {
        ConfigManager(self.0.clone_box())
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.debug_box())
    }
}

/// Reads the process environment, seeded from a `.env` file. `set`/`del`
/// also rewrite that file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnvConfigManager {
    env_file: PathBuf,
}

impl EnvConfigManager {
    pub fn new(env_file: PathBuf) -> Box<Self> {
        if env_file.exists() {
            dotenvy::from_path(&env_file).ok();
            info!("Loaded .env from {}", env_file.display());
        } else {
            warn!("could not load .env from {}", env_file.display())
        }

        Box::new(Self { env_file })
    }
}

#[typetag::serde]
impl ConfigManagerType for EnvConfigManager {
    fn keys(&self) -> Vec<String> {
        env::vars().map(|(k, _)| k).collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        unsafe {
            env::set_var(key, value);
        };
        let content = fs::read_to_string(&self.env_file).unwrap_or_default();
        let mut lines: Vec<String> = Vec::new();
        let mut found = false;

        for line in content.lines() {
            match line.split_once('=') {
                Some((k, _)) if k.trim() == key => {
                    lines.push(format!("{key}={value}"));
                    found = true;
                }
                _ => lines.push(line.to_string()),
            }
        }

        if !found {
            lines.push(format!("{key}={value}"));
        }

        fs::write(&self.env_file, lines.join("\n")).map_err(|e| e.to_string())
    }

    fn del(&self, key: &str) {
        unsafe {
            env::remove_var(key);
        };
        if let Ok(content) = fs::read_to_string(&self.env_file) {
            let lines: Vec<&str> = content
                .lines()
                .filter(|line| match line.split_once('=') {
                    Some((k, _)) => k.trim() != key,
                    None => true,
                })
                .collect();

            let _ = fs::write(&self.env_file, lines.join("\n"));
        }
    }

    fn clone_box(&self) -> Box<dyn ConfigManagerType> {
        Box::new(self.clone())
    }

    fn debug_box(&self) -> String {
        "EnvConfigManager".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MapConfigManager {
    map: DashMap<String, String>,
}

impl MapConfigManager {
    pub fn new() -> Box<Self> {
        Box::new(Self {
            map: DashMap::new(),
        })
    }

    pub fn with<K: Into<String>, V: Into<String>>(self: Box<Self>, key: K, value: V) -> Box<Self> {
        self.map.insert(key.into(), value.into());
        self
    }
}

#[typetag::serde]
impl ConfigManagerType for MapConfigManager {
    fn keys(&self) -> Vec<String> {
        self.map.iter().map(|entry| entry.key().clone()).collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn del(&self, key: &str) {
        self.map.remove(key);
    }

    fn clone_box(&self) -> Box<dyn ConfigManagerType> {
        Box::new(self.clone())
    }

    fn debug_box(&self) -> String {
        format!("MapConfigManager({} entries)", self.map.len())
    }
}

/// How a context hands out route and exchange ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Uuid,
    Sequence,
}

impl IdStrategy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "uuid" => Some(IdStrategy::Uuid),
            "sequence" => Some(IdStrategy::Sequence),
            _ => None,
        }
    }
}

/// The knobs the context itself reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Refuse component registration once the context has been started.
    pub seal_on_start: bool,
    pub id_strategy: IdStrategy,
    /// Prefix of sequence ids.
    pub node_tag: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            seal_on_start: false,
            id_strategy: IdStrategy::Uuid,
            node_tag: "node".to_string(),
        }
    }
}

impl ContextConfig {
    pub fn from_manager(config: &ConfigManager) -> Self {
        let defaults = ContextConfig::default();
        let id_strategy = match config.get(ID_STRATEGY) {
            Some(value) => IdStrategy::parse(&value).unwrap_or_else(|| {
                warn!("unknown {ID_STRATEGY} `{value}`, using uuid");
                IdStrategy::Uuid
            }),
            None => defaults.id_strategy,
        };
        Self {
            seal_on_start: config.get_bool(SEAL_ON_START).unwrap_or(defaults.seal_on_start),
            id_strategy,
            node_tag: config.get(NODE_TAG).unwrap_or(defaults.node_tag),
        }
    }

    pub fn id_generator(&self) -> Arc<dyn IdGenerator> {
        match self.id_strategy {
            IdStrategy::Uuid => Arc::new(UuidGenerator),
            IdStrategy::Sequence => Arc::new(SequenceGenerator::new(self.node_tag.clone())),
        }
    }
}
