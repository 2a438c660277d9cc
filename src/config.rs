use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::graph::DuplicatePolicy;

const CONFIG_ENV: &str = "MUBINGRAPH_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "mubingraph.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mubingraph: GeneralConfig,
    /// Logical source names mapped to map unit directories
    #[serde(default)]
    pub sources: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub schema: XmlSchema,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Tool-wide settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the flat index, filtered subgraphs and rendered graphs.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Element and attribute names used when extracting objects from map unit XML.
///
/// Objects are `<item>` children of `<object_list>` directly under the root;
/// links are `<item>` children of `<link_list>` inside an object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct XmlSchema {
    pub object_list: String,
    pub item: String,
    pub object_id: String,
    pub object_name: String,
    pub link_list: String,
    pub link_target: String,
    pub link_type: String,
}

impl Default for XmlSchema {
    fn default() -> Self {
        Self {
            object_list: "Objs".to_string(),
            item: "value".to_string(),
            object_id: "HashId".to_string(),
            object_name: "UnitConfigName".to_string(),
            link_list: "LinksToObj".to_string(),
            link_target: "DestUnitHashId".to_string(),
            link_type: "DefinitionName".to_string(),
        }
    }
}

impl XmlSchema {
    fn names(&self) -> [(&'static str, &str); 7] {
        [
            ("object_list", &self.object_list),
            ("item", &self.item),
            ("object_id", &self.object_id),
            ("object_name", &self.object_name),
            ("link_list", &self.link_list),
            ("link_target", &self.link_target),
            ("link_type", &self.link_type),
        ]
    }

    /// Stable textual form folded into the source fingerprint.
    pub fn fingerprint_input(&self) -> String {
        self.names()
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// Reachability settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub duplicates: DuplicatePolicy,
}

/// DOT rendering and viewer settings
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_graph_name")]
    pub graph_name: String,
    #[serde(default = "default_rankdir")]
    pub rankdir: String,
    #[serde(default = "default_node_shape")]
    pub node_shape: String,
    /// Drop edges whose target has no node statement in the subgraph.
    #[serde(default)]
    pub omit_dangling: bool,
    /// Command used by `--view`; extra whitespace-separated words become leading arguments.
    #[serde(default = "default_viewer")]
    pub viewer: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            graph_name: default_graph_name(),
            rankdir: default_rankdir(),
            node_shape: default_node_shape(),
            omit_dangling: false,
            viewer: default_viewer(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_graph_name() -> String {
    "mubin".to_string()
}

fn default_rankdir() -> String {
    "LR".to_string()
}

fn default_node_shape() -> String {
    "box".to_string()
}

fn default_viewer() -> String {
    "xdot".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in MUBINGRAPH_CONFIG environment variable (must exist)
    /// 2. ./mubingraph.toml in current directory
    /// 3. Built-in defaults when neither is present
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Config::default()
                }
            }
        };

        config.validate()?;

        Ok(config)
    }

    /// Parse a specific config file without validating it.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.mubingraph.cache_dir.as_os_str().is_empty() {
            anyhow::bail!("mubingraph.cache_dir must not be empty");
        }

        if !matches!(
            self.mubingraph.log_level.to_lowercase().as_str(),
            "off" | "error" | "warn" | "info" | "debug" | "trace"
        ) {
            anyhow::bail!(
                "mubingraph.log_level must be one of off, error, warn, info, debug, trace (got {:?})",
                self.mubingraph.log_level
            );
        }

        for (key, value) in self.schema.names() {
            if value.trim().is_empty() {
                anyhow::bail!("schema.{} must not be empty", key);
            }
        }

        if self.render.graph_name.trim().is_empty() {
            anyhow::bail!("render.graph_name must not be empty");
        }

        Ok(())
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.mubingraph.cache_dir
    }

    /// Look up a logical source name from the `[sources]` table.
    pub fn source(&self, name: &str) -> Option<&Path> {
        self.sources.get(name).map(PathBuf::as_path)
    }
}
