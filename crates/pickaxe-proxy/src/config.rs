use pickaxe_protocol_core::PipelineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Address of the server clients are relayed to.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Protocol number the backend speaks.
    #[serde(default = "default_backend_protocol")]
    pub backend_protocol: i32,
    #[serde(default)]
    pub mappings: MappingPaths,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Mapping data files per translator. Translators without one run on
/// identity mappings.
#[derive(Debug, Default, Deserialize)]
pub struct MappingPaths {
    pub v1_16_2: Option<PathBuf>,
    pub v1_20_2: Option<PathBuf>,
}

fn default_bind() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    25566
}

fn default_backend() -> String {
    "127.0.0.1:25565".into()
}

fn default_backend_protocol() -> i32 {
    763
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            backend: default_backend(),
            backend_protocol: default_backend_protocol(),
            mappings: MappingPaths::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ProxyConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: ProxyConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }
}
