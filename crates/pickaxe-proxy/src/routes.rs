use crate::config::{MappingPaths, ProxyConfig};
use anyhow::Context;
use pickaxe_mappings::MappingData;
use pickaxe_protocol_core::{base_translator, Translator};
use pickaxe_types::ProtocolVersion;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// The translators a connection needs, by client protocol, for the one
/// backend version this proxy relays to. Built once and shared by every
/// connection; translators hold no per-connection state.
pub struct Routes {
    backend: ProtocolVersion,
    base: Arc<Translator>,
    chains: HashMap<i32, Vec<Arc<Translator>>>,
}

impl Routes {
    pub fn build(config: &ProxyConfig) -> anyhow::Result<Self> {
        let backend = ProtocolVersion::from_number(config.backend_protocol)
            .with_context(|| format!("unsupported backend protocol {}", config.backend_protocol))?;
        let base = Arc::new(base_translator(backend)?);

        let mut chains = HashMap::new();
        for (client, translator) in translators_for(backend, &config.mappings)? {
            info!("Accepting {} clients through {}", client, translator.id());
            chains.insert(client.number, vec![Arc::new(translator)]);
        }
        Ok(Self { backend, base, chains })
    }

    pub fn backend(&self) -> ProtocolVersion {
        self.backend
    }

    pub fn base(&self) -> Arc<Translator> {
        self.base.clone()
    }

    /// Translators for a client, ordered from the client end. Empty for
    /// clients that speak the backend's protocol, `None` for clients that
    /// cannot be served.
    pub fn chain(&self, client_protocol: i32) -> Option<Vec<Arc<Translator>>> {
        if client_protocol == self.backend.number {
            return Some(Vec::new());
        }
        self.chains.get(&client_protocol).cloned()
    }
}

fn translators_for(backend: ProtocolVersion, paths: &MappingPaths) -> anyhow::Result<Vec<(ProtocolVersion, Translator)>> {
    let mut translators = Vec::new();
    if backend == ProtocolVersion::V1_16_1 {
        let mappings = load_mappings(paths.v1_16_2.as_deref())?;
        translators.push((ProtocolVersion::V1_16_2, pickaxe_protocol_v1_16_2::translator(mappings)?));
    }
    if backend == ProtocolVersion::V1_20 {
        let mappings = load_mappings(paths.v1_20_2.as_deref())?;
        translators.push((ProtocolVersion::V1_20_2, pickaxe_protocol_v1_20_2::translator(mappings)?));
    }
    if translators.is_empty() {
        warn!("No translators target {}, only clients of that version can join", backend);
    }
    Ok(translators)
}

fn load_mappings(path: Option<&Path>) -> anyhow::Result<Arc<MappingData>> {
    match path {
        Some(path) => {
            let data = MappingData::load(path).with_context(|| format!("loading mappings from {}", path.display()))?;
            info!("Loaded mappings from {}", path.display());
            Ok(Arc::new(data))
        }
        None => {
            warn!("No mapping file configured, ids pass through unchanged");
            Ok(Arc::new(MappingData::identity()))
        }
    }
}
