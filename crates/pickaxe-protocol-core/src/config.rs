use serde::Deserialize;

/// Per-connection pipeline settings, shared by every connection a host
/// accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Log every transformed packet at info level.
    #[serde(default)]
    pub debug: bool,
    /// Upper bound on packets a phase bridge holds back for one connection.
    #[serde(default = "default_max_queued_packets")]
    pub max_queued_packets: usize,
}

fn default_max_queued_packets() -> usize {
    4096
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            max_queued_packets: default_max_queued_packets(),
        }
    }
}
