use serde::{Deserialize, Serialize};

/// Downstream publisher configuration (C4). The worker only needs enough
/// to construct a `Publisher`; the wire format of each sink is the
/// collaborator's concern, not the core's.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Message bus sink: a topic plus a broker list.
    Bus { brokers: Vec<String>, topic: String },
    /// RPC sink: a single call endpoint.
    Rpc { endpoint: String },
    /// Structured-log sink, used in tests and local runs.
    Log,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Log
    }
}
