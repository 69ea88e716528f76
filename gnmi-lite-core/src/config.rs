//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables of the configuration engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of each subscription's outbound response channel.
    ///
    /// The per-client update queue in front of it is unbounded; a slow reader
    /// stalls its own consumer task, not the broadcaster.
    pub subscription_buffer: usize,

    /// Protocol version reported by Capabilities.
    pub gnmi_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            subscription_buffer: 64,
            gnmi_version: crate::server::GNMI_VERSION.to_string(),
        }
    }
}

impl EngineConfig {
    /// Set the subscription buffer size.
    pub fn subscription_buffer(mut self, size: usize) -> Self {
        self.subscription_buffer = size;
        self
    }
}
