use serde::{Deserialize, Serialize};

/// Settings for the built-in verbatim-forward handler.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForwardConfig {
    /// Upstream resolver, e.g. `udp://8.8.8.8:53` or `1.1.1.1:53`.
    #[serde(default = "default_upstream")]
    pub upstream: String,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            upstream: default_upstream(),
        }
    }
}

fn default_upstream() -> String {
    "udp://8.8.8.8:53".to_string()
}
