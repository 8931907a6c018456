use serde::{Deserialize, Serialize};

use crate::destination::{NetworkFamily, Transport};

/// One listening endpoint. Only UDP listeners can currently be created;
/// TCP/HTTP descriptors are accepted here and rejected at listener setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    #[serde(default = "default_family")]
    pub family: NetworkFamily,

    #[serde(default = "default_transport")]
    pub transport: Transport,

    pub address: String,

    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// UDP listening port.
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,

    /// TCP listening port. Zero means disabled; non-zero is rejected at
    /// engine creation ("not yet supported", not removed from the surface).
    #[serde(default)]
    pub tcp_port: u16,

    /// HTTP listening port. Same contract as `tcp_port`.
    #[serde(default)]
    pub http_port: u16,

    #[serde(default)]
    pub listeners: Vec<ListenerConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            udp_port: default_udp_port(),
            tcp_port: 0,
            http_port: 0,
            listeners: vec![],
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_udp_port() -> u16 {
    53
}

fn default_family() -> NetworkFamily {
    NetworkFamily::Inet4
}

fn default_transport() -> Transport {
    Transport::Udp
}
