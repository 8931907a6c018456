use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Network-layer family of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFamily {
    Inet4,
    Inet6,
}

/// DNS transport. Only UDP is currently operable; the other variants exist
/// on the configuration surface and are rejected when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Udp,
    Tcp,
    Http,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Udp => "udp",
            Transport::Tcp => "tcp",
            Transport::Http => "http",
        }
    }
}

/// Destination of an outgoing upstream query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Destination {
    pub transport: Transport,
    pub addr: SocketAddr,
}

impl Destination {
    pub fn udp(addr: SocketAddr) -> Self {
        Self {
            transport: Transport::Udp,
            addr,
        }
    }

    pub fn family(&self) -> NetworkFamily {
        if self.addr.is_ipv4() {
            NetworkFamily::Inet4
        } else {
            NetworkFamily::Inet6
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.transport.as_str(), self.addr)
    }
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(addr_str) = s.strip_prefix("udp://") {
            let addr = addr_str
                .parse::<SocketAddr>()
                .map_err(|_| format!("Invalid UDP address '{}'", addr_str))?;
            return Ok(Destination::udp(addr));
        }
        if let Some(addr_str) = s.strip_prefix("tcp://") {
            let addr = addr_str
                .parse::<SocketAddr>()
                .map_err(|_| format!("Invalid TCP address '{}'", addr_str))?;
            return Ok(Destination {
                transport: Transport::Tcp,
                addr,
            });
        }
        if let Some(addr_str) = s.strip_prefix("http://") {
            let addr = addr_str
                .parse::<SocketAddr>()
                .map_err(|_| format!("Invalid HTTP address '{}'", addr_str))?;
            return Ok(Destination {
                transport: Transport::Http,
                addr,
            });
        }
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Destination::udp(addr));
        }
        Err(format!(
            "Invalid destination '{}'. Expected: udp://IP:PORT, tcp://IP:PORT, http://IP:PORT, or IP:PORT",
            s
        ))
    }
}
