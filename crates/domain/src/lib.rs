//! Cyclone DNS Domain Layer
pub mod config;
pub mod destination;
pub mod errors;
pub mod packet_fields;
pub mod record_class;
pub mod record_type;

pub use config::{CliOverrides, Config, ListenerConfig, ServerConfig};
pub use destination::{Destination, NetworkFamily, Transport};
pub use errors::EngineError;
pub use packet_fields::{Opcode, ResponseCode};
pub use record_class::RecordClass;
pub use record_type::RecordType;
