//! Cyclone DNS request/response cycle engine.
//!
//! Inbound UDP queries drive a [`DnsHandler`] through non-blocking ticks.
//! A tick may finish the exchange, ask to be resumed after a delay, or wait
//! on an upstream sub-query tracked with fixed-delay resends. The engine
//! owns the per-cycle slot storage, the outgoing request tracking, and the
//! wire codec the handler reads and writes through.

pub mod cycle;
pub mod handler;
pub mod pool;
pub mod request_id;
pub mod server;
pub mod tracker;
pub mod wire;

pub use cycle::{CycleContext, CycleEngine, Transmit};
pub use handler::{CycleStatus, DnsHandler, HandlerError};
pub use request_id::RequestId;
pub use server::DnsServer;
