//! HTTP transport

pub mod transport;

pub use transport::{ReqwestTransport, ReqwestTransportBuilder};
