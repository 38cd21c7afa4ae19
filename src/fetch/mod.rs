mod basic;
mod client;
pub mod auth;
pub mod query;

pub use basic::BasicClient;
pub use client::{Delivery, HttpClient, TlsOptions, TransportError, TransportErrorKind};
