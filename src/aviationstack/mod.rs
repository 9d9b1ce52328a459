//! Aviationstack API client with retry, timeout and error mapping.

mod client;
mod config;
mod error;
mod types;

pub use client::{AviationstackClient, FetchResource};
pub use config::ClientConfig;
pub use error::ErrorPayload;
pub use types::{Meta, SuccessEnvelope};

#[cfg(test)]
pub use client::MockFetchResource;
