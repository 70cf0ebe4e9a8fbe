pub mod client;
pub mod wire;

pub use client::{DEFAULT_API_BASE_URL, FastlyClient, FastlyConfig};
