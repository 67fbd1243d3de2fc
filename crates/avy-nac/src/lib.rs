//! Client for the public avalanche center product API.
//!
//! Provides the regional synopsis product with request-scoped cache keys.

pub mod client;
pub mod error;
pub mod types;

pub use client::{SynopsisCache, SynopsisClient};
pub use error::NacError;
pub use types::*;
