//! Remote translation source
mod client;
mod error;

pub use client::RemoteClient;
pub use error::RemoteError;
