pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod types;
