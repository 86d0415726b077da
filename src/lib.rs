// Expose modules as public for use by the binary and integration tests
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod nl;
pub mod output;
pub mod validate;

// Re-export the types most callers need
pub use client::{ClientError, CypherClient, ServiceClient};
pub use config::Config;
pub use output::{FormatOptions, OutputFormat};
