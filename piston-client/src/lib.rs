//! # Piston Client
//!
//! A small asynchronous client for Piston-compatible remote code execution
//! services. It covers the two calls a gateway needs: submitting a program
//! for execution and listing the installed runtimes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use piston_client::{ExecuteRequest, PistonClient, PistonConfig, SourceFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = PistonClient::new(PistonConfig::new("http://localhost:2000"))?;
//!
//!     let response = client
//!         .execute(&ExecuteRequest {
//!             language: "python".to_string(),
//!             version: "3.10.0".to_string(),
//!             files: vec![SourceFile {
//!                 name: "main.py".to_string(),
//!                 content: "print(1 + 1)".to_string(),
//!             }],
//!             stdin: String::new(),
//!             run_memory_limit: None,
//!         })
//!         .await?;
//!
//!     println!("{:?}", response.run);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Non-2xx answers surface as [`Error::Api`] with the remote status code;
//! transport and decoding failures surface as [`Error::HttpClient`].
//! [`Error::is_transient`] tells callers whether a retry is worthwhile.

mod client;
mod config;
mod error;
mod types;

pub use client::PistonClient;
pub use config::PistonConfig;
pub use error::Error;
pub use types::*;

/// Result type for Piston client operations
pub type Result<T> = std::result::Result<T, Error>;
