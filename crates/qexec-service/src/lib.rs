//! Braket circuit execution service.
//!
//! Accepts JAQCD programs over HTTP, runs them asynchronously on the local
//! simulator or an Amazon Braket device, and stores the measurement
//! histogram for later retrieval.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  reserve + create row   ┌─────────────┐
//! │  rest::router │ ──────────────────────→ │ ResultStore │
//! └──────┬───────┘                          └──────▲──────┘
//!        │ send                                    │ complete (once)
//!        ▼                                         │
//! ┌──────────────┐  dequeue  ┌──────────┐  submit/wait  ┌─────────────────┐
//! │   JobQueue   │ ────────→ │ Pipeline │ ────────────→ │ BackendRegistry │
//! └──────────────┘           └──────────┘               └─────────────────┘
//! ```
//!
//! # Features
//!
//! - **braket**: Amazon Braket devices (default)
//! - **sqlite**: `SQLite` result store
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use qexec_service::{Config, ServiceContext, rest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let addr = config.socket_address()?;
//!     let ctx = Arc::new(ServiceContext::build(config).await?);
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, rest::router(ctx)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod download;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod queue;
pub mod rest;
pub mod source;
pub mod storage;
pub mod tracing_config;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use context::{ServiceContext, default_registry};
pub use error::{ApiError, PipelineError, ServiceError, StoreError};
pub use pipeline::{JobParams, JobStage, Pipeline};
pub use queue::JobQueue;
pub use source::CircuitSource;
pub use storage::{MemoryStore, ResultRecord, ResultStore};

#[cfg(feature = "sqlite")]
pub use storage::SqliteStore;
pub use tracing_config::{TracingConfig, TracingFormat, init_default_tracing, init_tracing};
