//! qexec backend abstraction
//!
//! The contract between the execution pipeline and whatever runs circuits:
//! the [`Backend`] trait, the task lifecycle ([`JobId`], [`JobStatus`]),
//! results ([`ExecutionResult`]) and name-based resolution through the
//! [`BackendRegistry`].

pub mod backend;
pub mod capability;
pub mod error;
pub mod job;
pub mod registry;
pub mod result;

pub use backend::{Backend, BackendConfig, BackendFactory, PollPolicy};
pub use capability::Capabilities;
pub use error::{HalError, HalResult};
pub use job::{JobId, JobStatus};
pub use registry::BackendRegistry;
pub use result::{Counts, ExecutionResult};
