//! qexec local noisy simulator
//!
//! A state-vector simulator that runs one quantum trajectory per shot. The
//! backend's noise profile (depolarizing, p = 0.1, on gates, readout and
//! initialization by default) is written into the circuit as explicit
//! channels before simulation.
//!
//! # Performance
//!
//! | Qubits | Memory | Simulation Speed |
//! |--------|--------|------------------|
//! | 10 | ~16 KB | Instant |
//! | 15 | ~512 KB | Fast |
//! | 20 | ~16 MB | Slow with noise |
//!
//! Noiseless circuits are simulated once and sampled per shot; noisy ones
//! pay for a full simulation per shot.
//!
//! # Example
//!
//! ```ignore
//! use qexec_adapter_sim::SimulatorBackend;
//! use qexec_hal::{Backend, PollPolicy};
//! use qexec_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SimulatorBackend::new();
//!
//!     let circuit = Circuit::bell()?;
//!     let job_id = backend.submit(&circuit, 1000).await?;
//!     let result = backend.wait(&job_id, PollPolicy::default()).await?;
//!
//!     // Mostly 00 and 11, with some noise
//!     println!("Results: {:?}", result.counts);
//!
//!     Ok(())
//! }
//! ```

mod simulator;
mod statevector;

pub use simulator::{DEFAULT_MAX_QUBITS, DEFAULT_NOISE, LOCAL_SIMULATOR, SimulatorBackend};

use qexec_hal::BackendRegistry;

/// Register the simulator as `local-simulator`.
pub fn register(registry: &mut BackendRegistry) {
    registry.register::<SimulatorBackend>(LOCAL_SIMULATOR);
}
