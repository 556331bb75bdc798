//! Simulator backend implementation.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, instrument};
use uuid::Uuid;

use qexec_hal::{
    Backend, BackendConfig, BackendFactory, Capabilities, Counts, ExecutionResult, HalError,
    HalResult, JobId, JobStatus,
};
use qexec_ir::{Circuit, Instruction, NoiseProfile};

use crate::statevector::{Statevector, sample_index};

/// Name the simulator registers under.
pub const LOCAL_SIMULATOR: &str = "local-simulator";

/// Depolarizing probability injected on gates, readout and initialization.
pub const DEFAULT_NOISE: f64 = 0.1;

/// Largest circuit width the simulator accepts.
pub const DEFAULT_MAX_QUBITS: u32 = 20;

/// Job data for the simulator.
struct SimJob {
    status: JobStatus,
    result: Option<ExecutionResult>,
}

/// Local noisy simulator backend.
///
/// Runs one state-vector trajectory per shot, with the capability's noise
/// profile inserted into the circuit first. Circuits are limited to
/// [`DEFAULT_MAX_QUBITS`] unless configured otherwise.
pub struct SimulatorBackend {
    /// Backend configuration.
    config: BackendConfig,
    capabilities: Capabilities,
    /// Finished jobs.
    jobs: Arc<Mutex<FxHashMap<String, SimJob>>>,
}

impl SimulatorBackend {
    /// Create a simulator with the default noise profile.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_MAX_QUBITS, DEFAULT_NOISE)
    }

    /// Create a simulator that injects no noise.
    pub fn noiseless() -> Self {
        Self::with_settings(DEFAULT_MAX_QUBITS, 0.0)
    }

    /// Create a simulator with custom width limit and depolarizing noise.
    /// A `noise` of zero disables noise injection.
    pub fn with_settings(max_qubits: u32, noise: f64) -> Self {
        Self::build(BackendConfig::new(LOCAL_SIMULATOR), max_qubits, noise)
    }

    fn build(config: BackendConfig, max_qubits: u32, noise: f64) -> Self {
        let mut capabilities = Capabilities::simulator(config.name.clone(), max_qubits);
        if noise > 0.0 {
            capabilities = capabilities.with_noise_profile(NoiseProfile::depolarizing(noise));
        }
        Self {
            config,
            capabilities,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    fn check_shots(&self, shots: u32) -> HalResult<()> {
        if shots == 0 || shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{shots} is outside 1..={}",
                self.capabilities.max_shots
            )));
        }
        Ok(())
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `shots` trajectories of `circuit`.
#[instrument(skip(circuit))]
fn run_simulation(circuit: &Circuit, shots: u32) -> HalResult<ExecutionResult> {
    let start = Instant::now();
    let num_qubits = circuit.width();
    let instructions = circuit.instructions();
    let noisy = instructions.iter().any(Instruction::is_noise);
    debug!(
        num_qubits,
        instructions = instructions.len(),
        noisy,
        "starting simulation"
    );

    let mut rng = rand::thread_rng();
    let mut counts = Counts::new();

    if noisy {
        for shot in 0..shots {
            let mut sv = Statevector::new(num_qubits);
            for inst in instructions {
                sv.apply(inst, &mut rng)?;
            }
            let outcome = sv.sample(&mut rng);
            counts.insert(sv.outcome_to_bitstring(outcome), 1);

            if shot > 0 && shot % 1000 == 0 {
                debug!(shot, "completed shots");
            }
        }
    } else {
        // Without noise every shot sees the same final state.
        let mut sv = Statevector::new(num_qubits);
        for inst in instructions {
            sv.apply(inst, &mut rng)?;
        }
        let probabilities = sv.probabilities();
        for _ in 0..shots {
            let outcome = sample_index(&probabilities, &mut rng);
            counts.insert(sv.outcome_to_bitstring(outcome), 1);
        }
    }

    let elapsed = start.elapsed();
    debug!(?elapsed, "simulation completed");

    Ok(ExecutionResult::new(counts, shots)
        .with_execution_time(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)))
}

#[async_trait]
impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn depth(&self, circuit: &Circuit) -> HalResult<usize> {
        // DAG size is linear in width.
        self.validate(circuit)?;
        Ok(circuit.depth()?)
    }

    #[instrument(skip(self, circuit), fields(backend = %self.config.name))]
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        self.validate(circuit)?;
        self.check_shots(shots)?;
        if circuit.width() == 0 {
            return Err(HalError::InvalidCircuit(
                "circuit references no qubits".into(),
            ));
        }
        if let Some(name) = circuit.free_parameters().into_iter().next() {
            return Err(HalError::InvalidCircuit(format!(
                "unbound parameter '{name}'"
            )));
        }

        let prepared = match &self.capabilities.noise_profile {
            Some(profile) => circuit.with_noise(profile),
            None => circuit.clone(),
        };

        let result = tokio::task::spawn_blocking(move || run_simulation(&prepared, shots))
            .await
            .map_err(|e| HalError::Backend(format!("simulation task failed: {e}")))??;

        let job_id = JobId::new(Uuid::new_v4().to_string());
        {
            let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            jobs.insert(
                job_id.0.clone(),
                SimJob {
                    status: JobStatus::Completed,
                    result: Some(result),
                },
            );
        }

        debug!(job_id = %job_id, shots, "simulation job completed");
        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.get(&job_id.0)
            .map(|j| j.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.get(&job_id.0)
            .and_then(|j| j.result.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
    }
}

impl BackendFactory for SimulatorBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let max_qubits = config
            .extra
            .get("max_qubits")
            .and_then(serde_json::Value::as_u64)
            .map_or(Ok(DEFAULT_MAX_QUBITS), u32::try_from)
            .map_err(|_| HalError::Configuration("max_qubits out of range".into()))?;
        let noise = config
            .extra
            .get("noise")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(DEFAULT_NOISE);
        if !(0.0..=1.0).contains(&noise) {
            return Err(HalError::Configuration(format!(
                "noise must be within [0, 1], got {noise}"
            )));
        }

        Ok(Self::build(config, max_qubits, noise))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qexec_ir::{NoiseModel, ParameterExpression, QubitId, StandardGate};

    #[test]
    fn test_simulator_capabilities() {
        let backend = SimulatorBackend::new();
        let caps = backend.capabilities();

        assert!(caps.is_simulator);
        assert_eq!(caps.num_qubits, 20);
        assert_eq!(backend.name(), "local-simulator");
        assert_eq!(
            caps.noise_profile.as_ref().and_then(|p| p.gate.clone()),
            Some(NoiseModel::Depolarizing { probability: 0.1 })
        );
        assert!(SimulatorBackend::noiseless().capabilities().noise_profile.is_none());
    }

    #[tokio::test]
    async fn test_simulator_bell_state() {
        let backend = SimulatorBackend::noiseless();

        let circuit = Circuit::bell().unwrap();
        let job_id = backend.submit(&circuit, 1000).await.unwrap();

        let status = backend.status(&job_id).await.unwrap();
        assert_eq!(status, JobStatus::Completed);

        let result = backend.result(&job_id).await.unwrap();
        assert_eq!(result.shots, 1000);

        // Bell state should produce only 00 and 11
        let counts = &result.counts;
        assert_eq!(counts.get("00") + counts.get("11"), 1000);
        assert_eq!(counts.get("01") + counts.get("10"), 0);
    }

    #[tokio::test]
    async fn test_simulator_ghz_state() {
        let backend = SimulatorBackend::noiseless();

        let circuit = Circuit::ghz(3).unwrap();
        let job_id = backend.submit(&circuit, 1000).await.unwrap();

        let result = backend.result(&job_id).await.unwrap();

        // GHZ state should produce only 000 and 111
        let counts = &result.counts;
        assert_eq!(counts.get("000") + counts.get("111"), 1000);
    }

    #[tokio::test]
    async fn test_bitstring_order() {
        let backend = SimulatorBackend::noiseless();
        let mut circuit = Circuit::new();
        circuit.x(QubitId(0)).unwrap();
        circuit
            .push(Instruction::single_qubit_gate(StandardGate::I, QubitId(2)))
            .unwrap();

        let job_id = backend.submit(&circuit, 10).await.unwrap();
        let result = backend.result(&job_id).await.unwrap();
        assert_eq!(result.counts.get("100"), 10);
    }

    #[tokio::test]
    async fn test_default_noise_spreads_outcomes() {
        let backend = SimulatorBackend::new();
        let mut circuit = Circuit::new();
        circuit.x(QubitId(0)).unwrap();

        let job_id = backend.submit(&circuit, 2000).await.unwrap();
        let result = backend.result(&job_id).await.unwrap();

        assert_eq!(result.counts.total(), 2000);
        assert!(result.counts.get("1") > 1000);
        assert!(result.counts.get("0") > 0);
    }

    #[tokio::test]
    async fn test_simulator_too_many_qubits() {
        let backend = SimulatorBackend::with_settings(5, 0.0);

        let mut circuit = Circuit::new();
        circuit.h(QubitId(9)).unwrap();
        let result = backend.submit(&circuit, 100).await;

        assert!(matches!(result, Err(HalError::InvalidCircuit(_))));
    }

    #[tokio::test]
    async fn test_unbound_parameter_rejected() {
        let backend = SimulatorBackend::noiseless();
        let mut circuit = Circuit::new();
        circuit
            .rx(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();

        let err = backend.submit(&circuit, 10).await.unwrap_err();
        assert!(matches!(err, HalError::InvalidCircuit(msg) if msg.contains("theta")));
    }

    #[tokio::test]
    async fn test_invalid_shots() {
        let backend = SimulatorBackend::noiseless();
        let circuit = Circuit::bell().unwrap();
        assert!(matches!(
            backend.submit(&circuit, 0).await,
            Err(HalError::InvalidShots(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let backend = SimulatorBackend::new();
        let err = backend.status(&JobId::new("missing")).await.unwrap_err();
        assert!(matches!(err, HalError::JobNotFound(_)));
    }

    #[test]
    fn test_depth_supported() {
        let backend = SimulatorBackend::new();
        assert_eq!(backend.depth(&Circuit::ghz(3).unwrap()).unwrap(), 3);
    }

    #[test]
    fn test_depth_rejects_oversized_circuit() {
        let backend = SimulatorBackend::new();
        let mut circuit = Circuit::new();
        circuit.x(QubitId(u32::MAX)).unwrap();

        let err = backend.depth(&circuit).unwrap_err();
        assert!(matches!(err, HalError::InvalidCircuit(_)));
    }

    #[test]
    fn test_from_config() {
        let mut config = BackendConfig::new("LOCAL-SIMULATOR");
        config.extra.insert("max_qubits".into(), serde_json::json!(8));
        config.extra.insert("noise".into(), serde_json::json!(0.0));
        let backend = SimulatorBackend::from_config(config).unwrap();

        assert_eq!(backend.capabilities().num_qubits, 8);
        assert!(backend.capabilities().noise_profile.is_none());

        let mut bad = BackendConfig::new("local-simulator");
        bad.extra.insert("noise".into(), serde_json::json!(2.0));
        assert!(SimulatorBackend::from_config(bad).is_err());
    }
}
