//! Device names, ARNs and capability presets.
//!
//! Known devices get presets; any other well-formed Braket device ARN is
//! accepted with a permissive preset and left to Braket to validate.

use qexec_hal::Capabilities;

// ──────────────────────────────────────────────────────────────────────
// Known device ARNs
// ──────────────────────────────────────────────────────────────────────

/// Rigetti Ankaa-3 (84 qubits, superconducting).
pub const RIGETTI_ANKAA_3: &str = "arn:aws:braket:us-west-1::device/qpu/rigetti/Ankaa-3";

/// IonQ Aria (25 qubits, trapped-ion).
pub const IONQ_ARIA: &str = "arn:aws:braket:us-east-1::device/qpu/ionq/Aria-1";

/// IonQ Forte (36 qubits, trapped-ion).
pub const IONQ_FORTE: &str = "arn:aws:braket:us-east-1::device/qpu/ionq/Forte-1";

/// IQM Garnet (20 qubits, superconducting).
pub const IQM_GARNET: &str = "arn:aws:braket:eu-north-1::device/qpu/iqm/Garnet";

/// SV1 state vector simulator.
pub const SV1: &str = "arn:aws:braket:::device/quantum-simulator/amazon/sv1";

/// TN1 tensor network simulator.
pub const TN1: &str = "arn:aws:braket:::device/quantum-simulator/amazon/tn1";

/// DM1 density matrix simulator.
pub const DM1: &str = "arn:aws:braket:::device/quantum-simulator/amazon/dm1";

const ARN_PREFIX: &str = "arn:aws:braket:";

/// Width assumed for devices without a preset.
const UNKNOWN_DEVICE_QUBITS: u32 = 100;

/// Map a friendly device name to its ARN.
pub fn arn_for_name(name: &str) -> Option<&'static str> {
    match name.to_lowercase().as_str() {
        "rigetti" | "ankaa" | "ankaa-3" | "rigetti-ankaa" => Some(RIGETTI_ANKAA_3),
        "ionq" | "aria" | "ionq-aria" => Some(IONQ_ARIA),
        "forte" | "ionq-forte" => Some(IONQ_FORTE),
        "garnet" | "iqm-garnet" => Some(IQM_GARNET),
        "sv1" | "braket-sv1" => Some(SV1),
        "tn1" | "braket-tn1" => Some(TN1),
        "dm1" | "braket-dm1" => Some(DM1),
        _ => None,
    }
}

/// Check whether `name` has the shape of a Braket device ARN.
pub fn is_device_arn(name: &str) -> bool {
    name.starts_with(ARN_PREFIX) && name.contains(":device/") && device_segments(name).is_some()
}

/// Resolve a device name or ARN to an ARN.
pub fn resolve_device(name: &str) -> Option<String> {
    if is_device_arn(name) {
        Some(name.to_string())
    } else {
        arn_for_name(name).map(str::to_string)
    }
}

/// `(type, provider, device)` from `arn:aws:braket:<region>::device/<type>/<provider>/<device>`.
fn device_segments(device_arn: &str) -> Option<(&str, &str, &str)> {
    let (_, path) = device_arn.split_once(":device/")?;
    let mut parts = path.split('/');
    let kind = parts.next().filter(|s| !s.is_empty())?;
    let provider = parts.next().filter(|s| !s.is_empty())?;
    let device = parts.next().filter(|s| !s.is_empty())?;
    parts.next().is_none().then_some((kind, provider, device))
}

/// Extract provider name from a device ARN.
pub fn provider_from_arn(device_arn: &str) -> &str {
    device_segments(device_arn).map_or("unknown", |(_, provider, _)| provider)
}

/// Capabilities for a device ARN.
pub fn capabilities_for_device(device_arn: &str) -> Capabilities {
    match device_arn {
        RIGETTI_ANKAA_3 => Capabilities::device("Rigetti Ankaa-3", 84, false),
        IONQ_ARIA => Capabilities::device("IonQ Aria", 25, false),
        IONQ_FORTE => Capabilities::device("IonQ Forte", 36, false),
        IQM_GARNET => Capabilities::device("IQM Garnet", 20, false),
        SV1 => Capabilities::device("Amazon SV1", 34, true),
        TN1 => Capabilities::device("Amazon TN1", 50, true),
        DM1 => Capabilities::device("Amazon DM1", 17, true).with_noise_channels(),
        other => {
            let is_simulator =
                device_segments(other).is_some_and(|(kind, _, _)| kind == "quantum-simulator");
            Capabilities::device(other, UNKNOWN_DEVICE_QUBITS, is_simulator)
        }
    }
}
