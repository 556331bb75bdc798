//! Statevector simulation engine.
//!
//! Qubit `q` is bit `q` of an amplitude index. Multi-qubit matrices list their
//! first target as the most significant bit, as JAQCD does.

use num_complex::Complex64;
use rand::Rng;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

use qexec_hal::{HalError, HalResult};
use qexec_ir::{Instruction, InstructionKind, NoiseModel, ParameterExpression, StandardGate};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

#[derive(Debug, Clone, Copy)]
enum Pauli {
    I,
    X,
    Y,
    Z,
}

const PAULIS: [Pauli; 4] = [Pauli::I, Pauli::X, Pauli::Y, Pauli::Z];

/// A statevector representing a quantum state.
#[derive(Debug, Clone)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![ZERO; size];
        amplitudes[0] = ONE;
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Apply an instruction. Noise channels pick one Kraus branch using `rng`.
    pub fn apply(&mut self, instruction: &Instruction, rng: &mut impl Rng) -> HalResult<()> {
        let qubits: Vec<usize> = instruction.qubits.iter().map(|q| q.index()).collect();
        match &instruction.kind {
            InstructionKind::Gate(gate) => self.apply_gate(gate, &qubits),
            InstructionKind::Noise(model) => {
                self.apply_noise(model, &qubits, rng);
                Ok(())
            }
        }
    }

    fn apply_gate(&mut self, gate: &StandardGate, q: &[usize]) -> HalResult<()> {
        match gate {
            // Single-qubit gates
            StandardGate::I => {}
            StandardGate::X => self.apply_x(q[0]),
            StandardGate::Y => self.apply_y(q[0]),
            StandardGate::Z => self.apply_z(q[0]),
            StandardGate::H => self.apply_h(q[0]),
            StandardGate::S => self.apply_phase(q[0], PI / 2.0),
            StandardGate::Si => self.apply_phase(q[0], -PI / 2.0),
            StandardGate::T => self.apply_phase(q[0], PI / 4.0),
            StandardGate::Ti => self.apply_phase(q[0], -PI / 4.0),
            StandardGate::V => self.apply_matrix(q, &v_matrix(false)),
            StandardGate::Vi => self.apply_matrix(q, &v_matrix(true)),
            StandardGate::Rx(theta) => self.apply_rx(q[0], bound(theta)?),
            StandardGate::Ry(theta) => self.apply_ry(q[0], bound(theta)?),
            StandardGate::Rz(theta) => self.apply_rz(q[0], bound(theta)?),
            StandardGate::PhaseShift(theta) => self.apply_phase(q[0], bound(theta)?),

            // Controlled gates
            StandardGate::CNot => self.apply_cx(q[0], q[1]),
            StandardGate::CY => self.apply_cy(q[0], q[1]),
            StandardGate::CZ => self.apply_cz(q[0], q[1]),
            StandardGate::CPhaseShift(theta) => {
                self.apply_conditional_phase(q[0], q[1], (true, true), bound(theta)?);
            }
            StandardGate::CPhaseShift00(theta) => {
                self.apply_conditional_phase(q[0], q[1], (false, false), bound(theta)?);
            }
            StandardGate::CPhaseShift01(theta) => {
                self.apply_conditional_phase(q[0], q[1], (false, true), bound(theta)?);
            }
            StandardGate::CPhaseShift10(theta) => {
                self.apply_conditional_phase(q[0], q[1], (true, false), bound(theta)?);
            }

            // Two-target gates
            StandardGate::Swap => self.apply_swap(q[0], q[1]),
            StandardGate::ISwap => self.apply_iswap(q[0], q[1]),
            StandardGate::Ecr => self.apply_matrix(q, &ecr_matrix()),
            StandardGate::PSwap(theta) => self.apply_matrix(q, &pswap_matrix(bound(theta)?)),
            StandardGate::XY(theta) => self.apply_matrix(q, &xy_matrix(bound(theta)?)),
            StandardGate::XX(theta) => self.apply_matrix(q, &xx_matrix(bound(theta)?)),
            StandardGate::YY(theta) => self.apply_matrix(q, &yy_matrix(bound(theta)?)),
            StandardGate::ZZ(theta) => self.apply_matrix(q, &zz_matrix(bound(theta)?)),

            // Three-qubit gates
            StandardGate::CCNot => self.apply_ccx(q[0], q[1], q[2]),
            StandardGate::CSwap => self.apply_cswap(q[0], q[1], q[2]),

            StandardGate::Unitary { matrix, .. } => self.apply_matrix(q, matrix),
        }
        Ok(())
    }

    // =========================================================================
    // Single-qubit gate implementations
    // =========================================================================

    fn apply_x(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_y(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -I * self.amplitudes[j];
                self.amplitudes[j] = I * tmp;
            }
        }
    }

    fn apply_z(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask != 0 {
                self.amplitudes[i] = -self.amplitudes[i];
            }
        }
    }

    fn apply_h(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = FRAC_1_SQRT_2 * (a + b);
                self.amplitudes[j] = FRAC_1_SQRT_2 * (a - b);
            }
        }
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase = Complex64::from_polar(1.0, theta);
        for i in 0..(1 << self.num_qubits) {
            if i & mask != 0 {
                self.amplitudes[i] *= phase;
            }
        }
    }

    fn apply_rx(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a + neg_i_s * b;
                self.amplitudes[j] = neg_i_s * a + c * b;
            }
        }
    }

    fn apply_ry(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = c * a - s * b;
                self.amplitudes[j] = s * a + c * b;
            }
        }
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                self.amplitudes[i] *= phase_0;
            } else {
                self.amplitudes[i] *= phase_1;
            }
        }
    }

    // =========================================================================
    // Two-qubit gate implementations
    // =========================================================================

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_cy(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -I * self.amplitudes[j];
                self.amplitudes[j] = I * tmp;
            }
        }
    }

    fn apply_cz(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask != 0) {
                self.amplitudes[i] = -self.amplitudes[i];
            }
        }
    }

    /// Phase `theta` on the basis states where (control, target) equal `bits`.
    fn apply_conditional_phase(
        &mut self,
        control: usize,
        target: usize,
        bits: (bool, bool),
        theta: f64,
    ) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let phase = Complex64::from_polar(1.0, theta);
        for i in 0..(1 << self.num_qubits) {
            if ((i & ctrl_mask != 0) == bits.0) && ((i & tgt_mask != 0) == bits.1) {
                self.amplitudes[i] *= phase;
            }
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..(1 << self.num_qubits) {
            if (i & mask1 != 0) && (i & mask2 == 0) {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_iswap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..(1 << self.num_qubits) {
            if (i & mask1 != 0) && (i & mask2 == 0) {
                let j = (i & !mask1) | mask2;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = I * self.amplitudes[j];
                self.amplitudes[j] = I * tmp;
            }
        }
    }

    // =========================================================================
    // Three-qubit gate implementations
    // =========================================================================

    fn apply_ccx(&mut self, c1: usize, c2: usize, target: usize) {
        let c1_mask = 1 << c1;
        let c2_mask = 1 << c2;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & c1_mask != 0) && (i & c2_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_cswap(&mut self, control: usize, t1: usize, t2: usize) {
        let ctrl_mask = 1 << control;
        let t1_mask = 1 << t1;
        let t2_mask = 1 << t2;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & t1_mask != 0) && (i & t2_mask == 0) {
                let j = (i & !t1_mask) | t2_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    // =========================================================================
    // Dense operators
    // =========================================================================

    /// Apply a row-major `2^k × 2^k` operator to `qubits`. The operator need
    /// not be unitary.
    fn apply_matrix(&mut self, qubits: &[usize], matrix: &[Complex64]) {
        let k = qubits.len();
        let dim = 1 << k;
        let masks: Vec<usize> = qubits.iter().map(|q| 1 << q).collect();
        let covered = masks.iter().fold(0, |acc, m| acc | m);

        let mut indices = vec![0usize; dim];
        let mut local = vec![ZERO; dim];
        for base in 0..self.amplitudes.len() {
            if base & covered != 0 {
                continue;
            }
            for (row, index) in indices.iter_mut().enumerate() {
                *index = masks
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| row & (1 << (k - 1 - j)) != 0)
                    .fold(base, |acc, (_, mask)| acc | mask);
            }
            for (slot, &index) in local.iter_mut().zip(&indices) {
                *slot = self.amplitudes[index];
            }
            for (row, &index) in indices.iter().enumerate() {
                self.amplitudes[index] = matrix[row * dim..(row + 1) * dim]
                    .iter()
                    .zip(&local)
                    .map(|(m, a)| m * a)
                    .sum();
            }
        }
    }

    // =========================================================================
    // Noise channels
    // =========================================================================

    fn apply_noise(&mut self, model: &NoiseModel, qubits: &[usize], rng: &mut impl Rng) {
        match model {
            NoiseModel::BitFlip { probability } => {
                self.apply_pauli_mixture(qubits, *probability, &[&[Pauli::X]], rng);
            }
            NoiseModel::PhaseFlip { probability } => {
                self.apply_pauli_mixture(qubits, *probability, &[&[Pauli::Z]], rng);
            }
            NoiseModel::Depolarizing { probability } => {
                self.apply_pauli_mixture(
                    qubits,
                    *probability,
                    &[&[Pauli::X], &[Pauli::Y], &[Pauli::Z]],
                    rng,
                );
            }
            NoiseModel::TwoQubitDepolarizing { probability } => {
                let strings: Vec<[Pauli; 2]> = PAULIS
                    .iter()
                    .flat_map(|a| PAULIS.iter().map(move |b| [*a, *b]))
                    .skip(1)
                    .collect();
                let strings: Vec<&[Pauli]> = strings.iter().map(|s| s.as_slice()).collect();
                self.apply_pauli_mixture(qubits, *probability, &strings, rng);
            }
            NoiseModel::TwoQubitDephasing { probability } => {
                self.apply_pauli_mixture(
                    qubits,
                    *probability,
                    &[
                        &[Pauli::I, Pauli::Z],
                        &[Pauli::Z, Pauli::I],
                        &[Pauli::Z, Pauli::Z],
                    ],
                    rng,
                );
            }
            NoiseModel::AmplitudeDamping { gamma } => {
                let ops = amplitude_damping_kraus(*gamma, 1.0);
                self.apply_kraus(qubits, &ops[..2], rng);
            }
            NoiseModel::GeneralizedAmplitudeDamping { gamma, probability } => {
                let ops = amplitude_damping_kraus(*gamma, *probability);
                self.apply_kraus(qubits, &ops, rng);
            }
            NoiseModel::PhaseDamping { gamma } => {
                let ops = [
                    vec![ONE, ZERO, ZERO, real((1.0 - gamma).sqrt())],
                    vec![ZERO, ZERO, ZERO, real(gamma.sqrt())],
                ];
                self.apply_kraus(qubits, &ops, rng);
            }
            NoiseModel::Kraus { matrices, .. } => self.apply_kraus(qubits, matrices, rng),
        }
    }

    /// With `probability`, apply one of `strings` chosen uniformly.
    fn apply_pauli_mixture(
        &mut self,
        qubits: &[usize],
        probability: f64,
        strings: &[&[Pauli]],
        rng: &mut impl Rng,
    ) {
        let r: f64 = rng.r#gen();
        if r >= probability || strings.is_empty() {
            return;
        }
        let pick = ((r / probability) * strings.len() as f64) as usize;
        let string = strings[pick.min(strings.len() - 1)];
        for (&qubit, pauli) in qubits.iter().zip(string) {
            match pauli {
                Pauli::I => {}
                Pauli::X => self.apply_x(qubit),
                Pauli::Y => self.apply_y(qubit),
                Pauli::Z => self.apply_z(qubit),
            }
        }
    }

    /// Sample one Kraus branch with probability `‖K ψ‖²` and renormalize.
    fn apply_kraus(&mut self, qubits: &[usize], operators: &[Vec<Complex64>], rng: &mut impl Rng) {
        let mut weights = Vec::with_capacity(operators.len());
        for op in operators {
            let mut branch = self.clone();
            branch.apply_matrix(qubits, op);
            weights.push(branch.norm_sqr());
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return;
        }
        let r = rng.r#gen::<f64>() * total;
        let mut cumulative = 0.0;
        let chosen = weights
            .iter()
            .position(|w| {
                cumulative += w;
                r < cumulative
            })
            .or_else(|| weights.iter().rposition(|w| *w > 0.0))
            .unwrap_or(0);

        self.apply_matrix(qubits, &operators[chosen]);
        let norm = weights[chosen].sqrt();
        if norm > 0.0 {
            for amp in &mut self.amplitudes {
                *amp /= norm;
            }
        }
    }

    fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// Probability of each basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Sample a measurement outcome.
    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        sample_index(&self.probabilities(), rng)
    }

    /// Convert measurement outcome to bitstring, qubit 0 leftmost.
    pub fn outcome_to_bitstring(&self, outcome: usize) -> String {
        (0..self.num_qubits)
            .map(|q| if outcome & (1 << q) != 0 { '1' } else { '0' })
            .collect()
    }
}

/// Draw an index from a discrete distribution.
pub fn sample_index(probabilities: &[f64], rng: &mut impl Rng) -> usize {
    let r: f64 = rng.r#gen();
    let mut cumulative = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        cumulative += p;
        if r < cumulative {
            return i;
        }
    }
    // Rounding can leave the total slightly below 1.
    probabilities
        .iter()
        .rposition(|p| *p > 0.0)
        .unwrap_or(probabilities.len().saturating_sub(1))
}

fn bound(angle: &ParameterExpression) -> HalResult<f64> {
    angle
        .as_f64()
        .ok_or_else(|| HalError::InvalidCircuit(format!("unbound parameter '{angle}'")))
}

fn real(re: f64) -> Complex64 {
    Complex64::new(re, 0.0)
}

fn v_matrix(dagger: bool) -> [Complex64; 4] {
    let (a, b) = if dagger {
        (Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5))
    } else {
        (Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5))
    };
    [a, b, b, a]
}

fn ecr_matrix() -> [Complex64; 16] {
    let s = FRAC_1_SQRT_2;
    let (o, i) = (real(s), Complex64::new(0.0, s));
    [
        ZERO, o, ZERO, i, //
        o, ZERO, -i, ZERO, //
        ZERO, i, ZERO, o, //
        -i, ZERO, o, ZERO,
    ]
}

fn pswap_matrix(theta: f64) -> [Complex64; 16] {
    let p = Complex64::from_polar(1.0, theta);
    [
        ONE, ZERO, ZERO, ZERO, //
        ZERO, ZERO, p, ZERO, //
        ZERO, p, ZERO, ZERO, //
        ZERO, ZERO, ZERO, ONE,
    ]
}

fn xy_matrix(theta: f64) -> [Complex64; 16] {
    let c = real((theta / 2.0).cos());
    let is = Complex64::new(0.0, (theta / 2.0).sin());
    [
        ONE, ZERO, ZERO, ZERO, //
        ZERO, c, is, ZERO, //
        ZERO, is, c, ZERO, //
        ZERO, ZERO, ZERO, ONE,
    ]
}

fn xx_matrix(theta: f64) -> [Complex64; 16] {
    let c = real((theta / 2.0).cos());
    let nis = Complex64::new(0.0, -(theta / 2.0).sin());
    [
        c, ZERO, ZERO, nis, //
        ZERO, c, nis, ZERO, //
        ZERO, nis, c, ZERO, //
        nis, ZERO, ZERO, c,
    ]
}

fn yy_matrix(theta: f64) -> [Complex64; 16] {
    let c = real((theta / 2.0).cos());
    let is = Complex64::new(0.0, (theta / 2.0).sin());
    [
        c, ZERO, ZERO, is, //
        ZERO, c, -is, ZERO, //
        ZERO, -is, c, ZERO, //
        is, ZERO, ZERO, c,
    ]
}

fn zz_matrix(theta: f64) -> [Complex64; 16] {
    let even = Complex64::from_polar(1.0, -theta / 2.0);
    let odd = Complex64::from_polar(1.0, theta / 2.0);
    [
        even, ZERO, ZERO, ZERO, //
        ZERO, odd, ZERO, ZERO, //
        ZERO, ZERO, odd, ZERO, //
        ZERO, ZERO, ZERO, even,
    ]
}

/// Generalized amplitude damping operators. With `probability = 1` the first
/// two are plain amplitude damping.
fn amplitude_damping_kraus(gamma: f64, probability: f64) -> [Vec<Complex64>; 4] {
    let keep = real((1.0 - gamma).sqrt());
    let decay = real(gamma.sqrt());
    let p = real(probability.sqrt());
    let q = real((1.0 - probability).sqrt());
    [
        vec![p, ZERO, ZERO, p * keep],
        vec![ZERO, p * decay, ZERO, ZERO],
        vec![q * keep, ZERO, ZERO, q],
        vec![ZERO, ZERO, q * decay, ZERO],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use qexec_ir::QubitId;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_initial_state() {
        let sv = Statevector::new(2);
        assert!(approx_eq(sv.amplitudes[0], ONE));
        assert!(sv.amplitudes[1..].iter().all(|a| approx_eq(*a, ZERO)));
    }

    #[test]
    fn test_hadamard() {
        let mut sv = Statevector::new(1);
        sv.apply_h(0);

        assert!(approx_eq(sv.amplitudes[0], real(FRAC_1_SQRT_2)));
        assert!(approx_eq(sv.amplitudes[1], real(FRAC_1_SQRT_2)));
    }

    #[test]
    fn test_bell_state() {
        let mut sv = Statevector::new(2);
        sv.apply_h(0);
        sv.apply_cx(0, 1);

        assert!(approx_eq(sv.amplitudes[0], real(FRAC_1_SQRT_2)));
        assert!(approx_eq(sv.amplitudes[1], ZERO));
        assert!(approx_eq(sv.amplitudes[2], ZERO));
        assert!(approx_eq(sv.amplitudes[3], real(FRAC_1_SQRT_2)));
    }

    #[test]
    fn test_v_squared_is_x() {
        let mut sv = Statevector::new(1);
        sv.apply_gate(&StandardGate::V, &[0]).unwrap();
        sv.apply_gate(&StandardGate::V, &[0]).unwrap();
        assert!(approx_eq(sv.amplitudes[1], ONE));
    }

    #[test]
    fn test_v_then_vi_is_identity() {
        let mut sv = Statevector::new(1);
        sv.apply_h(0);
        let before = sv.amplitudes.clone();
        sv.apply_gate(&StandardGate::V, &[0]).unwrap();
        sv.apply_gate(&StandardGate::Vi, &[0]).unwrap();
        for (a, b) in sv.amplitudes.iter().zip(&before) {
            assert!(approx_eq(*a, *b));
        }
    }

    #[test]
    fn test_matrix_matches_kernel() {
        // CNOT as a dense matrix, control is the first (most significant) operand.
        let cnot = [
            ONE, ZERO, ZERO, ZERO, //
            ZERO, ONE, ZERO, ZERO, //
            ZERO, ZERO, ZERO, ONE, //
            ZERO, ZERO, ONE, ZERO,
        ];
        let mut dense = Statevector::new(3);
        dense.apply_h(2);
        let mut kernel = dense.clone();

        dense.apply_matrix(&[2, 0], &cnot);
        kernel.apply_cx(2, 0);
        for (a, b) in dense.amplitudes.iter().zip(&kernel.amplitudes) {
            assert!(approx_eq(*a, *b));
        }
    }

    #[test]
    fn test_conditional_phase_00() {
        let mut sv = Statevector::new(2);
        sv.apply_conditional_phase(0, 1, (false, false), PI);
        assert!(approx_eq(sv.amplitudes[0], -ONE));
    }

    #[test]
    fn test_xx_pi_flips_both() {
        let mut sv = Statevector::new(2);
        sv.apply_gate(&StandardGate::XX(PI.into()), &[0, 1]).unwrap();
        assert!(approx_eq(sv.amplitudes[3], -I));
    }

    #[test]
    fn test_unbound_parameter_rejected() {
        let mut sv = Statevector::new(1);
        let err = sv
            .apply_gate(&StandardGate::Rx(ParameterExpression::symbol("theta")), &[0])
            .unwrap_err();
        assert!(matches!(err, HalError::InvalidCircuit(_)));
    }

    #[test]
    fn test_full_bit_flip_always_flips() {
        let mut rng = rng();
        let channel = Instruction::noise(NoiseModel::BitFlip { probability: 1.0 }, [QubitId(0)]);
        let mut sv = Statevector::new(1);
        sv.apply(&channel, &mut rng).unwrap();
        assert!(approx_eq(sv.amplitudes[1], ONE));
    }

    #[test]
    fn test_full_amplitude_damping_decays() {
        let mut rng = rng();
        let channel =
            Instruction::noise(NoiseModel::AmplitudeDamping { gamma: 1.0 }, [QubitId(0)]);
        for _ in 0..20 {
            let mut sv = Statevector::new(1);
            sv.apply_x(0);
            sv.apply(&channel, &mut rng).unwrap();
            assert!(approx_eq(sv.amplitudes[0], ONE));
        }
    }

    #[test]
    fn test_kraus_keeps_norm() {
        let mut rng = rng();
        let ops = amplitude_damping_kraus(0.3, 0.6);
        for _ in 0..20 {
            let mut sv = Statevector::new(2);
            sv.apply_h(0);
            sv.apply_cx(0, 1);
            sv.apply_kraus(&[1], &ops, &mut rng);
            assert!((sv.norm_sqr() - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_sample_deterministic() {
        let mut rng = rng();
        let mut sv = Statevector::new(1);
        sv.apply_x(0);

        for _ in 0..100 {
            assert_eq!(sv.sample(&mut rng), 1);
        }
    }

    #[test]
    fn test_bitstring_qubit_zero_leftmost() {
        let sv = Statevector::new(3);
        assert_eq!(sv.outcome_to_bitstring(0b001), "100");
        assert_eq!(sv.outcome_to_bitstring(0b110), "011");
    }
}
