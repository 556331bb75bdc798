//! Qubit addressing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IrError;

/// Index of a qubit within a circuit.
///
/// Serialized as a bare integer so it matches the wire form of `targets`
/// and `controls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QubitId(pub u32);

impl QubitId {
    /// The index as a `usize`, for addressing state vectors.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u32> for QubitId {
    fn from(id: u32) -> Self {
        QubitId(id)
    }
}

impl TryFrom<usize> for QubitId {
    type Error = IrError;

    fn try_from(id: usize) -> Result<Self, Self::Error> {
        u32::try_from(id)
            .map(QubitId)
            .map_err(|_| IrError::QubitOutOfRange(id))
    }
}
