//! Gate angles that may still be free parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An angle that is either known or named by a free parameter.
///
/// Free parameters are filled in from the job's input bindings before a
/// circuit is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A symbolic parameter.
    Symbol(String),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// Check if this expression is still symbolic.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, ParameterExpression::Symbol(_))
    }

    /// Try to evaluate as a concrete f64 value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Symbol(_) => None,
        }
    }

    /// Collect the symbol names in this expression into `set`.
    pub fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        if let ParameterExpression::Symbol(name) = self {
            set.insert(name.clone());
        }
    }

    /// Bind a symbol to a value, returning a new expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        match self {
            ParameterExpression::Symbol(n) if n == name => ParameterExpression::Constant(value),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_constant() {
        let p = ParameterExpression::constant(1.5);
        assert!(!p.is_symbolic());
        assert_eq!(p.as_f64(), Some(1.5));
    }

    #[test]
    fn test_symbol() {
        let p = ParameterExpression::symbol("theta");
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);

        let mut set = BTreeSet::new();
        p.collect_symbols(&mut set);
        assert!(set.contains("theta"));
    }

    #[test]
    fn test_bind() {
        let p = ParameterExpression::symbol("theta");
        let bound = p.bind("theta", PI / 2.0);
        assert!(!bound.is_symbolic());
        assert!((bound.as_f64().unwrap() - PI / 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_bind_other_name_is_noop() {
        let p = ParameterExpression::symbol("theta");
        assert_eq!(p.bind("phi", 1.0), p);
    }
}
