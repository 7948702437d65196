// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Property values and quantities.

A property bound to a [`Value::Constant`] holds the same number for every
instance in a population; array and distribution values vary per instance
and are what the connection-property extraction promotes onto edges.
Unit conversion is out of scope here; units are transported verbatim.
*/

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A property or initial-state value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// One number shared by every instance
    Constant(f64),
    /// One number per instance, explicit
    Array(Vec<f64>),
    /// One number per instance, drawn from a named distribution
    Distribution {
        name: String,
        parameters: BTreeMap<String, f64>,
    },
}

impl Value {
    /// Whether every instance shares the same single number.
    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Constant(_))
    }
}

/// Physical units carried alongside values. Closed set; conversion happens
/// upstream of this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Units {
    Dimensionless,
    Seconds,
    Milliseconds,
    Volts,
    Millivolts,
    Nanoamps,
    Siemens,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Dimensionless => "1",
            Units::Seconds => "s",
            Units::Milliseconds => "ms",
            Units::Volts => "V",
            Units::Millivolts => "mV",
            Units::Nanoamps => "nA",
            Units::Siemens => "S",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value tagged with its units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Value,
    pub units: Units,
}

impl Quantity {
    pub fn new(value: Value, units: Units) -> Self {
        Self { value, units }
    }

    /// Single-number quantity shorthand.
    pub fn constant(value: f64, units: Units) -> Self {
        Self {
            value: Value::Constant(value),
            units,
        }
    }

    /// The delay carried by reverse-direction connection groups.
    pub fn zero_delay() -> Self {
        Self::constant(0.0, Units::Seconds)
    }

    /// Whether the quantity is the same for every instance.
    pub fn is_constant(&self) -> bool {
        self.value.is_constant()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Constant(v) => write!(f, "{} {}", v, self.units),
            Value::Array(vs) => write!(f, "[{} values] {}", vs.len(), self.units),
            Value::Distribution { name, .. } => write!(f, "~{} {}", name, self.units),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_detection() {
        assert!(Value::Constant(1.5).is_constant());
        assert!(!Value::Array(vec![1.0, 2.0]).is_constant());
        let dist = Value::Distribution {
            name: "normal".into(),
            parameters: [("mean".to_string(), 0.0), ("stddev".to_string(), 1.0)]
                .into_iter()
                .collect(),
        };
        assert!(!dist.is_constant());
    }

    #[test]
    fn test_zero_delay() {
        let d = Quantity::zero_delay();
        assert_eq!(d.value, Value::Constant(0.0));
        assert_eq!(d.units, Units::Seconds);
    }
}
