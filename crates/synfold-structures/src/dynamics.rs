// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Dynamics definitions and their symbolic analyses.

A [`Dynamics`] is a continuous/discrete state-evolution description: state
variables with time derivatives, aliases, event/condition-triggered state
assignments and named ports. [`DynamicsProperties`] binds a definition to
concrete property values and an initial state.

The two analyses the lowering pass depends on live here:

- [`Dynamics::is_linear`]: whether every time derivative is at most
  first-order in the state variables and inward analog ports; this decides
  whether a synapse can be embedded once per target cell.
- [`Dynamics::required_parameters_for`]: the parameters referenced directly
  or transitively (through aliases) by a set of expressions; this feeds the
  connection-property promotion analysis.
*/

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::value::{Quantity, Value};

/// Direction and kind of a dynamics port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    EventReceive,
    EventSend,
    AnalogReceive,
    AnalogSend,
    /// Analog receive port that sums contributions from multiple senders
    AnalogReduce,
}

impl PortKind {
    /// Ports through which continuous values flow into the component.
    pub fn is_analog_inward(&self) -> bool {
        matches!(self, PortKind::AnalogReceive | PortKind::AnalogReduce)
    }
}

/// A named interaction point on a dynamics definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub kind: PortKind,
}

impl Port {
    pub fn new(name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// `d<variable>/dt = <rhs>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDerivative {
    pub variable: String,
    pub rhs: Expr,
}

/// `<name> := <rhs>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub rhs: Expr,
}

/// `<variable> = <rhs>` inside a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAssignment {
    pub variable: String,
    pub rhs: Expr,
}

/// Transition fired by an event arriving on `src_port`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnEvent {
    pub src_port: String,
    pub state_assignments: Vec<StateAssignment>,
}

/// Transition fired when `trigger` crosses zero/true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnCondition {
    pub trigger: Expr,
    pub state_assignments: Vec<StateAssignment>,
}

/// A state-evolution definition exposing named ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dynamics {
    pub name: String,
    pub parameters: Vec<String>,
    pub state_variables: Vec<String>,
    pub time_derivatives: Vec<TimeDerivative>,
    pub aliases: Vec<Alias>,
    pub on_events: Vec<OnEvent>,
    pub on_conditions: Vec<OnCondition>,
    pub ports: Vec<Port>,
}

impl Dynamics {
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Names of analog receive/reduce ports.
    pub fn analog_inward_ports(&self) -> impl Iterator<Item = &str> {
        self.ports
            .iter()
            .filter(|p| p.kind.is_analog_inward())
            .map(|p| p.name.as_str())
    }

    /// Expand aliases in `expr` until only parameters, state variables and
    /// ports remain. Alias definitions are acyclic by construction; the
    /// depth guard turns an accidental cycle into a fixed point instead of
    /// unbounded recursion.
    pub fn expand_aliases(&self, expr: &Expr) -> Expr {
        let mut current = expr.clone();
        for _ in 0..self.aliases.len() {
            let mut changed = false;
            for alias in &self.aliases {
                if current.variables().contains(alias.name.as_str()) {
                    current = current.substitute(&alias.name, &alias.rhs);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        current
    }

    /// Parameters referenced directly or transitively (through aliases) by
    /// the given expressions.
    pub fn required_parameters_for<'a>(
        &self,
        exprs: impl IntoIterator<Item = &'a Expr>,
    ) -> BTreeSet<String> {
        let params: BTreeSet<&str> = self.parameters.iter().map(String::as_str).collect();
        let mut required = BTreeSet::new();
        for expr in exprs {
            for var in self.expand_aliases(expr).variables() {
                if params.contains(var) {
                    required.insert(var.to_string());
                }
            }
        }
        required
    }

    /// Expressions evolved in continuous time: every time-derivative
    /// right-hand side, plus on-condition triggers and assignments (a
    /// condition transition observes the continuous trajectory).
    pub fn continuous_time_exprs(&self) -> Vec<&Expr> {
        let mut exprs: Vec<&Expr> = self.time_derivatives.iter().map(|td| &td.rhs).collect();
        for oc in &self.on_conditions {
            exprs.push(&oc.trigger);
            exprs.extend(oc.state_assignments.iter().map(|sa| &sa.rhs));
        }
        exprs
    }

    /// Whether every time derivative is at most first-order jointly in the
    /// state variables and inward analog ports. Deterministic: a pure
    /// function of the definition.
    pub fn is_linear(&self) -> bool {
        let mut linear_vars: BTreeSet<&str> =
            self.state_variables.iter().map(String::as_str).collect();
        linear_vars.extend(self.analog_inward_ports());
        self.time_derivatives
            .iter()
            .all(|td| self.expand_aliases(&td.rhs).is_linear_in(&linear_vars))
    }
}

/// A dynamics definition bound to property values and an initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicsProperties {
    pub dynamics: Dynamics,
    /// Parameter name -> bound value
    pub properties: BTreeMap<String, Quantity>,
    /// State-variable name -> initial value
    pub initial_state: BTreeMap<String, Value>,
}

impl DynamicsProperties {
    pub fn new(dynamics: Dynamics) -> Self {
        Self {
            dynamics,
            properties: BTreeMap::new(),
            initial_state: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, quantity: Quantity) -> Self {
        self.properties.insert(name.into(), quantity);
        self
    }

    pub fn with_initial(mut self, name: impl Into<String>, value: Value) -> Self {
        self.initial_state.insert(name.into(), value);
        self
    }

    pub fn property(&self, name: &str) -> Option<&Quantity> {
        self.properties.get(name)
    }

    /// Properties not bound to a single constant value, i.e. those that
    /// vary per instance.
    pub fn varying_properties(&self) -> impl Iterator<Item = (&str, &Quantity)> {
        self.properties
            .iter()
            .filter(|(_, q)| !q.is_constant())
            .map(|(n, q)| (n.as_str(), q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Units;

    /// Single-exponential conductance response: dg/dt = -g/tau,
    /// on spike_in: g = g + weight.
    fn exp_response() -> Dynamics {
        Dynamics {
            name: "ExpPSR".into(),
            parameters: vec!["tau".into(), "weight".into()],
            state_variables: vec!["g".into()],
            time_derivatives: vec![TimeDerivative {
                variable: "g".into(),
                rhs: Expr::var("g").neg().div(Expr::var("tau")),
            }],
            aliases: vec![],
            on_events: vec![OnEvent {
                src_port: "spike_in".into(),
                state_assignments: vec![StateAssignment {
                    variable: "g".into(),
                    rhs: Expr::var("g").add(Expr::var("weight")),
                }],
            }],
            on_conditions: vec![],
            ports: vec![
                Port::new("spike_in", PortKind::EventReceive),
                Port::new("g", PortKind::AnalogSend),
            ],
        }
    }

    #[test]
    fn test_exp_response_is_linear() {
        assert!(exp_response().is_linear());
    }

    #[test]
    fn test_linearity_is_deterministic() {
        let dyn_ = exp_response();
        let first = dyn_.is_linear();
        for _ in 0..10 {
            assert_eq!(dyn_.is_linear(), first);
        }
    }

    #[test]
    fn test_saturating_response_is_nonlinear() {
        let mut dyn_ = exp_response();
        // dg/dt = -g * g / tau
        dyn_.time_derivatives[0].rhs = Expr::var("g")
            .neg()
            .mul(Expr::var("g"))
            .div(Expr::var("tau"));
        assert!(!dyn_.is_linear());
    }

    #[test]
    fn test_alias_expansion_reaches_parameters() {
        let mut dyn_ = exp_response();
        dyn_.aliases.push(Alias {
            name: "scaled".into(),
            rhs: Expr::var("weight").mul(Expr::num(2.0)),
        });
        dyn_.on_events[0].state_assignments[0].rhs =
            Expr::var("g").add(Expr::var("scaled"));
        let required = dyn_.required_parameters_for(
            dyn_.on_events[0].state_assignments.iter().map(|sa| &sa.rhs),
        );
        assert!(required.contains("weight"));
        assert!(!required.contains("tau"));
    }

    #[test]
    fn test_nonlinear_alias_in_derivative() {
        let mut dyn_ = exp_response();
        dyn_.aliases.push(Alias {
            name: "gate".into(),
            rhs: Expr::Call("exp".into(), vec![Expr::var("g")]),
        });
        dyn_.time_derivatives[0].rhs = Expr::var("gate").neg().div(Expr::var("tau"));
        assert!(!dyn_.is_linear());
    }

    #[test]
    fn test_varying_properties() {
        let props = DynamicsProperties::new(exp_response())
            .with_property("tau", Quantity::constant(5.0, Units::Milliseconds))
            .with_property(
                "weight",
                Quantity::new(Value::Array(vec![0.1, 0.2]), Units::Siemens),
            );
        let varying: Vec<&str> = props.varying_properties().map(|(n, _)| n).collect();
        assert_eq!(varying, vec!["weight"]);
    }
}
