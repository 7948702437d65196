// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Linearity classification of merged synapses.

A synapse whose continuous dynamics are linear evolves identically no
matter how many edges feed it, so one instance can be embedded per target
cell and shared. Non-linear synapses must keep one instance per edge.

The outcome is an expected, recoverable value driving control flow in the
orchestrator, never an error.
*/

use std::fmt;

use synfold_structures::MultiComponent;

/// Why a synapse cannot be embedded into its post-synaptic aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnflattenableReason {
    /// A continuous state equation is non-linear in the synapse's own
    /// state variables.
    NonlinearDynamics,
    /// A per-connection-varying property is required by continuous-time
    /// dynamics, so it cannot be shared across a population-wide instance.
    PropertyPromotionConflict { parameter: String },
}

impl fmt::Display for UnflattenableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnflattenableReason::NonlinearDynamics => {
                f.write_str("non-linear continuous dynamics")
            }
            UnflattenableReason::PropertyPromotionConflict { parameter } => write!(
                f,
                "varying parameter '{}' is required by continuous-time dynamics",
                parameter
            ),
        }
    }
}

/// Structural placement decision for a merged synapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Dynamics are linear: embed once per target cell.
    Embeddable,
    /// Keep one instance per edge.
    Unflattenable(UnflattenableReason),
}

impl Classification {
    pub fn is_embeddable(&self) -> bool {
        matches!(self, Classification::Embeddable)
    }
}

/// Classify a merged synapse. Pure and deterministic: repeated calls on
/// identical input always agree.
pub fn classify(synapse: &MultiComponent) -> Classification {
    if synapse.is_linear() {
        Classification::Embeddable
    } else {
        Classification::Unflattenable(UnflattenableReason::NonlinearDynamics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synfold_structures::{
        Component, Dynamics, DynamicsProperties, Expr, MultiComponentBuilder, Port, PortKind,
        TimeDerivative,
    };

    fn synapse_with_derivative(rhs: Expr) -> MultiComponent {
        let mut builder = MultiComponentBuilder::new("p_syn");
        builder
            .add_sub_component(
                "psr",
                Component::Single(DynamicsProperties::new(Dynamics {
                    name: "Resp".into(),
                    parameters: vec!["tau".into()],
                    state_variables: vec!["g".into()],
                    time_derivatives: vec![TimeDerivative {
                        variable: "g".into(),
                        rhs,
                    }],
                    aliases: vec![],
                    on_events: vec![],
                    on_conditions: vec![],
                    ports: vec![Port::new("g", PortKind::AnalogSend)],
                })),
            )
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn test_linear_synapse_is_embeddable() {
        let synapse = synapse_with_derivative(Expr::var("g").neg().div(Expr::var("tau")));
        assert_eq!(classify(&synapse), Classification::Embeddable);
    }

    #[test]
    fn test_nonlinear_synapse_is_unflattenable() {
        let synapse = synapse_with_derivative(
            Expr::var("g").mul(Expr::var("g")).neg().div(Expr::var("tau")),
        );
        assert_eq!(
            classify(&synapse),
            Classification::Unflattenable(UnflattenableReason::NonlinearDynamics)
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let synapse =
            synapse_with_derivative(Expr::Call("exp".into(), vec![Expr::var("g")]).neg());
        let first = classify(&synapse);
        for _ in 0..10 {
            assert_eq!(classify(&synapse), first);
        }
    }
}
