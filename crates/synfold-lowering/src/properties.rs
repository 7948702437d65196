// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Connection-property extraction.

An embedded synapse is shared by every edge arriving at a target cell, so a
property that varies per connection cannot live inside it, unless it only
matters at event time. This analysis promotes such properties out of the
dynamics into per-edge [`ConnectionPropertySet`]s keyed by the triggering
event port (the classic "synaptic weight" pattern).

Promotion is abandoned for the whole synapse the moment any varying
property is required, directly or through aliases, by continuous-time
dynamics (time derivatives or on-conditions): those values change the
trajectory itself and cannot be shared.
*/

use std::collections::{BTreeMap, BTreeSet};

use synfold_structures::{append_namespace, ConnectionPropertySet, MultiComponent, Quantity};

/// Outcome of connection-property extraction over one merged synapse.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Zero or more property sets, at most one per triggering port.
    Promoted(Vec<ConnectionPropertySet>),
    /// A varying property is needed by continuous-time dynamics; the
    /// synapse must fall back to one instance per edge.
    Conflict { parameter: String },
}

/// Qualify a leaf-local name with its namespace chain plus the projection
/// namespace.
fn qualify(local: &str, chain: &[String], namespace: &str) -> String {
    let mut name = local.to_string();
    for segment in chain {
        name = append_namespace(&name, segment);
    }
    append_namespace(&name, namespace)
}

/// Promote per-connection-varying properties of an embeddable synapse into
/// edge-local property sets, namespaced under `namespace` (the projection
/// name).
pub fn extract_connection_property_sets(
    synapse: &MultiComponent,
    namespace: &str,
) -> Extraction {
    // port (qualified) -> property name (qualified) -> value
    let mut promoted: BTreeMap<String, BTreeMap<String, Quantity>> = BTreeMap::new();

    for (chain, leaf) in synapse.leaf_components() {
        let parameters: BTreeSet<&str> =
            leaf.dynamics.parameters.iter().map(String::as_str).collect();
        let varying: BTreeSet<&str> = leaf
            .varying_properties()
            .map(|(name, _)| name)
            .filter(|name| parameters.contains(name))
            .collect();
        if varying.is_empty() {
            continue;
        }

        let forbidden = leaf
            .dynamics
            .required_parameters_for(leaf.dynamics.continuous_time_exprs());
        if let Some(&conflicting) = varying.iter().find(|p| forbidden.contains(**p)) {
            return Extraction::Conflict {
                parameter: qualify(conflicting, &chain, namespace),
            };
        }

        for on_event in &leaf.dynamics.on_events {
            let required = leaf
                .dynamics
                .required_parameters_for(on_event.state_assignments.iter().map(|sa| &sa.rhs));
            let port = qualify(&on_event.src_port, &chain, namespace);
            for &param in varying.iter().filter(|p| required.contains(**p)) {
                // Property is guaranteed present: varying came from it.
                if let Some(quantity) = leaf.property(param) {
                    promoted
                        .entry(port.clone())
                        .or_default()
                        .insert(qualify(param, &chain, namespace), quantity.clone());
                }
            }
        }
    }

    Extraction::Promoted(
        promoted
            .into_iter()
            .filter(|(_, properties)| !properties.is_empty())
            .map(|(port, properties)| ConnectionPropertySet {
                port,
                properties: properties.into_iter().collect(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use synfold_structures::{
        Component, Dynamics, DynamicsProperties, Expr, MultiComponentBuilder, OnEvent, Port,
        PortKind, StateAssignment, TimeDerivative, Units, Value,
    };

    /// dg/dt = -g/tau; on spike_in: g = g + weight
    fn response(weight: Value) -> DynamicsProperties {
        DynamicsProperties::new(Dynamics {
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
        })
        .with_property("tau", Quantity::constant(5.0, Units::Milliseconds))
        .with_property("weight", Quantity::new(weight, Units::Siemens))
    }

    fn synapse(resp: DynamicsProperties) -> MultiComponent {
        let mut builder = MultiComponentBuilder::new("p_syn");
        builder
            .add_sub_component("psr", Component::Single(resp))
            .unwrap();
        builder.add_exposure(synfold_structures::PortExposure::new("psr", "spike_in"));
        builder.build().unwrap()
    }

    #[test]
    fn test_event_only_varying_weight_is_promoted() {
        let syn = synapse(response(Value::Array(vec![0.1, 0.2, 0.3])));
        let extraction = extract_connection_property_sets(&syn, "proj");
        let Extraction::Promoted(sets) = extraction else {
            panic!("expected promotion");
        };
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].port, "spike_in__psr__proj");
        assert_eq!(sets[0].properties.len(), 1);
        assert_eq!(sets[0].properties[0].0, "weight__psr__proj");
    }

    #[test]
    fn test_constant_properties_produce_no_sets() {
        let syn = synapse(response(Value::Constant(0.5)));
        assert_eq!(
            extract_connection_property_sets(&syn, "proj"),
            Extraction::Promoted(vec![])
        );
    }

    #[test]
    fn test_varying_parameter_in_derivative_conflicts() {
        let mut resp = response(Value::Array(vec![0.1, 0.2]));
        // dg/dt = -g * weight / tau: weight now shapes the trajectory.
        resp.dynamics.time_derivatives[0].rhs = Expr::var("g")
            .neg()
            .mul(Expr::var("weight"))
            .div(Expr::var("tau"));
        let syn = synapse(resp);
        assert_eq!(
            extract_connection_property_sets(&syn, "proj"),
            Extraction::Conflict {
                parameter: "weight__psr__proj".into()
            }
        );
    }

    #[test]
    fn test_varying_parameter_in_on_condition_conflicts() {
        let mut resp = response(Value::Array(vec![0.1, 0.2]));
        resp.dynamics.on_conditions.push(synfold_structures::OnCondition {
            trigger: Expr::var("g").sub(Expr::var("weight")),
            state_assignments: vec![],
        });
        let syn = synapse(resp);
        assert!(matches!(
            extract_connection_property_sets(&syn, "proj"),
            Extraction::Conflict { .. }
        ));
    }
}
