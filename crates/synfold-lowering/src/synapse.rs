// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Synapse flattening.

Merges a projection's response and plasticity dynamics into one synapse
aggregate (a [`MultiComponent`] named `<projection>_syn`) and rewrites the
projection's port connections to address the merged synapse through a
single `synapse` role with namespaced ports.

Connections are partitioned into three classes:

- **internal** (both endpoints in {response, plasticity}): become internal
  connections of the synapse aggregate;
- **incoming** (sender in {pre, post}, receiver in {response, plasticity}):
  the receive port is exposed and the connection rewritten to target the
  `synapse` role;
- **outgoing** (sender in {response, plasticity}, receiver in {pre, post}):
  the send port is exposed and the connection rewritten to originate from
  the `synapse` role.

Connections between pre and post only pass through unchanged.
*/

use synfold_structures::{
    append_namespace, Component, InternalConnection, MultiComponent, MultiComponentBuilder,
    PortConnection, PortExposure, Projection, Role, StructuralError,
};

use crate::types::LoweringResult;

/// Fixed sub-component name for the response dynamics inside a merged
/// synapse.
pub const RESPONSE_SUB_NAME: &str = "psr";

/// Fixed sub-component name for the plasticity dynamics inside a merged
/// synapse.
pub const PLASTICITY_SUB_NAME: &str = "pls";

/// Suffix appended to the projection name to name the merged synapse.
pub const SYNAPSE_NAME_SUFFIX: &str = "_syn";

/// Sub-component name a synaptic role maps to inside the merged synapse.
fn sub_name(role: Role) -> &'static str {
    match role {
        Role::Response => RESPONSE_SUB_NAME,
        Role::Plasticity => PLASTICITY_SUB_NAME,
        // Callers only resolve synaptic roles; checked by flatten_synapse.
        _ => unreachable!("only synaptic roles have sub-component names"),
    }
}

/// Merge a projection's response and plasticity dynamics into one synapse
/// aggregate and rewrite the projection's port connections to match.
///
/// Returns the merged synapse plus the rewritten connection list, in which
/// every response/plasticity endpoint has been replaced by the `synapse`
/// role with a namespaced port. Deterministic and idempotent: the same
/// projection always yields an identical aggregate.
pub fn flatten_synapse(
    projection: &Projection,
) -> LoweringResult<(MultiComponent, Vec<PortConnection>)> {
    // The synapse role only exists after merging; seeing it in input means
    // the projection was built against the wrong schema.
    for pc in &projection.port_connections {
        for role in [pc.sender, pc.receiver] {
            if role == Role::Synapse {
                return Err(StructuralError::InvalidRole {
                    projection: projection.name.clone(),
                    role: role.as_str().to_string(),
                }
                .into());
            }
        }
    }

    let mut builder =
        MultiComponentBuilder::new(format!("{}{}", projection.name, SYNAPSE_NAME_SUFFIX));
    builder.add_sub_component(
        RESPONSE_SUB_NAME,
        Component::Single(projection.response.clone()),
    )?;
    builder.add_sub_component(
        PLASTICITY_SUB_NAME,
        Component::Single(projection.plasticity.clone()),
    )?;

    let mut incoming = Vec::new();
    let mut outgoing = Vec::new();
    let mut pass_through = Vec::new();
    for pc in &projection.port_connections {
        match (pc.sender, pc.receiver) {
            (s, r) if s.is_synaptic() && r.is_synaptic() => {
                builder.add_internal_connection(InternalConnection {
                    sender: sub_name(s).to_string(),
                    receiver: sub_name(r).to_string(),
                    send_port: pc.send_port.clone(),
                    receive_port: pc.receive_port.clone(),
                    communicates: pc.communicates,
                });
            }
            (s, r) if s.is_cell() && r.is_synaptic() => incoming.push(pc),
            (s, r) if s.is_synaptic() && r.is_cell() => outgoing.push(pc),
            _ => pass_through.push(pc),
        }
    }

    for pc in &incoming {
        builder.add_exposure(PortExposure::new(
            sub_name(pc.receiver),
            pc.receive_port.as_str(),
        ));
    }
    for pc in &outgoing {
        builder.add_exposure(PortExposure::new(sub_name(pc.sender), pc.send_port.as_str()));
    }
    let synapse = builder.build()?;

    // Rewritten projection connections: synaptic endpoints collapse onto
    // the synapse role under their namespaced (exposed) port names.
    let mut rewritten = Vec::with_capacity(projection.port_connections.len());
    for pc in incoming {
        rewritten.push(PortConnection {
            sender: pc.sender,
            receiver: Role::Synapse,
            send_port: pc.send_port.clone(),
            receive_port: append_namespace(&pc.receive_port, sub_name(pc.receiver)),
            communicates: pc.communicates,
        });
    }
    for pc in outgoing {
        rewritten.push(PortConnection {
            sender: Role::Synapse,
            receiver: pc.receiver,
            send_port: append_namespace(&pc.send_port, sub_name(pc.sender)),
            receive_port: pc.receive_port.clone(),
            communicates: pc.communicates,
        });
    }
    rewritten.extend(pass_through.into_iter().cloned());

    Ok((synapse, rewritten))
}

#[cfg(test)]
mod tests {
    use super::*;
    use synfold_structures::{
        Communication, ConnectivityRule, Dynamics, DynamicsProperties, OnEvent, Port, PortKind,
        PopulationRef, Quantity, StateAssignment, TimeDerivative, Units,
    };
    use synfold_structures::Expr;

    fn response_dynamics() -> DynamicsProperties {
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
    }

    fn plasticity_dynamics() -> DynamicsProperties {
        DynamicsProperties::new(Dynamics {
            name: "StaticPlasticity".into(),
            parameters: vec![],
            state_variables: vec![],
            time_derivatives: vec![],
            aliases: vec![],
            on_events: vec![],
            on_conditions: vec![],
            ports: vec![Port::new("incoming_spike", PortKind::EventReceive)],
        })
    }

    fn projection(port_connections: Vec<PortConnection>) -> Projection {
        Projection {
            name: "exc".into(),
            pre: PopulationRef::Population("src".into()),
            post: PopulationRef::Population("dst".into()),
            connectivity: ConnectivityRule::AllToAll.into(),
            delay: Quantity::constant(1.0, Units::Milliseconds),
            response: response_dynamics(),
            plasticity: plasticity_dynamics(),
            port_connections,
        }
    }

    #[test]
    fn test_merged_synapse_shape() {
        let proj = projection(vec![
            PortConnection::event(Role::Pre, "spike", Role::Response, "spike_in"),
            PortConnection::analog(Role::Response, "g", Role::Post, "g_syn"),
        ]);
        let (synapse, rewritten) = flatten_synapse(&proj).unwrap();

        assert_eq!(synapse.name, "exc_syn");
        assert!(synapse.sub_components.contains_key(RESPONSE_SUB_NAME));
        assert!(synapse.sub_components.contains_key(PLASTICITY_SUB_NAME));
        assert!(synapse.exposure_names().contains("spike_in__psr"));
        assert!(synapse.exposure_names().contains("g__psr"));

        assert_eq!(rewritten.len(), 2);
        assert_eq!(
            rewritten[0],
            PortConnection::event(Role::Pre, "spike", Role::Synapse, "spike_in__psr")
        );
        assert_eq!(
            rewritten[1],
            PortConnection::analog(Role::Synapse, "g__psr", Role::Post, "g_syn")
        );
    }

    #[test]
    fn test_internal_connections_stay_internal() {
        let mut plasticity = plasticity_dynamics();
        plasticity.dynamics.ports.push(Port::new("w_out", PortKind::AnalogSend));
        plasticity.dynamics.state_variables.push("w_out".into());
        let mut response = response_dynamics();
        response
            .dynamics
            .ports
            .push(Port::new("w_in", PortKind::AnalogReceive));

        let mut proj = projection(vec![PortConnection::analog(
            Role::Plasticity,
            "w_out",
            Role::Response,
            "w_in",
        )]);
        proj.response = response;
        proj.plasticity = plasticity;

        let (synapse, rewritten) = flatten_synapse(&proj).unwrap();
        assert!(rewritten.is_empty());
        assert_eq!(synapse.internal_connections.len(), 1);
        let conn = &synapse.internal_connections[0];
        assert_eq!(conn.sender, PLASTICITY_SUB_NAME);
        assert_eq!(conn.receiver, RESPONSE_SUB_NAME);
        assert_eq!(conn.communicates, Communication::Analog);
    }

    #[test]
    fn test_pre_post_connection_passes_through() {
        let pass = PortConnection::event(Role::Pre, "spike", Role::Post, "spike_in");
        let proj = projection(vec![pass.clone()]);
        let (_, rewritten) = flatten_synapse(&proj).unwrap();
        assert_eq!(rewritten, vec![pass]);
    }

    #[test]
    fn test_synapse_role_in_input_rejected() {
        let proj = projection(vec![PortConnection::event(
            Role::Pre,
            "spike",
            Role::Synapse,
            "spike_in",
        )]);
        let err = flatten_synapse(&proj).unwrap_err();
        assert_eq!(
            err,
            StructuralError::InvalidRole {
                projection: "exc".into(),
                role: "synapse".into()
            }
            .into()
        );
    }

    #[test]
    fn test_flattening_is_idempotent() {
        let proj = projection(vec![
            PortConnection::event(Role::Pre, "spike", Role::Response, "spike_in"),
            PortConnection::analog(Role::Response, "g", Role::Post, "g_syn"),
        ]);
        let (first, first_conns) = flatten_synapse(&proj).unwrap();
        let (second, second_conns) = flatten_synapse(&proj).unwrap();
        assert_eq!(first, second);
        assert_eq!(first_conns, second_conns);
    }
}
