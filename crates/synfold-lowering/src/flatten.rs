// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Network flattening orchestrator.

Per population, assembles the final aggregate dynamics (cell + embedded
synapses + internal wiring + exposures) and the connection groups touching
the source side of each projection. The whole network is flattened before
handoff: reverse-direction groups need the destination array's identity
already resolved.

Population flattening is independent per population and runs in parallel
under the `parallel` feature; per-population results are merged into the
global output maps serially, with duplicate derived names detected as a
hard error rather than a silent overwrite.
*/

use std::collections::BTreeMap;

use ahash::AHashMap;
use tracing::{debug, info, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use synfold_structures::{
    append_namespace, Component, ComponentArray, ConnectionGroup, ConnectionPropertySet,
    InternalConnection, MultiComponentBuilder, Network, Population, PortConnection, PortExposure,
    Projection, Quantity, Role, StructuralError, SynapseProperties,
};

use crate::linearity::{classify, Classification, UnflattenableReason};
use crate::properties::{extract_connection_property_sets, Extraction};
use crate::synapse::flatten_synapse;
use crate::types::{LoweringError, LoweringResult};

/// Default name for the cell-dynamics sub-component of a population
/// aggregate.
pub const DEFAULT_CELL_ROLE_NAME: &str = "cell";

/// The flattened network: name-keyed output maps handed to the
/// backend-instantiation collaborator.
#[derive(Debug, Clone, Default)]
pub struct FlattenedNetwork {
    /// Population name -> component array
    pub component_arrays: AHashMap<String, ComponentArray>,
    /// Derived edge name -> connection group
    pub connection_groups: AHashMap<String, ConnectionGroup>,
}

/// Lowers a [`Network`] into a [`FlattenedNetwork`].
///
/// The cell-dynamics role name is explicit configuration: it is reserved
/// network-wide and no population, projection or selection may use it.
#[derive(Debug, Clone)]
pub struct NetworkFlattener {
    cell_role_name: String,
}

impl Default for NetworkFlattener {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkFlattener {
    pub fn new() -> Self {
        Self {
            cell_role_name: DEFAULT_CELL_ROLE_NAME.to_string(),
        }
    }

    pub fn with_cell_role_name(cell_role_name: impl Into<String>) -> Self {
        Self {
            cell_role_name: cell_role_name.into(),
        }
    }

    pub fn cell_role_name(&self) -> &str {
        &self.cell_role_name
    }

    /// Flatten the whole network. Fails on the first structural error,
    /// before any partial output escapes.
    pub fn flatten(&self, network: &Network) -> LoweringResult<FlattenedNetwork> {
        self.validate(network)?;
        info!(
            network = %network.name,
            populations = network.populations.len(),
            projections = network.projections.len(),
            "flattening network"
        );

        let populations: Vec<&Population> = network.populations.values().collect();

        #[cfg(feature = "parallel")]
        let results: Vec<LoweringResult<(ComponentArray, Vec<ConnectionGroup>)>> = populations
            .par_iter()
            .map(|pop| self.flatten_population(network, pop))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<LoweringResult<(ComponentArray, Vec<ConnectionGroup>)>> = populations
            .iter()
            .map(|pop| self.flatten_population(network, pop))
            .collect();

        let mut flat = FlattenedNetwork::default();
        for result in results {
            let (array, groups) = result?;
            if flat.component_arrays.contains_key(&array.name) {
                return Err(StructuralError::DuplicateName { name: array.name }.into());
            }
            flat.component_arrays.insert(array.name.clone(), array);
            for group in groups {
                insert_connection_group(&mut flat.connection_groups, group)?;
            }
        }
        info!(
            component_arrays = flat.component_arrays.len(),
            connection_groups = flat.connection_groups.len(),
            "network flattened"
        );
        Ok(flat)
    }

    /// Upfront structural validation, before any output is produced:
    /// reserved cell-role name, name uniqueness across populations,
    /// projections and selections, and resolvable references.
    fn validate(&self, network: &Network) -> LoweringResult<()> {
        let named = network
            .populations
            .keys()
            .chain(network.projections.keys())
            .chain(network.selections.keys());
        let mut seen = BTreeMap::new();
        for name in named {
            if name == &self.cell_role_name {
                return Err(StructuralError::ReservedName { name: name.clone() }.into());
            }
            if seen.insert(name.as_str(), ()).is_some() {
                return Err(StructuralError::DuplicateName { name: name.clone() }.into());
            }
        }
        for projection in network.projections.values() {
            network.resolve(&projection.pre)?;
            network.resolve(&projection.post)?;
        }
        Ok(())
    }

    fn flatten_population(
        &self,
        network: &Network,
        population: &Population,
    ) -> LoweringResult<(ComponentArray, Vec<ConnectionGroup>)> {
        let mut receiving = Vec::new();
        let mut sending = Vec::new();
        for projection in network.projections.values() {
            if network.reference_contains(&projection.post, &population.name)? {
                receiving.push(projection);
            }
            if network.reference_contains(&projection.pre, &population.name)? {
                sending.push(projection);
            }
        }
        debug!(
            population = %population.name,
            receiving = receiving.len(),
            sending = sending.len(),
            "flattening population"
        );

        let mut builder = MultiComponentBuilder::new(&population.name);
        builder.add_sub_component(
            &self.cell_role_name,
            Component::Single(population.cell.clone()),
        )?;
        let mut synapses: Vec<SynapseProperties> = Vec::new();
        let mut property_sets: Vec<ConnectionPropertySet> = Vec::new();
        let mut groups: Vec<ConnectionGroup> = Vec::new();

        for projection in receiving {
            let (synapse, projection_conns) = flatten_synapse(projection)?;
            let (pre_conns, post_conns): (Vec<PortConnection>, Vec<PortConnection>) =
                projection_conns
                    .into_iter()
                    .partition(|pc| pc.touches(Role::Pre));

            // Role -> sub-component table for endpoints inside this
            // population's aggregate.
            let mut role_names: BTreeMap<Role, String> = BTreeMap::new();
            role_names.insert(Role::Post, self.cell_role_name.clone());

            let mut classification = classify(&synapse);
            let mut promoted = Vec::new();
            if classification.is_embeddable() {
                match extract_connection_property_sets(&synapse, &projection.name) {
                    Extraction::Promoted(sets) => promoted = sets,
                    Extraction::Conflict { parameter } => {
                        classification = Classification::Unflattenable(
                            UnflattenableReason::PropertyPromotionConflict { parameter },
                        );
                    }
                }
            }

            match classification {
                Classification::Embeddable => {
                    role_names.insert(Role::Synapse, projection.name.clone());
                    property_sets.extend(promoted);
                    // Post-side connections become internal wiring of the
                    // population aggregate.
                    for pc in &post_conns {
                        builder.add_internal_connection(InternalConnection {
                            sender: resolve_role(&role_names, pc.sender, &projection.name)?,
                            receiver: resolve_role(&role_names, pc.receiver, &projection.name)?,
                            send_port: pc.send_port.clone(),
                            receive_port: pc.receive_port.clone(),
                            communicates: pc.communicates,
                        });
                    }
                    builder
                        .add_sub_component(&projection.name, Component::Multi(synapse))?;
                }
                Classification::Unflattenable(reason) => {
                    debug!(
                        projection = %projection.name,
                        %reason,
                        "synapse stays one-per-edge"
                    );
                    // The synapse lives outside the aggregate; expose the
                    // cell ports it attaches to.
                    for pc in &post_conns {
                        add_role_exposures(&mut builder, pc, &role_names);
                    }
                    synapses.push(SynapseProperties {
                        name: projection.name.clone(),
                        dynamics: synapse,
                        port_connections: post_conns,
                    });
                }
            }

            // Ports still needed toward the source side.
            for pc in &pre_conns {
                add_role_exposures(&mut builder, pc, &role_names);
            }

            let mut port_namespaces = role_names;
            port_namespaces.insert(Role::Pre, self.cell_role_name.clone());
            for pc in &pre_conns {
                groups.push(self.connection_group(projection, pc, &port_namespaces));
            }
        }

        // Sending projections only contribute exposures for the cell ports
        // used on the pre side; their synapse work happens when they are
        // processed as receiving for the target population.
        let pre_only: BTreeMap<Role, String> =
            BTreeMap::from([(Role::Pre, self.cell_role_name.clone())]);
        for projection in sending {
            let (_, projection_conns) = flatten_synapse(projection)?;
            for pc in &projection_conns {
                add_role_exposures(&mut builder, pc, &pre_only);
            }
        }

        let dynamics = builder.build()?;
        Ok((
            ComponentArray {
                name: population.name.clone(),
                size: population.size,
                dynamics,
                synapses,
                connection_property_sets: property_sets,
            },
            groups,
        ))
    }

    /// One connection group per pre-touching port connection. Forward
    /// groups (sender is pre) carry the projection's rule and delay
    /// verbatim; reverse groups invert the rule and force a zero delay,
    /// since the input carries only one forward delay value.
    fn connection_group(
        &self,
        projection: &Projection,
        pc: &PortConnection,
        port_namespaces: &BTreeMap<Role, String>,
    ) -> ConnectionGroup {
        let name = format!(
            "{}__{}__{}__{}__{}",
            projection.name,
            pc.sender.as_str(),
            pc.send_port,
            pc.receiver.as_str(),
            pc.receive_port
        );
        let (connectivity, delay) = if pc.sender == Role::Pre {
            (projection.connectivity.clone(), projection.delay.clone())
        } else {
            (
                projection.connectivity.clone().invert(),
                Quantity::zero_delay(),
            )
        };
        trace!(group = %name, forward = pc.sender == Role::Pre, "emitting connection group");
        ConnectionGroup {
            name,
            source: projection.pre.name().to_string(),
            destination: projection.post.name().to_string(),
            source_port: namespaced_port(&pc.send_port, pc.sender, port_namespaces),
            destination_port: namespaced_port(&pc.receive_port, pc.receiver, port_namespaces),
            connectivity,
            delay,
            communicates: pc.communicates,
        }
    }
}

/// Expose the endpoints of a connection that live inside the aggregate
/// (those whose role is mapped); endpoints outside the boundary are left
/// alone.
fn add_role_exposures(
    builder: &mut MultiComponentBuilder,
    pc: &PortConnection,
    role_names: &BTreeMap<Role, String>,
) {
    for (role, port) in [(pc.sender, &pc.send_port), (pc.receiver, &pc.receive_port)] {
        if let Some(sub) = role_names.get(&role) {
            builder.add_exposure(PortExposure::new(sub.as_str(), port.as_str()));
        }
    }
}

fn resolve_role(
    role_names: &BTreeMap<Role, String>,
    role: Role,
    projection: &str,
) -> LoweringResult<String> {
    role_names.get(&role).cloned().ok_or_else(|| {
        StructuralError::InvalidRole {
            projection: projection.to_string(),
            role: role.as_str().to_string(),
        }
        .into()
    })
}

/// Qualify a port name with the sub-component its role resolves to, when
/// the endpoint lives inside an aggregate. Unmapped roles (an externalized
/// synapse) keep their raw port name.
fn namespaced_port(port: &str, role: Role, port_namespaces: &BTreeMap<Role, String>) -> String {
    match port_namespaces.get(&role) {
        Some(sub) => append_namespace(port, sub),
        None => port.to_string(),
    }
}

/// Merge a derived connection group into the global map. The same group can
/// legitimately arrive twice when a projection targets a selection (once
/// per member population); identical content is deduplicated, differing
/// content under one name is a hard error.
fn insert_connection_group(
    groups: &mut AHashMap<String, ConnectionGroup>,
    group: ConnectionGroup,
) -> LoweringResult<()> {
    if let Some(existing) = groups.get(&group.name) {
        if *existing == group {
            return Ok(());
        }
        return Err(LoweringError::Structural(StructuralError::DuplicateName {
            name: group.name,
        }));
    }
    groups.insert(group.name.clone(), group);
    Ok(())
}
