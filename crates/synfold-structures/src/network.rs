// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Network descriptions and their lowered outputs.

The input side of the model: populations, projections and selections, read
once by the lowering pass. The output side: [`ComponentArray`] and
[`ConnectionGroup`], derived exactly once per population / per edge
direction and handed to the backend-instantiation collaborator.
*/

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dynamics::DynamicsProperties;
use crate::error::{StructuralError, StructuralResult};
use crate::multi::MultiComponent;
use crate::ports::{Communication, PortConnection};
use crate::value::Quantity;

/// Specification of which source instances connect to which target
/// instances. Sampling into concrete index lists is the backend's job; the
/// lowering pass only transports and structurally inverts rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConnectivityRule {
    AllToAll,
    OneToOne,
    FixedProbability { probability: f64 },
    /// Explicit (source index, target index) pairs
    Explicit { pairs: Vec<(u32, u32)> },
}

/// A connectivity rule, possibly structurally inverted (sender and receiver
/// sets swapped). Reverse-direction connection groups carry the inverted
/// form of their projection's rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Connectivity {
    Rule(ConnectivityRule),
    Inverse(Box<Connectivity>),
}

impl Connectivity {
    /// Swap sender and receiver sets. Double inversion collapses back to
    /// the original rule.
    pub fn invert(self) -> Self {
        match self {
            Connectivity::Inverse(inner) => *inner,
            rule => Connectivity::Inverse(Box::new(rule)),
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!(self, Connectivity::Inverse(_))
    }
}

impl From<ConnectivityRule> for Connectivity {
    fn from(rule: ConnectivityRule) -> Self {
        Connectivity::Rule(rule)
    }
}

/// Reference to the source or target of a projection: a single population
/// or a named selection over several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopulationRef {
    Population(String),
    Selection(String),
}

impl PopulationRef {
    /// The referenced name, regardless of kind.
    pub fn name(&self) -> &str {
        match self {
            PopulationRef::Population(name) | PopulationRef::Selection(name) => name,
        }
    }
}

impl fmt::Display for PopulationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Homogeneous set of cell instances sharing one dynamics definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population {
    pub name: String,
    pub size: u32,
    pub cell: DynamicsProperties,
}

/// Structured edge set connecting a source population to a target
/// population through response + plasticity synapse dynamics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub name: String,
    pub pre: PopulationRef,
    pub post: PopulationRef,
    pub connectivity: Connectivity,
    /// Scalar delay applied to forward-direction connections
    pub delay: Quantity,
    pub response: DynamicsProperties,
    pub plasticity: DynamicsProperties,
    pub port_connections: Vec<PortConnection>,
}

/// A named concatenation of populations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub name: String,
    pub members: Vec<String>,
}

/// A complete network description. Storage is ordered by name so iteration
/// (and therefore lowering) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub populations: BTreeMap<String, Population>,
    pub projections: BTreeMap<String, Projection>,
    pub selections: BTreeMap<String, Selection>,
}

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_population(&mut self, population: Population) -> StructuralResult<()> {
        if self.populations.contains_key(&population.name) {
            return Err(StructuralError::DuplicateName {
                name: population.name,
            });
        }
        self.populations.insert(population.name.clone(), population);
        Ok(())
    }

    pub fn add_projection(&mut self, projection: Projection) -> StructuralResult<()> {
        if self.projections.contains_key(&projection.name) {
            return Err(StructuralError::DuplicateName {
                name: projection.name,
            });
        }
        self.projections.insert(projection.name.clone(), projection);
        Ok(())
    }

    pub fn add_selection(&mut self, selection: Selection) -> StructuralResult<()> {
        if self.selections.contains_key(&selection.name) {
            return Err(StructuralError::DuplicateName {
                name: selection.name,
            });
        }
        self.selections.insert(selection.name.clone(), selection);
        Ok(())
    }

    /// The population names a reference resolves to: itself for a
    /// population, its members for a selection.
    pub fn resolve(&self, reference: &PopulationRef) -> StructuralResult<Vec<&str>> {
        match reference {
            PopulationRef::Population(name) => {
                // Return the key owned by the map, not the reference's copy,
                // so the result lives as long as the network.
                let (key, _) = self
                    .populations
                    .get_key_value(name)
                    .ok_or_else(|| StructuralError::UnknownPopulation { name: name.clone() })?;
                Ok(vec![key.as_str()])
            }
            PopulationRef::Selection(name) => {
                let selection = self
                    .selections
                    .get(name)
                    .ok_or_else(|| StructuralError::UnknownSelection { name: name.clone() })?;
                selection
                    .members
                    .iter()
                    .map(|member| {
                        if self.populations.contains_key(member) {
                            Ok(member.as_str())
                        } else {
                            Err(StructuralError::UnknownPopulation {
                                name: member.clone(),
                            })
                        }
                    })
                    .collect()
            }
        }
    }

    /// Whether `population` is the target of (a member of the target
    /// selection of) the reference.
    pub fn reference_contains(
        &self,
        reference: &PopulationRef,
        population: &str,
    ) -> StructuralResult<bool> {
        Ok(self.resolve(reference)?.contains(&population))
    }
}

// ---------------------------------------------------------------------------
// Lowered outputs
// ---------------------------------------------------------------------------

/// Per-connection parameters riding along the edges of a shared, embedded
/// synapse: applied when an event arrives on `port`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPropertySet {
    /// Triggering (namespaced) event port
    pub port: String,
    /// Namespaced property name -> per-edge value
    pub properties: Vec<(String, Quantity)>,
}

/// A synapse that could not be embedded: kept as one instance per edge,
/// bound to its post-side port connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynapseProperties {
    pub name: String,
    pub dynamics: MultiComponent,
    pub port_connections: Vec<PortConnection>,
}

/// Flattened per-population simulation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentArray {
    pub name: String,
    pub size: u32,
    pub dynamics: MultiComponent,
    /// Externalized per-connection synapses
    pub synapses: Vec<SynapseProperties>,
    pub connection_property_sets: Vec<ConnectionPropertySet>,
}

/// Flattened per-edge-direction wiring unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGroup {
    pub name: String,
    /// Source component array (the projection's pre side, also for
    /// reverse-direction groups; direction is encoded in the rule)
    pub source: String,
    /// Destination component array
    pub destination: String,
    pub source_port: String,
    pub destination_port: String,
    pub connectivity: Connectivity,
    pub delay: Quantity,
    pub communicates: Communication,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::Dynamics;

    fn empty_cell(name: &str) -> DynamicsProperties {
        DynamicsProperties::new(Dynamics {
            name: name.to_string(),
            parameters: vec![],
            state_variables: vec![],
            time_derivatives: vec![],
            aliases: vec![],
            on_events: vec![],
            on_conditions: vec![],
            ports: vec![],
        })
    }

    fn population(name: &str, size: u32) -> Population {
        Population {
            name: name.to_string(),
            size,
            cell: empty_cell("cell_dyn"),
        }
    }

    #[test]
    fn test_double_inversion_collapses() {
        let rule = Connectivity::from(ConnectivityRule::OneToOne);
        let inverted = rule.clone().invert();
        assert!(inverted.is_inverted());
        assert_eq!(inverted.invert(), rule);
    }

    #[test]
    fn test_duplicate_population_rejected() {
        let mut net = Network::new("net");
        net.add_population(population("exc", 10)).unwrap();
        let err = net.add_population(population("exc", 20)).unwrap_err();
        assert_eq!(
            err,
            StructuralError::DuplicateName {
                name: "exc".into()
            }
        );
    }

    #[test]
    fn test_selection_resolution() {
        let mut net = Network::new("net");
        net.add_population(population("exc", 10)).unwrap();
        net.add_population(population("inh", 5)).unwrap();
        net.add_selection(Selection {
            name: "all".into(),
            members: vec!["exc".into(), "inh".into()],
        })
        .unwrap();

        let members = net
            .resolve(&PopulationRef::Selection("all".into()))
            .unwrap();
        assert_eq!(members, vec!["exc", "inh"]);
        assert!(net
            .reference_contains(&PopulationRef::Selection("all".into()), "inh")
            .unwrap());
        assert!(!net
            .reference_contains(&PopulationRef::Population("exc".into()), "inh")
            .unwrap());
    }

    #[test]
    fn test_resolved_names_outlive_the_reference() {
        let mut net = Network::new("net");
        net.add_population(population("exc", 10)).unwrap();
        // Resolved names borrow from the network, so they stay usable after
        // the reference they were resolved from is gone.
        let members = {
            let reference = PopulationRef::Population("exc".into());
            net.resolve(&reference).unwrap()
        };
        assert_eq!(members, vec!["exc"]);
    }

    #[test]
    fn test_network_json_round_trip() {
        let mut net = Network::new("net");
        net.add_population(population("exc", 10)).unwrap();
        net.add_selection(Selection {
            name: "all".into(),
            members: vec!["exc".into()],
        })
        .unwrap();
        let json = serde_json::to_string(&net).unwrap();
        let back: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(back, net);
    }

    #[test]
    fn test_unknown_selection_member() {
        let mut net = Network::new("net");
        net.add_population(population("exc", 10)).unwrap();
        net.add_selection(Selection {
            name: "all".into(),
            members: vec!["exc".into(), "ghost".into()],
        })
        .unwrap();
        let err = net
            .resolve(&PopulationRef::Selection("all".into()))
            .unwrap_err();
        assert_eq!(
            err,
            StructuralError::UnknownPopulation {
                name: "ghost".into()
            }
        );
    }
}
