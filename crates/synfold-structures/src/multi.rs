// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Multi-component aggregates.

A [`MultiComponent`] is the aggregate dynamics of named sub-components:
internal wiring between them plus a set of exposed ports. Sub-components may
themselves be multi-components (a merged synapse embedded in a population
aggregate), so ports carry stacked namespace suffixes.

Construction goes through [`MultiComponentBuilder`], which rejects name
collisions instead of overwriting, and validates on [`build`] that every
internal connection and exposure resolves to a real port.

[`build`]: MultiComponentBuilder::build
*/

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dynamics::DynamicsProperties;
use crate::error::{StructuralError, StructuralResult};
use crate::namespace::{append_namespace, NamespaceRegistry};
use crate::ports::Communication;

/// A sub-component of an aggregate: either a leaf dynamics definition or a
/// nested aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Component {
    Single(DynamicsProperties),
    Multi(MultiComponent),
}

impl Component {
    /// Whether the component exposes a port (or, for nested aggregates, an
    /// exposure) with this name.
    pub fn has_port(&self, name: &str) -> bool {
        match self {
            Component::Single(props) => props.dynamics.port(name).is_some(),
            Component::Multi(multi) => multi.exposure_names().contains(name),
        }
    }

    /// Whether every continuous state equation in the component (recursing
    /// through nested aggregates) is linear.
    pub fn is_linear(&self) -> bool {
        match self {
            Component::Single(props) => props.dynamics.is_linear(),
            Component::Multi(multi) => multi.is_linear(),
        }
    }
}

/// A resolved connection between two sub-components of one aggregate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InternalConnection {
    pub sender: String,
    pub receiver: String,
    pub send_port: String,
    pub receive_port: String,
    pub communicates: Communication,
}

/// A sub-component port exposed on the aggregate boundary under its
/// namespaced name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortExposure {
    pub sub_component: String,
    pub port: String,
}

impl PortExposure {
    pub fn new(sub_component: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            sub_component: sub_component.into(),
            port: port.into(),
        }
    }

    /// The name under which the port appears on the aggregate boundary.
    pub fn name(&self) -> String {
        append_namespace(&self.port, &self.sub_component)
    }
}

/// Aggregate dynamics of named sub-components, internal wiring and exposed
/// ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiComponent {
    pub name: String,
    pub sub_components: BTreeMap<String, Component>,
    /// Canonically sorted by the builder, so content equality is independent
    /// of construction order.
    pub internal_connections: Vec<InternalConnection>,
    pub exposures: BTreeSet<PortExposure>,
}

impl MultiComponent {
    /// Boundary port names (namespaced).
    pub fn exposure_names(&self) -> BTreeSet<String> {
        self.exposures.iter().map(|e| e.name()).collect()
    }

    /// Whether every continuous state equation of every sub-component is
    /// linear. Namespaced state variables of distinct sub-components are
    /// disjoint and inward analog ports are first-order by definition, so
    /// the merged system is linear exactly when each member is.
    pub fn is_linear(&self) -> bool {
        self.sub_components.values().all(Component::is_linear)
    }

    /// Leaf dynamics with their namespace chains, innermost qualifier
    /// first. A port `w` of a leaf reached through chain `["psr"]` appears
    /// on this aggregate's boundary as `w__psr`.
    pub fn leaf_components(&self) -> Vec<(Vec<String>, &DynamicsProperties)> {
        let mut out = Vec::new();
        for (name, component) in &self.sub_components {
            match component {
                Component::Single(props) => out.push((vec![name.clone()], props)),
                Component::Multi(multi) => {
                    for (mut chain, props) in multi.leaf_components() {
                        chain.push(name.clone());
                        out.push((chain, props));
                    }
                }
            }
        }
        out
    }

    /// Every exposure must reference an actual port of an actual
    /// sub-component; internal connections likewise on both endpoints.
    pub fn validate(&self) -> StructuralResult<()> {
        for conn in &self.internal_connections {
            for (endpoint, port) in [
                (&conn.sender, &conn.send_port),
                (&conn.receiver, &conn.receive_port),
            ] {
                let component = self.sub_components.get(endpoint).ok_or_else(|| {
                    StructuralError::UnknownSubComponent {
                        container: self.name.clone(),
                        name: endpoint.clone(),
                    }
                })?;
                if !component.has_port(port) {
                    return Err(StructuralError::UnknownPort {
                        container: self.name.clone(),
                        endpoint: endpoint.clone(),
                        port: port.clone(),
                    });
                }
            }
        }
        for exposure in &self.exposures {
            let valid = self
                .sub_components
                .get(&exposure.sub_component)
                .map(|c| c.has_port(&exposure.port))
                .unwrap_or(false);
            if !valid {
                return Err(StructuralError::DanglingExposure {
                    container: self.name.clone(),
                    exposure: exposure.name(),
                });
            }
        }
        Ok(())
    }
}

/// Fallible-insert builder for [`MultiComponent`]: duplicate names are
/// errors, never overwrites.
#[derive(Debug, Clone)]
pub struct MultiComponentBuilder {
    name: String,
    registry: NamespaceRegistry,
    sub_components: BTreeMap<String, Component>,
    internal_connections: Vec<InternalConnection>,
    exposures: BTreeSet<PortExposure>,
}

impl MultiComponentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            registry: NamespaceRegistry::new(name.clone()),
            name,
            sub_components: BTreeMap::new(),
            internal_connections: Vec::new(),
            exposures: BTreeSet::new(),
        }
    }

    pub fn add_sub_component(
        &mut self,
        name: impl Into<String>,
        component: Component,
    ) -> StructuralResult<()> {
        let name = name.into();
        self.registry.register(&name)?;
        self.sub_components.insert(name, component);
        Ok(())
    }

    pub fn add_internal_connection(&mut self, connection: InternalConnection) {
        self.internal_connections.push(connection);
    }

    /// Exposures are a set: re-exposing the same port is a no-op.
    pub fn add_exposure(&mut self, exposure: PortExposure) {
        self.exposures.insert(exposure);
    }

    pub fn build(self) -> StructuralResult<MultiComponent> {
        let mut internal_connections = self.internal_connections;
        internal_connections.sort();
        internal_connections.dedup();
        let multi = MultiComponent {
            name: self.name,
            sub_components: self.sub_components,
            internal_connections,
            exposures: self.exposures,
        };
        multi.validate()?;
        Ok(multi)
    }
}
