// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The data-model crate for synfold. Defines the network/dynamics structures
//! consumed and produced by the lowering pass: populations, projections,
//! port connections, dynamics definitions with their symbolic analyses,
//! multi-component aggregates, and the flattened output types.

mod error;
pub mod expr;
pub mod dynamics;
pub mod multi;
pub mod namespace;
pub mod network;
pub mod ports;
pub mod value;

pub use error::{StructuralError, StructuralResult};
pub use expr::Expr;
pub use dynamics::{
    Alias, Dynamics, DynamicsProperties, OnCondition, OnEvent, Port, PortKind, StateAssignment,
    TimeDerivative,
};
pub use multi::{Component, InternalConnection, MultiComponent, MultiComponentBuilder, PortExposure};
pub use namespace::{append_namespace, split_namespace, NamespaceRegistry, NAMESPACE_SEPARATOR};
pub use network::{
    ComponentArray, ConnectionGroup, ConnectionPropertySet, Connectivity, ConnectivityRule,
    Network, Population, PopulationRef, Projection, Selection, SynapseProperties,
};
pub use ports::{Communication, PortConnection, Role};
pub use value::{Quantity, Units, Value};
