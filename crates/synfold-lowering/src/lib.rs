// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# synfold lowering

Flattens hierarchical network descriptions into simulator-ready component
arrays and connection groups. The pass:

1. **Merges** each projection's response and plasticity dynamics into one
   synapse aggregate ([`synapse`]).
2. **Classifies** each merged synapse: linear dynamics embed once per
   target cell, non-linear ones stay one-per-edge ([`linearity`]).
3. **Promotes** per-connection-varying, event-only parameters of embedded
   synapses into edge-local property sets ([`properties`]).
4. **Assembles** per-population aggregates and per-edge-direction
   connection groups ([`flatten`]).

Everything is pure and synchronous; population flattening parallelizes
behind the `parallel` feature.
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod flatten;
pub mod linearity;
pub mod properties;
pub mod synapse;
pub mod types;

pub use flatten::{FlattenedNetwork, NetworkFlattener, DEFAULT_CELL_ROLE_NAME};
pub use linearity::{classify, Classification, UnflattenableReason};
pub use properties::{extract_connection_property_sets, Extraction};
pub use synapse::{flatten_synapse, PLASTICITY_SUB_NAME, RESPONSE_SUB_NAME, SYNAPSE_NAME_SUFFIX};
pub use types::{LoweringError, LoweringResult};
