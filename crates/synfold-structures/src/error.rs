// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Structural errors raised while building or lowering a network description.

Every variant is fatal to the pass that raised it and names the offending
container so the caller can report which population/projection to fix.
*/

/// Result type for structural operations
pub type StructuralResult<T> = Result<T, StructuralError>;

/// Errors raised by invalid network structure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("Projection '{projection}': port connection uses role '{role}' which is not valid here")]
    InvalidRole { projection: String, role: String },

    #[error("Name '{name}' is reserved for the cell dynamics sub-component")]
    ReservedName { name: String },

    #[error("Duplicate name '{name}' in network outputs")]
    DuplicateName { name: String },

    #[error("Container '{container}': sub-component name '{name}' would make namespaced ports ambiguous")]
    NamespaceCollision { container: String, name: String },

    #[error("Container '{container}': exposure '{exposure}' does not match any boundary-crossing connection")]
    DanglingExposure { container: String, exposure: String },

    #[error("Unknown population '{name}'")]
    UnknownPopulation { name: String },

    #[error("Unknown selection '{name}'")]
    UnknownSelection { name: String },

    #[error("Container '{container}': internal connection references unknown port '{port}' on '{endpoint}'")]
    UnknownPort {
        container: String,
        endpoint: String,
        port: String,
    },

    #[error("Container '{container}': no sub-component named '{name}'")]
    UnknownSubComponent { container: String, name: String },
}
