// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Role-qualified port naming across sub-component boundaries.

When a component is merged into a container, its ports are renamed by
suffixing the sub-component name: `g` inside `psr` becomes `g__psr`.
Namespacing stacks, so a port exposed through two boundaries carries two
suffixes; [`split_namespace`] strips exactly one level (the outermost).
*/

use serde::{Deserialize, Serialize};

use crate::error::{StructuralError, StructuralResult};

/// Separator between a port name and its sub-component qualifier.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Qualify `port` with the name of the sub-component that owns it.
pub fn append_namespace(port: &str, sub_component: &str) -> String {
    format!("{}{}{}", port, NAMESPACE_SEPARATOR, sub_component)
}

/// Split one level of qualification off a namespaced name, returning
/// `(port, sub_component)`. Splits on the last separator so stacked
/// namespaces peel off outermost-first. `None` for unqualified names.
pub fn split_namespace(name: &str) -> Option<(&str, &str)> {
    let idx = name.rfind(NAMESPACE_SEPARATOR)?;
    let (port, rest) = name.split_at(idx);
    if port.is_empty() {
        return None;
    }
    Some((port, &rest[NAMESPACE_SEPARATOR.len()..]))
}

/// Checks that a set of sub-component names keeps namespaced ports
/// unambiguous within one container: no duplicates.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NamespaceRegistry {
    container: String,
    names: Vec<String>,
}

impl NamespaceRegistry {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            names: Vec::new(),
        }
    }

    /// Register a sub-component name, rejecting collisions.
    pub fn register(&mut self, name: &str) -> StructuralResult<()> {
        if self.names.iter().any(|n| n == name) {
            return Err(StructuralError::NamespaceCollision {
                container: self.container.clone(),
                name: name.to_string(),
            });
        }
        self.names.push(name.to_string());
        Ok(())
    }
}
