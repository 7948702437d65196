// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Roles, communication kinds and port connections.

Port connections inside a projection are tagged with the logical role of
each endpoint rather than a concrete component name; the lowering pass
resolves roles to sub-component names through an explicit role table.
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Logical position of a port-connection endpoint within a projection.
///
/// Closed set: `Synapse` only appears after response and plasticity have
/// been merged, never in user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Pre,
    Post,
    Response,
    Plasticity,
    Synapse,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Pre => "pre",
            Role::Post => "post",
            Role::Response => "response",
            Role::Plasticity => "plasticity",
            Role::Synapse => "synapse",
        }
    }

    /// Whether this endpoint lives in one of the two cell populations.
    pub fn is_cell(&self) -> bool {
        matches!(self, Role::Pre | Role::Post)
    }

    /// Whether this endpoint lives inside the (unmerged) synapse.
    pub fn is_synaptic(&self) -> bool {
        matches!(self, Role::Response | Role::Plasticity)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre" => Ok(Role::Pre),
            "post" => Ok(Role::Post),
            "response" => Ok(Role::Response),
            "plasticity" => Ok(Role::Plasticity),
            "synapse" => Ok(Role::Synapse),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// What a connection carries: discrete events or continuous values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Communication {
    Event,
    Analog,
}

impl Communication {
    pub fn as_str(&self) -> &'static str {
        match self {
            Communication::Event => "event",
            Communication::Analog => "analog",
        }
    }
}

impl fmt::Display for Communication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed link between two ports, each endpoint tagged with its role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortConnection {
    pub sender: Role,
    pub receiver: Role,
    pub send_port: String,
    pub receive_port: String,
    pub communicates: Communication,
}

impl PortConnection {
    pub fn event(
        sender: Role,
        send_port: impl Into<String>,
        receiver: Role,
        receive_port: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            receiver,
            send_port: send_port.into(),
            receive_port: receive_port.into(),
            communicates: Communication::Event,
        }
    }

    pub fn analog(
        sender: Role,
        send_port: impl Into<String>,
        receiver: Role,
        receive_port: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            receiver,
            send_port: send_port.into(),
            receive_port: receive_port.into(),
            communicates: Communication::Analog,
        }
    }

    /// Whether either endpoint carries the given role.
    pub fn touches(&self, role: Role) -> bool {
        self.sender == role || self.receiver == role
    }
}

impl fmt::Display for PortConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} ({})",
            self.sender, self.send_port, self.receiver, self.receive_port, self.communicates
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            Role::Pre,
            Role::Post,
            Role::Response,
            Role::Plasticity,
            Role::Synapse,
        ] {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("dendrite".parse::<Role>().is_err());
    }

    #[test]
    fn test_touches() {
        let pc = PortConnection::event(Role::Pre, "spike", Role::Response, "spike_in");
        assert!(pc.touches(Role::Pre));
        assert!(pc.touches(Role::Response));
        assert!(!pc.touches(Role::Post));
    }
}
