//! # synfold - Neural-circuit lowering
//!
//! synfold converts a hierarchical description of a neural circuit
//! (populations of cells connected by projections, each projection carrying
//! separate response and plasticity synapse dynamics) into a flat,
//! simulator-ready representation: per-population [`ComponentArray`]s and
//! per-edge-direction [`ConnectionGroup`]s.
//!
//! The pass itself is pure and synchronous. Backend instantiation,
//! connectivity sampling, random numbers and unit conversion are the
//! responsibility of whatever consumes the [`FlattenedNetwork`] output.
//!
//! ## Feature Flags
//!
//! - **`parallel`** (default): flatten populations in parallel via rayon.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use synfold::prelude::*;
//!
//! # fn network() -> Network { unimplemented!() }
//! let network: Network = network();
//! let flattener = NetworkFlattener::new();
//! let flat = flattener.flatten(&network).unwrap();
//! for (name, array) in &flat.component_arrays {
//!     println!("{name}: {} cells", array.size);
//! }
//! ```
//!
//! [`ComponentArray`]: synfold_structures::ComponentArray
//! [`ConnectionGroup`]: synfold_structures::ConnectionGroup
//! [`FlattenedNetwork`]: synfold_lowering::FlattenedNetwork

pub use synfold_lowering as lowering;
pub use synfold_structures as structures;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types, re-exported for convenience.
pub mod prelude {
    pub use synfold_lowering::{
        Classification, FlattenedNetwork, LoweringError, LoweringResult, NetworkFlattener,
    };
    pub use synfold_structures::{
        Communication, ComponentArray, ConnectionGroup, ConnectionPropertySet, Connectivity,
        ConnectivityRule, Dynamics, DynamicsProperties, Expr, MultiComponent, Network, Population,
        PopulationRef, PortConnection, Projection, Quantity, Role, Selection, StructuralError,
        SynapseProperties, Units, Value,
    };
}
