// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Error and result types for the lowering pass.

Structural problems in the input are fatal and abort the pass. The
"unflattenable synapse" outcome is NOT an error: it is an expected
classification result (see [`crate::linearity::Classification`]) consumed
by an explicit branch in the orchestrator.
*/

use synfold_structures::StructuralError;

/// Result type for lowering operations
pub type LoweringResult<T> = Result<T, LoweringError>;

/// Fatal errors raised while lowering a network
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoweringError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
}
