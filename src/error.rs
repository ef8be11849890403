// SPDX-License-Identifier: Apache-2.0

//! Engine construction errors.
//!
//! Every *derived relation* in this crate is partial per spec §7: an
//! unresolved call or an unknown construct simply yields no tuple, never a
//! `Result::Err`. [`EngineError`] is reserved for the one class of failure
//! that really is exceptional — building an [`crate::Engine`] from input the
//! parser rejected, or a resource-exhaustion cap that is nonsensical.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("source did not parse: {0}")]
    Parse(String),

    #[error("taint fixpoint iteration budget must be nonzero")]
    ZeroIterationBudget,
}
