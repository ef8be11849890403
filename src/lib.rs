// SPDX-License-Identifier: Apache-2.0

//! Derived static-analysis relations for a Solidity-like contract language.
//!
//! This crate consumes a parsed syntax tree (via [`solang_parser`]) and computes
//! the relations a security-query engine needs: a control-flow graph over
//! statements, expressions and inline assembly; basic-block partition and
//! dominance; SSA definitions with phi placement; an inheritance-aware call
//! graph; and a configurable data-flow / taint-tracking framework over all of
//! the above.
//!
//! The crate does not evaluate contract semantics, does not implement a query
//! language, and does not render reports — see [`query`] for the thin runtime
//! that client queries are built on.

pub mod blocks;
pub mod callgraph;
pub mod cfg;
pub mod dataflow;
pub mod diagnostics;
pub mod dominance;
pub mod engine;
pub mod error;
pub mod options;
pub mod program;
pub mod query;
pub mod ssa;
pub mod tree;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use options::AnalysisOptions;
pub use tree::{NodeId, NodeKind, Tree};
