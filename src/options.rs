// SPDX-License-Identifier: Apache-2.0

//! Engine configuration, grounded on `codegen::Options` in the teacher: a
//! plain `Default`-deriving flag struct, not a builder.

/// Caps and feature toggles for [`crate::Engine`] construction.
///
/// `TaintConfig` (spec.md §4.6) is a separate, query-level configuration
/// surface passed to individual `dataflow` queries, not to the engine.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Whether `assembly { ... }` bodies get Yul-level CFG edges, or are
    /// instead treated as a single opaque CFG node (spec.md §4.1 Yul
    /// mirroring is optional engineering work a caller may skip for speed).
    pub analyze_assembly: bool,
    /// Fixpoint iteration budget for taint propagation (spec.md §7
    /// "resource exhaustion": fixpoint iteration budget exceeded).
    /// Measured in rounds over the full `reaches` relation, not individual
    /// edge traversals.
    pub taint_iteration_budget: usize,
    /// Cap on natural-loop body enumeration per function, a defensive
    /// bound against pathological CFGs (extremely deep/wide switch-like
    /// Yul constructs) rather than a spec requirement.
    pub max_loop_body_size: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            analyze_assembly: true,
            taint_iteration_budget: 10_000,
            max_loop_body_size: 100_000,
        }
    }
}
