//! Contract verifier: structural, content and consistency checks
//!
//! The verifier runs over a [`ParsedContract`] and accumulates every
//! finding rather than stopping at the first one. Checks for a field that
//! is missing are skipped; its absence is already a structural finding.
//!
//! # Verification Phases
//!
//! 1. **Structural** (`S*`): required fields, labels, metadata, surface syntax
//! 2. **Content** (`C*`): field-level well-formedness
//! 3. **Consistency** (`X*`): rule coverage, edge cases, constraints, messages

pub mod consistency;
pub mod content;
pub mod structural;

use serde::{Deserialize, Serialize};

use crate::finding::{Finding, FindingSet};
use crate::parser::{ParsedContract, SurfaceKind};

/// Caller-supplied knobs for validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateOptions {
    /// Notation to parse with; auto-detected when `None`
    pub surface: Option<SurfaceKind>,
    /// Extra implementation-detail terms for the INTENT check
    pub implementation_terms: Vec<String>,
}

// ── Public API ────────────────────────────────────────────

/// Verify a parsed contract.
///
/// Runs all phases and returns findings in emission order.
pub fn verify(contract: &ParsedContract, options: &ValidateOptions) -> Vec<Finding> {
    let mut findings = FindingSet::new();

    structural::check(contract, &mut findings);
    let structural = findings.len();

    content::check(contract, options, &mut findings);
    let content = findings.len() - structural;

    consistency::check(contract, &mut findings);
    let consistency = findings.len() - structural - content;

    tracing::debug!(structural, content, consistency, "verified contract");
    findings.into_vec()
}
