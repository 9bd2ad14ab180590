//! Python bindings for specdrift
//!
//! Thin wrapper around `specdrift-core`: no logic here.
//! Every function takes contract text and returns a JSON string.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use serde::Serialize;
use specdrift_core::{SurfaceKind, ValidateOptions};

fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PyValueError::new_err(format!("Serialization error: {}", e)))
}

fn surface(name: Option<&str>) -> PyResult<Option<SurfaceKind>> {
    name.map(|n| n.parse::<SurfaceKind>().map_err(PyValueError::new_err))
        .transpose()
}

/// Parse contract text and return the model plus its surface trace as JSON.
///
/// Args:
///     text: contract text in key-value or inline notation
///     surface: "key-value" or "inline" to skip detection
///
/// Raises:
///     ValueError: If the text cannot be read as a contract
#[pyfunction]
#[pyo3(signature = (text, surface=None))]
fn parse(text: &str, surface: Option<&str>) -> PyResult<String> {
    let parsed = specdrift_core::parse_with(text, self::surface(surface)?)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    to_json(&parsed)
}

/// Validate a contract.
///
/// Returns:
///     JSON ValidationReport:
///     {
///         "identifier": str | null,
///         "digest": str,
///         "surface": "key-value" | "inline",
///         "overall_status": "VALID" | "VALID_WITH_WARNINGS" | "INVALID",
///         "findings": [{"severity": ..., "code": ..., "message": ..., "location": {...}}]
///     }
///
/// Raises:
///     ValueError: If the text cannot be read as a contract
#[pyfunction]
#[pyo3(signature = (text, surface=None, implementation_terms=None))]
fn validate(
    text: &str,
    surface: Option<&str>,
    implementation_terms: Option<Vec<String>>,
) -> PyResult<String> {
    let options = ValidateOptions {
        surface: self::surface(surface)?,
        implementation_terms: implementation_terms.unwrap_or_default(),
    };
    let report =
        specdrift_core::validate(text, &options).map_err(|e| PyValueError::new_err(e.to_string()))?;
    to_json(&report)
}

/// Compare a baseline contract against a candidate.
///
/// Returns:
///     JSON ValidationReport of the baseline with a "comparison" member
///     holding rule, parameter and test alignments.
///
/// Raises:
///     ValueError: If either contract cannot be read; the message names the side
#[pyfunction]
fn compare(baseline: &str, candidate: &str) -> PyResult<String> {
    let report =
        specdrift_core::validate_comparison(baseline, candidate, &ValidateOptions::default())
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
    to_json(&report)
}

/// Re-serialize a contract in canonical form.
///
/// Guarantees:
///   - Deterministic: same input → same output
///   - Idempotent: normalize(normalize(x)) == normalize(x)
///
/// Args:
///     text: contract text
///     to: target notation, "key-value" (default) or "inline"
#[pyfunction]
#[pyo3(signature = (text, to=None))]
fn normalize(text: &str, to: Option<&str>) -> PyResult<String> {
    let target = surface(to)?.unwrap_or(SurfaceKind::KeyValue);
    specdrift_core::normalize(text, target).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Compute the SHA-256 semantic hash of a contract.
///
/// The hash is taken over the canonical key-value form, so the same contract
/// written in either notation hashes identically.
#[pyfunction]
fn semantic_hash(text: &str) -> PyResult<String> {
    let parsed = specdrift_core::parse(text).map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(specdrift_core::semantic_hash(&parsed.model))
}

/// specdrift Python module: behavioral contract validation and drift detection
#[pymodule]
fn specdrift(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse, m)?)?;
    m.add_function(wrap_pyfunction!(validate, m)?)?;
    m.add_function(wrap_pyfunction!(compare, m)?)?;
    m.add_function(wrap_pyfunction!(normalize, m)?)?;
    m.add_function(wrap_pyfunction!(semantic_hash, m)?)?;
    Ok(())
}
