//! Structural checks (`S*`): presence and shape, independent of content

use crate::finding::{Finding, FindingSet, Location};
use crate::parser::{ParsedContract, SurfaceKind};
use crate::Field;

pub fn check(contract: &ParsedContract, findings: &mut FindingSet) {
    check_required_fields(contract, findings);
    check_labels(contract, findings);
    check_metadata(contract, findings);
    if contract.trace.surface == SurfaceKind::Inline {
        check_inline_syntax(contract, findings);
    }
}

/// S1: every required field has a block
fn check_required_fields(contract: &ParsedContract, findings: &mut FindingSet) {
    for field in Field::REQUIRED {
        if !contract.trace.has_field(field) {
            findings.fail(
                "S1",
                Location::Field { field },
                format!("required field {field} is missing"),
            );
        }
    }
}

/// S2 unknown labels, S8 repeated blocks
fn check_labels(contract: &ParsedContract, findings: &mut FindingSet) {
    for mark in &contract.trace.unknown_fields {
        findings.push(
            Finding::fail(
                "S2",
                Location::Document,
                format!("unknown field label `{}`", mark.label),
            )
            .at(mark.span),
        );
    }

    for mark in &contract.trace.duplicate_fields {
        let location = Field::from_label(&mark.label)
            .map_or(Location::Document, |field| Location::Field { field });
        findings.push(
            Finding::warn(
                "S8",
                location,
                format!("field {} appears more than once; entries were merged", mark.label),
            )
            .at(mark.span),
        );
    }
}

/// S3-S5: metadata sub-fields and identifier agreement
fn check_metadata(contract: &ParsedContract, findings: &mut FindingSet) {
    let Some(ref metadata) = contract.model.metadata else {
        return;
    };

    if metadata.name.is_none() {
        findings.fail("S3", Location::Metadata, "metadata is missing `name`");
    }
    if metadata.language.is_none() {
        findings.fail("S4", Location::Metadata, "metadata is missing `language`");
    }

    if let (Some(name), Some(function)) = (&metadata.name, contract.model.function_name()) {
        if *name != function {
            findings.fail(
                "S5",
                Location::Metadata,
                format!("metadata name `{name}` does not match function name `{function}`"),
            );
        }
    }
}

/// S6 bold labels, S7 back-ticked code spans
fn check_inline_syntax(contract: &ParsedContract, findings: &mut FindingSet) {
    for mark in contract.trace.labels.iter().filter(|m| !m.bold) {
        let location = Field::from_label(&mark.label)
            .map_or(Location::Document, |field| Location::Field { field });
        findings.push(
            Finding::fail(
                "S6",
                location,
                format!("label {} is not bold (expected `**{}:**`)", mark.label, mark.label),
            )
            .at(mark.span),
        );
    }

    for mark in contract.trace.code_spans.iter().filter(|m| !m.backticked) {
        let (location, what) = match mark.field {
            Field::Tests => (Location::Test { position: mark.index }, "test"),
            field => (Location::Field { field }, "signature"),
        };
        findings.push(
            Finding::fail("S7", location, format!("{what} is not wrapped in back-ticks")).at(mark.span),
        );
    }
}
