//! Consistency checks (`X*`): cross-references between fields
//!
//! Builds a coverage graph from behavior rules to the tests that exercise
//! them, then checks edge cases, constraints and error messages against it.
//! Matching is purely textual: nothing here interprets what a rule means.

use std::sync::OnceLock;

use regex::Regex;

use crate::finding::{FindingSet, Location};
use crate::normalizer::{contains_on_token_boundaries, normalize_expression, normalize_message};
use crate::parser::ParsedContract;
use crate::signature::parse_signature;
use crate::{BehaviorRule, ContractModel, ErrorDescriptor, Expectation, Field, Outcome, TestCase};

// ── Coverage graph ────────────────────────────────────────

/// Positions of the tests that cover `rule`
pub fn covering_tests(rule: &BehaviorRule, tests: &[TestCase]) -> Vec<usize> {
    tests
        .iter()
        .filter(|test| covers(&rule.outcome(), test))
        .map(|test| test.position)
        .collect()
}

/// Whether `test` exercises a rule with this outcome
pub fn covers(outcome: &Outcome, test: &TestCase) -> bool {
    match (outcome, &test.expectation) {
        (Outcome::Value { expression }, Expectation::Value { value }) => {
            contains_on_token_boundaries(
                &normalize_expression(value),
                &normalize_expression(expression),
            )
        }
        (Outcome::Error(raised), Expectation::Error(expected)) => {
            raised.accepts(expected)
                && match (&raised.message, &expected.message) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                }
        }
        _ => false,
    }
}

/// Coverage of every rule, indexed by rule position
pub fn coverage(model: &ContractModel) -> Vec<Vec<usize>> {
    model
        .behavior_rules
        .iter()
        .map(|rule| covering_tests(rule, &model.tests))
        .collect()
}

// ── Checks ────────────────────────────────────────────────

pub fn check(contract: &ParsedContract, findings: &mut FindingSet) {
    let model = &contract.model;
    let trace = &contract.trace;

    if trace.has_field(Field::Behavior) && trace.has_field(Field::Tests) {
        check_coverage(model, findings);
        check_error_messages(model, findings);
        check_ambiguous_coverage(model, findings);
    }
    if trace.has_field(Field::Tests) && trace.has_field(Field::EdgeCases) {
        check_edge_cases(model, findings);
    }
    if trace.has_field(Field::Behavior) && trace.has_field(Field::Constraints) {
        check_constraints(model, findings);
    }
}

/// X1 uncovered rules, X6 unexercised default
fn check_coverage(model: &ContractModel, findings: &mut FindingSet) {
    for (rule, tests) in model.behavior_rules.iter().zip(coverage(model)) {
        if !tests.is_empty() {
            continue;
        }
        let location = Location::Rule {
            position: rule.position,
        };
        if rule.is_default {
            findings.info(
                "X6",
                location,
                format!("default rule `OTHERWISE {}` is not exercised by any test", rule.action),
            );
        } else {
            findings.fail(
                "X1",
                location,
                format!(
                    "rule `WHEN {} THEN {}` is not covered by any test",
                    rule.condition, rule.action
                ),
            );
        }
    }
}

fn error_rules(model: &ContractModel) -> Vec<(usize, ErrorDescriptor)> {
    model
        .behavior_rules
        .iter()
        .filter_map(|rule| match rule.outcome() {
            Outcome::Error(descriptor) => Some((rule.position, descriptor)),
            Outcome::Value { .. } => None,
        })
        .collect()
}

fn error_tests(model: &ContractModel) -> Vec<(usize, ErrorDescriptor)> {
    model
        .tests
        .iter()
        .filter_map(|test| match test.expectation {
            Expectation::Error(ref descriptor) => Some((test.position, descriptor.clone())),
            Expectation::Value { .. } => None,
        })
        .collect()
}

/// X4: a rule message must equal the message of every test aimed at it
fn check_error_messages(model: &ContractModel, findings: &mut FindingSet) {
    let rules = error_rules(model);
    let tests = error_tests(model);

    for (position, raised) in &rules {
        let Some(ref message) = raised.message else {
            continue;
        };
        let targeting: Vec<&String> = tests
            .iter()
            .filter_map(|(_, expected)| {
                let expected_message = expected.message.as_ref()?;
                if !raised.accepts(expected) {
                    return None;
                }
                let compatible_rules = rules.iter().filter(|(_, r)| r.accepts(expected)).count();
                let near = normalize_message(expected_message) == normalize_message(message);
                (compatible_rules == 1 || near).then_some(expected_message)
            })
            .collect();

        if !targeting.is_empty() && !targeting.iter().any(|m| *m == message) {
            findings.fail(
                "X4",
                Location::Rule {
                    position: *position,
                },
                format!(
                    "error messages match: rule raises \"{message}\" but its tests expect {}",
                    targeting
                        .iter()
                        .map(|m| format!("\"{m}\""))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            );
        }
    }
}

/// X5: coverage that cannot be attributed to a single rule
fn check_ambiguous_coverage(model: &ContractModel, findings: &mut FindingSet) {
    let rules = error_rules(model);

    for (position, expected) in error_tests(model) {
        if expected.message.is_some() {
            continue;
        }
        let matching: Vec<usize> = rules
            .iter()
            .filter(|(_, raised)| raised.accepts(&expected))
            .map(|(p, _)| *p)
            .collect();
        if matching.len() > 1 {
            findings.warn(
                "X5",
                Location::Test { position },
                format!(
                    "ambiguous coverage: `raises {}` matches rules {}",
                    expected.error_kind,
                    join_positions(&matching)
                ),
            );
        }
    }

    for (i, (position, raised)) in rules.iter().enumerate() {
        let Some(ref message) = raised.message else {
            continue;
        };
        let earlier = rules[..i].iter().find(|(_, other)| {
            other
                .message
                .as_ref()
                .is_some_and(|m| normalize_message(m) == normalize_message(message))
        });
        if let Some((first, _)) = earlier {
            findings.warn(
                "X5",
                Location::Rule {
                    position: *position,
                },
                format!("ambiguous coverage: rule shares its error message with rule {first}"),
            );
        }
    }
}

/// X2: every edge case is mentioned by some test argument
fn check_edge_cases(model: &ContractModel, findings: &mut FindingSet) {
    let arguments: Vec<String> = model
        .tests
        .iter()
        .flat_map(|t| t.arguments())
        .collect();

    for (index, edge_case) in model.edge_cases.iter().enumerate() {
        let triggers = edge_case_triggers(edge_case.trigger());
        let mentioned = arguments
            .iter()
            .any(|arg| triggers.iter().any(|trigger| trigger.mentioned_by(arg)));
        if !mentioned {
            findings.warn(
                "X2",
                Location::EdgeCase { index },
                format!("edge case `{}` is not exercised by any test argument", edge_case.text),
            );
        }
    }
}

/// X3: bound constraints need a rule that looks at their subject
fn check_constraints(model: &ContractModel, findings: &mut FindingSet) {
    let signature = parse_signature(&model.signature);

    for (index, constraint) in model.constraints.iter().enumerate() {
        if !constraint.implies_bound() {
            continue;
        }
        let subject = constraint.subject().or_else(|| {
            first_identifier(&constraint.text)
                .filter(|ident| signature.as_ref().is_some_and(|s| s.has_parameter(ident)))
        });
        let Some(subject) = subject else {
            continue;
        };
        // `code.length` is about `code`
        let root = subject.split('.').next().unwrap_or(&subject).to_string();

        let referenced = model
            .behavior_rules
            .iter()
            .any(|rule| contains_on_token_boundaries(&rule.condition, &root));
        if !referenced {
            findings.warn(
                "X3",
                Location::Constraint { index },
                format!(
                    "constraint `{}` declares a bound on `{root}` but no rule condition references it",
                    constraint.text
                ),
            );
        }
    }
}

fn first_identifier(text: &str) -> Option<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .find(|w| w.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_'))
        .map(str::to_string)
}

fn join_positions(positions: &[usize]) -> String {
    positions
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Edge-case triggers ────────────────────────────────────

/// A literal spelling (or free text) an edge case is exercised by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Normalized literal that must appear on token boundaries
    Literal(String),
    /// Argument starts with a minus sign
    Negative,
    /// Case-insensitive free-text mention
    Text(String),
}

impl Trigger {
    pub fn mentioned_by(&self, argument: &str) -> bool {
        match self {
            Trigger::Literal(literal) => {
                contains_on_token_boundaries(&normalize_expression(argument), literal)
            }
            Trigger::Negative => argument.trim_start().starts_with('-'),
            Trigger::Text(text) => argument.to_lowercase().contains(&text.to_lowercase()),
        }
    }
}

fn literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""[^"]*"|'[^']*'|-?\b\d+(?:\.\d+)?\b"#).expect("literal pattern must compile")
    })
}

/// Literal spellings of an edge-case description
pub fn edge_case_triggers(description: &str) -> Vec<Trigger> {
    let lower = description.to_lowercase();
    let has = |phrase: &str| contains_on_token_boundaries(&lower, phrase);
    let mut triggers = Vec::new();

    if has("empty string") {
        triggers.push(Trigger::Literal("\"\"".into()));
    }
    if ["empty list", "empty array", "empty collection"].iter().any(|p| has(p)) {
        triggers.push(Trigger::Literal("[]".into()));
    }
    if ["empty dict", "empty map", "empty object"].iter().any(|p| has(p)) {
        triggers.push(Trigger::Literal("{}".into()));
    }
    if has("zero") {
        triggers.push(Trigger::Literal("0".into()));
    }
    if ["none", "null", "nil"].iter().any(|p| has(p)) {
        for literal in ["None", "null", "nil"] {
            triggers.push(Trigger::Literal(literal.into()));
        }
    }
    if has("negative") {
        triggers.push(Trigger::Negative);
    }

    for literal in literal_re().find_iter(description) {
        triggers.push(Trigger::Literal(normalize_expression(literal.as_str())));
    }

    if triggers.is_empty() {
        let text = description.trim();
        if !text.is_empty() {
            triggers.push(Trigger::Text(text.to_string()));
        }
    }
    triggers
}
