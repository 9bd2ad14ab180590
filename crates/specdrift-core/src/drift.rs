//! Drift comparator: aligns two behavioral models and classifies the pairs
//!
//! Alignment is a greedy maximum-weight matching over all baseline ×
//! candidate pairs, so added, removed and reordered rules are all tolerated.
//! The same procedure aligns signature parameters and tests.
//!
//! Weights and the match threshold are fixed constants; they are part of
//! the comparison contract, not configuration.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{ComparisonError, Side};
use crate::finding::{Finding, Location, Severity};
use crate::normalizer::{collapse_whitespace, normalize_expression, normalize_text};
use crate::parser::{parse_with, SurfaceKind};
use crate::signature::{parse_signature, Parameter};
use crate::{BehaviorRule, ContractModel, Expectation, Field, TestCase};

/// Weight of an equal normalized condition in a rule score
pub const CONDITION_WEIGHT: f64 = 0.6;
/// Weight of an equal normalized action in a rule score
pub const ACTION_WEIGHT: f64 = 0.4;
/// Weight of an equal name in a parameter score
pub const NAME_WEIGHT: f64 = 0.6;
/// Weight of an equal type annotation in a parameter score
pub const TYPE_WEIGHT: f64 = 0.4;
/// Pairs scoring below this are never matched
pub const MATCH_THRESHOLD: f64 = 0.5;
/// Highest score two invocations that are not identical can reach
pub const INEXACT_INVOCATION_CEILING: f64 = 0.99;

// ── Result types ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftStatus {
    Match,
    Drift,
    Missing,
    Undocumented,
}

impl std::fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DriftStatus::Match => write!(f, "MATCH"),
            DriftStatus::Drift => write!(f, "DRIFT"),
            DriftStatus::Missing => write!(f, "MISSING"),
            DriftStatus::Undocumented => write!(f, "UNDOCUMENTED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RulePart {
    Condition,
    Action,
}

/// Literal before/after text of the half of a rule that changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextDiff {
    pub part: RulePart,
    pub before: String,
    pub after: String,
}

/// One aligned (or unaligned) rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleAlignment {
    pub status: DriftStatus,
    pub baseline_position: Option<usize>,
    pub candidate_position: Option<usize>,
    pub score: f64,
    /// Matched, but out of order relative to the other matched rules
    pub reordered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<BehaviorRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<BehaviorRule>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<TextDiff>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterAlignment {
    pub status: DriftStatus,
    pub baseline_index: Option<usize>,
    pub candidate_index: Option<usize>,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestAlignment {
    pub status: DriftStatus,
    pub baseline_position: Option<usize>,
    pub candidate_position: Option<usize>,
    pub score: f64,
    /// Both sides expect the same outcome
    pub expectation_equal: bool,
}

/// Outcome of comparing two contract models
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Baseline rules in order, then candidate-only rules in order
    pub rules: Vec<RuleAlignment>,
    pub parameters: Vec<ParameterAlignment>,
    pub tests: Vec<TestAlignment>,
    pub findings: Vec<Finding>,
}

impl ComparisonResult {
    pub fn has_failures(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Fail)
    }

    /// Status of the baseline rule at `position`
    pub fn status_of(&self, position: usize) -> Option<DriftStatus> {
        self.rules
            .iter()
            .find(|r| r.baseline_position == Some(position))
            .map(|r| r.status)
    }

    pub fn undocumented(&self) -> impl Iterator<Item = &RuleAlignment> {
        self.rules
            .iter()
            .filter(|r| r.status == DriftStatus::Undocumented)
    }

    pub fn count(&self, status: DriftStatus) -> usize {
        self.rules.iter().filter(|r| r.status == status).count()
    }
}

// ── Public API ────────────────────────────────────────────

/// Compare two models: rules, then signature, then tests
pub fn compare(baseline: &ContractModel, candidate: &ContractModel) -> ComparisonResult {
    let mut findings = Vec::new();

    let rules = compare_rules(&baseline.behavior_rules, &candidate.behavior_rules, &mut findings);
    let parameters = compare_signatures(baseline, candidate, &mut findings);
    let tests = compare_tests(&baseline.tests, &candidate.tests, &mut findings);

    tracing::debug!(
        matched = rules.iter().filter(|r| r.status == DriftStatus::Match).count(),
        drifted = rules.iter().filter(|r| r.status == DriftStatus::Drift).count(),
        missing = rules.iter().filter(|r| r.status == DriftStatus::Missing).count(),
        undocumented = rules.iter().filter(|r| r.status == DriftStatus::Undocumented).count(),
        "compared contracts"
    );

    ComparisonResult {
        rules,
        parameters,
        tests,
        findings,
    }
}

/// Parse both texts, then [`compare`]
///
/// # Errors
/// Fails fast with [`ComparisonError::Unparsed`] naming the side whose text
/// does not parse; no partial comparison is attempted.
pub fn compare_sources(
    baseline: &str,
    candidate: &str,
    surface: Option<SurfaceKind>,
) -> Result<ComparisonResult, ComparisonError> {
    let baseline = parse_with(baseline, surface).map_err(|source| ComparisonError::Unparsed {
        side: Side::Baseline,
        source,
    })?;
    let candidate = parse_with(candidate, surface).map_err(|source| ComparisonError::Unparsed {
        side: Side::Candidate,
        source,
    })?;
    Ok(compare(&baseline.model, &candidate.model))
}

// ── Alignment ─────────────────────────────────────────────

/// Greedy maximum-weight matching of `baseline_len × candidate_len` pairs
///
/// Pairs are taken by descending score, then smaller position difference,
/// then baseline position, then candidate position. Returns the committed
/// `(baseline, candidate, score)` triples in baseline order.
pub fn align(
    baseline_len: usize,
    candidate_len: usize,
    score: impl Fn(usize, usize) -> f64,
) -> Vec<(usize, usize, f64)> {
    let mut pairs: Vec<(usize, usize, f64)> = (0..baseline_len)
        .flat_map(|b| (0..candidate_len).map(move |c| (b, c)))
        .map(|(b, c)| (b, c, score(b, c)))
        .filter(|(_, _, s)| *s >= MATCH_THRESHOLD)
        .collect();

    pairs.sort_by(|x, y| {
        y.2.total_cmp(&x.2)
            .then_with(|| x.0.abs_diff(x.1).cmp(&y.0.abs_diff(y.1)))
            .then_with(|| x.0.cmp(&y.0))
            .then_with(|| x.1.cmp(&y.1))
    });

    let mut used_baseline = BTreeSet::new();
    let mut used_candidate = BTreeSet::new();
    let mut committed = Vec::new();
    for (b, c, s) in pairs {
        if used_baseline.contains(&b) || used_candidate.contains(&c) {
            continue;
        }
        tracing::trace!(baseline = b, candidate = c, score = s, "committed pair");
        used_baseline.insert(b);
        used_candidate.insert(c);
        committed.push((b, c, s));
    }
    committed.sort_by_key(|&(b, _, _)| b);
    committed
}

/// Indices (into `sequence`) of one longest strictly increasing subsequence
fn longest_increasing(sequence: &[usize]) -> BTreeSet<usize> {
    let n = sequence.len();
    let mut length = vec![1usize; n];
    let mut previous: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        for j in 0..i {
            if sequence[j] < sequence[i] && length[j] + 1 > length[i] {
                length[i] = length[j] + 1;
                previous[i] = Some(j);
            }
        }
    }

    let mut keep = BTreeSet::new();
    let best = (0..n).max_by(|&a, &b| length[a].cmp(&length[b]).then(b.cmp(&a)));
    let mut cursor = best;
    while let Some(i) = cursor {
        keep.insert(i);
        cursor = previous[i];
    }
    keep
}

// ── Rules ─────────────────────────────────────────────────

/// Similarity of two rules: weighted equality of the normalized halves
pub fn rule_score(a: &BehaviorRule, b: &BehaviorRule) -> f64 {
    let (condition, action) = rule_halves(a, b);
    let mut score = 0.0;
    if condition {
        score += CONDITION_WEIGHT;
    }
    if action {
        score += ACTION_WEIGHT;
    }
    score
}

fn rule_halves(a: &BehaviorRule, b: &BehaviorRule) -> (bool, bool) {
    (
        normalize_text(&a.condition) == normalize_text(&b.condition),
        normalize_text(&a.action) == normalize_text(&b.action),
    )
}

fn compare_rules(
    baseline: &[BehaviorRule],
    candidate: &[BehaviorRule],
    findings: &mut Vec<Finding>,
) -> Vec<RuleAlignment> {
    let pairs = align(baseline.len(), candidate.len(), |b, c| {
        rule_score(&baseline[b], &candidate[c])
    });

    let order: Vec<usize> = pairs.iter().map(|&(_, c, _)| c).collect();
    let in_order = longest_increasing(&order);

    let mut alignments = Vec::new();
    let mut pair_index = 0;
    for (b, rule) in baseline.iter().enumerate() {
        let location = Location::Rule {
            position: rule.position,
        };
        let Some(&(_, c, score)) = pairs.get(pair_index).filter(|p| p.0 == b) else {
            findings.push(Finding::fail(
                "D2",
                location,
                format!("rule `{}` is missing from the candidate", describe(rule)),
            ));
            alignments.push(RuleAlignment {
                status: DriftStatus::Missing,
                baseline_position: Some(rule.position),
                candidate_position: None,
                score: 0.0,
                reordered: false,
                baseline: Some(rule.clone()),
                candidate: None,
                diff: Vec::new(),
            });
            continue;
        };

        let other = &candidate[c];
        let reordered = !in_order.contains(&pair_index);
        pair_index += 1;

        let (condition_equal, action_equal) = rule_halves(rule, other);
        let mut diff = Vec::new();
        if !condition_equal {
            diff.push(TextDiff {
                part: RulePart::Condition,
                before: rule.condition.clone(),
                after: other.condition.clone(),
            });
        }
        if !action_equal {
            diff.push(TextDiff {
                part: RulePart::Action,
                before: rule.action.clone(),
                after: other.action.clone(),
            });
        }

        let status = if diff.is_empty() {
            DriftStatus::Match
        } else {
            DriftStatus::Drift
        };
        if status == DriftStatus::Drift {
            let details: Vec<String> = diff
                .iter()
                .map(|d| {
                    let part = match d.part {
                        RulePart::Condition => "condition",
                        RulePart::Action => "action",
                    };
                    format!("{part} `{}` -> `{}`", d.before, d.after)
                })
                .collect();
            findings.push(Finding::fail(
                "D1",
                location,
                format!("rule drifted: {}", details.join("; ")),
            ));
        }
        if reordered {
            findings.push(Finding::info(
                "D4",
                location,
                format!(
                    "rule moved from position {} to position {}",
                    rule.position, other.position
                ),
            ));
        }

        alignments.push(RuleAlignment {
            status,
            baseline_position: Some(rule.position),
            candidate_position: Some(other.position),
            score,
            reordered,
            baseline: Some(rule.clone()),
            candidate: Some(other.clone()),
            diff,
        });
    }

    let matched: BTreeSet<usize> = pairs.iter().map(|&(_, c, _)| c).collect();
    for (c, rule) in candidate.iter().enumerate() {
        if matched.contains(&c) {
            continue;
        }
        findings.push(Finding::warn(
            "D3",
            Location::CandidateRule {
                position: rule.position,
            },
            format!(
                "candidate rule {} `{}` is not documented in the baseline",
                rule.position,
                describe(rule)
            ),
        ));
        alignments.push(RuleAlignment {
            status: DriftStatus::Undocumented,
            baseline_position: None,
            candidate_position: Some(rule.position),
            score: 0.0,
            reordered: false,
            baseline: None,
            candidate: Some(rule.clone()),
            diff: Vec::new(),
        });
    }

    alignments
}

fn describe(rule: &BehaviorRule) -> String {
    if rule.is_default {
        format!("OTHERWISE {}", rule.action)
    } else {
        format!("WHEN {} THEN {}", rule.condition, rule.action)
    }
}

// ── Signature ─────────────────────────────────────────────

fn parameter_score(a: &Parameter, b: &Parameter) -> f64 {
    let mut score = 0.0;
    if a.name == b.name {
        score += NAME_WEIGHT;
    }
    if normalized_type(a) == normalized_type(b) {
        score += TYPE_WEIGHT;
    }
    score
}

fn normalized_type(parameter: &Parameter) -> Option<String> {
    parameter.type_annotation.as_deref().map(collapse_whitespace)
}

fn compare_signatures(
    baseline: &ContractModel,
    candidate: &ContractModel,
    findings: &mut Vec<Finding>,
) -> Vec<ParameterAlignment> {
    let signature_location = Location::Field {
        field: Field::Signature,
    };
    let (Some(before), Some(after)) = (
        parse_signature(&baseline.signature),
        parse_signature(&candidate.signature),
    ) else {
        findings.push(Finding::warn(
            "D6",
            signature_location,
            "signatures are not comparable: at least one is not a function declaration",
        ));
        return Vec::new();
    };

    if before.name != after.name {
        findings.push(Finding::warn(
            "D6",
            signature_location,
            format!("function renamed from `{}` to `{}`", before.name, after.name),
        ));
    }
    if let (Some(old), Some(new)) = (&before.return_type, &after.return_type) {
        if collapse_whitespace(old) != collapse_whitespace(new) {
            findings.push(Finding::fail(
                "D6",
                signature_location,
                format!("return annotation changed from `{old}` to `{new}`"),
            ));
        }
    }

    let pairs = align(before.parameters.len(), after.parameters.len(), |b, c| {
        parameter_score(&before.parameters[b], &after.parameters[c])
    });

    let mut alignments = Vec::new();
    for (b, parameter) in before.parameters.iter().enumerate() {
        match pairs.iter().find(|p| p.0 == b) {
            Some(&(_, c, score)) => {
                let other = &after.parameters[c];
                let status = if parameter.name == other.name
                    && normalized_type(parameter) == normalized_type(other)
                {
                    DriftStatus::Match
                } else {
                    DriftStatus::Drift
                };
                if status == DriftStatus::Drift {
                    findings.push(Finding::fail(
                        "D5",
                        Location::Parameter { index: b },
                        format!(
                            "parameter drifted: `{}` -> `{}`",
                            render_parameter(parameter),
                            render_parameter(other)
                        ),
                    ));
                }
                alignments.push(ParameterAlignment {
                    status,
                    baseline_index: Some(b),
                    candidate_index: Some(c),
                    score,
                    baseline: Some(parameter.clone()),
                    candidate: Some(other.clone()),
                });
            }
            None => {
                findings.push(Finding::fail(
                    "D5",
                    Location::Parameter { index: b },
                    format!("parameter `{}` is missing from the candidate", render_parameter(parameter)),
                ));
                alignments.push(ParameterAlignment {
                    status: DriftStatus::Missing,
                    baseline_index: Some(b),
                    candidate_index: None,
                    score: 0.0,
                    baseline: Some(parameter.clone()),
                    candidate: None,
                });
            }
        }
    }

    for (c, parameter) in after.parameters.iter().enumerate() {
        if pairs.iter().any(|p| p.1 == c) {
            continue;
        }
        findings.push(Finding::warn(
            "D5",
            Location::CandidateParameter { index: c },
            format!("candidate has extra parameter `{}`", render_parameter(parameter)),
        ));
        alignments.push(ParameterAlignment {
            status: DriftStatus::Undocumented,
            baseline_index: None,
            candidate_index: Some(c),
            score: 0.0,
            baseline: None,
            candidate: Some(parameter.clone()),
        });
    }

    alignments
}

fn render_parameter(parameter: &Parameter) -> String {
    match parameter.type_annotation {
        Some(ref ty) => format!("{}: {}", parameter.name, ty),
        None => parameter.name.clone(),
    }
}

// ── Tests ─────────────────────────────────────────────────

/// Token Jaccard similarity of two invocations
pub fn invocation_similarity(a: &str, b: &str) -> f64 {
    let left: BTreeSet<String> = normalize_text(a).split(' ').map(str::to_string).collect();
    let right: BTreeSet<String> = normalize_text(b).split(' ').map(str::to_string).collect();
    let union = left.union(&right).filter(|t| !t.is_empty()).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).filter(|t| !t.is_empty()).count();
    intersection as f64 / union as f64
}

/// Identical calls: same arguments in the same order, literal case kept
pub fn same_invocation(a: &str, b: &str) -> bool {
    normalize_expression(a) == normalize_expression(b)
}

/// Alignment score of two tests; identical calls outrank token-equal ones
fn test_score(a: &TestCase, b: &TestCase) -> f64 {
    if same_invocation(&a.invocation, &b.invocation) {
        1.0
    } else {
        invocation_similarity(&a.invocation, &b.invocation).min(INEXACT_INVOCATION_CEILING)
    }
}

fn same_expectation(a: &Expectation, b: &Expectation) -> bool {
    match (a, b) {
        (Expectation::Value { value: x }, Expectation::Value { value: y }) => {
            normalize_expression(x) == normalize_expression(y)
        }
        (Expectation::Error(x), Expectation::Error(y)) => x == y,
        _ => false,
    }
}

fn compare_tests(
    baseline: &[TestCase],
    candidate: &[TestCase],
    findings: &mut Vec<Finding>,
) -> Vec<TestAlignment> {
    let pairs = align(baseline.len(), candidate.len(), |b, c| {
        test_score(&baseline[b], &candidate[c])
    });

    let mut alignments = Vec::new();
    for (b, test) in baseline.iter().enumerate() {
        let location = Location::Test {
            position: test.position,
        };
        let Some(&(_, c, score)) = pairs.iter().find(|p| p.0 == b) else {
            findings.push(Finding::warn(
                "D8",
                location,
                format!("test `{}` is missing from the candidate", test.invocation),
            ));
            alignments.push(TestAlignment {
                status: DriftStatus::Missing,
                baseline_position: Some(test.position),
                candidate_position: None,
                score: 0.0,
                expectation_equal: false,
            });
            continue;
        };

        let other = &candidate[c];
        let expectation_equal = same_expectation(&test.expectation, &other.expectation);
        let identical_call = same_invocation(&test.invocation, &other.invocation);
        let status = if identical_call && expectation_equal {
            DriftStatus::Match
        } else {
            DriftStatus::Drift
        };

        if identical_call && !expectation_equal {
            findings.push(Finding::fail(
                "D7",
                location,
                format!(
                    "expectation changed for `{}`: `{}` -> `{}`",
                    test.invocation,
                    crate::normalizer::test_line(test),
                    crate::normalizer::test_line(other)
                ),
            ));
        } else if !identical_call {
            let mut message = format!(
                "invocation changed: `{}` -> `{}`",
                test.invocation, other.invocation
            );
            if !expectation_equal {
                message.push_str("; expectation differs as well");
            }
            findings.push(Finding::warn("D7", location, message));
        }

        alignments.push(TestAlignment {
            status,
            baseline_position: Some(test.position),
            candidate_position: Some(other.position),
            score,
            expectation_equal,
        });
    }

    for (c, test) in candidate.iter().enumerate() {
        if pairs.iter().any(|p| p.1 == c) {
            continue;
        }
        findings.push(Finding::info(
            "D9",
            Location::CandidateTest {
                position: test.position,
            },
            format!("candidate-only test `{}`", test.invocation),
        ));
        alignments.push(TestAlignment {
            status: DriftStatus::Undocumented,
            baseline_position: None,
            candidate_position: Some(test.position),
            score: 0.0,
            expectation_equal: false,
        });
    }

    alignments
}
