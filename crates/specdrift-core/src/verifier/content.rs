//! Content checks (`C*`): field-level well-formedness

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::finding::{FindingSet, Location};
use crate::normalizer::{contains_on_token_boundaries, normalize_expression};
use crate::parser::grammar::argument_value;
use crate::parser::ParsedContract;
use crate::signature::parse_signature;
use crate::verifier::ValidateOptions;
use crate::{ContractModel, ExpectationKind, Field};

/// Longest INTENT, in sentences, before it reads as a design document
const MAX_INTENT_SENTENCES: usize = 3;

/// Minimum number of TESTS entries
pub const MIN_TESTS: usize = 3;

/// Words that describe how, not what
const IMPLEMENTATION_TERMS: [&str; 38] = [
    // algorithms
    "quicksort", "mergesort", "heapsort", "bubble sort", "binary search", "dijkstra",
    "breadth-first", "depth-first", "bfs", "dfs", "memoization", "memoize",
    "dynamic programming", "recursion", "recursive",
    // data structures
    "hashmap", "hash map", "hash table", "hashtable", "linked list", "arraylist", "b-tree",
    "trie", "binary tree",
    // libraries
    "numpy", "pandas", "lodash", "jquery", "django", "flask", "sqlalchemy", "requests library",
    "redux", "tokio", "serde",
    // pattern matching
    "regex", "regexp", "regular expression",
];

/// Values that exercise a boundary regardless of the declared bound
const BOUNDARY_LITERALS: [&str; 7] = ["0", "0.0", "\"\"", "[]", "{}", "()", "-0"];

pub fn check(contract: &ParsedContract, options: &ValidateOptions, findings: &mut FindingSet) {
    let model = &contract.model;
    let trace = &contract.trace;

    if trace.has_field(Field::Signature) {
        check_signature(model, findings);
    }
    if trace.has_field(Field::Intent) {
        check_intent(model, &options.implementation_terms, findings);
    }
    if trace.has_field(Field::Behavior) {
        check_behavior(model, findings);
    }
    if trace.has_field(Field::Tests) {
        check_tests(model, findings);
    }
}

/// C1
fn check_signature(model: &ContractModel, findings: &mut FindingSet) {
    if parse_signature(&model.signature).is_none() {
        findings.fail(
            "C1",
            Location::Field {
                field: Field::Signature,
            },
            format!(
                "signature `{}` is not a function declaration (expected a name, a parenthesized parameter list and an optional return annotation)",
                model.signature
            ),
        );
    }
}

/// C10 empty, C2 length, C3 implementation detail
fn check_intent(model: &ContractModel, extra_terms: &[String], findings: &mut FindingSet) {
    let location = Location::Field {
        field: Field::Intent,
    };
    let intent = model.intent.trim();
    if intent.is_empty() {
        findings.warn("C10", location, "intent is empty");
        return;
    }

    let sentences = count_sentences(intent);
    if sentences > MAX_INTENT_SENTENCES {
        findings.warn(
            "C2",
            location,
            format!("intent has {sentences} sentences (at most {MAX_INTENT_SENTENCES})"),
        );
    }

    let mut hits = implementation_terms(intent, extra_terms);
    if has_regex_literal(intent) {
        hits.push("regular-expression literal".to_string());
    }
    if !hits.is_empty() {
        findings.warn(
            "C3",
            location,
            format!("intent describes implementation detail: {}", hits.join(", ")),
        );
    }
}

/// Sentences end at `.`, `!` or `?` followed by whitespace or end of text
pub fn count_sentences(text: &str) -> usize {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut count = 0;
    let mut pending = false;
    for (i, c) in chars.iter().enumerate() {
        let ends = matches!(c, '.' | '!' | '?')
            && chars.get(i + 1).map_or(true, |next| next.is_whitespace());
        if ends {
            if pending {
                count += 1;
            }
            pending = false;
        } else if !c.is_whitespace() && !matches!(c, '.' | '!' | '?') {
            pending = true;
        }
    }
    if pending {
        count += 1;
    }
    count
}

fn implementation_terms(intent: &str, extra: &[String]) -> Vec<String> {
    let lower = intent.to_lowercase();
    let mut hits: Vec<String> = Vec::new();
    let terms = IMPLEMENTATION_TERMS
        .iter()
        .map(|t| t.to_string())
        .chain(extra.iter().map(|t| t.trim().to_lowercase()));
    for term in terms {
        if !hits.contains(&term) && contains_on_token_boundaries(&lower, &term) {
            hits.push(term);
        }
    }
    hits
}

fn regex_literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:^|\s)/[^/\s][^/]*/[gimsuy]*(?:$|[\s.,;])|\\[dwsbDWS]|\[[A-Za-z0-9]-[A-Za-z0-9]\]|\br"[^"]*""#)
            .expect("regex literal pattern must compile")
    })
}

fn has_regex_literal(text: &str) -> bool {
    regex_literal_re().is_match(text)
}

/// C9 empty, C4 misplaced default, C6 repeated condition
fn check_behavior(model: &ContractModel, findings: &mut FindingSet) {
    let rules = &model.behavior_rules;
    if rules.is_empty() {
        findings.fail(
            "C9",
            Location::Field {
                field: Field::Behavior,
            },
            "BEHAVIOR has no rules",
        );
        return;
    }

    let last = rules.len() - 1;
    for rule in rules.iter().filter(|r| r.is_default && r.position != last) {
        findings.fail(
            "C4",
            Location::Rule {
                position: rule.position,
            },
            format!(
                "ambiguous default rule: OTHERWISE at position {} is not the last rule",
                rule.position
            ),
        );
    }

    let mut first_seen: BTreeMap<&str, usize> = BTreeMap::new();
    for rule in rules.iter().filter(|r| !r.is_default) {
        match first_seen.get(rule.condition.as_str()) {
            Some(&first) => findings.fail(
                "C6",
                Location::Rule {
                    position: rule.position,
                },
                format!(
                    "condition `{}` repeats rule {first}; the rules overlap",
                    rule.condition
                ),
            ),
            None => {
                first_seen.insert(&rule.condition, rule.position);
            }
        }
    }
}

/// C5 count, C7 error path, C8 boundary values
fn check_tests(model: &ContractModel, findings: &mut FindingSet) {
    let location = Location::Field { field: Field::Tests };

    if model.tests.len() < MIN_TESTS {
        findings.fail(
            "C5",
            location,
            format!(
                "only {} test(s); at least {MIN_TESTS} are required",
                model.tests.len()
            ),
        );
    }

    let has_error_test = model
        .tests
        .iter()
        .any(|t| t.expectation_kind() == ExpectationKind::Error);
    if !has_error_test && model.behavior_rules.iter().any(|r| r.is_error_like()) {
        findings.warn(
            "C7",
            location,
            "no test expects an error although a rule raises one",
        );
    }

    let bounds: Vec<_> = model.constraints.iter().filter(|c| c.implies_bound()).collect();
    if !bounds.is_empty() {
        let mut boundary: Vec<String> = BOUNDARY_LITERALS.iter().map(|s| s.to_string()).collect();
        boundary.extend(bounds.iter().flat_map(|c| numbers_in(&c.text)));

        let exercised = model
            .tests
            .iter()
            .flat_map(|t| t.arguments())
            .any(|arg| boundary.contains(&normalize_expression(argument_value(&arg))));
        if !exercised {
            findings.warn(
                "C8",
                location,
                "CONSTRAINTS declare a bound but no test uses a boundary value",
            );
        }
    }
}

/// Numeric literals in `text`, with a leading minus when present
pub(crate) fn numbers_in(text: &str) -> Vec<String> {
    fn number_re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new(r"-?\b\d+(?:\.\d+)?\b").expect("number pattern must compile"))
    }
    number_re()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
