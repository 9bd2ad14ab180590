use proptest::prelude::*;

use specdrift_core::drift::compare;
use specdrift_core::normalizer::{normalize, serialize};
use specdrift_core::parser::{parse, SurfaceKind};
use specdrift_core::verifier::consistency::covering_tests;
use specdrift_core::{
    validate_model, BehaviorRule, ContractModel, DriftStatus, ErrorDescriptor, Expectation,
    Location, OverallStatus, Severity, TestCase, ValidateOptions,
};

fn action() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..1000).prop_map(|n| format!("return {n}")),
        ("[A-Z][a-z]{2,6}", "[a-z]{1,8}( [a-z]{1,8})?")
            .prop_map(|(kind, message)| format!("raise {kind}Error \"{message}\"")),
    ]
}

fn invocation() -> impl Strategy<Value = String> {
    prop::collection::vec(-50i32..100, 0..4).prop_map(|args| call(args.as_slice()))
}

fn call<T: ToString>(args: &[T]) -> String {
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    format!("f({})", args.join(", "))
}

fn test_case() -> impl Strategy<Value = (String, Expectation)> {
    prop_oneof![
        (invocation(), 0u32..1000).prop_map(|(invocation, value)| (
            invocation,
            Expectation::Value {
                value: value.to_string()
            }
        )),
        (
            invocation(),
            "[A-Z][a-z]{2,6}",
            proptest::option::of("[a-z]{1,8}( [a-z]{1,8})?")
        )
            .prop_map(|(invocation, kind, message)| (
                invocation,
                Expectation::Error(ErrorDescriptor::new(format!("{kind}Error"), message))
            )),
    ]
}

fn contract_model() -> impl Strategy<Value = ContractModel> {
    (
        prop::collection::vec((0u32..100, action()), 1..6),
        proptest::option::of(action()),
        prop::collection::vec(test_case(), 0..7),
    )
        .prop_map(|(rules, default, tests)| {
            let mut behavior_rules: Vec<BehaviorRule> = rules
                .into_iter()
                .enumerate()
                .map(|(position, (bound, action))| BehaviorRule {
                    position,
                    condition: format!("x{position} < {bound}"),
                    action,
                    is_default: false,
                })
                .collect();
            if let Some(action) = default {
                behavior_rules.push(BehaviorRule {
                    position: behavior_rules.len(),
                    condition: String::new(),
                    action,
                    is_default: true,
                });
            }
            let tests = tests
                .into_iter()
                .enumerate()
                .map(|(position, (invocation, expectation))| TestCase {
                    position,
                    invocation,
                    expectation,
                })
                .collect();
            ContractModel {
                signature: "def f(x: int) -> int".into(),
                intent: "Compute f.".into(),
                behavior_rules,
                tests,
                ..Default::default()
            }
        })
}

proptest! {
    #[test]
    fn round_trip_preserves_rules_and_tests(model in contract_model()) {
        for surface in [SurfaceKind::KeyValue, SurfaceKind::Inline] {
            let reparsed = parse(&serialize(&model, surface)).unwrap();
            prop_assert_eq!(reparsed.trace.surface, surface);
            prop_assert_eq!(&reparsed.model.behavior_rules, &model.behavior_rules);
            prop_assert_eq!(&reparsed.model.tests, &model.tests);
        }
    }

    #[test]
    fn normalize_is_idempotent(model in contract_model()) {
        for surface in [SurfaceKind::KeyValue, SurfaceKind::Inline] {
            let once = normalize(&serialize(&model, surface), surface).unwrap();
            let twice = normalize(&once, surface).unwrap();
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn validation_is_idempotent(model in contract_model()) {
        let parsed = parse(&serialize(&model, SurfaceKind::KeyValue)).unwrap();
        let options = ValidateOptions::default();
        prop_assert_eq!(validate_model(&parsed, &options), validate_model(&parsed, &options));
    }

    #[test]
    fn overall_status_is_monotone_in_severity(model in contract_model()) {
        let parsed = parse(&serialize(&model, SurfaceKind::Inline)).unwrap();
        let report = validate_model(&parsed, &ValidateOptions::default());
        let fails = report.count(Severity::Fail);
        let warns = report.count(Severity::Warn);
        prop_assert_eq!(report.overall_status == OverallStatus::Invalid, fails > 0);
        prop_assert_eq!(report.overall_status == OverallStatus::Valid, fails == 0 && warns == 0);
    }

    #[test]
    fn uncovered_rules_and_x1_coincide(model in contract_model()) {
        let parsed = parse(&serialize(&model, SurfaceKind::KeyValue)).unwrap();
        let report = validate_model(&parsed, &ValidateOptions::default());
        for rule in parsed.model.behavior_rules.iter().filter(|r| !r.is_default) {
            let uncovered = covering_tests(rule, &parsed.model.tests).is_empty();
            let flagged = report.findings.iter().any(|f| {
                f.code == "X1" && f.location == Location::Rule { position: rule.position }
            });
            prop_assert_eq!(uncovered, flagged);
        }
    }

    #[test]
    fn swapping_two_rules_matches_with_a_reorder_note(
        model in contract_model(),
        i in 0usize..6,
        j in 0usize..6,
    ) {
        let n = model.behavior_rules.len();
        let (i, j) = (i % n, j % n);
        let mut candidate = model.clone();
        candidate.behavior_rules.swap(i, j);
        for (position, rule) in candidate.behavior_rules.iter_mut().enumerate() {
            rule.position = position;
        }

        let result = compare(&model, &candidate);
        prop_assert!(result.rules.iter().all(|r| r.status == DriftStatus::Match));
        prop_assert!(!result.findings.iter().any(|f| f.severity == Severity::Fail));
        let reordered = result.rules.iter().filter(|r| r.reordered).count();
        if i == j {
            prop_assert_eq!(reordered, 0);
        } else {
            prop_assert!(reordered >= 1);
            prop_assert!(result.findings.iter().any(|f| f.code == "D4"));
        }
    }

    #[test]
    fn permuted_arguments_are_never_a_match(
        args in prop::collection::btree_set(0u32..100, 2..5),
        value in 0u32..1000,
    ) {
        let before: Vec<u32> = args.into_iter().collect();
        let mut after = before.clone();
        after.rotate_left(1);

        let with_call = |invocation: String| ContractModel {
            signature: "def f(x: int) -> int".into(),
            tests: vec![TestCase {
                position: 0,
                invocation,
                expectation: Expectation::Value { value: value.to_string() },
            }],
            ..Default::default()
        };
        let result = compare(&with_call(call(before.as_slice())), &with_call(call(after.as_slice())));
        prop_assert_eq!(result.tests.len(), 1);
        prop_assert_eq!(result.tests[0].status, DriftStatus::Drift);
        prop_assert!(result.findings.iter().any(|f| f.code == "D7" && f.severity == Severity::Warn));
    }
}
