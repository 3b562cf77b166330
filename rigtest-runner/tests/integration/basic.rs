// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use indoc::indoc;
use pretty_assertions::assert_eq;
use proptest::{arbitrary::any, collection::vec, prop_assert, prop_assert_eq};
use rigtest_metadata::{RunSummary, Verdict};
use rigtest_runner::{
    config::TestClassConfig,
    diagnostics::DiagnosticSource,
    errors::{ClassRunError, DiagnosticSourceError},
    outcome::{TestError, TestSignal},
    results::TestResults,
    runner::{CLASS_SETUP_FAILED, TestArgs, TestCases, TestClass, TestClassRunner},
};
use serde_json::json;
use std::sync::Arc;
use test_case::test_case;
use test_strategy::{Arbitrary, proptest};

fn verdicts(results: &TestResults) -> Vec<(&str, Option<Verdict>)> {
    results
        .records()
        .iter()
        .map(|record| (record.test_name(), record.verdict()))
        .collect()
}

#[test]
fn pass_fail_and_missing() {
    test_init();

    let rig = Rig::new([
        ("test_a", Behavior::Pass),
        ("test_b", Behavior::Raise(TestSignal::fail("boom"))),
    ]);
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let results = runner
        .run(&["test_a", "test_b", "test_c"], 1)
        .expect("run succeeds");

    assert_eq!(
        verdicts(&results),
        [
            ("test_a", Some(Verdict::Pass)),
            ("test_b", Some(Verdict::Fail)),
            ("test_c", Some(Verdict::Skip)),
        ]
    );
    assert_eq!(results.records()[1].details(), Some("boom"));
    let skip_reason = results.records()[2].details().expect("skip has a reason");
    assert!(
        skip_reason.contains("does not exist"),
        "skip reason: {skip_reason}"
    );

    assert_eq!(
        calls(&log),
        [
            "setup_class",
            "setup_test test_a",
            "body test_a",
            "teardown_test test_a",
            "on_pass test_a",
            "setup_test test_b",
            "body test_b",
            "teardown_test test_b",
            "on_fail test_b",
            "setup_test test_c",
            "teardown_test test_c",
            "on_skip test_c",
            "teardown_class",
        ]
    );
    assert_eq!(
        results.summary(),
        RunSummary {
            requested: 3,
            executed: 2,
            passed: 1,
            failed: 1,
            skipped: 1,
            blocked: 0,
            error: 0,
            total: 3,
        }
    );
}

#[test]
fn iterations_repeat_the_test() {
    test_init();

    let mut runner = Rig::new([("test_soak", Behavior::Pass)]).runner();
    let results = runner.run(&[], 3).expect("run succeeds");
    assert_eq!(
        verdicts(&results),
        [
            ("test_soak", Some(Verdict::Pass)),
            ("test_soak", Some(Verdict::Pass)),
            ("test_soak", Some(Verdict::Pass)),
        ]
    );
}

#[test_case(Behavior::ReturnFalse; "returns false")]
#[test_case(Behavior::Raise(TestSignal::fail("no chamber")); "fails")]
#[test_case(Behavior::Unexpected("controller offline"); "unexpected error")]
#[test_case(Behavior::Panic("assert failed in setup"); "panics")]
fn setup_class_failure_blocks_all(setup_class: Behavior) {
    test_init();

    let rig = Rig {
        setup_class,
        ..Rig::new([
            ("test_a", Behavior::Pass),
            ("test_b", Behavior::Raise(TestSignal::fail("boom"))),
        ])
    };
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let results = runner.run(&[], 1).expect("run succeeds");

    assert_eq!(
        verdicts(&results),
        [
            ("test_a", Some(Verdict::Blocked)),
            ("test_b", Some(Verdict::Blocked)),
        ]
    );
    assert!(
        results
            .records()
            .iter()
            .all(|record| record.details() == Some(CLASS_SETUP_FAILED))
    );
    assert_eq!(
        calls(&log),
        [
            "setup_class",
            "on_blocked test_a",
            "on_blocked test_b",
            "teardown_class"
        ],
        "no per-test hooks or bodies run"
    );
}

#[test_case(Behavior::ReturnFalse, Verdict::Fail; "returns false")]
#[test_case(Behavior::Raise(TestSignal::fail("no wifi")), Verdict::Fail; "fails")]
#[test_case(Behavior::Raise(TestSignal::pass("ready")), Verdict::Fail; "raises pass")]
#[test_case(Behavior::Unexpected("adb offline"), Verdict::Error; "unexpected error")]
#[test_case(Behavior::Panic("radio stuck"), Verdict::Fail; "panics")]
fn setup_test_failure_moves_on(setup_test: Behavior, verdict: Verdict) {
    test_init();

    let rig = Rig {
        setup_test,
        ..Rig::new([("test_a", Behavior::Pass), ("test_b", Behavior::Pass)])
    };
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let results = runner.run(&[], 1).expect("setup failures are contained");

    assert_eq!(
        verdicts(&results),
        [("test_a", Some(verdict)), ("test_b", Some(verdict))],
        "every test case is attempted"
    );
    let calls = calls(&log);
    assert!(!calls.iter().any(|call| call.starts_with("body ")));
    assert!(calls.contains(&"teardown_test test_a".to_owned()));
    assert!(calls.contains(&"teardown_test test_b".to_owned()));
    assert_eq!(calls.last().map(String::as_str), Some("teardown_class"));
}

#[test]
fn teardown_error_is_secondary() {
    test_init();

    let rig = Rig {
        teardown_test: Behavior::Unexpected("failed to restore wifi"),
        ..Rig::new([
            ("test_pass", Behavior::Pass),
            ("test_fail", Behavior::Raise(TestSignal::fail("no ack"))),
        ])
    };
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let results = runner.run(&[], 1).expect("run succeeds");

    assert_eq!(
        verdicts(&results),
        [
            ("test_pass", Some(Verdict::Pass)),
            ("test_fail", Some(Verdict::Fail)),
        ],
        "teardown errors don't override verdicts"
    );
    for record in results.records() {
        assert_eq!(record.extra_errors().len(), 1);
        assert_eq!(record.extra_errors()[0].source, "teardown_test");
        assert_eq!(record.extra_errors()[0].message, "failed to restore wifi");
    }
    assert!(calls(&log).contains(&"on_exception test_pass".to_owned()));
}

#[test]
fn hook_errors_are_recorded() {
    test_init();

    let rig = Rig {
        on_fail: Behavior::Panic("log pull failed"),
        ..Rig::new([("test_fail", Behavior::ReturnFalse)])
    };
    let mut runner = rig.runner();
    let results = runner.run(&[], 1).expect("run succeeds");

    let record = &results.records()[0];
    assert_eq!(record.verdict(), Some(Verdict::Fail));
    assert_eq!(record.extra_errors()[0].source, "on_fail");
    assert_eq!(
        record.extra_errors()[0].message,
        "assertion failed: log pull failed"
    );
}

struct CrashingPhone;

impl DiagnosticSource for CrashingPhone {
    fn name(&self) -> &str {
        "crashing-phone"
    }

    fn take_bug_report(
        &self,
        _test_name: &str,
        _begin_time: i64,
    ) -> Result<(), DiagnosticSourceError> {
        panic!("bugreportz crashed")
    }
}

#[test]
fn diagnostics_panic_is_contained() {
    test_init();

    let rig = Rig {
        devices: vec![Arc::new(CrashingPhone)],
        ..Rig::new([("test_a", Behavior::ReturnFalse), ("test_b", Behavior::Pass)])
    };
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let results = runner.run(&[], 1).expect("run succeeds");

    assert_eq!(
        verdicts(&results),
        [("test_a", Some(Verdict::Fail)), ("test_b", Some(Verdict::Pass))]
    );
    assert!(
        results.records()[0].extra_errors().is_empty(),
        "diagnostics never touch the record"
    );
    assert_eq!(calls(&log).last().map(String::as_str), Some("teardown_class"));
}

#[test]
fn summary_is_a_pure_projection() {
    test_init();

    let mut runner = Rig::new([
        ("test_a", Behavior::Pass),
        ("test_b", Behavior::Unexpected("adb gone")),
        ("test_c", Behavior::Raise(TestSignal::blocked("no sim"))),
    ])
    .runner();
    let results = runner.run(&[], 1).expect("run succeeds");

    let first = results.summary();
    assert_eq!(first, results.summary());
    assert_eq!(first.error, 1);
    assert_eq!(first.blocked, 1);
    assert_eq!(first.executed, 2);
    assert_eq!(
        first.to_string(),
        "Requested 3, Executed 2, Passed 1, Failed 0, Skipped 0, Blocked 1, Error 1"
    );
    assert_eq!(results.records().len(), 3);
}

#[test]
fn invalid_test_name_runs_nothing() {
    test_init();

    let rig = Rig::new([("test_a", Behavior::Pass)]);
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let error = runner
        .run(&["test_a", "warmup"], 1)
        .expect_err("warmup is not a test name");

    assert_eq!(
        error.to_string(),
        "test name `warmup` in class `Rig` does not start with `test_`"
    );
    assert!(matches!(error, ClassRunError::InvalidTestName { .. }));
    assert!(calls(&log).is_empty());
}

#[test]
fn clean_up_runs_on_drop() {
    test_init();

    let rig = Rig::new([("test_a", Behavior::Pass)]);
    let log = rig.log.clone();
    let mut runner = rig.runner();
    runner.run(&[], 1).expect("run succeeds");
    assert!(!calls(&log).contains(&"clean_up".to_owned()));

    let results = runner.into_results();
    assert_eq!(results.records().len(), 1);
    assert_eq!(calls(&log).last().map(String::as_str), Some("clean_up"));
}

struct Uplink;

impl TestClass for Uplink {
    fn test_cases(&self) -> TestCases<Self> {
        TestCases::<Self>::new().add("test_throughput", |ctx, args| {
            let min_mbps: u64 = ctx.user_params().required("min_mbps")?;
            let band = args.kwarg("band").and_then(|band| band.as_str());
            if band != Some("5g") {
                return Err(TestSignal::skip("needs a 5g band").into());
            }
            let measured = args.arg(0).and_then(|value| value.as_u64()).unwrap_or(0);
            Ok::<_, TestError>(measured >= min_mbps)
        })
    }
}

#[test]
fn config_drives_args_and_user_params() {
    test_init();

    let dir = Utf8TempDir::new().expect("created temp dir");
    let config_file = dir.path().join("rigtest.toml");
    std::fs::write(
        &config_file,
        indoc! {r#"
            testbed_name = "bench-3"

            [user_params]
            min_mbps = 300

            [cli_args]
            args = [450]
            kwargs = { band = "5g" }
        "#},
    )
    .expect("wrote config");
    let config = TestClassConfig::from_file(&config_file).expect("config is valid");
    assert_eq!(config.testbed_name(), "bench-3");

    let mut runner = TestClassRunner::new(Uplink, config.clone());
    let results = runner.run(&[], 1).expect("run succeeds");
    assert_eq!(verdicts(&results), [("test_throughput", Some(Verdict::Pass))]);

    let slow = config.with_cli_args(TestArgs::new().with_arg(json!(120)).with_kwarg("band", "5g"));
    let mut runner = TestClassRunner::new(Uplink, slow);
    let results = runner.run(&[], 1).expect("run succeeds");
    assert_eq!(verdicts(&results), [("test_throughput", Some(Verdict::Fail))]);

    let mut runner = TestClassRunner::new(Uplink, TestClassConfig::default());
    let results = runner.run(&[], 1).expect("run succeeds");
    assert_eq!(
        verdicts(&results),
        [("test_throughput", Some(Verdict::Error))],
        "a missing user param is an unexpected error"
    );
}

#[derive(Arbitrary, Clone, Copy, Debug)]
enum PlainOutcome {
    Pass,
    ReturnFalse,
    Fail,
    Skip,
    Blocked,
    Unexpected,
    Panic,
    Silent,
}

impl PlainOutcome {
    fn behavior(self) -> Behavior {
        match self {
            Self::Pass => Behavior::Pass,
            Self::ReturnFalse => Behavior::ReturnFalse,
            Self::Fail => Behavior::Raise(TestSignal::fail("fail")),
            Self::Skip => Behavior::Raise(TestSignal::skip("skip")),
            Self::Blocked => Behavior::Raise(TestSignal::blocked("blocked")),
            Self::Unexpected => Behavior::Unexpected("unexpected"),
            Self::Panic => Behavior::Panic("panic"),
            Self::Silent => Behavior::Raise(TestSignal::Silent),
        }
    }
}

const TEST_NAMES: [&str; 8] = [
    "test_0", "test_1", "test_2", "test_3", "test_4", "test_5", "test_6", "test_7",
];

#[proptest(cases = 64)]
fn one_record_per_reported_test(
    #[strategy(vec(any::<PlainOutcome>(), 0..=8))] outcomes: Vec<PlainOutcome>,
) {
    let tests: Vec<_> = TEST_NAMES
        .into_iter()
        .zip(&outcomes)
        .map(|(name, outcome)| (name, outcome.behavior()))
        .collect();
    let reported: Vec<&str> = TEST_NAMES
        .into_iter()
        .zip(&outcomes)
        .filter(|(_, outcome)| !matches!(outcome, PlainOutcome::Silent))
        .map(|(name, _)| name)
        .collect();

    let mut runner = Rig::new(tests).runner();
    let results = runner.run(&[], 1).expect("run succeeds");

    prop_assert_eq!(results.requested(), reported.as_slice());
    let recorded: Vec<&str> = results
        .records()
        .iter()
        .map(|record| record.test_name())
        .collect();
    prop_assert_eq!(recorded, reported);
    prop_assert!(results.records().iter().all(|record| record.verdict().is_some()));
}
