// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use pretty_assertions::assert_eq;
use rigtest_metadata::Verdict;
use rigtest_runner::{
    errors::ClassRunError, outcome::TestSignal, results::TestResults, runner::CLASS_SETUP_FAILED,
};

fn three_tests(second: Behavior) -> Rig {
    Rig::new([
        ("test_first", Behavior::Pass),
        ("test_second", second),
        ("test_third", Behavior::Pass),
    ])
}

#[test]
fn abort_class_keeps_partial_results() {
    test_init();

    let rig = three_tests(Behavior::Raise(TestSignal::abort_class("dut rebooted")));
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let results = runner.run(&[], 1).expect("class aborts are contained");

    let verdicts: Vec<_> = results
        .records()
        .iter()
        .map(|record| (record.test_name(), record.verdict()))
        .collect();
    assert_eq!(
        verdicts,
        [
            ("test_first", Some(Verdict::Pass)),
            ("test_second", Some(Verdict::Fail)),
        ]
    );
    assert_eq!(results.records()[1].details(), Some("dut rebooted"));

    let calls = calls(&log);
    assert!(!calls.iter().any(|call| call.ends_with("test_third")));
    assert_eq!(calls.last().map(String::as_str), Some("teardown_class"));
}

#[test]
fn abort_all_carries_results() {
    test_init();

    let rig = three_tests(Behavior::Raise(TestSignal::abort_all("lab power lost")));
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let error = runner.run(&[], 1).expect_err("abort-all escapes the class");

    assert_eq!(error.to_string(), "run aborted: lab power lost");
    let results = match error {
        ClassRunError::AbortAll(error) => error.into_results(),
        other => panic!("expected abort-all, found {other:?}"),
    };
    let names: Vec<_> = results
        .records()
        .iter()
        .map(|record| record.test_name())
        .collect();
    assert_eq!(names, ["test_first", "test_second"]);
    assert_eq!(results.records()[1].verdict(), Some(Verdict::Fail));

    let calls = calls(&log);
    assert!(
        calls.contains(&"on_fail test_second".to_owned()),
        "the aborting test case is still dispatched"
    );
    assert_eq!(
        calls.last().map(String::as_str),
        Some("teardown_class"),
        "class teardown runs on abort-all"
    );
}

#[test]
fn abort_all_from_hook() {
    test_init();

    let rig = Rig {
        on_fail: Behavior::Raise(TestSignal::abort_all("chamber alarm")),
        ..three_tests(Behavior::Raise(TestSignal::fail("overheated")))
    };
    let mut runner = rig.runner();
    let error = runner.run(&[], 1).expect_err("abort-all from on_fail escapes");

    let results = error.results().expect("aborts carry results");
    assert_eq!(results.records().len(), 2);
    assert_eq!(results.records()[1].details(), Some("overheated"));
    assert!(results.records()[1].extra_errors().is_empty());
}

#[test]
fn abort_all_from_teardown_test_preempts() {
    test_init();

    let rig = Rig {
        teardown_test: Behavior::Raise(TestSignal::abort_all("relay welded")),
        ..Rig::new([("test_first", Behavior::Pass), ("test_second", Behavior::Pass)])
    };
    let mut runner = rig.runner();
    let error = runner.run(&[], 1).expect_err("teardown abort escapes");

    let results = error.results().expect("aborts carry results");
    assert_eq!(results.records().len(), 1);
    assert_eq!(results.records()[0].verdict(), Some(Verdict::Fail));
    assert_eq!(results.records()[0].details(), Some("relay welded"));
}

#[test]
fn abort_all_from_setup_class_blocks_everything() {
    test_init();

    let rig = Rig {
        setup_class: Behavior::Raise(TestSignal::abort_all("lab down")),
        ..Rig::new([("test_first", Behavior::Pass), ("test_second", Behavior::Pass)])
    };
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let error = runner.run(&[], 1).expect_err("abort-all escapes the class");

    let error = match error {
        ClassRunError::AbortAll(error) => error,
        other => panic!("expected abort-all, found {other:?}"),
    };
    assert_eq!(error.reason(), "lab down");
    let records: Vec<_> = error
        .results()
        .records()
        .iter()
        .map(|record| (record.test_name(), record.verdict(), record.details()))
        .collect();
    assert_eq!(
        records,
        [
            ("test_first", Some(Verdict::Blocked), Some(CLASS_SETUP_FAILED)),
            ("test_second", Some(Verdict::Blocked), Some(CLASS_SETUP_FAILED)),
        ]
    );
    assert_eq!(
        calls(&log),
        [
            "setup_class",
            "on_blocked test_first",
            "on_blocked test_second",
            "teardown_class",
        ]
    );
}

#[test]
fn abort_class_from_setup_test() {
    test_init();

    let rig = Rig {
        setup_test: Behavior::Raise(TestSignal::abort_class("dut offline")),
        ..three_tests(Behavior::Pass)
    };
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let results = runner.run(&[], 1).expect("class aborts are contained");

    assert_eq!(results.records().len(), 1);
    assert_eq!(results.records()[0].test_name(), "test_first");
    assert_eq!(results.records()[0].verdict(), Some(Verdict::Fail));
    assert_eq!(results.records()[0].details(), Some("dut offline"));
    assert_eq!(
        calls(&log),
        [
            "setup_class",
            "setup_test test_first",
            "teardown_test test_first",
            "on_fail test_first",
            "teardown_class",
        ]
    );
}

#[test]
fn abort_all_from_on_exception_after_teardown_error() {
    test_init();

    let rig = Rig {
        teardown_test: Behavior::Unexpected("relay stuck"),
        on_exception: Behavior::Raise(TestSignal::abort_all("bench fault")),
        ..Rig::new([("test_first", Behavior::Pass), ("test_second", Behavior::Pass)])
    };
    let log = rig.log.clone();
    let mut runner = rig.runner();
    let error = runner.run(&[], 1).expect_err("abort-all from on_exception escapes");

    assert_eq!(error.to_string(), "run aborted: bench fault");
    let results = error.results().expect("aborts carry results");
    assert_eq!(results.records().len(), 1);
    let record = &results.records()[0];
    assert_eq!(record.verdict(), Some(Verdict::Fail));
    assert_eq!(record.details(), Some("bench fault"));
    assert_eq!(record.extra_errors()[0].source, "teardown_test");
    assert_eq!(record.extra_errors()[0].message, "relay stuck");

    let calls = calls(&log);
    assert!(!calls.contains(&"setup_test test_second".to_owned()));
    assert_eq!(calls.last().map(String::as_str), Some("teardown_class"));
}

#[test]
fn batch_runner_merges_until_abort_all() {
    test_init();

    let classes = [
        Rig {
            tag: "WifiTest",
            ..Rig::new([("test_scan", Behavior::Pass)])
        },
        Rig {
            tag: "BtTest",
            ..three_tests(Behavior::Raise(TestSignal::abort_all("bench unplugged")))
        },
        Rig {
            tag: "GpsTest",
            ..Rig::new([("test_fix", Behavior::Pass)])
        },
    ];

    let mut batch = TestResults::new();
    let mut aborted = None;
    for class in classes {
        match class.runner().run(&[], 1) {
            Ok(results) => batch.merge(results),
            Err(ClassRunError::AbortAll(error)) => {
                aborted = Some(error.reason().to_owned());
                batch.merge(error.into_results());
                break;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(aborted.as_deref(), Some("bench unplugged"));
    let classes: Vec<_> = batch
        .records()
        .iter()
        .map(|record| record.test_class())
        .collect();
    assert_eq!(classes, ["WifiTest", "BtTest", "BtTest"]);
    assert_eq!(batch.summary().requested, 4);
}
