// Copyright (c) The rigtest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::test_init;
use pretty_assertions::assert_eq;
use rigtest_metadata::Verdict;
use rigtest_runner::{
    asserts,
    config::TestClassConfig,
    outcome::{TestError, TestSignal},
    runner::{GeneratedTestOptions, TestArgs, TestCases, TestClass, TestClassRunner},
};

#[derive(Default)]
struct AttenuatorSweep {
    failed_settings: Vec<u32>,
}

impl TestClass for AttenuatorSweep {
    fn test_cases(&self) -> TestCases<Self> {
        TestCases::<Self>::new()
            .add("test_baseline", |_, _| Ok(()))
            .add("test_sweep", |ctx, _| {
                let failed = ctx.run_generated_testcases(
                    |_, attenuation: &u32, args: &TestArgs| {
                        let limit = args.kwarg("limit").and_then(|limit| limit.as_u64());
                        asserts::assert_true(
                            u64::from(*attenuation) <= limit.unwrap_or(0),
                            format!("link lost at {attenuation} dB"),
                        )?;
                        Ok::<_, TestError>(())
                    },
                    [10, 20, 30, 40],
                    GeneratedTestOptions::new("test_sweep")
                        .with_args(TestArgs::new().with_kwarg("limit", 25))
                        .with_name_func(|attenuation: &u32, _: &TestArgs| {
                            Ok(format!("test_sweep_{attenuation}db"))
                        }),
                )?;
                ctx.failed_settings = failed;
                Err::<(), _>(TestSignal::Silent.into())
            })
    }
}

#[test]
fn trigger_is_not_reported() {
    test_init();

    let mut runner = TestClassRunner::new(AttenuatorSweep::default(), TestClassConfig::default());
    let results = runner.run(&[], 1).expect("run succeeds");

    let verdicts: Vec<_> = results
        .records()
        .iter()
        .map(|record| (record.test_name(), record.verdict()))
        .collect();
    assert_eq!(
        verdicts,
        [
            ("test_baseline", Some(Verdict::Pass)),
            ("test_sweep_10db", Some(Verdict::Pass)),
            ("test_sweep_20db", Some(Verdict::Pass)),
            ("test_sweep_30db", Some(Verdict::Fail)),
            ("test_sweep_40db", Some(Verdict::Fail)),
        ]
    );
    assert_eq!(
        results.requested(),
        [
            "test_baseline",
            "test_sweep_10db",
            "test_sweep_20db",
            "test_sweep_30db",
            "test_sweep_40db",
        ],
        "the trigger is replaced by its generated test cases"
    );
    assert_eq!(results.records()[3].details(), Some("link lost at 30 dB"));
    assert_eq!(runner.context().failed_settings, [30, 40]);
}
