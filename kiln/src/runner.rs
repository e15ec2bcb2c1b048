// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The execute pass: run the enabled tests, one at a time, in registration
//! order.
//!
//! Tests run synchronously on the calling thread. A test that issues
//! asynchronous device work waits for it internally; from here every test
//! is a plain function call. There is no timeout: a hung test hangs the
//! run, and babysitting that is the outer harness's job.

use std::panic;

use crate::registry::Registry;
use crate::test_def::{TestDef, TestResult};

/// Tally of one execute pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub pass: u32,
    pub fail: u32,
    pub skip: u32,
}

impl RunSummary {
    pub fn total(&self) -> u32 {
        self.pass + self.fail + self.skip
    }

    /// True if and only if every test passed or skipped.
    pub fn success(&self) -> bool {
        self.fail == 0
    }
}

/// Executes the tests a [`Registry`]'s enable pass selected.
pub struct Runner<'a> {
    registry: &'a Registry,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a Registry) -> Runner<'a> {
        Runner { registry }
    }

    /// Runs every enabled test and returns the tally.
    pub fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for (def, queue_num) in self.registry.enabled_entries() {
            let result = run_test(def, queue_num);
            log::info!("{result}: {}", def.name);
            match result {
                TestResult::Pass => summary.pass += 1,
                TestResult::Fail => summary.fail += 1,
                TestResult::Skip => summary.skip += 1,
            }
        }
        log::info!(
            "ran {} tests: {} pass, {} fail, {} skip",
            summary.total(),
            summary.pass,
            summary.fail,
            summary.skip
        );
        summary
    }
}

fn run_test(def: &'static TestDef, queue_num: Option<u32>) -> TestResult {
    if def.skip {
        return TestResult::Skip;
    }
    if let Some(queue_num) = queue_num {
        log::debug!("{}: preferring queue index {queue_num}", def.name);
    }
    log::info!("start: {}", def.name);
    match panic::catch_unwind(def.start) {
        Ok(result) => result,
        Err(_) => {
            // The default panic hook already printed the payload.
            TestResult::Fail
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::test_define;

    static T1_RUNS: AtomicU32 = AtomicU32::new(0);
    static T2_RUNS: AtomicU32 = AtomicU32::new(0);
    static T3_RUNS: AtomicU32 = AtomicU32::new(0);

    fn t1() -> TestResult {
        T1_RUNS.fetch_add(1, Ordering::Relaxed);
        TestResult::Pass
    }

    fn t2() -> TestResult {
        T2_RUNS.fetch_add(1, Ordering::Relaxed);
        TestResult::Pass
    }

    fn t3() -> TestResult {
        T3_RUNS.fetch_add(1, Ordering::Relaxed);
        TestResult::Pass
    }

    test_define!(static T1 = { name: "t1", start: t1 });
    test_define!(static T2 = { name: "t2", start: t2 });
    test_define!(static T3 = { name: "t3", start: t3 });

    fn failing() -> TestResult {
        TestResult::Fail
    }

    fn panicking() -> TestResult {
        panic!("test blew up");
    }

    fn never_runs() -> TestResult {
        unreachable!("skipped test must not start");
    }

    test_define!(static FAILING = { name: "failing", start: failing });
    test_define!(static PANICKING = { name: "panicking", start: panicking });
    test_define!(static SKIPPED = { name: "skipped", start: never_runs, skip: true });

    #[test]
    fn enable_pass_then_execute_pass_runs_only_the_selection() {
        let mut registry = Registry::from_defs([&T1, &T2, &T3]);
        assert_eq!(registry.enable_matching(&["t2".to_owned()]), 1);

        let summary = Runner::new(&registry).run();
        assert_eq!(summary, RunSummary { pass: 1, fail: 0, skip: 0 });
        assert_eq!(T1_RUNS.load(Ordering::Relaxed), 0);
        assert_eq!(T2_RUNS.load(Ordering::Relaxed), 1);
        assert_eq!(T3_RUNS.load(Ordering::Relaxed), 0);

        // The others retain their disabled state after the run.
        assert!(!registry.is_enabled("t1"));
        assert!(!registry.is_enabled("t3"));
    }

    #[test]
    fn failures_and_skips_are_tallied() {
        let mut registry = Registry::from_defs([&FAILING, &SKIPPED]);
        registry.enable_matching(&[]);
        let summary = Runner::new(&registry).run();
        assert_eq!(summary, RunSummary { pass: 0, fail: 1, skip: 1 });
        assert!(!summary.success());
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn panicking_tests_count_as_failures() {
        let mut registry = Registry::from_defs([&PANICKING]);
        registry.enable_matching(&[]);
        let summary = Runner::new(&registry).run();
        assert_eq!(summary.fail, 1);
    }
}
