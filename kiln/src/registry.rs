// Copyright 2025 the Kiln Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The test registry: an ordered collection of test descriptors and the
//! enable pass that selects which of them a run will execute.
//!
//! Selection is a two-pass protocol. The enable pass walks every
//! registered descriptor and decides its fate from the command-line
//! patterns, so aggregate information (how many tests will run) is known
//! before anything touches the device; the execute pass in
//! [`Runner`](crate::runner::Runner) then visits only the enabled entries,
//! in registration order.

use crate::suite;
use crate::test_def::TestDef;

/// Per-run scheduling state for one registered test.
///
/// `enabled` and `queue_num` are written during the enable pass and
/// read-only from then on.
struct Entry {
    def: &'static TestDef,
    enabled: bool,
    queue_num: Option<u32>,
}

pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    /// Collects the built-in suite, in registration order.
    pub fn new() -> Registry {
        Registry::from_defs(suite::all())
    }

    /// Builds a registry from an explicit descriptor list.
    ///
    /// # Panics
    ///
    /// A test name that is not a valid bare filename indicates a bug in the
    /// test itself and panics.
    pub fn from_defs(defs: impl IntoIterator<Item = &'static TestDef>) -> Registry {
        let entries = defs
            .into_iter()
            .map(|def| {
                if def.name.is_empty() || def.name.contains(std::path::is_separator) {
                    panic!("test name {:?} is not a valid bare filename", def.name);
                }
                Entry {
                    def,
                    enabled: false,
                    queue_num: None,
                }
            })
            .collect();
        Registry { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered descriptors, in registration order.
    pub fn defs(&self) -> impl Iterator<Item = &'static TestDef> + '_ {
        self.entries.iter().map(|entry| entry.def)
    }

    /// Looks up a test by exact name.
    pub fn find(&self, name: &str) -> Option<&'static TestDef> {
        self.defs().find(|def| def.name == name)
    }

    /// Whether the named test was enabled by the last enable pass.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.enabled && entry.def.name == name)
    }

    /// The enable pass: decides which tests the runner will execute and
    /// returns how many that is.
    ///
    /// Patterns are shell-style globs (`*` and `?`). An empty pattern list
    /// runs everything; so does a first pattern that is an exclude, which
    /// implies a leading `*`. A `!` prefix excludes matching tests (an odd
    /// number of `!` negates). The last matching pattern wins. A trailing
    /// `.q<N>` names a preferred queue index; an unparsable `<N>` disables
    /// the tests it matches.
    pub fn enable_matching(&mut self, patterns: &[String]) -> usize {
        let split: Vec<SplitPattern<'_>> = patterns
            .iter()
            .map(|pattern| SplitPattern::parse(pattern))
            .collect();

        let implicit_all = split.is_empty() || split[0].negative;

        let mut num_enabled = 0;
        for entry in &mut self.entries {
            entry.queue_num = None;
            let mut enable = implicit_all;
            for pattern in &split {
                if glob_match(pattern.glob, entry.def.name) {
                    enable = pattern.queue_num_valid && !pattern.negative;
                    entry.queue_num = pattern.queue_num;
                }
            }
            entry.enabled = enable;
            if enable {
                num_enabled += 1;
            }
        }
        num_enabled
    }

    /// Enabled descriptors with their queue preference, in registration
    /// order. This is the execute pass's worklist.
    pub(crate) fn enabled_entries(
        &self,
    ) -> impl Iterator<Item = (&'static TestDef, Option<u32>)> + '_ {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| (entry.def, entry.queue_num))
    }
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::new()
    }
}

/// A command-line pattern, decomposed into its glob body, exclusion
/// marker, and optional `.q<N>` queue suffix.
struct SplitPattern<'a> {
    glob: &'a str,
    negative: bool,
    queue_num: Option<u32>,
    queue_num_valid: bool,
}

impl<'a> SplitPattern<'a> {
    fn parse(pattern: &'a str) -> SplitPattern<'a> {
        let mut glob = pattern;
        let mut negative = false;
        while let Some(rest) = glob.strip_prefix('!') {
            glob = rest;
            negative = !negative;
        }

        let (glob, queue_num, queue_num_valid) = match split_queue_suffix(glob) {
            Some((glob, Some(queue_num))) => (glob, Some(queue_num), true),
            Some((glob, None)) => (glob, None, false),
            None => (glob, None, true),
        };

        SplitPattern {
            glob,
            negative,
            queue_num,
            queue_num_valid,
        }
    }
}

/// Splits a trailing `.q<digits>` queue suffix off a pattern. Returns the
/// stripped glob and the parsed index, or `None` in the second position
/// when the digits overflow.
fn split_queue_suffix(pattern: &str) -> Option<(&str, Option<u32>)> {
    let (glob, suffix) = pattern.rsplit_once(".q")?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((glob, suffix.parse().ok()))
}

/// Shell-style glob match: `*` matches any run of characters, `?` exactly
/// one. The corpus carries no glob crate, and this is all the selector
/// needs.
fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    // Iterative wildcard matching with a single backtrack point.
    let (mut p, mut n) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_def::{TestDef, TestResult};

    fn noop() -> TestResult {
        TestResult::Pass
    }

    static T1: TestDef = TestDef::new("t1", noop);
    static T2: TestDef = TestDef::new("t2", noop);
    static T3: TestDef = TestDef::new("t3", noop);

    fn registry() -> Registry {
        Registry::from_defs([&T1, &T2, &T3])
    }

    fn pats(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|p| (*p).to_owned()).collect()
    }

    #[test]
    fn find_scans_by_exact_name() {
        let registry = registry();
        assert_eq!(registry.find("t2").unwrap().name, "t2");
        assert!(registry.find("t").is_none());
        assert!(registry.find("t2*").is_none());
    }

    #[test]
    fn exact_name_enables_exactly_one_test() {
        let mut registry = registry();
        assert_eq!(registry.enable_matching(&pats(&["t2"])), 1);
        assert!(!registry.is_enabled("t1"));
        assert!(registry.is_enabled("t2"));
        assert!(!registry.is_enabled("t3"));
    }

    #[test]
    fn empty_pattern_list_enables_everything() {
        let mut registry = registry();
        assert_eq!(registry.enable_matching(&[]), 3);
    }

    #[test]
    fn leading_exclude_implies_star() {
        let mut registry = registry();
        assert_eq!(registry.enable_matching(&pats(&["!t2"])), 2);
        assert!(registry.is_enabled("t1"));
        assert!(!registry.is_enabled("t2"));
        assert!(registry.is_enabled("t3"));
    }

    #[test]
    fn double_negation_cancels() {
        let mut registry = registry();
        assert_eq!(registry.enable_matching(&pats(&["!!t2"])), 1);
        assert!(registry.is_enabled("t2"));
    }

    #[test]
    fn last_matching_pattern_wins() {
        let mut registry = registry();
        assert_eq!(registry.enable_matching(&pats(&["t*", "!t2"])), 2);
        assert!(registry.is_enabled("t1"));
        assert!(!registry.is_enabled("t2"));

        assert_eq!(registry.enable_matching(&pats(&["!t*", "t2"])), 1);
        assert!(!registry.is_enabled("t1"));
        assert!(registry.is_enabled("t2"));
    }

    #[test]
    fn queue_suffix_sets_preference() {
        let mut registry = registry();
        assert_eq!(registry.enable_matching(&pats(&["t2.q3"])), 1);
        let (def, queue_num) = registry.enabled_entries().next().unwrap();
        assert_eq!(def.name, "t2");
        assert_eq!(queue_num, Some(3));
    }

    #[test]
    fn overflowing_queue_suffix_disables() {
        let mut registry = registry();
        assert_eq!(registry.enable_matching(&pats(&["t2.q99999999999"])), 0);
    }

    #[test]
    fn queue_suffix_requires_digits() {
        // "t2.qx" has no queue suffix; it is a plain glob that matches
        // nothing.
        let mut registry = registry();
        assert_eq!(registry.enable_matching(&pats(&["t2.qx"])), 0);
    }

    #[test]
    fn enable_pass_resets_previous_state() {
        let mut registry = registry();
        registry.enable_matching(&pats(&["t1.q2"]));
        assert_eq!(registry.enable_matching(&pats(&["t3"])), 1);
        let entries: Vec<_> = registry.enabled_entries().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.name, "t3");
        assert_eq!(entries[0].1, None);
    }

    #[test]
    fn glob_match_semantics() {
        assert!(glob_match("*", "func.miptree.basic"));
        assert!(glob_match("func.*", "func.miptree.basic"));
        assert!(glob_match("*.basic", "func.miptree.basic"));
        assert!(glob_match("func.*.basic", "func.miptree.basic"));
        assert!(glob_match("func.miptree.basi?", "func.miptree.basic"));
        assert!(!glob_match("func.*.upload", "func.miptree.basic"));
        assert!(!glob_match("func.miptree", "func.miptree.basic"));
        assert!(glob_match("", ""));
        assert!(!glob_match("", "x"));
    }

    #[test]
    #[should_panic(expected = "not a valid bare filename")]
    fn path_separators_in_names_are_rejected() {
        static BAD: TestDef = TestDef::new("func/evil", noop);
        let _ = Registry::from_defs([&BAD]);
    }
}
