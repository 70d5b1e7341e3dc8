//! Regular-expression pattern generation
//!
//! Patterns are built together with a pool of candidate input strings
//! evolved alongside the pattern, so the generated test strings actually
//! match some of the time. Each candidate is independently corrupted with
//! low probability, keeping near-miss inputs in the mix.

use super::literals::simple_source;
use super::{Bindings, Gen};

/// Candidate input strings carried along with each generated pattern.
pub const POTENTIAL_MATCHES: usize = 3;

const REGEX_FLAGS: &[char] = &['g', 'i', 'm', 's', 'u', 'y'];

const ESCAPE_CLASSES: &[(&str, &str)] = &[
    ("\\d", "5"),
    ("\\D", "q"),
    ("\\w", "a"),
    ("\\W", "%"),
    ("\\s", " "),
    ("\\S", "x"),
];

impl Gen<'_> {
    /// A pattern plus `POTENTIAL_MATCHES` candidate inputs.
    pub fn regex_pattern(&mut self, d: i64) -> (String, Vec<String>) {
        if d <= 0 {
            // A short literal run
            let len = self.rng.next(3) + 1;
            let run: String = (0..len)
                .map(|_| char::from(b'a' + self.rng.next(26) as u8))
                .collect();
            let matches = (0..POTENTIAL_MATCHES).map(|_| run.clone()).collect();
            return (run, matches);
        }

        let (pattern, mut matches) = match self.rng.next(12) {
            // Concatenation
            0 | 1 => {
                let (p1, m1) = self.regex_pattern(d - 1);
                let (p2, m2) = self.regex_pattern(d - 1);
                let matches = m1
                    .into_iter()
                    .zip(m2)
                    .map(|(a, b)| format!("{a}{b}"))
                    .collect();
                (format!("{p1}{p2}"), matches)
            }
            // Character class, possibly negated
            2 => {
                let lo = char::from(b'a' + self.rng.next(13) as u8);
                let hi = char::from(lo as u8 + 1 + self.rng.next(12) as u8);
                let negated = self.rng.next(5) == 0;
                let caret = if negated { "^" } else { "" };
                let sample = if negated { '9' } else { lo };
                let matches = (0..POTENTIAL_MATCHES).map(|_| sample.to_string()).collect();
                (format!("[{caret}{lo}-{hi}]"), matches)
            }
            // Escape class
            3 => {
                let (class, sample) = *self.rng.index(ESCAPE_CLASSES);
                let matches = (0..POTENTIAL_MATCHES)
                    .map(|_| (*sample).to_string())
                    .collect();
                (class.to_string(), matches)
            }
            // Quantifier over a group
            4 | 5 => {
                let (p, m) = self.regex_pattern(d - 2);
                let (quant, reps) = match self.rng.next(6) {
                    0 => ("*".to_string(), self.rng.next(3)),
                    1 => ("+".to_string(), self.rng.next(3) + 1),
                    2 => ("?".to_string(), self.rng.next(2)),
                    3 => {
                        let n = self.rng.next(4);
                        (format!("{{{n}}}"), n)
                    }
                    4 => {
                        let n = self.rng.next(3);
                        (format!("{{{n},}}"), n + self.rng.next(2))
                    }
                    _ => {
                        let n = self.rng.next(3);
                        let m2 = n + self.rng.next(3);
                        (format!("{{{n},{m2}}}"), n)
                    }
                };
                let lazy = if self.rng.next(5) == 0 { "?" } else { "" };
                let matches = m
                    .iter()
                    .map(|s| s.repeat(reps as usize))
                    .collect();
                (format!("(?:{p}){quant}{lazy}"), matches)
            }
            // Alternation
            6 | 7 => {
                let (p1, m1) = self.regex_pattern(d - 1);
                let (p2, m2) = self.regex_pattern(d - 1);
                let matches = m1
                    .into_iter()
                    .zip(m2)
                    .map(|(a, b)| if self.rng.next(2) == 0 { a } else { b })
                    .collect();
                (format!("{p1}|{p2}"), matches)
            }
            // Capturing group, optionally with a backreference
            8 => {
                let (p, m) = self.regex_pattern(d - 1);
                if self.rng.next(3) == 0 {
                    let matches = m.iter().map(|s| format!("{s}{s}")).collect();
                    (format!("({p})\\1"), matches)
                } else {
                    (format!("({p})"), m)
                }
            }
            // Lookahead
            9 => {
                let (p, m) = self.regex_pattern(d - 2);
                let neg = self.rng.next(4) == 0;
                let op = if neg { "?!" } else { "?=" };
                let matches = if neg {
                    (0..POTENTIAL_MATCHES).map(|_| "zzz".to_string()).collect()
                } else {
                    m
                };
                (format!("({op}{p})"), matches)
            }
            // Anchors
            10 => {
                let (p, m) = self.regex_pattern(d - 1);
                match self.rng.next(3) {
                    0 => (format!("^{p}"), m),
                    1 => (format!("{p}$"), m),
                    _ => (format!("^{p}$"), m),
                }
            }
            // Dot or word boundary
            _ => {
                if self.rng.next(3) == 0 {
                    let matches = (0..POTENTIAL_MATCHES).map(|_| "a b".to_string()).collect();
                    ("\\b".to_string(), matches)
                } else {
                    let matches = (0..POTENTIAL_MATCHES).map(|_| "k".to_string()).collect();
                    (".".to_string(), matches)
                }
            }
        };

        // Corrupt candidates occasionally so near-misses stay in the pool
        for m in &mut matches {
            if self.rng.next(10) == 0 {
                m.push(char::from(b'a' + self.rng.next(26) as u8));
            }
        }

        (pattern, matches)
    }

    /// Random subset of the regex flags, in canonical order.
    pub(crate) fn random_regex_flags(&mut self) -> String {
        let mut flags = String::new();
        for f in REGEX_FLAGS {
            if self.rng.next(4) == 0 {
                // 'u' and 'y' together with others often just throws; fine
                flags.push(*f);
            }
        }
        flags
    }

    /// A regex literal (or constructor call) from a pattern.
    pub(crate) fn to_regex_source(&mut self, pattern: &str) -> String {
        let flags = self.random_regex_flags();
        if self.rng.next(5) == 0 {
            let quoted = simple_source(pattern);
            format!("new RegExp({quoted}, \"{flags}\")")
        } else {
            format!("/{pattern}/{flags}")
        }
    }

    /// A bare regex literal term.
    pub fn make_regex(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let (pattern, _) = self.regex_pattern(8);
        self.to_regex_source(&pattern)
    }

    /// `/*RXUB*/` block: bind a regex and a candidate string, probe one of
    /// the exec/test/match/search/replace/split paths, print the result.
    pub fn make_regex_use_block(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "/*RXUB*/var r = /x/; var s = \"x\"; print(r.exec(s)); ".to_string();
        }

        let (pattern, candidates) = self.regex_pattern(10);
        let candidate = self.rng.index(&candidates).clone();

        let rex_expr = if self.rng.next(10) == 0 {
            self.make_expr(d - 1, b)
        } else {
            self.to_regex_source(&pattern)
        };
        let str_expr = if self.rng.next(10) == 0 {
            self.make_expr(d - 1, b)
        } else {
            simple_source(&candidate)
        };

        let bv = b.with("s").with("r");

        let probe = match self.rng.next(8) {
            0 => "r.exec(s)".to_string(),
            1 => "uneval(r.exec(s))".to_string(),
            2 => "r.test(s)".to_string(),
            3 => "s.match(r)".to_string(),
            4 => "uneval(s.match(r))".to_string(),
            5 => "s.search(r)".to_string(),
            6 => {
                let replacement = self.make_replacement(d, &bv);
                let extra_flags = if self.rng.next(3) != 0 {
                    String::new()
                } else {
                    let flags = self.random_regex_flags();
                    format!(", {}", simple_source(&flags))
                };
                format!("s.replace(r, {replacement}{extra_flags})")
            }
            _ => "s.split(r)".to_string(),
        };

        let last_index = if self.rng.next(3) != 0 {
            ""
        } else {
            "print(r.lastIndex); "
        };

        format!("/*RXUB*/var r = {rex_expr}; var s = {str_expr}; print({probe}); {last_index}")
    }

    /// `/*RXUE*/` one-expression regex exec probe.
    pub fn make_regex_use_expr(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "/*RXUE*/ /x/.exec(\"x\")".to_string();
        }

        let (pattern, candidates) = self.regex_pattern(8);
        let candidate = self.rng.index(&candidates).clone();

        let rex_expr = if self.rng.next(10) == 0 {
            self.make_expr(d - 1, b)
        } else {
            self.to_regex_source(&pattern)
        };
        let str_expr = if self.rng.next(10) == 0 {
            self.make_expr(d - 1, b)
        } else {
            simple_source(&candidate)
        };

        format!("/*RXUE*/{rex_expr}.exec({str_expr})")
    }

    fn make_replacement(&mut self, d: i64, b: &Bindings) -> String {
        match self.rng.next(3) {
            0 => (*self.rng.index(&["''", "'x'", "'\\u0341'"])).to_string(),
            1 => self.make_expr(d, b),
            _ => self.make_function(d, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySet;
    use crate::grammar::build_grammar;
    use crate::random::SeededRng;

    #[test]
    fn test_pattern_comes_with_candidates() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(70);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..100 {
            let (pattern, candidates) = g.regex_pattern(8);
            assert!(!pattern.is_empty());
            assert_eq!(candidates.len(), POTENTIAL_MATCHES);
        }
    }

    #[test]
    fn test_terminal_pattern_matches_itself() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(71);
        let mut g = Gen::new(&mut rng, &tables);
        let (pattern, candidates) = g.regex_pattern(0);
        assert!(pattern.chars().all(|c| c.is_ascii_lowercase()));
        assert!(candidates.iter().any(|c| c.starts_with(&pattern)));
    }

    #[test]
    fn test_flags_are_canonical_subset() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(72);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..100 {
            let flags = g.random_regex_flags();
            let mut last = 0usize;
            for c in flags.chars() {
                let pos = REGEX_FLAGS.iter().position(|f| *f == c).expect("known flag");
                assert!(pos >= last, "out of order: {flags}");
                last = pos;
            }
        }
    }

    #[test]
    fn test_use_block_shape() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(73);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..30 {
            let s = g.make_regex_use_block(6, &b);
            assert!(s.starts_with("/*RXUB*/var r = "), "got {s}");
            assert!(s.contains("var s = "), "got {s}");
            assert!(s.contains("print("), "got {s}");
        }
    }

    #[test]
    fn test_use_expr_shape() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(74);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..30 {
            let s = g.make_regex_use_expr(6, &b);
            assert!(s.starts_with("/*RXUE*/"), "got {s}");
            assert!(s.contains(".exec("), "got {s}");
        }
    }

    #[test]
    fn test_regex_term_is_literal_or_constructor() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(75);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::new();
        for _ in 0..50 {
            let s = g.make_regex(3, &b);
            assert!(
                s.starts_with('/') || s.starts_with("new RegExp("),
                "got {s}"
            );
        }
    }
}
