//! Pre-vetted self-recursive function templates
//!
//! Free-form generated recursion either blows the stack instantly or
//! never recurses at all, so recursive call sites come from a closed set
//! of hand-written templates with known-bounded argument generators.
//! Placeholder variable names are replaced with fresh unique names at
//! each use, and `@` marks points where an extra generated statement may
//! be spliced in.
//!
//! Every template carries a native mirror of its own recursion, run once
//! at startup: a template whose mirror gives the wrong answer is broken
//! and must not be used for generation.

use super::{Bindings, Gen};
use crate::error::{Error, Result};

/// Post-substitution rewrite hook.
type RandSub = fn(&mut Gen<'_>, String) -> String;

/// One fixed recursive-function shape.
pub struct RecursiveTemplate {
    /// Identifier used in self-test failure reports
    pub name: &'static str,
    /// Template text with placeholder names and `@` insertion points
    pub text: &'static str,
    /// Placeholder variable names to be replaced with fresh unique names
    pub vars: &'static [&'static str],
    /// Generates the actual-argument list for the call
    pub args: fn(&mut Gen<'_>, i64, &Bindings) -> String,
    /// Optional text-substitution hook applied after instantiation
    pub rand_sub: Option<RandSub>,
    self_test: fn() -> std::result::Result<(), String>,
}

impl std::fmt::Debug for RecursiveTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecursiveTemplate")
            .field("name", &self.name)
            .finish()
    }
}

fn factorial_mirror(n: u64) -> u64 {
    if n == 0 {
        return 1;
    }
    n * factorial_mirror(n - 1)
}

fn factorial_acc_mirror(n: u64, acc: u64) -> u64 {
    if n == 0 {
        return acc;
    }
    factorial_acc_mirror(n - 1, acc * n)
}

fn fibonacci_mirror(n: u64) -> u64 {
    if n <= 1 {
        return 1;
    }
    fibonacci_mirror(n - 1) + fibonacci_mirror(n - 2)
}

fn sum_to_mirror(n: u64, acc: u64) -> u64 {
    if n == 0 {
        return acc;
    }
    sum_to_mirror(n - 1, acc + n)
}

fn tree_count_mirror(depth: u64) -> u64 {
    if depth == 0 {
        return 1;
    }
    tree_count_mirror(depth - 1) + tree_count_mirror(depth - 1)
}

fn parity_mirror(n: u64) -> bool {
    if n == 0 {
        return true;
    }
    !parity_mirror(n - 1)
}

fn expect<T: PartialEq + std::fmt::Debug>(
    got: T,
    want: T,
) -> std::result::Result<(), String> {
    if got == want {
        Ok(())
    } else {
        Err(format!("expected {want:?}, got {got:?}"))
    }
}

/// The closed template set.
fn templates() -> Vec<RecursiveTemplate> {
    vec![
        RecursiveTemplate {
            name: "factorial",
            text: "(function factorial(N) { @; if (N == 0) { @; return 1; } @; return factorial(N - 1) * N; @ })",
            vars: &["factorial", "N"],
            args: |g, _d, _b| format!("{}", g.rng.next(20)),
            rand_sub: None,
            self_test: || expect(factorial_mirror(10), 3_628_800),
        },
        RecursiveTemplate {
            name: "factorial-acc",
            text: "(function factorial(N, Acc) { @; if (N == 0) { @; return Acc; } @; return factorial(N - 1, Acc * N); @ })",
            vars: &["factorial", "N", "Acc"],
            args: |g, _d, _b| format!("{}, 1", g.rng.next(15)),
            rand_sub: None,
            self_test: || expect(factorial_acc_mirror(10, 1), 3_628_800),
        },
        RecursiveTemplate {
            name: "fibonacci",
            text: "(function fibonacci(N) { @; if (N <= 1) { @; return 1; } @; return fibonacci(N - 1) + fibonacci(N - 2); @ })",
            vars: &["fibonacci", "N"],
            args: |g, _d, _b| format!("{}", g.rng.next(12)),
            rand_sub: None,
            self_test: || expect(fibonacci_mirror(6), 13),
        },
        RecursiveTemplate {
            name: "sum-to",
            text: "(function sumTo(N, Acc) { @; if (N == 0) { @; return Acc; } @; return sumTo(N - 1, Acc + N); @ })",
            vars: &["sumTo", "N", "Acc"],
            args: |g, _d, _b| format!("{}, 0", g.rng.next(50)),
            rand_sub: None,
            self_test: || expect(sum_to_mirror(10, 0), 55),
        },
        RecursiveTemplate {
            name: "tree-count",
            // binary recursion chews stack twice as fast
            text: "(function treeCount(Depth) { @; if (Depth == 0) { @; return 1; } @; return treeCount(Depth - 1) + treeCount(Depth - 1); @ })",
            vars: &["treeCount", "Depth"],
            args: |g, _d, _b| format!("{}", g.rng.next(10)),
            rand_sub: Some(|g, s| {
                if g.rng.next(4) == 0 {
                    s.replacen(" + ", " * ", 1)
                } else {
                    s
                }
            }),
            self_test: || expect(tree_count_mirror(4), 16),
        },
        RecursiveTemplate {
            name: "parity",
            text: "(function parity(N) { @; if (N == 0) { @; return true; } @; return !parity(N - 1); @ })",
            vars: &["parity", "N"],
            args: |g, _d, _b| format!("{}", g.rng.next(30)),
            rand_sub: Some(|g, s| {
                if g.rng.next(4) == 0 {
                    s.replacen("!", "!!", 1)
                } else {
                    s
                }
            }),
            self_test: || expect(parity_mirror(4), true),
        },
    ]
}

/// Build the template set, running every self-test.
///
/// # Errors
/// [`Error::Template`] with the template's source text attached when a
/// self-test fails.
pub(crate) fn validated_templates() -> Result<Vec<RecursiveTemplate>> {
    let templates = templates();
    for t in &templates {
        if let Err(reason) = (t.self_test)() {
            return Err(Error::Template {
                name: t.name,
                reason,
                source_text: t.text.to_string(),
            });
        }
    }
    Ok(templates)
}

impl Gen<'_> {
    /// Usually the `(4277)` decoy; occasionally an instantiated template
    /// called immediately with bounded arguments.
    pub fn make_immediate_recursive_call(&mut self, d: i64, b: &Bindings) -> String {
        if self.rng.next(10) != 0 {
            return "(4277)".to_string();
        }
        if self.over_ceiling() {
            return "(4277)".to_string();
        }

        let idx = self.rng.next(self.tables.templates.len() as u64) as usize;
        let template = &self.tables.templates[idx];
        let text = template.text;
        let vars = template.vars;
        let args_fn = template.args;
        let rand_sub = template.rand_sub;

        // Fresh names avoid collisions with surrounding generated code
        let mut s = text.to_string();
        for pretty_name in vars {
            let fresh = self.unique_var_name();
            s = s.replace(pretty_name, &fresh);
        }

        let actual_args = args_fn(self, d, b);
        s = format!("{s}({actual_args})");

        // Splice a statement into some insertion points, drop the rest.
        // Single pass: spliced statements are never re-scanned.
        let parts: Vec<String> = s.split('@').map(str::to_string).collect();
        s = parts[0].clone();
        for part in &parts[1..] {
            if self.rng.next(4) == 0 {
                let stmt = self.make_statement(d - 2, b);
                s.push_str(&stmt);
            }
            s.push_str(part);
        }

        if let Some(sub) = rand_sub {
            s = sub(self, s);
        }

        format!("({s})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySet;
    use crate::grammar::build_grammar;
    use crate::random::SeededRng;

    #[test]
    fn test_all_templates_pass_self_test() {
        let validated = validated_templates().expect("every shipped template is sound");
        assert_eq!(validated.len(), 6);
    }

    #[test]
    fn test_factorial_self_test_value() {
        assert_eq!(factorial_mirror(10), 3_628_800);
    }

    #[test]
    fn test_fibonacci_self_test_value() {
        assert_eq!(fibonacci_mirror(6), 13);
    }

    #[test]
    fn test_failing_template_reports_source() {
        let broken = RecursiveTemplate {
            name: "broken",
            text: "(function broken(N) { return N; })",
            vars: &["broken", "N"],
            args: |_, _, _| "1".to_string(),
            rand_sub: None,
            self_test: || expect(0, 1),
        };
        let err = (broken.self_test)().unwrap_err();
        assert!(err.contains("expected 1"));
    }

    #[test]
    fn test_decoy_is_common() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(90);
        let mut g = Gen::new(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        let mut decoys = 0;
        for _ in 0..200 {
            if g.make_immediate_recursive_call(5, &b) == "(4277)" {
                decoys += 1;
            }
        }
        assert!(decoys > 150, "decoy rate too low: {decoys}/200");
    }

    #[test]
    fn test_instantiation_replaces_placeholders() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(91);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        let mut instantiated = 0;
        for _ in 0..400 {
            let s = g.make_immediate_recursive_call(5, &b);
            if s == "(4277)" {
                continue;
            }
            instantiated += 1;
            assert!(!s.contains('@'), "unexpanded insertion point: {s}");
            for t in templates() {
                for v in t.vars {
                    // placeholder names must be gone; fresh names are lowercase
                    if v.chars().next().is_some_and(char::is_uppercase) {
                        assert!(!s.contains(v), "placeholder {v} leaked: {s}");
                    }
                }
            }
            assert!(s.starts_with("(("), "not a wrapped immediate call: {s}");
        }
        assert!(instantiated > 10, "too few instantiations: {instantiated}");
    }

    #[test]
    fn test_instantiated_call_has_argument_list() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(92);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..400 {
            let s = g.make_immediate_recursive_call(5, &b);
            if s != "(4277)" {
                assert!(s.ends_with("))"), "missing call: {s}");
            }
        }
    }
}
