//! Leaf generators: numeric, string, identifier, and boolean literals
//!
//! These are the zero-recursion bottom of the grammar. Most of them
//! ignore the depth budget entirely, which is what guarantees every
//! group has a terminating alternative.

use super::{Bindings, Gen};

/// If the engine recompiles any loop run more than X times, this should
/// be at least X.
pub const HOTLOOP: u64 = 60;

/// Zero-recursion literal pool shared by the term grammar and the
/// nesting-ceiling fallback.
pub(crate) const SIMPLE_TERMS: &[&str] = &[
    // Arrays
    "[]",
    "[1]",
    "[[]]",
    "[[1]]",
    "[,]",
    "[,,]",
    "[1,,]",
    // Objects
    "{}",
    "({})",
    "({a1:1})",
    // Possibly-destructuring arrays
    "[z1]",
    "[z1,,]",
    "[,,z1]",
    // Possibly-destructuring objects
    "({a2:z2})",
    "function(id) { return id }",
    "function ([y]) { }",
    "(function ([y]) { })()",
    "arguments",
    "Math",
    "this",
    "length",
    "\"\u{03A0}\"",
];

/// Numeric strings covering 32-bit, double, and safe-integer boundaries.
pub(crate) const BOUNDARY_NUMBERS: &[&str] = &[
    "0.1",
    ".2",
    "3",
    "1.3",
    "4.",
    "5.0000000000000000000000",
    "1.2e3",
    "1e81",
    "1e+81",
    "1e-81",
    "1e4",
    "0",
    "-0",
    "(-0)",
    "-1",
    "(-1)",
    "0x99",
    "033",
    "3.141592653589793",
    "3/0",
    "-3/0",
    "0/0",
    "0x2D413CCC",
    "0x5a827999",
    "0xB504F332",
    "(0x50505050 >> 1)",
    // Boundaries of int, signed, unsigned (near +/- 2^31, +/- 2^32)
    "0x07fffffff",
    "0x080000000",
    "0x080000001",
    "-0x07fffffff",
    "-0x080000000",
    "-0x080000001",
    "0x0ffffffff",
    "0x100000000",
    "0x100000001",
    "-0x0ffffffff",
    "-0x100000000",
    "-0x100000001",
    // Boundaries of double
    "Number.MIN_VALUE",
    "-Number.MIN_VALUE",
    "Number.MAX_VALUE",
    "-Number.MAX_VALUE",
    // Boundaries of maximum safe integer
    "Number.MIN_SAFE_INTEGER",
    "-Number.MIN_SAFE_INTEGER",
    "-(2**53-2)",
    "-(2**53)",
    "-(2**53+2)",
    "Number.MAX_SAFE_INTEGER",
    "-Number.MAX_SAFE_INTEGER",
    "(2**53)-2",
    "(2**53)",
    "(2**53)+2",
    "0.000000000000001",
    "1.7976931348623157e308",
];

/// Short names handed out for fresh bindings.
pub(crate) const NEW_ID_POOL: &[&str] = &["a", "b", "c", "d", "e", "w", "x", "y", "z"];

/// Keywords usable as identifiers in some contexts.
const CONTEXTUAL_KEYWORDS: &[&str] = &[
    "get", "set", "getter", "setter", "delete", "let", "yield", "await", "of",
];

const ID_POOL: &[&str] = &[
    "a", "b", "c", "d", "e", "w", "x", "y", "z", "eval", "\u{3056}", "NaN",
];

/// Repeat count for generated loops: `rnd(rnd(HOTLOOP * 3))`, biased small
/// but occasionally past the recompilation threshold.
pub(crate) fn loop_count(g: &mut Gen<'_>) -> u64 {
    let upper = g.rng.next(HOTLOOP * 3);
    g.rng.next(upper)
}

/// Modulus for branch-unstable loops; at least 2.
pub(crate) fn loop_modulo(g: &mut Gen<'_>) -> u64 {
    let base = if g.rng.next(2) == 1 {
        let upper = g.rng.next(HOTLOOP * 2);
        g.rng.next(upper)
    } else {
        g.rng.next(5)
    };
    base + 2
}

/// Quote a string as JavaScript source, escaping quotes, backslashes, and
/// control/non-ASCII characters.
#[must_use]
pub fn simple_source(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if (c as u32) < 0x20 || (c as u32) > 0x7e => {
                let code = c as u32;
                if code <= 0xffff {
                    out.push_str(&format!("\\u{code:04X}"));
                } else {
                    for unit in c.encode_utf16(&mut [0u16; 2]) {
                        out.push_str(&format!("\\u{unit:04X}"));
                    }
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl Gen<'_> {
    /// A random 6-letter lowercase variable name, unlikely to collide with
    /// anything else in the generated program.
    pub fn unique_var_name(&mut self) -> String {
        (0..6)
            .map(|_| char::from(b'a' + self.rng.next(26) as u8))
            .collect()
    }

    /// A name for a *fresh* binding, from the short pool. The caller is
    /// responsible for extending the binding set it passes to
    /// sub-productions inside the new scope.
    pub fn make_new_id(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        (*self.rng.index(NEW_ID_POOL)).to_string()
    }

    /// An identifier-ish fragment. Usually a bound or pool name, but the
    /// rare cases deliberately wander into terms, expressions, lvalues,
    /// keywords, and holes.
    pub fn make_id(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return self.leaf_fallback(b);
        }

        if self.rng.next(3) == 1 && !b.is_empty() {
            if let Some(name) = b.choose(self.rng) {
                return name.to_string();
            }
        }

        let id = self.nested(|g| match g.rng.next(200) {
            0 => Some(g.make_term(d, b)),
            1 => Some(g.make_expr(d, b)),
            2..=5 => Some(g.make_lvalue(d, b)),
            6 | 7 => Some(g.make_destructuring_lvalue(d, b)),
            8..=10 => Some((*g.rng.index(CONTEXTUAL_KEYWORDS)).to_string()),
            11..=13 => Some(format!("this.{}", g.make_id(d, b))),
            14..=16 => Some(g.make_obj_literal_name(d - 1, b)),
            17 | 18 => Some(g.make_id(d - 1, b)),
            // [k, v] becomes [, v] -- how are holes handled in unexpected destructuring?
            19 => Some(" ".to_string()),
            20 => Some("this".to_string()),
            _ => None,
        });
        match id {
            Some(s) => s,
            None => (*self.rng.index(ID_POOL)).to_string(),
        }
    }

    /// A numeric literal, biased toward boundary values.
    pub fn make_number(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "0".to_string();
        }

        let sign = if self.rng.next(2) == 1 { "-" } else { "" };
        match self.rng.next(60) {
            0 => self.nested(|g| g.make_expr(d - 2, b)),
            1 => format!("{sign}0"),
            2 => format!("{sign}{}", self.rng.next(1000) as f64 / 1000.0),
            3 => format!("{sign}{}", self.rng.next(0xffff_ffff) as f64 / 2.0),
            4 => format!("{sign}{}", self.rng.next(0xffff_ffff)),
            5 => (*self.rng.index(BOUNDARY_NUMBERS)).to_string(),
            6 => {
                let pow = 2f64.powi(self.rng.next(66) as i32);
                let nudge = self.rng.next(3) as f64 - 1.0;
                format!("{sign}{}", pow + nudge)
            }
            _ => format!("{sign}{}", self.rng.next(30)),
        }
    }

    /// A `"\uXXXX"` string literal with a random code unit.
    pub fn random_unit_string_literal(&mut self) -> String {
        let mut s = String::from("\"\\u");
        for _ in 0..4 {
            s.push(
                char::from_digit(self.rng.next(16) as u32, 16)
                    .unwrap_or('0')
                    .to_ascii_uppercase(),
            );
        }
        s.push('"');
        s
    }

    /// A boolean-ish expression: a literal, an arbitrary expression, or a
    /// modulo comparison over a bound name.
    pub fn make_boolean(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "true".to_string();
        }
        match self.rng.next(4) {
            0 => "true".to_string(),
            1 => "false".to_string(),
            2 => self.nested(|g| g.make_expr(d - 2, b)),
            _ => {
                let m = loop_modulo(self);
                let name = match b.choose(self.rng) {
                    Some(n) => n.to_string(),
                    None => "x".to_string(),
                };
                let op = if self.rng.next(2) == 0 { " == " } else { " != " };
                let target = self.rng.next(m);
                format!("({name} % {m}{op}{target})")
            }
        }
    }

    /// `-` one time in five, otherwise nothing.
    pub(crate) fn maybe_neg(&mut self) -> &'static str {
        if self.rng.next(5) == 0 {
            "-"
        } else {
            ""
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
    fn test_simple_source_escapes() {
        assert_eq!(simple_source("abc"), "\"abc\"");
        assert_eq!(simple_source("a\"b"), "\"a\\\"b\"");
        assert_eq!(simple_source("a\\b"), "\"a\\\\b\"");
        assert_eq!(simple_source("a\nb"), "\"a\\nb\"");
        assert_eq!(simple_source("\u{3056}"), "\"\\u3056\"");
    }

    #[test]
    fn test_simple_source_astral_plane() {
        let s = simple_source("\u{1F600}");
        assert_eq!(s, "\"\\uD83D\\uDE00\"");
    }

    #[test]
    fn test_unique_var_name_shape() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(1);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..20 {
            let name = g.unique_var_name();
            assert_eq!(name.len(), 6);
            assert!(name.chars().all(|c| c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_unit_string_literal_shape() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(2);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..20 {
            let lit = g.random_unit_string_literal();
            assert_eq!(lit.len(), 8);
            assert!(lit.starts_with("\"\\u"));
            assert!(lit.ends_with('"'));
        }
    }

    #[test]
    fn test_make_number_total_at_negative_depth() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(3);
        let mut g = Gen::new(&mut rng, &tables);
        let b = Bindings::new();
        for _ in 0..200 {
            let _ = g.make_number(-5, &b);
        }
    }

    #[test]
    fn test_loop_count_bounded() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(4);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..500 {
            assert!(loop_count(&mut g) < HOTLOOP * 3);
        }
    }

    #[test]
    fn test_loop_modulo_at_least_two() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(5);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..500 {
            assert!(loop_modulo(&mut g) >= 2);
        }
    }
}
