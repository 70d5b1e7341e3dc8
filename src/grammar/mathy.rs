//! Small pure numeric functions plus matching test-harness calls
//!
//! `mathy0` .. `mathy5` are slots the generated program assigns small
//! numeric functions into; later code calls them through
//! `testMathyFunction`, which runs the function over a grid of inputs and
//! prints a hash of the results so a differential harness can compare
//! runs.

use super::{Bindings, Gen};

/// Number of mathy function slots in generated programs.
pub const NUM_MATH_FUNCTIONS: u64 = 6;

pub(crate) const UNARY_MATH_FUNCTIONS: &[&str] = &[
    "abs", "acos", "acosh", "asin", "asinh", "atan", "atanh", "cbrt", "ceil", "clz32", "cos",
    "cosh", "exp", "expm1", "floor", "fround", "log", "log1p", "log2", "log10", "round", "sign",
    "sin", "sinh", "sqrt", "tan", "tanh", "trunc",
];

pub(crate) const BINARY_MATH_FUNCTIONS: &[&str] =
    &["atan2", "hypot", "imul", "max", "min", "pow"];

const BINARY_MATH_OPS: &[&str] = &[
    " * ", " / ", " % ", " + ", " - ", " ** ", " & ", " | ", " ^ ", " << ", " >> ", " >>> ",
];

const LEFT_UNARY_MATH_OPS: &[&str] = &[" ! ", " + ", " - ", " ~ "];

/// Numeric values interesting to JITs: boundaries, negative zero, NaN.
pub(crate) const NUMERIC_VALS: &[&str] = &[
    "0",
    "1",
    "2",
    "3",
    "42",
    "0.1",
    "1.5",
    "-0",
    "(-0)",
    "-1",
    "(-1)",
    "0/0",
    "1/0",
    "-1/0",
    "NaN",
    "Infinity",
    "-Infinity",
    "Math.PI",
    "0x07fffffff",
    "0x080000000",
    "-0x07fffffff",
    "-0x080000000",
    "0x0ffffffff",
    "0x100000000",
    "-0x0ffffffff",
    "-0x100000000",
    "Number.MIN_VALUE",
    "-Number.MIN_VALUE",
    "Number.MAX_VALUE",
    "-Number.MAX_VALUE",
    "Number.MIN_SAFE_INTEGER",
    "Number.MAX_SAFE_INTEGER",
    "-(2**53)",
    "(2**53)",
    "(2**53)+2",
    "-(2**53+2)",
    "0.000000000000001",
    "1.7976931348623157e308",
];

/// Values that coerce confusingly across types.
pub(crate) const CONFUSABLE_VALS: &[&str] = &[
    "0",
    "0.1",
    "-0",
    "''",
    "'0'",
    "'\\0'",
    "[]",
    "[0]",
    "/0/",
    "'/0/'",
    "1",
    "({toString:function(){return '0';}})",
    "({valueOf:function(){return 0;}})",
    "({valueOf:function(){return '0';}})",
    "false",
    "true",
    "undefined",
    "null",
    "(function(){return 0;})",
    "NaN",
    "(new Boolean(false))",
    "(new Boolean(true))",
    "(new String(''))",
    "(new Number(0))",
    "(new Number(-0))",
    "createIsHTMLDDA()",
];

/// Wrap `expr` in a numeric coercion. Most of the time the caller's
/// `common` policy is applied, so all operands of one operator share a
/// coercion; occasionally the policy is re-rolled per operand, producing
/// deliberately coercion-mismatched shapes.
fn coerce(g: &mut Gen<'_>, common: u64, expr: &str) -> String {
    let pick = if g.rng.next(3) != 0 {
        common
    } else {
        g.rng.next(10)
    };
    match pick {
        0 => format!("( + {expr})"),          // f64
        1 => format!("Math.fround({expr})"),  // f32
        2 => format!("({expr} | 0)"),         // i32
        3 => format!("({expr} >>> 0)"),       // u32
        _ => expr.to_string(),
    }
}

impl Gen<'_> {
    /// A numeric expression tree. `i` is the mathy slot being defined;
    /// only lower-numbered slots are called, which is what rules out
    /// runaway mutual recursion between the slots.
    pub fn make_math_expr(&mut self, d: i64, b: &Bindings, i: u64) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return (*self.rng.index(NUMERIC_VALS)).to_string();
        }

        // As depth decreases, bottom out more often
        if d < self.rng.next(5) as i64 {
            if self.rng.next(4) != 0 {
                if let Some(name) = b.choose(self.rng) {
                    return name.to_string();
                }
            }
            return (*self.rng.index(NUMERIC_VALS)).to_string();
        }

        if self.rng.next(500) == 0 && d > 0 {
            return self.make_expr(d - 1, b);
        }

        let common = self.rng.next(10);

        if i > 0 && self.rng.next(10) == 0 {
            // Call a *lower-numbered* mathy function
            let callee = self.rng.next(i);
            let x = self.nested(|g| g.make_math_expr(d - 1, b, i));
            let x = coerce(self, common, &x);
            let y = self.nested(|g| g.make_math_expr(d - 1, b, i));
            let y = coerce(self, common, &y);
            return coerce(self, common, &format!("mathy{callee}({x}, {y})"));
        }

        if self.rng.next(20) == 0 {
            let c = self.nested(|g| g.make_math_expr(d - 1, b, i));
            let c = coerce(self, common, &c);
            let t = self.nested(|g| g.make_math_expr(d - 1, b, i));
            let t = coerce(self, common, &t);
            let f = self.nested(|g| g.make_math_expr(d - 1, b, i));
            let f = coerce(self, common, &f);
            return coerce(self, common, &format!("({c} ? {t} : {f})"));
        }

        match self.rng.next(4) {
            0 => {
                let x = self.nested(|g| g.make_math_expr(d - 1, b, i));
                let x = coerce(self, common, &x);
                let op = *self.rng.index(BINARY_MATH_OPS);
                let y = self.nested(|g| g.make_math_expr(d - 1, b, i));
                let y = coerce(self, common, &y);
                coerce(self, common, &format!("({x}{op}{y})"))
            }
            1 => {
                let op = *self.rng.index(LEFT_UNARY_MATH_OPS);
                let x = self.nested(|g| g.make_math_expr(d - 1, b, i));
                let x = coerce(self, common, &x);
                coerce(self, common, &format!("({op}{x})"))
            }
            2 => {
                let f = *self.rng.index(UNARY_MATH_FUNCTIONS);
                let x = self.nested(|g| g.make_math_expr(d - 1, b, i));
                let x = coerce(self, common, &x);
                coerce(self, common, &format!("Math.{f}({x})"))
            }
            _ => {
                let f = *self.rng.index(BINARY_MATH_FUNCTIONS);
                let x = self.nested(|g| g.make_math_expr(d - 1, b, i));
                let x = coerce(self, common, &x);
                let y = self.nested(|g| g.make_math_expr(d - 1, b, i));
                let y = coerce(self, common, &y);
                coerce(self, common, &format!("Math.{f}({x}, {y})"))
            }
        }
    }

    /// A two-argument pure numeric function literal.
    pub fn make_math_function(&mut self, d: i64, b: &Bindings, i: u64) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let mut ivars = Bindings::from_names(&["x", "y"]);
        if self.rng.next(10) == 0 {
            // Also use variables from the enclosing scope
            ivars = ivars.with_all(b.names());
        }
        let prologue = self.directive_prologue();
        let body = self.make_math_expr(d, &ivars, i);
        format!("(function(x, y) {{ {prologue}return {body}; }})")
    }

    /// Assign a mathy slot, then drive it through the test harness over a
    /// pool of interesting inputs.
    pub fn make_mathy_fun_and_test(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }

        let i = self.rng.next(NUM_MATH_FUNCTIONS);
        let mut s = String::new();

        if self.rng.next(5) != 0 {
            if self.rng.next(8) != 0 {
                let f = self.make_math_function(6, b, i);
                s.push_str(&format!("mathy{i} = {f}; "));
            } else {
                let f = self.make_asmjs_function(6, b);
                s.push_str(&format!("mathy{i} = {f}; "));
            }
        }

        if self.rng.next(5) != 0 {
            let inputs_str = match self.rng.next(8) {
                0 => self.make_mixed_type_array(d - 1, b),
                1 => format!("[{}]", self.rng.subset(CONFUSABLE_VALS).join(", ")),
                _ => format!("[{}]", self.rng.subset(NUMERIC_VALS).join(", ")),
            };
            s.push_str(&format!("testMathyFunction(mathy{i}, {inputs_str}); "));
        }

        s
    }

    /// A reference to one of the mathy slots.
    pub fn make_mathy_fun_ref(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        format!("mathy{}", self.rng.next(NUM_MATH_FUNCTIONS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySet;
    use crate::grammar::build_grammar;
    use crate::random::SeededRng;

    #[test]
    fn test_math_expr_total_at_all_depths() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(50);
        let mut g = Gen::new(&mut rng, &tables);
        let b = Bindings::from_names(&["x", "y"]);
        for d in [-2, 0, 3, 8] {
            for i in [0, 3, 5] {
                for _ in 0..50 {
                    let s = g.make_math_expr(d, &b, i);
                    assert!(!s.is_empty());
                }
            }
        }
    }

    #[test]
    fn test_math_function_shape() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(51);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..20 {
            let s = g.make_math_function(4, &b, 2);
            assert!(s.starts_with("(function(x, y) {"), "got {s}");
            assert!(s.contains("return "), "got {s}");
        }
    }

    #[test]
    fn test_mathy_slot_calls_only_lower_slots() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(52);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x", "y"]);
        for _ in 0..200 {
            let s = g.make_math_expr(8, &b, 2);
            assert!(!s.contains("mathy2("), "self-call in {s}");
            assert!(!s.contains("mathy3("), "higher-call in {s}");
            assert!(!s.contains("mathy4("), "higher-call in {s}");
            assert!(!s.contains("mathy5("), "higher-call in {s}");
        }
    }

    #[test]
    fn test_fun_and_test_references_same_slot() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(53);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..50 {
            let s = g.make_mathy_fun_and_test(5, &b);
            if let (Some(assign), Some(test)) = (s.find("mathy"), s.find("testMathyFunction(mathy"))
            {
                let assigned = &s[assign + 5..assign + 6];
                let tested = &s[test + 23..test + 24];
                assert_eq!(assigned, tested, "slot mismatch in {s}");
            }
        }
    }

    #[test]
    fn test_mathy_ref_in_range() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(54);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::new();
        for _ in 0..50 {
            let s = g.make_mathy_fun_ref(3, &b);
            let n: u64 = s.strip_prefix("mathy").unwrap().parse().unwrap();
            assert!(n < NUM_MATH_FUNCTIONS);
        }
    }
}
