//! Low-level numeric sub-grammar
//!
//! Generates `"use asm"`-style modules in which every sub-expression
//! carries a numeric type tag deciding which coercion wrappers are legal
//! or likely around it. The tags bias production choice; they are not a
//! type system, and the sub-grammar happily emits modules that fail
//! asm.js validation (falling back to plain JS execution, which is itself
//! an interesting path).
//!
//! Special rules:
//! * Parens are automatic (we're not testing the grammar here, just the
//!   types).
//! * The first alternative of each family is the "too deep" fallback and
//!   must not recurse far.
//! * Expressions are allowed to write to the environment (imports, views).

use super::{Bindings, Gen};

/// Informal numeric classification used to pick coercions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericTypeTag {
    /// Plain int: variables, comparisons, conditionals
    Int,
    /// Int-valued but needing `|0` before use
    Intish,
    /// Known-signed 32-bit value
    Signed,
    /// Known-unsigned 32-bit value
    Unsigned,
    /// Double-valued but needing `+` before use
    Doublish,
    /// Known double
    Double,
    /// Legal across the FFI boundary
    Extern,
}

impl NumericTypeTag {
    /// All tags, for iteration and calibration tests.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Int,
            Self::Intish,
            Self::Signed,
            Self::Unsigned,
            Self::Doublish,
            Self::Double,
            Self::Extern,
        ]
    }
}

/// Module-level asm state: deduplicated stdlib/heap imports and the
/// foreign-function list.
#[derive(Debug, Default)]
pub struct AsmGlobalEnv {
    stdlib_imported: Vec<String>,
    stdlib_imports: String,
    heap_imported: Vec<String>,
    heap_imports: String,
    foreign_functions: Vec<String>,
    sane: bool,
}

impl AsmGlobalEnv {
    fn new(foreign_functions: &[&str], sane: bool) -> Self {
        Self {
            foreign_functions: foreign_functions.iter().map(|s| (*s).to_string()).collect(),
            sane,
            ..Self::default()
        }
    }
}

/// Per-function asm state: the locals pool (`i*`/`d*` naming carries the
/// type) and the declared return type.
#[derive(Debug)]
pub struct AsmEnv {
    global: AsmGlobalEnv,
    locals: Vec<String>,
    ret: &'static str,
}

impl AsmEnv {
    fn new(global: AsmGlobalEnv, locals: Vec<String>, ret: &'static str) -> Self {
        Self {
            global,
            locals,
            ret,
        }
    }
}

fn ensure_import(env: &mut AsmEnv, f: &str, prefix: &str) -> String {
    if !env.global.stdlib_imported.iter().any(|i| i == f) {
        env.global
            .stdlib_imports
            .push_str(&format!("  var {f} = stdlib.{prefix}{f};\n"));
        env.global.stdlib_imported.push(f.to_string());
    }
    f.to_string()
}

fn ensure_math_import(env: &mut AsmEnv, f: &str) -> String {
    ensure_import(env, f, "Math.")
}

fn ensure_view(env: &mut AsmEnv, t: &str) -> String {
    let var_name = format!("{t}View");
    if !env.global.heap_imported.iter().any(|i| *i == var_name) {
        env.global
            .heap_imports
            .push_str(&format!("  var {var_name} = new stdlib.{t}(heap);\n"));
        env.global.heap_imported.push(var_name.clone());
    }
    var_name
}

fn import_foreign(foreign_functions: &[String]) -> String {
    let mut s = String::new();
    for h in foreign_functions {
        s.push_str(&format!("  var {h} = foreign.{h};\n"));
    }
    s
}

fn parameter_type_annotations(args: &[String]) -> String {
    let mut s = String::new();
    for arg in args {
        if arg.starts_with('i') {
            s.push_str(&format!("    {arg} = {arg}|0;\n"));
        } else {
            s.push_str(&format!("    {arg} = +{arg};\n"));
        }
    }
    s
}

fn int_var(g: &mut Gen<'_>, env: &AsmEnv) -> String {
    if env.locals.is_empty() {
        return int_literal_range(g, -0x800_0000, 0xffff_ffff);
    }
    let local = g.rng.index(&env.locals).clone();
    if local.starts_with('i') {
        return local;
    }
    int_literal_range(g, -0x800_0000, 0xffff_ffff)
}

fn double_var(g: &mut Gen<'_>, env: &AsmEnv) -> String {
    if env.locals.is_empty() {
        return double_literal(g);
    }
    let local = g.rng.index(&env.locals).clone();
    if local.starts_with('d') {
        return local;
    }
    double_literal(g)
}

fn double_literal(g: &mut Gen<'_>) -> String {
    let sign = *g.rng.index(&["-", ""]);
    format!("{sign}{}", positive_double_literal(g))
}

fn positive_double_literal(g: &mut Gen<'_>) -> String {
    // A power of two, one more, or one less
    let mut value = 2f64.powi(g.rng.next(100) as i32 - 10);
    if g.rng.next(3) != 0 {
        value += 1.0;
    } else if value > 1.0 && g.rng.next(2) != 0 {
        value -= 1.0;
    }

    let s = format!("{value}");
    if s.contains('.') || s.contains('e') {
        s
    } else {
        format!("{s}.0")
    }
}

/// A value in `[min, max]`, with occasional off-by-one excursions past
/// either end.
fn fuzzy_range(g: &mut Gen<'_>, min: i64, max: i64) -> i64 {
    if g.rng.next(10_000) == 0 {
        return min - 1;
    }
    if g.rng.next(10_000) == 0 {
        return max + 1;
    }
    if g.rng.next(10) == 0 {
        return min;
    }
    if g.rng.next(10) == 0 {
        return max;
    }

    if max > min + 0x1_0000_0000 && g.rng.next(3) == 0 {
        let lo = min + 0x1_0000_0000;
        return lo + g.rng.next((max - lo + 1) as u64) as i64;
    }
    min + g.rng.next((max - min + 1) as u64) as i64
}

fn int_literal_range(g: &mut Gen<'_>, min: i64, max: i64) -> String {
    let val = fuzzy_range(g, min, max);
    let sign = if val < 0 { "-" } else { "" };
    format!("{sign}0x{:x}", val.unsigned_abs())
}

type AsmProduction = fn(&mut Gen<'_>, i64, &mut AsmEnv) -> String;

fn pick_weighted(g: &mut Gen<'_>, alts: &[(u32, AsmProduction)]) -> AsmProduction {
    let total: u64 = alts.iter().map(|(w, _)| u64::from(*w)).sum();
    let mut roll = g.rng.next(total);
    for (w, p) in alts {
        let w = u64::from(*w);
        if roll < w {
            return *p;
        }
        roll -= w;
    }
    alts[alts.len() - 1].1
}

/// Any family, for the rare cross-type substitution.
const ANY_ASM: &[AsmProduction] = &[
    int_expr,
    intish_expr,
    signed_expr,
    doublish_expr,
    double_expr,
    intish_member_expr,
    doublish_member_expr,
];

fn asm_auto(
    g: &mut Gen<'_>,
    d: i64,
    env: &mut AsmEnv,
    alts: &[(u32, AsmProduction)],
    avoid_subst: bool,
) -> String {
    let f: AsmProduction = if d < 1 || g.over_ceiling() {
        alts[0].1
    } else if g.rng.next(50) == 0 && !env.global.sane {
        |g, _d, _e| g.make_expr(5, &Bindings::from_names(&["x"]))
    } else if g.rng.next(50) == 0 && !avoid_subst {
        *g.rng.index(ANY_ASM)
    } else {
        pick_weighted(g, alts)
    };
    let inner = g.nested(|g| f(g, d, env));
    format!("({inner})")
}

const COMPARE_OPS: &[&str] = &[" < ", " <= ", " > ", " >= ", " == ", " != "];
const ADDITIVE: &[&str] = &["+", "-"];

pub(crate) fn int_expr(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    const ALTS: &[(u32, AsmProduction)] = &[
        (1, |g, _, _| int_literal_range(g, -0x800_0000, 0xffff_ffff)),
        (1, |g, d, e| {
            let c = int_expr(g, d - 3, e);
            let t = int_expr(g, d - 3, e);
            let f = int_expr(g, d - 3, e);
            format!("{c} ? {t} : {f}")
        }),
        (1, |g, d, e| format!("!{}", int_expr(g, d - 1, e))),
        (1, |g, d, e| signed_expr(g, d - 1, e)),
        (1, |g, d, e| unsigned_expr(g, d - 1, e)),
        (10, |g, _, e| int_var(g, e)),
        (1, |g, d, e| {
            if e.global.foreign_functions.is_empty() {
                "1".to_string()
            } else {
                format!("{}|0", asm_ffi_call(g, d, e))
            }
        }),
        (1, |g, d, e| {
            let lhs = signed_expr(g, d - 2, e);
            let op = *g.rng.index(COMPARE_OPS);
            let rhs = signed_expr(g, d - 2, e);
            format!("{lhs}{op}{rhs}")
        }),
        (1, |g, d, e| {
            let lhs = unsigned_expr(g, d - 2, e);
            let op = *g.rng.index(COMPARE_OPS);
            let rhs = unsigned_expr(g, d - 2, e);
            format!("{lhs}{op}{rhs}")
        }),
        (1, |g, d, e| {
            let lhs = double_expr(g, d - 2, e);
            let op = *g.rng.index(COMPARE_OPS);
            let rhs = double_expr(g, d - 2, e);
            format!("{lhs}{op}{rhs}")
        }),
    ];
    asm_auto(g, d, env, ALTS, false)
}

pub(crate) fn intish_expr(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    const ALTS: &[(u32, AsmProduction)] = &[
        (10, int_expr),
        (1, intish_member_expr),
        // Add two or more ints
        (10, |g, d, e| {
            let lhs = int_expr(g, d - 1, e);
            let op = *g.rng.index(ADDITIVE);
            let rhs = int_expr(g, d - 1, e);
            format!("{lhs}{op}{rhs}")
        }),
        (5, |g, d, e| {
            let a = int_expr(g, d - 2, e);
            let op1 = *g.rng.index(ADDITIVE);
            let b2 = int_expr(g, d - 2, e);
            let op2 = *g.rng.index(ADDITIVE);
            let c = int_expr(g, d - 2, e);
            format!("{a}{op1}{b2}{op2}{c}")
        }),
        // Multiply by a small int literal
        (2, |g, d, e| {
            let lhs = int_expr(g, d - 1, e);
            let lit = int_literal_range(g, -0xf_ffff, 0xf_ffff);
            format!("{lhs}*{lit}")
        }),
        (2, |g, d, e| {
            let lit = int_literal_range(g, -0xf_ffff, 0xf_ffff);
            let rhs = int_expr(g, d - 1, e);
            format!("{lit}*{rhs}")
        }),
        (1, |g, d, e| format!("-{}", int_expr(g, d - 1, e))),
        (1, |g, d, e| {
            let lhs = signed_expr(g, d - 2, e);
            let rhs = signed_expr(g, d - 2, e);
            format!("{lhs} / {rhs}")
        }),
        (1, |g, d, e| {
            let lhs = unsigned_expr(g, d - 2, e);
            let rhs = unsigned_expr(g, d - 2, e);
            format!("{lhs} / {rhs}")
        }),
        (1, |g, d, e| {
            let lhs = signed_expr(g, d - 2, e);
            let rhs = signed_expr(g, d - 2, e);
            format!("{lhs} % {rhs}")
        }),
        (1, |g, d, e| {
            let lhs = unsigned_expr(g, d - 2, e);
            let rhs = unsigned_expr(g, d - 2, e);
            format!("{lhs} % {rhs}")
        }),
    ];
    asm_auto(g, d, env, ALTS, false)
}

pub(crate) fn signed_expr(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    const ALTS: &[(u32, AsmProduction)] = &[
        (1, |g, _, _| int_literal_range(g, -0x800_0000, 0x7fff_ffff)),
        (1, |g, d, e| format!("~{}", intish_expr(g, d - 1, e))),
        (1, |g, d, e| format!("~~{}", double_expr(g, d - 1, e))),
        // not a special form, but common for a good reason
        (1, |g, d, e| format!("{}|0", intish_expr(g, d - 1, e))),
        (1, |g, d, e| {
            let f = ensure_math_import(e, "imul");
            let x = int_expr(g, d - 2, e);
            let y = int_expr(g, d - 2, e);
            format!("{f}({x}, {y})|0")
        }),
        (1, |g, d, e| {
            let f = ensure_math_import(e, "abs");
            let x = signed_expr(g, d - 1, e);
            format!("{f}({x})|0")
        }),
        (5, |g, d, e| {
            let lhs = intish_expr(g, d - 2, e);
            let op = *g.rng.index(&[" | ", " & ", " ^ ", " << ", " >> "]);
            let rhs = intish_expr(g, d - 2, e);
            format!("{lhs}{op}{rhs}")
        }),
    ];
    asm_auto(g, d, env, ALTS, false)
}

pub(crate) fn unsigned_expr(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    const ALTS: &[(u32, AsmProduction)] = &[
        (1, |g, _, _| int_literal_range(g, 0, 0xffff_ffff)),
        (1, |g, d, e| {
            let lhs = intish_expr(g, d - 2, e);
            let rhs = intish_expr(g, d - 2, e);
            format!("{lhs}>>>{rhs}")
        }),
    ];
    asm_auto(g, d, env, ALTS, false)
}

pub(crate) fn doublish_expr(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    const ALTS: &[(u32, AsmProduction)] = &[(10, double_expr), (1, doublish_member_expr)];
    asm_auto(g, d, env, ALTS, false)
}

pub(crate) fn double_expr(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    const ALTS: &[(u32, AsmProduction)] = &[
        (1, |g, _, _| double_literal(g)),
        (20, |g, _, e| double_var(g, e)),
        (1, |g, d, e| {
            if e.global.foreign_functions.is_empty() {
                "1.0".to_string()
            } else {
                format!("+{}", asm_ffi_call(g, d, e))
            }
        }),
        (1, |_, _, _| "+(1.0/0.0)".to_string()),
        (1, |_, _, _| "+(0.0/0.0)".to_string()),
        (1, |_, _, _| "+(-1.0/0.0)".to_string()),
        // Unary ops that return double
        (1, |g, d, e| format!("+{}", signed_expr(g, d - 1, e))),
        (1, |g, d, e| format!("+{}", unsigned_expr(g, d - 1, e))),
        (1, |g, d, e| format!("+{}", doublish_expr(g, d - 1, e))),
        (1, |g, d, e| format!("-{}", doublish_expr(g, d - 1, e))),
        // Binary ops that return double
        (1, |g, d, e| {
            let lhs = double_expr(g, d - 2, e);
            let rhs = double_expr(g, d - 2, e);
            format!("{lhs} + {rhs}")
        }),
        (1, |g, d, e| {
            let lhs = doublish_expr(g, d - 2, e);
            let rhs = doublish_expr(g, d - 2, e);
            format!("{lhs} - {rhs}")
        }),
        (1, |g, d, e| {
            let lhs = doublish_expr(g, d - 2, e);
            let rhs = doublish_expr(g, d - 2, e);
            format!("{lhs} * {rhs}")
        }),
        (1, |g, d, e| {
            let lhs = doublish_expr(g, d - 2, e);
            let rhs = doublish_expr(g, d - 2, e);
            format!("{lhs} / {rhs}")
        }),
        (1, |g, d, e| {
            let lhs = doublish_expr(g, d - 2, e);
            let rhs = doublish_expr(g, d - 2, e);
            format!("{lhs} % {rhs}")
        }),
        (1, |g, d, e| {
            let c = int_expr(g, d - 3, e);
            let t = double_expr(g, d - 3, e);
            let f = double_expr(g, d - 3, e);
            format!("{c} ? {t} : {f}")
        }),
        // with stdlib
        (1, |g, d, e| {
            let name = *g.rng.index(&[
                "acos", "asin", "atan", "cos", "sin", "tan", "ceil", "floor", "exp", "log", "sqrt",
            ]);
            let f = ensure_math_import(e, name);
            let x = doublish_expr(g, d - 1, e);
            format!("+{f}({x})")
        }),
        (1, |g, d, e| {
            let f = ensure_math_import(e, "abs");
            let x = doublish_expr(g, d - 1, e);
            format!("+{f}({x})")
        }),
        (1, |g, d, e| {
            let name = *g.rng.index(&["atan2", "pow"]);
            let f = ensure_math_import(e, name);
            let x = doublish_expr(g, d - 2, e);
            let y = doublish_expr(g, d - 2, e);
            format!("+{f}({x}, {y})")
        }),
        (1, |_, _, e| ensure_import(e, "Infinity", "")),
        (1, |_, _, e| ensure_import(e, "NaN", "")),
    ];
    asm_auto(g, d, env, ALTS, false)
}

pub(crate) fn extern_expr(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    const ALTS: &[(u32, AsmProduction)] = &[(1, double_expr), (1, signed_expr)];
    asm_auto(g, d, env, ALTS, false)
}

pub(crate) fn intish_member_expr(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    const ALTS: &[(u32, AsmProduction)] = &[
        (1, |g, d, e| {
            let t = *g.rng.index(&["Int8Array", "Uint8Array"]);
            let view = ensure_view(e, t);
            let idx = asm_index(g, d, e, 0);
            format!("{view}[{idx}]")
        }),
        (1, |g, d, e| {
            let t = *g.rng.index(&["Int16Array", "Uint16Array"]);
            let view = ensure_view(e, t);
            let idx = asm_index(g, d, e, 1);
            format!("{view}[{idx}]")
        }),
        (1, |g, d, e| {
            let t = *g.rng.index(&["Int32Array", "Uint32Array"]);
            let view = ensure_view(e, t);
            let idx = asm_index(g, d, e, 2);
            format!("{view}[{idx}]")
        }),
    ];
    asm_auto(g, d, env, ALTS, true)
}

pub(crate) fn doublish_member_expr(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    const ALTS: &[(u32, AsmProduction)] = &[
        (1, |g, d, e| {
            let view = ensure_view(e, "Float32Array");
            let idx = asm_index(g, d, e, 2);
            format!("{view}[{idx}]")
        }),
        (1, |g, d, e| {
            let view = ensure_view(e, "Float64Array");
            let idx = asm_index(g, d, e, 3);
            format!("{view}[{idx}]")
        }),
    ];
    asm_auto(g, d, env, ALTS, true)
}

/// A throwaway environment for generating one detached asm expression
/// (the imports it accumulates are discarded).
pub(crate) fn scratch_env() -> AsmEnv {
    AsmEnv::new(AsmGlobalEnv::new(&[], false), vec![], "signed")
}

/// Dispatch by tag; entry point for callers outside this module.
pub(crate) fn asm_expr_of(
    g: &mut Gen<'_>,
    d: i64,
    env: &mut AsmEnv,
    tag: NumericTypeTag,
) -> String {
    match tag {
        NumericTypeTag::Int => int_expr(g, d, env),
        NumericTypeTag::Intish => intish_expr(g, d, env),
        NumericTypeTag::Signed => signed_expr(g, d, env),
        NumericTypeTag::Unsigned => unsigned_expr(g, d, env),
        NumericTypeTag::Doublish => doublish_expr(g, d, env),
        NumericTypeTag::Double => double_expr(g, d, env),
        NumericTypeTag::Extern => extern_expr(g, d, env),
    }
}

fn asm_ffi_call(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv) -> String {
    let mut arg_list = String::new();
    let mut d = d;
    while g.rng.next(6) != 0 {
        if !arg_list.is_empty() {
            arg_list.push_str(", ");
        }
        d -= 1;
        let arg = extern_expr(g, d, env);
        arg_list.push_str(&arg);
    }

    let f = g.rng.index(&env.global.foreign_functions).clone();
    format!("/*FFI*/{f}({arg_list})")
}

fn asm_index(g: &mut Gen<'_>, d: i64, env: &mut AsmEnv, log_size: u32) -> String {
    if g.rng.next(2) != 0 || d < 2 {
        return (*g.rng.index(&["0", "1", "2", "4096"])).to_string();
    }
    format!("{} >> {log_size}", intish_expr(g, d - 2, env))
}

fn asm_assignment_statement(g: &mut Gen<'_>, indent: &str, env: &mut AsmEnv) -> String {
    if g.rng.next(5) == 0 || env.locals.is_empty() {
        if g.rng.next(2) != 0 {
            let lhs = intish_member_expr(g, 8, env);
            let rhs = intish_expr(g, 10, env);
            return format!("{indent}{lhs} = {rhs};\n");
        }
        let lhs = doublish_member_expr(g, 8, env);
        let rhs = doublish_expr(g, 10, env);
        return format!("{indent}{lhs} = {rhs};\n");
    }

    let local = g.rng.index(&env.locals).clone();
    if local.starts_with('d') {
        let rhs = double_expr(g, 10, env);
        format!("{indent}{local} = {rhs};\n")
    } else {
        let rhs = int_expr(g, 10, env);
        format!("{indent}{local} = {rhs};\n")
    }
}

fn asm_return_statement(g: &mut Gen<'_>, indent: &str, env: &mut AsmEnv) -> String {
    match env.ret {
        "double" => format!("{indent}return +{};\n", doublish_expr(g, 10, env)),
        "signed" => format!("{indent}return ({})|0;\n", intish_expr(g, 10, env)),
        _ => format!("{indent}return;\n"),
    }
}

fn asm_void_call_statement(g: &mut Gen<'_>, indent: &str, env: &mut AsmEnv) -> String {
    format!("{indent}{};\n", asm_ffi_call(g, 8, env))
}

fn asm_statement(g: &mut Gen<'_>, indent: &str, env: &mut AsmEnv, d: i64) -> String {
    if !env.global.sane && g.rng.next(100) == 0 {
        return g.make_statement(3, &Bindings::from_names(&["x"]));
    }

    if g.rng.next(5) == 0 && d > 0 {
        let inner_indent = format!("{indent}  ");
        let inner = asm_statement(g, &inner_indent, env, d - 1);
        return format!("{indent}{{\n{inner}{indent}}}\n");
    }
    if g.rng.next(20) == 0 && d > 3 {
        return asm_switch_statement(g, indent, env, d);
    }
    if g.rng.next(10) == 0 {
        return asm_return_statement(g, indent, env);
    }
    if g.rng.next(50) == 0 && !env.global.foreign_functions.is_empty() {
        return asm_void_call_statement(g, indent, env);
    }
    if g.rng.next(100) == 0 {
        return ";".to_string();
    }
    asm_assignment_statement(g, indent, env)
}

fn asm_switch_statement(g: &mut Gen<'_>, indent: &str, env: &mut AsmEnv, d: i64) -> String {
    let scrutinee = signed_expr(g, 4, env);
    let mut s = format!("{indent}switch ({scrutinee}) {{\n");
    while g.rng.next(3) != 0 {
        let label = g.rng.next(5) as i64 - 3;
        s.push_str(&format!("{indent}  case {label}:\n"));
        let body = asm_statement(g, &format!("{indent}    "), env, d - 2);
        s.push_str(&body);
        if g.rng.next(4) != 0 {
            s.push_str(&format!("{indent}    break;\n"));
        }
    }
    if g.rng.next(2) != 0 {
        s.push_str(&format!("{indent}  default:\n"));
        let body = asm_statement(g, &format!("{indent}    "), env, d - 2);
        s.push_str(&body);
    }
    s.push_str(&format!("{indent}}}\n"));
    s
}

/// `ret` in `["signed", "double", "void"]`; args look like `["i0", "d1"]`,
/// the first letter carrying the type.
fn asm_js_function(
    g: &mut Gen<'_>,
    global_env: AsmGlobalEnv,
    name: &str,
    ret: &'static str,
    args: Vec<String>,
) -> (String, AsmEnv) {
    let mut s = format!("  function {name}({})\n", args.join(", "));
    s.push_str("  {\n");
    s.push_str(&parameter_type_annotations(&args));

    // Add local variables
    let mut locals = args;
    while g.rng.next(2) != 0 {
        let is_double = g.rng.next(2) != 0;
        let local = format!("{}{}", if is_double { "d" } else { "i" }, locals.len());
        let init = if is_double {
            double_literal(g)
        } else {
            "0".to_string()
        };
        s.push_str(&format!("    var {local} = {init};\n"));
        locals.push(local);
    }

    let mut env = AsmEnv::new(global_env, locals, ret);

    // Add assignment statements
    if !env.locals.is_empty() {
        while g.rng.next(5) != 0 {
            let stmt = asm_statement(g, "    ", &mut env, 6);
            s.push_str(&stmt);
        }
    }

    // The required return statement at the end of the function
    if env.ret != "void" || g.rng.next(2) != 0 {
        let ret_stmt = asm_return_statement(g, "    ", &mut env);
        s.push_str(&ret_stmt);
    }

    s.push_str("  }\n");

    (s, env)
}

impl Gen<'_> {
    /// The interior of a `"use asm"` module: imports, one function, and a
    /// return, with chaos injection points between the sections.
    pub(crate) fn asmjs_interior(&mut self, foreign_functions: &[&str], sane: bool) -> String {
        let global_env = AsmGlobalEnv::new(foreign_functions, sane);

        let ret = if self.rng.next(2) != 0 {
            "signed"
        } else {
            "double"
        };
        let arg0 = if self.rng.next(2) != 0 { "i0" } else { "d0" };
        let arg1 = if self.rng.next(2) != 0 { "i1" } else { "d1" };
        let (fun_decl, env) = asm_js_function(
            self,
            global_env,
            "f",
            ret,
            vec![arg0.to_string(), arg1.to_string()],
        );

        let mut mess = |g: &mut Self| -> String {
            if !sane && g.rng.next(600) == 0 {
                let stmt = g.make_statement(8, &Bindings::from_names(&["x"]));
                return format!("{stmt}\n");
            }
            if !sane && g.rng.next(600) == 0 && !g.over_ceiling() {
                return g.chaos_dispatch(8, &Bindings::from_names(&["x"]));
            }
            String::new()
        };

        let m1 = mess(self);
        let m2 = mess(self);
        let m3 = mess(self);
        let m4 = mess(self);
        let m5 = mess(self);
        let m6 = mess(self);
        let foreign = import_foreign(&env.global.foreign_functions);
        format!(
            "{m1}{}{m2}{foreign}{m3}{}{m4}{fun_decl}{m5}  return f;{m6}",
            env.global.stdlib_imports, env.global.heap_imports
        )
    }

    /// An uninvoked asm.js module literal.
    pub fn make_asmjs_module(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "(function(stdlib, foreign, heap){ \"use asm\"; function f() { return 0; } return f; })".to_string();
        }
        let interior = self.nested(|g| g.asmjs_interior(&[], false));
        format!("(function(stdlib, foreign, heap){{ \"use asm\"; {interior} }})")
    }

    /// An asm.js module applied to `(this, {{ff: ...}}, heap)`, yielding
    /// its exported function.
    pub fn make_asmjs_function(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "(function(){ return 0; })".to_string();
        }
        let interior = self.nested(|g| g.asmjs_interior(&["ff"], false));
        let ff = self.make_function(d - 2, b);
        let buffer_type = self.array_buffer_type();
        format!(
            "(function(stdlib, foreign, heap){{ \"use asm\"; {interior} }})(this, {{ff: {ff}}}, new {buffer_type}(4096))"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySet;
    use crate::grammar::build_grammar;
    use crate::random::SeededRng;

    #[test]
    fn test_numeric_type_tags_all() {
        assert_eq!(NumericTypeTag::all().len(), 7);
    }

    #[test]
    fn test_int_literal_range_in_bounds_mostly() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(40);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..500 {
            let s = int_literal_range(&mut g, 0, 0xffff);
            assert!(s.starts_with("0x") || s.starts_with("-0x"), "got {s}");
        }
    }

    #[test]
    fn test_double_literal_has_decimal_or_exponent() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(41);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..200 {
            let s = double_literal(&mut g);
            assert!(
                s.contains('.') || s.contains('e'),
                "not double-typed: {s}"
            );
        }
    }

    #[test]
    fn test_ensure_view_deduplicates() {
        let mut env = AsmEnv::new(AsmGlobalEnv::new(&[], true), vec![], "void");
        assert_eq!(ensure_view(&mut env, "Int8Array"), "Int8ArrayView");
        assert_eq!(ensure_view(&mut env, "Int8Array"), "Int8ArrayView");
        assert_eq!(
            env.global.heap_imports.matches("Int8ArrayView").count(),
            1
        );
    }

    #[test]
    fn test_ensure_math_import_prefix() {
        let mut env = AsmEnv::new(AsmGlobalEnv::new(&[], true), vec![], "void");
        ensure_math_import(&mut env, "imul");
        assert!(env.global.stdlib_imports.contains("stdlib.Math.imul"));
    }

    #[test]
    fn test_every_tag_produces_something_at_any_depth() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(42);
        let mut g = Gen::new(&mut rng, &tables);
        for tag in NumericTypeTag::all() {
            for d in [-1, 0, 3, 8] {
                let mut env = AsmEnv::new(AsmGlobalEnv::new(&["ff"], true), vec![], "signed");
                let s = asm_expr_of(&mut g, d, &mut env, *tag);
                assert!(s.starts_with('('), "tag {tag:?} at depth {d}: {s}");
                assert!(!s.is_empty());
            }
        }
    }

    #[test]
    fn test_interior_exports_f() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(43);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..20 {
            let s = g.asmjs_interior(&[], true);
            assert!(s.contains("function f("), "got {s}");
            assert!(s.contains("return f;"), "got {s}");
        }
    }

    #[test]
    fn test_module_wrapper_shape() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(44);
        let mut g = Gen::new(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        let s = g.make_asmjs_module(5, &b);
        assert!(s.contains("\"use asm\""), "got {s}");
        assert!(s.starts_with("(function(stdlib, foreign, heap)"), "got {s}");
    }

    #[test]
    fn test_ffi_call_only_with_foreign_functions() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(45);
        let mut g = Gen::new(&mut rng, &tables);
        let mut env = AsmEnv::new(AsmGlobalEnv::new(&["ff"], true), vec![], "signed");
        let s = asm_ffi_call(&mut g, 6, &mut env);
        assert!(s.starts_with("/*FFI*/ff("), "got {s}");
    }
}
