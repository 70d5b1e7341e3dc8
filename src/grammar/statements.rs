//! Statement grammar: sequencing, declarations, loops, switch, exceptions
//!
//! The reason there are several distinct loop shapes is to create
//! different kinds of scripts without introducing infinite loops: each
//! shape bounds its own iteration count while still stressing
//! loop-compilation paths.

use super::exprs::{VAR_BINDER, VAR_BINDER_FOR};
use super::literals::{loop_count, loop_modulo, simple_source};
use super::{strip_semicolon, Bindings, Gen, Production};
use crate::capabilities::{CapabilitySet, Engine};
use crate::corpus::{inline_test, is_evil_test, NO_CORPUS_PLACEHOLDER};

pub(crate) const EXCEPTION_PROPERTIES: &[&str] = &[
    "constructor",
    "message",
    "name",
    "fileName",
    "lineNumber",
    "stack",
];

impl Gen<'_> {
    /// A full program: directive prologue plus a script body.
    pub fn make_script(&mut self, d: i64, _b: &Bindings) -> String {
        let prologue = self.directive_prologue();
        let root = Bindings::from_names(&["x"]);
        let body = if self.rng.next(3) == 0 {
            self.make_mathy_fun_and_test(d, &root)
        } else {
            self.make_statement(d, &root)
        };
        format!("{prologue}{body}")
    }

    /// A fragment suitable for handing to a nested-evaluation primitive.
    pub fn make_script_for_eval(&mut self, d: i64, b: &Bindings) -> String {
        if self.over_ceiling() {
            return self.leaf_fallback(b);
        }
        self.nested(|g| match g.rng.next(4) {
            0 => g.make_expr(d - 1, b),
            1 => g.make_statement(d - 1, b),
            2 => g.make_use_regression_test(d, b),
            _ => g.make_script(d - 3, b),
        })
    }

    /// A statement or block of statements.
    pub fn make_statement(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return ";".to_string();
        }

        if self.rng.next(2) != 0 {
            return self.make_builder_statement(d, b);
        }

        if d < 6 && self.rng.next(3) == 0 {
            return self.make_print_statement(d, b);
        }

        // frequently for small depth, infrequently for large depth
        if d < self.rng.next(8) as i64 {
            return self.make_little_statement(d, b);
        }

        let d = self.reroll_depth(d); // !

        self.nested(|g| {
            let producer = g.tables.statements.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// `for (init; cond; next)` with rare head mutations.
    pub(crate) fn for_loop_head(&mut self, d: i64, b: &Bindings, v: &str, reps: u64) -> String {
        let mut s_init;
        let mut s_cond;
        let mut s_next;

        if self.rng.next(2) == 0 {
            // for (var x = 3; x > 0; x--) { ... }
            s_init = format!("{}{v} = {reps}", self.rng.index(VAR_BINDER_FOR));
            s_cond = format!("{v} > 0");
            s_next = if self.rng.next(2) != 0 {
                format!("--{v}")
            } else {
                format!("{v}--")
            };
        } else {
            // for (var x = 0; x < 3; x++) { ... }
            s_init = format!("{}{v} = 0", self.rng.index(VAR_BINDER_FOR));
            s_cond = format!("{v} < {reps}");
            s_next = if self.rng.next(2) != 0 {
                format!("++{v}")
            } else {
                format!("{v}++")
            };
        }

        while self.rng.next(10) == 0 {
            let item = self.make_let_head_item(d - 2, b);
            s_init.push_str(&format!(", {item}"));
        }
        // NB: only makes sense if our binder is ""
        while self.rng.next(10) == 0 {
            let e = self.make_expr(d - 2, b);
            s_init.push_str(&format!(", {e}"));
        }
        while self.rng.next(1000) == 0 {
            // never runs the loop, but register allocation still happens
            s_init = format!("{}{v}", self.rng.index(VAR_BINDER_FOR));
        }
        while self.rng.next(10_000) == 0 {
            // mostly throws ReferenceError, so rare
            s_init = String::new();
        }

        while self.rng.next(20) == 0 {
            let e = self.make_expr(d - 2, b);
            s_cond = format!("{s_cond} && ({e})");
        }
        while self.rng.next(20) == 0 {
            let e = self.make_expr(d - 2, b);
            s_cond = format!("({e}) && {s_cond}");
        }

        while self.rng.next(20) == 0 {
            let e = self.make_expr(d - 2, b);
            s_next = format!("{s_next}, {e}");
        }
        while self.rng.next(20) == 0 {
            let e = self.make_expr(d - 2, b);
            s_next = format!("{e}, {s_next}");
        }

        format!("for ({s_init}; {s_cond}; {s_next})")
    }

    /// A loop whose counter is invisible to the body.
    pub(crate) fn make_opaque_idiomatic_loop(&mut self, d: i64, b: &Bindings) -> String {
        let reps = loop_count(self);
        let v_hidden = self.unique_var_name();
        let head = self.for_loop_head(d, b, &v_hidden, reps);
        let body = self.make_statement(d - 2, b);
        format!("/*oLoop*/{head} {{ {body} }} ")
    }

    /// A loop that copies its hidden counter into a visible binding. The
    /// visible name is in scope for the body only, never the head.
    pub(crate) fn make_transparent_idiomatic_loop(&mut self, d: i64, b: &Bindings) -> String {
        let reps = loop_count(self);
        let v_hidden = self.unique_var_name();
        let v_visible = self.make_new_id(d, b);
        let head = self.for_loop_head(d, b, &v_hidden, reps);
        let binder = *self.rng.index(VAR_BINDER);
        let body = self.make_statement(d - 2, &b.with(v_visible.clone()));
        format!("/*vLoop*/{head} {{ {binder}{v_visible} = {v_hidden}; {body} }} ")
    }

    /// A loop alternating between two bodies on a modulo condition.
    pub(crate) fn make_branch_unstable_loop(&mut self, d: i64, b: &Bindings) -> String {
        let reps = loop_count(self);
        let v = self.unique_var_name();
        let md = loop_modulo(self);
        let target = self.rng.next(md);
        let head = self.for_loop_head(d, b, &v, reps);
        let then_body = self.make_statement(d - 2, b);
        let else_body = self.make_statement(d - 2, b);
        format!(
            "/*bLoop*/{head} {{ if ({v} % {md} == {target}) {{ {then_body} }} else {{ {else_body} }}  }} "
        )
    }

    /// Iterate a mixed-type array so the loop variable changes type.
    pub(crate) fn make_type_unstable_loop(&mut self, d: i64, b: &Bindings) -> String {
        let a = self.make_mixed_type_array(d, b);
        let v = self.make_new_id(d, b);
        let bv = b.with(v.clone());
        let body = self.make_statement(d - 2, &bv);
        format!("/*tLoop*/for (let {v} of {a}) {{ {body} }}")
    }

    /// Declare a uniquely-named function, then use it.
    pub(crate) fn make_named_function_and_use(&mut self, d: i64, b: &Bindings) -> String {
        // A unique name makes an accidental recursive call unlikely
        let func_name = self.unique_var_name();
        let formal_arg_list = self.make_formal_arg_list(d, b);
        let bv = if formal_arg_list.len() == 1 {
            b.with(formal_arg_list.clone())
        } else {
            b.clone()
        };
        let decl_body = self.make_statement(d - 1, &bv);
        let decl_statement =
            format!("/*hhh*/function {func_name}({formal_arg_list}){{{decl_body}}}");
        let use_statement = if self.rng.next(2) != 0 {
            // Direct call
            let args = self.make_actual_arg_list(d, b);
            format!("{func_name}({args});")
        } else {
            // Any statement, allowed to use the name of the function
            let stmt = self.make_statement(d - 1, &b.with(func_name.clone()));
            format!("/*iii*/{stmt}")
        };
        if self.rng.next(2) != 0 {
            format!("{decl_statement}{use_statement}")
        } else {
            format!("{use_statement}{decl_statement}")
        }
    }

    /// `print(...)` of a bound name or an expression.
    pub fn make_print_statement(&mut self, d: i64, b: &Bindings) -> String {
        if self.rng.next(2) != 0 && !b.is_empty() {
            if let Some(name) = b.choose(self.rng) {
                return format!("print({name});");
            }
        }
        let e = self.make_expr(d, b);
        format!("print({e});")
    }

    pub(crate) fn maybe_label(&mut self) -> String {
        if self.rng.next(4) == 1 {
            format!("{}:", self.rng.index(&["L", "M"]))
        } else {
            String::new()
        }
    }

    /// A switch body with cases, defaults, fallthrough, and breaks.
    pub fn make_switch_body(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "default: ;".to_string();
        }

        let mut d = d;
        let mut have_something = false;
        let mut have_default = false;
        let mut output = String::new();

        loop {
            if !have_something || self.rng.next(2) != 0 {
                if !have_default && self.rng.next(2) != 0 {
                    output.push_str("default: ");
                    have_default = true;
                } else {
                    // integer cases get special optimizations, so test them
                    // well in addition to complicated expressions
                    let label = if self.rng.next(2) != 0 {
                        self.rng.next(10).to_string()
                    } else {
                        self.nested(|g| g.make_expr(d, b))
                    };
                    output.push_str(&format!("case {label}: "));
                }
                have_something = true;
            }

            if self.rng.next(2) != 0 {
                let stmt = self.nested(|g| g.make_statement(d, b));
                output.push_str(&stmt);
            }

            if self.rng.next(2) != 0 {
                output.push_str("break; ");
            }

            if self.rng.next(2) != 0 {
                d -= 1;
            }
            if d <= 0 || self.rng.next(5) == 0 {
                break;
            }
        }

        output
    }

    /// A statement that tends not to recurse much.
    pub fn make_little_statement(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return ";".to_string();
        }

        let d = d - 1;

        if self.rng.next(4) == 1 {
            return self.make_statement(d, b);
        }

        self.nested(|g| {
            let producer = g.tables.little_statements.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// A statement, with or without braces; things behave differently
    /// depending on which.
    pub fn make_statement_or_block(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "{}".to_string();
        }
        self.nested(|g| {
            let producer = g.tables.statement_blocks.pick(g.rng);
            producer(g, d - 1, b)
        })
    }

    /// Extra-hard testing for try/catch/finally and related things.
    pub fn make_exceptiony_statement(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return ";".to_string();
        }

        let d = d - 1;
        if d < 1 {
            return self.make_little_statement(d, b);
        }

        self.nested(|g| {
            let producer = g.tables.exceptiony_statements.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// try { } with optional catch (binding optional) and finally.
    pub fn make_try_block(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "try { } finally { }".to_string();
        }

        // Each part recurses into makeExceptionyStatement, several times on
        // average, so decay faster than usual.
        let d = d - self.rng.next(3) as i64;

        let body = self.make_exceptiony_statement(d, b);
        let mut s = format!("try {{ {body} }} ");

        let mut num_catches = 0;

        if self.rng.next(2) != 0 {
            // Add an unguarded catch.
            num_catches += 1;
            let catch_id = self.make_id(d, b);
            let catch_block = self.make_exceptiony_statement(d, &b.with(catch_id.clone()));
            if self.rng.next(2) != 0 {
                s.push_str(&format!("catch({catch_id}) {{ {catch_block} }} "));
            } else {
                // Catch bindings are optional
                s.push_str(&format!("catch {{ {catch_block} }} "));
            }
        }

        if num_catches == 0 || self.rng.next(2) == 1 {
            let fin = self.make_exceptiony_statement(d, b);
            s.push_str(&format!("finally {{ {fin} }} "));
        }

        s
    }

    /// A block declaring a buffer, several typed views over it, and
    /// statements that poke at them.
    pub fn make_typed_array_statements(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if d < 0 || self.over_ceiling() {
            return String::new();
        }

        let num_views = self.reroll_depth(d).max(0) as u64 + 1;
        let num_extra_statements = self.reroll_depth(d).max(0) as u64 + 1;
        let buffer = self.unique_var_name();
        let buffer_size = (1 + self.rng.next(2)) * (1 + self.rng.next(2)) * (1 + self.rng.next(2))
            * self.rng.next(5);
        let buffer_type = self.array_buffer_type();
        let mut statements = format!("var {buffer} = new {buffer_type}({buffer_size}); ");
        let mut bv = b.with(buffer.clone());
        for j in 0..num_views {
            let view = format!("{buffer}_{j}");
            let ty = *self
                .rng
                .index(super::exprs::TYPED_ARRAY_CONSTRUCTORS);
            statements.push_str(&format!("var {view} = new {ty}({buffer}); "));
            bv = bv.with(view.clone());
            let view_zero = format!("{view}[0]");
            bv = bv.with(view_zero.clone());
            if self.rng.next(3) == 0 {
                statements.push_str(&format!("print({view_zero}); "));
            }
            if self.rng.next(3) != 0 {
                let n = self.make_number(d - 2, b);
                statements.push_str(&format!("{view_zero} = {n}; "));
            }
            bv = bv.with(format!("{view}[{}]", self.rng.next(11)));
        }
        for _ in 0..num_extra_statements {
            let stmt = self.make_statement(d - num_extra_statements as i64, &bv);
            statements.push_str(&stmt);
        }
        statements
    }

    /// A GC/JIT testing-function call wrapped so the last evaluated
    /// expression stays consistent across runs.
    pub fn make_testing_call(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let call_statement = self.nested(|g| {
            let producer = g.tables.testing_calls.pick(g.rng);
            producer(g, d, b)
        });

        // 'void 0' keeps the last expression consistent in eval contexts
        // when the call throws in one run but not another.
        let call_block = format!("{{ void 0; {call_statement} }}");

        if self.tables.caps.engine == Engine::Spidermonkey && self.rng.next(5) == 0 {
            // Differential-testing hack: let the comparator notice when
            // functions like gc() surprise us with visible side effects.
            let bang = if self.rng.next(2) != 0 { "!" } else { "" };
            return format!("{{ if ({bang}isAsmJSCompilationAvailable()) {call_block} void 0; }}");
        }

        call_block
    }

    /// A body with many live locals, combined at the end, to put pressure
    /// on the register allocator.
    pub fn make_register_stomp_body(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let n_vars = self.rng.next(20) + 4;
        let mut names = Vec::new();
        let mut body = String::new();
        for i in 0..n_vars {
            let name = format!("rs{i}");
            let init = self.make_number(d - 1, b);
            body.push_str(&format!("var {name} = {init}; "));
            names.push(name);
        }
        let mut combined = names[0].clone();
        for name in &names[1..] {
            let op = *self.rng.index(&[" + ", " - ", " ^ ", " | ", " * "]);
            combined.push_str(&format!("{op}{name}"));
        }
        body.push_str(&format!("print({combined});"));
        body
    }

    /// Splice a regression test from the corpus, or degrade to a fixed
    /// placeholder when no corpus is configured.
    pub fn make_use_regression_test(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }

        let Some(corpus) = self.corpus else {
            return NO_CORPUS_PLACEHOLDER.to_string();
        };
        if corpus.list().is_empty() {
            return NO_CORPUS_PLACEHOLDER.to_string();
        }

        let main_test = {
            let tests = corpus.list();
            tests[self.rng.next(tests.len() as u64) as usize].clone()
        };
        let files = if self.rng.next(3) != 0 {
            corpus.dependencies(&main_test)
        } else {
            vec![main_test]
        };

        let mut s = String::new();

        if self.rng.next(5) == 0 {
            // Tests call assertEq intending to throw on surprises;
            // sometimes override it with a non-throwing comparator.
            s.push_str("assertEq = function(x, y) { if (x != y) { print(0); } }; ");
        }

        for file in files {
            let Ok(contents) = corpus.read(&file) else {
                continue;
            };
            if is_evil_test(&contents) {
                continue;
            }
            if self.rng.next(2) == 0 {
                // inline -- the only form that works inside newGlobal()
                let inlined = inline_test(&file, &contents);
                s.push_str(&format!("/* regression-test-inline */ {inlined}"));
            } else {
                let path = simple_source(&file.display().to_string());
                s.push_str(&format!("/* regression-test-load */ load({path});"));
            }
        }
        s
    }
}

/// The weighted statement table.
pub(crate) fn statement_makers(caps: &CapabilitySet) -> Vec<(u32, Production)> {
    let mut makers: Vec<(u32, Production)> = vec![
        // Any two statements in sequence
        (15, |g, d, b| {
            let s1 = g.make_statement(d - 1, b);
            let s2 = g.make_statement(d - 1, b);
            format!("{s1}{s2}")
        }),
        (15, |g, d, b| {
            let s1 = g.make_statement(d - 1, b);
            let s2 = g.make_statement(d - 1, b);
            format!("{s1}\n{s2}\n")
        }),
        // What happens if semicolons are missing? Especially with line
        // breaks standing in for them (semicolon insertion).
        (1, |g, d, b| {
            let s1 = strip_semicolon(&g.make_statement(d, b));
            let s2 = g.make_statement(d, b);
            format!("{s1}\n{s2}")
        }),
        (1, |g, d, b| {
            let s = strip_semicolon(&g.make_statement(d, b));
            format!("{s}\n")
        }),
        // usually invalid, but ok e.g. at the end of a block with braces
        (1, |g, d, b| strip_semicolon(&g.make_statement(d, b))),
        // Simple declarations, followed (or preceded) by statements using them
        (4, |g, d, b| {
            let v = g.make_new_id(d, b);
            let binder = *g.rng.index(VAR_BINDER);
            let e = g.make_expr(d, b);
            let stmt = g.make_statement(d - 1, &b.with(v.clone()));
            format!("{binder}{v} = {e};{stmt}")
        }),
        (4, |g, d, b| {
            let v = g.make_new_id(d, b);
            let stmt = g.make_statement(d - 1, &b.with(v.clone()));
            let binder = *g.rng.index(VAR_BINDER);
            let e = g.make_expr(d, b);
            format!("{stmt}{binder}{v} = {e};")
        }),
        // Complex declarations, e.g. "const [a,b] = [3,4];" or "var a,b,c,d=4,e;"
        (10, |g, d, b| {
            let binder = *g.rng.index(VAR_BINDER);
            let head = g.make_let_head(d, b);
            let stmt = g.make_statement(d - 1, b);
            format!("{binder}{head};{stmt}")
        }),
        // Blocks
        (2, |g, d, b| format!("{{{} }}", g.make_statement(d, b))),
        (2, |g, d, b| {
            let s1 = g.make_statement(d - 1, b);
            let s2 = g.make_statement(d - 1, b);
            format!("{{{s1}{s2} }}")
        }),
        // "with" blocks
        (2, |g, d, b| {
            let label = g.maybe_label();
            let e = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, b);
            format!("{label}with({e}){body}")
        }),
        (2, |g, d, b| {
            let label = g.maybe_label();
            let v = g.make_new_id(d, b);
            let e = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, &b.with(v.clone()));
            format!("{label}with({{{v}: {e}}}){body}")
        }),
        // C-style "for" loops, freely infinite
        (1, |g, d, b| {
            let label = g.maybe_label();
            let init = g.make_expr(d, b);
            let cond = g.make_expr(d, b);
            let next = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, b);
            format!("/*infloop*/{label}for({init}; {cond}; {next}) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let v = g.make_new_id(d, b);
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let cond = g.make_expr(d, b);
            let next = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, &b.with(v.clone()));
            format!("/*infloop*/{label}for({binder}{v}; {cond}; {next}) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let v = g.make_new_id(d, b);
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let init = g.make_expr(d, b);
            let cond = g.make_expr(d, b);
            let next = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, &b.with(v.clone()));
            format!("/*infloop*/{label}for({binder}{v} = {init}; {cond}; {next}) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let lv = g.make_destructuring_lvalue(d, b);
            let init = g.make_expr(d, b);
            let cond = g.make_expr(d, b);
            let next = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, b);
            format!("/*infloop*/{label}for({binder}{lv} = {init}; {cond}; {next}) {body}")
        }),
        // Loop shapes set up to stress compilation without hanging
        (6, |g, d, b| g.make_transparent_idiomatic_loop(d, b)),
        (6, |g, d, b| g.make_opaque_idiomatic_loop(d, b)),
        (6, |g, d, b| g.make_branch_unstable_loop(d, b)),
        (8, |g, d, b| g.make_type_unstable_loop(d, b)),
        // "for..in" loops: arbitrary-LHS forms are infloop-marked
        (1, |g, d, b| {
            let label = g.maybe_label();
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let lhs = g.make_lvalue(d, b);
            let e = g.make_expr(d - 2, b);
            let body = g.make_statement_or_block(d, b);
            format!("/*infloop*/{label}for({binder}{lhs} in {e}) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let v = g.make_new_id(d, b);
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let e = g.make_expr(d - 2, b);
            let body = g.make_statement_or_block(d, &b.with(v.clone()));
            format!("{label}for({binder}{v} in {e}) {body}")
        }),
        // -- for (key in (function(){...})(...))
        (1, |g, d, b| {
            let label = g.maybe_label();
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let lhs = g.make_lvalue(d, b);
            let f = g.make_function(d, b);
            let arg = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, b);
            format!("/*infloop*/{label}for({binder}{lhs} in (({f})({arg}))) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let v = g.make_new_id(d, b);
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let f = g.make_function(d, b);
            let arg = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, &b.with(v.clone()));
            format!("{label}for({binder}{v} in (({f})({arg}))) {body}")
        }),
        // -- for (element of arraylike)
        (1, |g, d, b| {
            let label = g.maybe_label();
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let lhs = g.make_lvalue(d, b);
            let e = g.make_expr(d - 2, b);
            let body = g.make_statement_or_block(d, b);
            format!("/*infloop*/{label} for ({binder}{lhs} of {e}) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let v = g.make_new_id(d, b);
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let e = g.make_expr(d - 2, b);
            let body = g.make_statement_or_block(d, &b.with(v.clone()));
            format!("{label} for ({binder}{v} of {e}) {body}")
        }),
        // -- for-await-of
        (1, |g, d, b| {
            let label = g.maybe_label();
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let lhs = g.make_lvalue(d, b);
            let e = g.make_expr(d - 2, b);
            let body = g.make_statement_or_block(d, b);
            format!("/*infloop*/{label} for await({binder}{lhs} of {e}) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let v = g.make_new_id(d, b);
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let e = g.make_expr(d - 2, b);
            let body = g.make_statement_or_block(d, &b.with(v.clone()));
            format!("{label} for await({binder}{v} of {e}) {body}")
        }),
        // Hoisty "for..in" loops: the initial-value expression is hoisted
        // above the loop
        (1, |g, d, b| {
            let label = g.maybe_label();
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let id = g.make_id(d, b);
            let init = g.make_expr(d, b);
            let e = g.make_expr(d - 2, b);
            let body = g.make_statement_or_block(d, b);
            format!("{label}for({binder}{id} = {init} in {e}) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let v = g.make_new_id(d, b);
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let init = g.make_expr(d, b);
            let e = g.make_expr(d - 2, b);
            let body = g.make_statement_or_block(d, &b.with(v.clone()));
            format!("{label}for({binder}{v} = {init} in {e}) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let v = g.make_new_id(d, b);
            let w = g.make_new_id(d, b);
            let binder = *g.rng.index(VAR_BINDER_FOR);
            let init = g.make_expr(d, b);
            let e = g.make_expr(d - 2, b);
            let body = g.make_statement_or_block(d, &b.with(v.clone()).with(w.clone()));
            format!("{label}for({binder}[{v}, {w}] = {init} in {e}) {body}")
        }),
        // while / do..while; the "&& 0" guard keeps these finite
        (1, |g, d, b| {
            let label = g.maybe_label();
            let e = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, b);
            format!("{label}while(({e}) && 0){body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let e = g.make_expr(d, b);
            let body = g.make_statement_or_block(d, b);
            format!("/*infloop*/{label}while({e}){body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let body = g.make_statement_or_block(d, b);
            let e = g.make_expr(d, b);
            format!("{label}do {body} while(({e}) && 0);")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let body = g.make_statement_or_block(d, b);
            let e = g.make_expr(d, b);
            format!("/*infloop*/{label}do {body} while({e});")
        }),
        // Switch statement
        (3, |g, d, b| {
            let label = g.maybe_label();
            let e = g.make_expr(d, b);
            let body = g.make_switch_body(d, b);
            format!("{label}switch({e}) {{ {body} }}")
        }),
        // Conditionals, perhaps with 'else if' / 'else'
        (1, |g, d, b| {
            let label = g.maybe_label();
            let cond = g.make_boolean(d, b);
            let body = g.make_statement_or_block(d, b);
            format!("{label}if({cond}) {body}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let cond = g.make_boolean(d, b);
            let t = g.make_statement_or_block(d - 1, b);
            let e = g.make_statement_or_block(d - 1, b);
            format!("{label}if({cond}) {t} else {e}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let cond = g.make_boolean(d, b);
            let t = g.make_statement_or_block(d - 1, b);
            let cond2 = g.make_expr(d, b);
            let e = g.make_statement_or_block(d - 1, b);
            format!("{label}if({cond}) {t} else  if ({cond2}) {e}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let cond = g.make_boolean(d, b);
            let t = g.make_statement_or_block(d - 1, b);
            let cond2 = g.make_expr(d, b);
            let e1 = g.make_statement_or_block(d - 1, b);
            let e2 = g.make_statement_or_block(d - 1, b);
            format!("{label}if({cond}) {t} else  if ({cond2}) {e1} else {e2}")
        }),
        // A tricky pair of if/else cases: in the second, braces keep the
        // final "else" with the first "if".
        (1, |g, d, b| {
            let label = g.maybe_label();
            let cond = g.make_boolean(d, b);
            let cond2 = g.make_expr(d, b);
            let t = g.make_statement_or_block(d - 1, b);
            let e = g.make_statement_or_block(d - 1, b);
            format!("{label}if({cond}) {{ if ({cond2}) {t} else {e}}}")
        }),
        (1, |g, d, b| {
            let label = g.maybe_label();
            let cond = g.make_boolean(d, b);
            let cond2 = g.make_expr(d, b);
            let t = g.make_statement_or_block(d - 1, b);
            let e = g.make_statement_or_block(d - 1, b);
            format!("{label}if({cond}) {{ if ({cond2}) {t}}} else {e}")
        }),
        // Expression statements
        (5, |g, d, b| format!("{};", g.make_expr(d, b))),
        (5, |g, d, b| format!("({});", g.make_expr(d, b))),
        // Exception-related statements :)
        (6, |g, d, b| {
            let s1 = g.make_exceptiony_statement(d - 1, b);
            let s2 = g.make_exceptiony_statement(d - 1, b);
            format!("{s1}{s2}")
        }),
        (7, |g, d, b| g.make_exceptiony_statement(d, b)),
        // Labels (no goto, but break-to-label and continue-to-label exist)
        (1, |g, d, b| format!("L: {}", g.make_statement_or_block(d, b))),
        // Function-declaration-statements with shared names
        (10, |g, d, b| {
            let s1 = g.make_statement(d - 2, b);
            let id = g.make_id(d, b);
            let args = g.make_formal_arg_list(d, b);
            let body = g.make_function_body(d - 1, b);
            let s2 = g.make_statement(d - 2, b);
            format!("{s1}function {id}({args}){body}{s2}")
        }),
        // Function-declaration-statements with unique names, plus calls
        (8, |g, d, b| g.make_named_function_and_use(d, b)),
        // Long script -- can confuse short vs long jumps
        (1, |g, d, b| {
            if g.rng.next(200) == 0 {
                let n = g.rng.next(10_000);
                let stmt = g.make_statement(d - 1, b);
                return format!("/*DUPTRY{n}*/{stmt}");
            }
            ";".to_string()
        }),
        (1, |g, d, b| g.make_shapey_constructor_loop(d, b)),
        // Replace a variable with a long linked list pointing to it;
        // forces the GC marker into a stackless mode.
        (1, |g, d, b| {
            let x = g.make_id(d, b);
            let n = g.rng.next(100) * g.rng.next(100);
            let list = g.linked_list_expr(&x, n);
            format!("{x} = {list}")
        }),
        // Oddly placed "use strict" or "use asm"
        (1, |g, d, b| {
            let prologue = g.directive_prologue();
            let stmt = g.make_statement(d - 1, b);
            format!("{prologue}{stmt}")
        }),
        // GC and JIT controls
        (3, |g, d, b| g.make_testing_call(d, b)),
        (3, |g, d, b| {
            let call = g.make_testing_call(d - 1, b);
            let stmt = g.make_statement(d - 1, b);
            format!("{call} {stmt}")
        }),
        // Blocks of statements related to typed arrays
        (8, |g, d, b| g.make_typed_array_statements(d, b)),
        // Print statements
        (8, |g, d, b| g.make_print_statement(d, b)),
        (20, |g, d, b| g.make_regex_use_block(d, b)),
        (1, |g, d, b| g.make_register_stomp_body(d, b)),
        (20, |g, d, b| g.make_use_regression_test(d, b)),
    ];

    if caps.use_oom_test() {
        makers.push((1, |g, d, b| {
            format!("oomTest({})", g.make_function(d - 1, b))
        }));
        makers.push((1, |g, d, b| {
            format!("oomTest({}, {{ keepFailing: true }})", g.make_function(d - 1, b))
        }));
    }

    makers
}

pub(crate) fn little_statement_makers() -> Vec<Production> {
    fn expr_statement(g: &mut Gen<'_>, d: i64, b: &Bindings) -> String {
        format!("{};", g.make_expr(d, b))
    }
    fn paren_expr_statement(g: &mut Gen<'_>, d: i64, b: &Bindings) -> String {
        format!("({});", g.make_expr(d, b))
    }

    let mut makers: Vec<Production> = vec![
        // Tiny
        |_, _, _| ";".to_string(), // e.g. empty "if" block
        |_, _, _| "{}".to_string(),
        |_, _, _| String::new(),
        // Throw stuff.
        |g, d, b| format!("throw {};", g.make_expr(d, b)),
        // Break/continue [to label].
        |g, _, _| {
            let kw = *g.rng.index(&["continue", "break"]);
            let label = *g.rng.index(&["L", "M", "", ""]);
            format!("{kw} {label};")
        },
        // Named and unnamed functions want to be in different positions
        |g, d, b| g.make_function(d, b),
        // Return, yield, await
        |g, d, b| format!("return {};", g.make_expr(d, b)),
        // return without a value is allowed in generators; with a value it is not
        |_, _, _| "return;".to_string(),
        |g, d, b| format!("yield {};", g.make_expr(d, b)),
        |_, _, _| "yield;".to_string(),
        |g, d, b| format!("await {};", g.make_expr(d, b)),
    ];
    // Expression statements carry most of the little-statement mass
    for _ in 0..7 {
        makers.push(expr_statement);
    }
    for _ in 0..7 {
        makers.push(paren_expr_statement);
    }
    makers
}

pub(crate) fn statement_block_makers() -> Vec<Production> {
    vec![
        |g, d, b| g.make_statement(d, b),
        |g, d, b| g.make_statement(d, b),
        |g, d, b| format!("{{{} }}", g.make_statement(d, b)),
        |g, d, b| {
            let s1 = g.make_statement(d - 1, b);
            let s2 = g.make_statement(d - 1, b);
            format!("{{{s1}{s2} }}")
        },
    ]
}

pub(crate) fn exceptiony_statement_makers() -> Vec<Production> {
    vec![
        |g, d, b| g.make_try_block(d, b),
        |g, d, b| g.make_statement(d, b),
        |g, d, b| g.make_little_statement(d, b),
        // return without a value can be mixed with yield
        |_, _, _| "return;".to_string(),
        |g, d, b| format!("return {};", g.make_expr(d, b)),
        |g, d, b| format!("yield {};", g.make_expr(d, b)),
        |g, d, b| format!("await {};", g.make_expr(d, b)),
        |g, d, b| format!("throw {};", g.make_id(d, b)),
        |g, _, b| {
            let name = match b.names().last() {
                Some(n) => n.clone(),
                None => "this".to_string(),
            };
            format!("{name}.{};", g.rng.index(EXCEPTION_PROPERTIES))
        },
        |g, d, b| {
            let id = g.make_id(d, b);
            format!("{id}.{};", g.rng.index(EXCEPTION_PROPERTIES))
        },
        |g, d, b| {
            let lhs = g.make_id(d, b);
            let rhs = g.make_id(d, b);
            format!("{lhs} = {rhs};")
        },
        |g, d, b| {
            let lhs = g.make_lvalue(d, b);
            let rhs = g.make_id(d, b);
            format!("{lhs} = {rhs};")
        },
        // Iteration asserts that there is no pending exception
        |g, d, b| {
            let v = g.make_new_id(d, b);
            format!("for(let {v} in []);")
        },
        |g, d, b| {
            let v = g.make_new_id(d, b);
            let it = g.make_iterable(d, b);
            let body = g.make_exceptiony_statement(d, &b.with(v.clone()));
            format!("for(let {v} in {it}) {body}")
        },
        |g, d, b| {
            let v = g.make_new_id(d, b);
            let it = g.make_iterable(d, b);
            let body = g.make_exceptiony_statement(d, &b.with(v.clone()));
            format!("for(let {v} of {it}) {body}")
        },
        |g, d, b| {
            let v = g.make_new_id(d, b);
            let it = g.make_iterable(d, b);
            let body = g.make_exceptiony_statement(d, &b.with(v.clone()));
            format!("for await(let {v} of {it}) {body}")
        },
        // Scary place to throw: with
        |g, d, b| format!("with({{}}) {}", g.make_exceptiony_statement(d, b)),
        |g, d, b| {
            format!("with({{}}) {{ {} }} ", g.make_exceptiony_statement(d, b))
        },
    ]
}

/// GC/JIT shell control calls. Chosen to have no visible side effects
/// beyond return values (voided) or throwing (caught), so a differential
/// harness can still compare outputs.
pub(crate) fn testing_call_makers(caps: &CapabilitySet) -> Vec<(u32, Production)> {
    let mut makers: Vec<(u32, Production)> = vec![
        (3, |_, _, _| "void gc();".to_string()),
        (1, |_, _, _| "void gc(this);".to_string()),
        (1, |_, _, _| "void gc('compartment');".to_string()),
        (2, |g, _, _| {
            let shrinking = if g.rng.next(2) != 0 { "true" } else { "false" };
            format!("minorgc({shrinking});")
        }),
        (2, |g, _, _| {
            let param = *g.rng.index(&[
                "maxBytes",
                "minNurseryBytes",
                "maxNurseryBytes",
                "gcBytes",
                "gcNumber",
                "sliceTimeBudgetMS",
                "markStackLimit",
            ]);
            let n = g.rng.skewed(4294967296_f64) as u64;
            format!("gcparam('{param}', {n});")
        }),
        (2, |g, _, _| {
            let n = g.rng.skewed(500.0) as u64;
            format!("schedulegc({n});")
        }),
        (1, |_, _, _| "schedulegc(this);".to_string()),
        (2, |g, _, _| {
            let n = g.rng.skewed(2000.0) as u64;
            format!("gcslice({n});")
        }),
        (1, |g, _, _| {
            let on = if g.rng.next(2) != 0 { "true" } else { "false" };
            format!("deterministicgc({on});")
        }),
        (1, |g, _, _| {
            let on = if g.rng.next(2) != 0 { "true" } else { "false" };
            format!("fullcompartmentchecks({on});")
        }),
        (1, |_, _, _| "verifyprebarriers();".to_string()),
        (1, |_, _, _| "verifypostbarriers();".to_string()),
        (1, |_, _, _| "relazifyFunctions();".to_string()),
        (1, |_, _, _| "relazifyFunctions(this);".to_string()),
        (2, |g, _, _| {
            let n = g.rng.skewed(2000.0) as u64;
            format!("startgc({n});")
        }),
        (1, |g, _, _| {
            let n = g.rng.skewed(2000.0) as u64;
            format!("startgc({n}, 'shrinking');")
        }),
        (2, |g, _, _| {
            let option = *g.rng.index(&[
                "ion.warmup.trigger",
                "baseline.warmup.trigger",
                "ion.forceinlineCaches",
                "offthread-compilation.enable",
            ]);
            let n = g.rng.next(20);
            format!("setJitCompilerOption('{option}', {n});")
        }),
        (1, |_, _, _| "enableOsiPointRegisterChecks();".to_string()),
        (1, |_, _, _| "bailout();".to_string()),
        (1, |g, _, _| format!("bailAfter({});", g.rng.next(100))),
        (1, |_, _, _| "assertJitStackInvariants();".to_string()),
        (1, |_, _, _| "clearKeptObjects();".to_string()),
        (2, |g, _, _| {
            let n = g.rng.next(17);
            let steps = g.rng.skewed(500.0) as u64;
            format!("gczeal({n}, {steps});")
        }),
        (1, |_, _, _| "gczeal(0);".to_string()),
    ];

    if caps.oom_test {
        makers.push((1, |g, _, _| {
            format!("oomAfterAllocations({});", g.rng.skewed(5000.0) as u64 + 1)
        }));
        makers.push((1, |g, _, _| {
            format!("oomAtAllocation({});", g.rng.skewed(5000.0) as u64 + 1)
        }));
        makers.push((1, |_, _, _| "resetOOMFailure();".to_string()));
    }

    makers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::build_grammar;
    use crate::random::SeededRng;

    fn make_gen<'a>(
        rng: &'a mut SeededRng,
        tables: &'a crate::grammar::GrammarTables,
    ) -> Gen<'a> {
        Gen::new(rng, tables)
    }

    #[test]
    fn test_make_statement_total_across_depths() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(20);
        let mut g = make_gen(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        for d in [-2, 0, 1, 3, 6, 10] {
            for _ in 0..50 {
                let _ = g.make_statement(d, &b);
            }
        }
    }

    #[test]
    fn test_for_loop_head_mentions_counter() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(21);
        let mut g = make_gen(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..50 {
            let head = g.for_loop_head(3, &b, "qqrrss", 7);
            assert!(head.starts_with("for ("), "got {head}");
            assert!(head.contains("qqrrss"), "got {head}");
        }
    }

    #[test]
    fn test_transparent_loop_copies_hidden_into_visible() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(22);
        let mut g = make_gen(&mut rng, &tables);
        let b = Bindings::new();
        for _ in 0..30 {
            let s = g.make_transparent_idiomatic_loop(3, &b);
            if !s.starts_with("/*vLoop*/for (") {
                continue; // chaos fired or the head got a rare mutation
            }
            let brace = s.find('{').expect("loop has a body");
            let head = &s[..brace];
            let body = &s[brace..];
            // the init clause binds the hidden 6-letter counter
            let init = head.trim_start_matches("/*vLoop*/for (");
            let counter = init
                .trim_start_matches("var ")
                .trim_start_matches("let ")
                .split(|c: char| !c.is_ascii_lowercase())
                .next()
                .unwrap_or("");
            if counter.len() != 6 {
                continue; // init itself was mutated away
            }
            // the body starts by copying the counter into the visible name
            assert!(
                body.contains(&format!("= {counter}")),
                "body does not copy {counter}: {body}"
            );
            // the visible name is for the body only, never the head
            let visible_pos = body.find(&format!("= {counter}")).unwrap();
            let visible = body[..visible_pos]
                .trim_start_matches('{')
                .trim()
                .trim_start_matches("var ")
                .trim_start_matches("let ")
                .trim_start_matches("const ")
                .trim()
                .to_string();
            // rare head mutations splice extra expressions in; only an
            // unmutated head is a fair leak check
            let pristine = !head.contains(',') && !head.contains("&&");
            if visible.len() == 1 && pristine {
                assert!(
                    !head.contains(&format!(" {visible} ")),
                    "visible name {visible} leaked into head: {head}"
                );
            }
        }
    }

    #[test]
    fn test_branch_unstable_loop_has_both_arms() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(23);
        let mut g = make_gen(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..20 {
            let s = g.make_branch_unstable_loop(3, &b);
            if s.starts_with("/*bLoop*/") {
                assert!(s.contains("if ("), "got {s}");
                assert!(s.contains("else"), "got {s}");
            }
        }
    }

    #[test]
    fn test_type_unstable_loop_iterates_marked_array() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(24);
        let mut g = make_gen(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        let mut marked = 0;
        for _ in 0..20 {
            let s = g.make_type_unstable_loop(4, &b);
            if s.starts_with("/*tLoop*/for (let ") {
                marked += 1;
            }
        }
        assert!(marked > 10);
    }

    #[test]
    fn test_switch_body_structure() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(25);
        let mut g = make_gen(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..50 {
            let s = g.make_switch_body(4, &b);
            // the first iteration always emits a case or default label
            assert!(
                s.starts_with("case ") || s.starts_with("default: "),
                "got {s}"
            );
        }
    }

    #[test]
    fn test_try_block_always_catch_or_finally() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(26);
        let mut g = make_gen(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..50 {
            let s = g.make_try_block(4, &b);
            if s.starts_with("try {") {
                assert!(
                    s.contains("catch") || s.contains("finally"),
                    "bare try: {s}"
                );
            }
        }
    }

    #[test]
    fn test_typed_array_statements_declare_buffer_and_views() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(27);
        let mut g = make_gen(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        let mut saw = false;
        for _ in 0..30 {
            let s = g.make_typed_array_statements(5, &b);
            if s.contains("new ArrayBuffer(") {
                assert!(s.contains("Array("), "no view over buffer: {s}");
                saw = true;
            }
        }
        assert!(saw);
    }

    #[test]
    fn test_typed_array_statements_empty_below_zero_depth() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(28);
        let mut g = make_gen(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        assert_eq!(g.make_typed_array_statements(-1, &b), "");
    }

    #[test]
    fn test_regression_test_placeholder_without_corpus() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(29);
        let mut g = make_gen(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        assert_eq!(
            g.make_use_regression_test(3, &b),
            NO_CORPUS_PLACEHOLDER
        );
    }

    #[test]
    fn test_testing_call_wraps_in_void_block() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(30);
        let mut g = make_gen(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..30 {
            let s = g.make_testing_call(3, &b);
            assert!(s.contains("void 0;"), "got {s}");
        }
    }

    #[test]
    fn test_register_stomp_body_uses_all_locals() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(31);
        let mut g = make_gen(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        let s = g.make_register_stomp_body(3, &b);
        assert!(s.contains("var rs0 = "), "got {s}");
        assert!(s.contains("print(rs0"), "got {s}");
    }

    #[test]
    fn test_oom_statements_only_with_capability() {
        let with_oom = statement_makers(&CapabilitySet::spidermonkey_shell());
        let without = statement_makers(&CapabilitySet::none());
        assert_eq!(with_oom.len(), without.len() + 2);
    }
}
