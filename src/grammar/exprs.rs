//! Expression grammar: expressions, lvalues, terms, functions, literals
//! with structure
//!
//! The alternative lists mirror the shape of the statement grammar: plain
//! uniform pools where every entry is equally likely, with repetition used
//! instead of weights where one shape should dominate (binary operators,
//! plain expression statements).

use super::literals::{simple_source, SIMPLE_TERMS};
use super::{strip_semicolon, Bindings, Gen, Production};
use crate::capabilities::CapabilitySet;

/// Binary operators, including assignment and comma forms.
pub(crate) const BINARY_OPS: &[&str] = &[
    " * ", " / ", " % ", " + ", " - ", " << ", " >> ", " >>> ", " < ", " > ", " <= ", " >= ",
    " instanceof ", " in ", " == ", " != ", " === ", " !== ", " & ", " | ", " ^ ", " && ", " || ",
    " = ", " *= ", " /= ", " %= ", " += ", " -= ", " <<= ", " >>= ", " >>>= ", " &= ", " ^= ",
    " |= ", " , ", " ** ", " **= ",
];

pub(crate) const LEFT_UNARY_OPS: &[&str] = &[
    "!", "+", "-", "~", "void ", "typeof ", "delete ", "new ", "yield ", "await ",
];

pub(crate) const INC_DEC_OPS: &[&str] = &["++", "--"];

/// Properties that hit special lookup paths in engines.
pub(crate) const SPECIAL_PROPERTIES: &[&str] = &[
    "__proto__",
    "constructor",
    "prototype",
    "wrappedJSObject",
    "arguments",
    "caller",
    "callee",
    "toString",
    "valueOf",
    "call",
    "apply",
    "length",
    "0",
    "1",
    "Symbol.species",
];

pub(crate) const TYPED_ARRAY_CONSTRUCTORS: &[&str] = &[
    "Int8Array",
    "Uint8Array",
    "Int16Array",
    "Uint16Array",
    "Int32Array",
    "Uint32Array",
    "Float32Array",
    "Float64Array",
    "Uint8ClampedArray",
];

pub(crate) const VAR_BINDER: &[&str] = &["var ", "let ", "const ", ""];
/// `const` is a syntax error in for-loop heads.
pub(crate) const VAR_BINDER_FOR: &[&str] = &["var ", "let ", ""];

const CONSTRUCTORS: &[&str] = &[
    "Object",
    "Array",
    "Function",
    "String",
    "Number",
    "Boolean",
    "RegExp",
    "Date",
    "Error",
    "RangeError",
    "TypeError",
    "SyntaxError",
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "Promise",
    "Proxy",
    "ArrayBuffer",
    "DataView",
    "Int8Array",
    "Uint8Array",
    "Float64Array",
];

const BUILTIN_FUNCTIONS: &[&str] = &[
    "Array.prototype.join",
    "Array.prototype.reverse",
    "Array.prototype.sort",
    "Array.prototype.push",
    "Array.prototype.slice",
    "Array.prototype.forEach",
    "Object.defineProperty",
    "Object.freeze",
    "Object.keys",
    "Object.create",
    "String.prototype.split",
    "String.prototype.charCodeAt",
    "String.prototype.replace",
    "String.fromCharCode",
    "Math.max",
    "Math.min",
    "Math.pow",
    "Math.hypot",
    "JSON.parse",
    "JSON.stringify",
    "Number.isInteger",
    "isNaN",
    "parseInt",
    "parseFloat",
    "WeakMap.prototype.set",
    "Map.prototype.get",
    "Set.prototype.add",
    "Promise.resolve",
    "Array.isArray",
    "Reflect.apply",
];

const BUILTIN_OBJECT_NAMES: &[&str] = &[
    "Math",
    "JSON",
    "Reflect",
    "Object",
    "Array",
    "String",
    "Number",
    "Symbol",
    "Proxy",
    "Promise",
    "globalThis",
];

const BUILTIN_PROPERTIES: &[&str] = &[
    "Math.PI",
    "Math.E",
    "Number.MAX_VALUE",
    "Number.MIN_VALUE",
    "Number.EPSILON",
    "Array.prototype",
    "Object.prototype.toString",
    "RegExp.prototype.exec",
    "Symbol.iterator",
    "Symbol.species",
    "Function.prototype.call",
];

pub(crate) const ALL_METHOD_NAMES: &[&str] = &[
    "toString",
    "valueOf",
    "call",
    "apply",
    "bind",
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "push",
    "pop",
    "shift",
    "unshift",
    "splice",
    "concat",
    "join",
    "reverse",
    "sort",
    "slice",
    "indexOf",
    "lastIndexOf",
    "map",
    "filter",
    "some",
    "every",
    "reduce",
    "forEach",
    "keys",
    "values",
    "entries",
    "charAt",
    "charCodeAt",
    "codePointAt",
    "substr",
    "substring",
    "trim",
    "split",
    "replace",
    "match",
    "search",
    "exec",
    "test",
    "compile",
    "get",
    "set",
    "has",
    "add",
    "delete",
    "clear",
    "next",
    "throw",
    "return",
    "then",
    "catch",
    "getOwnPropertyNames",
    "defineProperty",
    "defineProperties",
    "toLocaleString",
    "toSource",
    "toFixed",
    "toPrecision",
    "toExponential",
];

pub(crate) const ALL_PROPERTY_NAMES: &[&str] = &[
    "length",
    "name",
    "message",
    "prototype",
    "constructor",
    "__proto__",
    "caller",
    "callee",
    "arguments",
    "lastIndex",
    "source",
    "global",
    "ignoreCase",
    "multiline",
    "size",
    "buffer",
    "byteLength",
    "byteOffset",
    "BYTES_PER_ELEMENT",
    "index",
    "input",
    "lineNumber",
    "fileName",
    "stack",
    "description",
];

impl Gen<'_> {
    pub(crate) fn reroll_depth(&mut self, d: i64) -> i64 {
        if d <= 0 {
            0
        } else {
            self.rng.next(d as u64) as i64
        }
    }

    /// A string that sorta makes sense as an expression.
    pub fn make_expr(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return self.leaf_fallback(b);
        }

        if d <= 0 || self.rng.next(7) == 1 {
            return self.make_term(d - 1, b);
        }

        if self.rng.next(6) == 1 && !b.is_empty() {
            if let Some(name) = b.choose(self.rng) {
                return name.to_string();
            }
        }

        if self.rng.next(10) == 1 {
            return self.make_immediate_recursive_call(d, b);
        }

        let d = self.reroll_depth(d); // !

        let expr = self.nested(|g| {
            let producer = g.tables.exprs.pick(g.rng);
            producer(g, d, b)
        });

        if self.rng.next(4) == 1 {
            format!("({expr})")
        } else {
            expr
        }
    }

    /// A terminal: no recursion required (though a few alternatives still
    /// wander back into the id grammar).
    pub fn make_term(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return self.leaf_fallback(b);
        }
        self.nested(|g| {
            let producer = g.tables.terms.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// Something assignment-compatible, or deliberately almost so.
    pub fn make_lvalue(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return self.leaf_fallback(b);
        }

        if d <= 0 || self.rng.next(2) == 1 {
            return self.make_id(d - 1, b);
        }

        let d = self.reroll_depth(d); // !

        self.nested(|g| {
            let producer = g.tables.lvalues.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// An array or object destructuring pattern (or a plain id).
    pub fn make_destructuring_lvalue(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return self.leaf_fallback(b);
        }

        let d = d - 1;

        if d < 0 || self.rng.next(4) == 1 {
            return self.make_id(d, b);
        }

        if self.rng.next(6) == 1 {
            return self.make_lvalue(d, b);
        }

        self.nested(|g| {
            let producer = g.tables.destructuring_lvalues.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// A destructuring element, or a hole.
    pub(crate) fn maybe_make_destructuring_lvalue(&mut self, d: i64, b: &Bindings) -> String {
        if self.rng.next(2) == 0 {
            return String::new();
        }
        self.make_destructuring_lvalue(d, b)
    }

    /// A function-ish expression.
    pub fn make_function(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "function(q) { return q; }".to_string();
        }

        let d = d - 1;

        if self.rng.next(5) == 1 {
            return self.make_expr(d, b);
        }

        if self.rng.next(4) == 1 {
            return (*self.rng.index(BUILTIN_FUNCTIONS)).to_string();
        }

        self.nested(|g| {
            let producer = g.tables.functions.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// `` or `"use strict"; ` or `"use asm"; ` prefixes.
    pub(crate) fn directive_prologue(&mut self) -> String {
        let mut s = String::new();
        if self.rng.next(3) == 0 {
            s.push_str("\"use strict\"; ");
        }
        if self.rng.next(30) == 0 {
            s.push_str("\"use asm\"; ");
        }
        s
    }

    /// `function`, `function*`, `async function`, or `async function*`.
    pub(crate) fn function_prefix(&mut self) -> String {
        let mut s = String::new();
        if self.rng.next(2) != 0 {
            s.push_str("async ");
        }
        s.push_str("function");
        if self.rng.next(2) != 0 {
            s.push('*');
        }
        s
    }

    /// An optional function name (half the time).
    pub(crate) fn maybe_name(&mut self, d: i64, b: &Bindings) -> String {
        if self.rng.next(2) == 0 {
            format!(" {} ", self.make_id(d, b))
        } else {
            String::new()
        }
    }

    /// A function body: statement block, expression closure, or asm.js
    /// interior.
    pub fn make_function_body(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return " { } ".to_string();
        }
        match self.rng.next(6) {
            0 => {
                let p = self.directive_prologue();
                let s = self.make_statement(d - 1, b);
                format!(" {{ {p}{s} }} ")
            }
            1 => {
                let p = self.directive_prologue();
                let e = self.make_expr(d, b);
                format!(" {{ {p}return {e} }} ")
            }
            2 => {
                let p = self.directive_prologue();
                let e = self.make_expr(d, b);
                format!(" {{ {p}yield {e} }} ")
            }
            3 => {
                let p = self.directive_prologue();
                let e = self.make_expr(d, b);
                format!(" {{ {p}await {e} }} ")
            }
            4 => format!("\"use asm\"; {}", self.asmjs_interior(&[], false)),
            _ => self.make_expr(d, b),
        }
    }

    /// A formal parameter list; rarely enormous, rarely with rest args.
    pub fn make_formal_arg_list(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let mut args = Vec::new();
        let n_args = if self.rng.next(5) != 0 {
            self.rng.next(3)
        } else {
            self.rng.next(100)
        };
        for i in 0..n_args {
            args.push(self.make_formal_arg(d - i as i64, b));
        }
        if self.rng.next(5) == 0 {
            let rest = self.make_id(d, b);
            args.push(format!("...{rest}"));
        }
        args.join(", ")
    }

    fn make_formal_arg(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.rng.next(8) == 1 {
            return self.make_destructuring_lvalue(d, b);
        }
        let id = self.make_id(d, b);
        if self.rng.next(5) == 0 {
            let default = self.make_expr(d, b);
            format!("{id} = {default}")
        } else {
            id
        }
    }

    /// 0-2 call arguments with decaying depth.
    pub fn make_actual_arg_list(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let n_args = self.rng.next(3);
        if n_args == 0 {
            return String::new();
        }
        let mut list = self.make_expr(d, b);
        for i in 1..n_args {
            let arg = self.make_expr(d - i as i64, b);
            list.push_str(", ");
            list.push_str(&arg);
        }
        list
    }

    /// `arguments.callee(.caller)*`
    pub(crate) fn make_fun_on_call_chain(&mut self) -> String {
        let mut s = String::from("arguments.callee");
        while self.rng.next(2) != 0 {
            s.push_str(".caller");
        }
        s
    }

    /// One `name: value` / getter / setter part of an object literal.
    pub fn make_obj_literal_part(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "a1: 1".to_string();
        }
        match self.rng.next(8) {
            2 => {
                let name = self.make_obj_literal_name(d, b);
                let fname = self.maybe_name(d, b);
                let args = self.make_formal_arg_list(d - 1, b);
                let body = self.make_function_body(d, b);
                format!(" get {name}{fname}({args}){body}")
            }
            3 => {
                let name = self.make_obj_literal_name(d, b);
                let fname = self.maybe_name(d, b);
                let args = self.make_formal_arg_list(d - 1, b);
                let body = self.make_function_body(d, b);
                format!(" set {name}{fname}({args}){body}")
            }
            4 => {
                let which = *self.rng.index(&["toString", "valueOf"]);
                let f = self.make_to_x_function(d - 1, b);
                format!("/*toXFun*/{which}: {f}")
            }
            _ => {
                let name = self.make_obj_literal_name(d, b);
                let value = self.make_expr(d, b);
                format!("{name}: {value}")
            }
        }
    }

    fn make_to_x_function(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        match self.rng.next(4) {
            0 => format!("function() {{ return {}; }}", self.make_expr(d, b)),
            1 => "function() { return this; }".to_string(),
            2 => self.make_evil_callback(d, b),
            _ => self.make_function(d, b),
        }
    }

    pub(crate) fn make_obj_literal_name(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "a1".to_string();
        }
        match self.rng.next(6) {
            0 => {
                let n = self.make_number(d, b);
                simple_source(&n) // a quoted number
            }
            1 => self.make_number(d, b),
            2 => (*self.rng.index(ALL_PROPERTY_NAMES)).to_string(),
            3 => (*self.rng.index(SPECIAL_PROPERTIES)).to_string(),
            _ => self.make_id(d, b),
        }
    }

    /// A property name usable in bracket access or `defineProperty`.
    pub fn make_property_name(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "\"0\"".to_string();
        }
        self.nested(|g| {
            let producer = g.tables.property_names.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// A data or accessor property descriptor literal.
    pub fn make_property_descriptor(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "({})".to_string();
        }
        let mut s = String::from("({");

        match self.rng.next(3) {
            0 => {
                // Data descriptor
                if self.rng.next(2) != 0 {
                    let v = self.make_expr(d, b);
                    s.push_str(&format!("value: {v}, "));
                }
                if self.rng.next(2) != 0 {
                    let w = self.make_boolean(d, b);
                    s.push_str(&format!("writable: {w}, "));
                }
            }
            1 => {
                // Accessor descriptor
                if self.rng.next(2) != 0 {
                    let g = self.make_function(d, b);
                    s.push_str(&format!("get: {g}, "));
                }
                if self.rng.next(2) != 0 {
                    let set = self.make_function(d, b);
                    s.push_str(&format!("set: {set}, "));
                }
            }
            _ => {}
        }

        if self.rng.next(2) != 0 {
            let c = self.make_boolean(d, b);
            s.push_str(&format!("configurable: {c}, "));
        }
        if self.rng.next(2) != 0 {
            let e = self.make_boolean(d, b);
            s.push_str(&format!("enumerable: {e}, "));
        }

        if s.len() > 2 {
            s.truncate(s.len() - 2);
        }
        s.push_str("})");
        s
    }

    /// Pick two to five values, then repeat them into a large array
    /// literal. Early repeat runs warm up object shapes.
    pub fn make_mixed_type_array(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "/*MARR*/[]".to_string();
        }

        let q = self.rng.next(4) + 2;
        let mut picks = Vec::new();
        for _ in 0..q {
            picks.push(self.mixed_type_array_elem(d, b));
        }

        let mut elems: Vec<String> = Vec::new();
        let count = super::literals::loop_count(self);
        for _ in 0..count {
            let elem = self.rng.index(&picks).clone();
            let repeat = if count == 0 {
                self.rng.next(4) == 0
            } else {
                self.rng.next(50) == 0
            };
            let repeats = if repeat { self.rng.next(30) } else { 1 };
            for _ in 0..repeats {
                elems.push(elem.clone());
            }
        }

        format!("/*MARR*/[{}]", elems.join(", "))
    }

    fn mixed_type_array_elem(&mut self, d: i64, b: &Bindings) -> String {
        // Bounded retry: fall back to a short shapey value if the pool
        // keeps handing back long expressions.
        for _ in 0..16 {
            let s = self.make_shapey_value(d - 3, b);
            if s.len() < 60 {
                return s;
            }
        }
        "0".to_string()
    }

    /// A fixed (`/*FARR*/`) or mixed (`/*MARR*/`) array literal.
    pub fn make_array_literal(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "/*FARR*/[]".to_string();
        }

        if self.rng.next(2) == 0 {
            return self.make_mixed_type_array(d, b);
        }

        let mut elems = Vec::new();
        while self.rng.next(5) != 0 {
            elems.push(self.make_array_literal_elem(d, b));
        }
        format!("/*FARR*/[{}]", elems.join(", "))
    }

    fn make_array_literal_elem(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        match self.rng.next(5) {
            0 => format!("...{}", self.make_iterable(d - 1, b)),
            1 => String::new(), // hole
            _ => self.make_expr(d - 1, b),
        }
    }

    /// Something iteration protocols can consume (or choke on).
    pub fn make_iterable(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() || d < 1 {
            return "[]".to_string();
        }
        self.nested(|g| {
            let producer = g.tables.iterables.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// A value pool biased toward shape- and type-confusing cases.
    pub fn make_shapey_value(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "0".to_string();
        }

        if self.rng.next(10) == 0 {
            return self.nested(|g| g.make_expr(d, b));
        }

        let bound = match b.choose(self.rng) {
            Some(n) => n.to_string(),
            None => "x".to_string(),
        };
        let groups: &[&[&str]] = &[
            &[
                "0", "1", "2", "3", "0.1", ".2", "1.3", "4.", "5.0000000000000000000000", "1.2e3",
                "1e81", "1e+81", "1e-81", "1e4", "-0", "(-0)", "-1", "(-1)", "0x99", "033", "3/0",
                "-3/0", "0/0", "Math.PI", "0x2D413CCC", "0x5a827999", "0xB504F332", "-0x2D413CCC",
                "-0x5a827999", "-0xB504F332", "0x50505050", "(0x50505050 >> 1)", "0x10000000",
                "0x20000000", "0x3FFFFFFE", "0x3FFFFFFF", "0x40000000", "0x40000001",
            ],
            super::literals::BOUNDARY_NUMBERS,
            &["(1/0)", "(-1/0)", "(0/0)"],
            &[" \"\" ", " '' ", " 'A' ", " '\\0' ", " \"use strict\" "],
            &[" /x/ ", " /x/g "],
            &["true", "false"],
            &["(void 0)", "null"],
            &["[]", "[1]", "[(void 0)]", "{}", "{x:3}", "({})", "({x:3})"],
            &["NaN", "Infinity", "-Infinity", "undefined"],
            &["new Boolean(true)", "new Boolean(false)"],
            &["new Number(1)", "new Number(1.5)"],
            &["new String('')", "new String('q')"],
            &["function(){}"],
            &[
                "{}",
                "[]",
                "[1]",
                "['z']",
                "[undefined]",
                "this",
                "eval",
                "arguments",
                "arguments.caller",
                "arguments.callee",
            ],
        ];
        let group_count = groups.len() as u64 + 1;
        let which = self.rng.next(group_count) as usize;
        if which == groups.len() {
            // Actual variables (slightly dangerous)
            return bound;
        }
        (*self.rng.index(groups[which])).to_string()
    }

    /// A `var`/`let`/`const` head with 1-10 items.
    pub fn make_let_head(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let items = if d > 0 || self.rng.next(2) == 0 {
            self.rng.next(10) + 1
        } else {
            1
        };
        let mut result = String::new();
        for i in 0..items {
            if i > 0 {
                result.push_str(", ");
            }
            let item = self.make_let_head_item(d - i as i64, b);
            result.push_str(&item);
        }
        result
    }

    pub(crate) fn make_let_head_item(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let d = d - 1;
        if d < 0 || self.rng.next(2) == 0 {
            if self.rng.next(2) != 0 {
                self.unique_var_name()
            } else {
                self.make_id(d, b)
            }
        } else if self.rng.next(5) == 0 {
            let lhs = self.make_destructuring_lvalue(d, b);
            let rhs = self.make_expr(d, b);
            format!("{lhs} = {rhs}")
        } else {
            let lhs = self.make_id(d, b);
            let rhs = self.make_expr(d, b);
            format!("{lhs} = {rhs}")
        }
    }

    /// A reference to a global object: usually `this`, sometimes a fresh
    /// sandbox global (capability permitting).
    pub fn make_global(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() || !self.tables.caps.sandbox_eval {
            return "this".to_string();
        }

        if self.rng.next(10) != 0 {
            return "this".to_string();
        }

        let mut gs = match self.rng.next(4) {
            0 => "evalcx('')".to_string(),
            1 => "evalcx('lazy')".to_string(),
            _ => format!("newGlobal({})", self.make_new_global_arg(d - 1, b)),
        };

        if self.rng.next(2) != 0 {
            gs = format!("fillShellSandbox({gs})");
        }

        gs
    }

    fn make_new_global_arg(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let mut props = Vec::new();
        if self.rng.next(2) != 0 {
            let v = self.make_boolean(d - 1, b);
            props.push(format!("newCompartment: {v}"));
        }
        if self.rng.next(2) != 0 {
            let v = self.make_expr(d - 1, b);
            props.push(format!("sameCompartmentAs: {v}"));
        }
        if self.rng.next(2) != 0 {
            let v = self.make_expr(d - 1, b);
            props.push(format!("sameZoneAs: {v}"));
        }
        if self.rng.next(2) != 0 {
            let v = self.make_boolean(d - 1, b);
            props.push(format!("cloneSingletons: {v}"));
        }
        if self.rng.next(2) != 0 {
            let v = self.make_boolean(d - 1, b);
            props.push(format!("disableLazyParsing: {v}"));
        }
        if self.rng.next(2) != 0 {
            let v = self.make_boolean(d - 1, b);
            props.push(format!("invisibleToDebugger: {v}"));
        }
        format!("{{ {} }}", props.join(", "))
    }

    /// A constructor whose property-definition pattern varies per call,
    /// stressing shape/inline-cache machinery.
    pub fn make_shapey_constructor(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "function shapeyConstructor(q){ return this; }".to_string();
        }

        let arg_name = self.unique_var_name();
        let t = if self.rng.next(4) != 0 {
            "this".to_string()
        } else {
            arg_name.clone()
        };
        let prologue = self.directive_prologue();
        let mut fun_text = format!("function shapeyConstructor({arg_name}){{{prologue}");
        let bp = b.with(arg_name.clone());

        let n_prop_names = self.rng.next(6) + 1;
        let mut prop_names = Vec::new();
        for _ in 0..n_prop_names {
            prop_names.push(self.make_property_name(d, b));
        }

        let n_statements = self.rng.next(11);
        for _ in 0..n_statements {
            let prop_name = self.rng.index(&prop_names).clone();
            let tprop = format!("{t}[{prop_name}]");
            if self.rng.next(5) == 0 {
                let cond = if self.rng.next(2) != 0 {
                    arg_name.clone()
                } else {
                    self.make_expr(d, &bp)
                };
                fun_text.push_str(&format!("if ({cond}) "));
            }
            let piece = match self.rng.next(8) {
                0 => format!("delete {tprop};"),
                1 => {
                    let name = if self.rng.next(2) != 0 {
                        prop_name
                    } else {
                        self.make_property_name(d, b)
                    };
                    let desc = self.make_property_descriptor(d, &bp);
                    format!("Object.defineProperty({t}, {name}, {desc});")
                }
                2 => format!("{{ {} }} ", self.make_statement(d, &bp)),
                3 => format!("{tprop} = {};", self.make_expr(d, &bp)),
                4 => format!("{tprop} = {};", self.make_function(d, &bp)),
                5 => format!("for (var ytq{} in {t}) {{ }}", self.unique_var_name()),
                6 => format!(
                    "Object.{}({t});",
                    self.rng.index(&["preventExtensions", "seal", "freeze"])
                ),
                _ => format!("{tprop} = {};", self.make_shapey_value(d, &bp)),
            };
            fun_text.push_str(&piece);
        }
        fun_text.push_str(&format!("return {t}; }}"));
        fun_text
    }

    /// Drive a shapey constructor over an iterable, printing progress
    /// markers so a differential harness can line up outputs.
    pub fn make_shapey_constructor_loop(&mut self, d: i64, b: &Bindings) -> String {
        let a = self.make_iterable(d, b);
        let v = self.make_new_id(d, b);
        let v2 = self.unique_var_name();
        let bvv = b.with_all(&[v.clone(), v2.clone()]);
        let ctor = self.make_shapey_constructor(d - 1, b);
        let new_kw = *self.rng.index(&["new ", ""]);
        let body = self.make_statement(d - 2, &bvv);
        format!(
            "{ctor}/*tLoopC*/for (let {v} of {a}) {{ \
             try{{let {v2} = {new_kw}shapeyConstructor({v}); print('EETT'); {body}\
             }}catch(e){{print('TTEE ' + e); }} }}"
        )
    }

    /// Replace a variable with a long linked list pointing at it.
    pub(crate) fn linked_list_expr(&mut self, x: &str, n: u64) -> String {
        let mut s = x.to_string();
        for _ in 0..n {
            s = format!("{{ a: {s} }}");
        }
        s
    }
}

/// The uniform expression pool. Repeated entries reproduce the original
/// frequency distribution (binary operators dominate).
pub(crate) fn expr_makers(caps: &CapabilitySet) -> Vec<Production> {
    fn binop_exprs(g: &mut Gen<'_>, d: i64, b: &Bindings) -> String {
        let lhs = g.make_expr(d, b);
        let op = *g.rng.index(BINARY_OPS);
        let rhs = g.make_expr(d, b);
        format!("{lhs}{op}{rhs}")
    }
    fn binop_ids(g: &mut Gen<'_>, d: i64, b: &Bindings) -> String {
        let lhs = g.make_id(d, b);
        let op = *g.rng.index(BINARY_OPS);
        let rhs = g.make_id(d, b);
        format!("{lhs}{op}{rhs}")
    }
    fn ternary(g: &mut Gen<'_>, d: i64, b: &Bindings) -> String {
        let c = g.make_expr(d, b);
        let t = g.make_expr(d, b);
        let e = g.make_expr(d, b);
        format!("{c} ? {t} : {e}")
    }
    fn assignment(g: &mut Gen<'_>, d: i64, b: &Bindings) -> String {
        let lhs = g.make_lvalue(d, b);
        let rhs = g.make_expr(d, b);
        format!("{lhs} = {rhs}")
    }
    fn destructuring_assignment(g: &mut Gen<'_>, d: i64, b: &Bindings) -> String {
        let lhs = g.make_destructuring_lvalue(d, b);
        let rhs = g.make_expr(d, b);
        format!("{lhs} = {rhs}")
    }

    let mut makers: Vec<Production> = vec![
        // Increment and decrement
        |g, d, b| {
            let lv = g.make_lvalue(d, b);
            format!("{lv}{}", g.rng.index(INC_DEC_OPS))
        },
        |g, d, b| {
            let op = *g.rng.index(INC_DEC_OPS);
            format!("{op}{}", g.make_lvalue(d, b))
        },
        // Other left-unary operators
        |g, d, b| {
            let op = *g.rng.index(LEFT_UNARY_OPS);
            format!("{op}{}", g.make_expr(d, b))
        },
        // Methods
        |g, d, b| {
            let id = g.make_id(d, b);
            let m = *g.rng.index(ALL_METHOD_NAMES);
            let f = g.make_function(d, b);
            format!("/*UUV1*/({id}.{m} = {f})")
        },
        |g, d, b| {
            let id = g.make_id(d, b);
            let m1 = *g.rng.index(ALL_METHOD_NAMES);
            let m2 = *g.rng.index(ALL_METHOD_NAMES);
            format!("/*UUV2*/({id}.{m1} = {id}.{m2})")
        },
        |g, d, b| {
            let e = g.make_expr(d, b);
            let m = *g.rng.index(ALL_METHOD_NAMES);
            let args = g.make_actual_arg_list(d, b);
            format!("{e}.{m}({args})")
        },
        |g, d, b| format!("{}.valueOf(\"number\")", g.make_expr(d, b)),
    ];

    // Binary operators carry ten slots over expressions, four over ids
    for _ in 0..10 {
        makers.push(binop_exprs);
    }
    makers.push(|g, d, b| {
        let e = g.make_expr(d, b);
        let op = *g.rng.index(BINARY_OPS);
        format!("/*infloop*/{e}{op}{e}")
    });
    for _ in 0..3 {
        makers.push(binop_ids);
    }
    makers.push(|g, d, b| {
        let id = g.make_id(d, b);
        let op = *g.rng.index(BINARY_OPS);
        format!("/*infloop*/{id}{op}{id}")
    });

    makers.extend_from_slice(&[
        // Ternary operator (twice)
        ternary,
        ternary,
        // Parenthesized yields compile more often
        (|g, d, b| format!("yield {}", g.make_expr(d, b))) as Production,
        |g, d, b| format!("(yield {})", g.make_expr(d, b)),
        |g, d, b| format!("await {}", g.make_expr(d, b)),
        // Array extras; what happens when a filter function mutates the array?
        |g, d, b| {
            let a = g.make_array_literal(d, b);
            let m = *g.rng.index(&["map", "filter", "some", "sort"]);
            format!("{a}.{m}")
        },
        |g, d, b| {
            let a = g.make_array_literal(d, b);
            let m = *g.rng.index(&["map", "filter", "some", "sort"]);
            let f = g.make_function(d, b);
            let this_arg = g.make_expr(d, b);
            format!("{a}.{m}({f}, {this_arg})")
        },
        |g, d, b| {
            let a = g.make_array_literal(d, b);
            let m = *g.rng.index(&["map", "filter", "some", "sort"]);
            let f = g.make_function(d, b);
            format!("{a}.{m}({f})")
        },
        // RegExp replace with a function argument
        |g, d, b| format!("'fafafa'.replace(/a/g, {})", g.make_function(d, b)),
        // Containment (or destructuring, if this lands on an LHS)
        |g, d, b| format!("[{}]", g.make_expr(d, b)),
        |g, d, b| {
            let k = g.make_id(d, b);
            let v = g.make_expr(d, b);
            format!("({{{k}: {v}}})")
        },
        // Functions: called immediately/not
        |g, d, b| g.make_function(d, b),
        |g, d, b| format!("{}.prototype", g.make_function(d, b)),
        |g, d, b| {
            let f = g.make_function(d, b);
            let args = g.make_actual_arg_list(d, b);
            format!("({f})({args})")
        },
        // Try to call things that may or may not be functions
        |g, d, b| {
            let e = g.make_expr(d, b);
            let args = g.make_actual_arg_list(d, b);
            format!("{e}({args})")
        },
        |g, d, b| {
            let e = g.make_expr(d, b);
            let args = g.make_actual_arg_list(d, b);
            format!("({e})({args})")
        },
        |g, d, b| {
            let f = g.make_function(d, b);
            let args = g.make_actual_arg_list(d, b);
            format!("{f}({args})")
        },
        // function.call
        |g, d, b| {
            let f = g.make_function(d, b);
            let this_arg = g.make_expr(d, b);
            let args = g.make_actual_arg_list(d, b);
            format!("({f}).call({this_arg}, {args})")
        },
        // Binary "new", with and without clarifying parentheses
        |g, d, b| {
            let e = g.make_expr(d, b);
            let args = g.make_actual_arg_list(d, b);
            format!("new {e}({args})")
        },
        |g, d, b| {
            let e = g.make_expr(d, b);
            let args = g.make_actual_arg_list(d, b);
            format!("new ({e})({args})")
        },
        |g, d, b| {
            let f = g.make_function(d, b);
            let args = g.make_actual_arg_list(d, b);
            format!("new {f}({args})")
        },
        |g, d, b| {
            let f = g.make_function(d, b);
            let args = g.make_actual_arg_list(d, b);
            format!("new ({f})({args})")
        },
        // A statement where an expression should go; frequently a syntax error
        |g, d, b| strip_semicolon(&g.make_little_statement(d, b)),
        |_, _, _| String::new(),
        // Comments and whitespace; perhaps trigger semicolon insertion
        |g, d, b| format!(" /* Comment */{}", g.make_expr(d, b)),
        |g, d, b| format!("\n{}", g.make_expr(d, b)),
        |g, d, b| format!("{}\n", g.make_expr(d, b)),
        // LValue as an expression
        |g, d, b| g.make_lvalue(d, b),
        // Assignment (can be destructuring)
        assignment,
        assignment,
        |g, d, b| {
            let lhs = g.make_lvalue(d, b);
            let rhs = g.make_expr(d, b);
            format!("({lhs} = {rhs})")
        },
        |g, d, b| {
            let lhs = g.make_lvalue(d, b);
            let rhs = g.make_expr(d, b);
            format!("({lhs}) = {rhs}")
        },
        destructuring_assignment,
        destructuring_assignment,
        |g, d, b| {
            let lhs = g.make_destructuring_lvalue(d, b);
            let rhs = g.make_expr(d, b);
            format!("({lhs} = {rhs})")
        },
        |g, d, b| {
            let lhs = g.make_destructuring_lvalue(d, b);
            let rhs = g.make_expr(d, b);
            format!("({lhs}) = {rhs}")
        },
        // Destructuring with lots of group assignment
        |g, d, b| {
            let lhs = g.make_destructuring_lvalue(d, b);
            let rhs = g.make_destructuring_lvalue(d, b);
            format!("{lhs} = {rhs}")
        },
        // Modifying assignment with coercing operators
        |g, d, b| {
            let lhs = g.make_lvalue(d, b);
            let op = *g.rng.index(&["|=", "%=", "+=", "-="]);
            let rhs = g.make_expr(d, b);
            format!("{lhs}{op}{rhs}")
        },
        // ES5 getter/setter syntax, imperative
        |g, d, b| {
            let id = g.make_id(d, b);
            let name = g.make_property_name(d, b);
            let desc = g.make_property_descriptor(d, b);
            format!("Object.defineProperty({id}, {name}, {desc})")
        },
        // Prototype probes
        |g, d, b| format!("Object.getPrototypeOf({})", g.make_id(d, b)),
        |g, d, b| {
            let a = g.make_id(d, b);
            let p = g.make_id(d, b);
            format!("Object.setPrototypeOf({a}, {p})")
        },
        |g, d, b| format!("Object.values({})", g.make_id(d, b)),
        // Old getter/setter syntax, imperative
        |g, d, b| {
            let e = g.make_expr(d, b);
            let name = g.make_id(d, b);
            let f = g.make_function(d, b);
            format!("{e}.__defineGetter__({}, {f})", simple_source(&name))
        },
        |g, d, b| {
            let e = g.make_expr(d, b);
            let name = g.make_id(d, b);
            let f = g.make_function(d, b);
            format!("{e}.__defineSetter__({}, {f})", simple_source(&name))
        },
        |g, d, b| {
            let name = g.make_id(d, b);
            let f = g.make_function(d, b);
            format!("this.__defineGetter__({}, {f})", simple_source(&name))
        },
        |g, d, b| {
            let name = g.make_id(d, b);
            let f = g.make_function(d, b);
            format!("this.__defineSetter__({}, {f})", simple_source(&name))
        },
        // Object literals
        |g, d, b| format!("({{{} }})", g.make_obj_literal_part(d, b)),
        |g, d, b| {
            let p1 = g.make_obj_literal_part(d, b);
            let p2 = g.make_obj_literal_part(d, b);
            format!("({{{p1}, {p2} }})")
        },
        // Exercise the is-not-a-function error path
        |g, d, b| format!("(p={{}}, (p.z = {})())", g.make_expr(d, b)),
        // ".keyword" decompilation and throwing-into-generator
        |g, d, b| {
            let e = g.make_expr(d, b);
            let arg = g.make_expr(d, b);
            format!("{e}.throw({arg})")
        },
        |g, d, b| {
            let e = g.make_expr(d, b);
            let arg = g.make_expr(d, b);
            format!("{e}.yoyo({arg})")
        },
        // eval in various contexts, including the "eval(..., obj)" form
        |g, d, b| {
            let e = g.make_expr(d, b);
            let script = g.make_script_for_eval(d, b);
            format!("{e}.eval({})", simple_source(&script))
        },
        |g, d, b| {
            let script = g.make_script_for_eval(d, b);
            format!("eval({})", simple_source(&script))
        },
        |g, d, b| {
            let script = g.make_script_for_eval(d, b);
            let e = g.make_expr(d, b);
            format!("eval({}, {e})", simple_source(&script))
        },
        // uneval needs more testing than it gets accidentally
        |g, d, b| format!("(uneval({}))", g.make_expr(d, b)),
        // Constructors, called with and without "new"
        |g, d, b| {
            let c = *g.rng.index(CONSTRUCTORS);
            format!("new {c}({})", g.make_actual_arg_list(d, b))
        },
        |g, d, b| {
            let c = *g.rng.index(CONSTRUCTORS);
            format!("{c}({})", g.make_actual_arg_list(d, b))
        },
        // Unary Math functions
        |g, d, b| {
            let f = *g.rng.index(super::mathy::UNARY_MATH_FUNCTIONS);
            format!("Math.{f}({})", g.make_expr(d, b))
        },
        |g, d, b| {
            let f = *g.rng.index(super::mathy::UNARY_MATH_FUNCTIONS);
            format!("Math.{f}({})", g.make_number(d, b))
        },
        // Binary Math functions
        |g, d, b| {
            let f = *g.rng.index(super::mathy::BINARY_MATH_FUNCTIONS);
            let x = g.make_expr(d, b);
            let y = g.make_expr(d, b);
            format!("Math.{f}({x}, {y})")
        },
        |g, d, b| {
            let f = *g.rng.index(super::mathy::BINARY_MATH_FUNCTIONS);
            let x = g.make_expr(d, b);
            let y = g.make_number(d, b);
            format!("Math.{f}({x}, {y})")
        },
        |g, d, b| {
            let f = *g.rng.index(super::mathy::BINARY_MATH_FUNCTIONS);
            let x = g.make_number(d, b);
            let y = g.make_expr(d, b);
            format!("Math.{f}({x}, {y})")
        },
        |g, d, b| {
            let f = *g.rng.index(super::mathy::BINARY_MATH_FUNCTIONS);
            let x = g.make_number(d, b);
            let y = g.make_number(d, b);
            format!("Math.{f}({x}, {y})")
        },
        // Scripted proxy creation
        |g, d, b| {
            let id = g.make_id(d, b);
            let target = g.make_expr(d, b);
            let handler = g.make_proxy_handler(d, b);
            format!("{id} = new Proxy({target}, {handler})")
        },
        |g, d, b| {
            let obj = g.make_id(d, b);
            let prop = g.make_id(d, b);
            format!("delete {obj}.{prop}")
        },
        // Shell strictness toggles
        |_, _, _| "(void options('strict_mode'))".to_string(),
        |_, _, _| "(void options('strict'))".to_string(),
        // Shell introspection with no interesting return value
        |g, d, b| format!("(void shapeOf({}))", g.make_expr(d, b)),
        |g, d, b| format!("intern({})", g.make_expr(d, b)),
        |_, _, _| "allocationMarker()".to_string(),
        |_, _, _| "timeout(1800)".to_string(),
        |_, _, _| "(makeFinalizeObserver('tenured'))".to_string(),
        |_, _, _| "(makeFinalizeObserver('nursery'))".to_string(),
        |g, d, b| format!("dumpScopeChain({})", g.make_function(d, b)),
        // Sub-grammars reachable as plain alternatives
        |g, d, b| g.make_regex_use_expr(d, b),
        |g, d, b| g.make_shapey_value(d, b),
        |g, d, b| g.make_iterable(d, b),
        |g, d, b| {
            let bonus = g.rng.next(3) as i64;
            g.make_math_expr(d + bonus, b, 0)
        },
    ]);

    if caps.mark_observers {
        makers.extend_from_slice(&[
            (|g, d, b| format!("addMarkObservers({})", g.make_array_literal(d, b))) as Production,
            |_, _, _| "clearMarkObservers()".to_string(),
            |_, _, _| "getMarks()".to_string(),
        ]);
    }

    if caps.sandbox_eval {
        makers.extend_from_slice(&[
            (|g, d, b| g.make_global(d, b)) as Production,
            |g, d, b| {
                let script = g.make_script_for_eval(d, b);
                let e = g.make_expr(d, b);
                format!("evalcx({}, {e})", simple_source(&script))
            },
            |g, d, b| {
                let script = g.make_script_for_eval(d, b);
                let global = g.make_global(d, b);
                format!("evalcx({}, {global})", simple_source(&script))
            },
        ]);
    }

    if caps.worker_eval {
        makers.extend_from_slice(&[
            (|g, d, b| g.make_global(d, b)) as Production,
            |g, d, b| {
                let script = g.make_script_for_eval(d, b);
                format!("evalInWorker({})", simple_source(&script))
            },
            |g, d, b| {
                let script = g.make_script_for_eval(d, b);
                format!("evalInWorker({})", simple_source(&script))
            },
        ]);
    }

    if caps.wrapper_objects {
        makers.extend_from_slice(&[
            (|g, d, b| format!("new XPCNativeWrapper({})", g.make_expr(d, b))) as Production,
            |g, d, b| format!("new XPCSafeJSObjectWrapper({})", g.make_expr(d, b)),
        ]);
    }

    if caps.gecko_sandbox {
        makers.extend_from_slice(&[
            (|g, _, _| {
                let n = g.rng.next(4);
                format!("newGeckoSandbox({n})")
            }) as Production,
            |g, _, _| {
                let n = g.rng.next(4);
                format!("s{n} = newGeckoSandbox({n})")
            },
            |g, d, b| {
                let n = g.rng.next(4);
                let stmt = g.make_statement(d, b);
                format!("evalInSandbox({}, newGeckoSandbox({n}))", simple_source(&stmt))
            },
            |g, d, b| {
                let n = g.rng.next(4);
                let stmt = g.make_statement(d, b);
                format!("evalInSandbox({}, s{n})", simple_source(&stmt))
            },
            |g, d, b| {
                let stmt = g.make_statement(d, b);
                let e = g.make_expr(d, b);
                format!("evalInSandbox({}, {e})", simple_source(&stmt))
            },
        ]);
    }

    makers
}

/// Lvalue pool, including the deliberately-bogus expression case.
pub(crate) fn lvalue_makers() -> Vec<Production> {
    vec![
        // Simple variable names :)
        |g, d, b| g.make_id(d, b),
        // Parenthesized lvalues
        |g, d, b| format!("({})", g.make_lvalue(d, b)),
        // Destructuring
        |g, d, b| g.make_destructuring_lvalue(d, b),
        |g, d, b| format!("({})", g.make_destructuring_lvalue(d, b)),
        // Certain function calls can act as lvalues in some engines
        |g, d, b| {
            let f = g.make_id(d, b);
            let arg = g.make_expr(d, b);
            format!("{f}({arg})")
        },
        |g, d, b| {
            let f = g.make_expr(d, b);
            let arg = g.make_expr(d, b);
            format!("({f})({arg})")
        },
        // Builtins
        |g, _, _| (*g.rng.index(BUILTIN_PROPERTIES)).to_string(),
        |g, _, _| (*g.rng.index(BUILTIN_OBJECT_NAMES)).to_string(),
        // Arguments object, which can alias named parameters
        |_, _, _| "arguments".to_string(),
        |g, d, b| format!("arguments[{}]", g.make_property_name(d, b)),
        // read-only arguments object
        |g, _, _| format!("{}.arguments", g.make_fun_on_call_chain()),
        // Property access / index into array
        |g, d, b| {
            let e = g.make_expr(d, b);
            let id = g.make_id(d, b);
            format!("{e}.{id}")
        },
        |g, d, b| format!("{}.__proto__", g.make_expr(d, b)),
        |g, d, b| {
            let e = g.make_expr(d, b);
            let name = g.make_property_name(d, b);
            format!("{e}[{name}]")
        },
        // Intentionally bogus, but not quite garbage
        |g, d, b| g.make_expr(d, b),
    ]
}

pub(crate) fn destructuring_lvalue_makers() -> Vec<Production> {
    vec![
        // Arrays, with holes
        |g, d, b| {
            let len = g.reroll_depth(d).max(0) as u64;
            if len == 0 {
                return "[]".to_string();
            }
            let mut parts = Vec::new();
            for _ in 0..len {
                parts.push(g.maybe_make_destructuring_lvalue(d, b));
            }
            format!("[{}]", parts.join(", "))
        },
        // Objects, with shorthand
        |g, d, b| {
            let len = g.reroll_depth(d).max(0) as u64;
            if len == 0 {
                return "{}".to_string();
            }
            let mut parts = Vec::new();
            for _ in 0..len {
                let id = g.make_id(d, b);
                if g.rng.next(3) != 0 {
                    let inner = g.make_destructuring_lvalue(d, b);
                    parts.push(format!("{id}: {inner}"));
                } else {
                    // shorthand, treated as "id: id"
                    parts.push(id);
                }
            }
            format!("{{{}}}", parts.join(", "))
        },
    ]
}

pub(crate) fn term_makers() -> Vec<Production> {
    vec![
        |g, d, b| g.make_id(d, b),
        |g, _, _| (*g.rng.index(SIMPLE_TERMS)).to_string(),
        |g, d, b| g.make_number(d, b),
        |g, _, _| {
            (*g.rng
                .index(&["true", "false", "undefined", "null", "this"]))
            .to_string()
        },
        |g, _, _| (*g.rng.index(&[" \"\" ", " '' "])).to_string(),
        |g, _, _| g.random_unit_string_literal(),
        |g, _, _| (*g.rng.index(&[" /x/ ", " /x/g "])).to_string(),
        |g, d, b| g.make_regex(d, b),
    ]
}

pub(crate) fn function_makers(caps: &CapabilitySet) -> Vec<Production> {
    let mut makers: Vec<Production> = vec![
        |g, _, _| g.make_fun_on_call_chain(),
        |g, d, b| g.make_math_function(d, b, 0),
        |g, d, b| g.make_mathy_fun_ref(d, b),
        // Functions and expression closures, single arg and arg lists
        |g, d, b| {
            let v = g.make_new_id(d, b);
            let prefix = g.function_prefix();
            let name = g.maybe_name(d, b);
            let body = g.make_function_body(d, &b.with(v.clone()));
            format!("{prefix} {name}({v}){body}")
        },
        |g, d, b| {
            let prefix = g.function_prefix();
            let name = g.maybe_name(d, b);
            let args = g.make_formal_arg_list(d, b);
            let body = g.make_function_body(d, b);
            format!("{prefix} {name}({args}){body}")
        },
        // Arrow functions with one argument (no parens needed)
        |g, d, b| {
            let v = g.make_new_id(d, b);
            let body = g.make_function_body(d, &b.with(v.clone()));
            format!("{v} => {body}")
        },
        // Arrow functions with multiple arguments
        |g, d, b| {
            let args = g.make_formal_arg_list(d, b);
            let body = g.make_function_body(d, b);
            format!("({args}) => {body}")
        },
        // The identity function
        |g, _, _| {
            let prefix = g.function_prefix();
            let prologue = g.directive_prologue();
            format!("{prefix}(q) {{ {prologue}return q; }}")
        },
        |_, _, _| "q => q".to_string(),
        // A function that does something
        |g, d, b| {
            let prefix = g.function_prefix();
            let prologue = g.directive_prologue();
            let stmt = g.make_statement(d, &b.with("y"));
            format!("{prefix}(y) {{ {prologue}{stmt} }}")
        },
        // A function that computes something
        |g, d, b| {
            let prefix = g.function_prefix();
            let prologue = g.directive_prologue();
            let e = g.make_expr(d, &b.with("y"));
            format!("{prefix}(y) {{ {prologue}return {e} }}")
        },
        // Generators that do something
        |g, d, b| {
            let prologue = g.directive_prologue();
            let stmt = g.make_statement(d, &b.with("y"));
            format!("function(y) {{ {prologue}yield y; {stmt}; yield y; }}")
        },
        |g, d, b| {
            let prologue = g.directive_prologue();
            let stmt = g.make_statement(d, &b.with("y"));
            format!("function*(y) {{ {prologue}yield y; {stmt}; yield y; }}")
        },
        // Async functions and async generators that do something
        |g, d, b| {
            let prologue = g.directive_prologue();
            let stmt = g.make_statement(d, &b.with("y"));
            format!("async function (y) {{ {prologue}await y; {stmt}; await y; }}")
        },
        |g, d, b| {
            let prologue = g.directive_prologue();
            let stmt = g.make_statement(d, &b.with("y"));
            format!("async function* (y) {{ {prologue}await y; {stmt}; await y; }}")
        },
        |g, d, b| {
            let prologue = g.directive_prologue();
            let stmt = g.make_statement(d, &b.with("y"));
            format!("async function* (y) {{ {prologue}yield y; await y; {stmt}; yield y; await y; }}")
        },
        // A simple wrapping pattern
        |g, d, b| {
            let prefix = g.function_prefix();
            let prologue = g.directive_prologue();
            let stmt = g.make_statement(d, b);
            let f = g.make_function(d, b);
            format!("/*wrap1*/({prefix}(){{ {prologue}{stmt}return {f}}})()")
        },
        // Wrapping with upvar: escaping, may or may not be modified
        |g, d, b| {
            let v1 = g.unique_var_name();
            let v2 = g.unique_var_name();
            let prefix = g.function_prefix();
            let prologue = g.directive_prologue();
            let e = g.make_expr(d, b);
            let f = g.make_function(d, &b.with(v1.clone()));
            format!(
                "/*wrap2*/({prefix}(){{ {prologue}var {v1} = {e}; var {v2} = {f}; return {v2};}})()"
            )
        },
        // Wrapping with upvar: non-escaping
        |g, d, b| {
            let v1 = g.unique_var_name();
            let prefix = g.function_prefix();
            let prologue = g.directive_prologue();
            let e = g.make_expr(d, b);
            let f = g.make_function(d, &b.with(v1.clone()));
            format!("/*wrap3*/({prefix}(){{ {prologue}var {v1} = {e}; ({f})(); }})")
        },
        // Apply, call, bind
        |g, d, b| format!("({}).apply", g.make_function(d - 1, b)),
        |g, d, b| format!("({}).call", g.make_function(d - 1, b)),
        |g, d, b| format!("({}).bind", g.make_function(d - 1, b)),
        |g, d, b| {
            let f = g.make_function(d - 1, b);
            let args = g.make_actual_arg_list(d, b);
            format!("({f}).bind({args})")
        },
        // Methods with known names
        |g, d, b| {
            let e = g.make_expr(d, b);
            format!("{e}.{}", g.rng.index(ALL_METHOD_NAMES))
        },
        // Scripted proxy around a function
        |g, d, b| {
            let f = g.make_function(d, b);
            let handler = g.make_proxy_handler(d, b);
            format!("(new Proxy({f}, {handler}))")
        },
        // Special functions with interesting call-site behavior
        |_, _, _| "eval".to_string(),
        |_, _, _| "new Function".to_string(),
        |g, d, b| {
            let stmt = g.make_statement(d, b);
            format!("(new Function({}))", simple_source(&stmt))
        },
        |_, _, _| "Function".to_string(),
        |_, _, _| "decodeURI".to_string(),
        |_, _, _| "decodeURIComponent".to_string(),
        |_, _, _| "encodeURI".to_string(),
        |_, _, _| "encodeURIComponent".to_string(),
        |_, _, _| "createIsHTMLDDA".to_string(),
        |g, d, b| g.make_proxy_handler_factory(d, b).0,
        |g, d, b| g.make_shapey_constructor(d, b),
        |g, _, _| (*g.rng.index(TYPED_ARRAY_CONSTRUCTORS)).to_string(),
        |g, _, _| (*g.rng.index(CONSTRUCTORS)).to_string(),
    ];

    if caps.buffer_detach {
        makers.push(|_, _, _| "neuter".to_string());
    }
    if caps.off_thread_compile {
        makers.push(|_, _, _| "offThreadCompileScript".to_string());
        makers.push(|_, _, _| "runOffThreadScript".to_string());
    }
    if caps.wrapper_objects {
        makers.push(|_, _, _| "XPCNativeWrapper".to_string());
        makers.push(|_, _, _| "XPCSafeJSObjectWrapper".to_string());
        makers.push(|_, _, _| "nukeAllCCWs".to_string());
        makers.push(|_, _, _| "FakeDOMObject".to_string());
    }
    if caps.use_oom_test() {
        makers.push(|_, _, _| "oomTest".to_string());
    }

    makers
}

pub(crate) fn iterable_makers() -> Vec<(u32, Production)> {
    vec![
        (1, |g, d, b| format!("new Array({})", g.make_number(d, b))),
        (8, |g, d, b| g.make_array_literal(d, b)),
        // A generator that yields once
        (1, |g, d, b| {
            let prologue = g.directive_prologue();
            let e = g.make_expr(d - 1, b);
            format!("(function() {{ {prologue}yield {e}; }} )()")
        }),
        (1, |g, d, b| {
            let prologue = g.directive_prologue();
            let e = g.make_expr(d - 1, b);
            format!("(function*() {{ {prologue}yield {e}; }} )()")
        }),
        // A pass-through generator
        (1, |g, d, b| {
            let prologue = g.directive_prologue();
            let inner = g.make_iterable(d - 1, b);
            format!("/*PTHR*/(function() {{ {prologue}for (var i of {inner}) {{ yield i; }} }} )()")
        }),
        (1, |g, d, b| {
            let prologue = g.directive_prologue();
            let inner = g.make_iterable(d - 1, b);
            format!("/*PTHR*/(function*() {{ {prologue}for (var i of {inner}) {{ yield i; }} }} )()")
        }),
        // An async function that awaits once
        (1, |g, d, b| {
            let prologue = g.directive_prologue();
            let e = g.make_expr(d - 1, b);
            format!("(async function() {{ {prologue}await {e}; }} )()")
        }),
        // Pass-through async generators
        (1, |g, d, b| {
            let prologue = g.directive_prologue();
            let inner = g.make_iterable(d - 1, b);
            format!(
                "/*PTHR*/(async function*() {{ {prologue}for (var i of {inner}) {{ yield i; }} }} )()"
            )
        }),
        (1, |g, d, b| {
            let prologue = g.directive_prologue();
            let inner = g.make_iterable(d - 1, b);
            format!(
                "/*PTHR*/(async function*() {{ {prologue}for await (var i of {inner}) {{ yield i; }} }} )()"
            )
        }),
        (1, |g, d, b| g.make_function(d, b)),
        (1, |g, d, b| g.make_expr(d, b)),
    ]
}

pub(crate) fn property_name_makers() -> Vec<(u32, Production)> {
    vec![
        (1, |g, d, b| g.make_expr(d - 1, b)),
        (1, |g, _, _| {
            let neg = g.maybe_neg();
            format!("{neg}{}", g.rng.next(20))
        }),
        (1, |g, _, _| {
            let neg = g.maybe_neg();
            format!("\"{neg}{}\"", g.rng.next(20))
        }),
        (1, |g, _, _| {
            let neg = g.maybe_neg();
            format!("new String(\"{neg}{}\")", g.rng.next(20))
        }),
        (5, |g, _, _| {
            simple_source(*g.rng.index(SPECIAL_PROPERTIES))
        }),
        (1, |g, d, b| {
            let id = g.make_id(d - 1, b);
            simple_source(&id)
        }),
        (5, |g, _, _| simple_source(*g.rng.index(ALL_METHOD_NAMES))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::build_grammar;
    use crate::random::SeededRng;

    fn gen_with<'a>(
        rng: &'a mut SeededRng,
        tables: &'a crate::grammar::GrammarTables,
    ) -> Gen<'a> {
        Gen::new(rng, tables)
    }

    #[test]
    fn test_make_expr_total_at_zero_and_negative_depth() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(10);
        let mut g = gen_with(&mut rng, &tables);
        let b = Bindings::new();
        for d in [-3, 0, 1, 2] {
            for _ in 0..100 {
                let _ = g.make_expr(d, &b);
            }
        }
    }

    #[test]
    fn test_make_lvalue_bottoms_out_to_id() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(11);
        let mut g = gen_with(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..100 {
            let _ = g.make_lvalue(0, &b);
        }
    }

    #[test]
    fn test_destructuring_lvalue_shapes() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(12);
        let mut g = gen_with(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        let mut saw_bracket = false;
        for _ in 0..500 {
            let s = g.make_destructuring_lvalue(6, &b);
            if s.starts_with('[') || s.starts_with('{') {
                saw_bracket = true;
            }
        }
        assert!(saw_bracket, "patterns should appear at depth 6");
    }

    #[test]
    fn test_mixed_type_array_is_marked() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(13);
        let mut g = gen_with(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        let s = g.make_mixed_type_array(4, &b);
        assert!(s.starts_with("/*MARR*/["), "got {s}");
        assert!(s.ends_with(']'));
    }

    #[test]
    fn test_property_descriptor_brackets() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(14);
        let mut g = gen_with(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..100 {
            let s = g.make_property_descriptor(3, &b);
            assert!(s.starts_with("({"), "got {s}");
            assert!(s.ends_with("})"), "got {s}");
        }
    }

    #[test]
    fn test_formal_arg_list_occasionally_has_rest() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(15);
        let mut g = gen_with(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        let mut saw_rest = false;
        for _ in 0..300 {
            if g.make_formal_arg_list(3, &b).contains("...") {
                saw_rest = true;
                break;
            }
        }
        assert!(saw_rest);
    }

    #[test]
    fn test_shapey_constructor_returns_receiver() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(16);
        let mut g = gen_with(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..30 {
            let s = g.make_shapey_constructor(3, &b);
            assert!(s.contains("function shapeyConstructor("), "got {s}");
            assert!(s.contains("return "), "got {s}");
        }
    }

    #[test]
    fn test_capability_gated_function_names_absent_by_default() {
        let narrow = function_makers(&CapabilitySet::none());
        let wide = function_makers(&CapabilitySet::spidermonkey_shell());
        assert!(wide.len() > narrow.len());
    }

    #[test]
    fn test_global_is_this_without_sandbox() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(17);
        let mut g = gen_with(&mut rng, &tables);
        let b = Bindings::from_names(&["x"]);
        // 9-in-10 draws return plain "this" regardless of capability
        let mut this_count = 0;
        for _ in 0..100 {
            if g.make_global(3, &b) == "this" {
                this_count += 1;
            }
        }
        assert!(this_count > 60);
    }

    #[test]
    fn test_linked_list_expr_nesting() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(18);
        let mut g = gen_with(&mut rng, &tables);
        assert_eq!(g.linked_list_expr("x", 0), "x");
        assert_eq!(g.linked_list_expr("x", 2), "{ a: { a: x } }");
    }
}
