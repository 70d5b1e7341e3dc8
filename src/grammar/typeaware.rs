//! Type-aware object-model generation
//!
//! Maintains a small fixed pool of variable slots per object kind
//! (`a0`-`a2` for arrays, `m0`-`m2` for maps, and so on) and emits
//! statements that construct, mutate, or combine instances of those
//! kinds. Builder statements always target one of the pooled slots by
//! kind-prefixed name, never a fresh name: programs that reuse the same
//! few objects over and over are far better at finding shape and
//! inline-cache bugs than programs that allocate fresh ones.
//!
//! Slots may be used before any statement assigned them; the resulting
//! undefined-reference throws are part of the intended distribution.

use super::{Bindings, Gen, Production};
use crate::capabilities::CapabilitySet;

/// Number of variable slots per object kind.
pub const SLOTS_PER_KIND: u64 = 3;

/// Informal object classification used to pick slot names and
/// kind-appropriate mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKindTag {
    /// Plain arrays (`a` slots)
    Array,
    /// Plain objects (`o` slots)
    Object,
    /// Strings (`s` slots)
    String,
    /// Maps and weak maps (`m` slots)
    Map,
    /// Sets and weak sets (`e` slots)
    Set,
    /// Array buffers (`b` slots)
    Buffer,
    /// Typed-array views (`t` slots)
    TypedView,
    /// Proxy handler objects (`h` slots)
    ProxyHandler,
    /// Global or sandbox objects (`g` slots)
    Global,
    /// Functions (`f` slots)
    Function,
    /// Primitives (`p` slots)
    Primitive,
    /// Iterators (`i` slots)
    Iterator,
}

impl ObjectKindTag {
    /// All kinds, for iteration.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[
            Self::Array,
            Self::Object,
            Self::String,
            Self::Map,
            Self::Set,
            Self::Buffer,
            Self::TypedView,
            Self::ProxyHandler,
            Self::Global,
            Self::Function,
            Self::Primitive,
            Self::Iterator,
        ]
    }

    /// Slot-name prefix for this kind.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Array => "a",
            Self::Object => "o",
            Self::String => "s",
            Self::Map => "m",
            Self::Set => "e",
            Self::Buffer => "b",
            Self::TypedView => "t",
            Self::ProxyHandler => "h",
            Self::Global => "g",
            Self::Function => "f",
            Self::Primitive => "p",
            Self::Iterator => "i",
        }
    }
}

impl Gen<'_> {
    /// A slot name of the given kind, e.g. `a2` or `m0`.
    pub fn slot(&mut self, kind: ObjectKindTag) -> String {
        format!("{}{}", kind.prefix(), self.rng.next(SLOTS_PER_KIND))
    }

    /// `ArrayBuffer`, or `SharedArrayBuffer` when the host has it.
    pub(crate) fn array_buffer_type(&mut self) -> &'static str {
        if self.tables.caps.shared_array_buffer && self.rng.next(2) != 0 {
            "SharedArrayBuffer"
        } else {
            "ArrayBuffer"
        }
    }

    /// One statement over the slot pools.
    pub fn make_builder_statement(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "o0 = {};".to_string();
        }
        self.nested(|g| {
            let producer = g.tables.builder_statements.pick(g.rng);
            producer(g, d, b)
        })
    }

    /// A callback that mutates the slot pools from the inside, for handing
    /// to sort/map/proxy traps and similar re-entrant positions.
    pub fn make_evil_callback(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        if self.over_ceiling() {
            return "(function() { return o0; })".to_string();
        }
        match self.rng.next(5) {
            0 => {
                let stmt = self.make_builder_statement(d - 1, b);
                let kind = *self.rng.index(ObjectKindTag::all());
                let slot = self.slot(kind);
                format!("(function() {{ {stmt} return {slot}; }})")
            }
            1 => {
                let stmt = self.make_builder_statement(d - 1, b);
                let kind = *self.rng.index(ObjectKindTag::all());
                let slot = self.slot(kind);
                format!("(function() {{ {stmt} throw {slot}; }})")
            }
            2 => {
                let s1 = self.make_builder_statement(d - 1, b);
                let s2 = self.make_builder_statement(d - 1, b);
                format!("(function(j) {{ if (j) {{ {s1} }} else {{ {s2} }} }})")
            }
            3 => {
                let stmt = self.make_builder_statement(d - 1, b);
                format!("(function(j) {{ {stmt} }})")
            }
            _ => self.make_function(d - 1, b),
        }
    }
}

/// Builder statements: construction, mutation, and cross-kind
/// combination, always over the pooled slots.
#[allow(clippy::too_many_lines)]
pub(crate) fn builder_statement_makers(caps: &CapabilitySet) -> Vec<(u32, Production)> {
    use ObjectKindTag as K;

    let mut makers: Vec<(u32, Production)> = vec![
        // Arrays
        (2, |g, _, _| format!("{} = [];", g.slot(K::Array))),
        (1, |g, d, b| {
            let a = g.slot(K::Array);
            let v = g.make_expr(d - 2, b);
            format!("{a}.push({v});")
        }),
        (1, |g, _, _| format!("{}.pop();", g.slot(K::Array))),
        (1, |g, _, _| format!("{}.shift();", g.slot(K::Array))),
        (1, |g, _, _| format!("{}.reverse();", g.slot(K::Array))),
        (1, |g, d, b| {
            let a = g.slot(K::Array);
            let cb = g.make_evil_callback(d - 2, b);
            format!("{a}.sort({cb});")
        }),
        (1, |g, d, b| {
            let a = g.slot(K::Array);
            let start = g.rng.next(10);
            let len = g.rng.next(10);
            let v = g.make_expr(d - 2, b);
            format!("{a}.splice({start}, {len}, {v});")
        }),
        (1, |g, _, _| {
            let dst = g.slot(K::Array);
            let src = g.slot(K::Array);
            let start = g.rng.next(8) as i64 - 4;
            let end = g.rng.next(8) as i64 - 4;
            format!("{dst} = Array.prototype.slice.call({src}, {start}, {end});")
        }),
        (1, |g, d, b| {
            let a = g.slot(K::Array);
            let idx = g.rng.next(20);
            let v = g.make_expr(d - 2, b);
            format!("{a}[{idx}] = {v};")
        }),
        (1, |g, _, _| {
            let dst = g.slot(K::Array);
            let a = g.slot(K::Array);
            let b2 = g.slot(K::Array);
            format!("{dst} = {a}.concat({b2});")
        }),
        // Objects
        (2, |g, _, _| format!("{} = {{}};", g.slot(K::Object))),
        (1, |g, _, _| {
            let o = g.slot(K::Object);
            let proto = g.slot(K::Object);
            format!("{o} = Object.create({proto});")
        }),
        (1, |g, d, b| {
            let o = g.slot(K::Object);
            let name = g.make_property_name(d - 2, b);
            let v = g.make_expr(d - 2, b);
            format!("{o}[{name}] = {v};")
        }),
        (1, |g, _, _| {
            let o = g.slot(K::Object);
            let op = *g.rng.index(&["freeze", "seal", "preventExtensions"]);
            format!("Object.{op}({o});")
        }),
        (1, |g, d, b| {
            let o = g.slot(K::Object);
            let name = g.make_property_name(d - 2, b);
            let desc = g.make_property_descriptor(d - 2, b);
            format!("Object.defineProperty({o}, {name}, {desc});")
        }),
        (1, |g, d, b| {
            let o = g.slot(K::Object);
            let name = g.make_property_name(d - 2, b);
            format!("delete {o}[{name}];")
        }),
        // Strings
        (1, |g, _, _| format!("{} = '';", g.slot(K::String))),
        (1, |g, _, _| {
            let s = g.slot(K::String);
            let n = g.rng.next(6);
            format!("{s} += 'x'.repeat({n});")
        }),
        (1, |g, _, _| {
            let dst = g.slot(K::String);
            let src = g.slot(K::String);
            format!("{dst} = {src} + {src};")
        }),
        (1, |g, _, _| {
            let dst = g.slot(K::String);
            let src = g.slot(K::String);
            let n = g.rng.next(10);
            format!("{dst} = {src}.charAt({n});")
        }),
        (1, |g, _, _| {
            let dst = g.slot(K::String);
            let a = g.slot(K::Array);
            format!("{dst} = {a}.join('');")
        }),
        // Maps: object keys come from the other pools
        (1, |g, _, _| {
            let m = g.slot(K::Map);
            let ctor = *g.rng.index(&["Map", "WeakMap"]);
            format!("{m} = new {ctor};")
        }),
        (1, |g, d, b| {
            let m = g.slot(K::Map);
            let key_kind = *g.rng.index(&[K::Object, K::Array, K::Function, K::Primitive]);
            let key = g.slot(key_kind);
            let v = g.make_expr(d - 2, b);
            format!("{m}.set({key}, {v});")
        }),
        (1, |g, _, _| {
            let m = g.slot(K::Map);
            let key_kind = *g.rng.index(&[K::Object, K::Array, K::Primitive]);
            let key = g.slot(key_kind);
            format!("{m}.get({key});")
        }),
        (1, |g, _, _| {
            let m = g.slot(K::Map);
            let key_kind = *g.rng.index(&[K::Object, K::Array, K::Primitive]);
            let key = g.slot(key_kind);
            format!("{m}.has({key});")
        }),
        (1, |g, _, _| {
            let m = g.slot(K::Map);
            let key_kind = *g.rng.index(&[K::Object, K::Array, K::Primitive]);
            let key = g.slot(key_kind);
            format!("{m}.delete({key});")
        }),
        (1, |g, _, _| {
            let m = g.slot(K::Map);
            let a = g.slot(K::Array);
            format!("{m} = new Map({a});")
        }),
        // Sets
        (1, |g, _, _| {
            let e = g.slot(K::Set);
            let ctor = *g.rng.index(&["Set", "WeakSet"]);
            format!("{e} = new {ctor};")
        }),
        (1, |g, _, _| {
            let e = g.slot(K::Set);
            let kind = *g.rng.index(&[K::Object, K::Array, K::Primitive, K::Function]);
            let v = g.slot(kind);
            format!("{e}.add({v});")
        }),
        (1, |g, _, _| {
            let e = g.slot(K::Set);
            let kind = *g.rng.index(&[K::Object, K::Array, K::Primitive]);
            let v = g.slot(kind);
            format!("{e}.delete({v});")
        }),
        // Buffers and typed views aliasing them
        (1, |g, _, _| {
            let buf = g.slot(K::Buffer);
            let size = g.rng.next(64) * 8;
            let ty = g.array_buffer_type();
            format!("{buf} = new {ty}({size});")
        }),
        (1, |g, _, _| {
            let buf = g.slot(K::Buffer);
            let t = g.slot(K::TypedView);
            format!("{buf} = {t}.buffer;")
        }),
        (2, |g, _, _| {
            let t = g.slot(K::TypedView);
            let buf = g.slot(K::Buffer);
            let ctor = *g
                .rng
                .index(super::exprs::TYPED_ARRAY_CONSTRUCTORS);
            format!("{t} = new {ctor}({buf});")
        }),
        (1, |g, d, b| {
            let t = g.slot(K::TypedView);
            let idx = g.rng.next(16);
            let v = g.make_expr(d - 2, b);
            format!("{t}[{idx}] = {v};")
        }),
        (1, |g, _, _| {
            let t = g.slot(K::TypedView);
            let a = g.slot(K::Array);
            let offset = g.rng.next(4);
            format!("{t}.set({a}, {offset});")
        }),
        (1, |g, _, _| {
            let dst = g.slot(K::TypedView);
            let src = g.slot(K::TypedView);
            let start = g.rng.next(8);
            format!("{dst} = {src}.subarray({start});")
        }),
        // Proxy handlers wrapping same-kind targets
        (1, |g, _, _| format!("{} = {{}};", g.slot(K::ProxyHandler))),
        (1, |g, d, b| {
            let h = g.slot(K::ProxyHandler);
            let trap = *g.rng.index(&[
                "get",
                "set",
                "has",
                "deleteProperty",
                "ownKeys",
                "getOwnPropertyDescriptor",
                "defineProperty",
            ]);
            let cb = g.make_evil_callback(d - 2, b);
            format!("{h}.{trap} = {cb};")
        }),
        (1, |g, d, b| {
            let h = g.slot(K::ProxyHandler);
            let handler = g.make_proxy_handler(d - 2, b);
            format!("{h} = {handler};")
        }),
        (1, |g, _, _| {
            let o = g.slot(K::Object);
            let target = g.slot(K::Object);
            let h = g.slot(K::ProxyHandler);
            format!("{o} = new Proxy({target}, {h});")
        }),
        (1, |g, _, _| {
            let f = g.slot(K::Function);
            let target = g.slot(K::Function);
            let h = g.slot(K::ProxyHandler);
            format!("{f} = new Proxy({target}, {h});")
        }),
        // Globals
        (1, |g, _, _| format!("{} = this;", g.slot(K::Global))),
        (1, |g, d, b| {
            let slot = g.slot(K::Global);
            let global = g.make_global(d - 2, b);
            format!("{slot} = {global};")
        }),
        // Functions
        (1, |g, d, b| {
            let f = g.slot(K::Function);
            let body = g.make_function(d - 2, b);
            format!("{f} = {body};")
        }),
        (1, |g, d, b| {
            let f = g.slot(K::Function);
            let cb = g.make_evil_callback(d - 2, b);
            format!("{f} = {cb};")
        }),
        (1, |g, d, b| {
            let f = g.slot(K::Function);
            let r = g.make_mathy_fun_ref(d, b);
            format!("{f} = {r};")
        }),
        (1, |g, d, b| {
            let f = g.slot(K::Function);
            let args = g.make_actual_arg_list(d - 2, b);
            format!("{f}({args});")
        }),
        // Primitives
        (1, |g, d, b| {
            let p = g.slot(K::Primitive);
            let n = g.make_number(d - 2, b);
            format!("{p} = {n};")
        }),
        (1, |g, _, _| {
            let p = g.slot(K::Primitive);
            let v = *g
                .rng
                .index(&["true", "false", "null", "undefined", "'abc'", "Symbol()"]);
            format!("{p} = {v};")
        }),
        // Iterators over the pooled containers
        (1, |g, _, _| {
            let i = g.slot(K::Iterator);
            let kind = *g.rng.index(&[K::Array, K::Map, K::Set, K::String]);
            let c = g.slot(kind);
            format!("{i} = {c}[Symbol.iterator]();")
        }),
        (1, |g, _, _| format!("{}.next();", g.slot(K::Iterator))),
        (1, |g, _, _| {
            let i = g.slot(K::Iterator);
            let m = *g.rng.index(&["keys", "values", "entries"]);
            let kind = *g.rng.index(&[K::Array, K::Map, K::Set]);
            let c = g.slot(kind);
            format!("{i} = {c}.{m}();")
        }),
        // Cross-kind probes
        (1, |g, _, _| {
            let kind = *g.rng.index(ObjectKindTag::all());
            format!("print({});", g.slot(kind))
        }),
        (1, |g, _, _| {
            let kind = *g.rng.index(ObjectKindTag::all());
            let slot = g.slot(kind);
            format!("print(uneval({slot}));")
        }),
        (1, |g, _, _| {
            let kind = *g.rng.index(ObjectKindTag::all());
            let slot = g.slot(kind);
            format!("gc({slot});")
        }),
        (1, |g, d, b| {
            let o = g.slot(K::Object);
            let stmt = g.make_statement(d - 3, &b.with(o.clone()));
            format!("with({o}) {{ {stmt} }}")
        }),
    ];

    if caps.buffer_detach {
        makers.push((1, |g, _, _| {
            format!("neuter({}, 'change-data');", g.slot(K::Buffer))
        }));
        makers.push((1, |g, _, _| {
            format!("neuter({}, 'same-data');", g.slot(K::Buffer))
        }));
    }

    makers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::build_grammar;
    use crate::random::SeededRng;

    #[test]
    fn test_kind_prefixes_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for kind in ObjectKindTag::all() {
            assert!(seen.insert(kind.prefix()), "duplicate {}", kind.prefix());
        }
    }

    #[test]
    fn test_slot_names_stay_in_pool() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(80);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..100 {
            let name = g.slot(ObjectKindTag::Map);
            assert!(["m0", "m1", "m2"].contains(&name.as_str()), "got {name}");
        }
    }

    #[test]
    fn test_builder_statement_targets_pooled_slot() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(81);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        let prefixes: Vec<&str> = ObjectKindTag::all().iter().map(|k| k.prefix()).collect();
        let mut hits = 0;
        for _ in 0..100 {
            let s = g.make_builder_statement(5, &b);
            assert!(!s.is_empty());
            let pooled = prefixes.iter().any(|p| {
                (0..SLOTS_PER_KIND).any(|i| s.contains(&format!("{p}{i}")))
            });
            if pooled {
                hits += 1;
            }
        }
        assert!(hits > 90, "only {hits}/100 statements touched a pooled slot");
    }

    #[test]
    fn test_evil_callback_usually_mutates_a_slot() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(82);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        let mut with_function = 0;
        for _ in 0..50 {
            let s = g.make_evil_callback(4, &b);
            if s.contains("function") {
                with_function += 1;
            }
        }
        // four of five arms are function literals over builder statements
        assert!(with_function > 30, "got {with_function}/50");
    }

    #[test]
    fn test_neuter_statements_gated() {
        let without = builder_statement_makers(&CapabilitySet::none());
        let with = builder_statement_makers(&CapabilitySet::spidermonkey_shell());
        assert_eq!(with.len(), without.len() + 2);
    }

    #[test]
    fn test_array_buffer_type_without_capability() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(83);
        let mut g = Gen::new(&mut rng, &tables);
        for _ in 0..20 {
            assert_eq!(g.array_buffer_type(), "ArrayBuffer");
        }
    }
}
