//! Scripted proxy-handler generation
//!
//! A handler factory is a function literal returning an object with all
//! thirteen traps filled in. Each factory picks a preferred personality
//! (forwarding, always-yes, always-no, binding, throwing) and a fidelity
//! level; traps the personality doesn't cover fall back to forwarding or
//! empty bodies, or occasionally to a freshly generated function.
//!
//! The letter `x` is special: forwarding bodies close over the factory's
//! `x` argument. Based on the no-op forwarding proxy from the original
//! harmony proxies documentation.

use super::{Bindings, Gen};

/// Trap personalities, in preference order.
const PREFERRED: &[&str] = &["empty", "forward", "yes", "no", "bind", "throwing"];
const FALLBACK: &[&str] = &["empty", "forward"];

/// `(trap, [(personality, body)])` for every scripted-proxy trap.
const PROXY_HANDLER_PROPERTIES: &[(&str, &[(&str, &str)])] = &[
    (
        "getOwnPropertyDescriptor",
        &[
            ("empty", "function(target, name) {}"),
            (
                "forward",
                "function(target, name) { var desc = Reflect.getOwnPropertyDescriptor(x); desc.configurable = true; return desc; }",
            ),
            (
                "throwing",
                "function(target, name) { return {get: function() { throw 4; }, set: function() { throw 5; }}; }",
            ),
        ],
    ),
    (
        "defineProperty",
        &[
            ("empty", "function(target, name, desc) {}"),
            (
                "forward",
                "function(target, name, desc) { return Reflect.defineProperty(x, name, desc); }",
            ),
        ],
    ),
    (
        "ownKeys",
        &[
            ("empty", "function(target) { return []; }"),
            ("forward", "function(target) { return Reflect.ownKeys(x); }"),
        ],
    ),
    (
        "deleteProperty",
        &[
            ("empty", "function(target, name) { return true; }"),
            ("yes", "function(target, name) { return true; }"),
            ("no", "function(target, name) { return false; }"),
            (
                "forward",
                "function(target, name) { return Reflect.deleteProperty(x, name); }",
            ),
        ],
    ),
    (
        "has",
        &[
            ("empty", "function(target, name) { return false; }"),
            ("yes", "function(target, name) { return true; }"),
            ("no", "function(target, name) { return false; }"),
            ("forward", "function(target, name) { return name in x; }"),
        ],
    ),
    (
        "get",
        &[
            ("empty", "function(target, name, receiver) { return undefined }"),
            (
                "forward",
                "function(target, name, receiver) { return Reflect.get(x, name, receiver); }",
            ),
            (
                "bind",
                "function(target, name, receiver) { var prop = Reflect.get(x, name, receiver); return (typeof prop) === 'function' ? prop.bind(x) : prop; }",
            ),
        ],
    ),
    (
        "set",
        &[
            ("empty", "function(target, name, val, receiver) { return true; }"),
            ("yes", "function(target, name, val, receiver) { return true; }"),
            ("no", "function(target, name, val, receiver) { return false; }"),
            (
                "forward",
                "function(target, name, val, receiver) { return Reflect.set(x, name, val, receiver); }",
            ),
        ],
    ),
    (
        "getPrototypeOf",
        &[
            ("empty", "function(target) { return null; }"),
            (
                "forward",
                "function(target) { return Reflect.getPrototypeOf(x); }",
            ),
        ],
    ),
    (
        "setPrototypeOf",
        &[
            ("yes", "function(target, proto) { return true; }"),
            ("no", "function(target, proto) { return false; }"),
            (
                "forward",
                "function(target, proto) { return Reflect.setPrototypeOf(x, proto); }",
            ),
        ],
    ),
    (
        "isExtensible",
        &[
            ("yes", "function(target) { return true; }"),
            ("no", "function(target) { return false; }"),
            (
                "forward",
                "function(target) { return Reflect.isExtensible(x); }",
            ),
        ],
    ),
    (
        "preventExtensions",
        &[
            ("yes", "function(target) { return true; }"),
            ("no", "function(target) { return false; }"),
            (
                "forward",
                "function(target) { return Reflect.preventExtensions(x); }",
            ),
        ],
    ),
    (
        "apply",
        &[
            ("empty", "function(target, thisArgument, argumentsList) {}"),
            (
                "forward",
                "function(target, thisArgument, argumentsList) { return Reflect.apply(x, thisArgument, argumentsList); }",
            ),
        ],
    ),
    (
        "construct",
        &[
            (
                "empty",
                "function(target, argumentsList, newTarget) { return []; }",
            ),
            (
                "invalid",
                "function(target, argumentsList, newTarget) { return 3; }",
            ),
            (
                "forward",
                "function(target, argumentsList, newTarget) { return Reflect.construct(x, argumentsList, newTarget); }",
            ),
        ],
    ),
];

fn body_for(
    trap_bodies: &'static [(&'static str, &'static str)],
    personality: &str,
) -> Option<&'static str> {
    trap_bodies
        .iter()
        .find(|(p, _)| *p == personality)
        .map(|(_, body)| *body)
}

impl Gen<'_> {
    /// A handler factory call, yielding a handler object.
    pub fn make_proxy_handler(&mut self, d: i64, b: &Bindings) -> String {
        if let Some(s) = self.chaos(d, b) {
            return s;
        }
        let (factory, _introduced) = self.make_proxy_handler_factory(d, b);
        let arg = self.make_expr(d - 3, b);
        format!("{factory}({arg})")
    }

    /// A handler factory literal. Returns the generated text together with
    /// the names the factory introduced into its own scope (either `["x"]`
    /// or nothing), so callers can thread bindings explicitly.
    pub fn make_proxy_handler_factory(&mut self, d: i64, b: &Bindings) -> (String, Vec<String>) {
        if let Some(s) = self.chaos(d, b) {
            return (s, Vec::new());
        }
        if d < 1 || self.over_ceiling() {
            return ("({/*TOODEEP*/})".to_string(), Vec::new());
        }

        let preferred = *self.rng.index(PREFERRED);
        let fallback = *self.rng.index(FALLBACK);
        let fidelity = self.rng.next(10);

        let has_arg = self.rng.next(2) != 0;
        let (mut text, introduced, bp) = if has_arg {
            (
                String::from("(function handlerFactory(x) {"),
                vec!["x".to_string()],
                b.with("x"),
            )
        } else {
            (
                String::from("(function handlerFactory() {"),
                Vec::new(),
                b.clone(),
            )
        };
        text.push_str("return {");

        for (trap, bodies) in PROXY_HANDLER_PROPERTIES {
            let preferred_body = body_for(bodies, preferred);
            let fun_text = if let Some(body) = preferred_body {
                if self.rng.next(10) <= fidelity {
                    body.to_string()
                } else {
                    self.off_personality_trap(d, &bp, bodies, fallback)
                }
            } else {
                self.off_personality_trap(d, &bp, bodies, fallback)
            };
            text.push_str(&format!("{trap}: {fun_text}, "));
        }

        text.push_str("}; })");
        (text, introduced)
    }

    fn off_personality_trap(
        &mut self,
        d: i64,
        bp: &Bindings,
        bodies: &'static [(&'static str, &'static str)],
        fallback: &str,
    ) -> String {
        match self.rng.next(7) {
            0 => self.make_function(d - 3, bp),
            1 => "undefined".to_string(),
            2 => "function() { throw 3; }".to_string(),
            _ => body_for(bodies, fallback)
                .or_else(|| body_for(bodies, "forward"))
                .unwrap_or("undefined")
                .to_string(),
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
    fn test_all_thirteen_traps_present() {
        assert_eq!(PROXY_HANDLER_PROPERTIES.len(), 13);
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(60);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        for _ in 0..10 {
            let (text, _) = g.make_proxy_handler_factory(6, &b);
            for (trap, _) in PROXY_HANDLER_PROPERTIES {
                assert!(text.contains(&format!("{trap}: ")), "missing {trap}: {text}");
            }
        }
    }

    #[test]
    fn test_introduced_bindings_match_signature() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(61);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::new();
        for _ in 0..50 {
            let (text, introduced) = g.make_proxy_handler_factory(6, &b);
            if text.starts_with("(function handlerFactory(x)") {
                assert_eq!(introduced, vec!["x".to_string()]);
            } else if text.starts_with("(function handlerFactory()") {
                assert!(introduced.is_empty());
            }
        }
    }

    #[test]
    fn test_too_deep_placeholder() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(62);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::new();
        let (text, introduced) = g.make_proxy_handler_factory(0, &b);
        assert_eq!(text, "({/*TOODEEP*/})");
        assert!(introduced.is_empty());
    }

    #[test]
    fn test_handler_is_factory_call() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(63);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        let s = g.make_proxy_handler(6, &b);
        assert!(s.contains("handlerFactory") || s.contains("TOODEEP"), "got {s}");
        assert!(s.ends_with(')'), "got {s}");
    }

    #[test]
    fn test_every_personality_reachable() {
        let tables = build_grammar(&CapabilitySet::none()).unwrap();
        let mut rng = SeededRng::from_seed(64);
        let mut g = Gen::new(&mut rng, &tables).with_chaos_one_in(u64::MAX);
        let b = Bindings::from_names(&["x"]);
        let mut saw_throwing = false;
        let mut saw_forward = false;
        for _ in 0..100 {
            let (text, _) = g.make_proxy_handler_factory(6, &b);
            if text.contains("throw 4") {
                saw_throwing = true;
            }
            if text.contains("Reflect.get(x, name, receiver)") {
                saw_forward = true;
            }
        }
        assert!(saw_throwing, "throwing personality never selected");
        assert!(saw_forward, "forwarding personality never selected");
    }
}
