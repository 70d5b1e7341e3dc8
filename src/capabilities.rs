//! Host-engine capability description
//!
//! Some grammar alternatives only make sense on runtimes that expose
//! particular shell/introspection primitives (sandbox evaluation, OOM
//! injection, worker evaluation, wrapper constructors). The harness probes
//! the host once and hands the result here; [`crate::grammar::build_grammar`]
//! consumes it exactly once, appending extra weighted alternatives for each
//! capability that is present. Absent capabilities leave the grammar
//! unchanged, never cause errors.

use serde::{Deserialize, Serialize};

/// Which engine family the host shell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    /// Could not be identified
    #[default]
    Unknown,
    /// SpiderMonkey shell (trunk)
    Spidermonkey,
    /// JavaScriptCore shell
    Javascriptcore,
}

/// One-time probe result describing the host shell's testing primitives.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitySet {
    /// Engine family, used to veto alternatives known-broken on a family
    pub engine: Engine,
    /// `oomTest` is available
    pub oom_test: bool,
    /// `evalcx` / `newGlobal` / `fillShellSandbox` are available
    pub sandbox_eval: bool,
    /// `evalInWorker` is available
    pub worker_eval: bool,
    /// `XPCNativeWrapper` / `XPCSafeJSObjectWrapper` constructors exist
    pub wrapper_objects: bool,
    /// Gecko `Components.utils.Sandbox` sandboxes exist
    pub gecko_sandbox: bool,
    /// `SharedArrayBuffer` constructor exists
    pub shared_array_buffer: bool,
    /// Buffer detach primitive (`neuter`) exists
    pub buffer_detach: bool,
    /// `offThreadCompileScript` / `runOffThreadScript` exist
    pub off_thread_compile: bool,
    /// GC mark-observer primitives exist
    pub mark_observers: bool,
}

impl CapabilitySet {
    /// No optional capabilities: the narrowest grammar.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The capability profile of a stock SpiderMonkey fuzzing shell.
    #[must_use]
    pub fn spidermonkey_shell() -> Self {
        Self {
            engine: Engine::Spidermonkey,
            oom_test: true,
            sandbox_eval: true,
            worker_eval: true,
            wrapper_objects: false,
            gecko_sandbox: false,
            shared_array_buffer: true,
            buffer_detach: true,
            off_thread_compile: true,
            mark_observers: true,
        }
    }

    /// Whether `oomTest` alternatives should be generated.
    ///
    /// JavaScriptCore advertises an incompatible primitive of the same
    /// name, so the gate requires both the flag and a non-JSC engine.
    #[must_use]
    pub fn use_oom_test(&self) -> bool {
        self.oom_test && self.engine != Engine::Javascriptcore
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_has_nothing() {
        let caps = CapabilitySet::none();
        assert!(!caps.oom_test);
        assert!(!caps.sandbox_eval);
        assert!(!caps.worker_eval);
        assert_eq!(caps.engine, Engine::Unknown);
    }

    #[test]
    fn test_spidermonkey_shell_profile() {
        let caps = CapabilitySet::spidermonkey_shell();
        assert!(caps.use_oom_test());
        assert!(caps.sandbox_eval);
        assert!(caps.shared_array_buffer);
    }

    #[test]
    fn test_oom_test_vetoed_on_jsc() {
        let caps = CapabilitySet {
            engine: Engine::Javascriptcore,
            oom_test: true,
            ..CapabilitySet::none()
        };
        assert!(!caps.use_oom_test());
    }

    #[test]
    fn test_deserialize_partial_description() {
        let caps: CapabilitySet =
            serde_json::from_str(r#"{"engine":"spidermonkey","oom_test":true}"#).unwrap();
        assert_eq!(caps.engine, Engine::Spidermonkey);
        assert!(caps.oom_test);
        assert!(!caps.sandbox_eval);
    }
}
