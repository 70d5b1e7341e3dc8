//! Generar - Grammar-Driven Random Program Generator
//!
//! Generar synthesizes syntactically-diverse JavaScript-shaped source
//! snippets for stress-testing a language runtime. It produces a large,
//! highly varied population of candidate programs (expressions,
//! statements, functions, typed-numeric code, regular-expression usages,
//! proxy objects) that exercise rare and interacting runtime paths far
//! more aggressively than hand-written tests would.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        GENERAR CORE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Capabilities → Grammar   →  Productions  →  Program text   │
//! │  probe result   tables       (weighted,      (one string    │
//! │  (built once)   (immutable)  recursive)      per call)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Output is frequently syntactically invalid or semantically
//! nonsensical by design: the point is to probe the robustness of a
//! downstream consumer, not to produce well-formed programs.
//!
//! # Quick Start
//!
//! ```rust
//! use generar::prelude::*;
//!
//! let mut generator = Generator::builder()
//!     .seed(42)
//!     .capabilities(CapabilitySet::spidermonkey_shell())
//!     .build()
//!     .expect("grammar tables are sound");
//!
//! let first = generator.generate_program(14);
//! generator.reseed(42);
//! assert_eq!(first, generator.generate_program(14));
//! ```
//!
//! # Reproducibility
//!
//! For a fixed seed and a fixed sequence of calls, output is
//! byte-identical across runs. The PRNG state can additionally be
//! exported and re-imported mid-stream to replay a specific generation.
//!
//! # Modules
//!
//! - [`grammar`] - the weighted-choice production network and sub-grammars
//! - [`random`] - deterministic, checkpointable random source
//! - [`capabilities`] - host-engine feature description
//! - [`corpus`] - optional regression-test corpus for splicing
//! - [`session`] - the public [`session::Generator`] API

pub mod capabilities;
pub mod corpus;
pub mod error;
pub mod grammar;
pub mod random;
pub mod session;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::capabilities::{CapabilitySet, Engine};
    pub use crate::corpus::{DirCorpus, RegressionCorpus};
    pub use crate::grammar::Bindings;
    pub use crate::random::{RngState, SeededRng};
    pub use crate::session::{Generator, GeneratorBuilder};
    pub use crate::{Error, Result};
}
