//! Automate Engine
//!
//! Embeds a Rhai interpreter and exposes an automation API to scripts. Everything effectful a
//! script does becomes a request to a host-supplied [`HostCapability`]:
//! - the [`Bridge`] carries `(verb, args) -> optional string` calls, one at a time
//! - [`Selector`] builds ordered condition lists and runs them through selector verbs
//! - [`Materializer`] turns host JSON into [`UiNode`]s that navigate by bounds
//! - [`Engine`] owns the interpreter, the host reference and the cancellation flag
//!
//! The wire contract (verb names, `"true"`/`"false"` tokens, JSON payloads) lives in [`verbs`]
//! and the argument conventions documented on each operation.

mod api;
mod bridge;
mod config;
mod console;
mod engine;
mod error;
mod host;
mod materialize;
mod node;
mod regex_cache;
mod selector;
pub mod test_support;
pub mod verbs;

pub use bridge::{Bridge, decode_bool};
pub use config::{DEFAULT_MEMORY_LIMIT, EngineConfig};
pub use console::{Console, LogEntry, LogLevel, LogSink};
pub use engine::{Engine, InterruptHandle, check_syntax};
pub use error::{Error, EvalError, Result, excerpt_at};
pub use host::HostCapability;
pub use materialize::Materializer;
pub use node::{Bounds, NodeInfo, UiNode};
pub use regex_cache::RegexCache;
pub use selector::{Condition, ConditionKind, Field, Flag, MatchMode, Selector, Shape};
