//! Engine lifecycle, evaluation and cancellation.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use rhai::{AST, Dynamic, Engine as Interpreter, EvalAltResult, Position, Scope};
use tracing::{debug, info};

use crate::{
    api::{self, ApiContext, CANCEL_TOKEN, EXIT_TOKEN, validation_message},
    bridge::Bridge,
    config::EngineConfig,
    console::{Console, LogEntry, LogSink},
    error::{EvalError, excerpt_at},
    host::HostCapability,
    node::UiNode,
    selector::Selector,
};

/// Cross-thread handle that requests cancellation of the running evaluation.
///
/// Cancellation is cooperative: the script stops at its next safepoint (an interpreter operation,
/// a bridge call boundary, or a sleep slice). A host call that is already blocking is not
/// preempted.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    /// Flag shared with the engine.
    cancel: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Request cancellation.
    pub fn interrupt(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether a request is pending.
    pub fn is_pending(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Mutable interpreter state carried across evaluations.
struct RuntimeState {
    /// Global variables.
    scope: Scope<'static>,
    /// Script functions defined so far.
    functions: AST,
}

/// One installed interpreter with its host.
struct Runtime {
    /// Configured interpreter with the API registered.
    interpreter: Interpreter,
    /// Bridge to the installed host; detached on teardown.
    bridge: Bridge,
    /// Evaluation state. Held for the duration of an evaluation.
    state: Mutex<RuntimeState>,
}

/// An embedded script engine bound to one host capability at a time.
///
/// ```
/// use std::sync::Arc;
/// use automate_engine::{Engine, EngineConfig};
///
/// let mut engine = Engine::new(EngineConfig::default());
/// engine.initialize(Arc::new(|verb: &str, _args: &[String]| {
///     (verb == "device.width").then(|| "1080".to_string())
/// }));
/// assert_eq!(engine.evaluate("device.width", "demo").unwrap(), "1080");
/// ```
pub struct Engine {
    /// Tunables applied on every `initialize`.
    config: Arc<EngineConfig>,
    /// Cooperative cancellation flag, shared with interrupt handles.
    cancel: Arc<AtomicBool>,
    /// Console shared by every runtime of this engine.
    console: Console,
    /// The installed runtime, if any.
    runtime: Option<Runtime>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl Engine {
    /// Create an engine with no runtime installed.
    pub fn new(config: EngineConfig) -> Self {
        let console = Console::new(config.log_capacity);
        Self {
            config: Arc::new(config),
            cancel: Arc::new(AtomicBool::new(false)),
            console,
            runtime: None,
        }
    }

    /// Active tunables.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Install a fresh interpreter bound to `host`, tearing down any previous one first.
    ///
    /// The previous host is detached before the new runtime exists, so it is never invoked again,
    /// even through selectors or nodes a script kept around.
    pub fn initialize(&mut self, host: Arc<dyn HostCapability>) {
        self.destroy();
        self.cancel.store(false, Ordering::SeqCst);

        let bridge = Bridge::new(host);
        let ctx = ApiContext::new(
            bridge.clone(),
            self.cancel.clone(),
            self.config.clone(),
            self.console.clone(),
        );
        let interpreter = build_interpreter(&self.config, &ctx);
        self.runtime = Some(Runtime {
            interpreter,
            bridge,
            state: Mutex::new(RuntimeState {
                scope: Scope::new(),
                functions: AST::empty(),
            }),
        });
        info!(
            target: "automate::engine",
            memory_limit = self.config.memory_limit,
            "engine initialized"
        );
    }

    /// Whether a runtime is installed.
    pub fn is_initialized(&self) -> bool {
        self.runtime.is_some()
    }

    /// Run `source` to completion on the calling thread and render its completion value.
    ///
    /// Unit renders as `"undefined"`. Variables and functions defined by earlier evaluations stay
    /// visible. An interrupt requested before or during the call cancels it; the flag is cleared
    /// when the call returns.
    pub fn evaluate(&self, source: &str, source_name: &str) -> Result<String, EvalError> {
        let Some(runtime) = &self.runtime else {
            return Err(EvalError::NotInitialized);
        };
        let Some(mut state) = runtime.state.try_lock() else {
            return Err(EvalError::Busy);
        };

        debug!(target: "automate::engine", source_name, "evaluate");
        let result = if self.cancel.load(Ordering::SeqCst) {
            Err(EvalError::Cancelled)
        } else {
            runtime.run(&mut state, source, source_name)
        };
        self.cancel.store(false, Ordering::SeqCst);

        if let Err(err) = &result {
            debug!(target: "automate::engine", source_name, %err, "evaluation failed");
        }
        result
    }

    /// [`Engine::evaluate`] flattened into the string protocol embedders use: the rendered value,
    /// `"undefined"` after `exit()`, or the error message.
    pub fn evaluate_to_string(&self, source: &str, source_name: &str) -> String {
        match self.evaluate(source, source_name) {
            Ok(value) => value,
            Err(EvalError::Exited) => "undefined".to_string(),
            Err(err) => err.to_string(),
        }
    }

    /// Request cancellation of the running (or next) evaluation.
    pub fn interrupt(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// A handle other threads can use to interrupt this engine.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Release the interpreter and the host. The host is never called again afterwards.
    pub fn destroy(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.bridge.detach();
            info!(target: "automate::engine", "engine destroyed");
        }
    }

    /// Install or remove the sink that receives every console message.
    pub fn set_log_sink(&self, sink: Option<Arc<dyn LogSink>>) {
        self.console.set_sink(sink);
    }

    /// Retained console messages, oldest first.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.console.snapshot()
    }
}

impl Runtime {
    /// Compile and run one source in the persistent scope.
    fn run(
        &self,
        state: &mut RuntimeState,
        source: &str,
        source_name: &str,
    ) -> Result<String, EvalError> {
        let mut ast = self
            .interpreter
            .compile_with_scope(&state.scope, source)
            .map_err(|err| {
                let err: EvalAltResult = err.into();
                eval_error(source, source_name, &err)
            })?;
        ast.set_source(source_name);

        let combined = state.functions.merge(&ast);
        state.functions = combined.clone_functions_only();

        let value = self
            .interpreter
            .eval_ast_with_scope::<Dynamic>(&mut state.scope, &combined)
            .map_err(|err| eval_error(source, source_name, &err))?;
        Ok(render(&value))
    }
}

/// Compile `source` without running it.
pub fn check_syntax(source: &str, source_name: &str) -> Result<(), EvalError> {
    let mut interpreter = Interpreter::new();
    api::allow_keyword_methods(&mut interpreter);
    interpreter.compile(source).map(|_| ()).map_err(|err| {
        let err: EvalAltResult = err.into();
        eval_error(source, source_name, &err)
    })
}

/// Configure an interpreter for running automation scripts.
fn build_interpreter(config: &EngineConfig, ctx: &ApiContext) -> Interpreter {
    let mut engine = Interpreter::new();

    engine.set_max_string_size(config.max_string_size());
    engine.set_max_array_size(config.max_collection_size());
    engine.set_max_map_size(config.max_collection_size());
    engine.set_max_operations(config.max_operations);
    if let Some(levels) = config.max_call_levels {
        engine.set_max_call_levels(levels);
    }

    let cancel = ctx.cancel.clone();
    engine.on_progress(move |_ops| {
        cancel
            .load(Ordering::SeqCst)
            .then(|| Dynamic::from(CANCEL_TOKEN.to_string()))
    });

    api::allow_keyword_methods(&mut engine);
    api::register(&mut engine, ctx);
    engine
}

/// Render a completion value for the caller.
fn render(value: &Dynamic) -> String {
    if value.is_unit() {
        return "undefined".to_string();
    }
    if let Some(node) = value.read_lock::<UiNode>() {
        return node.to_string();
    }
    if let Some(sel) = value.read_lock::<Selector>() {
        return sel.to_json();
    }
    value.to_string()
}

/// Convert a Rhai error into an [`EvalError`], unwrapping nested function-call frames.
fn eval_error(source: &str, source_name: &str, err: &EvalAltResult) -> EvalError {
    let mut frames = Vec::new();
    let mut inner = err;
    loop {
        match inner {
            EvalAltResult::ErrorInFunctionCall(name, _, next, _) => {
                frames.push(name.clone());
                inner = &**next;
            }
            EvalAltResult::ErrorInModule(_, next, _) => inner = &**next,
            _ => break,
        }
    }

    if let EvalAltResult::ErrorTerminated(token, _) = inner {
        return if token.to_string() == EXIT_TOKEN {
            EvalError::Exited
        } else {
            EvalError::Cancelled
        };
    }

    let message = match inner {
        EvalAltResult::ErrorRuntime(value, _) => {
            validation_message(value).unwrap_or_else(|| value.to_string())
        }
        other => without_position(other),
    };
    let (line, col) = line_col(inner.position()).unzip();
    frames.reverse();
    EvalError::Script {
        message,
        source_name: source_name.to_string(),
        line,
        col,
        excerpt: line.zip(col).map(|(l, c)| excerpt_at(source, l, c)),
        stack: frames,
    }
}

/// Error text without the trailing `(line l, position p)` Rhai appends.
fn without_position(err: &EvalAltResult) -> String {
    let text = err.to_string();
    let suffix = format!(" ({})", err.position());
    match text.strip_suffix(&suffix) {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Convert a Rhai `Position` into a 1-based (line, col) pair.
fn line_col(pos: Position) -> Option<(usize, usize)> {
    let line = pos.line()?;
    let col = pos.position().unwrap_or(1);
    Some((line.max(1), col.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::LogLevel;

    fn engine() -> Engine {
        let mut engine = Engine::default();
        engine.initialize(Arc::new(|_: &str, _: &[String]| None));
        engine
    }

    #[test]
    fn renders_unit_as_undefined() {
        let engine = engine();
        assert_eq!(engine.evaluate("let x = 1;", "t").unwrap(), "undefined");
        assert_eq!(engine.evaluate("40 + 2", "t").unwrap(), "42");
        assert_eq!(engine.evaluate(r#""hi""#, "t").unwrap(), "hi");
    }

    #[test]
    fn scope_and_functions_persist() {
        let engine = engine();
        engine.evaluate("let base = 40; fn add(a) { a + 2 }", "a").unwrap();
        assert_eq!(engine.evaluate("add(base)", "b").unwrap(), "42");
    }

    #[test]
    fn thrown_values_become_messages() {
        let engine = engine();
        let err = engine.evaluate("fn f() { throw \"boom\" }\nf()", "s").unwrap_err();
        match err {
            EvalError::Script {
                message,
                line,
                stack,
                ..
            } => {
                assert_eq!(message, "boom");
                assert_eq!(line, Some(1));
                assert_eq!(stack, vec!["f".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parse_errors_carry_location() {
        let engine = engine();
        let err = engine.evaluate("let = ;", "bad.rhai").unwrap_err();
        assert!(matches!(err, EvalError::Script { line: Some(1), .. }));
        assert!(err.pretty().contains("bad.rhai:1:"));
        assert!(check_syntax("let = ;", "bad.rhai").is_err());
        assert!(check_syntax("let a = 1;", "ok.rhai").is_ok());
    }

    #[test]
    fn debug_is_callable_as_a_method() {
        assert!(check_syntax(r#"console.debug("x", 1);"#, "d.rhai").is_ok());
        assert!(check_syntax(r#"debug("x");"#, "d.rhai").is_ok());
        assert!(check_syntax("let debug = 1;", "d.rhai").is_err());

        let engine = engine();
        engine.evaluate(r#"console.debug("x")"#, "d").unwrap();
        let logs = engine.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Debug);
        assert_eq!(logs[0].message, "x");
    }

    #[test]
    fn uninitialized_and_destroyed_engines_refuse() {
        let mut engine = Engine::default();
        assert_eq!(engine.evaluate("1", "t"), Err(EvalError::NotInitialized));
        engine.initialize(Arc::new(|_: &str, _: &[String]| None));
        assert!(engine.is_initialized());
        engine.destroy();
        assert_eq!(
            engine.evaluate_to_string("1", "t"),
            "Error: Engine not initialized"
        );
    }

    #[test]
    fn exit_stops_without_error_text() {
        let engine = engine();
        assert_eq!(engine.evaluate("exit(); 5", "t"), Err(EvalError::Exited));
        assert_eq!(engine.evaluate_to_string("exit()", "t"), "undefined");
    }

    #[test]
    fn oversized_strings_are_script_errors() {
        let mut engine = Engine::new(EngineConfig {
            memory_limit: 64,
            ..EngineConfig::default()
        });
        engine.initialize(Arc::new(|_: &str, _: &[String]| None));
        let err = engine
            .evaluate(r#"let s = "x"; loop { s += s; }"#, "t")
            .unwrap_err();
        assert!(matches!(err, EvalError::Script { .. }));
    }
}
