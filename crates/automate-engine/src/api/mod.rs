//! Registration of the script-visible API.
//!
//! Every function registered here funnels its effect through the shared [`Bridge`]. Functions that
//! reach the host check the cancellation flag before and after the call, so an interrupt lands
//! at the next bridge boundary even when the interpreter itself is blocked in the host.

mod globals;
mod namespaces;
mod nodes;
mod selectors;
mod validation;

use std::{
    cmp,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use rhai::{Dynamic, Engine, EvalAltResult, Position, Token};
use tracing::debug;

pub(crate) use self::validation::{boxed_validation_error, validation_message};
use crate::{
    bridge::Bridge,
    config::EngineConfig,
    console::{Console, LogLevel},
    materialize::Materializer,
    regex_cache::RegexCache,
    selector::Selector,
    verbs,
};

/// Result type of fallible API functions.
pub(crate) type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Termination token raised when the cancellation flag is observed.
pub(crate) const CANCEL_TOKEN: &str = "automate:cancelled";

/// Termination token raised by `exit()`.
pub(crate) const EXIT_TOKEN: &str = "automate:exit";

/// Factors mapping a declared design resolution onto the device.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Scale {
    /// Horizontal factor.
    x: f64,
    /// Vertical factor.
    y: f64,
}

/// State shared by every registered closure of one runtime.
#[derive(Clone)]
pub(crate) struct ApiContext {
    /// Bridge to the host.
    pub(crate) bridge: Bridge,
    /// Node construction bound to the bridge.
    pub(crate) nodes: Materializer,
    /// Cooperative cancellation flag.
    pub(crate) cancel: Arc<AtomicBool>,
    /// Engine tunables.
    pub(crate) config: Arc<EngineConfig>,
    /// Console output.
    pub(crate) console: Console,
    /// Compiled patterns for local selector matching.
    pub(crate) regexes: Arc<RegexCache>,
    /// Active `setScreenMetrics` scaling.
    scale: Arc<Mutex<Option<Scale>>>,
}

impl ApiContext {
    /// Build a context for a fresh runtime.
    pub(crate) fn new(
        bridge: Bridge,
        cancel: Arc<AtomicBool>,
        config: Arc<EngineConfig>,
        console: Console,
    ) -> Self {
        let nodes = Materializer::new(bridge.clone()).with_settle_delay(config.settle_delay());
        Self {
            bridge,
            nodes,
            cancel,
            config,
            console,
            regexes: Arc::new(RegexCache::new()),
            scale: Arc::new(Mutex::new(None)),
        }
    }

    /// A fresh, empty selector.
    pub(crate) fn selector(&self) -> Selector {
        Selector::new(self.nodes.clone())
    }

    /// Fail with the cancellation token if an interrupt is pending.
    pub(crate) fn check(&self, pos: Position) -> RhaiResult<()> {
        if self.cancel.load(Ordering::SeqCst) {
            Err(terminated(CANCEL_TOKEN, pos))
        } else {
            Ok(())
        }
    }

    /// Run a host-facing operation between two cancellation checks.
    pub(crate) fn guarded<T>(&self, pos: Position, op: impl FnOnce() -> T) -> RhaiResult<T> {
        self.check(pos)?;
        let out = op();
        self.check(pos)?;
        Ok(out)
    }

    /// Block the script thread for `ms` milliseconds, waking up in slices to observe interrupts.
    pub(crate) fn sleep(&self, ms: i64, pos: Position) -> RhaiResult<()> {
        self.check(pos)?;
        let total = Duration::from_millis(u64::try_from(ms).unwrap_or(0));
        // `None` when the deadline lies past what `Instant` can represent.
        let deadline = Instant::now().checked_add(total);
        let slice = self.config.sleep_slice();
        loop {
            let now = Instant::now();
            let remaining = match deadline {
                Some(deadline) if now >= deadline => return Ok(()),
                Some(deadline) => deadline - now,
                None => slice,
            };
            thread::sleep(cmp::min(slice, remaining));
            self.check(pos)?;
        }
    }

    /// Declare the resolution coordinates in scripts are written for.
    pub(crate) fn set_screen_metrics(&self, width: i64, height: i64, pos: Position) -> RhaiResult<()> {
        if width <= 0 || height <= 0 {
            return Err(boxed_validation_error(
                format!("setScreenMetrics: invalid size {width}x{height}"),
                pos,
            ));
        }
        let (dw, dh) = self.guarded(pos, || {
            (
                self.bridge.call_i64(verbs::DEVICE_WIDTH, &[], 0),
                self.bridge.call_i64(verbs::DEVICE_HEIGHT, &[], 0),
            )
        })?;
        let scale = if dw > 0 && dh > 0 {
            Some(Scale {
                x: dw as f64 / width as f64,
                y: dh as f64 / height as f64,
            })
        } else {
            debug!(target: "automate::engine", "device size unknown; coordinates left unscaled");
            None
        };
        *self.scale.lock() = scale;
        Ok(())
    }

    /// Map a script coordinate to device pixels.
    pub(crate) fn scale_point(&self, x: i64, y: i64) -> (i64, i64) {
        match *self.scale.lock() {
            Some(s) => (
                (x as f64 * s.x).round() as i64,
                (y as f64 * s.y).round() as i64,
            ),
            None => (x, y),
        }
    }
}

/// A termination error carrying `token`.
pub(crate) fn terminated(token: &str, pos: Position) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorTerminated(Dynamic::from(token.to_string()), pos))
}

/// Convert an optional node-like value into a script value (`()` for none).
pub(crate) fn opt_to_dynamic<T: Clone + Send + Sync + 'static>(value: Option<T>) -> Dynamic {
    value.map_or(Dynamic::UNIT, Dynamic::from)
}

/// Let `debug` be called as a method (`console.debug(..)`).
///
/// The tokenizer reserves `debug`, so a `debug` that follows `.` is handed to the parser as a
/// plain identifier.
#[allow(deprecated)]
pub(crate) fn allow_keyword_methods(engine: &mut Engine) {
    let after_period = AtomicBool::new(false);
    engine.on_parse_token(move |token, _, _| {
        let follows = after_period.swap(matches!(token, Token::Period), Ordering::Relaxed);
        match token {
            Token::Reserved(name) if follows && name.as_str() == "debug" => {
                Token::Identifier(name)
            }
            other => other,
        }
    });
}

/// Install the full API surface into `engine`.
pub(crate) fn register(engine: &mut Engine, ctx: &ApiContext) {
    let console = ctx.console.clone();
    engine.on_print(move |s| console.emit(LogLevel::Log, s));
    let console = ctx.console.clone();
    engine.on_debug(move |s, _src, _pos| console.emit(LogLevel::Debug, s));

    selectors::register(engine, ctx);
    nodes::register(engine, ctx);
    globals::register(engine, ctx);
    namespaces::register(engine, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ApiContext {
        ApiContext::new(
            Bridge::detached(),
            Arc::new(AtomicBool::new(false)),
            Arc::new(EngineConfig::default()),
            Console::new(0),
        )
    }

    #[test]
    fn guarded_observes_flag_on_both_sides() {
        let ctx = ctx();
        assert_eq!(ctx.guarded(Position::NONE, || 1).unwrap(), 1);
        let flag = ctx.cancel.clone();
        let err = ctx
            .guarded(Position::NONE, || flag.store(true, Ordering::SeqCst))
            .unwrap_err();
        assert!(matches!(*err, EvalAltResult::ErrorTerminated(..)));
    }

    #[test]
    fn sleep_returns_early_when_cancelled() {
        let ctx = ctx();
        let flag = ctx.cancel.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            flag.store(true, Ordering::SeqCst);
        });
        let start = Instant::now();
        assert!(ctx.sleep(10_000, Position::NONE).is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
        waker.join().unwrap();
    }

    #[test]
    fn unscaled_until_metrics_resolve() {
        let ctx = ctx();
        assert_eq!(ctx.scale_point(10, 20), (10, 20));
        // A detached host reports no device size, so scaling stays off.
        ctx.set_screen_metrics(1080, 1920, Position::NONE).unwrap();
        assert_eq!(ctx.scale_point(10, 20), (10, 20));
        assert!(ctx.set_screen_metrics(0, 1920, Position::NONE).is_err());
    }
}
