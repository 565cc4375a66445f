//! The host call bridge: the single synchronous RPC primitive every script API funnels through.

use std::{cell::RefCell, fmt, sync::Arc};

use parking_lot::ReentrantMutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::host::HostCapability;

/// Shared host slot. The reentrant lock is held across the host call so calls are strictly
/// one-in-flight and FIFO across threads, while a host that calls back on the same thread does
/// not deadlock.
type HostSlot = ReentrantMutex<RefCell<Option<Arc<dyn HostCapability>>>>;

/// Cloneable handle to a host capability.
///
/// Every clone shares the same slot, so [`Bridge::detach`] silences all of them at once. Once
/// detached, calls answer `None` and the capability is never invoked again.
#[derive(Clone)]
pub struct Bridge {
    /// Slot holding the capability while attached.
    slot: Arc<HostSlot>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl Bridge {
    /// Create a bridge attached to `host`.
    pub fn new(host: Arc<dyn HostCapability>) -> Self {
        Self {
            slot: Arc::new(ReentrantMutex::new(RefCell::new(Some(host)))),
        }
    }

    /// Create a bridge with no capability; every call answers `None`.
    pub fn detached() -> Self {
        Self {
            slot: Arc::new(ReentrantMutex::new(RefCell::new(None))),
        }
    }

    /// Whether a capability is still installed.
    pub fn is_attached(&self) -> bool {
        self.slot.lock().borrow().is_some()
    }

    /// Release the capability. Waits for an in-flight call on another thread to finish.
    pub fn detach(&self) {
        let guard = self.slot.lock();
        let released = guard.borrow_mut().take();
        if released.is_some() {
            debug!(target: "automate::bridge", "host capability released");
        }
    }

    /// Issue one request and block until the host answers.
    ///
    /// Absence of a capability and a declining host are indistinguishable to the caller.
    pub fn call(&self, verb: &str, args: &[String]) -> Option<String> {
        let guard = self.slot.lock();
        let host = guard.borrow().clone();
        let Some(host) = host else {
            debug!(target: "automate::bridge", verb, "no host capability installed");
            return None;
        };
        trace!(target: "automate::bridge", verb, argc = args.len(), "host call");
        let out = host.call(verb, args);
        trace!(
            target: "automate::bridge",
            verb,
            answered = out.is_some(),
            "host call returned"
        );
        out
    }

    /// Issue a boolean-shaped request. Only the literal `"true"` decodes to `true`.
    pub fn call_bool(&self, verb: &str, args: &[String]) -> bool {
        decode_bool(self.call(verb, args).as_deref())
    }

    /// Issue a request whose answer is plain text; absence becomes the empty string.
    pub fn call_text(&self, verb: &str, args: &[String]) -> String {
        self.call(verb, args).unwrap_or_default()
    }

    /// Issue a request whose answer is an integer, falling back to `default` on absence or
    /// garbage.
    pub fn call_i64(&self, verb: &str, args: &[String], default: i64) -> i64 {
        self.call(verb, args)
            .and_then(|s| parse_number(&s))
            .unwrap_or(default)
    }

    /// Issue a request whose answer is JSON text. Malformed JSON degrades to `None`.
    pub fn call_json(&self, verb: &str, args: &[String]) -> Option<Value> {
        let raw = self.call(verb, args)?;
        decode_json(verb, &raw)
    }
}

/// Decode a boolean token.
pub fn decode_bool(raw: Option<&str>) -> bool {
    raw == Some("true")
}

/// Decode JSON text, logging and discarding malformed input.
pub(crate) fn decode_json(verb: &str, raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(v) => Some(v),
        Err(err) => {
            debug!(target: "automate::bridge", verb, %err, "malformed host json");
            None
        }
    }
}

/// Parse an integer that a host may have rendered as a float (`"87.0"`).
fn parse_number(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn boolean_tokens_are_strict() {
        assert!(decode_bool(Some("true")));
        assert!(!decode_bool(Some("false")));
        assert!(!decode_bool(Some("TRUE")));
        assert!(!decode_bool(Some("1")));
        assert!(!decode_bool(Some("")));
        assert!(!decode_bool(None));
    }

    #[test]
    fn detached_bridge_answers_none() {
        let bridge = Bridge::detached();
        assert_eq!(bridge.call("toast", &["hi".to_string()]), None);
        assert!(!bridge.call_bool("back", &[]));
        assert_eq!(bridge.call_text("getClip", &[]), "");
        assert_eq!(bridge.call_i64("device.width", &[], 7), 7);
    }

    #[test]
    fn detach_silences_every_clone() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let bridge = Bridge::new(Arc::new(move |_: &str, _: &[String]| {
            seen.fetch_add(1, Ordering::SeqCst);
            Some("true".to_string())
        }));
        let clone = bridge.clone();
        assert!(clone.call_bool("back", &[]));
        bridge.detach();
        assert!(!clone.call_bool("back", &[]));
        assert!(!clone.is_attached());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn malformed_json_degrades_to_none() {
        let bridge = Bridge::new(Arc::new(|_: &str, _: &[String]| {
            Some("{not json".to_string())
        }));
        assert!(bridge.call_json("http.get", &[]).is_none());
    }

    #[test]
    fn numbers_accept_float_rendering() {
        let bridge = Bridge::new(Arc::new(|_: &str, _: &[String]| Some("87.0".to_string())));
        assert_eq!(bridge.call_i64("device.getBattery", &[], -1), 87);
    }

    #[test]
    fn calls_are_one_in_flight() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (active.clone(), peak.clone());
        let bridge = Bridge::new(Arc::new(move |_: &str, _: &[String]| {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            a.fetch_sub(1, Ordering::SeqCst);
            None
        }));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let b = bridge.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        b.call("home", &[]);
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().expect("worker");
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
