//! Turning host responses into [`UiNode`]s.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::{
    bridge::{Bridge, decode_json},
    node::{NodeInfo, UiNode},
};

/// Default pause between the tap and the typing of `UiNode::set_text`.
const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Builds nodes bound to a bridge.
///
/// Every node produced here, including nodes returned by navigation on other nodes and nodes
/// embedded as children, carries the same bridge and therefore the same operation set.
#[derive(Debug, Clone)]
pub struct Materializer {
    /// Bridge for follow-up calls.
    bridge: Bridge,
    /// Pause used by `set_text`.
    settle_delay: Duration,
}

impl Materializer {
    /// A materializer with the default settle delay.
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            settle_delay: DEFAULT_SETTLE,
        }
    }

    /// Override the `set_text` settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// The bridge nodes call through.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Settle delay for `set_text`.
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Wrap an already parsed descriptor.
    pub fn node(&self, info: NodeInfo) -> UiNode {
        UiNode::new(info, self.clone())
    }

    /// Materialize one JSON value. Anything but an object describing a node is "no node".
    pub fn from_value(&self, value: Value) -> Option<UiNode> {
        if !value.is_object() {
            return None;
        }
        match serde_json::from_value::<NodeInfo>(value) {
            Ok(info) => Some(self.node(info)),
            Err(err) => {
                debug!(target: "automate::bridge", %err, "node descriptor rejected");
                None
            }
        }
    }

    /// Materialize a single-node answer. Absent, empty, `null` or malformed text is "no node".
    pub fn one(&self, verb: &str, raw: Option<String>) -> Option<UiNode> {
        let value = decode_json(verb, raw.as_deref()?)?;
        self.from_value(value)
    }

    /// Materialize a list answer, element by element. A lone object counts as a one-element
    /// list; anything else is empty.
    pub fn many(&self, verb: &str, raw: Option<String>) -> Vec<UiNode> {
        let Some(value) = raw.as_deref().and_then(|r| decode_json(verb, r)) else {
            return Vec::new();
        };
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| self.from_value(item))
                .collect(),
            obj @ Value::Object(_) => self.from_value(obj).into_iter().collect(),
            _ => Vec::new(),
        }
    }
}
