//! Test support utilities for automate-engine unit and integration tests.
//! These helpers are public so integration tests and embedders' tests can share them.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{bridge::Bridge, host::HostCapability};

/// One recorded bridge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Verb requested.
    pub verb: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

/// Shared state behind a [`RecordingHost`].
#[derive(Default)]
struct Recorder {
    /// Every call, oldest first.
    calls: Vec<Call>,
    /// Canned answers per verb, consumed in order; the last one repeats.
    answers: HashMap<String, VecDeque<String>>,
}

/// A host capability that records every request and answers from a per-verb table.
///
/// Verbs without an answer respond with `None`. Clones share the same record.
#[derive(Clone, Default)]
pub struct RecordingHost {
    /// Shared record.
    inner: Arc<Mutex<Recorder>>,
}

impl RecordingHost {
    /// A host with no answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `answer` for `verb`.
    #[must_use]
    pub fn respond(self, verb: &str, answer: &str) -> Self {
        self.inner
            .lock()
            .answers
            .entry(verb.to_string())
            .or_default()
            .push_back(answer.to_string());
        self
    }

    /// Recorded calls, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    /// Recorded calls for `verb`.
    pub fn calls_to(&self, verb: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.verb == verb).collect()
    }

    /// Verbs of the recorded calls, oldest first.
    pub fn verbs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.verb).collect()
    }

    /// Forget recorded calls, keeping answers.
    pub fn clear(&self) {
        self.inner.lock().calls.clear();
    }

    /// This host as a shareable capability.
    pub fn capability(&self) -> Arc<dyn HostCapability> {
        Arc::new(self.clone())
    }

    /// A bridge attached to this host.
    pub fn bridge(&self) -> Bridge {
        Bridge::new(self.capability())
    }
}

impl HostCapability for RecordingHost {
    fn call(&self, verb: &str, args: &[String]) -> Option<String> {
        let mut rec = self.inner.lock();
        rec.calls.push(Call {
            verb: verb.to_string(),
            args: args.to_vec(),
        });
        let queue = rec.answers.get_mut(verb)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}
