//! A host capability that replays canned answers from a JSON fixture.

use std::{
    collections::{HashMap, VecDeque},
    fs, io,
    path::{Path, PathBuf},
};

use automate_engine::HostCapability;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

/// Errors loading a fixture file.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The file could not be read.
    #[error("failed to read fixture {path}: {source}")]
    Read {
        /// Fixture path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file is not a JSON object of verb answers.
    #[error("invalid fixture: {0}")]
    Parse(String),
}

/// Replays answers keyed by verb.
///
/// A fixture is a JSON object mapping each verb to either one answer or a list of answers.
/// Lists are consumed in order and their last entry repeats. String answers are passed through
/// verbatim; any other JSON value is sent as its JSON text. Verbs missing from the fixture answer
/// `None`.
#[derive(Debug, Default)]
pub struct FixtureHost {
    /// Remaining answers per verb.
    answers: Mutex<HashMap<String, VecDeque<String>>>,
}

impl FixtureHost {
    /// Parse fixture JSON text.
    pub fn from_json(text: &str) -> Result<Self, FixtureError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FixtureError::Parse(e.to_string()))?;
        let Value::Object(entries) = value else {
            return Err(FixtureError::Parse(
                "expected an object mapping verbs to answers".to_string(),
            ));
        };
        let answers = entries
            .into_iter()
            .map(|(verb, value)| {
                let queue = match value {
                    Value::Array(items) => items.into_iter().map(answer_text).collect(),
                    other => VecDeque::from([answer_text(other)]),
                };
                (verb, queue)
            })
            .collect();
        Ok(Self {
            answers: Mutex::new(answers),
        })
    }

    /// Read and parse a fixture file.
    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// Text sent to the engine for one fixture answer.
fn answer_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl HostCapability for FixtureHost {
    fn call(&self, verb: &str, args: &[String]) -> Option<String> {
        let mut answers = self.answers.lock();
        let answer = answers.get_mut(verb).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });
        info!(target: "automate::host", verb, ?args, ?answer, "host call");
        answer
    }
}
