//! Error types for configuration loading and script evaluation.

use std::{
    cmp::{max, min},
    fmt::Write as _,
    io,
    path::PathBuf,
    result::Result as StdResult,
};

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Errors produced outside of script evaluation.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading a file from disk failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An engine configuration file did not parse.
    #[error("invalid engine config: {0}")]
    Config(String),
}

/// Errors produced by [`crate::Engine::evaluate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// `evaluate` was called before `initialize` or after `destroy`.
    #[error("Error: Engine not initialized")]
    NotInitialized,

    /// Another evaluation is already running on this engine.
    #[error("Error: Engine busy")]
    Busy,

    /// The evaluation was aborted by an interrupt request.
    #[error("Error: Script interrupted")]
    Cancelled,

    /// The script called `exit()`.
    #[error("Script exited")]
    Exited,

    /// An uncaught script error, including parse errors and resource limits.
    #[error("{message}")]
    Script {
        /// Human-readable error message.
        message: String,
        /// Name of the source the error occurred in.
        source_name: String,
        /// Optional 1-based line number.
        line: Option<usize>,
        /// Optional 1-based column number.
        col: Option<usize>,
        /// Optional excerpt including a caret at the error location.
        excerpt: Option<String>,
        /// Best-effort call chain, innermost first.
        stack: Vec<String>,
    },
}

impl EvalError {
    /// Render a human-friendly error message including location and an excerpt when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Script {
                message,
                source_name,
                line,
                col,
                excerpt,
                stack,
            } => {
                let loc = match (line, col) {
                    (Some(l), Some(c)) => format!("{}:{}:{}", source_name, l, c),
                    (Some(l), None) => format!("{}:{}", source_name, l),
                    _ => source_name.clone(),
                };
                let mut out = format!("Script error at {}\n{}", loc, message);
                if let Some(ex) = excerpt {
                    out.push('\n');
                    out.push_str(ex.trim_end());
                }
                for frame in stack {
                    let _ignored = write!(out, "\n    in {}", frame);
                }
                out
            }
            other => other.to_string(),
        }
    }

    /// Whether the error represents a cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Build a small 2-3 line excerpt with a caret at `(line_no, col_no)`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len();
    let start = max(1usize, line_no.saturating_sub(2));
    let end = min(total, line_no + 1);

    let mut out = String::new();
    for n in start..=end {
        let text = lines.get(n - 1).copied().unwrap_or("");
        let _ignored = writeln!(out, " {:>4} | {}", n, text);
        if n == line_no {
            let prefix = format!(" {:>4} | ", n);
            let _ignored = writeln!(
                out,
                "{}{}^",
                " ".repeat(prefix.len()),
                " ".repeat(col_no.saturating_sub(1))
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_marks_column() {
        let src = "let a = 1;\nlet b = ;\nlet c = 3;";
        let ex = excerpt_at(src, 2, 9);
        assert!(ex.contains("   2 | let b = ;"));
        let caret_line = ex
            .lines()
            .find(|l| l.trim_end().ends_with('^'))
            .expect("caret line");
        // 8-char gutter, 8 columns of padding, then the caret.
        assert_eq!(caret_line.len(), 17);
    }

    #[test]
    fn pretty_includes_location_and_stack() {
        let err = EvalError::Script {
            message: "boom".to_string(),
            source_name: "main.rhai".to_string(),
            line: Some(3),
            col: Some(5),
            excerpt: None,
            stack: vec!["helper".to_string()],
        };
        let text = err.pretty();
        assert!(text.starts_with("Script error at main.rhai:3:5\nboom"));
        assert!(text.ends_with("in helper"));
    }

    #[test]
    fn non_script_errors_render_plainly() {
        assert_eq!(EvalError::Cancelled.pretty(), "Error: Script interrupted");
        assert!(EvalError::Cancelled.is_cancelled());
        assert!(!EvalError::Exited.is_cancelled());
    }
}
