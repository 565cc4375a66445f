//! The host capability seam.
//!
//! The engine never talks to a concrete host type. Everything effectful is requested through
//! [`HostCapability::call`], which takes a verb string and string arguments and answers with an
//! optional string.

/// Capability injected by the embedding application to answer script requests.
///
/// Return conventions:
/// - boolean results use the literal tokens `"true"` / `"false"`
/// - structured results are JSON text
/// - `None` means the host declined or has nothing to answer
///
/// Implementations are invoked from the script thread and block it until they return. The
/// bridge never invokes one capability from two threads at once.
pub trait HostCapability: Send + Sync {
    /// Answer a single bridge request.
    fn call(&self, verb: &str, args: &[String]) -> Option<String>;
}

impl<F> HostCapability for F
where
    F: Fn(&str, &[String]) -> Option<String> + Send + Sync,
{
    fn call(&self, verb: &str, args: &[String]) -> Option<String> {
        self(verb, args)
    }
}
