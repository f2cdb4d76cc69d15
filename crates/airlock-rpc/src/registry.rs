use std::collections::HashMap;
use std::sync::Arc;

use airlock_wire::Value;
use tracing::debug;

/// A method failure, reported to the caller verbatim as the response `error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CallError(pub String);

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

pub type CallResult = std::result::Result<Value, CallError>;

/// A resolved method: positional arguments in, value or failure out.
pub type Callable = dyn Fn(&[Value]) -> CallResult + Send + Sync;

/// Resolution of method names to callables.
///
/// Lookup is by exact name and has no side effects, found or not.
pub trait Resolve {
    /// The callable registered under `method`, if any.
    fn resolve(&self, method: &str) -> Option<&Callable>;

    /// Names of every method that resolves, sorted. Used for diagnostics.
    fn method_names(&self) -> Vec<&str>;
}

impl<R: Resolve + ?Sized> Resolve for Arc<R> {
    fn resolve(&self, method: &str) -> Option<&Callable> {
        (**self).resolve(method)
    }

    fn method_names(&self) -> Vec<&str> {
        (**self).method_names()
    }
}

/// An implementation object that installs its methods into a [`Registry`].
///
/// The registered closures hold the `Arc`, so one handler instance backs
/// every method it exposes.
pub trait Handler: Send + Sync + 'static {
    fn register(self: Arc<Self>, registry: &mut Registry);
}

/// Startup-time table of named callables.
#[derive(Default)]
pub struct Registry {
    methods: HashMap<String, Box<Callable>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry holding every method `handler` exposes.
    pub fn from_handler<H: Handler>(handler: H) -> Self {
        let mut registry = Self::new();
        Arc::new(handler).register(&mut registry);
        registry
    }

    /// Register `f` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&[Value]) -> CallResult + Send + Sync + 'static,
    {
        let name = name.into();
        if self.methods.insert(name.clone(), Box::new(f)).is_some() {
            debug!(method = %name, "replaced registered method");
        }
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl Resolve for Registry {
    fn resolve(&self, method: &str) -> Option<&Callable> {
        self.methods.get(method).map(|f| f.as_ref())
    }

    fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("methods", &self.method_names())
            .finish()
    }
}
