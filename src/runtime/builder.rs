//! Build a runtime.
//!
//! The runtime is started lazily with default settings the first time it's used. A
//! [`RuntimeBuilder`] can be used to start it explicitly with custom settings, this must happen
//! before anything else uses the runtime.

use super::{Runtime, RUNTIME};
use crate::error::{MarshalResult, RuntimeError};

/// The default number of allocations between two automatic collections.
pub const DEFAULT_COLLECT_INTERVAL: usize = 4096;

/// Build the runtime.
///
/// With this builder you can set how often the garbage collector runs automatically. To start
/// the runtime you must call [`RuntimeBuilder::start`].
#[derive(Clone, Debug)]
pub struct RuntimeBuilder {
    pub(crate) collect_interval: Option<usize>,
}

impl RuntimeBuilder {
    /// Create a new `RuntimeBuilder` with the default settings.
    pub fn new() -> Self {
        RuntimeBuilder {
            collect_interval: Some(DEFAULT_COLLECT_INTERVAL),
        }
    }

    /// Set the number of allocations after which a collection is triggered.
    ///
    /// If it's set to `None` the garbage collector only runs when a collection is forced or GC
    /// stress mode is enabled.
    pub fn collect_interval(mut self, interval: Option<usize>) -> Self {
        self.collect_interval = interval;
        self
    }

    /// Start the runtime.
    ///
    /// Returns an error if the runtime has already been started, either explicitly or by using
    /// it.
    pub fn start(self) -> MarshalResult<&'static Runtime> {
        let mut started = false;
        let runtime = RUNTIME.get_or_init(|| {
            started = true;
            Runtime::new(&self)
        });

        if started {
            Ok(runtime)
        } else {
            Err(RuntimeError::AlreadyInitialized)?
        }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
