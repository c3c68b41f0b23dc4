//! Engine handle and runner contracts.
//!
//! Nothing in this crate executes tests; these traits describe the surface a
//! separately-deployed engine module must offer. Concrete handles are
//! obtained through the activator crate.

use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::package::TestPackage;
use crate::xml::XmlError;

/// Verbosity of the engine's internal logging.
///
/// Effective only when set before [`TestEngine::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceLevel {
    /// No internal tracing.
    #[default]
    Off,
    /// Errors only.
    Error,
    /// Errors and warnings.
    Warning,
    /// General progress information.
    Info,
    /// Full diagnostic output.
    Debug,
}

impl TraceLevel {
    /// Canonical spelling, as passed to engine modules.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl FromStr for TraceLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "debug" | "verbose" => Ok(Self::Debug),
            _ => Err(EngineError::InvalidTraceLevel(s.to_owned())),
        }
    }
}

/// Operational failures raised through the engine handle.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A runner was requested before [`TestEngine::initialize`] succeeded.
    #[error("engine has not been initialised")]
    NotInitialized,
    /// A trace-level spelling was not recognized.
    #[error("unknown trace level '{0}', expected one of: off, error, warning, info, debug")]
    InvalidTraceLevel(String),
    /// The engine reported a failing operation.
    #[error("engine operation `{operation}` failed: {details}")]
    Operation {
        /// Name of the failing operation.
        operation: &'static str,
        /// Engine-reported failure text.
        details: String,
    },
    /// The package handed to the engine could not be serialized.
    #[error(transparent)]
    Package(#[from] XmlError),
    /// Launching or talking to the engine module failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Handle on an engine instance.
///
/// Lifecycle is caller-driven: `initialize`, use, `shutdown`. Wrap the
/// handle in an [`EngineSession`] for guaranteed shutdown on every exit
/// path. `initialize` is meaningful at most once per handle; the
/// work-directory and trace-level knobs take effect only when set before it.
pub trait TestEngine {
    /// Prepares the engine for use.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine module cannot be readied.
    fn initialize(&mut self) -> Result<(), EngineError>;

    /// Releases the engine's resources. Idempotent.
    fn shutdown(&mut self);

    /// Directory the engine uses for run artefacts.
    fn work_directory(&self) -> &Utf8Path;

    /// Replaces the work directory. Effective only before `initialize`.
    fn set_work_directory(&mut self, directory: Utf8PathBuf);

    /// Current internal trace level.
    fn trace_level(&self) -> TraceLevel;

    /// Replaces the trace level. Effective only before `initialize`.
    fn set_trace_level(&mut self, level: TraceLevel);

    /// Acquires a runner bound to `package`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInitialized`] before a successful
    /// `initialize`, or any failure preparing the runner.
    fn runner(&mut self, package: &TestPackage) -> Result<Box<dyn TestRunner>, EngineError>;
}

/// Handle capable of discovery and execution against one bound package.
///
/// Each operation yields the engine's XML report text.
pub trait TestRunner {
    /// Lists the tests contained in the bound package.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine fails or cannot be reached.
    fn discover(&mut self) -> Result<String, EngineError>;

    /// Produces the full test hierarchy of the bound package.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine fails or cannot be reached.
    fn explore(&mut self) -> Result<String, EngineError>;

    /// Executes the bound package's tests.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine fails or cannot be reached.
    fn run(&mut self) -> Result<String, EngineError>;
}

/// Scoped engine acquisition: initializes on entry, shuts down on drop.
///
/// # Examples
///
/// ```no_run
/// use testengine_api::{EngineSession, TestEngine};
///
/// fn use_engine(engine: Box<dyn TestEngine>) -> Result<(), testengine_api::EngineError> {
///     let session = EngineSession::start(engine)?;
///     let _ = session.trace_level();
///     Ok(())
/// } // shutdown runs here, also on the error path
/// ```
pub struct EngineSession {
    engine: Box<dyn TestEngine>,
}

impl EngineSession {
    /// Initializes `engine` and wraps it for scoped use.
    ///
    /// # Errors
    ///
    /// Returns the initialization failure; the engine is shut down before
    /// the error propagates.
    pub fn start(mut engine: Box<dyn TestEngine>) -> Result<Self, EngineError> {
        if let Err(error) = engine.initialize() {
            engine.shutdown();
            return Err(error);
        }
        Ok(Self { engine })
    }
}

impl std::ops::Deref for EngineSession {
    type Target = dyn TestEngine;

    fn deref(&self) -> &Self::Target {
        self.engine.as_ref()
    }
}

impl std::ops::DerefMut for EngineSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.engine.as_mut()
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::sync::atomic::{AtomicU8, Ordering};

    use camino::{Utf8Path, Utf8PathBuf};
    use rstest::rstest;

    use super::{EngineError, EngineSession, TestEngine, TestRunner, TraceLevel};
    use crate::package::TestPackage;

    struct FakeEngine {
        shutdowns: Rc<AtomicU8>,
        fail_initialize: bool,
        work_directory: Utf8PathBuf,
        trace_level: TraceLevel,
    }

    impl FakeEngine {
        fn new(shutdowns: Rc<AtomicU8>, fail_initialize: bool) -> Self {
            Self {
                shutdowns,
                fail_initialize,
                work_directory: Utf8PathBuf::from("."),
                trace_level: TraceLevel::Off,
            }
        }
    }

    impl TestEngine for FakeEngine {
        fn initialize(&mut self) -> Result<(), EngineError> {
            if self.fail_initialize {
                return Err(EngineError::NotInitialized);
            }
            Ok(())
        }

        fn shutdown(&mut self) {
            self.shutdowns.fetch_add(1, Ordering::Relaxed);
        }

        fn work_directory(&self) -> &Utf8Path {
            &self.work_directory
        }

        fn set_work_directory(&mut self, directory: Utf8PathBuf) {
            self.work_directory = directory;
        }

        fn trace_level(&self) -> TraceLevel {
            self.trace_level
        }

        fn set_trace_level(&mut self, level: TraceLevel) {
            self.trace_level = level;
        }

        fn runner(&mut self, _package: &TestPackage) -> Result<Box<dyn TestRunner>, EngineError> {
            Err(EngineError::NotInitialized)
        }
    }

    #[rstest]
    #[case("off", TraceLevel::Off)]
    #[case("WARN", TraceLevel::Warning)]
    #[case("warning", TraceLevel::Warning)]
    #[case("verbose", TraceLevel::Debug)]
    #[case("Info", TraceLevel::Info)]
    fn trace_level_parses_known_spellings(#[case] input: &str, #[case] expected: TraceLevel) {
        assert_eq!(input.parse::<TraceLevel>().ok(), Some(expected));
    }

    #[test]
    fn trace_level_rejects_unknown_spellings() {
        let result = "chatty".parse::<TraceLevel>();
        assert!(matches!(
            result,
            Err(EngineError::InvalidTraceLevel(value)) if value == "chatty"
        ));
    }

    #[test]
    fn session_shuts_engine_down_on_drop() {
        let shutdowns = Rc::new(AtomicU8::new(0));
        {
            let engine = Box::new(FakeEngine::new(Rc::clone(&shutdowns), false));
            let session = EngineSession::start(engine);
            assert!(session.is_ok());
        }
        assert_eq!(shutdowns.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn failed_initialize_still_shuts_down() {
        let shutdowns = Rc::new(AtomicU8::new(0));
        let engine = Box::new(FakeEngine::new(Rc::clone(&shutdowns), true));
        let session = EngineSession::start(engine);
        assert!(session.is_err());
        assert_eq!(shutdowns.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn session_shuts_engine_down_when_a_panic_unwinds() {
        let shutdowns = Rc::new(AtomicU8::new(0));
        let engine = Box::new(FakeEngine::new(Rc::clone(&shutdowns), false));
        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _session = EngineSession::start(engine);
            panic!("caller blew up mid-session");
        }));
        assert!(unwound.is_err());
        assert_eq!(shutdowns.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn session_exposes_engine_knobs() {
        let shutdowns = Rc::new(AtomicU8::new(0));
        let engine = Box::new(FakeEngine::new(shutdowns, false));
        let Ok(mut session) = EngineSession::start(engine) else {
            unreachable!("session start cannot fail for a non-failing fake");
        };
        session.set_trace_level(TraceLevel::Info);
        assert_eq!(session.trace_level(), TraceLevel::Info);
        session.set_work_directory(Utf8PathBuf::from("/tmp/run"));
        assert_eq!(session.work_directory(), Utf8Path::new("/tmp/run"));
    }
}
