//! Out-of-process realization of the engine contracts.
//!
//! The selected module is never loaded into the caller: every runner
//! operation invokes the module's binary as a child process, handing the
//! serialized package over through a temporary file and collecting the
//! engine's XML report from its standard output.

use std::io::Write;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;
use tempfile::NamedTempFile;
use testengine_api::{EngineError, TestEngine, TestPackage, TestRunner, TraceLevel};

use crate::activator::ActivatorError;
use crate::probe::EngineCandidate;

/// Instantiates a selected candidate in an execution context separate from
/// the caller.
pub trait EngineLauncher {
    /// Produces an engine handle for `candidate`.
    ///
    /// # Errors
    ///
    /// Returns [`ActivatorError::Load`] when the candidate cannot be
    /// instantiated.
    fn launch(&self, candidate: &EngineCandidate) -> Result<Box<dyn TestEngine>, ActivatorError>;
}

/// Default launcher: wraps the candidate's binary in a [`ProcessEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl EngineLauncher for ProcessLauncher {
    fn launch(&self, candidate: &EngineCandidate) -> Result<Box<dyn TestEngine>, ActivatorError> {
        let binary = candidate.binary_path();
        if !binary.is_file() {
            return Err(ActivatorError::Load {
                path: binary,
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "manifest names a binary that is not present",
                )),
            });
        }
        Ok(Box::new(ProcessEngine::new(
            binary,
            candidate.version().clone(),
        )))
    }
}

/// Engine handle backed by a deployed engine binary.
pub struct ProcessEngine {
    binary: Utf8PathBuf,
    version: Version,
    work_directory: Utf8PathBuf,
    trace_level: TraceLevel,
    initialized: bool,
}

impl ProcessEngine {
    /// Wraps a known engine binary without probing.
    #[must_use]
    pub fn new(binary: Utf8PathBuf, version: Version) -> Self {
        let work_directory = std::env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .unwrap_or_else(|| Utf8PathBuf::from("."));
        Self {
            binary,
            version,
            work_directory,
            trace_level: TraceLevel::default(),
            initialized: false,
        }
    }

    /// Version declared by the wrapped module.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl TestEngine for ProcessEngine {
    fn initialize(&mut self) -> Result<(), EngineError> {
        if self.initialized {
            return Ok(());
        }
        if !self.binary.is_file() {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("engine binary {} is missing", self.binary),
            )));
        }
        log::info!(
            "initialised engine {} v{} (workdir {}, trace {})",
            self.binary,
            self.version,
            self.work_directory,
            self.trace_level.as_str()
        );
        self.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.initialized {
            log::debug!("shut down engine {}", self.binary);
            self.initialized = false;
        }
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

    fn runner(&mut self, package: &TestPackage) -> Result<Box<dyn TestRunner>, EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        let xml = package.to_xml()?;
        let mut package_file = tempfile::Builder::new()
            .prefix("testengine-package-")
            .suffix(".xml")
            .tempfile()?;
        package_file.write_all(xml.as_bytes())?;
        package_file.flush()?;
        Ok(Box::new(ProcessRunner {
            binary: self.binary.clone(),
            package_file,
            work_directory: self.work_directory.clone(),
            trace_level: self.trace_level,
        }))
    }
}

/// Runner bound to one serialized package; each operation is one child
/// process invocation of the engine binary.
struct ProcessRunner {
    binary: Utf8PathBuf,
    package_file: NamedTempFile,
    work_directory: Utf8PathBuf,
    trace_level: TraceLevel,
}

impl ProcessRunner {
    fn invoke(&self, operation: &'static str) -> Result<String, EngineError> {
        log::debug!("invoking {} {operation}", self.binary);
        let output = Command::new(self.binary.as_str())
            .arg(operation)
            .arg("--package")
            .arg(self.package_file.path())
            .arg("--workdir")
            .arg(self.work_directory.as_str())
            .arg("--trace")
            .arg(self.trace_level.as_str())
            .output()?;
        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|_| EngineError::Operation {
                operation,
                details: "engine produced a non-UTF-8 report".to_owned(),
            })
        } else {
            Err(EngineError::Operation {
                operation,
                details: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

impl TestRunner for ProcessRunner {
    fn discover(&mut self) -> Result<String, EngineError> {
        self.invoke("discover")
    }

    fn explore(&mut self) -> Result<String, EngineError> {
        self.invoke("explore")
    }

    fn run(&mut self) -> Result<String, EngineError> {
        self.invoke("run")
    }
}
