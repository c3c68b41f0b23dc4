//! Engine activation for the testengine contract surface.
//!
//! The engine implementing test discovery and execution is deployed
//! separately from the programs that drive it. This crate finds such a
//! deployment, checks its declared version against a minimum without
//! executing it, and launches the newest qualifying module out of process,
//! returning it behind the [`testengine_api::TestEngine`] contract.
//!
//! Search order is the application base directory first, then each entry of
//! the semicolon-delimited `TESTENGINE_PROBING_PATH` list. A location that
//! cannot be probed is skipped silently; the only aggregate failure is
//! [`ActivatorError::NotFound`].

mod activator;
mod config;
mod manifest;
mod probe;
mod process;

pub use activator::{
    ActivatorError, EngineActivator, create_instance, create_instance_with_minimum,
    default_minimum_version,
};
pub use config::{PROBING_PATH_ENV, SearchPaths, parse_probing_paths};
pub use manifest::{ENGINE_MANIFEST, EngineManifest};
pub use probe::{CandidateSource, EngineCandidate, ManifestProbe, VersionProbe};
pub use process::{EngineLauncher, ProcessEngine, ProcessLauncher};
