//! Tiered engine selection and the public activation entry points.

use camino::Utf8PathBuf;
use semver::Version;
use testengine_api::TestEngine;
use thiserror::Error;

use crate::config::SearchPaths;
use crate::probe::{CandidateSource, EngineCandidate, ManifestProbe, VersionProbe};
use crate::process::{EngineLauncher, ProcessLauncher};

/// Minimum engine version required by [`create_instance`].
#[must_use]
pub fn default_minimum_version() -> Version {
    Version::new(1, 0, 0)
}

/// Failures surfaced by engine activation.
///
/// Per-candidate probing failures never appear here; they only reduce the
/// candidate set.
#[derive(Debug, Error)]
pub enum ActivatorError {
    /// No deployment meeting the minimum version exists in any search tier.
    #[error("no test engine with version {required} or newer was found in any search location")]
    NotFound {
        /// The minimum version the search required.
        required: Version,
    },
    /// A selected deployment could not be instantiated.
    #[error("failed to load the test engine from {path}")]
    Load {
        /// Path of the module that failed to load.
        path: Utf8PathBuf,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Composes candidate enumeration, version probing, and launching into the
/// locate-and-instantiate routine.
///
/// The three collaborators are generic so tests (and embedders with unusual
/// deployment layouts) can swap any of them independently.
#[derive(Debug)]
pub struct EngineActivator<S, P, L> {
    source: S,
    probe: P,
    launcher: L,
}

impl EngineActivator<SearchPaths, ManifestProbe, ProcessLauncher> {
    /// The production wiring: environment-derived search paths, manifest
    /// probing, out-of-process launching.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(SearchPaths::from_env(), ManifestProbe, ProcessLauncher)
    }
}

impl<S, P, L> EngineActivator<S, P, L>
where
    S: CandidateSource,
    P: VersionProbe,
    L: EngineLauncher,
{
    /// Composes an activator from explicit collaborators.
    #[must_use]
    pub fn new(source: S, probe: P, launcher: L) -> Self {
        Self {
            source,
            probe,
            launcher,
        }
    }

    /// Locates the newest deployment with version `minimum` or newer and
    /// launches it.
    ///
    /// # Errors
    ///
    /// Returns [`ActivatorError::NotFound`] when no search tier holds a
    /// qualifying deployment, or [`ActivatorError::Load`] when the selected
    /// deployment fails to instantiate.
    pub fn create(&self, minimum: &Version) -> Result<Box<dyn TestEngine>, ActivatorError> {
        let candidate = self.locate(minimum)?;
        log::info!(
            "selected engine v{} at {}",
            candidate.version(),
            candidate.location()
        );
        self.launcher.launch(&candidate)
    }

    /// Runs the tiered search: a qualifying tier-1 candidate wins outright;
    /// otherwise the highest qualifying version across tier 2 is selected.
    fn locate(&self, minimum: &Version) -> Result<EngineCandidate, ActivatorError> {
        if let Some(primary) = self.best_of(std::iter::once(self.source.primary()), minimum) {
            return Ok(primary);
        }
        self.best_of(self.source.probing().into_iter(), minimum)
            .ok_or_else(|| ActivatorError::NotFound {
                required: minimum.clone(),
            })
    }

    fn best_of(
        &self,
        locations: impl Iterator<Item = Utf8PathBuf>,
        minimum: &Version,
    ) -> Option<EngineCandidate> {
        let mut best: Option<EngineCandidate> = None;
        for location in locations {
            let Some(candidate) = self.probe.probe(&location) else {
                continue;
            };
            if candidate.version() < minimum {
                log::debug!(
                    "ignoring engine v{} at {location}: below required v{minimum}",
                    candidate.version()
                );
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|current| candidate.version() > current.version())
            {
                best = Some(candidate);
            }
        }
        best
    }
}

/// Locates and launches an engine meeting [`default_minimum_version`].
///
/// # Errors
///
/// Returns [`ActivatorError::NotFound`] when no qualifying deployment
/// exists, or [`ActivatorError::Load`] when instantiation fails.
pub fn create_instance() -> Result<Box<dyn TestEngine>, ActivatorError> {
    create_instance_with_minimum(&default_minimum_version())
}

/// Locates and launches an engine meeting an explicit minimum version.
///
/// # Errors
///
/// Returns [`ActivatorError::NotFound`] when no qualifying deployment
/// exists, or [`ActivatorError::Load`] when instantiation fails.
pub fn create_instance_with_minimum(
    minimum: &Version,
) -> Result<Box<dyn TestEngine>, ActivatorError> {
    EngineActivator::from_env().create(minimum)
}
