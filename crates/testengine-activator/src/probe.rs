//! Candidate enumeration and version probing.
//!
//! Discovery is split into the composable capabilities the activator
//! consumes: a [`CandidateSource`] enumerates locations in priority order
//! and a [`VersionProbe`] inspects one location's declared version without
//! executing anything found there. Every per-candidate failure is swallowed
//! and logged at debug level; a location that cannot be probed simply holds
//! no candidate.

use camino::{Utf8Path, Utf8PathBuf};
use semver::Version;

use crate::config::SearchPaths;
use crate::manifest::{ENGINE_MANIFEST, EngineManifest};

/// Enumerates candidate locations in priority order.
pub trait CandidateSource {
    /// Tier-1 location, searched on its own before any fallback.
    fn primary(&self) -> Utf8PathBuf;

    /// Tier-2 locations, searched together once tier 1 yields nothing.
    fn probing(&self) -> Vec<Utf8PathBuf>;
}

impl CandidateSource for SearchPaths {
    fn primary(&self) -> Utf8PathBuf {
        self.base().to_path_buf()
    }

    fn probing(&self) -> Vec<Utf8PathBuf> {
        self.probing_locations().collect()
    }
}

/// An engine deployment found at a candidate location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCandidate {
    location: Utf8PathBuf,
    manifest: EngineManifest,
}

impl EngineCandidate {
    /// Pairs a probed location with its parsed manifest.
    #[must_use]
    pub fn new(location: Utf8PathBuf, manifest: EngineManifest) -> Self {
        Self { location, manifest }
    }

    /// Directory the deployment lives in.
    #[must_use]
    pub fn location(&self) -> &Utf8Path {
        &self.location
    }

    /// Declared engine version.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.manifest.version
    }

    /// Full path of the engine binary.
    #[must_use]
    pub fn binary_path(&self) -> Utf8PathBuf {
        self.location.join(&self.manifest.binary)
    }
}

/// Reads a candidate location's declared version without executing it.
pub trait VersionProbe {
    /// Returns the deployment at `location`, or `None` when the location
    /// holds no readable candidate. Implementations must swallow
    /// per-candidate failures rather than surface them.
    fn probe(&self, location: &Utf8Path) -> Option<EngineCandidate>;
}

/// Manifest-driven probe: a candidate is a directory containing a parseable
/// [`ENGINE_MANIFEST`] sidecar.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestProbe;

impl VersionProbe for ManifestProbe {
    fn probe(&self, location: &Utf8Path) -> Option<EngineCandidate> {
        let dir = cap_std::fs_utf8::Dir::open_ambient_dir(location, cap_std::ambient_authority())
            .map_err(|error| {
                log::debug!("skipping {location}: cannot open directory: {error}");
            })
            .ok()?;
        let raw = dir
            .read_to_string(ENGINE_MANIFEST)
            .map_err(|error| {
                log::debug!("skipping {location}: no readable {ENGINE_MANIFEST}: {error}");
            })
            .ok()?;
        let manifest: EngineManifest = serde_json::from_str(&raw)
            .map_err(|error| {
                log::debug!("skipping {location}: corrupt {ENGINE_MANIFEST}: {error}");
            })
            .ok()?;
        log::debug!(
            "found engine candidate {} v{} at {location}",
            manifest.binary,
            manifest.version
        );
        Some(EngineCandidate::new(location.to_path_buf(), manifest))
    }
}

#[cfg(test)]
mod tests {
    use camino::{Utf8Path, Utf8PathBuf};
    use semver::Version;

    use super::{CandidateSource, EngineCandidate, ManifestProbe, VersionProbe};
    use crate::config::SearchPaths;
    use crate::manifest::EngineManifest;

    #[test]
    fn search_paths_expose_both_tiers() {
        let paths = SearchPaths::new(
            Utf8PathBuf::from("/opt/app"),
            vec![Utf8PathBuf::from("engines")],
        );
        assert_eq!(paths.primary(), Utf8PathBuf::from("/opt/app"));
        assert_eq!(paths.probing(), [Utf8PathBuf::from("/opt/app/engines")]);
    }

    #[test]
    fn missing_directory_probes_as_no_candidate() {
        let probed = ManifestProbe.probe(Utf8Path::new("/nonexistent/testengine"));
        assert_eq!(probed, None);
    }

    #[test]
    fn candidate_resolves_binary_inside_its_location() {
        let candidate = EngineCandidate::new(
            Utf8PathBuf::from("/opt/app/engines"),
            EngineManifest {
                version: Version::new(2, 0, 0),
                binary: "testengine-core".to_owned(),
            },
        );
        assert_eq!(
            candidate.binary_path(),
            Utf8PathBuf::from("/opt/app/engines/testengine-core")
        );
    }
}
