//! Search-path configuration for engine discovery.
//!
//! Candidate locations come in two tiers: the application base directory,
//! then each entry of a semicolon-delimited probing-path list taken from the
//! `TESTENGINE_PROBING_PATH` environment variable. Parsing is a pure
//! function so tests never have to mutate the process environment.

use std::env;

use camino::{Utf8Path, Utf8PathBuf};

/// Environment variable holding the semicolon-delimited probing-path list.
pub const PROBING_PATH_ENV: &str = "TESTENGINE_PROBING_PATH";

/// Tiered candidate locations for engine discovery.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use testengine_activator::SearchPaths;
///
/// let paths = SearchPaths::new(
///     Utf8PathBuf::from("/opt/app"),
///     vec![Utf8PathBuf::from("engines"), Utf8PathBuf::from("fallback")],
/// );
/// assert_eq!(paths.base(), "/opt/app");
/// let probing: Vec<_> = paths.probing_locations().collect();
/// assert_eq!(probing, ["/opt/app/engines", "/opt/app/fallback"]);
/// ```
#[derive(Debug, Clone)]
pub struct SearchPaths {
    base: Utf8PathBuf,
    probing: Vec<Utf8PathBuf>,
}

impl SearchPaths {
    /// Creates a configuration from an explicit base directory and probing
    /// entries. Relative entries resolve against the base; absolute entries
    /// stand alone.
    #[must_use]
    pub fn new(base: Utf8PathBuf, probing: Vec<Utf8PathBuf>) -> Self {
        Self { base, probing }
    }

    /// Builds the default configuration: the running executable's directory
    /// as the base, probing entries from [`PROBING_PATH_ENV`].
    ///
    /// Resolution failures fall back to the current directory; discovery
    /// treats an unusable location as simply holding no candidate.
    #[must_use]
    pub fn from_env() -> Self {
        let base = application_base();
        let probing = env::var(PROBING_PATH_ENV)
            .map(|raw| parse_probing_paths(&raw))
            .unwrap_or_default();
        Self { base, probing }
    }

    /// The application base directory (tier-1 search location).
    #[must_use]
    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    /// Tier-2 locations in priority order, resolved against the base.
    pub fn probing_locations(&self) -> impl Iterator<Item = Utf8PathBuf> {
        self.probing.iter().map(|entry| self.base.join(entry))
    }
}

/// Splits a semicolon-delimited probing list, dropping empty entries.
#[must_use]
pub fn parse_probing_paths(raw: &str) -> Vec<Utf8PathBuf> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(Utf8PathBuf::from)
        .collect()
}

fn application_base() -> Utf8PathBuf {
    let resolved = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(std::path::Path::to_path_buf))
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
    resolved.unwrap_or_else(|| {
        log::warn!("could not resolve the application base directory, using '.'");
        Utf8PathBuf::from(".")
    })
}
