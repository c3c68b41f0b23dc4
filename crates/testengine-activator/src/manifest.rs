//! The deployment manifest describing an engine module.
//!
//! Every engine deployment directory carries a `testengine.json` sidecar, so
//! the activator can learn a candidate's declared version without loading or
//! executing anything from the directory.

use semver::Version;
use serde::Deserialize;

/// File name of the deployment manifest inside a candidate directory.
pub const ENGINE_MANIFEST: &str = "testengine.json";

/// Parsed contents of a deployment manifest.
///
/// # Examples
///
/// ```
/// use testengine_activator::EngineManifest;
///
/// let manifest: EngineManifest =
///     serde_json::from_str(r#"{ "version": "2.1.0", "binary": "testengine-core" }"#)?;
/// assert_eq!(manifest.version.major, 2);
/// assert_eq!(manifest.binary, "testengine-core");
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineManifest {
    /// Declared engine version, used for minimum-version selection.
    pub version: Version,
    /// File name of the engine binary, relative to the manifest's directory.
    pub binary: String,
}
