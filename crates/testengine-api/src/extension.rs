//! Extension-point markers consumed by the engine's extension host.

/// Capability tag for pluggable project loaders.
///
/// Implementing this trait identifies a type to the engine's external
/// extension host as a project-loader plugin: a component that can expand a
/// project file into the test assemblies it contains. The host, not this
/// crate, discovers, instantiates, and invokes registered loaders; the
/// trait itself deliberately declares no behaviour.
///
/// The `Send + Sync` bounds let hosts hold registrations behind shared
/// references.
pub trait ProjectLoader: Send + Sync {}

#[cfg(test)]
mod tests {
    use super::ProjectLoader;

    struct SolutionProjectLoader;

    impl ProjectLoader for SolutionProjectLoader {}

    #[test]
    fn loaders_can_live_behind_shared_references() {
        fn registered(_: &dyn ProjectLoader) {}
        registered(&SolutionProjectLoader);
    }
}
