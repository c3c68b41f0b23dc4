//! The hierarchical test-package value object.
//!
//! A [`TestPackage`] wraps either a single file path or serves as a virtual
//! grouping container whose children each wrap one file. The top-level node
//! exclusively owns its subtree; collaborators read the tree extensively and
//! mutate it only through settings additions and child appends, which the
//! caller must serialize.

use camino::{Utf8Path, Utf8PathBuf};

use crate::id::IdAllocator;
use crate::settings::{FromSetting, SettingError, SettingValue, Settings};

/// File extensions treated as directly loadable binary test modules.
const ASSEMBLY_EXTENSIONS: [&str; 2] = ["dll", "exe"];

/// A node in the test-package tree.
///
/// # Examples
///
/// ```
/// use testengine_api::{IdAllocator, TestPackage};
///
/// let ids = IdAllocator::new();
/// let root = TestPackage::from_files_with(&ids, ["a.dll", "sub/b.exe"]);
/// assert!(root.full_path().is_none());
/// assert_eq!(root.sub_packages().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPackage {
    id: String,
    full_path: Option<Utf8PathBuf>,
    settings: Settings,
    sub_packages: Vec<TestPackage>,
}

impl TestPackage {
    /// Creates a path-less node with no settings and no children, using the
    /// process-wide identifier allocator.
    #[must_use]
    pub fn empty() -> Self {
        Self::empty_with(IdAllocator::process_default())
    }

    /// Creates a path-less node with an identifier from `ids`.
    #[must_use]
    pub fn empty_with(ids: &IdAllocator) -> Self {
        Self {
            id: ids.next_id(),
            full_path: None,
            settings: Settings::new(),
            sub_packages: Vec::new(),
        }
    }

    /// Creates a node wrapping a single file, resolving `name` to an
    /// absolute path. The file is not required to exist.
    #[must_use]
    pub fn from_file(name: &str) -> Self {
        Self::from_file_with(IdAllocator::process_default(), name)
    }

    /// Creates a single-file node with an identifier from `ids`.
    #[must_use]
    pub fn from_file_with(ids: &IdAllocator, name: &str) -> Self {
        let mut package = Self::empty_with(ids);
        package.full_path = Some(absolute_path(name));
        package
    }

    /// Creates a virtual root wrapping one child per input file name, in
    /// input order. Duplicates and nonexistent paths are permitted.
    #[must_use]
    pub fn from_files<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_files_with(IdAllocator::process_default(), files)
    }

    /// Creates a virtual root as [`TestPackage::from_files`], drawing
    /// identifiers from `ids` (root first, then children in input order).
    #[must_use]
    pub fn from_files_with<I, S>(ids: &IdAllocator, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut root = Self::empty_with(ids);
        for file in files {
            root.sub_packages.push(Self::from_file_with(ids, file.as_ref()));
        }
        root
    }

    /// Constructs a node with a restored identifier. Deserialization support.
    pub(crate) fn with_id(id: String) -> Self {
        Self {
            id,
            full_path: None,
            settings: Settings::new(),
            sub_packages: Vec::new(),
        }
    }

    /// The node's unique identifier. Immutable once assigned.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Absolute path of the wrapped file, or `None` for a virtual node.
    #[must_use]
    pub fn full_path(&self) -> Option<&Utf8Path> {
        self.full_path.as_deref()
    }

    pub(crate) fn set_full_path(&mut self, path: Utf8PathBuf) {
        self.full_path = Some(path);
    }

    /// File-name portion of the path, or `None` for a virtual node.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.full_path.as_deref().and_then(Utf8Path::file_name)
    }

    /// Whether the wrapped file is a binary test module (`.dll` or `.exe`,
    /// case-insensitive). Always false for virtual nodes.
    #[must_use]
    pub fn is_assembly_package(&self) -> bool {
        self.full_path
            .as_deref()
            .and_then(Utf8Path::extension)
            .is_some_and(|ext| {
                ASSEMBLY_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
    }

    /// The node's own settings, in insertion order.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable access to this node's own settings.
    ///
    /// Changes made here affect only this node; use
    /// [`TestPackage::add_setting`] to push a value down the subtree.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Ordered child packages.
    #[must_use]
    pub fn sub_packages(&self) -> &[Self] {
        &self.sub_packages
    }

    /// Appends an existing node as a child.
    ///
    /// The child receives a copy of every setting currently on this node,
    /// overwriting colliding keys in the child.
    pub fn add_subpackage(&mut self, mut package: Self) {
        package.settings.extend_from(&self.settings);
        self.sub_packages.push(package);
    }

    /// Appends a child, preserving the child's settings verbatim.
    /// Deserialization support.
    pub(crate) fn append_child(&mut self, child: Self) {
        self.sub_packages.push(child);
    }

    /// Resolves `name` to an absolute path, appends a new child wrapping it,
    /// and returns the child for further configuration.
    ///
    /// Unlike [`TestPackage::add_subpackage`], the new child does NOT
    /// inherit this node's settings; add them afterwards via
    /// [`TestPackage::add_setting`] if inheritance is wanted.
    pub fn add_package(&mut self, name: &str) -> &mut Self {
        self.add_package_with(IdAllocator::process_default(), name)
    }

    /// As [`TestPackage::add_package`], drawing the child's identifier from
    /// `ids`.
    pub fn add_package_with(&mut self, ids: &IdAllocator, name: &str) -> &mut Self {
        self.sub_packages.push(Self::from_file_with(ids, name));
        // A vector has a last element immediately after a push. The fallback
        // hands back a detached node rather than panicking.
        self.sub_packages
            .last_mut()
            .unwrap_or_else(|| Box::leak(Box::new(Self::empty_with(ids))))
    }

    /// Sets `name` to `value` on this node and, depth-first, on every node
    /// currently in the subtree, unconditionally overwriting.
    ///
    /// Propagation reaches only descendants that exist at call time:
    /// children appended later do not inherit earlier settings unless the
    /// caller re-propagates.
    pub fn add_setting(&mut self, name: &str, value: impl Into<SettingValue>) {
        self.propagate_setting(name, value.into());
    }

    fn propagate_setting(&mut self, name: &str, value: SettingValue) {
        self.settings.insert(name, value.clone());
        for child in &mut self.sub_packages {
            child.propagate_setting(name, value.clone());
        }
    }

    /// Returns the setting `name` converted to `T`, or `default` when the
    /// setting is absent.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError::TypeMismatch`] when a stored value's variant
    /// does not match `T`. Values restored from XML are strings, so typed
    /// reads of round-tripped settings fail rather than coerce.
    ///
    /// # Examples
    ///
    /// ```
    /// use testengine_api::{IdAllocator, TestPackage};
    ///
    /// let ids = IdAllocator::new();
    /// let package = TestPackage::empty_with(&ids);
    /// assert_eq!(package.setting_or("Timeout", 30), Ok(30));
    /// ```
    pub fn setting_or<T: FromSetting>(&self, name: &str, default: T) -> Result<T, SettingError> {
        self.settings.get(name).map_or_else(
            || Ok(default),
            |value| {
                T::from_setting(value).ok_or_else(|| SettingError::TypeMismatch {
                    name: name.to_owned(),
                    expected: T::EXPECTED,
                    actual: value.kind(),
                })
            },
        )
    }

    /// Collects every node in the subtree for which `predicate` returns
    /// true, in pre-order: a node before its children, siblings left to
    /// right.
    pub fn select<F>(&self, mut predicate: F) -> Vec<&Self>
    where
        F: FnMut(&Self) -> bool,
    {
        let mut selected = Vec::new();
        self.collect_selected(&mut predicate, &mut selected);
        selected
    }

    fn collect_selected<'a, F>(&'a self, predicate: &mut F, selected: &mut Vec<&'a Self>)
    where
        F: FnMut(&Self) -> bool,
    {
        if predicate(self) {
            selected.push(self);
        }
        for child in &self.sub_packages {
            child.collect_selected(predicate, selected);
        }
    }
}

impl Default for TestPackage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Resolves `name` against the current directory without touching the
/// filesystem; nonexistent paths resolve like existing ones.
fn absolute_path(name: &str) -> Utf8PathBuf {
    let absolute =
        std::path::absolute(name).unwrap_or_else(|_| std::path::PathBuf::from(name));
    Utf8PathBuf::from_path_buf(absolute)
        .unwrap_or_else(|fallback| Utf8PathBuf::from(fallback.to_string_lossy().into_owned()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::TestPackage;
    use crate::id::IdAllocator;
    use crate::settings::{SettingError, SettingValue};

    #[test]
    fn from_files_builds_one_child_per_input_in_order() {
        let ids = IdAllocator::new();
        let root = TestPackage::from_files_with(&ids, ["a.dll", "sub/b.exe", "a.dll"]);
        assert!(root.full_path().is_none());
        assert_eq!(root.id(), "1");
        let names: Vec<Option<&str>> =
            root.sub_packages().iter().map(TestPackage::name).collect();
        assert_eq!(names, [Some("a.dll"), Some("b.exe"), Some("a.dll")]);
        let child_ids: Vec<&str> = root.sub_packages().iter().map(TestPackage::id).collect();
        assert_eq!(child_ids, ["2", "3", "4"]);
    }

    #[test]
    fn child_paths_are_absolute() {
        let ids = IdAllocator::new();
        let root = TestPackage::from_files_with(&ids, ["a.dll"]);
        let child = root.sub_packages().first();
        let path = child.and_then(TestPackage::full_path);
        assert!(path.is_some_and(camino::Utf8Path::is_absolute));
    }

    #[rstest]
    #[case("tests/a.dll", true)]
    #[case("tests/A.DLL", true)]
    #[case("b.exe", true)]
    #[case("B.Exe", true)]
    #[case("c.proj", false)]
    #[case("noext", false)]
    fn assembly_detection_by_extension(#[case] name: &str, #[case] expected: bool) {
        let ids = IdAllocator::new();
        let package = TestPackage::from_file_with(&ids, name);
        assert_eq!(package.is_assembly_package(), expected);
    }

    #[test]
    fn virtual_node_is_not_an_assembly() {
        let ids = IdAllocator::new();
        let root = TestPackage::empty_with(&ids);
        assert!(!root.is_assembly_package());
        assert_eq!(root.name(), None);
    }

    #[test]
    fn add_subpackage_copies_parent_settings_overwriting_collisions() {
        let ids = IdAllocator::new();
        let mut parent = TestPackage::empty_with(&ids);
        parent.settings_mut().insert("Shared", "parent");
        parent.settings_mut().insert("ParentOnly", 1);

        let mut child = TestPackage::from_file_with(&ids, "a.dll");
        child.settings_mut().insert("Shared", "child");
        child.settings_mut().insert("ChildOnly", true);

        parent.add_subpackage(child);
        let attached = parent.sub_packages().first();
        let shared = attached.and_then(|c| c.settings().get("Shared"));
        assert_eq!(shared, Some(&SettingValue::from("parent")));
        let parent_only = attached.and_then(|c| c.settings().get("ParentOnly"));
        assert_eq!(parent_only, Some(&SettingValue::Int(1)));
        let child_only = attached.and_then(|c| c.settings().get("ChildOnly"));
        assert_eq!(child_only, Some(&SettingValue::Bool(true)));
    }

    #[test]
    fn add_package_by_name_does_not_inherit_settings() {
        let ids = IdAllocator::new();
        let mut parent = TestPackage::empty_with(&ids);
        parent.add_setting("Timeout", 30);
        let child = parent.add_package_with(&ids, "late.dll");
        assert!(child.settings().is_empty());
        assert_eq!(child.name(), Some("late.dll"));
    }

    #[test]
    fn add_package_returns_the_node_attached_to_the_tree() {
        let ids = IdAllocator::new();
        let mut root = TestPackage::empty_with(&ids);
        let child = root.add_package_with(&ids, "late.dll");
        child.add_setting("Timeout", 5);

        assert_eq!(root.sub_packages().len(), 1);
        let attached = root.sub_packages().first();
        assert_eq!(attached.and_then(TestPackage::name), Some("late.dll"));
        let timeout = attached.and_then(|c| c.settings().get("Timeout"));
        assert_eq!(timeout, Some(&SettingValue::Int(5)));
    }

    #[test]
    fn add_setting_reaches_existing_descendants_only() {
        let ids = IdAllocator::new();
        let mut root = TestPackage::from_files_with(&ids, ["a.dll", "b.dll"]);
        if let Some(first) = root.sub_packages.first_mut() {
            first.add_package_with(&ids, "nested.dll");
        }

        root.add_setting("Timeout", 30);
        let reached = root.select(|node| {
            node.setting_or("Timeout", 0) == Ok(30)
        });
        assert_eq!(reached.len(), 4);

        let late = root.add_package_with(&ids, "late.dll");
        assert_eq!(late.setting_or("Timeout", 0), Ok(0));
    }

    #[test]
    fn add_setting_overwrites_child_values() {
        let ids = IdAllocator::new();
        let mut root = TestPackage::from_files_with(&ids, ["a.dll"]);
        if let Some(child) = root.sub_packages.first_mut() {
            child.settings_mut().insert("Timeout", 5);
        }
        root.add_setting("Timeout", 30);
        let child_value = root
            .sub_packages()
            .first()
            .and_then(|c| c.settings().get("Timeout"));
        assert_eq!(child_value, Some(&SettingValue::Int(30)));
    }

    #[test]
    fn setting_or_returns_default_when_absent() {
        let ids = IdAllocator::new();
        let package = TestPackage::empty_with(&ids);
        assert_eq!(package.setting_or("Timeout", 30), Ok(30));
    }

    #[test]
    fn setting_or_fails_on_variant_mismatch() {
        let ids = IdAllocator::new();
        let mut package = TestPackage::empty_with(&ids);
        package.add_setting("Timeout", "30");
        let result: Result<i64, _> = package.setting_or("Timeout", 0);
        assert_eq!(
            result,
            Err(SettingError::TypeMismatch {
                name: "Timeout".to_owned(),
                expected: "int",
                actual: "string",
            })
        );
    }

    #[test]
    fn select_visits_in_pre_order() {
        let ids = IdAllocator::new();
        let mut root = TestPackage::from_files_with(&ids, ["a.dll", "b.dll"]);
        if let Some(first) = root.sub_packages.first_mut() {
            first.add_package_with(&ids, "a1.dll");
            first.add_package_with(&ids, "a2.dll");
        }

        let visited: Vec<&str> = root
            .select(|_| true)
            .into_iter()
            .map(|node| node.name().unwrap_or("<root>"))
            .collect();
        assert_eq!(visited, ["<root>", "a.dll", "a1.dll", "a2.dll", "b.dll"]);
    }

    #[test]
    fn select_filters_by_predicate() {
        let ids = IdAllocator::new();
        let root = TestPackage::from_files_with(&ids, ["a.dll", "b.txt", "c.exe"]);
        let assemblies = root.select(TestPackage::is_assembly_package);
        let names: Vec<Option<&str>> =
            assemblies.iter().map(|node| node.name()).collect();
        assert_eq!(names, [Some("a.dll"), Some("c.exe")]);
    }
}
