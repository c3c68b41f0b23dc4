//! Persisted XML form of the package tree.
//!
//! A node serializes as a `TestPackage` element carrying an `id` attribute
//! and, when a path exists, a `fullname` attribute, followed by at most one
//! `Settings` element whose attributes are the settings, followed by nested
//! `TestPackage` elements in child order.
//!
//! The wrapping element of a node is owned by the caller: [`TestPackage::write_xml`]
//! receives the opened start tag and fills in attributes and body, and
//! [`TestPackage::read_xml`] is entered after the caller consumed the start
//! tag. The [`TestPackage::to_xml`] and [`TestPackage::from_xml`]
//! conveniences own the root tag on the caller's behalf.
//!
//! Reading relies purely on element-name matching: a missing `Settings`
//! block, empty-element forms, and any number of children are all accepted,
//! and an unrecognized element terminates the current node. Restored setting
//! values are always strings, so the round-trip is lossy for typed values.

use std::io;

use camino::Utf8PathBuf;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

use crate::package::TestPackage;

/// Element name for a package node.
pub const PACKAGE_ELEMENT: &str = "TestPackage";
/// Element name for a node's settings block.
pub const SETTINGS_ELEMENT: &str = "Settings";
/// Attribute carrying the package identifier.
pub const ID_ATTRIBUTE: &str = "id";
/// Attribute carrying the package's absolute path.
pub const FULLNAME_ATTRIBUTE: &str = "fullname";

/// Error raised while reading or writing the persisted package form.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The underlying XML stream is not well formed.
    #[error(transparent)]
    Syntax(#[from] quick_xml::Error),
    /// An attribute could not be decoded.
    #[error(transparent)]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    /// Output sink failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Well-formed XML that violates the package document shape.
    #[error("malformed package document: {0}")]
    Malformed(String),
}

impl TestPackage {
    /// Writes this node's attributes, settings, and children into `root`,
    /// the already-constructed wrapping element supplied (and named) by the
    /// caller, then closes it.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Io`] when the underlying writer fails.
    pub fn write_xml<W: io::Write>(
        &self,
        root: BytesStart<'_>,
        writer: &mut Writer<W>,
    ) -> Result<(), XmlError> {
        let end_name = String::from_utf8_lossy(root.name().as_ref()).into_owned();
        let mut element = root;
        element.push_attribute((ID_ATTRIBUTE, self.id()));
        if let Some(path) = self.full_path() {
            element.push_attribute((FULLNAME_ATTRIBUTE, path.as_str()));
        }
        writer.write_event(Event::Start(element))?;

        if !self.settings().is_empty() {
            let rendered: Vec<(String, String)> = self
                .settings()
                .iter()
                .map(|(name, value)| (name.to_owned(), value.to_string()))
                .collect();
            let mut settings = BytesStart::new(SETTINGS_ELEMENT);
            for (name, value) in &rendered {
                settings.push_attribute((name.as_str(), value.as_str()));
            }
            writer.write_event(Event::Empty(settings))?;
        }

        for child in self.sub_packages() {
            child.write_xml(BytesStart::new(PACKAGE_ELEMENT), writer)?;
        }

        writer.write_event(Event::End(BytesEnd::new(end_name)))?;
        Ok(())
    }

    /// Renders the whole tree as a document rooted in a `TestPackage`
    /// element.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] when serialization fails.
    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());
        self.write_xml(BytesStart::new(PACKAGE_ELEMENT), &mut writer)?;
        String::from_utf8(writer.into_inner())
            .map_err(|_| XmlError::Malformed("serializer produced non-UTF-8 output".to_owned()))
    }

    /// Reconstructs a node whose start tag `root` the caller has already
    /// consumed from `reader`, reading until the matching end tag, an
    /// unrecognized element, or end of input.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] when the stream is not well formed or the `id`
    /// attribute is missing.
    pub fn read_xml(
        reader: &mut Reader<&[u8]>,
        root: &BytesStart<'_>,
    ) -> Result<Self, XmlError> {
        let mut package = Self::package_from_attributes(root)?;
        loop {
            match reader.read_event()? {
                Event::Start(element) if has_name(&element, SETTINGS_ELEMENT) => {
                    apply_settings(&mut package, &element)?;
                    reader.read_to_end(element.name())?;
                }
                Event::Empty(element) if has_name(&element, SETTINGS_ELEMENT) => {
                    apply_settings(&mut package, &element)?;
                }
                Event::Start(element) if has_name(&element, PACKAGE_ELEMENT) => {
                    let child = Self::read_xml(reader, &element)?;
                    package.append_child(child);
                }
                Event::Empty(element) if has_name(&element, PACKAGE_ELEMENT) => {
                    package.append_child(Self::package_from_attributes(&element)?);
                }
                // Unrecognized elements and the enclosing end tag both
                // terminate this node.
                Event::Start(_) | Event::Empty(_) | Event::End(_) | Event::Eof => break,
                _ => {}
            }
        }
        Ok(package)
    }

    /// Parses a document produced by [`TestPackage::to_xml`] (or any writer
    /// honouring the caller-owns-root contract with a `TestPackage` root).
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Malformed`] when no `TestPackage` root element is
    /// present, or [`XmlError`] for ill-formed input.
    pub fn from_xml(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        let config = reader.config_mut();
        config.trim_text_start = true;
        config.trim_text_end = true;
        loop {
            match reader.read_event()? {
                Event::Start(element) if has_name(&element, PACKAGE_ELEMENT) => {
                    return Self::read_xml(&mut reader, &element);
                }
                Event::Empty(element) if has_name(&element, PACKAGE_ELEMENT) => {
                    return Self::package_from_attributes(&element);
                }
                Event::Eof => {
                    return Err(XmlError::Malformed(
                        "no TestPackage root element found".to_owned(),
                    ));
                }
                _ => {}
            }
        }
    }

    /// Builds a childless node from a package element's attributes.
    fn package_from_attributes(element: &BytesStart<'_>) -> Result<Self, XmlError> {
        let mut id = None;
        let mut full_path = None;
        for (name, value) in read_attributes(element)? {
            if name == ID_ATTRIBUTE {
                id = Some(value);
            } else if name == FULLNAME_ATTRIBUTE {
                full_path = Some(Utf8PathBuf::from(value));
            }
        }
        let id = id.ok_or_else(|| {
            XmlError::Malformed("TestPackage element has no id attribute".to_owned())
        })?;
        let mut package = Self::with_id(id);
        if let Some(path) = full_path {
            package.set_full_path(path);
        }
        Ok(package)
    }
}

fn has_name(element: &BytesStart<'_>, name: &str) -> bool {
    element.name().as_ref() == name.as_bytes()
}

/// Adds every attribute of a `Settings` element as a string-typed setting.
fn apply_settings(package: &mut TestPackage, element: &BytesStart<'_>) -> Result<(), XmlError> {
    for (name, value) in read_attributes(element)? {
        package.settings_mut().insert(name, value);
    }
    Ok(())
}

fn read_attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>, XmlError> {
    let mut attributes = Vec::new();
    for attribute in element.attributes() {
        let attribute = attribute?;
        let name = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|_| XmlError::Malformed("non-UTF-8 attribute name".to_owned()))?
            .to_owned();
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((name, value));
    }
    Ok(attributes)
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use quick_xml::Writer;
    use quick_xml::events::BytesStart;

    use crate::id::IdAllocator;
    use crate::package::TestPackage;
    use crate::settings::SettingValue;

    fn sample_tree(ids: &IdAllocator) -> TestPackage {
        let mut root = TestPackage::from_files_with(ids, ["a.dll", "b.dll"]);
        root.add_setting("Timeout", 30);
        root.add_setting("Verbose", true);
        root
    }

    #[test]
    fn writes_settings_as_attributes_in_insertion_order() {
        let ids = IdAllocator::new();
        let xml = sample_tree(&ids).to_xml().unwrap();
        assert!(xml.contains(r#"<Settings Timeout="30" Verbose="true"/>"#));
    }

    #[test]
    fn round_trip_preserves_ids_and_structure() {
        let ids = IdAllocator::new();
        let original = sample_tree(&ids);
        let xml = original.to_xml().unwrap();
        let restored = TestPackage::from_xml(&xml).unwrap();

        assert_eq!(restored.id(), original.id());
        assert_eq!(restored.sub_packages().len(), 2);
        let pairs = restored
            .sub_packages()
            .iter()
            .zip(original.sub_packages());
        for (restored_child, original_child) in pairs {
            assert_eq!(restored_child.id(), original_child.id());
            assert_eq!(restored_child.full_path(), original_child.full_path());
        }
    }

    #[test]
    fn round_trip_demotes_typed_settings_to_strings() {
        let ids = IdAllocator::new();
        let original = sample_tree(&ids);
        let xml = original.to_xml().unwrap();
        let restored = TestPackage::from_xml(&xml).unwrap();
        assert_eq!(
            restored.settings().get("Timeout"),
            Some(&SettingValue::from("30"))
        );
        assert_eq!(
            restored.settings().get("Verbose"),
            Some(&SettingValue::from("true"))
        );
    }

    #[test]
    fn caller_names_the_root_element() {
        let ids = IdAllocator::new();
        let package = TestPackage::empty_with(&ids);
        let mut writer = Writer::new(Vec::new());
        package
            .write_xml(BytesStart::new("Wrapper"), &mut writer)
            .unwrap();
        let xml = String::from_utf8(writer.into_inner()).unwrap();
        assert!(xml.starts_with("<Wrapper "));
        assert!(xml.ends_with("</Wrapper>"));
    }

    #[test]
    fn reads_node_without_settings_block() {
        let restored =
            TestPackage::from_xml(r#"<TestPackage id="9"><TestPackage id="10" fullname="/x/a.dll"/></TestPackage>"#)
                .unwrap();
        assert_eq!(restored.id(), "9");
        assert!(restored.settings().is_empty());
        let child = restored.sub_packages().first();
        assert_eq!(child.map(TestPackage::id), Some("10"));
        assert!(child.is_some_and(TestPackage::is_assembly_package));
    }

    #[test]
    fn settings_element_with_end_tag_is_accepted() {
        let restored = TestPackage::from_xml(
            r#"<TestPackage id="3"><Settings Timeout="5"></Settings></TestPackage>"#,
        )
        .unwrap();
        assert_eq!(
            restored.settings().get("Timeout"),
            Some(&SettingValue::from("5"))
        );
    }

    #[test]
    fn unrecognized_element_terminates_the_node() {
        let restored = TestPackage::from_xml(
            r#"<TestPackage id="4"><Unknown/><TestPackage id="5"/></TestPackage>"#,
        )
        .unwrap();
        assert_eq!(restored.id(), "4");
        assert!(restored.sub_packages().is_empty());
    }

    #[test]
    fn missing_id_is_malformed() {
        let result = TestPackage::from_xml(r#"<TestPackage fullname="/x/a.dll"></TestPackage>"#);
        assert!(result.is_err());
    }

    #[test]
    fn missing_root_element_is_malformed() {
        let result = TestPackage::from_xml("<Other></Other>");
        assert!(result.is_err());
    }
}
