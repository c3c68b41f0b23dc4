//! Contract surface for the testengine test execution engine.
//!
//! This crate declares what clients and engine modules agree on, without any
//! execution machinery of its own: the hierarchical [`TestPackage`] value
//! object with its persisted XML form, the [`TestEngine`] and [`TestRunner`]
//! contracts, the [`ProjectLoader`] extension marker, and the shared error
//! taxonomy. The concrete engine is deployed separately and obtained through
//! the `testengine-activator` crate.

mod engine;
mod extension;
mod id;
mod package;
mod settings;
mod xml;

pub use engine::{EngineError, EngineSession, TestEngine, TestRunner, TraceLevel};
pub use extension::ProjectLoader;
pub use id::IdAllocator;
pub use package::TestPackage;
pub use settings::{FromSetting, SettingError, SettingValue, Settings, keys};
pub use xml::{FULLNAME_ATTRIBUTE, ID_ATTRIBUTE, PACKAGE_ELEMENT, SETTINGS_ELEMENT, XmlError};
