#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NerveMind Plugin
//!
//! The frozen-after-startup registry that lets additional node executors
//! be bundled and installed as a unit (a "plugin") rather than registered
//! one by one. Dynamic loading from shared libraries and plugin
//! versioning are out of scope — see `spec.md`'s Non-goals; only the
//! registration contract lives here.

mod error;
mod metadata;
mod plugin;
mod registry;

pub use error::PluginError;
pub use metadata::PluginMetadata;
pub use plugin::Plugin;
pub use registry::PluginRegistry;
