//! klangwerk-plugin – Plugin-Erweiterungen
//!
//! Plugins werden ausserhalb von Klangwerk geladen. Zur Laufzeit sieht der
//! Server nur eine geordnete Liste von Erweiterungen, die Metadaten zu
//! Tracks und Playlists beisteuern.
//!
//! # Architektur
//! - [`types::PluginInfoModifier`] – Schnittstelle einer Erweiterung
//! - [`registry::PluginRegistry`] – Geordnete Liste registrierter Plugins

pub mod error;
pub mod registry;
pub mod types;

pub use error::{PluginError, Result};
pub use registry::PluginRegistry;
pub use types::{PluginInfoModifier, PluginMeta};
