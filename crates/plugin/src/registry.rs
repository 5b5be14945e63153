//! Plugin Registry – verwaltet registrierte Plugins in Ladereihenfolge
//!
//! Die Reihenfolge ist relevant: bei gleichen `pluginInfo`-Schluesseln
//! gewinnt das zuletzt registrierte Plugin.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{PluginError, Result};
use crate::types::{PluginInfoModifier, PluginMeta};

/// Eintrag in der Registry
#[derive(Clone)]
pub struct RegistryEintrag {
    pub meta: PluginMeta,
    pub modifier: Option<Arc<dyn PluginInfoModifier>>,
}

impl std::fmt::Debug for RegistryEintrag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEintrag")
            .field("meta", &self.meta)
            .field("modifier", &self.modifier.is_some())
            .finish()
    }
}

/// Plugin Registry – thread-sicher, geordnet
#[derive(Default)]
pub struct PluginRegistry {
    eintraege: RwLock<Vec<RegistryEintrag>>,
}

impl PluginRegistry {
    /// Erstellt eine neue leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert ein Plugin am Ende der Liste
    pub fn registrieren(
        &self,
        name: impl Into<String>,
        version: impl Into<String>,
        modifier: Option<Arc<dyn PluginInfoModifier>>,
    ) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PluginError::UngueltigerName(name));
        }

        let mut eintraege = self.eintraege.write();
        if eintraege.iter().any(|e| e.meta.name == name) {
            return Err(PluginError::BereitsGeladen(name));
        }

        tracing::info!(plugin = %name, "Plugin registriert");
        eintraege.push(RegistryEintrag {
            meta: PluginMeta {
                name,
                version: version.into(),
            },
            modifier,
        });
        Ok(())
    }

    /// Entfernt ein Plugin aus der Registry
    pub fn entfernen(&self, name: &str) -> Result<RegistryEintrag> {
        let mut eintraege = self.eintraege.write();
        let index = eintraege
            .iter()
            .position(|e| e.meta.name == name)
            .ok_or_else(|| PluginError::NichtGefunden(name.to_string()))?;
        Ok(eintraege.remove(index))
    }

    /// Sucht ein Plugin per Name
    pub fn per_name(&self, name: &str) -> Option<RegistryEintrag> {
        self.eintraege
            .read()
            .iter()
            .find(|e| e.meta.name == name)
            .cloned()
    }

    /// Metadaten aller Plugins in Registrierungsreihenfolge
    pub fn alle(&self) -> Vec<PluginMeta> {
        self.eintraege.read().iter().map(|e| e.meta.clone()).collect()
    }

    /// Alle Metadaten-Modifier in Registrierungsreihenfolge
    pub fn modifier(&self) -> Vec<Arc<dyn PluginInfoModifier>> {
        self.eintraege
            .read()
            .iter()
            .filter_map(|e| e.modifier.clone())
            .collect()
    }

    /// Anzahl registrierter Plugins
    pub fn anzahl(&self) -> usize {
        self.eintraege.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leer;
    impl PluginInfoModifier for Leer {}

    #[test]
    fn registrieren_und_finden() {
        let registry = PluginRegistry::neu();
        registry.registrieren("lyrics", "1.0.0", None).unwrap();

        let e = registry.per_name("lyrics").unwrap();
        assert_eq!(e.meta.version, "1.0.0");
        assert!(e.modifier.is_none());
    }

    #[test]
    fn doppeltes_registrieren_fehlschlaegt() {
        let registry = PluginRegistry::neu();
        registry.registrieren("doppelt", "1.0.0", None).unwrap();
        let err = registry.registrieren("doppelt", "2.0.0", None).unwrap_err();
        assert!(matches!(err, PluginError::BereitsGeladen(_)));
    }

    #[test]
    fn leerer_name_abgelehnt() {
        let registry = PluginRegistry::neu();
        let err = registry.registrieren("  ", "1.0.0", None).unwrap_err();
        assert!(matches!(err, PluginError::UngueltigerName(_)));
    }

    #[test]
    fn reihenfolge_bleibt_erhalten() {
        let registry = PluginRegistry::neu();
        registry.registrieren("c", "1", Some(Arc::new(Leer))).unwrap();
        registry.registrieren("a", "1", None).unwrap();
        registry.registrieren("b", "1", Some(Arc::new(Leer))).unwrap();

        let namen: Vec<_> = registry.alle().into_iter().map(|m| m.name).collect();
        assert_eq!(namen, vec!["c", "a", "b"]);
        assert_eq!(registry.modifier().len(), 2);
    }

    #[test]
    fn entfernen_ok_und_nicht_gefunden() {
        let registry = PluginRegistry::neu();
        registry.registrieren("weg", "1", None).unwrap();
        registry.entfernen("weg").unwrap();
        assert!(registry.per_name("weg").is_none());
        assert_eq!(registry.anzahl(), 0);

        let err = registry.entfernen("weg").unwrap_err();
        assert!(matches!(err, PluginError::NichtGefunden(_)));
    }
}
