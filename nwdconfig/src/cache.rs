use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use serde::Serialize;
use serde_json::Value;

use crate::{
    data::{
        kinds::{KindSectionMap, common_kinds, extract_kind_map},
        model::build,
        schema::Result,
        types::SchemaMap,
        version::SystemdVersion,
    },
    family::ConfigFamily,
};

/// Everything derived from one schema document for one target version.
///
/// Read-only once built; share it through [`Arc`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledSchema {
    pub family: ConfigFamily,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<SystemdVersion>,
    pub sections: SchemaMap,
    /// Kind map, for families with a device kind discriminator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<KindSectionMap>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub common_kinds: Vec<String>,
}

impl CompiledSchema {
    pub fn compile(
        family: ConfigFamily,
        document: &Value,
        version: Option<SystemdVersion>,
    ) -> Result<Self> {
        let sections = build(document, version)?;
        let kinds = family.has_kinds().then(|| extract_kind_map(document));
        let common_kinds = kinds.as_ref().map(common_kinds).unwrap_or_default();
        Ok(Self {
            family,
            version,
            sections,
            kinds,
            common_kinds,
        })
    }
}

type CacheKey = (ConfigFamily, Option<SystemdVersion>);

/// Compiled schemas keyed by family and target version.
///
/// A failed compilation never evicts what is already cached, so callers
/// can keep serving the last good model through [`ModelCache::fallback`].
#[derive(Debug, Default)]
pub struct ModelCache {
    entries: RwLock<HashMap<CacheKey, Arc<CompiledSchema>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        family: ConfigFamily,
        version: Option<SystemdVersion>,
    ) -> Option<Arc<CompiledSchema>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(family, version))
            .cloned()
    }

    /// Cached model for the key, compiling `document` on a miss.
    pub fn get_or_compile(
        &self,
        family: ConfigFamily,
        version: Option<SystemdVersion>,
        document: &Value,
    ) -> Result<Arc<CompiledSchema>> {
        if let Some(hit) = self.get(family, version) {
            trace!("model cache hit for {family} {version:?}");
            return Ok(hit);
        }
        let compiled = Arc::new(CompiledSchema::compile(family, document, version)?);
        info!(
            "compiled {family} schema: {} sections{}",
            compiled.sections.len(),
            version.map(|v| format!(" for systemd {v}")).unwrap_or_default()
        );
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry((family, version)).or_insert(compiled);
        Ok(Arc::clone(entry))
    }

    /// Newest cached model of a family, whatever version it was built for.
    pub fn fallback(&self, family: ConfigFamily) -> Option<Arc<CompiledSchema>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((f, _), _)| *f == family)
            .max_by_key(|((_, version), _)| *version)
            .map(|(_, compiled)| Arc::clone(compiled))
    }

    /// Drop every cached model of a family.
    pub fn invalidate(&self, family: ConfigFamily) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(f, _), _| *f != family);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::SchemaError;
    use serde_json::json;

    fn netdev() -> Value {
        json!({
            "properties": {
                "NetDev": {
                    "type": "object",
                    "properties": {
                        "Name": {"type": "string"},
                        "Kind": {"enum": ["bridge", "vlan"]}
                    }
                },
                "VLAN": {"type": "object", "x-since": 256, "properties": {"Id": {"type": "integer"}}}
            }
        })
    }

    #[test]
    fn compiled_models_are_shared() {
        let cache = ModelCache::new();
        let a = cache
            .get_or_compile(ConfigFamily::Netdev, Some(SystemdVersion(257)), &netdev())
            .unwrap();
        let b = cache
            .get_or_compile(ConfigFamily::Netdev, Some(SystemdVersion(257)), &json!(null))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.common_kinds, ["bridge", "vlan"]);
        assert!(a.kinds.as_ref().unwrap().contains("vlan"));
    }

    #[test]
    fn versions_are_cached_separately() {
        let cache = ModelCache::new();
        let old = cache
            .get_or_compile(ConfigFamily::Netdev, Some(SystemdVersion(255)), &netdev())
            .unwrap();
        let new = cache
            .get_or_compile(ConfigFamily::Netdev, Some(SystemdVersion(257)), &netdev())
            .unwrap();
        assert!(!old.sections.contains("VLAN"));
        assert!(new.sections.contains("VLAN"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_keep_previous_entries() {
        let cache = ModelCache::new();
        cache
            .get_or_compile(ConfigFamily::Netdev, Some(SystemdVersion(257)), &netdev())
            .unwrap();
        let err = cache
            .get_or_compile(ConfigFamily::Netdev, Some(SystemdVersion(258)), &json!({}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Unusable { .. }));
        let fallback = cache.fallback(ConfigFamily::Netdev).unwrap();
        assert_eq!(fallback.version, Some(SystemdVersion(257)));
        assert!(cache.fallback(ConfigFamily::Link).is_none());

        cache.invalidate(ConfigFamily::Netdev);
        assert!(cache.is_empty());
    }

    #[test]
    fn non_netdev_families_have_no_kind_map() {
        let compiled = CompiledSchema::compile(ConfigFamily::Network, &netdev(), None).unwrap();
        assert!(compiled.kinds.is_none());
        assert!(compiled.common_kinds.is_empty());
    }
}
