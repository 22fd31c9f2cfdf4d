use crate::mapper::{self, PersistenceType};
use std::collections::HashMap;

/// Native base types the structured introspection path understands.
///
/// This is the explicit replacement for registering extra type mappings
/// process-wide: every analyzer gets its own registry. The default registry
/// covers the generic SQL types; vendor enumerations (`enum`, `set`) are left
/// out and must either be registered here or handled by the catalog query
/// path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    extra: HashMap<String, PersistenceType>,
}

const VENDOR_ENUMERATIONS: [&str; 2] = ["enum", "set"];

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or override) the persistence type of a native base type
    pub fn with_mapping(mut self, native: &str, persistence: PersistenceType) -> Self {
        self.register(native, persistence);
        self
    }

    pub fn register(&mut self, native: &str, persistence: PersistenceType) {
        self.extra
            .insert(mapper::base_type(native), persistence);
    }

    /// Persistence type for a native type string, or `None` if the
    /// structured path cannot represent it.
    pub fn resolve(&self, native: &str) -> Option<PersistenceType> {
        let base = mapper::base_type(native);
        if let Some(ty) = self.extra.get(&base) {
            return Some(*ty);
        }
        if VENDOR_ENUMERATIONS.contains(&base.as_str()) {
            return None;
        }
        mapper::known_persistence_type(&base)
    }
}
