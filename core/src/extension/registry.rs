//! Name-keyed extension registry
//!
//! Registration never fails loudly: duplicates are logged and ignored so the
//! registry is never left half-mutated.

use std::any::TypeId;

use super::Extension;

struct Entry<T: ?Sized> {
    type_key: TypeId,
    enabled: bool,
    ext: Box<T>,
}

/// Ordered registry of extensions of one flavor.
///
/// Insertion order is significant: it is the order in which hooks run and in
/// which file command queues are merged.
pub struct ExtensionRegistry<T: ?Sized + Extension> {
    /// Human-readable flavor, used in log messages
    kind: &'static str,
    entries: Vec<Entry<T>>,
}

impl<T: ?Sized + Extension> ExtensionRegistry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Register an extension, enabled.
    ///
    /// Ignored with a warning if an instance of the same concrete type or an
    /// extension with the same name is already present. Returns whether the
    /// extension was inserted.
    pub fn register(&mut self, ext: Box<T>) -> bool {
        let type_key = ext.type_key();

        if let Some(existing) = self.entries.iter().find(|e| e.type_key == type_key) {
            tracing::warn!(
                registry = self.kind,
                extension = ext.name(),
                existing = existing.ext.name(),
                "An extension of this type is already registered"
            );
            return false;
        }

        if self.position(ext.name()).is_some() {
            tracing::warn!(
                registry = self.kind,
                extension = ext.name(),
                "An extension with this name is already registered"
            );
            return false;
        }

        tracing::debug!(registry = self.kind, extension = ext.name(), "Registered extension");
        self.entries.push(Entry {
            type_key,
            enabled: true,
            ext,
        });
        true
    }

    /// Remove an extension by name, returning it.
    pub fn unregister(&mut self, name: &str) -> Option<Box<T>> {
        let Some(index) = self.position(name) else {
            tracing::warn!(
                registry = self.kind,
                extension = name,
                "Cannot unregister unknown extension"
            );
            return None;
        };

        Some(self.entries.remove(index).ext)
    }

    /// Enable or disable an extension without removing it.
    ///
    /// Returns `false` (and logs) if no extension has that name.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let Some(index) = self.position(name) else {
            tracing::warn!(
                registry = self.kind,
                extension = name,
                "Cannot toggle unknown extension"
            );
            return false;
        };

        self.entries[index].enabled = enabled;
        true
    }

    /// Enable exactly the named extensions and disable the rest.
    pub fn set_enabled_only(&mut self, names: &[&str]) {
        for entry in &mut self.entries {
            entry.enabled = names.contains(&entry.ext.name());
        }
        for name in names {
            if self.position(name).is_none() {
                tracing::warn!(registry = self.kind, extension = *name, "Unknown extension");
            }
        }
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.position(name).map(|i| self.entries[i].enabled)
    }

    /// The enabled subset, in registration order.
    pub fn enabled(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.ext.as_ref())
    }

    pub fn enabled_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.entries
            .iter_mut()
            .filter(|e| e.enabled)
            .map(|e| e.ext.as_mut())
    }

    /// Names of the enabled subset, in registration order.
    pub fn enabled_names(&self) -> Vec<&str> {
        self.enabled().map(|ext| ext.name()).collect()
    }

    /// Every registered extension, enabled or not.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|e| e.ext.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.entries.iter_mut().map(|e| e.ext.as_mut())
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.position(name).map(|i| self.entries[i].ext.as_ref())
    }

    /// Look up an enabled extension by name.
    pub fn get_enabled_mut(&mut self, name: &str) -> Option<&mut T> {
        let index = self.position(name)?;
        let entry = &mut self.entries[index];
        entry.enabled.then(|| entry.ext.as_mut())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.ext.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Extension for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    struct Other(&'static str);

    impl Extension for Other {
        fn name(&self) -> &str {
            self.0
        }
    }

    struct Third;

    impl Extension for Third {
        fn name(&self) -> &str {
            "third"
        }
    }

    fn registry() -> ExtensionRegistry<dyn Extension> {
        ExtensionRegistry::new("test")
    }

    #[test]
    fn test_register_preserves_order() {
        let mut reg = registry();
        assert!(reg.register(Box::new(Named("a"))));
        assert!(reg.register(Box::new(Other("b"))));
        assert!(reg.register(Box::new(Third)));

        assert_eq!(reg.len(), 3);
        assert_eq!(reg.enabled_names(), vec!["a", "b", "third"]);
    }

    #[test]
    fn test_duplicate_type_keeps_first_instance() {
        let mut reg = registry();
        assert!(reg.register(Box::new(Named("first"))));
        assert!(!reg.register(Box::new(Named("second"))));

        assert_eq!(reg.len(), 1);
        assert!(reg.get("first").is_some());
        assert!(reg.get("second").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut reg = registry();
        assert!(reg.register(Box::new(Named("same"))));
        assert!(!reg.register(Box::new(Other("same"))));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_set_enabled_updates_subset() {
        let mut reg = registry();
        reg.register(Box::new(Named("a")));
        reg.register(Box::new(Other("b")));
        reg.register(Box::new(Third));

        assert!(reg.set_enabled("b", false));
        assert_eq!(reg.enabled_names(), vec!["a", "third"]);
        assert_eq!(reg.is_enabled("b"), Some(false));
        assert!(reg.get_enabled_mut("b").is_none());

        assert!(reg.set_enabled("b", true));
        assert_eq!(reg.enabled_names(), vec!["a", "b", "third"]);

        assert!(!reg.set_enabled("missing", true));
    }

    #[test]
    fn test_set_enabled_only() {
        let mut reg = registry();
        reg.register(Box::new(Named("a")));
        reg.register(Box::new(Other("b")));
        reg.register(Box::new(Third));

        reg.set_enabled_only(&["third", "a"]);
        assert_eq!(reg.enabled_names(), vec!["a", "third"]);
        assert_eq!(reg.enabled_mut().count(), 2);
    }

    #[test]
    fn test_enabled_views_agree() {
        let mut reg = registry();
        reg.register(Box::new(Named("a")));
        reg.register(Box::new(Other("b")));
        reg.register(Box::new(Third));
        reg.set_enabled("a", false);
        reg.unregister("b");

        let shared: Vec<String> = reg.enabled().map(|e| e.name().to_string()).collect();
        let exclusive: Vec<String> = reg.enabled_mut().map(|e| e.name().to_string()).collect();
        assert_eq!(shared, vec!["third"]);
        assert_eq!(shared, exclusive);
    }

    #[test]
    fn test_unregister() {
        let mut reg = registry();
        reg.register(Box::new(Named("a")));
        reg.register(Box::new(Other("b")));

        let removed = reg.unregister("a").unwrap();
        assert_eq!(removed.name(), "a");
        assert_eq!(reg.enabled_names(), vec!["b"]);
        assert!(reg.unregister("a").is_none());

        // The type slot is free again
        assert!(reg.register(Box::new(Named("again"))));
    }
}
