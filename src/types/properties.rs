//! Transient typed property maps attached to nodes and artifacts.
//!
//! Properties are never persisted. A read with the wrong type yields `None`
//! rather than an error.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Name of the property a writer sets when an artifact's external
/// representation was not modified since it was written.
pub const PROPERTY_UNMODIFIED: &str = "unmodified";

/// Typed scratch map keyed by property name.
///
/// Storing a value under an existing name replaces the old value, whatever
/// its type was.
#[derive(Default)]
pub struct Properties {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Properties {
    /// Create an empty property map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the property `name` if it exists and has type `T`.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.values.get(name)?.downcast_ref::<T>()
    }

    /// Mutable variant of [`Properties::get`].
    pub fn get_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        self.values.get_mut(name)?.downcast_mut::<T>()
    }

    /// Store `value` under `name`, returning whether a previous value was replaced.
    pub fn put<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> bool {
        self.values.insert(name.into(), Box::new(value)).is_some()
    }

    /// Remove the property `name`. Removing a missing name does nothing.
    pub fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    /// Whether a property named `name` exists, regardless of its type.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of stored properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every property.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Properties").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_get() {
        let mut props = Properties::new();
        props.put("count", 3usize);

        assert_eq!(props.get::<usize>("count"), Some(&3));
    }

    #[test]
    fn test_type_mismatch_yields_none() {
        let mut props = Properties::new();
        props.put("count", 3usize);

        assert_eq!(props.get::<String>("count"), None);
        assert!(props.contains("count"));
    }

    #[test]
    fn test_put_replaces_regardless_of_type() {
        let mut props = Properties::new();
        assert!(!props.put(PROPERTY_UNMODIFIED, true));
        assert!(props.put(PROPERTY_UNMODIFIED, "yes".to_string()));

        assert_eq!(props.get::<bool>(PROPERTY_UNMODIFIED), None);
        assert_eq!(props.get::<String>(PROPERTY_UNMODIFIED).map(String::as_str), Some("yes"));
        assert_eq!(props.len(), 1);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut props = Properties::new();
        assert!(!props.remove("missing"));
        assert!(props.is_empty());
    }
}
