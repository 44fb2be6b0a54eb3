use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{error::NifError, traits::Named, utils::quote};

/// A name -> entity map that also remembers insertion order.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    category: &'static str,
    items:    HashMap<String, T>,
    names:    Vec<String>,
}

impl<T: Named> Registry<T> {
    pub fn new(category: &'static str) -> Self {
        Registry {
            category,
            items: HashMap::new(),
            names: Vec::new(),
        }
    }

    /// Adds `item`; a name that is already present is a `DuplicateDefinition`.
    pub fn insert(&mut self, item: T) -> Result<(), NifError> {
        let name = item.name().to_string();
        if self.items.contains_key(&name) {
            return Err(NifError::DuplicateDefinition {
                category: self.category,
                name:     quote(&name),
            });
        }
        self.names.push(name.clone());
        self.items.insert(name, item);
        Ok(())
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.names.iter().filter_map(|n| self.items.get(n))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Non-empty, map and name list the same size, no empty name.
    pub fn is_consistent(&self) -> bool {
        !self.items.is_empty()
            && self.items.len() == self.names.len()
            && self.names.iter().all(|n| !n.is_empty() && self.items.contains_key(n))
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.values_mut()
    }
}

impl<T: Named + Serialize> Serialize for Registry<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for item in self.iter() {
            map.serialize_entry(item.name(), item)?;
        }
        map.end()
    }
}
