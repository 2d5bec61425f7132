//! List aggregates keyed by item id

use hirebase_core::Identified;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::store::Aggregate;

/// Item type that can live in an [`IdList`] store
pub trait ListItem: Identified + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Store name used in log output
    const KIND: &'static str;
}

/// Insert/remove operation on a list aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum ListUpdate<T> {
    /// Append unless an item with the same id exists
    Insert(T),
    /// Append, or replace the item with the same id in place
    Upsert(T),
    /// Remove the item with this id if present, otherwise insert it
    Toggle(T),
    /// Remove the item with this id, if present
    Remove(String),
    /// Remove every item
    Clear,
}

/// Ordered list with unique ids, in insertion order
///
/// Serializes as a plain JSON array. Duplicate ids in a loaded snapshot are
/// collapsed to their first occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct IdList<T> {
    items: Vec<T>,
}

impl<T> IdList<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }
    
    pub fn items(&self) -> &[T] {
        &self.items
    }
    
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
    
    pub fn len(&self) -> usize {
        self.items.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    
    /// Mutable access for domain aggregates that wrap a list
    pub fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }
}

impl<T: Identified> IdList<T> {
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let mut list = Self::new();
        for item in items {
            list.insert(item);
        }
        list
    }
    
    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }
    
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }
    
    /// Returns false when the id was already present
    pub fn insert(&mut self, item: T) -> bool {
        if self.contains(item.id()) {
            return false;
        }
        self.items.push(item);
        true
    }
    
    /// Returns true when an existing item was replaced
    pub fn upsert(&mut self, item: T) -> bool {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => {
                *existing = item;
                true
            }
            None => {
                self.items.push(item);
                false
            }
        }
    }
    
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }
    
    /// Returns the number of items removed
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }
    
    pub fn apply_update(&mut self, kind: &str, update: ListUpdate<T>) {
        match update {
            ListUpdate::Insert(item) => {
                let id = item.id().to_string();
                if !self.insert(item) {
                    debug!(store = kind, id = %id, "insert ignored, id already present");
                }
            }
            ListUpdate::Upsert(item) => {
                self.upsert(item);
            }
            ListUpdate::Toggle(item) => {
                let id = item.id().to_string();
                if self.remove(&id).is_none() {
                    self.items.push(item);
                }
            }
            ListUpdate::Remove(id) => {
                if self.remove(&id).is_none() {
                    debug!(store = kind, id = %id, "remove ignored, id not present");
                }
            }
            ListUpdate::Clear => {
                self.clear();
            }
        }
    }
}

impl<T> Default for IdList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize> Serialize for IdList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Identified> Deserialize<'de> for IdList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(IdList::from_items)
    }
}

impl<T: ListItem> Aggregate for IdList<T> {
    type Update = ListUpdate<T>;
    const NAME: &'static str = T::KIND;
    
    fn apply(&mut self, update: ListUpdate<T>) {
        self.apply_update(T::KIND, update);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Tag {
        pub id: String,
        #[serde(default)]
        pub label: String,
    }
    
    impl Tag {
        pub fn new(id: &str, label: &str) -> Self {
            Self {
                id: id.to_string(),
                label: label.to_string(),
            }
        }
    }
    
    impl Identified for Tag {
        fn id(&self) -> &str {
            &self.id
        }
    }
    
    impl ListItem for Tag {
        const KIND: &'static str = "tags";
    }
    
    #[test]
    fn test_insert_existing_id_is_noop() {
        let mut list: IdList<Tag> = IdList::new();
        assert!(list.insert(Tag::new("42", "first")));
        assert!(!list.insert(Tag::new("42", "second")));
        
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("42").unwrap().label, "first");
    }
    
    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut list: IdList<Tag> = IdList::new();
        list.apply(ListUpdate::Insert(Tag::new("7", "x")));
        list.apply(ListUpdate::Remove("7".into()));
        list.apply(ListUpdate::Remove("7".into()));
        
        assert!(list.is_empty());
    }
    
    #[test]
    fn test_upsert_replaces_in_place() {
        let mut list = IdList::from_items(vec![Tag::new("a", "1"), Tag::new("b", "2")]);
        assert!(list.upsert(Tag::new("a", "updated")));
        assert!(!list.upsert(Tag::new("c", "3")));
        
        let ids: Vec<&str> = list.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(list.get("a").unwrap().label, "updated");
    }
    
    #[test]
    fn test_serializes_as_array_and_dedupes_on_load() {
        let list = IdList::from_items(vec![Tag::new("a", "1")]);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"[{"id":"a","label":"1"}]"#);
        
        let loaded: IdList<Tag> =
            serde_json::from_str(r#"[{"id":"a"},{"id":"a","label":"dup"},{"id":"b"}]"#).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("a").unwrap().label, "");
    }
    
    #[test]
    fn test_toggle_flips_membership() {
        let mut list: IdList<Tag> = IdList::new();
        list.apply(ListUpdate::Toggle(Tag::new("9", "")));
        assert!(list.contains("9"));
        list.apply(ListUpdate::Toggle(Tag::new("9", "")));
        assert!(!list.contains("9"));
    }
    
    #[test]
    fn test_clear() {
        let mut list = IdList::from_items(vec![Tag::new("a", ""), Tag::new("b", "")]);
        list.apply(ListUpdate::Clear);
        assert!(list.is_empty());
    }
}
