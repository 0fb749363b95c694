use crate::DalObject;

use indexmap::IndexMap;
use std::cell::RefCell;

/// Live objects of one session, by class then id.
///
/// An object is indexed under its own class and every ancestor, so a
/// lookup through a base class finds objects of derived classes.
#[derive(Debug, Default)]
pub struct SessionCache {
    classes: RefCell<IndexMap<String, IndexMap<String, DalObject>>>,
}

impl SessionCache {
    pub fn new() -> SessionCache {
        SessionCache::default()
    }

    /// Makes sure `class` has an index, even an empty one.
    pub fn init(&self, class: &str) {
        self.classes
            .borrow_mut()
            .entry(class.to_string())
            .or_default();
    }

    pub fn get(&self, class: &str, id: &str) -> Option<DalObject> {
        self.classes.borrow().get(class)?.get(id).cloned()
    }

    pub fn contains(&self, class: &str, id: &str) -> bool {
        self.get(class, id).is_some()
    }

    /// Indexes `object` under its current id.
    pub fn insert(&self, object: &DalObject) {
        let id = object.id();
        let mut classes = self.classes.borrow_mut();
        for class in object.types() {
            classes
                .entry(class)
                .or_default()
                .insert(id.clone(), object.clone());
        }
    }

    /// Drops `object` from every index, looking it up by its current id.
    pub fn evict(&self, object: &DalObject) {
        self.evict_id(object, &object.id());
    }

    /// Drops the entries `object` has under `id`. Entries under `id` that
    /// belong to another object are kept.
    pub fn evict_id(&self, object: &DalObject, id: &str) {
        let mut classes = self.classes.borrow_mut();
        for class in object.types() {
            let Some(objects) = classes.get_mut(&class) else {
                continue;
            };
            if objects.get(id).is_some_and(|cached| cached.ptr_eq(object)) {
                objects.shift_remove(id);
            }
        }
    }

    /// Every cached object once, in caching order.
    pub fn objects(&self) -> Vec<DalObject> {
        let mut unique = IndexMap::new();
        for objects in self.classes.borrow().values() {
            for object in objects.values() {
                unique
                    .entry(object.full_name())
                    .or_insert_with(|| object.clone());
            }
        }
        unique.into_values().collect()
    }

    /// Empties every index and returns what they held, once per index.
    pub(crate) fn drain(&self) -> Vec<DalObject> {
        let classes = std::mem::take(&mut *self.classes.borrow_mut());
        classes
            .into_values()
            .flat_map(|objects| objects.into_values())
            .collect()
    }

    /// Objects cached under `class`, derived classes included.
    pub fn objects_of(&self, class: &str) -> Vec<DalObject> {
        self.classes
            .borrow()
            .get(class)
            .map(|objects| objects.values().cloned().collect())
            .unwrap_or_default()
    }
}
