mod builder;
pub use builder::Builder;

mod session;
pub use session::SessionCache;

use crate::{
    materialize::{self, Persist},
    object, DalObject, DalType, Policy, RecordProxy, Registry,
};
use confdal_core::{err, Driver, Result};

use indexmap::IndexMap;
use std::{cell::RefCell, fmt, rc::Rc};

/// A session over a record store.
///
/// The session keeps at most one live object per class and id, tracks the
/// database new records are created in, and forwards database management
/// to the store.
pub struct Db {
    driver: Rc<dyn Driver>,
    registry: Rc<Registry>,
    cache: SessionCache,
    policy: Policy,
    active: RefCell<Option<String>>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn driver(&self) -> &Rc<dyn Driver> {
        &self.driver
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// The policy [`update`](Self::update) persists with.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn ty(&self, class: &str) -> Result<DalType> {
        self.registry.ty(class)
    }

    /// Creates a detached object of class `class`. Nothing is written until
    /// the object is added or updated.
    pub fn new_object(&self, class: &str, id: &str) -> Result<DalObject> {
        Ok(DalObject::new(&self.ty(class)?, id))
    }

    /// The object for record `id` of `class` (or a subclass), from the
    /// session cache or hydrated from the store.
    pub fn get(&self, class: &str, id: &str) -> Result<DalObject> {
        if let Some(object) = self.cache.get(class, id) {
            return Ok(object);
        }

        let proxy = self.record(class, id)?;
        materialize::hydrate(self, Rc::new(proxy))
    }

    /// Every object of `class`, subclasses included.
    pub fn get_all(&self, class: &str) -> Result<Vec<DalObject>> {
        self.records(class)?
            .into_iter()
            .map(|proxy| materialize::hydrate(self, Rc::new(proxy)))
            .collect()
    }

    /// Every cached object plus every record of every known class not
    /// cached yet, each once.
    pub fn materialize_all(&self) -> Result<Vec<DalObject>> {
        let mut objects: IndexMap<String, DalObject> = self
            .cache
            .objects()
            .into_iter()
            .map(|object| (object.full_name(), object))
            .collect();

        for ty in self.registry.types() {
            for object in self.get_all(ty.name())? {
                objects.entry(object.full_name()).or_insert(object);
            }
        }

        Ok(objects.into_values().collect())
    }

    /// Creates the records of `object`, and with `recurse` of every object
    /// reachable from it. Objects whose record exists are left as stored.
    pub fn add(&self, object: &DalObject, recurse: bool) -> Result<Rc<RecordProxy>> {
        materialize::persist(
            self,
            object,
            Persist {
                policy: self.policy,
                recurse,
                create_only: true,
            },
        )
    }

    /// Creates or updates the record of `object`, and with `recurse` of
    /// every object reachable from it.
    ///
    /// Without `recurse`, related objects must already be in the store,
    /// directly or through an include.
    pub fn update(&self, object: &DalObject, recurse: bool) -> Result<Rc<RecordProxy>> {
        self.update_with(object, self.policy, recurse)
    }

    pub fn update_with(
        &self,
        object: &DalObject,
        policy: Policy,
        recurse: bool,
    ) -> Result<Rc<RecordProxy>> {
        materialize::persist(
            self,
            object,
            Persist {
                policy,
                recurse,
                create_only: false,
            },
        )
    }

    /// Removes the record of `object` from the store, if there is one, and
    /// drops the object from the session cache.
    ///
    /// A renamed object not yet persisted is looked up by the id the store
    /// still knows; the pending rename is dropped with the record.
    pub fn destroy(&self, object: &DalObject) -> Result<()> {
        let class = object.class_name();
        let old_id = object.pending_rename();
        let id = old_id.clone().unwrap_or_else(|| object.id());

        if self.driver.test_record(&class, &id) {
            let record = self.driver.get_record(&class, &id)?;
            self.driver.destroy_record(&record)?;
            tracing::debug!(%class, %id, "destroyed record");
        }

        self.cache.evict(object);
        if let Some(old_id) = old_id {
            self.cache.evict_id(object, &old_id);
            object.clear_rename();
        }
        Ok(())
    }

    /// Objects written to since the last reset.
    pub fn updated(&self) -> Vec<DalObject> {
        self.registry.updated()
    }

    pub fn reset_updated(&self) {
        self.registry.reset_updated()
    }

    /// Picks up classes the store made visible and derives their types.
    pub fn refresh(&self) -> Result<Vec<DalType>> {
        let added = self.registry.refresh(&*self.driver)?;
        for ty in self.registry.types() {
            self.cache.init(ty.name());
        }
        Ok(added)
    }

    /// Creates a database including `includes` and makes it the active one.
    pub fn create_db(&self, name: &str, includes: &[&str]) -> Result<()> {
        let includes: Vec<String> = includes.iter().map(|include| include.to_string()).collect();
        self.driver.create_database(name, &includes)?;
        *self.active.borrow_mut() = Some(name.to_string());
        self.refresh()?;
        Ok(())
    }

    pub fn databases(&self) -> Vec<String> {
        self.driver.databases()
    }

    /// The database new records are created in.
    pub fn active(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    pub fn set_active(&self, name: &str) -> Result<()> {
        if !self.databases().iter().any(|db| db == name) {
            return Err(err!("database `{name}` is not loaded"));
        }
        *self.active.borrow_mut() = Some(name.to_string());
        Ok(())
    }

    fn at(&self, at: Option<&str>) -> Result<String> {
        match at {
            Some(at) => Ok(at.to_string()),
            None => self.active().ok_or_else(|| err!("no active database")),
        }
    }

    /// Includes of database `at`, the active one by default.
    pub fn includes(&self, at: Option<&str>) -> Result<Vec<String>> {
        self.driver.includes(&self.at(at)?)
    }

    pub fn add_include(&self, include: &str, at: Option<&str>) -> Result<()> {
        self.driver.add_include(&self.at(at)?, include)?;
        self.refresh()?;
        Ok(())
    }

    pub fn remove_include(&self, include: &str, at: Option<&str>) -> Result<()> {
        self.driver.remove_include(&self.at(at)?, include)
    }

    pub fn commit(&self, comment: &str) -> Result<()> {
        self.driver.commit(comment)
    }

    pub fn record(&self, class: &str, id: &str) -> Result<RecordProxy> {
        let record = self.driver.get_record(class, id)?;
        RecordProxy::new(record, &self.driver, &self.registry)
    }

    pub fn records(&self, class: &str) -> Result<Vec<RecordProxy>> {
        self.driver
            .records(class)?
            .into_iter()
            .map(|record| RecordProxy::new(record, &self.driver, &self.registry))
            .collect()
    }

    /// Creates an empty record in database `at`, the active one by default.
    pub fn create_record(&self, class: &str, id: &str, at: Option<&str>) -> Result<RecordProxy> {
        let record = self.driver.create_record(&self.at(at)?, class, id)?;
        RecordProxy::new(record, &self.driver, &self.registry)
    }

    pub fn test_record(&self, class: &str, id: &str) -> bool {
        self.driver.test_record(class, id)
    }
}

impl Drop for Db {
    // Cached objects may point at each other
    fn drop(&mut self) {
        object::release(self.cache.drain());
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("driver", &self.driver)
            .field("active", &self.active.borrow())
            .field("policy", &self.policy)
            .finish()
    }
}
