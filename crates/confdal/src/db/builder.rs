use super::{Db, SessionCache};
use crate::{Policy, Registry};
use confdal_core::{err, Driver, Result};

use std::{cell::RefCell, rc::Rc};

#[derive(Debug, Default)]
pub struct Builder {
    /// Context shared with other sessions; a fresh one when unset
    registry: Option<Rc<Registry>>,

    policy: Policy,

    /// Database new records go to; the first loaded one when unset
    active: Option<String>,
}

impl Builder {
    pub fn registry(&mut self, registry: Rc<Registry>) -> &mut Self {
        self.registry = Some(registry);
        self
    }

    /// Policy used by [`Db::update`].
    pub fn policy(&mut self, policy: Policy) -> &mut Self {
        self.policy = policy;
        self
    }

    pub fn active(&mut self, name: &str) -> &mut Self {
        self.active = Some(name.to_string());
        self
    }

    pub fn build(&mut self, driver: impl Driver) -> Result<Db> {
        self.build_shared(Rc::new(driver))
    }

    /// Builds a session over a driver the caller keeps a handle to.
    pub fn build_shared<D: Driver>(&mut self, driver: Rc<D>) -> Result<Db> {
        let databases = driver.databases();

        let active = match self.active.take() {
            Some(name) if databases.contains(&name) => Some(name),
            Some(name) => return Err(err!("database `{name}` is not loaded")),
            None => databases.first().cloned(),
        };

        let db = Db {
            driver,
            registry: self.registry.take().unwrap_or_default(),
            cache: SessionCache::new(),
            policy: self.policy,
            active: RefCell::new(active),
        };
        db.refresh()?;

        Ok(db)
    }
}
