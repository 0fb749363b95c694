//! Conversion between record proxies and typed object graphs.
//!
//! Both directions walk the graph with an explicit work list and register
//! every node in a cache keyed by identity before looking at its relations,
//! so cycles terminate and chain length is not bounded by the call stack.

use crate::{
    object::Field,
    proxy::{RecordProxy, Related},
    DalObject, Db,
};
use confdal_core::{Error, Result};

use indexmap::IndexMap;
use std::rc::Rc;

/// What persisting does when writing one field fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// Log the failure and carry on with the next field
    #[default]
    Permissive,

    /// Stop at the first failure and return it
    Pedantic,
}

/// How an object graph is written to the store.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Persist {
    pub(crate) policy: Policy,

    /// Persist every reachable object, not only the root
    pub(crate) recurse: bool,

    /// Leave objects that already have a record untouched
    pub(crate) create_only: bool,
}

/// Proxies of the objects being persisted, by full name. The flag is set
/// for records created by this persist.
type Written = IndexMap<String, (Rc<RecordProxy>, bool)>;

/// Builds the object graph rooted at `root`.
///
/// Objects already in the session cache are reused as they are.
pub(crate) fn hydrate(db: &Db, root: Rc<RecordProxy>) -> Result<DalObject> {
    if let Some(object) = db.cache().get(root.class_name(), root.id()) {
        return Ok(object);
    }

    let object = instantiate(db, &root)?;
    let mut pending = vec![(root, object.clone())];

    while let Some((proxy, target)) = pending.pop() {
        let schema = proxy.schema().clone();

        for name in schema.attributes.keys() {
            target.load(name, Field::Value(proxy.attribute(name)?));
        }

        for (name, spec) in &schema.relations {
            let mut objects = vec![];

            for related in proxy.relation(name)?.into_proxies() {
                let object = match db.cache().get(related.class_name(), related.id()) {
                    Some(object) => object,
                    None => {
                        let object = instantiate(db, &related)?;
                        pending.push((related, object.clone()));
                        object
                    }
                };
                objects.push(object);
            }

            let field = if spec.multivalue {
                Field::Objects(objects)
            } else {
                objects.pop().map(Field::Object).unwrap_or_default()
            };
            target.load(name, field);
        }
    }

    Ok(object)
}

/// Creates the object for `proxy` and caches it, before any field is read.
fn instantiate(db: &Db, proxy: &RecordProxy) -> Result<DalObject> {
    let ty = db.registry().ty(proxy.class_name())?;
    let object = DalObject::new(&ty, proxy.id());
    db.cache().insert(&object);
    Ok(object)
}

/// Writes `root`, and with `recurse` every object reachable from it, to the
/// store. Returns the proxy of the root record.
pub(crate) fn persist(db: &Db, root: &DalObject, mode: Persist) -> Result<Rc<RecordProxy>> {
    let objects = if mode.recurse {
        root.traverse_all()
    } else {
        vec![root.clone()]
    };

    // Every record exists before any relation is written
    let mut written = Written::new();
    for object in &objects {
        apply_rename(db, object)?;

        let key = object.full_name();
        if written.contains_key(&key) {
            continue;
        }

        let class = object.class_name();
        let id = object.id();
        let entry = if db.test_record(&class, &id) {
            (Rc::new(db.record(&class, &id)?), false)
        } else {
            tracing::debug!(%class, %id, "creating record");
            (Rc::new(db.create_record(&class, &id, None)?), true)
        };
        written.insert(key, entry);
    }

    for object in &objects {
        let Some((proxy, created)) = written.get(&object.full_name()).cloned() else {
            continue;
        };

        if !mode.create_only || created {
            write_fields(db, object, &proxy, &written, mode)?;
            object.clear_touched();
        }
        db.cache().insert(object);
    }

    written
        .get(&root.full_name())
        .map(|(proxy, _)| proxy.clone())
        .ok_or_else(|| Error::object_not_found(root.full_name()))
}

/// Issues the store rename for a pending [`DalObject::rename`].
fn apply_rename(db: &Db, object: &DalObject) -> Result<()> {
    let Some(old_id) = object.pending_rename() else {
        return Ok(());
    };

    let class = object.class_name();
    let id = object.id();

    if old_id != id && db.driver().test_record(&class, &old_id) {
        let record = db.driver().get_record(&class, &old_id)?;
        db.driver().rename_record(&record, &id)?;
        tracing::debug!(%class, from = %old_id, to = %id, "renamed record");
    }

    object.clear_rename();
    db.cache().evict_id(object, &old_id);
    Ok(())
}

fn write_fields(
    db: &Db,
    object: &DalObject,
    proxy: &RecordProxy,
    written: &Written,
    mode: Persist,
) -> Result<()> {
    let schema = object.schema();

    for name in schema.attributes.keys() {
        let Field::Value(value) = object.get(name)? else {
            continue;
        };

        if let Err(error) = proxy.set_attribute(name, value) {
            skip_or_fail(object, name, error, mode.policy)?;
        }
    }

    for (name, spec) in &schema.relations {
        let field = object.get(name)?;

        // A target that cannot be found is never skipped
        let targets = field
            .objects()
            .iter()
            .map(|target| target_proxy(db, target, written))
            .collect::<Result<Vec<_>>>()?;

        let related = if spec.multivalue {
            Related::Many(targets)
        } else {
            Related::One(targets.into_iter().next())
        };

        if let Err(error) = proxy.set_relation(name, related) {
            skip_or_fail(object, name, error, mode.policy)?;
        }
    }

    Ok(())
}

/// The proxy a relation target is written as: the one persisted in this
/// pass, or else the record the store already holds.
fn target_proxy(db: &Db, target: &DalObject, written: &Written) -> Result<Rc<RecordProxy>> {
    if let Some((proxy, _)) = written.get(&target.full_name()) {
        return Ok(proxy.clone());
    }

    let record = db.driver().get_record(&target.class_name(), &target.id())?;
    Ok(Rc::new(RecordProxy::new(record, db.driver(), db.registry())?))
}

fn skip_or_fail(object: &DalObject, field: &str, error: Error, policy: Policy) -> Result<()> {
    match policy {
        Policy::Permissive => {
            tracing::warn!(
                class = %object.class_name(),
                id = %object.id(),
                field,
                %error,
                "skipping field"
            );
            Ok(())
        }
        Policy::Pedantic => Err(error.context(format!(
            "cannot write `{field}` of {}",
            object.full_name()
        ))),
    }
}
