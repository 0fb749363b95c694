use crate::Registry;
use confdal_core::{
    coerce,
    driver::RawRecord,
    schema::{ClassSchema, RelationSpec},
    Driver, Error, Result, ValidationErrorKind, Value,
};

use indexmap::{IndexMap, IndexSet};
use std::{
    cell::RefCell,
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

/// Schema aware view over one raw record.
///
/// Attribute reads go straight to the store. Relation reads are resolved
/// once into further proxies and cached; a relation whose records cannot be
/// fetched reads as empty, see [`is_degraded`](Self::is_degraded).
pub struct RecordProxy {
    record: RawRecord,
    schema: Rc<ClassSchema>,
    driver: Rc<dyn Driver>,
    registry: Rc<Registry>,
    relations: RefCell<IndexMap<String, Related>>,
    degraded: RefCell<IndexSet<String>>,
}

/// Resolved value of a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Option<Rc<RecordProxy>>),
    Many(Vec<Rc<RecordProxy>>),
}

/// A field read through a proxy.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyValue {
    Attribute(Value),
    Relation(Related),
}

impl RecordProxy {
    pub fn new(
        record: RawRecord,
        driver: &Rc<dyn Driver>,
        registry: &Rc<Registry>,
    ) -> Result<RecordProxy> {
        let schema = registry.schemas().schema(&record.class)?;

        Ok(RecordProxy {
            record,
            schema,
            driver: driver.clone(),
            registry: registry.clone(),
            relations: RefCell::default(),
            degraded: RefCell::default(),
        })
    }

    pub fn record(&self) -> &RawRecord {
        &self.record
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn class_name(&self) -> &str {
        &self.record.class
    }

    pub fn full_name(&self) -> String {
        self.record.full_name()
    }

    pub fn schema(&self) -> &Rc<ClassSchema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Result<ProxyValue> {
        if self.schema.attribute(name).is_some() {
            self.attribute(name).map(ProxyValue::Attribute)
        } else {
            self.relation(name).map(ProxyValue::Relation)
        }
    }

    pub fn attribute(&self, name: &str) -> Result<Value> {
        let spec = self
            .schema
            .attribute(name)
            .ok_or_else(|| Error::unknown_field(&self.schema.name, name))?;

        self.driver.get(&self.record, name, spec.getter)
    }

    /// Reads a relation, resolving it on first access.
    pub fn relation(&self, name: &str) -> Result<Related> {
        let spec = self
            .schema
            .relation(name)
            .ok_or_else(|| Error::unknown_field(&self.schema.name, name))?;

        if let Some(related) = self.relations.borrow().get(name) {
            return Ok(related.clone());
        }

        let related = match self.resolve(spec) {
            Ok(related) => related,
            Err(cause) => {
                let error = Error::relation_resolution(cause, name, self.full_name());
                tracing::warn!(
                    class = %self.record.class,
                    id = %self.record.id,
                    field = name,
                    %error,
                    "relation degraded to empty"
                );
                self.degraded.borrow_mut().insert(name.to_string());
                Related::empty(spec.multivalue)
            }
        };

        self.relations
            .borrow_mut()
            .insert(name.to_string(), related.clone());
        Ok(related)
    }

    fn resolve(&self, spec: &RelationSpec) -> Result<Related> {
        let proxy = |record: &RawRecord| {
            RecordProxy::new(record.clone(), &self.driver, &self.registry).map(Rc::new)
        };

        match self.driver.get(&self.record, &spec.name, spec.getter)? {
            Value::Null => Ok(Related::empty(spec.multivalue)),
            Value::Record(record) if !spec.multivalue => Ok(Related::One(Some(proxy(&record)?))),
            Value::List(items) if spec.multivalue => items
                .iter()
                .map(|item| match item {
                    Value::Record(record) => proxy(record),
                    other => Err(confdal_core::err!(
                        "store returned {} for relation `{}`",
                        other.type_name(),
                        spec.name
                    )),
                })
                .collect::<Result<Vec<_>>>()
                .map(Related::Many),
            other => Err(confdal_core::err!(
                "store returned {} for relation `{}`",
                other.type_name(),
                spec.name
            )),
        }
    }

    /// True if the last resolution of `name` failed and the relation reads
    /// as empty because of it.
    pub fn is_degraded(&self, name: &str) -> bool {
        self.degraded.borrow().contains(name)
    }

    pub fn set(&self, name: &str, value: ProxyValue) -> Result<()> {
        match value {
            ProxyValue::Attribute(value) => self.set_attribute(name, value).map(drop),
            ProxyValue::Relation(related) => self.set_relation(name, related),
        }
    }

    /// Coerces and writes an attribute, returning the value written.
    pub fn set_attribute(&self, name: &str, value: Value) -> Result<Value> {
        let spec = self
            .schema
            .attribute(name)
            .ok_or_else(|| Error::unknown_field(&self.schema.name, name))?;

        let value = coerce::coerce(spec, &self.full_name(), value, &|class: &str| {
            self.registry.is_known(class)
        })?;
        self.driver
            .set(&self.record, name, spec.setter, value.clone())?;
        Ok(value)
    }

    /// Writes a relation and caches the new value.
    pub fn set_relation(&self, name: &str, related: Related) -> Result<()> {
        let spec = self
            .schema
            .relation(name)
            .ok_or_else(|| Error::unknown_field(&self.schema.name, name))?;

        let targets: Vec<&Rc<RecordProxy>> = match (&related, spec.multivalue) {
            (Related::One(target), false) => target.iter().collect(),
            (Related::Many(targets), true) => targets.iter().collect(),
            _ => {
                return Err(Error::validation(
                    name,
                    self.full_name(),
                    &related,
                    ValidationErrorKind::Cardinality {
                        multivalue: spec.multivalue,
                    },
                ))
            }
        };

        if let Some(target) = targets.iter().find(|target| !target.schema.is_a(&spec.class)) {
            return Err(Error::validation(
                name,
                self.full_name(),
                target.record(),
                ValidationErrorKind::Target {
                    expected: spec.class.as_str().into(),
                },
            ));
        }

        let value = match &related {
            Related::One(None) => Value::Null,
            Related::One(Some(target)) => Value::Record(target.record.clone()),
            Related::Many(targets) => Value::List(
                targets
                    .iter()
                    .map(|target| Value::Record(target.record.clone()))
                    .collect(),
            ),
        };

        self.driver.set(&self.record, name, spec.setter, value)?;

        self.degraded.borrow_mut().shift_remove(name);
        self.relations
            .borrow_mut()
            .insert(name.to_string(), related);
        Ok(())
    }
}

impl Related {
    pub fn empty(multivalue: bool) -> Related {
        if multivalue {
            Related::Many(vec![])
        } else {
            Related::One(None)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Related::One(target) => target.is_none(),
            Related::Many(targets) => targets.is_empty(),
        }
    }

    /// Every proxy this relation points to.
    pub fn proxies(&self) -> Vec<Rc<RecordProxy>> {
        match self {
            Related::One(target) => target.iter().cloned().collect(),
            Related::Many(targets) => targets.clone(),
        }
    }

    pub fn into_proxies(self) -> Vec<Rc<RecordProxy>> {
        match self {
            Related::One(target) => target.into_iter().collect(),
            Related::Many(targets) => targets,
        }
    }
}

impl fmt::Display for Related {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Related::One(None) => f.write_str("none"),
            Related::One(Some(target)) => write!(f, "<{}>", target.record),
            Related::Many(targets) => {
                f.write_str("[")?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "<{}>", target.record)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl PartialEq for RecordProxy {
    fn eq(&self, other: &RecordProxy) -> bool {
        self.record == other.record
    }
}

impl Eq for RecordProxy {}

impl Hash for RecordProxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.record.hash(state);
    }
}

impl PartialOrd for RecordProxy {
    fn partial_cmp(&self, other: &RecordProxy) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordProxy {
    fn cmp(&self, other: &RecordProxy) -> Ordering {
        self.record.cmp(&other.record)
    }
}

impl fmt::Debug for RecordProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordProxy({})", self.record)
    }
}

impl Drop for RecordProxy {
    // Chains of cached relations are released one link at a time
    fn drop(&mut self) {
        let mut stack: Vec<_> = self
            .relations
            .get_mut()
            .drain(..)
            .flat_map(|(_, related)| related.into_proxies())
            .collect();

        while let Some(proxy) = stack.pop() {
            if let Ok(mut proxy) = Rc::try_unwrap(proxy) {
                stack.extend(
                    proxy
                        .relations
                        .get_mut()
                        .drain(..)
                        .flat_map(|(_, related)| related.into_proxies()),
                );
            }
        }
    }
}
