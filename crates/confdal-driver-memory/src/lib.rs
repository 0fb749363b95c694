mod classes;
use classes::Classes;

mod database;
use database::Database;

mod schema;
pub use schema::{ClassDef, SchemaFile};

use confdal_core::{
    driver::{Accessor, RawRecord},
    err,
    schema::{AttributeDef, RelationDef},
    Driver, Error, Result, Value,
};

use indexmap::{IndexMap, IndexSet};
use std::{cell::RefCell, collections::VecDeque};

/// A record store held in memory.
///
/// The store knows named schema documents and named databases. A database
/// includes other databases and schema documents; what the loaded databases
/// include, transitively, is visible.
#[derive(Debug, Default)]
pub struct Memory {
    state: RefCell<State>,
}

#[derive(Debug, Default)]
struct State {
    schemas: IndexMap<String, SchemaFile>,
    databases: IndexMap<String, Database>,
    loaded: Vec<String>,
    renames: usize,
}

impl Memory {
    pub fn new() -> Memory {
        Memory::default()
    }

    /// Registers a schema document under `name`, replacing any previous
    /// document of that name.
    pub fn add_schema(&self, name: &str, file: SchemaFile) {
        self.state
            .borrow_mut()
            .schemas
            .insert(name.to_string(), file);
    }

    pub fn add_schema_json(&self, name: &str, src: &str) -> Result<()> {
        self.add_schema(name, SchemaFile::from_json(src)?);
        Ok(())
    }

    /// Creates a database without loading it.
    pub fn add_database(&self, name: &str, includes: &[&str]) -> Result<()> {
        let includes = includes.iter().map(|include| include.to_string()).collect();
        self.state.borrow_mut().add_database(name, includes)
    }

    /// Makes a database and everything it includes visible.
    pub fn load(&self, name: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.database(name)?;
        if !state.loaded.iter().any(|loaded| loaded == name) {
            state.loaded.push(name.to_string());
        }
        Ok(())
    }

    /// Writes to records of a read-only database fail.
    pub fn set_read_only(&self, name: &str, read_only: bool) -> Result<()> {
        self.state.borrow_mut().database_mut(name)?.read_only = read_only;
        Ok(())
    }

    /// Commit comments of database `name`, oldest first.
    pub fn comments(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.state.borrow().database(name)?.comments.clone())
    }

    /// Number of records renamed so far.
    pub fn renames(&self) -> usize {
        self.state.borrow().renames
    }

    /// Name of the database holding `record`, if it is visible.
    pub fn location(&self, record: &RawRecord) -> Option<String> {
        let state = self.state.borrow();
        state.locate(&state.visible(), record)
    }
}

impl State {
    fn database(&self, name: &str) -> Result<&Database> {
        self.databases
            .get(name)
            .ok_or_else(|| err!("unknown database `{name}`"))
    }

    fn database_mut(&mut self, name: &str) -> Result<&mut Database> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| err!("unknown database `{name}`"))
    }

    fn add_database(&mut self, name: &str, includes: Vec<String>) -> Result<()> {
        if self.databases.contains_key(name) {
            return Err(Error::already_exists(format!("database `{name}`")));
        }
        for include in &includes {
            self.check_include(include)?;
        }
        self.databases
            .insert(name.to_string(), Database::new(includes));
        Ok(())
    }

    fn check_include(&self, include: &str) -> Result<()> {
        if self.databases.contains_key(include) || self.schemas.contains_key(include) {
            Ok(())
        } else {
            Err(err!("cannot include `{include}`: no such database or schema"))
        }
    }

    /// Names reachable from `roots` through includes, roots first.
    fn closure<'a>(&self, roots: impl IntoIterator<Item = &'a str>) -> IndexSet<String> {
        let mut seen = IndexSet::new();
        let mut queue: VecDeque<String> = roots.into_iter().map(str::to_string).collect();

        while let Some(name) = queue.pop_front() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(db) = self.databases.get(&name) {
                queue.extend(db.includes.iter().cloned());
            }
        }
        seen
    }

    fn visible(&self) -> IndexSet<String> {
        self.closure(self.loaded.iter().map(String::as_str))
    }

    fn classes(&self) -> Classes<'_> {
        Classes::new(
            self.visible()
                .iter()
                .filter_map(|name| self.schemas.get(name))
                .flat_map(|file| &file.classes),
        )
    }

    /// The database in `scope` holding exactly `record`.
    fn locate(&self, scope: &IndexSet<String>, record: &RawRecord) -> Option<String> {
        scope
            .iter()
            .find(|name| {
                self.databases
                    .get(*name)
                    .is_some_and(|db| db.records.contains_key(record))
            })
            .cloned()
    }

    fn locate_visible(&self, record: &RawRecord) -> Result<String> {
        self.locate(&self.visible(), record)
            .ok_or_else(|| Error::record_not_found(record.to_string()))
    }

    /// A visible record with id `id` whose class is `class` or a subclass.
    fn find(&self, class: &str, id: &str) -> Option<RawRecord> {
        let classes = self.classes();
        self.lookup(&classes, id, |candidate| classes.is_a(candidate, class))
    }

    /// A visible record with id `id` in the same hierarchy as `class`.
    fn conflict(&self, class: &str, id: &str) -> Option<RawRecord> {
        let classes = self.classes();
        self.lookup(&classes, id, |candidate| {
            classes.is_a(candidate, class) || classes.is_a(class, candidate)
        })
    }

    fn lookup(
        &self,
        classes: &Classes<'_>,
        id: &str,
        accept: impl Fn(&str) -> bool,
    ) -> Option<RawRecord> {
        let visible = self.visible();
        classes
            .names()
            .filter(|class| accept(class))
            .map(|class| RawRecord::new(class, id))
            .find(|record| self.locate(&visible, record).is_some())
    }

    fn writable(&self, name: &str) -> Result<()> {
        if self.database(name)?.read_only {
            Err(Error::constraint_violation(format!(
                "database `{name}` is read-only"
            )))
        } else {
            Ok(())
        }
    }

    fn check_field(&self, record: &RawRecord, name: &str) -> Result<()> {
        if self.classes().has_field(&record.class, name)? {
            Ok(())
        } else {
            Err(Error::unknown_field(&record.class, name))
        }
    }
}

impl Driver for Memory {
    fn get_record(&self, class: &str, id: &str) -> Result<RawRecord> {
        self.state
            .borrow()
            .find(class, id)
            .ok_or_else(|| Error::record_not_found(format!("{id}@{class}")))
    }

    fn records(&self, class: &str) -> Result<Vec<RawRecord>> {
        let state = self.state.borrow();
        let classes = state.classes();
        classes.get(class)?;

        let mut records = IndexSet::new();
        for name in state.visible() {
            let Some(db) = state.databases.get(&name) else {
                continue;
            };
            records.extend(
                db.records
                    .keys()
                    .filter(|record| classes.is_a(&record.class, class))
                    .cloned(),
            );
        }
        Ok(records.into_iter().collect())
    }

    fn create_record(&self, at: &str, class: &str, id: &str) -> Result<RawRecord> {
        let mut state = self.state.borrow_mut();
        state.writable(at)?;
        state.classes().get(class)?;

        if let Some(existing) = state.conflict(class, id) {
            return Err(Error::already_exists(existing.to_string()));
        }

        let record = RawRecord::new(class, id);
        state
            .database_mut(at)?
            .records
            .insert(record.clone(), IndexMap::new());
        Ok(record)
    }

    fn destroy_record(&self, record: &RawRecord) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let at = state.locate_visible(record)?;
        state.writable(&at)?;

        let visible = state.visible();
        let referrer = visible
            .iter()
            .filter_map(|name| state.databases.get(name))
            .find_map(|db| db.referrers(record).next().cloned());
        if let Some(referrer) = referrer {
            return Err(Error::constraint_violation(format!(
                "{record} is referenced by {referrer}"
            )));
        }

        state.database_mut(&at)?.records.shift_remove(record);
        Ok(())
    }

    fn rename_record(&self, record: &RawRecord, new_id: &str) -> Result<RawRecord> {
        let mut state = self.state.borrow_mut();
        let at = state.locate_visible(record)?;
        state.writable(&at)?;

        if let Some(existing) = state.conflict(&record.class, new_id) {
            return Err(Error::already_exists(existing.to_string()));
        }

        let renamed = RawRecord::new(record.class.clone(), new_id);
        let db = state.database_mut(&at)?;
        let fields = db.records.shift_remove(record).unwrap_or_default();
        db.records.insert(renamed.clone(), fields);

        for db in state.databases.values_mut() {
            db.retarget(record, &renamed);
        }
        state.renames += 1;

        Ok(renamed)
    }

    fn test_record(&self, class: &str, id: &str) -> bool {
        self.state.borrow().find(class, id).is_some()
    }

    fn classes(&self) -> Vec<String> {
        self.state
            .borrow()
            .classes()
            .names()
            .map(str::to_string)
            .collect()
    }

    fn attributes(&self, class: &str, all: bool) -> Result<Vec<AttributeDef>> {
        let state = self.state.borrow();
        let classes = state.classes();
        let lineage = if all {
            classes.lineage(class)?
        } else {
            vec![classes.get(class)?]
        };

        let mut attributes = IndexMap::new();
        for attr in lineage.iter().flat_map(|class| &class.attributes) {
            attributes
                .entry(attr.name.as_str())
                .or_insert_with(|| attr.clone());
        }
        Ok(attributes.into_values().collect())
    }

    fn relations(&self, class: &str, all: bool) -> Result<Vec<RelationDef>> {
        let state = self.state.borrow();
        let classes = state.classes();
        let lineage = if all {
            classes.lineage(class)?
        } else {
            vec![classes.get(class)?]
        };

        let mut relations = IndexMap::new();
        for rel in lineage.iter().flat_map(|class| &class.relations) {
            relations
                .entry(rel.name.as_str())
                .or_insert_with(|| rel.clone());
        }
        Ok(relations.into_values().collect())
    }

    fn superclasses(&self, class: &str, all: bool) -> Result<Vec<String>> {
        let state = self.state.borrow();
        let classes = state.classes();
        if all {
            Ok(classes
                .ancestors(class)?
                .into_iter()
                .map(str::to_string)
                .collect())
        } else {
            Ok(classes.get(class)?.superclasses.clone())
        }
    }

    fn subclasses(&self, class: &str, all: bool) -> Result<Vec<String>> {
        let state = self.state.borrow();
        let classes = state.classes();
        classes.get(class)?;

        Ok(classes
            .defs()
            .filter(|candidate| {
                if all {
                    candidate.name != class && classes.is_a(&candidate.name, class)
                } else {
                    candidate.superclasses.iter().any(|name| name == class)
                }
            })
            .map(|candidate| candidate.name.clone())
            .collect())
    }

    fn get(&self, record: &RawRecord, name: &str, accessor: Accessor) -> Result<Value> {
        let state = self.state.borrow();
        let at = state.locate_visible(record)?;
        state.check_field(record, name)?;

        let value = state
            .database(&at)?
            .records
            .get(record)
            .and_then(|fields| fields.get(name))
            .cloned();

        let value = match value {
            Some(value) => value,
            None if accessor.multi => Value::List(vec![]),
            None => Value::Null,
        };

        if accessor.is_object() {
            let visible = state.visible();
            if let Some(missing) = database::targets(&value)
                .into_iter()
                .find(|target| state.locate(&visible, target).is_none())
            {
                return Err(Error::record_not_found(missing.to_string()));
            }
        }

        Ok(value)
    }

    fn set(&self, record: &RawRecord, name: &str, accessor: Accessor, value: Value) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let at = state.locate_visible(record)?;
        state.writable(&at)?;
        state.check_field(record, name)?;

        if accessor.is_object() {
            let scope = state.closure([at.as_str()]);
            if let Some(target) = database::targets(&value)
                .into_iter()
                .find(|target| state.locate(&scope, target).is_none())
            {
                return Err(Error::constraint_violation(format!(
                    "{target} is not reachable from database `{at}`"
                )));
            }
        }

        let fields = state
            .database_mut(&at)?
            .records
            .entry(record.clone())
            .or_default();
        if value.is_null() {
            fields.shift_remove(name);
        } else {
            fields.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn databases(&self) -> Vec<String> {
        self.state.borrow().loaded.clone()
    }

    fn create_database(&self, name: &str, includes: &[String]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.add_database(name, includes.to_vec())?;
        state.loaded.push(name.to_string());
        tracing::debug!(database = name, ?includes, "created database");
        Ok(())
    }

    fn includes(&self, at: &str) -> Result<Vec<String>> {
        Ok(self.state.borrow().database(at)?.includes.clone())
    }

    fn add_include(&self, at: &str, include: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_include(include)?;

        let db = state.database_mut(at)?;
        if !db.includes.iter().any(|existing| existing == include) {
            db.includes.push(include.to_string());
        }
        Ok(())
    }

    fn remove_include(&self, at: &str, include: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let db = state.database_mut(at)?;

        match db.includes.iter().position(|existing| existing == include) {
            Some(index) => {
                db.includes.remove(index);
                Ok(())
            }
            None => Err(err!("database `{at}` does not include `{include}`")),
        }
    }

    fn commit(&self, comment: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let loaded = state.loaded.clone();

        for name in loaded {
            let db = state.database_mut(&name)?;
            if !db.read_only {
                db.comments.push(comment.to_string());
            }
        }
        Ok(())
    }
}
