use confdal_core::{driver::RawRecord, Value};

use indexmap::IndexMap;

/// One named database: records plus the names it includes.
#[derive(Debug, Default)]
pub(crate) struct Database {
    /// Databases and schema documents this one sees
    pub(crate) includes: Vec<String>,

    pub(crate) records: IndexMap<RawRecord, IndexMap<String, Value>>,

    pub(crate) read_only: bool,

    /// Comments of every commit, oldest first
    pub(crate) comments: Vec<String>,
}

impl Database {
    pub(crate) fn new(includes: Vec<String>) -> Database {
        Database {
            includes,
            ..Database::default()
        }
    }

    /// Records with a field pointing to `target`.
    pub(crate) fn referrers<'a>(
        &'a self,
        target: &'a RawRecord,
    ) -> impl Iterator<Item = &'a RawRecord> + 'a {
        self.records
            .iter()
            .filter(move |(record, fields)| {
                *record != target && fields.values().any(|value| refers_to(value, target))
            })
            .map(|(record, _)| record)
    }

    /// Points every reference to `from` at `to`.
    pub(crate) fn retarget(&mut self, from: &RawRecord, to: &RawRecord) {
        for fields in self.records.values_mut() {
            for value in fields.values_mut() {
                retarget(value, from, to);
            }
        }
    }
}

fn refers_to(value: &Value, target: &RawRecord) -> bool {
    match value {
        Value::Record(record) => record == target,
        Value::List(items) => items.iter().any(|item| refers_to(item, target)),
        _ => false,
    }
}

fn retarget(value: &mut Value, from: &RawRecord, to: &RawRecord) {
    match value {
        Value::Record(record) if record == from => *record = to.clone(),
        Value::List(items) => items.iter_mut().for_each(|item| retarget(item, from, to)),
        _ => {}
    }
}

/// Records a value points to.
pub(crate) fn targets(value: &Value) -> Vec<&RawRecord> {
    match value {
        Value::Record(record) => vec![record],
        Value::List(items) => items.iter().flat_map(targets).collect(),
        _ => vec![],
    }
}
