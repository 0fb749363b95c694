use crate::ClassDef;
use confdal_core::{Error, Result};

use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// Classes visible at one point in time, by name.
pub(crate) struct Classes<'a>(IndexMap<&'a str, &'a ClassDef>);

impl<'a> Classes<'a> {
    pub(crate) fn new(defs: impl IntoIterator<Item = &'a ClassDef>) -> Classes<'a> {
        Classes(
            defs.into_iter()
                .map(|class| (class.name.as_str(), class))
                .collect(),
        )
    }

    pub(crate) fn get(&self, name: &str) -> Result<&'a ClassDef> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| Error::invalid_schema(format!("unknown class `{name}`")))
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.0.keys().copied()
    }

    pub(crate) fn defs(&self) -> impl Iterator<Item = &'a ClassDef> + '_ {
        self.0.values().copied()
    }

    /// Every ancestor of `name`, nearest first.
    pub(crate) fn ancestors(&self, name: &str) -> Result<Vec<&'a str>> {
        let mut seen = IndexSet::new();
        let mut queue: VecDeque<&'a str> = self
            .get(name)?
            .superclasses
            .iter()
            .map(String::as_str)
            .collect();

        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(class) = self.0.get(name) {
                queue.extend(class.superclasses.iter().map(String::as_str));
            }
        }
        Ok(seen.into_iter().collect())
    }

    /// True if `class` is `base` or derives from it.
    pub(crate) fn is_a(&self, class: &str, base: &str) -> bool {
        class == base
            || self
                .ancestors(class)
                .is_ok_and(|ancestors| ancestors.iter().any(|name| *name == base))
    }

    /// `name` and its ancestors, most basic first.
    pub(crate) fn lineage(&self, name: &str) -> Result<Vec<&'a ClassDef>> {
        let mut lineage = vec![self.get(name)?];
        for ancestor in self.ancestors(name)? {
            lineage.push(self.get(ancestor)?);
        }
        lineage.reverse();
        Ok(lineage)
    }

    /// True if `class` or an ancestor declares `field`.
    pub(crate) fn has_field(&self, class: &str, field: &str) -> Result<bool> {
        Ok(self.lineage(class)?.iter().any(|class| {
            class.attributes.iter().any(|attr| attr.name == field)
                || class.relations.iter().any(|rel| rel.name == field)
        }))
    }
}
