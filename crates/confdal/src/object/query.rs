use super::DalObject;

use regex::Regex;
use std::fmt;

/// Which ids, or class names, an object search matches.
#[derive(Debug, Clone, Default)]
pub enum Query {
    /// Every name
    #[default]
    Any,

    /// Exactly this name
    Id(String),

    /// Names the pattern matches from their first character
    Pattern(Regex),
}

impl Query {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Query::Any => true,
            Query::Id(id) => id == name,
            Query::Pattern(pattern) => matches_at_start(pattern, name),
        }
    }
}

pub(crate) fn matches_at_start(pattern: &Regex, name: &str) -> bool {
    pattern.find(name).is_some_and(|m| m.start() == 0)
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Any => f.write_str("*"),
            Query::Id(id) => f.write_str(id),
            Query::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
        }
    }
}

/// Result of an object search.
#[derive(Debug, Clone, PartialEq)]
pub enum Found {
    One(DalObject),

    /// Every match, sorted by class then id
    Many(Vec<DalObject>),
}

impl Found {
    pub(crate) fn many(mut objects: Vec<DalObject>) -> Found {
        objects.sort();
        Found::Many(objects)
    }

    pub fn into_one(self) -> Option<DalObject> {
        match self {
            Found::One(object) => Some(object),
            Found::Many(_) => None,
        }
    }

    pub fn into_many(self) -> Vec<DalObject> {
        match self {
            Found::One(object) => vec![object],
            Found::Many(objects) => objects,
        }
    }
}

impl From<&str> for Query {
    fn from(src: &str) -> Query {
        Query::Id(src.to_string())
    }
}

impl From<String> for Query {
    fn from(src: String) -> Query {
        Query::Id(src)
    }
}

impl From<Regex> for Query {
    fn from(src: Regex) -> Query {
        Query::Pattern(src)
    }
}

impl From<Option<&str>> for Query {
    fn from(src: Option<&str>) -> Query {
        src.map(Query::from).unwrap_or(Query::Any)
    }
}
