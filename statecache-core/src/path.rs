//! Dotted-path addressing over nested JSON objects.
//!
//! `"app.config.theme"` walks `root["app"]["config"]["theme"]`. Numeric
//! segments also index into arrays that already exist, so `"users.0.name"`
//! reads and writes the first element of `users`, and `"users.2"` on a
//! two-element array appends.

use crate::StateError;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A validated dotted path: non-empty, with no empty segments.
///
/// # Examples
///
/// ```
/// use statecache_core::Path;
///
/// let path = Path::parse("app.config.theme").unwrap();
/// assert_eq!(path.segments(), ["app", "config", "theme"]);
///
/// let parent = Path::parse("app").unwrap();
/// assert!(parent.is_ancestor_of(&path));
///
/// assert!(Path::parse("").is_err());
/// assert!(Path::parse("a..b").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path {
    raw: String,
    segments: Vec<String>,
}

impl Path {
    pub fn parse(raw: &str) -> Result<Self, StateError> {
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if raw.is_empty() || segments.iter().any(|s| s.is_empty()) {
            return Err(StateError::InvalidPath(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True if `other` lies strictly below `self`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        other.segments.len() > self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// True if a write at either path can change the value at the other.
    pub fn overlaps(&self, other: &Path) -> bool {
        self == other || self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl FromStr for Path {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn index(segment: &str, len: usize) -> Option<usize> {
    segment.parse::<usize>().ok().filter(|i| *i < len)
}

/// Resolves `path` under `root`. `None` if any segment is missing.
pub fn resolve<'a>(root: &'a Value, path: &Path) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => index(segment, items.len()).map(|i| &items[i]),
            _ => None,
        })
}

/// Where a numeric segment lands in an existing array.
enum Slot {
    Existing(usize),
    Append,
}

fn array_slot(segment: &str, len: usize) -> Option<Slot> {
    let i = segment.parse::<usize>().ok()?;
    match i.cmp(&len) {
        Ordering::Less => Some(Slot::Existing(i)),
        Ordering::Equal => Some(Slot::Append),
        Ordering::Greater => None,
    }
}

/// Writes `value` at `path`, creating intermediate objects as needed.
///
/// An intermediate scalar is replaced by an empty object. Arrays are never
/// replaced: a segment equal to the array length appends, an existing index
/// overwrites that element, and any other segment leaves the store untouched
/// and returns `false`.
pub fn insert(root: &mut Value, path: &Path, value: Value) -> bool {
    let Some((last, parents)) = path.segments().split_last() else {
        return false;
    };

    let mut current = root;
    for segment in parents {
        current = match child_or_create(current, segment) {
            Some(child) => child,
            None => return false,
        };
    }

    match current {
        Value::Array(items) => match array_slot(last, items.len()) {
            Some(Slot::Existing(i)) => {
                items[i] = value;
                true
            }
            Some(Slot::Append) => {
                items.push(value);
                true
            }
            None => false,
        },
        Value::Object(map) => {
            map.insert(last.clone(), value);
            true
        }
        other => {
            let mut map = Map::new();
            map.insert(last.clone(), value);
            *other = Value::Object(map);
            true
        }
    }
}

fn child_or_create<'a>(current: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    if !current.is_object() && !current.is_array() {
        *current = Value::Object(Map::new());
    }

    match current {
        Value::Array(items) => match array_slot(segment, items.len())? {
            Slot::Existing(i) => items.get_mut(i),
            Slot::Append => {
                items.push(Value::Object(Map::new()));
                items.last_mut()
            }
        },
        Value::Object(map) => Some(
            map.entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
        ),
        _ => None,
    }
}

/// Removes and returns the value at `path`. Missing parents are a no-op.
pub fn remove(root: &mut Value, path: &Path) -> Option<Value> {
    let (last, parents) = path.segments().split_last()?;

    let mut current = root;
    for segment in parents {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => {
                let i = index(segment, items.len())?;
                &mut items[i]
            }
            _ => return None,
        };
    }

    match current {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => index(last, items.len()).map(|i| items.remove(i)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(s: &str) -> Path {
        Path::parse(s).unwrap()
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", ".", "a.", ".a", "a..b"] {
            assert!(
                matches!(Path::parse(bad), Err(StateError::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
        assert_eq!("a.b".parse::<Path>().unwrap().to_string(), "a.b");
    }

    #[test]
    fn test_ancestry() {
        assert!(p("app").is_ancestor_of(&p("app.config")));
        assert!(!p("app").is_ancestor_of(&p("app")));
        assert!(!p("app").is_ancestor_of(&p("apple.config")));
        assert!(p("app.config").overlaps(&p("app")));
        assert!(p("app").overlaps(&p("app")));
        assert!(!p("app.a").overlaps(&p("app.b")));
    }

    #[test]
    fn test_resolve_nested() {
        let root = json!({"app": {"config": {"theme": "dark"}}, "list": [1, {"x": 2}]});
        assert_eq!(resolve(&root, &p("app.config.theme")), Some(&json!("dark")));
        assert_eq!(resolve(&root, &p("list.1.x")), Some(&json!(2)));
        assert_eq!(resolve(&root, &p("app.missing.theme")), None);
        assert_eq!(resolve(&root, &p("list.9")), None);
        assert_eq!(resolve(&root, &p("app.config.theme.deeper")), None);
    }

    #[test]
    fn test_insert_creates_intermediates() {
        let mut root = json!({});
        insert(&mut root, &p("a.b.c"), json!(1));
        assert_eq!(root, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_insert_replaces_scalar_intermediate() {
        let mut root = json!({"a": 5});
        insert(&mut root, &p("a.b"), json!(true));
        assert_eq!(root, json!({"a": {"b": true}}));
    }

    #[test]
    fn test_insert_into_existing_array_slot() {
        let mut root = json!({"users": [{"name": "a"}, {"name": "b"}]});
        insert(&mut root, &p("users.1.name"), json!("z"));
        assert_eq!(root, json!({"users": [{"name": "a"}, {"name": "z"}]}));
    }

    #[test]
    fn test_insert_appends_at_array_length() {
        let mut root = json!({"users": [{"name": "a"}, {"name": "b"}]});
        assert!(insert(&mut root, &p("users.2"), json!({"name": "c"})));
        assert!(insert(&mut root, &p("users.3.name"), json!("d")));
        assert_eq!(
            root,
            json!({"users": [{"name": "a"}, {"name": "b"}, {"name": "c"}, {"name": "d"}]})
        );
    }

    #[test]
    fn test_insert_never_replaces_array() {
        let mut root = json!({"list": [1, 2]});
        assert!(!insert(&mut root, &p("list.5.x"), json!(1)));
        assert!(!insert(&mut root, &p("list.7"), json!(1)));
        assert!(!insert(&mut root, &p("list.name"), json!(1)));
        assert!(!insert(&mut root, &p("list.name.deeper"), json!(1)));
        assert_eq!(root, json!({"list": [1, 2]}));
    }

    #[test]
    fn test_remove() {
        let mut root = json!({"a": {"b": 1, "c": 2}});
        assert_eq!(remove(&mut root, &p("a.b")), Some(json!(1)));
        assert_eq!(root, json!({"a": {"c": 2}}));
        assert_eq!(remove(&mut root, &p("x.y")), None);
        assert_eq!(remove(&mut root, &p("a.c.d")), None);
    }
}
