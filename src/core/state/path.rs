//! Dot-delimited addresses into the state tree

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{SheetbookError, SheetbookResult};

/// A validated, dot-delimited state path such as `ui.selectedSheet`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    raw: String,
    segments: Vec<String>,
}

impl StatePath {
    /// Parse a path; empty paths and empty segments (`a..b`) are rejected
    pub fn parse(raw: &str) -> SheetbookResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SheetbookError::Validation("State path is empty".into()));
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(SheetbookError::Validation(format!(
                "State path has an empty segment: {:?}",
                raw
            )));
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

    /// First segment, i.e. the top-level state key
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// The path itself followed by each ancestor, deepest first:
    /// `a.b.c` yields `a.b.c`, `a.b`, `a`. Descendants are never included.
    pub fn self_and_ancestors(&self) -> Vec<String> {
        (1..=self.segments.len())
            .rev()
            .map(|len| self.segments[..len].join("."))
            .collect()
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for StatePath {
    type Err = SheetbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Follow `segments` from `root`. Numeric segments index into arrays.
pub(crate) fn lookup<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `value` at `segments`, creating intermediate objects
///
/// A missing or scalar intermediate is replaced by an empty object. Array
/// segments must be an existing index, or one past the end when they are
/// the final segment (append).
pub(crate) fn assign(root: &mut Value, segments: &[String], value: Value) -> SheetbookResult<()> {
    let Some((last, parents)) = segments.split_last() else {
        return Err(SheetbookError::Validation("State path is empty".into()));
    };

    let mut current = root;
    for segment in parents {
        current = child_or_create(current, segment)?;
    }

    if !matches!(current, Value::Object(_) | Value::Array(_)) {
        *current = Value::Object(Map::new());
    }

    match current {
        Value::Array(items) => {
            let index = array_index(last, items.len() + 1)?;
            if index == items.len() {
                items.push(value);
            } else {
                items[index] = value;
            }
        }
        Value::Object(map) => {
            map.insert(last.clone(), value);
        }
        _ => {}
    }
    Ok(())
}

fn child_or_create<'a>(current: &'a mut Value, segment: &str) -> SheetbookResult<&'a mut Value> {
    if !matches!(current, Value::Object(_) | Value::Array(_)) {
        *current = Value::Object(Map::new());
    }

    match current {
        Value::Array(items) => {
            let index = array_index(segment, items.len())?;
            Ok(&mut items[index])
        }
        Value::Object(map) => Ok(map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        _ => Err(SheetbookError::Validation(format!(
            "Cannot descend into segment {:?}",
            segment
        ))),
    }
}

fn array_index(segment: &str, bound: usize) -> SheetbookResult<usize> {
    segment
        .parse::<usize>()
        .ok()
        .filter(|&i| i < bound)
        .ok_or_else(|| {
            SheetbookError::Validation(format!(
                "Array segment {:?} is not an index below {}",
                segment, bound
            ))
        })
}
