//! Domain types shared by the filter chain, pool, selection and sources.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::FetchError;

/// Opaque identifier for an exam, subject, topic or item.
///
/// Sources may send integers or strings; equality is by value, so `12` and
/// `"12"` name different things.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(n) => write!(f, "{n}"),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Identifier {
    fn from(n: i64) -> Self { Identifier::Int(n) }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self { Identifier::Text(s.to_string()) }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self { Identifier::Text(s) }
}

/// A candidate record (a question) as returned by a page source.
///
/// - `id`: unique across the whole bank
/// - `weight`: marks awarded; absent means 1. Read from `weight`, else `marks`
/// - `fields`: display payload the engine never interprets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ItemWire")]
pub struct Item {
    pub id: Identifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Deserialize)]
struct ItemWire {
    id: Identifier,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    marks: Option<f64>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl From<ItemWire> for Item {
    fn from(wire: ItemWire) -> Self {
        Self { id: wire.id, weight: wire.weight.or(wire.marks), fields: wire.fields }
    }
}

impl Item {
    pub fn new(id: impl Into<Identifier>) -> Self {
        Self { id: id.into(), weight: None, fields: Map::new() }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Effective weight used by aggregates.
    pub fn weight(&self) -> f64 { self.weight.unwrap_or(1.0) }

    /// Best-effort display label: `text`, `question`, then `title`, else the id.
    pub fn label(&self) -> String {
        ["text", "question", "title"]
            .iter()
            .find_map(|k| self.fields.get(*k).and_then(Value::as_str))
            .map_or_else(|| self.id.to_string(), str::to_string)
    }
}

/// One page of a filtered pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<Item>,
    pub page: u32,
    pub total_pages: u32,
}

impl Page {
    pub fn new(items: Vec<Item>, page: u32, total_pages: u32) -> Self {
        Self { items, page, total_pages }
    }

    /// Checks page numbering against the request that produced it.
    pub fn check(&self, requested: u32) -> Result<(), FetchError> {
        if self.page == 0 || self.total_pages == 0 {
            return Err(FetchError::Malformed(format!(
                "page numbers start at 1 (page={}, totalPages={})",
                self.page, self.total_pages
            )));
        }
        if self.page > self.total_pages {
            return Err(FetchError::Malformed(format!(
                "page {} exceeds totalPages {}",
                self.page, self.total_pages
            )));
        }
        if self.page != requested {
            return Err(FetchError::Malformed(format!(
                "requested page {requested}, got page {}",
                self.page
            )));
        }
        Ok(())
    }
}

/// Query sent to a page source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub filter_values: Vec<Identifier>,
    pub page: u32,
    pub limit: u32,
}

/// Derived selection metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub count: usize,
    pub total_weight: f64,
}

/// What the surrounding form reads on submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    pub selected_ids: Vec<Identifier>,
    pub count: usize,
    pub total_weight: f64,
}

/// A previously persisted selection, replayed when a saved test is edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSelection {
    pub filter_values: Vec<Identifier>,
    pub items: Vec<Item>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_weight_defaults_and_marks_alias() {
        let plain: Item = serde_json::from_str(r#"{"id": 7, "text": "2+2?"}"#).expect("parse");
        assert_eq!(plain.id, Identifier::Int(7));
        assert!((plain.weight() - 1.0).abs() < f64::EPSILON);
        assert_eq!(plain.label(), "2+2?");

        let marked: Item = serde_json::from_str(r#"{"id": "q-9", "marks": 4}"#).expect("parse");
        assert_eq!(marked.id, Identifier::from("q-9"));
        assert!((marked.weight() - 4.0).abs() < f64::EPSILON);
        assert_eq!(marked.label(), "q-9");
    }

    #[test]
    fn weight_wins_over_marks_when_both_are_sent() {
        let both: Item = serde_json::from_str(r#"{"id": 1, "weight": 2, "marks": 3}"#).expect("parse");
        assert_eq!(both.weight, Some(2.0));
        assert!(!both.fields.contains_key("marks"));

        let null_weight: Item = serde_json::from_str(r#"{"id": 1, "weight": null, "marks": 3}"#).expect("parse");
        assert_eq!(null_weight.weight, Some(3.0));

        let json = serde_json::to_value(&both).expect("json");
        assert_eq!(json, serde_json::json!({"id": 1, "weight": 2.0}));
    }

    #[test]
    fn numeric_and_text_ids_are_distinct() {
        let a: Identifier = serde_json::from_str("12").expect("int");
        let b: Identifier = serde_json::from_str("\"12\"").expect("text");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn page_check_rejects_bad_numbering() {
        assert!(Page::new(vec![], 1, 1).check(1).is_ok());
        assert!(matches!(Page::new(vec![], 0, 1).check(1), Err(FetchError::Malformed(_))));
        assert!(matches!(Page::new(vec![], 3, 2).check(3), Err(FetchError::Malformed(_))));
        assert!(matches!(Page::new(vec![], 2, 2).check(1), Err(FetchError::Malformed(_))));
    }
}
