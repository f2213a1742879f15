use std::collections::HashMap;

use crate::date::to_unix_timestamp;
use crate::models::DocumentMetadataFilter;

/// Backend-neutral conjunction of field conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorFilter {
    pub must: Vec<FieldCondition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub op: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(FieldValue),
    Gte(i64),
    Lte(i64),
    In(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl VectorFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Chunks whose `document_id` is any of `ids`.
    #[must_use]
    pub fn document_ids(ids: &[String]) -> Self {
        Self {
            must: vec![FieldCondition {
                field: "document_id".into(),
                op: Condition::In(ids.to_vec()),
            }],
        }
    }

    fn push(&mut self, field: &str, op: Condition) {
        self.must.push(FieldCondition {
            field: field.to_owned(),
            op,
        });
    }

    /// Evaluate against a flattened record. Missing fields never match.
    #[must_use]
    pub fn matches(&self, payload: &HashMap<String, serde_json::Value>) -> bool {
        self.must.iter().all(|cond| {
            payload
                .get(&cond.field)
                .is_some_and(|val| condition_matches(val, &cond.op))
        })
    }
}

fn condition_matches(val: &serde_json::Value, op: &Condition) -> bool {
    match op {
        Condition::Eq(FieldValue::Integer(i)) => val.as_i64() == Some(*i),
        Condition::Eq(FieldValue::Text(s)) => val.as_str() == Some(s.as_str()),
        Condition::Gte(bound) => val.as_i64().is_some_and(|v| v >= *bound),
        Condition::Lte(bound) => val.as_i64().is_some_and(|v| v <= *bound),
        Condition::In(values) => val
            .as_str()
            .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
    }
}

impl From<&DocumentMetadataFilter> for VectorFilter {
    fn from(filter: &DocumentMetadataFilter) -> Self {
        let mut out = Self::default();
        let text = |s: &String| Condition::Eq(FieldValue::Text(s.clone()));

        if let Some(v) = &filter.document_id {
            out.push("document_id", text(v));
        }
        if let Some(v) = filter.source {
            out.push("source", Condition::Eq(FieldValue::Text(v.as_str().into())));
        }
        if let Some(v) = &filter.source_id {
            out.push("source_id", text(v));
        }
        if let Some(v) = &filter.author {
            out.push("author", text(v));
        }
        if let Some(v) = &filter.start_date {
            out.push("created_at", Condition::Gte(to_unix_timestamp(v)));
        }
        if let Some(v) = &filter.end_date {
            out.push("created_at", Condition::Lte(to_unix_timestamp(v)));
        }
        out
    }
}
