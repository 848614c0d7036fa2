//! Document references, queries and listen targets.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;
use tailor_hub_core::decode::Fields;

use super::BackendError;

/// Most values a membership filter may carry.
pub const MAX_IN_VALUES: usize = 30;

/// Path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    /// Collection path, e.g. `orders` or `chats/{thread}/messages`.
    pub collection: String,
    /// Document ID.
    pub id: String,
}

impl DocumentRef {
    /// Reference a document in a collection.
    #[must_use]
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A single filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals a value.
    Eq(String, Value),
    /// Field equals one of the values.
    In(String, Vec<Value>),
}

impl Filter {
    /// Whether a document's fields satisfy this clause.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Self::Eq(field, value) => fields.get(field) == Some(value),
            Self::In(field, values) => fields.get(field).is_some_and(|v| values.contains(v)),
        }
    }
}

/// Sort clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A collection query: filters, then an optional sort.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    /// All documents of a collection.
    #[must_use]
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    /// Add an equality filter.
    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    /// Add a membership filter.
    #[must_use]
    pub fn where_in<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In(
            field.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Sort by a field.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Check the query against the store's limits.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidQuery`] for an empty or oversized
    /// membership filter, or more than one membership filter.
    pub fn validate(&self) -> Result<(), BackendError> {
        let mut memberships = 0;
        for filter in &self.filters {
            if let Filter::In(field, values) = filter {
                memberships += 1;
                if values.is_empty() {
                    return Err(BackendError::InvalidQuery(format!(
                        "membership filter on `{field}` has no values"
                    )));
                }
                if values.len() > MAX_IN_VALUES {
                    return Err(BackendError::InvalidQuery(format!(
                        "membership filter on `{field}` has {} values (max {MAX_IN_VALUES})",
                        values.len()
                    )));
                }
            }
        }
        if memberships > 1 {
            return Err(BackendError::InvalidQuery(
                "only one membership filter is allowed per query".to_owned(),
            ));
        }
        Ok(())
    }

    /// Whether a document belongs in the result.
    ///
    /// Documents without the sort field are excluded, as the hosted store
    /// does.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|f| f.matches(fields))
            && self
                .order_by
                .as_ref()
                .is_none_or(|o| fields.get(&o.field).is_some_and(|v| !v.is_null()))
    }

    /// Order two documents by the sort clause, ties broken by ID.
    #[must_use]
    pub fn compare(&self, a: (&str, &Fields), b: (&str, &Fields)) -> Ordering {
        let by_field = self.order_by.as_ref().map_or(Ordering::Equal, |o| {
            let ordering = compare_values(
                a.1.get(&o.field).unwrap_or(&Value::Null),
                b.1.get(&o.field).unwrap_or(&Value::Null),
            );
            match o.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });
        by_field.then_with(|| a.0.cmp(b.0))
    }
}

/// What a live subscription follows.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenTarget {
    Query(Query),
    Document(DocumentRef),
}

impl From<Query> for ListenTarget {
    fn from(query: Query) -> Self {
        Self::Query(query)
    }
}

impl From<DocumentRef> for ListenTarget {
    fn from(doc: DocumentRef) -> Self {
        Self::Document(doc)
    }
}

const fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values: by type first, then by value.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(x, y)| compare_values(x, y))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
