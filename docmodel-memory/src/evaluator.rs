//! Query expression evaluation for in-memory document filtering.
//!
//! Matching follows the document database's rules closely enough for both backends to
//! agree on the same filter:
//!
//! - field names may be dotted paths into nested documents;
//! - an equality term on an array field matches if any element is equal;
//! - a missing field equals `null`, and negative operators (`Ne`, `NotContains`,
//!   `NoneOf`) match documents lacking the field.

use std::cmp::Ordering;
use bson::{Bson, Document as BsonDocument, datetime::DateTime, oid};

use docmodel_core::{
    query::{QueryVisitor, Expr, FieldOp, Sort, SortDirection},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to `f64`. Values without a meaningful ordering (regular
/// expressions, code, ...) compare as [`Comparable::Opaque`] and are never equal to
/// anything.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    /// All integers and floats, normalized to f64.
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(oid::ObjectId),
    Bytes(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    /// Embedded document fields in stored order; equality is order-sensitive.
    Map(Vec<(&'a str, Comparable<'a>)>),
    Opaque,
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Binary(binary) => Comparable::Bytes(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            _ => Comparable::Opaque,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Rank of the value's type in the cross-type sort order (nulls first).
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Bytes(_) => 5,
            Comparable::ObjectId(_) => 6,
            Comparable::Bool(_) => 7,
            Comparable::DateTime(_) => 8,
            Comparable::Opaque => 9,
        }
    }

    /// Total order used for sorting: by type rank, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

/// Resolves a dotted path (`address.city`) inside a document.
pub(crate) fn lookup<'a>(document: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    match path.split_once('.') {
        None => document.get(path),
        Some((head, rest)) => match document.get(head)? {
            Bson::Document(nested) => lookup(nested, rest),
            _ => None,
        },
    }
}

/// Orders two documents by `sort`; missing fields sort as `null`.
pub(crate) fn compare_by(sort: &Sort, a: &BsonDocument, b: &BsonDocument) -> Ordering {
    let left = lookup(a, &sort.field)
        .map(Comparable::from)
        .unwrap_or(Comparable::Null);
    let right = lookup(b, &sort.field)
        .map(Comparable::from)
        .unwrap_or(Comparable::Null);

    match sort.direction {
        SortDirection::Asc => left.sort_cmp(&right),
        SortDirection::Desc => right.sort_cmp(&left),
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a BsonDocument,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a BsonDocument) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Evaluates `filter` against `document`; no filter matches everything.
    pub fn matches(document: &BsonDocument, filter: Option<&Expr>) -> DocumentStoreResult<bool> {
        match filter {
            Some(expr) => DocumentEvaluator::new(document).evaluate(expr),
            None => Ok(true),
        }
    }
}

fn equals(field_value: &Comparable<'_>, value: &Comparable<'_>) -> bool {
    match (field_value, value) {
        (Comparable::Array(items), single) if !matches!(single, Comparable::Array(_)) => {
            items.iter().any(|item| item == single)
        }
        _ => field_value == value,
    }
}

fn any_of(field_value: &Comparable<'_>, values: &Comparable<'_>) -> bool {
    match values {
        Comparable::Array(values) => values.iter().any(|val| equals(field_value, val)),
        single => equals(field_value, single),
    }
}

fn contains(field_value: &Comparable<'_>, value: &Comparable<'_>) -> bool {
    match (field_value, value) {
        (Comparable::Array(items), Comparable::Array(needles)) => {
            needles.iter().all(|needle| items.iter().any(|item| item == needle))
        }
        (Comparable::Array(items), needle) => items.iter().any(|item| item == needle),
        (Comparable::String(haystack), Comparable::String(needle)) => haystack.contains(needle),
        _ => false,
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let expected = Comparable::from(value);

        let Some(field_value) = lookup(self.document, field) else {
            return Ok(match op {
                FieldOp::Eq => expected == Comparable::Null,
                FieldOp::Ne => expected != Comparable::Null,
                FieldOp::AnyOf => any_of(&Comparable::Null, &expected),
                FieldOp::NotContains | FieldOp::NoneOf => true,
                _ => false,
            });
        };

        let actual = Comparable::from(field_value);

        Ok(match op {
            FieldOp::Eq => equals(&actual, &expected),
            FieldOp::Ne => !equals(&actual, &expected),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match actual.partial_cmp(&expected) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            }
            FieldOp::Contains => contains(&actual, &expected),
            FieldOp::NotContains => !contains(&actual, &expected),
            FieldOp::StartsWith => match (&actual, &expected) {
                (Comparable::String(left), Comparable::String(right)) => left.starts_with(right),
                _ => false,
            },
            FieldOp::EndsWith => match (&actual, &expected) {
                (Comparable::String(left), Comparable::String(right)) => left.ends_with(right),
                _ => false,
            },
            FieldOp::AnyOf => any_of(&actual, &expected),
            FieldOp::NoneOf => !any_of(&actual, &expected),
        })
    }
}
