//! Query construction and filtering API for collections.
//!
//! Queries can be built with the fluent builder, from a single [`Expr`], or from a plain
//! BSON document of equality terms (the shape most callers already have):
//!
//! ```ignore
//! use docmodel::query::{Filter, Query, SortDirection};
//! use bson::doc;
//!
//! let by_name = Query::builder()
//!     .filter(Filter::eq("firstname", "Ada").and(Filter::exists("address")))
//!     .sort("lastname", SortDirection::Asc)
//!     .limit(10)
//!     .build();
//!
//! let by_id: Query = doc! { "_id": "5f1d7e0c9b1e8a3d4c2b1a09" }.into();
//! let everything: Query = doc! {}.into();
//! ```
//!
//! Field names may be dotted paths (`address.city`) that reach into nested documents.
//!
//! Before a query is handed to a backend, [`Query::cast`] converts every term on an
//! identifier path into a native [`ObjectId`](crate::id::ObjectId).

use bson::{Bson, Document as BsonDocument};

use crate::{
    cast::IdCaster,
    error::{CastError, DocumentStoreError},
    id::PRIMARY_KEY,
};

/// Sort direction for query results.
#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The field path to sort by.
    pub field: String,
    pub direction: SortDirection,
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// String or array contains value.
    Contains,
    /// String or array does not contain value.
    NotContains,
    StartsWith,
    EndsWith,
    /// Field matches any of the values.
    AnyOf,
    /// Field matches none of the values.
    NoneOf,
}

/// A filter expression for querying documents.
///
/// Expressions combine with `And`, `Or` and `Not` into arbitrary predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// All must match.
    And(Vec<Expr>),
    /// Any must match.
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field path to compare.
        field: String,
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// An existing AND absorbs the new term instead of nesting.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// An existing OR absorbs the new term instead of nesting.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// A structured query: optional filter plus limit, offset and sort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Filter expression; `None` matches every document.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Number of documents to skip.
    pub offset: Option<usize>,
    pub sort: Option<Sort>,
}

impl Query {
    /// Creates a query that matches every document.
    pub fn new() -> Self {
        Query::default()
    }

    /// Alias of [`Query::new`] that reads better at call sites.
    pub fn all() -> Self {
        Query::new()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Returns a copy of this query limited to one document.
    pub fn first(mut self) -> Self {
        self.limit = Some(1);
        self
    }

    /// Converts every term on `paths` into native identifiers.
    ///
    /// # Errors
    ///
    /// Returns the [`CastError`] of the first value that is not a valid identifier.
    pub fn cast(self, paths: &[&str]) -> Result<Query, CastError> {
        let filter = match &self.filter {
            Some(expr) => Some(IdCaster::new(paths).cast(expr)?),
            None => None,
        };

        Ok(Query { filter, ..self })
    }

    /// Casts the primary-key terms only.
    pub fn cast_primary_key(self) -> Result<Query, CastError> {
        self.cast(&[PRIMARY_KEY])
    }
}

impl From<Expr> for Query {
    fn from(expr: Expr) -> Self {
        Query { filter: Some(expr), ..Query::default() }
    }
}

impl From<BsonDocument> for Query {
    fn from(document: BsonDocument) -> Self {
        Query { filter: Filter::matching(document), ..Query::default() }
    }
}

impl From<Option<Expr>> for Query {
    fn from(filter: Option<Expr>) -> Self {
        Query { filter, ..Query::default() }
    }
}

/// Helper struct for constructing filter expressions.
///
/// Field names accept `Into<String>` and values `Into<Bson>`.
pub struct Filter;

impl Filter {
    /// Matches documents whose primary key equals `value`.
    ///
    /// `value` may be an identifier, its hex string or its raw bytes.
    pub fn id(value: impl Into<Bson>) -> Expr {
        Filter::eq(PRIMARY_KEY, value)
    }

    /// Turns a document of `field: value` pairs into an AND of equality terms.
    ///
    /// Returns `None` for an empty document, which matches everything.
    pub fn matching(document: BsonDocument) -> Option<Expr> {
        let mut terms = document
            .into_iter()
            .map(|(field, value)| Filter::eq(field, value))
            .collect::<Vec<_>>();

        match terms.len() {
            0 => None,
            1 => terms.pop(),
            _ => Some(Expr::And(terms)),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::StartsWith, value.into())
    }

    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, value.into())
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NotContains, value.into())
    }

    /// Matches documents where the field is present.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Matches documents where the field is absent.
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    pub fn any_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, value.into())
    }

    pub fn none_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, value.into())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks a filter expression tree. Backends implement this to evaluate or translate filters.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;
    use crate::id::ObjectId;

    #[test]
    fn empty_document_matches_everything() {
        let query: Query = doc! {}.into();

        assert!(query.filter.is_none());
    }

    #[test]
    fn single_term_document_is_a_plain_equality() {
        let query: Query = doc! { "firstname": "Ada" }.into();

        assert_eq!(query.filter, Some(Filter::eq("firstname", "Ada")));
    }

    #[test]
    fn multi_term_document_is_a_conjunction() {
        let query: Query = doc! { "firstname": "Ada", "lastname": "Lovelace" }.into();

        assert_eq!(
            query.filter,
            Some(Filter::and([Filter::eq("firstname", "Ada"), Filter::eq("lastname", "Lovelace")]))
        );
    }

    #[test]
    fn and_absorbs_into_existing_conjunction() {
        let expr = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));

        let Expr::And(terms) = expr else { panic!("expected and") };
        assert_eq!(terms.len(), 3);
    }

    #[test]
    fn cast_keeps_limit_offset_and_sort() {
        let id = ObjectId::new();
        let query = Query::builder()
            .filter(Filter::id(id.to_hex()))
            .limit(5)
            .offset(2)
            .sort("lastname", SortDirection::Desc)
            .build()
            .cast_primary_key()
            .unwrap();

        assert_eq!(query.filter, Some(Filter::id(id)));
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, Some(2));
        assert_eq!(query.sort.map(|s| s.direction), Some(SortDirection::Desc));
    }

    #[test]
    fn cast_fails_on_malformed_primary_key() {
        let err = Query::from(doc! { "_id": "badObjectId" })
            .cast_primary_key()
            .unwrap_err();

        assert_eq!(err.value, "badObjectId");
        assert_eq!(err.path, "_id");
    }

    #[test]
    fn first_limits_to_one() {
        assert_eq!(Query::all().first().limit, Some(1));
    }
}
