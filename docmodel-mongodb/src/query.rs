//! Query translation from the docmodel AST to MongoDB query syntax.
//!
//! String operators are case-sensitive and their operands are matched literally, which
//! keeps results identical to the in-memory backend.

use bson::{Bson, Document, doc};

use docmodel_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, Query, QueryVisitor, SortDirection},
};


/// Translates docmodel query expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` becomes the match-all filter `{}`.
    pub(crate) fn filter(query: &Query) -> DocumentStoreResult<Document> {
        match &query.filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    /// Translates the sort specification, if any.
    pub(crate) fn sort(query: &Query) -> Option<Document> {
        query.sort.as_ref().map(|sort| doc! {
            sort.field.clone(): match sort.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            }
        })
    }
}

/// Escapes regular expression metacharacters so `text` matches literally.
fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

fn as_list(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        single => Bson::Array(vec![single.clone()]),
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! { "$expr": false });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": escape_regex(s) },
                    Bson::Array(arr) => doc! { "$all": arr },
                    other => doc! { "$eq": other },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": { "$regex": escape_regex(s) } },
                    Bson::Array(arr) => doc! { "$not": { "$all": arr } },
                    other => doc! { "$ne": other },
                },
                FieldOp::StartsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("^{}", escape_regex(s)) },
                    _ => return Err(DocumentStoreError::InvalidDocument("StartsWith operator requires a string value".to_string())),
                },
                FieldOp::EndsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("{}$", escape_regex(s)) },
                    _ => return Err(DocumentStoreError::InvalidDocument("EndsWith operator requires a string value".to_string())),
                },
                FieldOp::AnyOf => doc! { "$in": as_list(value) },
                FieldOp::NoneOf => doc! { "$nin": as_list(value) },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use docmodel_core::{id::ObjectId, query::Filter};

    use super::*;

    fn translate(expr: Expr) -> Document {
        MongoQueryTranslator.visit_expr(&expr).unwrap()
    }

    #[test]
    fn missing_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::filter(&Query::all()).unwrap(), doc! {});
    }

    #[test]
    fn identifiers_and_nested_paths_pass_through() {
        let id = ObjectId::new();

        assert_eq!(translate(Filter::id(id)), doc! { "_id": { "$eq": id } });
        assert_eq!(translate(Filter::eq("address.city", "London")), doc! { "address.city": { "$eq": "London" } });
    }

    #[test]
    fn negation_uses_nor() {
        assert_eq!(
            translate(Filter::eq("a", 1).not()),
            doc! { "$nor": [{ "a": { "$eq": 1 } }] }
        );
    }

    #[test]
    fn string_operators_match_literally() {
        assert_eq!(translate(Filter::starts_with("name", "a.b")), doc! { "name": { "$regex": "^a\\.b" } });
        assert_eq!(translate(Filter::contains("name", "(x)")), doc! { "name": { "$regex": "\\(x\\)" } });
        assert!(MongoQueryTranslator.visit_expr(&Filter::ends_with("age", 3)).is_err());
    }

    #[test]
    fn set_membership_accepts_scalars() {
        assert_eq!(translate(Filter::any_of("tag", "x")), doc! { "tag": { "$in": ["x"] } });
        assert_eq!(translate(Filter::none_of("tag", vec!["x", "y"])), doc! { "tag": { "$nin": ["x", "y"] } });
    }

    #[test]
    fn empty_combinators_are_valid_queries() {
        assert_eq!(translate(Expr::And(vec![])), doc! {});
        assert_eq!(translate(Expr::Or(vec![])), doc! { "$expr": false });
    }

    #[test]
    fn sort_direction_maps_to_sign() {
        let query = Query::builder().sort("age", SortDirection::Desc).build();

        assert_eq!(MongoQueryTranslator::sort(&query), Some(doc! { "age": -1 }));
    }
}
