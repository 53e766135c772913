//! Conversion of loosely typed filter input into identifiers.
//!
//! Filters arrive with primary-key values in whatever form the caller had at hand: an
//! [`ObjectId`], its hex string or its 12 raw bytes. Before a query leaves the client,
//! [`IdCaster`] rewrites every term on an identifier path into a native identifier, and a
//! value that cannot be converted turns into a [`CastError`] instead of a query that
//! silently matches nothing.

use bson::{Bson, spec::BinarySubtype};

use crate::{
    error::CastError,
    id::ObjectId,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Converts a single BSON value into an identifier.
///
/// Accepted inputs are native ObjectIds, 24-character hex strings and generic binaries
/// of exactly 12 bytes.
///
/// # Errors
///
/// Returns a [`CastError`] carrying `path` for any other input.
pub fn cast_object_id(value: &Bson, path: &str) -> Result<ObjectId, CastError> {
    match value {
        Bson::ObjectId(oid) => Ok(ObjectId::from(*oid)),
        Bson::String(text) => ObjectId::parse(text, path),
        Bson::Binary(binary) if binary.subtype == BinarySubtype::Generic => {
            <[u8; 12]>::try_from(binary.bytes.as_slice())
                .map(ObjectId::from_bytes)
                .map_err(|_| CastError::object_id(render_value(value), path))
        }
        other => Err(CastError::object_id(render_value(other), path)),
    }
}

/// Renders a value the way it is reported in a cast error.
fn render_value(value: &Bson) -> String {
    match value {
        Bson::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Rewrites filter expressions so that identifier paths hold native identifiers.
pub struct IdCaster<'a> {
    paths: &'a [&'a str],
}

impl<'a> IdCaster<'a> {
    /// Creates a caster for the given identifier paths.
    pub fn new(paths: &'a [&'a str]) -> Self {
        Self { paths }
    }

    /// Casts every identifier term of `expr`.
    pub fn cast(&mut self, expr: &Expr) -> Result<Expr, CastError> {
        self.visit_expr(expr)
    }

    fn is_id_path(&self, field: &str) -> bool {
        self.paths.contains(&field)
    }

    fn cast_value(&self, field: &str, op: &FieldOp, value: &Bson) -> Result<Bson, CastError> {
        match (op, value) {
            (FieldOp::AnyOf | FieldOp::NoneOf, Bson::Array(values)) => Ok(Bson::Array(
                values
                    .iter()
                    .map(|v| cast_object_id(v, field).map(Bson::from))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            // pattern operators compare text, not identifiers
            (FieldOp::Contains | FieldOp::NotContains | FieldOp::StartsWith | FieldOp::EndsWith, _) => {
                Ok(value.clone())
            }
            _ => cast_object_id(value, field).map(Bson::from),
        }
    }
}

impl QueryVisitor for IdCaster<'_> {
    type Output = Expr;
    type Error = CastError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(Expr::And(
            exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        ))
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(Expr::Or(
            exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        ))
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(self.visit_expr(expr)?.not())
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(Expr::Exists(field.to_string(), should_exist))
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let value = if self.is_id_path(field) {
            self.cast_value(field, op, value)?
        } else {
            value.clone()
        };

        Ok(Expr::field(field.to_string(), op.clone(), value))
    }
}

#[cfg(test)]
mod tests {
    use bson::Binary;

    use super::*;
    use crate::{id::PRIMARY_KEY, query::Filter};

    #[test]
    fn casts_hex_strings() {
        let id = ObjectId::new();

        assert_eq!(cast_object_id(&Bson::String(id.to_hex()), "_id").unwrap(), id);
    }

    #[test]
    fn casts_native_ids() {
        let id = ObjectId::new();

        assert_eq!(cast_object_id(&Bson::from(id), "_id").unwrap(), id);
    }

    #[test]
    fn casts_twelve_raw_bytes() {
        let id = ObjectId::new();
        let raw = Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes: id.bytes().to_vec() });

        assert_eq!(cast_object_id(&raw, "_id").unwrap(), id);
    }

    #[test]
    fn rejects_wrong_sized_binaries() {
        let raw = Bson::Binary(Binary { subtype: BinarySubtype::Generic, bytes: vec![1, 2, 3] });

        assert!(cast_object_id(&raw, "_id").is_err());
    }

    #[test]
    fn rejects_other_types_with_rendered_value() {
        let err = cast_object_id(&Bson::Int32(42), "owner").unwrap_err();

        assert_eq!(err.value, "42");
        assert_eq!(err.path, "owner");
    }

    #[test]
    fn caster_rewrites_nested_id_terms() {
        let id = ObjectId::new();
        let expr = Filter::and([
            Filter::eq("name", "Alice"),
            Filter::or([Filter::eq(PRIMARY_KEY, id.to_hex()), Filter::any_of(PRIMARY_KEY, vec![id.to_hex()])]),
        ]);

        let cast = IdCaster::new(&[PRIMARY_KEY]).cast(&expr).unwrap();

        let Expr::And(terms) = cast else { panic!("expected and") };
        let Expr::Field { value, .. } = &terms[0] else { panic!("expected field") };
        assert_eq!(value, &Bson::String("Alice".into()));

        let Expr::Or(alternatives) = &terms[1] else { panic!("expected or") };
        let Expr::Field { value, .. } = &alternatives[0] else { panic!("expected field") };
        assert_eq!(value, &Bson::from(id));
        let Expr::Field { value, .. } = &alternatives[1] else { panic!("expected field") };
        assert_eq!(value, &Bson::Array(vec![Bson::from(id)]));
    }

    #[test]
    fn caster_reports_first_bad_value() {
        let expr = Filter::eq(PRIMARY_KEY, "badObjectId");

        let err = IdCaster::new(&[PRIMARY_KEY]).cast(&expr).unwrap_err();

        assert_eq!(err.to_string(), "Cast to ObjectId failed for value \"badObjectId\" at path \"_id\"");
    }

    #[test]
    fn caster_leaves_other_paths_alone() {
        let expr = Filter::eq("nickname", "badObjectId");

        assert!(IdCaster::new(&[PRIMARY_KEY]).cast(&expr).is_ok());
    }
}
