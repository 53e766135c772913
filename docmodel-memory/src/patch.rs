//! `$set`-style partial updates.

use bson::{Bson, Document as BsonDocument};

use docmodel_core::error::{DocumentStoreResult, StoreError};

/// Sets every `path: value` pair of `patch` on `document`.
///
/// Missing intermediate documents of a dotted path are created. Returns whether anything
/// changed.
///
/// # Errors
///
/// Fails with [`StoreError::Backend`] if a path runs through a value that is not a
/// document. `document` is left untouched in that case.
pub(crate) fn apply(document: &mut BsonDocument, patch: &BsonDocument) -> DocumentStoreResult<bool> {
    let mut updated = document.clone();
    let mut modified = false;

    for (path, value) in patch {
        modified |= set_path(&mut updated, path, path, value)?;
    }

    if modified {
        *document = updated;
    }

    Ok(modified)
}

fn set_path(document: &mut BsonDocument, full_path: &str, path: &str, value: &Bson) -> DocumentStoreResult<bool> {
    match path.split_once('.') {
        None => {
            let changed = document.get(path) != Some(value);
            if changed {
                document.insert(path, value.clone());
            }
            Ok(changed)
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, BsonDocument::new());
            }

            match document.get_mut(head) {
                Some(Bson::Document(nested)) => set_path(nested, full_path, rest, value),
                Some(other) => Err(StoreError::Backend(format!(
                    "Cannot create field '{rest}' in element {{{head}: {other}}} while setting '{full_path}'"
                ))
                .into()),
                None => Ok(false),
            }
        }
    }
}
