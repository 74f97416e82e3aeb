//! Entity repositories.
//!
//! Each collection is stored under one key of the shared namespace as a JSON
//! array of rows. Rows are kept as raw JSON so a single malformed row never
//! hides the rest of the collection, and so patches merge field-by-field
//! instead of replacing whole entities.

pub mod notifications;
pub mod profiles;
pub mod ratings;
pub mod reports;
pub mod requests;
pub mod videos;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::core::{generate_id, AppError, IdStrategy};
use crate::store::Store;

pub trait Entity: Serialize + DeserializeOwned + Send + 'static {
    /// Key of the collection inside the namespace.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn assign_id(&mut self, id: String);

    fn id_prefix(&self) -> &'static str;
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn decode_row<T: Entity>(row: &Value) -> Option<T> {
    match serde_json::from_value(row.clone()) {
        Ok(entity) => Some(entity),
        Err(e) => {
            tracing::warn!(
                collection = T::COLLECTION,
                id = row_id(row).unwrap_or("<none>"),
                error = %e,
                "skipping malformed row"
            );
            None
        }
    }
}

/// Shallow merge of `patch` into `row`. `id` is never overwritten.
fn merge_patch(row: &mut Value, patch: Value) -> Result<(), AppError> {
    let Value::Object(fields) = patch else {
        return Err(AppError::validation_error("A patch must be a JSON object"));
    };
    let Value::Object(target) = row else {
        return Err(AppError::validation_error("Stored row is not an object"));
    };
    for (key, value) in fields {
        if key == "id" {
            continue;
        }
        target.insert(key, value);
    }
    Ok(())
}

fn unique_id(rows: &[Value], prefix: &str, strategy: IdStrategy, now: DateTime<Utc>) -> String {
    loop {
        let id = generate_id(prefix, strategy, now);
        if !rows.iter().any(|row| row_id(row) == Some(id.as_str())) {
            return id;
        }
    }
}

pub async fn list<T: Entity>(store: &Store) -> Result<Vec<T>, AppError> {
    let rows: Vec<Value> = store.get(T::COLLECTION, Vec::new()).await?;
    Ok(rows.iter().filter_map(decode_row::<T>).collect())
}

pub async fn list_where<T, P>(store: &Store, predicate: P) -> Result<Vec<T>, AppError>
where
    T: Entity,
    P: Fn(&T) -> bool,
{
    Ok(list::<T>(store)
        .await?
        .into_iter()
        .filter(|entity| predicate(entity))
        .collect())
}

pub async fn find_by_id<T: Entity>(store: &Store, id: &str) -> Result<Option<T>, AppError> {
    let rows: Vec<Value> = store.get(T::COLLECTION, Vec::new()).await?;
    Ok(rows
        .iter()
        .find(|row| row_id(row) == Some(id))
        .and_then(decode_row::<T>))
}

/// Insert `entity`, generating an id when it has none. An explicit id that
/// is already taken is rejected.
pub async fn insert<T: Entity>(
    store: &Store,
    mut entity: T,
    strategy: IdStrategy,
    now: DateTime<Utc>,
) -> Result<T, AppError> {
    store
        .update(T::COLLECTION, Vec::<Value>::new(), move |rows| {
            if entity.id().is_empty() {
                let id = unique_id(rows, entity.id_prefix(), strategy, now);
                entity.assign_id(id);
            } else if rows.iter().any(|row| row_id(row) == Some(entity.id())) {
                return Err(AppError::validation_error(format!(
                    "{} already exists in {}",
                    entity.id(),
                    T::COLLECTION
                )));
            }
            rows.push(serde_json::to_value(&entity)?);
            Ok(entity)
        })
        .await
}

/// Like [`insert`], then drop the oldest rows so at most `keep` remain.
/// The new row itself is always kept.
pub async fn insert_bounded<T: Entity>(
    store: &Store,
    mut entity: T,
    strategy: IdStrategy,
    now: DateTime<Utc>,
    keep: Option<usize>,
) -> Result<T, AppError> {
    store
        .update(T::COLLECTION, Vec::<Value>::new(), move |rows| {
            if entity.id().is_empty() {
                let id = unique_id(rows, entity.id_prefix(), strategy, now);
                entity.assign_id(id);
            }
            rows.push(serde_json::to_value(&entity)?);
            if let Some(keep) = keep {
                let excess = rows.len().saturating_sub(keep.max(1));
                rows.drain(..excess);
            }
            Ok(entity)
        })
        .await
}

/// Rows of `T`'s collection inside a loaded snapshot. The key is taken
/// out; put the rows back with [`put_rows`].
fn take_rows<T: Entity>(snapshot: &mut Map<String, Value>) -> Vec<Value> {
    match snapshot.remove(T::COLLECTION) {
        Some(Value::Array(rows)) => rows,
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            tracing::warn!(collection = T::COLLECTION, "collection is not an array, using empty");
            Vec::new()
        }
    }
}

fn put_rows<T: Entity>(snapshot: &mut Map<String, Value>, rows: Vec<Value>) {
    snapshot.insert(T::COLLECTION.to_string(), Value::Array(rows));
}

fn patch_row<T, P, F>(rows: &mut [Value], id: &str, make_patch: F) -> Result<T, AppError>
where
    T: Entity,
    P: Serialize,
    F: FnOnce(&T) -> Result<P, AppError>,
{
    let (index, current) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row_id(row) == Some(id))
        .and_then(|(index, row)| decode_row::<T>(row).map(|entity| (index, entity)))
        .ok_or_else(|| AppError::not_found(format!("{} {} not found", T::COLLECTION, id)))?;

    let patch = serde_json::to_value(make_patch(&current)?)?;
    let mut merged = rows[index].clone();
    merge_patch(&mut merged, patch)?;
    let updated: T = serde_json::from_value(merged.clone()).map_err(|e| {
        AppError::validation_error(format!("Patch produces an invalid entity: {}", e))
    })?;

    rows[index] = merged;
    Ok(updated)
}

/// Compute a patch from the current entity and merge it, atomically with
/// respect to other writers in this process. Nothing is written when
/// `make_patch` fails.
pub async fn patch_with<T, P, F>(store: &Store, id: &str, make_patch: F) -> Result<T, AppError>
where
    T: Entity,
    P: Serialize,
    F: FnOnce(&T) -> Result<P, AppError>,
{
    store
        .update(T::COLLECTION, Vec::<Value>::new(), |rows| {
            patch_row(rows, id, make_patch)
        })
        .await
}

/// Shallow-merge `patch` into the entity with `id`.
pub async fn update<T, P>(store: &Store, id: &str, patch: &P) -> Result<T, AppError>
where
    T: Entity,
    P: Serialize,
{
    patch_with(store, id, |_: &T| Ok(patch)).await
}

/// Apply `make_patch` to every entity it returns a patch for. Returns the
/// number of entities changed.
pub async fn update_where<T, P, F>(store: &Store, make_patch: F) -> Result<usize, AppError>
where
    T: Entity,
    P: Serialize,
    F: Fn(&T) -> Option<P>,
{
    store
        .update(T::COLLECTION, Vec::<Value>::new(), |rows| {
            let mut changed = 0;
            for row in rows.iter_mut() {
                let Some(patch) = decode_row::<T>(row).as_ref().and_then(&make_patch) else {
                    continue;
                };
                merge_patch(row, serde_json::to_value(patch)?)?;
                changed += 1;
            }
            Ok(changed)
        })
        .await
}

fn remove_row<T: Entity>(rows: &mut Vec<Value>, id: &str) -> Result<T, AppError> {
    let index = rows
        .iter()
        .position(|row| row_id(row) == Some(id))
        .ok_or_else(|| AppError::not_found(format!("{} {} not found", T::COLLECTION, id)))?;
    let row = rows.remove(index);
    Ok(serde_json::from_value(row)?)
}

pub async fn remove<T: Entity>(store: &Store, id: &str) -> Result<T, AppError> {
    store
        .update(T::COLLECTION, Vec::<Value>::new(), |rows| remove_row(rows, id))
        .await
}
