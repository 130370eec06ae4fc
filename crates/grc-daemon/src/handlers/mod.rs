//! HTTP handlers

mod agenda;
mod health;
mod risks;
mod treatments;
mod workshops;

pub use agenda::*;
pub use health::*;
pub use risks::*;
pub use treatments::*;
pub use workshops::*;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query},
    http::request::Parts,
    Json,
};
use grc_agenda::AgendaError;
use grc_register::validation::apply_patch;
use grc_register::{AgendaTopic, FieldError};
use grc_store::{Mutation, StoreResult};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, ApiResult};

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

pub(crate) fn ok<T>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: None,
        data,
    })
}

pub(crate) fn ok_with<T>(message: impl Into<String>, data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: Some(message.into()),
        data,
    })
}

/// Unwrap a JSON body, turning extractor rejections into `{success:false}`
/// responses.
pub(crate) fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    let Json(body) = payload?;
    Ok(body)
}

/// `Path` extractor whose rejection uses the error envelope.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// `Query` extractor whose rejection uses the error envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

pub(crate) fn object_mut(doc: &mut Value) -> ApiResult<&mut Map<String, Value>> {
    doc.as_object_mut()
        .ok_or_else(|| vec![FieldError::new("body", "must be a JSON object")].into())
}

/// True if `key` is absent or null.
pub(crate) fn is_unset(obj: &Map<String, Value>, key: &str) -> bool {
    matches!(obj.get(key), None | Some(Value::Null))
}

/// Lists owned by a dedicated endpoint may not be seeded on create.
pub(crate) fn reject_managed_lists(
    obj: &Map<String, Value>,
    keys: &[&str],
    endpoint: &str,
) -> ApiResult<()> {
    let errors: Vec<FieldError> = keys
        .iter()
        .filter(|k| {
            obj.get(**k)
                .and_then(Value::as_array)
                .is_some_and(|items| !items.is_empty())
        })
        .map(|k| FieldError::new(*k, format!("is managed through {}", endpoint)))
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.into())
    }
}

pub(crate) fn parse_topic(raw: &str) -> ApiResult<AgendaTopic> {
    raw.parse::<AgendaTopic>()
        .map_err(|e| ApiError::from(AgendaError::from(e)))
}

/// Patch a stored document inside one store mutation.
///
/// The stored record is serialized, `patch` is merged in (keys in
/// `immutable` may not change), and the result goes back through
/// `validate`. `Ok(None)` means the document does not exist.
pub(crate) fn patch_document<T: Serialize>(
    modify: impl FnOnce(Mutation<'_, T>) -> StoreResult<Option<T>>,
    patch: &Value,
    immutable: &[&str],
    validate: fn(&Value) -> Result<T, Vec<FieldError>>,
    touch: fn(&mut T),
) -> ApiResult<Option<T>> {
    let mut rejected = Vec::new();
    let written = modify(&mut |stored: &mut T| {
        let mut base = match serde_json::to_value(&*stored) {
            Ok(v) => v,
            Err(e) => {
                rejected = vec![FieldError::new("document", e.to_string())];
                return false;
            }
        };
        let errors = apply_patch(&mut base, patch, immutable);
        if !errors.is_empty() {
            rejected = errors;
            return false;
        }
        match validate(&base) {
            Ok(mut next) => {
                touch(&mut next);
                *stored = next;
                true
            }
            Err(errors) => {
                rejected = errors;
                false
            }
        }
    })?;
    if !rejected.is_empty() {
        return Err(rejected.into());
    }
    Ok(written)
}
