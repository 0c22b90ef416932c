//! Custom error types for the feedback service

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::error;

use crate::{
    credentials::CredentialError,
    repositories::{StoreError, UniqueField},
    validation::FieldErrors,
};

/// Custom error type for the feedback service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Form input failed validation
    #[error("Invalid input")]
    Validation(FieldErrors),

    /// Unique columns already taken
    #[error("Duplicate value")]
    Duplicate(Vec<UniqueField>),

    /// Missing user or feedback
    #[error("Not found")]
    NotFound,

    /// No session where one is required; carries the message shown to the user
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// Session present but the resource belongs to someone else
    #[error("You are not authorized to do that")]
    Forbidden,

    /// Unknown username or wrong password, deliberately not told apart
    #[error("Invalid username/password.")]
    InvalidCredentials,

    /// Register/login attempted while already logged in
    #[error("Already logged in")]
    AlreadyAuthenticated,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl ApiError {
    /// Machine-readable kind, stable across message changes
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Duplicate(_) => "duplicate",
            ApiError::NotFound => "not_found",
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::Forbidden => "forbidden",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::AlreadyAuthenticated => "already_authenticated",
            ApiError::InternalServerError => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated(_) | ApiError::AlreadyAuthenticated => StatusCode::SEE_OTHER,
            ApiError::Forbidden => StatusCode::UNAUTHORIZED,
            ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn duplicate_message(field: UniqueField) -> &'static str {
    match field {
        UniqueField::Username => "Username taken. Please pick another",
        UniqueField::Email => "Email used by another account. Please use a different one.",
        UniqueField::Title => "A feedback with this title already exists.",
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(fields) => ApiError::Duplicate(fields),
            StoreError::NotFound => ApiError::NotFound,
            other => {
                error!("Storage failure: {}", other);
                ApiError::InternalServerError
            }
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Store(store) => store.into(),
            other => {
                error!("Credential failure: {}", other);
                ApiError::InternalServerError
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        let fields: Option<Map<String, Value>> = match &self {
            ApiError::Validation(errors) => Some(
                errors
                    .iter()
                    .map(|(field, message)| (field.to_string(), Value::from(message.as_str())))
                    .collect(),
            ),
            ApiError::Duplicate(dups) => Some(
                dups.iter()
                    .map(|field| {
                        (
                            field.as_str().to_string(),
                            Value::from(duplicate_message(*field)),
                        )
                    })
                    .collect(),
            ),
            _ => None,
        };
        if let Some(fields) = fields {
            body["fields"] = Value::Object(fields);
        }

        if status == StatusCode::SEE_OTHER {
            return (status, [(header::LOCATION, "/")], Json(body)).into_response();
        }
        (status, Json(body)).into_response()
    }
}

/// Type alias for handler results
pub type ApiResult<T> = Result<T, ApiError>;
