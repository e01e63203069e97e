// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use kube::core::ErrorResponse;
use thiserror::Error;

/// APIError is the error taxonomy that reconcile_core reasons about.
///
/// Only ObjectNotFound, ObjectAlreadyExists and Conflict drive decisions in the
/// reconciler; every other variant is reported as a retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum APIError {
    #[error("NotFound")]
    ObjectNotFound,
    #[error("AlreadyExists")]
    ObjectAlreadyExists,
    #[error("Conflict")]
    Conflict,
    #[error("BadRequest")]
    BadRequest,
    #[error("Invalid")]
    Invalid,
    #[error("Forbidden")]
    Forbidden,
    #[error("InternalError")]
    InternalError,
    #[error("Timeout")]
    Timeout,
    #[error("ServerTimeout")]
    ServerTimeout,
    #[error("Other")]
    Other,
}

impl APIError {
    pub fn is_object_not_found(&self) -> bool {
        matches!(self, APIError::ObjectNotFound)
    }

    pub fn is_object_already_exists(&self) -> bool {
        matches!(self, APIError::ObjectAlreadyExists)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, APIError::Conflict)
    }

    pub fn from_reason(reason: &str) -> APIError {
        match reason {
            "NotFound" => APIError::ObjectNotFound,
            "AlreadyExists" => APIError::ObjectAlreadyExists,
            "Conflict" => APIError::Conflict,
            "BadRequest" => APIError::BadRequest,
            "Invalid" => APIError::Invalid,
            "Forbidden" => APIError::Forbidden,
            "InternalError" => APIError::InternalError,
            "Timeout" => APIError::Timeout,
            "ServerTimeout" => APIError::ServerTimeout,
            _ => APIError::Other,
        }
    }
}

// Transport, serialization and auth failures never reach the API server's
// status reasons, so they all collapse into Other.
impl From<&kube::Error> for APIError {
    fn from(error: &kube::Error) -> APIError {
        match error {
            kube::Error::Api(ErrorResponse { reason, .. }) => APIError::from_reason(reason),
            _ => APIError::Other,
        }
    }
}

/// ParseDynamicObjectError is returned when a DynamicObject cannot be turned
/// back into the typed object the caller expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDynamicObjectError {
    #[error("expected kind {expected}, found {found}")]
    KindMismatch { expected: String, found: String },
    #[error("object carries no type information")]
    MissingTypeMeta,
    #[error("failed to unmarshal object: {0}")]
    UnmarshalError(String),
    #[error("failed to marshal object: {0}")]
    MarshalError(String),
}
