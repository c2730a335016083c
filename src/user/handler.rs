//! HTTP handlers for `/api/v1/users`.
//!
//! Binding failures answer `400 {"message":"bad request"}` without reaching
//! the use case. Use case errors are reported to the request's exception
//! scope and rendered at their mapped status.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::{AppError, User, UserUseCase};
use crate::observability::ExceptionScope;

pub const BAD_REQUEST_MESSAGE: &str = "bad request";

/// Handler state: the use case behind the user routes.
#[derive(Clone)]
pub struct UserHandler {
    use_case: Arc<dyn UserUseCase>,
}

impl UserHandler {
    pub fn new(use_case: Arc<dyn UserUseCase>) -> Self {
        Self { use_case }
    }
}

fn bind_failure(rejection: impl std::fmt::Display) -> Response {
    tracing::debug!(rejection = %rejection, "Request binding failed");
    AppError::bad_request(BAD_REQUEST_MESSAGE).into_response()
}

fn failure(scope: &ExceptionScope, err: AppError) -> Response {
    scope.report(&err);
    err.into_response()
}

/// `POST /api/v1/users`
pub async fn create_user(
    State(handler): State<UserHandler>,
    scope: ExceptionScope,
    payload: Result<Json<User>, JsonRejection>,
) -> Response {
    let Json(user) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bind_failure(rejection),
    };

    match handler.use_case.create_user(user).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => failure(&scope, err),
    }
}

/// `GET /api/v1/users/{id}`
pub async fn get_user_by_id(
    State(handler): State<UserHandler>,
    scope: ExceptionScope,
    id: Result<Path<u64>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return bind_failure(rejection),
    };

    match handler.use_case.get_user_by_id(id).await {
        Ok(user) => (StatusCode::OK, Json(user)).into_response(),
        Err(err) => failure(&scope, err),
    }
}

/// `PUT /api/v1/users`
pub async fn update_user(
    State(handler): State<UserHandler>,
    scope: ExceptionScope,
    payload: Result<Json<User>, JsonRejection>,
) -> Response {
    let Json(user) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bind_failure(rejection),
    };

    match handler.use_case.update_user(user).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(err) => failure(&scope, err),
    }
}

/// `DELETE /api/v1/users/{id}`
pub async fn delete_user_by_id(
    State(handler): State<UserHandler>,
    scope: ExceptionScope,
    id: Result<Path<u64>, PathRejection>,
) -> Response {
    let Path(id) = match id {
        Ok(id) => id,
        Err(rejection) => return bind_failure(rejection),
    };

    match handler.use_case.delete_user_by_id(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => failure(&scope, err),
    }
}
