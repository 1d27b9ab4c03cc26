use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::domain::Claim;
use super::engine::{AuditEngine, AuditError};
use super::store::{ReferenceStore, StoreError};

/// Router builder exposing the audit endpoint over HTTP.
pub fn audit_router<S>(engine: Arc<AuditEngine<S>>) -> Router
where
    S: ReferenceStore + 'static,
{
    Router::new()
        .route("/api/v1/audits", post(audit_handler::<S>))
        .with_state(engine)
}

pub(crate) async fn audit_handler<S>(
    State(engine): State<Arc<AuditEngine<S>>>,
    axum::Json(claim): axum::Json<Claim>,
) -> Response
where
    S: ReferenceStore + 'static,
{
    match engine.audit(&claim) {
        Ok(verdict) => (StatusCode::OK, axum::Json(verdict)).into_response(),
        Err(error) => {
            let status = match &error {
                AuditError::TableNotFound { .. } => StatusCode::NOT_FOUND,
                AuditError::MissingInput { .. } => StatusCode::BAD_REQUEST,
                AuditError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
                AuditError::PositionNotFound { .. } | AuditError::QuantityOutOfRange { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            };
            let payload = json!({ "error": error.to_string() });
            (status, axum::Json(payload)).into_response()
        }
    }
}
