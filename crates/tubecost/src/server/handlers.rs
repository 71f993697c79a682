//! Request handlers and response bodies.

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{error::ApiError, AppState};
use crate::config::Backend;
use crate::record::{CalculatedRecord, CalculationPreview, ProductionInputs, ProductionRecord};

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
}

/// Body of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    /// Always `true`.
    pub success: bool,
}

/// Body of a successful create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedResponse {
    /// Always `true`.
    pub success: bool,
    /// Identifier assigned by the store.
    pub id: i64,
    /// The record as calculated and stored.
    #[serde(flatten)]
    pub record: CalculatedRecord,
}

/// Body of a successful update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedResponse {
    /// Always `true`.
    pub success: bool,
    /// The record as recalculated and stored.
    #[serde(flatten)]
    pub record: CalculatedRecord,
}

/// Body of the health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Storage engine in use.
    pub backend: Backend,
}

type ApiResult<T> = Result<T, ApiError>;

fn record_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn record_inputs(body: Result<Json<ProductionInputs>, JsonRejection>) -> ApiResult<ProductionInputs> {
    body.map(|Json(inputs)| inputs)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        backend: state.ledger.store().backend(),
    })
}

/// `GET /records`
pub async fn list_records(State(state): State<AppState>) -> ApiResult<Json<Vec<ProductionRecord>>> {
    Ok(Json(state.ledger.list().await?))
}

/// `GET /records/{id}`
pub async fn get_record(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ProductionRecord>> {
    let id = record_id(path)?;
    state
        .ledger
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))
}

/// `POST /records`
pub async fn create_record(
    State(state): State<AppState>,
    body: Result<Json<ProductionInputs>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let inputs = record_inputs(body)?;
    let (id, record) = state.ledger.create(&inputs).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: true,
            id,
            record,
        }),
    ))
}

/// `PUT /records/{id}`
pub async fn update_record(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ProductionInputs>, JsonRejection>,
) -> ApiResult<Json<UpdatedResponse>> {
    let id = record_id(path)?;
    let inputs = record_inputs(body)?;
    let record = state.ledger.update(id, &inputs).await?;
    Ok(Json(UpdatedResponse {
        success: true,
        record,
    }))
}

/// `DELETE /records/{id}`
pub async fn delete_record(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let id = record_id(path)?;
    state.ledger.delete(id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// `POST /calculate`
pub async fn calculate(
    State(state): State<AppState>,
    body: Result<Json<ProductionInputs>, JsonRejection>,
) -> ApiResult<Json<CalculationPreview>> {
    let inputs = record_inputs(body)?;
    Ok(Json(state.ledger.preview(&inputs).into()))
}

/// Fallback for unsupported methods on the record routes.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
