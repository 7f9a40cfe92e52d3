use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use clinic_core::{Visit, VisitInput};
use serde::Serialize;

use super::MessageResponse;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct VisitCreated {
    pub message: &'static str,
    pub visit_id: i64,
}

pub async fn add_visit(
    State(state): State<AppState>,
    Path(patient_id): Path<i64>,
    payload: Result<Json<VisitInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<VisitCreated>)> {
    let Json(input) = payload?;
    let visit = state.clinic.add_visit(patient_id, input)?;

    Ok((
        StatusCode::CREATED,
        Json(VisitCreated {
            message: "Visit added",
            visit_id: visit.id,
        }),
    ))
}

pub async fn list_visits(
    State(state): State<AppState>,
    Path(patient_id): Path<i64>,
) -> ApiResult<Json<Vec<Visit>>> {
    Ok(Json(state.clinic.list_visits(patient_id)?))
}

pub async fn get_visit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Visit>> {
    Ok(Json(state.clinic.get_visit(id)?))
}

pub async fn update_visit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<VisitInput>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(input) = payload?;
    state.clinic.update_visit(id, input)?;
    Ok(Json(MessageResponse::new("Visit updated")))
}

pub async fn delete_visit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.clinic.delete_visit(id)?;
    Ok(Json(MessageResponse::new("Visit deleted")))
}
