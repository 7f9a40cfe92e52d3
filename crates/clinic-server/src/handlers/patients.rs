use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use clinic_core::Patient;
use serde::{Deserialize, Serialize};

use super::MessageResponse;
use crate::error::ApiResult;
use crate::AppState;

/// Patient create/update body. A missing name is reported by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PatientPayload {
    pub name: Option<String>,
    pub sex: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PatientCreated {
    pub message: &'static str,
    pub patient_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: Option<String>,
}

pub async fn create_patient(
    State(state): State<AppState>,
    payload: Result<Json<PatientPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PatientCreated>)> {
    let Json(payload) = payload?;
    let patient = state.clinic.create_patient(
        payload.name.as_deref().unwrap_or_default(),
        payload.sex.as_deref(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(PatientCreated {
            message: "Patient created",
            patient_id: patient.id,
        }),
    ))
}

pub async fn list_patients(State(state): State<AppState>) -> ApiResult<Json<Vec<Patient>>> {
    Ok(Json(state.clinic.list_patients()?))
}

pub async fn search_patients(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<Patient>>> {
    let query = params.q.unwrap_or_default();
    Ok(Json(state.clinic.search_patients(&query)?))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Patient>> {
    Ok(Json(state.clinic.get_patient(id)?))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<PatientPayload>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(payload) = payload?;
    state.clinic.update_patient(
        id,
        payload.name.as_deref().unwrap_or_default(),
        payload.sex.as_deref(),
    )?;
    Ok(Json(MessageResponse::new("Patient updated")))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.clinic.delete_patient(id)?;
    Ok(Json(MessageResponse::new("Patient and their visits deleted")))
}
