// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! D-Day CRUD endpoints.

use crate::error::{AppError, Result};
use crate::extract::ValidatedJson;
use crate::middleware::AuthUser;
use crate::models::{DDay, MonthView};
use crate::services::{CreateDDay, UpdateDDay};
use crate::AppState;
use super::MessageResponse;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/ddays", get(list_ddays).post(create_dday))
        .route("/api/ddays/{id}", put(update_dday).delete(delete_dday))
}

#[derive(Deserialize)]
struct ListQuery {
    /// `YYYYMM`
    view: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DDayListResponse {
    pub ddays: Vec<DDay>,
    /// Echo of the `view` filter, when one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DDayResponse {
    pub dday: DDay,
}

async fn list_ddays(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListQuery>,
) -> Result<Json<DDayListResponse>> {
    let view = params
        .view
        .as_deref()
        .map(str::parse::<MonthView>)
        .transpose()
        .map_err(AppError::BadRequest)?;

    let ddays = state.ddays.list(&user.email, view).await?;
    Ok(Json(DDayListResponse {
        ddays,
        date: params.view,
    }))
}

async fn create_dday(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(body): ValidatedJson<CreateDDay>,
) -> Result<(StatusCode, Json<DDayResponse>)> {
    let dday = state.ddays.create(&user.email, body).await?;
    Ok((StatusCode::CREATED, Json(DDayResponse { dday })))
}

async fn update_dday(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateDDay>,
) -> Result<Json<DDayResponse>> {
    let dday = state.ddays.update(&id, &user.email, body).await?;
    Ok(Json(DDayResponse { dday }))
}

async fn delete_dday(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.ddays.delete(&id, &user.email).await?;
    Ok(Json(MessageResponse {
        message: "D-Day deleted".to_string(),
    }))
}
