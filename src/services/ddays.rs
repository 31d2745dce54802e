// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! D-Day listing, creation, update and deletion.

use crate::crypto::new_doc_id;
use crate::db::Db;
use crate::error::AppError;
use crate::models::dday::parse_event_date;
use crate::models::user::normalize_email;
use crate::models::{DDay, MonthView};
use crate::services::ConnectionService;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use validator::Validate;

pub const MAX_TITLE_CHARS: usize = 200;

/// Body of `POST /api/ddays`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDDay {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_annual: bool,
    #[serde(default)]
    pub connected_users: Vec<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Body of `PUT /api/ddays/{id}`. Absent fields are left unchanged.
///
/// An empty `group` or `endDate` clears the field.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDDay {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub is_annual: Option<bool>,
    pub connected_users: Option<Vec<String>>,
    pub group: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Clone)]
pub struct DDayService {
    db: Db,
    connections: ConnectionService,
}

impl DDayService {
    pub fn new(db: Db, connections: ConnectionService) -> Self {
        Self { db, connections }
    }

    /// D-Days the caller created or is connected to, sorted by date then title.
    pub async fn list(&self, email: &str, view: Option<MonthView>) -> Result<Vec<DDay>, AppError> {
        let mut ddays = self.db.list_ddays_created_by(email).await?;
        let mut seen: HashSet<String> = ddays.iter().map(|d| d.id.clone()).collect();

        for dday in self.db.list_ddays_shared_with(email).await? {
            if seen.insert(dday.id.clone()) {
                ddays.push(dday);
            }
        }

        if let Some(view) = view {
            ddays.retain(|d| d.occurs_in(view));
        }
        ddays.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.title.cmp(&b.title)));
        Ok(ddays)
    }

    pub async fn create(&self, creator: &str, input: CreateDDay) -> Result<DDay, AppError> {
        let title = checked_title(&input.title)?;
        let date = required_date(&input.date)?;
        let end_date = optional_date(input.end_date.as_deref())?;
        check_range(date, end_date)?;

        let mut connected_users = input.connected_users;
        if let Some(partner) = self.connections.active_partner(creator).await? {
            connected_users.push(partner);
        }

        let now = Utc::now();
        let dday = DDay {
            id: new_doc_id()?,
            title,
            description: input.description,
            date,
            is_annual: input.is_annual,
            created_by: creator.to_string(),
            connected_users: clean_connected_users(connected_users, creator),
            group: input.group.filter(|g| !g.is_empty()),
            end_date,
            created_at: now,
            updated_at: now,
        };
        self.db.put_dday(&dday).await?;

        tracing::info!(dday_id = %dday.id, created_by = creator, "D-Day created");
        Ok(dday)
    }

    /// Apply a partial update. Creator or connected users only.
    pub async fn update(
        &self,
        dday_id: &str,
        email: &str,
        patch: UpdateDDay,
    ) -> Result<DDay, AppError> {
        let mut dday = self.load(dday_id).await?;
        if !dday.can_edit(email) {
            return Err(AppError::Forbidden(
                "Not allowed to edit this D-Day".to_string(),
            ));
        }

        if let Some(title) = patch.title {
            dday.title = checked_title(&title)?;
        }
        if let Some(description) = patch.description {
            dday.description = description;
        }
        if let Some(date) = patch.date {
            dday.date = required_date(&date)?;
        }
        if let Some(is_annual) = patch.is_annual {
            dday.is_annual = is_annual;
        }
        if let Some(users) = patch.connected_users {
            dday.connected_users = clean_connected_users(users, &dday.created_by);
        }
        if let Some(group) = patch.group {
            dday.group = Some(group).filter(|g| !g.is_empty());
        }
        if let Some(end_date) = patch.end_date {
            dday.end_date = optional_date(Some(&end_date))?;
        }
        check_range(dday.date, dday.end_date)?;

        dday.updated_at = Utc::now();
        self.db.put_dday(&dday).await?;

        tracing::info!(dday_id, updated_by = email, "D-Day updated");
        Ok(dday)
    }

    /// Delete a D-Day. Creator only.
    pub async fn delete(&self, dday_id: &str, email: &str) -> Result<(), AppError> {
        let dday = self.load(dday_id).await?;
        if dday.created_by != email {
            return Err(AppError::Forbidden(
                "Only the creator can delete this D-Day".to_string(),
            ));
        }
        self.db.delete_dday(dday_id).await?;

        tracing::info!(dday_id, deleted_by = email, "D-Day deleted");
        Ok(())
    }

    /// Delete every D-Day the user created. Returns how many were removed.
    pub async fn delete_all_created_by(&self, email: &str) -> Result<usize, AppError> {
        let ddays = self.db.list_ddays_created_by(email).await?;
        for dday in &ddays {
            self.db.delete_dday(&dday.id).await?;
        }
        Ok(ddays.len())
    }

    async fn load(&self, dday_id: &str) -> Result<DDay, AppError> {
        self.db
            .get_dday(dday_id)
            .await?
            .ok_or_else(|| AppError::NotFound("D-Day not found".to_string()))
    }
}

fn checked_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    let chars = title.chars().count();
    if chars == 0 || chars > MAX_TITLE_CHARS {
        return Err(AppError::BadRequest(
            "Title must be 1-200 characters".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn required_date(raw: &str) -> Result<NaiveDate, AppError> {
    parse_event_date(raw).ok_or_else(|| {
        AppError::BadRequest("Invalid date. Use YYYYMMDD or YYYY-MM-DD".to_string())
    })
}

/// `None` or empty means no end date.
fn optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => required_date(raw).map(Some),
    }
}

fn check_range(date: NaiveDate, end_date: Option<NaiveDate>) -> Result<(), AppError> {
    match end_date {
        Some(end) if end < date => Err(AppError::BadRequest(
            "endDate must not be before date".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Normalize, de-duplicate (keeping first occurrence) and drop the creator.
fn clean_connected_users(users: Vec<String>, creator: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    users
        .iter()
        .map(|u| normalize_email(u))
        .filter(|u| !u.is_empty() && u != creator)
        .filter(|u| seen.insert(u.clone()))
        .collect()
}
