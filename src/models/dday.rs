// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! D-Day model: a dated milestone, optionally recurring every year.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// D-Day document in the `ddays` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DDay {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    #[serde(default)]
    pub is_annual: bool,
    /// Creator email
    pub created_by: String,
    /// Emails of users who may see and edit this D-Day
    #[serde(default)]
    pub connected_users: Vec<String>,
    /// Category used by the calendar for color coding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Last day of a multi-day event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub end_date: Option<NaiveDate>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl DDay {
    /// Creator or connected user.
    pub fn can_edit(&self, email: &str) -> bool {
        self.created_by == email || self.connected_users.iter().any(|u| u == email)
    }

    /// Add `email` to the connected users. Returns `true` if the list changed.
    pub fn add_connected_user(&mut self, email: &str) -> bool {
        if self.connected_users.iter().any(|u| u == email) {
            return false;
        }
        self.connected_users.push(email.to_string());
        true
    }

    /// Remove `email` from the connected users. Returns `true` if the list changed.
    pub fn remove_connected_user(&mut self, email: &str) -> bool {
        let before = self.connected_users.len();
        self.connected_users.retain(|u| u != email);
        self.connected_users.len() != before
    }

    /// Whether this D-Day shows up on the calendar page for `view`.
    ///
    /// Annual events match on month alone; others need year and month.
    pub fn occurs_in(&self, view: MonthView) -> bool {
        if self.date.month() != view.month {
            return false;
        }
        self.is_annual || self.date.year() == view.year
    }
}

/// Calendar month selector, written `YYYYMM` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
}

impl FromStr for MonthView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err("Invalid date format. Use YYYYMM".to_string());
        }
        let year: i32 = s[0..4].parse().map_err(|_| "Invalid year".to_string())?;
        let month: u32 = s[4..6].parse().map_err(|_| "Invalid month".to_string())?;
        if !(1..=12).contains(&month) {
            return Err("Invalid month".to_string());
        }
        Ok(Self { year, month })
    }
}

/// Parse an event date sent by a client.
///
/// Accepts `YYYYMMDD`, `YYYY-MM-DD`, or an RFC3339 datetime (date part kept).
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(raw, "%Y%m%d").ok();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}
