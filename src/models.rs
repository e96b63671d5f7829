use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::session::Role;

// --- Backend Resource Schemas (mirrored, snake_case on the wire) ---

/// User
///
/// A marketplace account as the backend returns it. `role` drives every console gate.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub uuid: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub role: Role,
    #[serde(default)]
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Experience
///
/// A bookable activity published by a host.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Experience {
    pub id: i64,
    pub uuid: Uuid,
    // FK to users.id (host).
    pub host_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub city_id: Option<i64>,
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Story
///
/// A travel story. `content` is the markdown-lite text produced by the editor.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Story {
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub uuid: Uuid,
    pub story_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Booking {
    pub id: i64,
    pub uuid: Uuid,
    pub experience_id: i64,
    // FK to users.id (traveller).
    pub user_id: i64,
    pub guests: i32,
    pub total_amount: f64,
    pub status: String,
    #[ts(type = "string")]
    pub booking_date: DateTime<Utc>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NotificationSettings
///
/// Belongs to a User. The web app speaks camelCase for this resource, the mapping
/// lives on the catalog route.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NotificationSettings {
    pub id: i64,
    pub user_id: i64,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub booking_updates: bool,
    pub marketing_emails: bool,
    pub story_comments: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Master Data ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Bank {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub code: String,
    pub country_id: Option<i64>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Country {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub iso_code: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct City {
    pub id: i64,
    pub uuid: Uuid,
    pub country_id: i64,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Language {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Faq {
    pub id: i64,
    pub uuid: Uuid,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub sort_order: i32,
}

// --- Request Payloads (validated after field mapping) ---

/// CreateCommentRequest
///
/// What the backend accepts on `POST /comments`. The web app sends `storyId` /
/// `parentId`; the catalog maps them before this check runs.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub story_id: i64,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateStoryRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateBankAccountRequest {
    pub bank_id: i64,
    pub account_number: String,
    pub account_holder_name: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReviewReplyRequest {
    pub reply: String,
}

/// Partial update: every flag optional, only provided ones are forwarded.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateNotificationSettingsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_updates: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marketing_emails: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_comments: Option<bool>,
}
