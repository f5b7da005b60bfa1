//! Distribution tokens: stored records and the requests that manage them.
//!
//! Records are stored as camelCase JSON so existing stores stay readable.
//! Expiry times are written as RFC 3339 but read with [`parse_date`], which
//! also accepts the minute-precision form a `datetime-local` input posts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parser::header::parse_date;

/// Which upstream mailbox API a token proxies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiType {
    /// `/api/mails`, authenticated with a user JWT.
    #[default]
    User,
    /// `/user_api/mails`, authenticated with the admin auth header.
    UserApi,
    /// `/admin/mails`, authenticated with the admin auth header.
    Admin,
}

impl ApiType {
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::User => "/api/mails",
            Self::UserApi => "/user_api/mails",
            Self::Admin => "/admin/mails",
        }
    }

    /// Parse `user`, `user_api` or `admin`; anything else is `User`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "admin" => Self::Admin,
            "user_api" | "user-api" => Self::UserApi,
            _ => Self::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::UserApi => "user_api",
            Self::Admin => "admin",
        }
    }
}

/// A stored token, including the upstream credentials it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: String,
    pub email_address: String,
    #[serde(default)]
    pub description: String,
    pub mail_worker_url: String,
    #[serde(default)]
    pub api_type: ApiType,
    #[serde(default)]
    pub jwt_token: String,
    #[serde(default)]
    pub admin_auth: String,
    #[serde(default)]
    pub custom_auth: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_date::deserialize")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub access_count: u64,
}

impl TokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires < now)
    }
}

/// Admin request to create a token.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateToken {
    pub email_address: String,
    #[serde(default)]
    pub description: Option<String>,
    pub mail_worker_url: String,
    #[serde(default)]
    pub api_type: ApiType,
    #[serde(default)]
    pub jwt_token: Option<String>,
    #[serde(default)]
    pub admin_auth: Option<String>,
    #[serde(default)]
    pub custom_auth: Option<String>,
    #[serde(default, deserialize_with = "lenient_date::deserialize")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Base URL of the viewer; the share link is built from it.
    #[serde(default)]
    pub viewer_url: Option<String>,
}

/// What the admin gets back after creating a token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedToken {
    pub id: String,
    pub url: String,
    pub email_address: String,
    pub created_at: DateTime<Utc>,
}

/// Token listing row, without upstream credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub id: String,
    pub email_address: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub disabled: bool,
    pub access_count: u64,
}

impl From<&TokenRecord> for TokenSummary {
    fn from(record: &TokenRecord) -> Self {
        Self {
            id: record.id.clone(),
            email_address: record.email_address.clone(),
            description: record.description.clone(),
            created_at: record.created_at,
            expires_at: record.expires_at,
            disabled: record.disabled,
            access_count: record.access_count,
        }
    }
}

/// Partial update: every `Some` field replaces the stored value.
///
/// `expires_at: Some(None)` clears the expiry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdate {
    pub email_address: Option<String>,
    pub description: Option<String>,
    pub mail_worker_url: Option<String>,
    pub api_type: Option<ApiType>,
    pub jwt_token: Option<String>,
    pub admin_auth: Option<String>,
    pub custom_auth: Option<String>,
    #[serde(default, deserialize_with = "lenient_date::deserialize_update")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub disabled: Option<bool>,
}

impl TokenUpdate {
    /// Merge into `record`. Identity, creation time and the access counter
    /// are never touched.
    pub fn apply(self, record: &mut TokenRecord) {
        if let Some(v) = self.email_address {
            record.email_address = v;
        }
        if let Some(v) = self.description {
            record.description = v;
        }
        if let Some(v) = self.mail_worker_url {
            record.mail_worker_url = v;
        }
        if let Some(v) = self.api_type {
            record.api_type = v;
        }
        if let Some(v) = self.jwt_token {
            record.jwt_token = v;
        }
        if let Some(v) = self.admin_auth {
            record.admin_auth = v;
        }
        if let Some(v) = self.custom_auth {
            record.custom_auth = v;
        }
        if let Some(v) = self.expires_at {
            record.expires_at = v;
        }
        if let Some(v) = self.disabled {
            record.disabled = v;
        }
    }
}

/// The metadata a viewer may see about its token.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    pub email_address: String,
    pub description: String,
}

impl From<&TokenRecord> for ViewerConfig {
    fn from(record: &TokenRecord) -> Self {
        Self {
            email_address: record.email_address.clone(),
            description: record.description.clone(),
        }
    }
}

/// Expiry values: `null` or `""` mean no expiry, anything else must parse.
mod lenient_date {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    use super::parse_date;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(value) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        if value.trim().is_empty() {
            return Ok(None);
        }
        parse_date(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid expiry time: {value}")))
    }

    /// Like [`deserialize`], but keeps an absent field apart from `null`.
    pub fn deserialize_update<'de, D>(
        deserializer: D,
    ) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize(deserializer).map(Some)
    }
}
