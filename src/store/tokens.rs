//! Distribution token operations over a [`KvStore`].
//!
//! Each token lives under `token:{id}` as a JSON [`TokenRecord`]; the ids
//! are also kept, in creation order, as a JSON array under `token:list`.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};

use super::kv::KvStore;
use crate::error::{MailShareError, Result};
use crate::model::token::{
    CreateToken, CreatedToken, TokenRecord, TokenSummary, TokenUpdate, ViewerConfig,
};
use crate::proxy::{MailQuery, UpstreamRequest};

/// Key of the creation-ordered id index.
pub const TOKEN_LIST_KEY: &str = "token:list";

/// Length of generated token ids.
pub const TOKEN_ID_LEN: usize = 32;

/// Viewer base URL used when neither the request nor the config names one.
pub const DEFAULT_VIEWER_URL: &str = "https://your-viewer.pages.dev";

fn token_key(id: &str) -> String {
    format!("token:{id}")
}

/// Generate a random id of [`TOKEN_ID_LEN`] ASCII letters and digits.
pub fn generate_token_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_ID_LEN)
        .map(char::from)
        .collect()
}

/// Token management on top of any key-value backend.
pub struct TokenStore<S: KvStore> {
    kv: S,
    default_viewer_url: String,
}

impl<S: KvStore> TokenStore<S> {
    pub fn new(kv: S) -> Self {
        Self::with_viewer_url(kv, DEFAULT_VIEWER_URL)
    }

    pub fn with_viewer_url(kv: S, viewer_url: impl Into<String>) -> Self {
        Self {
            kv,
            default_viewer_url: viewer_url.into(),
        }
    }

    /// The underlying key-value store.
    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// Create a token and append it to the index.
    pub fn create(&mut self, request: CreateToken) -> Result<CreatedToken> {
        if request.email_address.trim().is_empty() {
            return Err(MailShareError::InvalidRequest(
                "email address is required".to_string(),
            ));
        }
        if request.mail_worker_url.trim().is_empty() {
            return Err(MailShareError::InvalidRequest(
                "mail worker URL is required".to_string(),
            ));
        }

        let id = generate_token_id();
        let record = TokenRecord {
            id: id.clone(),
            email_address: request.email_address,
            description: request.description.unwrap_or_default(),
            mail_worker_url: request.mail_worker_url,
            api_type: request.api_type,
            jwt_token: request.jwt_token.unwrap_or_default(),
            admin_auth: request.admin_auth.unwrap_or_default(),
            custom_auth: request.custom_auth.unwrap_or_default(),
            created_at: Utc::now(),
            expires_at: request.expires_at,
            disabled: false,
            access_count: 0,
        };

        self.save(&record)?;
        self.add_to_list(&id)?;

        let viewer_url = request
            .viewer_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.default_viewer_url.clone());
        let url = format!("{}/#/view/{id}", viewer_url.trim_end_matches('/'));

        info!(id = %id, email = %record.email_address, "Token created");
        Ok(CreatedToken {
            id,
            url,
            email_address: record.email_address,
            created_at: record.created_at,
        })
    }

    /// All tokens in creation order. Ids whose record is gone or unreadable
    /// are skipped.
    pub fn list(&self) -> Result<Vec<TokenSummary>> {
        let mut tokens = Vec::new();
        for id in self.load_list()? {
            let Some(json) = self.kv.get(&token_key(&id))? else {
                debug!(id = %id, "Skipping dangling token id");
                continue;
            };
            match serde_json::from_str::<TokenRecord>(&json) {
                Ok(record) => tokens.push(TokenSummary::from(&record)),
                Err(e) => warn!(id = %id, error = %e, "Skipping unreadable token record"),
            }
        }
        Ok(tokens)
    }

    /// Remove a token and its index entry. Unknown ids are ignored.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.kv.delete(&token_key(id))?;
        self.remove_from_list(id)?;
        info!(id = %id, "Token deleted");
        Ok(())
    }

    /// Merge `update` over the stored record.
    pub fn update(&mut self, id: &str, update: TokenUpdate) -> Result<TokenRecord> {
        let mut record = self
            .get(id)?
            .ok_or_else(|| MailShareError::TokenNotFound(id.to_string()))?;
        update.apply(&mut record);
        self.save(&record)?;
        info!(id = %id, "Token updated");
        Ok(record)
    }

    /// Read a token without side effects.
    pub fn get(&self, id: &str) -> Result<Option<TokenRecord>> {
        match self.kv.get(&token_key(id))? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Count one viewer access.
    pub fn record_access(&mut self, id: &str) -> Result<TokenRecord> {
        let mut record = self
            .get(id)?
            .ok_or_else(|| MailShareError::TokenNotFound(id.to_string()))?;
        record.access_count += 1;
        self.save(&record)?;
        debug!(id = %id, count = record.access_count, "Token access recorded");
        Ok(record)
    }

    /// Check a viewer's token at `now` and count the access if it is usable.
    pub fn authorize(&mut self, id: &str, now: DateTime<Utc>) -> Result<TokenRecord> {
        let Some(record) = self.get(id)? else {
            warn!(id = %id, "Unknown token presented");
            return Err(MailShareError::TokenInvalid);
        };
        if record.is_expired(now) {
            return Err(MailShareError::TokenExpired);
        }
        if record.disabled {
            return Err(MailShareError::TokenDisabled);
        }
        self.record_access(id)
    }

    /// Authorize `id` at `now`, then build its upstream mail list request.
    ///
    /// Unknown, expired and disabled tokens never produce a request; a
    /// successful call counts one access.
    pub fn mail_request(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
        query: &MailQuery,
    ) -> Result<UpstreamRequest> {
        let record = self.authorize(id, now)?;
        Ok(UpstreamRequest::build(&record, query))
    }

    /// The metadata a viewer may see; no credentials.
    pub fn public_config(record: &TokenRecord) -> ViewerConfig {
        ViewerConfig::from(record)
    }

    fn save(&mut self, record: &TokenRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.kv.put(&token_key(&record.id), json)
    }

    fn load_list(&self) -> Result<Vec<String>> {
        match self.kv.get(TOKEN_LIST_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                MailShareError::Store(format!("malformed {TOKEN_LIST_KEY}: {e}"))
            }),
            None => Ok(Vec::new()),
        }
    }

    fn add_to_list(&mut self, id: &str) -> Result<()> {
        let mut ids = self.load_list()?;
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
            self.kv.put(TOKEN_LIST_KEY, serde_json::to_string(&ids)?)?;
        }
        Ok(())
    }

    fn remove_from_list(&mut self, id: &str) -> Result<()> {
        let mut ids = self.load_list()?;
        if let Some(pos) = ids.iter().position(|existing| existing == id) {
            ids.remove(pos);
            self.kv.put(TOKEN_LIST_KEY, serde_json::to_string(&ids)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::token::ApiType;
    use crate::store::kv::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn request(email: &str) -> CreateToken {
        CreateToken {
            email_address: email.to_string(),
            mail_worker_url: "https://mail.example.com".to_string(),
            jwt_token: Some("jwt".to_string()),
            ..CreateToken::default()
        }
    }

    #[test]
    fn test_generate_token_id() {
        let id = generate_token_id();
        assert_eq!(id.len(), TOKEN_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_token_id());
    }

    #[test]
    fn test_create_builds_url_and_record() {
        let mut store = TokenStore::with_viewer_url(MemoryStore::new(), "https://view.example/");
        let created = store.create(request("box@example.com")).unwrap();

        assert_eq!(
            created.url,
            format!("https://view.example/#/view/{}", created.id)
        );
        let record = store.get(&created.id).unwrap().unwrap();
        assert_eq!(record.api_type, ApiType::User);
        assert_eq!(record.access_count, 0);
        assert!(!record.disabled);
        assert_eq!(record.custom_auth, "");
    }

    #[test]
    fn test_create_request_viewer_url_wins() {
        let mut store = TokenStore::new(MemoryStore::new());
        let mut req = request("box@example.com");
        req.viewer_url = Some("https://mine.example".to_string());
        let created = store.create(req).unwrap();
        assert!(created.url.starts_with("https://mine.example/#/view/"));
    }

    #[test]
    fn test_create_requires_fields() {
        let mut store = TokenStore::new(MemoryStore::new());
        let err = store.create(request("")).unwrap_err();
        assert!(matches!(err, MailShareError::InvalidRequest(_)));
    }

    #[test]
    fn test_list_in_creation_order_skips_dangling() {
        let mut store = TokenStore::new(MemoryStore::new());
        let a = store.create(request("a@example.com")).unwrap();
        let b = store.create(request("b@example.com")).unwrap();
        store.kv.delete(&token_key(&a.id)).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b.id);
    }

    #[test]
    fn test_list_skips_unreadable_record() {
        let mut store = TokenStore::new(MemoryStore::new());
        let good = store.create(request("a@example.com")).unwrap();
        store
            .kv
            .put(&token_key("broken"), "{\"id\": \"broken\"".to_string())
            .unwrap();
        store.add_to_list("broken").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, good.id);
        assert!(store.get("broken").is_err());
    }

    #[test]
    fn test_delete_removes_key_and_index() {
        let mut store = TokenStore::new(MemoryStore::new());
        let created = store.create(request("a@example.com")).unwrap();
        store.delete(&created.id).unwrap();

        assert!(store.get(&created.id).unwrap().is_none());
        assert_eq!(store.kv().get(TOKEN_LIST_KEY).unwrap().as_deref(), Some("[]"));
        store.delete("unknown").unwrap();
    }

    #[test]
    fn test_update_missing_token() {
        let mut store = TokenStore::new(MemoryStore::new());
        let err = store.update("nope", TokenUpdate::default()).unwrap_err();
        assert!(matches!(err, MailShareError::TokenNotFound(_)));
    }

    #[test]
    fn test_get_has_no_side_effects() {
        let mut store = TokenStore::new(MemoryStore::new());
        let created = store.create(request("a@example.com")).unwrap();
        store.get(&created.id).unwrap();
        store.get(&created.id).unwrap();
        assert_eq!(store.get(&created.id).unwrap().unwrap().access_count, 0);
    }

    #[test]
    fn test_authorize() {
        let mut store = TokenStore::new(MemoryStore::new());
        let created = store.create(request("a@example.com")).unwrap();
        let now = Utc::now();

        let record = store.authorize(&created.id, now).unwrap();
        assert_eq!(record.access_count, 1);
        let record = store.authorize(&created.id, now).unwrap();
        assert_eq!(record.access_count, 2);

        assert!(matches!(
            store.authorize("missing", now),
            Err(MailShareError::TokenInvalid)
        ));
    }

    #[test]
    fn test_authorize_expired_and_disabled() {
        let mut store = TokenStore::new(MemoryStore::new());
        let created = store.create(request("a@example.com")).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let expired = TokenUpdate {
            expires_at: Some(Some(now - Duration::hours(1))),
            ..TokenUpdate::default()
        };
        store.update(&created.id, expired).unwrap();
        assert!(matches!(
            store.authorize(&created.id, now),
            Err(MailShareError::TokenExpired)
        ));

        let disabled = TokenUpdate {
            expires_at: Some(None),
            disabled: Some(true),
            ..TokenUpdate::default()
        };
        store.update(&created.id, disabled).unwrap();
        assert!(matches!(
            store.authorize(&created.id, now),
            Err(MailShareError::TokenDisabled)
        ));

        assert_eq!(store.get(&created.id).unwrap().unwrap().access_count, 0);
    }

    #[test]
    fn test_mail_request_requires_usable_token() {
        let mut store = TokenStore::new(MemoryStore::new());
        let created = store.create(request("a@example.com")).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let query = MailQuery::default();

        let upstream = store.mail_request(&created.id, now, &query).unwrap();
        assert!(upstream.url.starts_with("https://mail.example.com/api/mails?"));
        assert_eq!(upstream.header("Authorization"), Some("Bearer jwt"));
        assert_eq!(store.get(&created.id).unwrap().unwrap().access_count, 1);

        assert!(matches!(
            store.mail_request("missing", now, &query),
            Err(MailShareError::TokenInvalid)
        ));

        let expired = TokenUpdate {
            expires_at: Some(Some(now - Duration::minutes(1))),
            ..TokenUpdate::default()
        };
        store.update(&created.id, expired).unwrap();
        assert!(matches!(
            store.mail_request(&created.id, now, &query),
            Err(MailShareError::TokenExpired)
        ));

        let disabled = TokenUpdate {
            expires_at: Some(None),
            disabled: Some(true),
            ..TokenUpdate::default()
        };
        store.update(&created.id, disabled).unwrap();
        assert!(matches!(
            store.mail_request(&created.id, now, &query),
            Err(MailShareError::TokenDisabled)
        ));
        assert_eq!(store.get(&created.id).unwrap().unwrap().access_count, 1);
    }

    #[test]
    fn test_public_config_hides_credentials() {
        let mut store = TokenStore::new(MemoryStore::new());
        let mut req = request("a@example.com");
        req.description = Some("shared inbox".to_string());
        let created = store.create(req).unwrap();
        let record = store.get(&created.id).unwrap().unwrap();

        let json = serde_json::to_value(TokenStore::<MemoryStore>::public_config(&record)).unwrap();
        assert_eq!(json["emailAddress"], "a@example.com");
        assert_eq!(json["description"], "shared inbox");
        assert!(json.get("jwtToken").is_none());
    }
}
