//! Upstream mailbox API requests made on behalf of a token.
//!
//! The HTTP round trip itself is left to the caller; this module builds the
//! URL and headers for a token and parses the JSON that comes back.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;

use crate::error::Result;
use crate::model::mail::{MailListResponse, MailRecord};
use crate::model::token::{ApiType, TokenRecord};

/// Form-style query component: everything but `A-Za-z0-9*-._` and space is
/// escaped. Spaces become `+` in [`form_encode`].
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// `application/x-www-form-urlencoded` value encoding.
fn form_encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE)
        .to_string()
        .replace(' ', "+")
}

pub const DEFAULT_LIMIT: u32 = 20;

/// Paging and search parameters a viewer may pass through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailQuery {
    pub limit: u32,
    pub offset: u32,
    pub keyword: Option<String>,
}

impl Default for MailQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            keyword: None,
        }
    }
}

/// A fully resolved `GET` against the upstream mailbox API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamRequest {
    pub url: String,
    /// Header name/value pairs, in the order they are sent.
    pub headers: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn build(token: &TokenRecord, query: &MailQuery) -> Self {
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if !token.email_address.is_empty() {
            params.push(("address", token.email_address.clone()));
        }
        if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.is_empty()) {
            params.push(("keyword", keyword.to_string()));
        }

        let query_string = params
            .iter()
            .map(|(name, value)| format!("{name}={}", form_encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let url = format!(
            "{}{}?{query_string}",
            token.mail_worker_url.trim_end_matches('/'),
            token.api_type.endpoint()
        );

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        match token.api_type {
            ApiType::User if !token.jwt_token.is_empty() => {
                headers.push((
                    "Authorization".to_string(),
                    format!("Bearer {}", token.jwt_token),
                ));
                if !token.custom_auth.is_empty() {
                    headers.push(("x-custom-auth".to_string(), token.custom_auth.clone()));
                }
            }
            ApiType::Admin | ApiType::UserApi if !token.admin_auth.is_empty() => {
                headers.push(("x-admin-auth".to_string(), token.admin_auth.clone()));
            }
            _ => {}
        }

        Self { url, headers }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse an upstream list response. A missing `results` field is an empty
/// list.
pub fn parse_response(json: &str) -> Result<Vec<MailRecord>> {
    let response: MailListResponse = serde_json::from_str(json)?;
    Ok(response.results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn token(api_type: ApiType) -> TokenRecord {
        TokenRecord {
            id: "id".to_string(),
            email_address: "box+1@example.com".to_string(),
            description: String::new(),
            mail_worker_url: "https://mail.example.com/".to_string(),
            api_type,
            jwt_token: "jwt".to_string(),
            admin_auth: "admin-secret".to_string(),
            custom_auth: String::new(),
            created_at: Utc::now(),
            expires_at: None,
            disabled: false,
            access_count: 0,
        }
    }

    #[test]
    fn test_user_request() {
        let req = UpstreamRequest::build(&token(ApiType::User), &MailQuery::default());
        assert_eq!(
            req.url,
            "https://mail.example.com/api/mails?limit=20&offset=0&address=box%2B1%40example.com"
        );
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("Authorization"), Some("Bearer jwt"));
        assert_eq!(req.header("x-custom-auth"), None);
        assert_eq!(req.header("x-admin-auth"), None);
    }

    #[test]
    fn test_user_request_custom_auth() {
        let mut t = token(ApiType::User);
        t.custom_auth = "site-pass".to_string();
        let req = UpstreamRequest::build(&t, &MailQuery::default());
        assert_eq!(req.header("x-custom-auth"), Some("site-pass"));
    }

    #[test]
    fn test_user_without_jwt_sends_no_auth() {
        let mut t = token(ApiType::User);
        t.jwt_token.clear();
        t.custom_auth = "site-pass".to_string();
        let req = UpstreamRequest::build(&t, &MailQuery::default());
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn test_admin_and_user_api_requests() {
        let query = MailQuery {
            limit: 5,
            offset: 10,
            keyword: Some("发票 2024".to_string()),
        };
        let admin = UpstreamRequest::build(&token(ApiType::Admin), &query);
        assert!(admin.url.starts_with("https://mail.example.com/admin/mails?limit=5&offset=10"));
        assert!(admin.url.ends_with("&keyword=%E5%8F%91%E7%A5%A8+2024"));
        assert_eq!(admin.header("x-admin-auth"), Some("admin-secret"));
        assert_eq!(admin.header("Authorization"), None);

        let user_api = UpstreamRequest::build(&token(ApiType::UserApi), &query);
        assert!(user_api.url.contains("/user_api/mails?"));
        assert_eq!(user_api.header("x-admin-auth"), Some("admin-secret"));
    }

    #[test]
    fn test_form_encode() {
        assert_eq!(form_encode("a b  c"), "a+b++c");
        assert_eq!(form_encode("1+1=2"), "1%2B1%3D2");
        assert_eq!(form_encode("x*y-z.w_v~"), "x*y-z.w_v%7E");
        assert_eq!(form_encode(""), "");
    }

    #[test]
    fn test_empty_address_omitted() {
        let mut t = token(ApiType::User);
        t.email_address.clear();
        let req = UpstreamRequest::build(&t, &MailQuery::default());
        assert!(!req.url.contains("address="));
    }

    #[test]
    fn test_parse_response() {
        let mails = parse_response(
            r#"{"results": [{"raw": "Subject: hi\n\nbody", "created_at": "2024-01-01 00:00:00"}], "count": 1}"#,
        )
        .unwrap();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].raw(), "Subject: hi\n\nbody");

        assert!(parse_response("{}").unwrap().is_empty());
        assert!(parse_response("not json").is_err());
    }
}
