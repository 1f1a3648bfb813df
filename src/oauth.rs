//! Token-exchange proxies for the two hosted platforms.
//!
//! The browser never sees the OAuth client secrets; it posts the
//! authorization code here and we exchange it server-side, then bundle the
//! bearer token together with a profile fetch and the account listing the
//! setup flow needs (organizations for Supabase, sites for Netlify).

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

pub const SUPABASE_API_BASE: &str = "https://api.supabase.com";
pub const SUPABASE_TOKEN_URL: &str = "https://supabase.com/api/oauth/token";
pub const NETLIFY_API_BASE: &str = "https://api.netlify.com";
pub const NETLIFY_TOKEN_URL: &str = "https://api.netlify.com/oauth/token";

#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The provider rejected the exchange; carries its error description.
    #[error("{0}")]
    Provider(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// What the listing fetch returns and the field it is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountListing {
    Organizations,
    Sites,
}

impl AccountListing {
    pub fn field(&self) -> &'static str {
        match self {
            AccountListing::Organizations => "organizations",
            AccountListing::Sites => "sites",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error_description: Option<String>,
}

/// One provider's endpoints plus the client credentials held server-side.
pub struct OAuthProvider {
    pub name: &'static str,
    token_url: String,
    profile_url: String,
    listing_url: String,
    listing: AccountListing,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl OAuthProvider {
    /// Supabase provider, credentials from `ZMIME_SUPABASE_OAUTH_CLIENT_ID`
    /// / `..._SECRET`, redirect derived from `ZMIME_SITE_URL`.
    pub fn supabase_from_env() -> Self {
        Self::supabase(
            SUPABASE_TOKEN_URL,
            SUPABASE_API_BASE,
            env_or("ZMIME_SUPABASE_OAUTH_CLIENT_ID", "demo-client-id"),
            env_or("ZMIME_SUPABASE_OAUTH_CLIENT_SECRET", ""),
            redirect_uri_from_env(),
        )
    }

    /// Netlify provider, credentials from `ZMIME_NETLIFY_OAUTH_CLIENT_ID`
    /// / `..._SECRET`.
    pub fn netlify_from_env() -> Self {
        Self::netlify(
            NETLIFY_TOKEN_URL,
            NETLIFY_API_BASE,
            env_or("ZMIME_NETLIFY_OAUTH_CLIENT_ID", "demo-client-id"),
            env_or("ZMIME_NETLIFY_OAUTH_CLIENT_SECRET", ""),
            redirect_uri_from_env(),
        )
    }

    pub fn supabase(
        token_url: &str,
        api_base: &str,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            name: "supabase",
            token_url: token_url.to_string(),
            profile_url: format!("{api_base}/v1/profile"),
            listing_url: format!("{api_base}/v1/organizations"),
            listing: AccountListing::Organizations,
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    pub fn netlify(
        token_url: &str,
        api_base: &str,
        client_id: String,
        client_secret: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            name: "netlify",
            token_url: token_url.to_string(),
            profile_url: format!("{api_base}/api/v1/user"),
            listing_url: format!("{api_base}/api/v1/sites"),
            listing: AccountListing::Sites,
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Exchanges an authorization code for a bearer token and returns the
    /// composite payload the setup page consumes:
    /// `{ access_token, user, <organizations|sites>, connected, email }`.
    pub async fn exchange_code(
        &self,
        http: &reqwest::Client,
        code: &str,
    ) -> Result<Value, ExchangeError> {
        let response = http
            .post(&self.token_url)
            .json(&json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
                "grant_type": "authorization_code",
                "redirect_uri": self.redirect_uri,
            }))
            .send()
            .await?;

        let ok = response.status().is_success();
        let token: TokenResponse = response.json().await?;
        let access_token = match (ok, token.access_token) {
            (true, Some(access_token)) => access_token,
            _ => {
                return Err(ExchangeError::Provider(
                    token
                        .error_description
                        .unwrap_or_else(|| "Failed to exchange code".to_string()),
                ));
            }
        };

        let user: Value = http
            .get(&self.profile_url)
            .bearer_auth(&access_token)
            .send()
            .await?
            .json()
            .await?;

        let listing: Value = http
            .get(&self.listing_url)
            .bearer_auth(&access_token)
            .send()
            .await?
            .json()
            .await?;

        let email = user.get("email").cloned().unwrap_or(Value::Null);
        let mut payload = serde_json::Map::new();
        payload.insert("access_token".to_string(), Value::String(access_token));
        payload.insert("user".to_string(), user);
        payload.insert(self.listing.field().to_string(), listing);
        payload.insert("connected".to_string(), Value::Bool(true));
        payload.insert("email".to_string(), email);
        Ok(Value::Object(payload))
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn redirect_uri_from_env() -> String {
    let base = env_or("ZMIME_SITE_URL", "http://127.0.0.1:3000");
    format!("{base}/setup")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OAuthProvider {
        OAuthProvider::supabase(
            &format!("{}/api/oauth/token", server.uri()),
            &server.uri(),
            "client-id".to_string(),
            "client-secret".to_string(),
            "http://localhost/setup".to_string(),
        )
    }

    #[tokio::test]
    async fn successful_exchange_returns_composite_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .and(body_partial_json(
                serde_json::json!({"code": "abc", "grant_type": "authorization_code"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"access_token": "t1"}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/profile"))
            .and(bearer_token("t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"email": "dev@example.com", "name": "Dev"}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/organizations"))
            .and(bearer_token("t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!([{"id": "org-1"}]),
            ))
            .mount(&server)
            .await;

        let payload = provider(&server)
            .exchange_code(&reqwest::Client::new(), "abc")
            .await
            .unwrap();

        assert_eq!(payload["access_token"], "t1");
        assert_eq!(payload["connected"], true);
        assert_eq!(payload["email"], "dev@example.com");
        assert_eq!(payload["organizations"][0]["id"], "org-1");
    }

    #[tokio::test]
    async fn provider_error_description_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({"error_description": "invalid code"}),
            ))
            .mount(&server)
            .await;

        let err = provider(&server)
            .exchange_code(&reqwest::Client::new(), "bad")
            .await
            .unwrap_err();
        assert!(matches!(&err, ExchangeError::Provider(msg) if msg == "invalid code"));
    }

    #[tokio::test]
    async fn missing_access_token_counts_as_failure() {
        let server = MockServer::start().await;

        // 200 but no access_token in the body.
        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = provider(&server)
            .exchange_code(&reqwest::Client::new(), "abc")
            .await
            .unwrap_err();
        assert!(matches!(&err, ExchangeError::Provider(msg) if msg == "Failed to exchange code"));
    }

    #[tokio::test]
    async fn netlify_listing_is_reported_as_sites() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"access_token": "t2"}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"email": "site@example.com"}),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/sites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let netlify = OAuthProvider::netlify(
            &format!("{}/oauth/token", server.uri()),
            &server.uri(),
            "id".to_string(),
            "secret".to_string(),
            "http://localhost/setup".to_string(),
        );
        let payload = netlify
            .exchange_code(&reqwest::Client::new(), "abc")
            .await
            .unwrap();
        assert!(payload.get("sites").is_some());
        assert!(payload.get("organizations").is_none());
    }
}
