//! Google Business Profile review source.
//!
//! OAuth2 refresh-token flow against Google's token endpoint, review listing
//! for one account/location via the v4 API, and reply submission.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::model::{Review, StarRating};
use super::{ReviewSource, filter_unanswered};
use crate::error::{ConfigError, SourceError};

const PROVIDER: &str = "google";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://mybusiness.googleapis.com/v4";
const SCOPE: &str = "https://www.googleapis.com/auth/business.manage";

/// Per-request timeout; the API is known to hang occasionally.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh the access token this long before Google says it expires.
const TOKEN_EXPIRY_SLACK_SECS: i64 = 60;

/// Google source configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub refresh_token: Option<SecretString>,
    pub account_id: String,
    pub location_id: String,
}

impl GoogleConfig {
    /// Returns `Ok(None)` if `GOOGLE_CLIENT_ID` is not set (source disabled).
    ///
    /// Once the source is enabled, the account and location must be set.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let Some(client_id) = var("GOOGLE_CLIENT_ID").filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        let required = |key: &str| {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        Ok(Some(Self {
            client_id,
            client_secret: SecretString::from(var("GOOGLE_CLIENT_SECRET").unwrap_or_default()),
            redirect_uri: var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|| "http://localhost:3000/auth/callback".to_string()),
            refresh_token: var("GOOGLE_REFRESH_TOKEN")
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            account_id: required("GOOGLE_ACCOUNT_ID")?,
            location_id: required("LOCATION_ID")?,
        }))
    }
}

/// Tokens returned by the OAuth code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewPage {
    #[serde(default)]
    reviews: Vec<GoogleReview>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleReview {
    name: String,
    #[serde(default)]
    star_rating: serde_json::Value,
    #[serde(default)]
    comment: Option<String>,
    create_time: DateTime<Utc>,
    #[serde(default)]
    reviewer: Option<GoogleReviewer>,
    #[serde(default)]
    review_reply: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleReviewer {
    #[serde(default)]
    display_name: Option<String>,
}

impl GoogleReview {
    fn into_review(self) -> Option<Review> {
        let Some(rating) = StarRating::from_google(&self.star_rating) else {
            warn!(review = %self.name, rating = %self.star_rating, "Skipping review without a usable star rating");
            return None;
        };
        let reviewer = self
            .reviewer
            .and_then(|r| r.display_name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Anonymous".to_string());
        Some(
            Review::new(
                self.name,
                rating,
                self.comment.unwrap_or_default(),
                reviewer,
                self.create_time,
            )
            .with_existing_reply(self.review_reply.is_some()),
        )
    }
}

struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

/// Google Business Profile client.
pub struct GoogleBusinessClient {
    config: GoogleConfig,
    client: reqwest::Client,
    api_base: String,
    token_url: String,
    refresh_token: RwLock<Option<SecretString>>,
    access_token: RwLock<Option<CachedToken>>,
    /// Held while refreshing so concurrent callers share one token request.
    refresh_lock: Mutex<()>,
}

impl GoogleBusinessClient {
    pub fn new(config: GoogleConfig) -> Result<Self, SourceError> {
        Self::with_endpoints(config, API_BASE, TOKEN_URL)
    }

    /// Point the client at alternative endpoints (local fakes in tests).
    pub fn with_endpoints(
        config: GoogleConfig,
        api_base: &str,
        token_url: &str,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| request_failed(format!("Failed to build HTTP client: {e}")))?;
        let refresh_token = config.refresh_token.clone();
        Ok(Self {
            config,
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            refresh_token: RwLock::new(refresh_token),
            access_token: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Consent URL the operator visits once to grant offline access.
    pub fn auth_url(&self) -> Result<String, SourceError> {
        let url = Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| request_failed(format!("Invalid auth URL: {e}")))?;
        Ok(url.into())
    }

    /// Exchange an OAuth authorization code. The returned refresh token is
    /// also kept for subsequent API calls in this process.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SourceError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let tokens = self.token_request(&form).await?;

        if let Some(ref refresh) = tokens.refresh_token {
            *self.refresh_token.write().await = Some(SecretString::from(refresh.clone()));
        }
        self.cache_access_token(&tokens).await;
        info!("Google OAuth code exchanged");
        Ok(tokens)
    }

    async fn cached_access_token(&self) -> Option<SecretString> {
        self.access_token
            .read()
            .await
            .as_ref()
            .filter(|cached| cached.expires_at > Utc::now())
            .map(|cached| cached.token.clone())
    }

    async fn access_token(&self) -> Result<SecretString, SourceError> {
        if let Some(token) = self.cached_access_token().await {
            return Ok(token);
        }

        let _refreshing = self.refresh_lock.lock().await;
        if let Some(token) = self.cached_access_token().await {
            return Ok(token);
        }

        let refresh = self
            .refresh_token
            .read()
            .await
            .clone()
            .ok_or_else(|| SourceError::AuthFailed {
                provider: PROVIDER.into(),
                reason: "no refresh token; complete the /auth flow first".into(),
            })?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.expose_secret()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
        ];
        let tokens = self.token_request(&form).await?;
        debug!("Google access token refreshed");
        Ok(self.cache_access_token(&tokens).await)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, SourceError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| SourceError::AuthFailed {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::AuthFailed {
                provider: PROVIDER.into(),
                reason: format!("token endpoint returned {status}: {body}"),
            });
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| SourceError::AuthFailed {
                provider: PROVIDER.into(),
                reason: format!("invalid token response: {e}"),
            })
    }

    async fn cache_access_token(&self, tokens: &TokenResponse) -> SecretString {
        let token = SecretString::from(tokens.access_token.clone());
        let lifetime = tokens.expires_in.unwrap_or(3600) - TOKEN_EXPIRY_SLACK_SECS;
        *self.access_token.write().await = Some(CachedToken {
            token: token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(lifetime.max(0)),
        });
        token
    }

    fn reviews_url(&self) -> String {
        format!(
            "{}/accounts/{}/locations/{}/reviews",
            self.api_base, self.config.account_id, self.config.location_id
        )
    }

    /// Every review for the location, following pagination.
    async fn list_reviews(&self) -> Result<Vec<Review>, SourceError> {
        let token = self.access_token().await?;
        let mut reviews = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.reviews_url())
                .bearer_auth(token.expose_secret())
                .query(&[("pageSize", "50")]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let resp = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    request_failed("API call timed out - the service may be slow or unavailable")
                } else {
                    request_failed(e.to_string())
                }
            })?;
            let page: ReviewPage = check_status(resp)
                .await?
                .json()
                .await
                .map_err(|e| request_failed(format!("invalid review page: {e}")))?;

            reviews.extend(page.reviews.into_iter().filter_map(GoogleReview::into_review));
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        info!(count = reviews.len(), "Fetched reviews from Google Business Profile");
        Ok(reviews)
    }
}

#[async_trait]
impl ReviewSource for GoogleBusinessClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_unanswered(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Review>, SourceError> {
        let all = self.list_reviews().await?;
        let total = all.len();
        let unanswered = filter_unanswered(all, since, Utc::now());
        debug!(
            total,
            unanswered = unanswered.len(),
            since = ?since,
            "Filtered Google reviews"
        );
        Ok(unanswered)
    }

    /// One paginated listing, split locally into the new and full sets.
    async fn fetch_new_and_all(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<(Vec<Review>, Vec<Review>), SourceError> {
        let now = Utc::now();
        let all = filter_unanswered(self.list_reviews().await?, None, now);
        let new = filter_unanswered(all.clone(), since, now);
        debug!(new = new.len(), all = all.len(), since = ?since, "Split Google reviews for run");
        Ok((new, all))
    }

    async fn submit_reply(&self, review_id: &str, text: &str) -> Result<(), SourceError> {
        let token = self.access_token().await?;
        let url = format!("{}/{}/reply", self.api_base, review_id.trim_start_matches('/'));
        let resp = self
            .client
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(&serde_json::json!({ "comment": text }))
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;
        check_status(resp).await?;
        info!(review_id, "Reply posted to Google Business Profile");
        Ok(())
    }
}

fn request_failed(reason: impl Into<String>) -> SourceError {
    SourceError::RequestFailed {
        provider: PROVIDER.into(),
        reason: reason.into(),
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status.as_u16() == 429 || body.to_lowercase().contains("quota") {
        warn!("Google API quota exceeded");
    }
    Err(SourceError::Status {
        provider: PROVIDER.into(),
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post, put};
    use axum::{Form, Json, Router};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    fn config() -> GoogleConfig {
        GoogleConfig {
            client_id: "client-123".into(),
            client_secret: SecretString::from("shh"),
            redirect_uri: "http://localhost:3000/auth/callback".into(),
            refresh_token: None,
            account_id: "acc".into(),
            location_id: "loc".into(),
        }
    }

    #[test]
    fn auth_url_requests_offline_consent() {
        let client = GoogleBusinessClient::new(config()).unwrap();
        let url = client.auth_url().unwrap();
        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("client_id=client-123"));
    }

    #[test]
    fn reviews_url_uses_account_and_location() {
        let client =
            GoogleBusinessClient::with_endpoints(config(), "http://fake/v4/", TOKEN_URL).unwrap();
        assert_eq!(
            client.reviews_url(),
            "http://fake/v4/accounts/acc/locations/loc/reviews"
        );
    }

    #[test]
    fn parses_review_page() {
        let json = r#"{
            "reviews": [
                {
                    "name": "accounts/acc/locations/loc/reviews/a",
                    "starRating": "FOUR",
                    "comment": "Nice",
                    "createTime": "2024-05-01T12:00:00Z",
                    "reviewer": {"displayName": "Lee Chan"}
                },
                {
                    "name": "accounts/acc/locations/loc/reviews/b",
                    "starRating": "STAR_RATING_UNSPECIFIED",
                    "createTime": "2024-05-01T12:00:00Z"
                },
                {
                    "name": "accounts/acc/locations/loc/reviews/c",
                    "starRating": "ONE",
                    "createTime": "2024-05-02T12:00:00Z",
                    "reviewReply": {"comment": "Sorry!"}
                }
            ],
            "nextPageToken": ""
        }"#;
        let page: ReviewPage = serde_json::from_str(json).unwrap();
        let reviews: Vec<Review> = page
            .reviews
            .into_iter()
            .filter_map(GoogleReview::into_review)
            .collect();

        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].reviewer_name, "Lee Chan");
        assert_eq!(reviews[0].star_rating.get(), 4);
        assert!(!reviews[0].has_existing_reply);
        assert_eq!(reviews[1].reviewer_name, "Anonymous");
        assert!(reviews[1].has_existing_reply);
    }

    #[tokio::test]
    async fn missing_refresh_token_is_auth_error() {
        let client = GoogleBusinessClient::new(config()).unwrap();
        let err = client.fetch_unanswered(None).await.unwrap_err();
        assert!(matches!(err, SourceError::AuthFailed { .. }));
    }

    #[test]
    fn config_disabled_without_client_id() {
        let config = GoogleConfig::from_lookup(|_| None).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn config_requires_account_and_location() {
        let vars = HashMap::from([
            ("GOOGLE_CLIENT_ID", "client-123"),
            ("GOOGLE_ACCOUNT_ID", "acc"),
        ]);
        let err = GoogleConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "LOCATION_ID"));

        let vars = HashMap::from([
            ("GOOGLE_CLIENT_ID", "client-123"),
            ("GOOGLE_ACCOUNT_ID", "acc"),
            ("LOCATION_ID", "loc"),
            ("GOOGLE_REFRESH_TOKEN", ""),
        ]);
        let config = GoogleConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(config.location_id, "loc");
        assert!(config.refresh_token.is_none());
    }

    // ── Local fake of the token endpoint and v4 API ─────────────────────

    const ACCESS_TOKEN: &str = "access-1";

    #[derive(Clone, Default)]
    struct FakeGoogle {
        token_requests: Arc<AtomicUsize>,
        list_requests: Arc<AtomicUsize>,
        replies: Arc<StdMutex<Vec<(String, Value)>>>,
    }

    fn review_json(id: &str, rating: &str, created: &str) -> Value {
        json!({
            "name": format!("accounts/acc/locations/loc/reviews/{id}"),
            "starRating": rating,
            "comment": format!("Review {id}"),
            "createTime": created,
            "reviewer": {"displayName": "Lee Chan"}
        })
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {ACCESS_TOKEN}"))
    }

    async fn token(
        State(fake): State<FakeGoogle>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Result<Json<Value>, StatusCode> {
        if form.get("grant_type").map(String::as_str) != Some("refresh_token")
            || form.get("refresh_token").map(String::as_str) != Some("refresh-1")
        {
            return Err(StatusCode::BAD_REQUEST);
        }
        fake.token_requests.fetch_add(1, Ordering::SeqCst);
        Ok(Json(json!({ "access_token": ACCESS_TOKEN, "expires_in": 3600 })))
    }

    async fn list(
        State(fake): State<FakeGoogle>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Result<Json<Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        fake.list_requests.fetch_add(1, Ordering::SeqCst);
        match query.get("pageToken").map(String::as_str) {
            None => Ok(Json(json!({
                "reviews": [review_json("a", "FIVE", "2024-05-01T12:00:00Z")],
                "nextPageToken": "page-2"
            }))),
            Some("page-2") => Ok(Json(json!({
                "reviews": [review_json("b", "TWO", "2024-05-03T12:00:00Z")]
            }))),
            Some(_) => Err(StatusCode::BAD_REQUEST),
        }
    }

    async fn reply(
        State(fake): State<FakeGoogle>,
        headers: HeaderMap,
        Path((_account, _location, review)): Path<(String, String, String)>,
        Json(body): Json<Value>,
    ) -> Result<Json<Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        fake.replies.lock().unwrap().push((review, body.clone()));
        Ok(Json(body))
    }

    async fn start_fake() -> (GoogleBusinessClient, FakeGoogle) {
        let fake = FakeGoogle::default();
        let app = Router::new()
            .route("/token", post(token))
            .route("/v4/accounts/{account}/locations/{location}/reviews", get(list))
            .route(
                "/v4/accounts/{account}/locations/{location}/reviews/{review}/reply",
                put(reply),
            )
            .with_state(fake.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = GoogleConfig {
            refresh_token: Some(SecretString::from("refresh-1")),
            ..config()
        };
        let client = GoogleBusinessClient::with_endpoints(
            config,
            &format!("http://{addr}/v4"),
            &format!("http://{addr}/token"),
        )
        .unwrap();
        (client, fake)
    }

    fn ids(reviews: &[Review]) -> Vec<&str> {
        reviews
            .iter()
            .map(|r| r.id.rsplit('/').next().unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn listing_follows_pages_and_reuses_token() {
        let (client, fake) = start_fake().await;

        let reviews = client.fetch_unanswered(None).await.unwrap();
        assert_eq!(ids(&reviews), vec!["a", "b"]);
        assert_eq!(reviews[1].star_rating.get(), 2);
        assert_eq!(fake.list_requests.load(Ordering::SeqCst), 2);

        client.fetch_unanswered(None).await.unwrap();
        assert_eq!(fake.token_requests.load(Ordering::SeqCst), 1);
        assert_eq!(fake.list_requests.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_refresh() {
        let (client, fake) = start_fake().await;
        let (first, second) =
            tokio::join!(client.fetch_unanswered(None), client.fetch_unanswered(None));
        assert_eq!(first.unwrap().len(), 2);
        assert_eq!(second.unwrap().len(), 2);
        assert_eq!(fake.token_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_batch_lists_once() {
        let (client, fake) = start_fake().await;
        let since = DateTime::parse_from_rfc3339("2024-05-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let (new, all) = client.fetch_new_and_all(Some(since)).await.unwrap();
        assert_eq!(ids(&new), vec!["b"]);
        assert_eq!(ids(&all), vec!["a", "b"]);
        // Two pages of a single listing.
        assert_eq!(fake.list_requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn submit_reply_puts_comment() {
        let (client, fake) = start_fake().await;
        client
            .submit_reply("accounts/acc/locations/loc/reviews/a", "Thanks Lee!")
            .await
            .unwrap();

        assert_eq!(
            *fake.replies.lock().unwrap(),
            vec![("a".to_string(), json!({ "comment": "Thanks Lee!" }))]
        );
    }

    #[tokio::test]
    async fn reply_to_missing_resource_reports_status() {
        let (client, _fake) = start_fake().await;
        let err = client
            .submit_reply("accounts/acc/elsewhere", "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }
}
