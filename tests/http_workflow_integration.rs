//! Integration tests for the HTTP surface and the SMS command loop.
//!
//! Each test spins up an Axum server on a random port backed by the mock
//! review source and a recording notifier, then drives it with reqwest.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

use review_outreach::channels::{MessageId, Notifier};
use review_outreach::drafting::{StatsSummarizer, TemplateDrafter};
use review_outreach::error::ChannelError;
use review_outreach::reviews::MockReviewSource;
use review_outreach::routes::app_routes;
use review_outreach::store::MemoryCheckpointStore;
use review_outreach::workflow::{WorkflowDeps, WorkflowEngine};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const OPERATOR: &str = "+15550100";

/// Records every outbound SMS instead of sending it.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn last(&self) -> String {
        self.sent().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, text: &str) -> Result<MessageId, ChannelError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(text.to_string());
        Ok(MessageId(format!("SM{:04}", sent.len())))
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    source: Arc<MockReviewSource>,
    notifier: Arc<RecordingNotifier>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn sms(&self, from: &str, body: &str) -> reqwest::StatusCode {
        self.client
            .post(self.url("/sms/webhook"))
            .form(&[("Body", body), ("From", from)])
            .send()
            .await
            .unwrap()
            .status()
    }

    async fn json(&self, method: reqwest::Method, path: &str) -> (reqwest::StatusCode, Value) {
        let resp = self
            .client
            .request(method, self.url(path))
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

/// Start an Axum server on a random port.
async fn start_server() -> TestServer {
    let source = Arc::new(MockReviewSource::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let engine = WorkflowEngine::new(WorkflowDeps {
        source: source.clone(),
        summarizer: Arc::new(StatsSummarizer::new()),
        drafter: Arc::new(TemplateDrafter::new()),
        notifier: notifier.clone(),
        checkpoints: Arc::new(MemoryCheckpointStore::new()),
    })
    .with_allowed_senders(vec![OPERATOR.to_string()]);

    let app = app_routes(Arc::new(engine), None);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        client: reqwest::Client::new(),
        source,
        notifier,
    }
}

/// Pull the confirmation code out of a "YES<code> to send" line.
fn code_from(message: &str) -> String {
    let start = message.find("YES").expect("confirmation message") + 3;
    message[start..start + 6].to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let (status, body) = server.json(reqwest::Method::GET, "/health").await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn daily_run_then_reply_and_confirm_over_sms() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, body) = server.json(reqwest::Method::POST, "/daily-workflow").await;
        assert_eq!(status, 200);
        assert_eq!(body["status"]["phase"], "run_in_progress");
        assert_eq!(body["status"]["totalReviews"], 3);

        let sent = server.notifier.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].starts_with("📊 Google Reviews Summary:"));
        assert!(sent[1].starts_with("📝 Found 3 review(s) that need replies"));
        assert!(sent[2].starts_with("📝 Daily Review 1/3"));
        assert!(sent[2].contains("John D."));

        assert_eq!(server.sms(OPERATOR, "reply2").await, 200);
        let confirmation = server.notifier.last();
        assert!(confirmation.starts_with("🤖 Review Reply Request #"));
        assert!(confirmation.contains("Customer: Sarah M."));
        let code = code_from(&confirmation);

        assert_eq!(server.sms(OPERATOR, &format!("yes{}", code.to_lowercase())).await, 200);
        assert_eq!(
            server.notifier.last(),
            format!("✅ Reply submitted successfully for confirmation #{code}")
        );

        let submitted = server.source.submitted().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, "accounts/123/locations/456/reviews/review2");
        assert!(submitted[0].1.starts_with("Hi Sarah, "));

        // REPLY/YES leave the queue where it was.
        let (_, status) = server.json(reqwest::Method::GET, "/workflow/status").await;
        assert_eq!(status["nextReview"], 1);
        assert_eq!(status["pendingConfirmations"], 0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn skipping_through_the_queue_completes_the_run() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.json(reqwest::Method::POST, "/daily-workflow").await;

        server.sms(OPERATOR, "SKIP1").await;
        assert!(server.notifier.last().starts_with("📝 Daily Review 2/3"));
        server.sms(OPERATOR, "SKIP3").await;
        assert_eq!(
            server.notifier.last(),
            "✅ Daily review workflow complete! All reviews processed."
        );

        server.sms(OPERATOR, "SKIP9").await;
        assert_eq!(server.notifier.last(), "❌ Invalid review number: 9");

        let (_, status) = server.json(reqwest::Method::GET, "/workflow/status").await;
        assert_eq!(status["phase"], "run_complete");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_sender_and_garbage_are_ignored() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.json(reqwest::Method::POST, "/daily-workflow").await;
        let before = server.notifier.sent().len();

        assert_eq!(server.sms("+15559999", "SKIP1").await, 200);
        assert_eq!(server.sms(OPERATOR, "banana").await, 200);
        assert_eq!(server.notifier.sent().len(), before);

        let (_, status) = server.json(reqwest::Method::GET, "/workflow/status").await;
        assert_eq!(status["nextReview"], 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn cancel_and_unknown_codes() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.json(reqwest::Method::POST, "/daily-workflow").await;

        server.sms(OPERATOR, "REPLY1").await;
        let code = code_from(&server.notifier.last());

        server.sms(OPERATOR, &format!("NO{code}")).await;
        assert_eq!(
            server.notifier.last(),
            format!("❌ Reply cancelled for confirmation #{code}")
        );

        server.sms(OPERATOR, &format!("YES{code}")).await;
        assert_eq!(
            server.notifier.last(),
            format!("❌ Confirmation #{code} not found or expired")
        );
        assert!(server.source.submitted().await.is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn review_endpoints() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, reviews) = server.json(reqwest::Method::GET, "/reviews").await;
        assert_eq!(status, 200);
        let reviews = reviews.as_array().unwrap();
        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews[0]["reviewerName"], "John D.");
        assert_eq!(reviews[0]["starRating"], 5);

        let (status, body) = server.json(reqwest::Method::POST, "/reviews/summarize").await;
        assert_eq!(status, 200);
        assert!(
            body["summary"]
                .as_str()
                .unwrap()
                .contains("Total reviews analyzed: 3")
        );
        assert!(server.notifier.sent().is_empty());

        let (status, _) = server
            .json(reqwest::Method::POST, "/reviews/summarize-and-send")
            .await;
        assert_eq!(status, 200);
        assert_eq!(server.notifier.sent().len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn generate_reply_endpoint_issues_a_resolvable_code() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (status, body) = server
            .json(reqwest::Method::POST, "/reviews/review3/generate-reply")
            .await;
        assert_eq!(status, 200);
        let code = body["confirmationId"].as_str().unwrap().to_string();
        assert_eq!(code.len(), 6);
        assert!(body["suggestedReply"].as_str().unwrap().starts_with("Hi Mike, "));
        assert!(server.notifier.last().contains(&format!("YES{code} to send")));

        server.sms(OPERATOR, &format!("YES{code}")).await;
        let submitted = server.source.submitted().await;
        assert_eq!(submitted[0].0, "accounts/123/locations/456/reviews/review3");

        let (status, body) = server
            .json(reqwest::Method::POST, "/reviews/nope/generate-reply")
            .await;
        assert_eq!(status, 404);
        assert!(body["error"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn direct_reply_and_custom_sms() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let resp = server
            .client
            .post(server.url(
                "/reviews/accounts%2F123%2Flocations%2F456%2Freviews%2Freview1/reply",
            ))
            .json(&serde_json::json!({ "message": "Thanks John!" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            server.source.submitted().await,
            vec![(
                "accounts/123/locations/456/reviews/review1".to_string(),
                "Thanks John!".to_string()
            )]
        );

        let resp = server
            .client
            .post(server.url("/sms/send"))
            .json(&serde_json::json!({ "message": "Heads up" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["messageId"], "SM0001");
        assert_eq!(server.notifier.sent(), vec!["Heads up".to_string()]);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn direct_reply_accepts_short_ids() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let resp = server
            .client
            .post(server.url("/reviews/review2/reply"))
            .json(&serde_json::json!({ "message": "Thanks Sarah!" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(
            server.source.submitted().await[0].0,
            "accounts/123/locations/456/reviews/review2"
        );

        let resp = server
            .client
            .post(server.url("/reviews/nope/reply"))
            .json(&serde_json::json!({ "message": "Hi" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        assert_eq!(server.source.submitted().await.len(), 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn oauth_routes_need_google() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let (status, _) = server.json(reqwest::Method::GET, "/auth").await;
        assert_eq!(status, 404);
        let (status, _) = server
            .json(reqwest::Method::GET, "/auth/callback?code=abc")
            .await;
        assert_eq!(status, 404);
    })
    .await
    .expect("test timed out");
}
