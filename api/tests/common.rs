use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use reqwest::RequestBuilder;

use hackvote_api::Server;
use hackvote_db::events::NewEvent;
use hackvote_db::object_id::{AwardId, EventId, UserId};
use hackvote_db::DurableStore;

pub const USER_HEADER: &str = "x-hackvote-user";
pub const ADMIN_HEADER: &str = "x-hackvote-admin";

/// A client bound to the server's base url and one user identity.
#[derive(Clone)]
pub struct TestClient {
    pub base: String,
    pub client: reqwest::Client,
    pub user_id: UserId,
    pub is_admin: bool,
}

impl TestClient {
    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, format!("{}/{}", self.base, path))
            .header(USER_HEADER, self.user_id.to_string());
        if self.is_admin {
            req = req.header(ADMIN_HEADER, "true");
        }
        req
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::GET, path)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::POST, path)
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.request(reqwest::Method::DELETE, path)
    }

    /// A request carrying no identity headers at all.
    pub fn anonymous(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base, path))
    }

    pub fn as_user(&self, user_id: UserId) -> TestClient {
        TestClient {
            user_id,
            is_admin: false,
            ..self.clone()
        }
    }

    pub fn as_admin(&self) -> TestClient {
        TestClient {
            is_admin: true,
            ..self.clone()
        }
    }
}

pub struct TestApp {
    /// Direct handle on the system of record for seeding and assertions.
    pub store: Arc<DurableStore>,
    /// A regular user's client.
    pub client: TestClient,
    /// An admin client with a distinct user id.
    pub admin: TestClient,
    pub base_url: String,
}

async fn start_app() -> Result<TestApp> {
    let config = hackvote_api::config::Config {
        host: "127.0.0.1".to_string(),
        port: 0, // Bind to random port
        env: "test".to_string(),
        feed_poll_timeout_ms: 2_000,
    };
    Lazy::force(&hackvote_test::TRACING);

    let store = Arc::new(DurableStore::new());
    let Server {
        server, host, port, ..
    } = hackvote_api::run_server_with_store(config, store.clone()).await?;

    tokio::task::spawn(server);

    let base_url = format!("http://{}:{}", host, port);
    let client = TestClient {
        base: base_url.clone(),
        client: reqwest::ClientBuilder::new()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Building client"),
        user_id: UserId::new(),
        is_admin: false,
    };
    let admin = TestClient {
        user_id: UserId::new(),
        is_admin: true,
        ..client.clone()
    };

    Ok(TestApp {
        store,
        client,
        admin,
        base_url,
    })
}

pub async fn run_app_test<F, R>(f: F)
where
    F: FnOnce(TestApp) -> R,
    R: Future<Output = Result<(), anyhow::Error>>,
{
    let app = start_app().await.expect("Starting app");
    f(app).await.unwrap();
}

impl TestApp {
    /// Seed a hackathon event directly through the store.
    pub fn seed_event(&self, slug: &str) -> EventId {
        let (event, _) = self
            .store
            .insert_event(NewEvent {
                name: format!("Event {slug}"),
                slug: slug.to_string(),
                start_time: chrono::Utc::now(),
                end_time: chrono::Utc::now() + chrono::Duration::days(2),
                is_hackathon: true,
            })
            .expect("Seeding event");
        event.event_id
    }

    pub fn seed_plain_event(&self, slug: &str) -> EventId {
        let (event, _) = self
            .store
            .insert_event(NewEvent {
                name: format!("Event {slug}"),
                slug: slug.to_string(),
                start_time: chrono::Utc::now(),
                end_time: chrono::Utc::now() + chrono::Duration::days(2),
                is_hackathon: false,
            })
            .expect("Seeding event");
        event.event_id
    }

    pub fn seed_award(&self, event_id: EventId, name: &str) -> AwardId {
        let (award, _) = self
            .store
            .create_award(
                event_id,
                hackvote_db::awards::NewAward {
                    name: name.to_string(),
                },
            )
            .expect("Seeding award");
        award.award_id
    }
}

/// Assert the gateway's error shape: the expected status and the `kind`
/// string inside the `{error: {kind, message}}` body.
pub async fn assert_error(response: reqwest::Response, status: u16, kind: &str) {
    assert_eq!(
        response.status().as_u16(),
        status,
        "response status code should be {status}"
    );
    let body: serde_json::Value = response.json().await.expect("Parsing error body");
    assert_eq!(body["error"]["kind"], kind, "error kind, body {body}");
}
