//! Shared harness for integration tests: a real server on an ephemeral
//! port in front of a small echo application.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use tokio::net::TcpListener;

use perimeter::authz::{Identity, Role};
use perimeter::config::SecurityConfig;
use perimeter::lifecycle::Shutdown;
use perimeter::store::memory::{MemoryDirectory, MemoryStore};
use perimeter::{SecurityContext, SecurityServer};

pub struct Harness {
    pub addr: SocketAddr,
    pub ctx: Arc<SecurityContext>,
    pub directory: Arc<MemoryDirectory>,
    pub shutdown: Shutdown,
}

impl Harness {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Session token for one of the seeded identities.
    pub fn login(&self, identity_id: &str) -> String {
        let config = self.ctx.config.load();
        self.ctx
            .sessions
            .create(identity_id, "127.0.0.1", "test-client", &config.session)
            .expect("session create")
    }
}

/// Start a server over a fresh in-memory store. Seeds one identity per
/// role, ids `user-1`, `moderator-1`, `editor-1`, `admin-1`.
pub async fn start_server(config: SecurityConfig) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    for (id, role) in [
        ("user-1", Role::User),
        ("moderator-1", Role::Moderator),
        ("editor-1", Role::Editor),
        ("admin-1", Role::Admin),
    ] {
        directory.add_identity(Identity {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            role,
            active: true,
        });
    }

    let ctx = SecurityContext::new(config, store, directory.clone(), directory.clone());

    let app = Router::new()
        .route("/api/echo", post(echo))
        .route("/api/whoami", get(whoami));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = SecurityServer::new(ctx.clone(), app);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    wait_until_healthy(addr).await;

    Harness {
        addr,
        ctx,
        directory,
        shutdown,
    }
}

/// Client that neither pools nor follows redirects, so tests observe
/// raw statuses.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

async fn wait_until_healthy(addr: SocketAddr) {
    let client = client();
    for _ in 0..50 {
        if client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .is_ok()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {} never became healthy", addr);
}

async fn echo(body: String) -> String {
    body
}

async fn whoami(identity: Option<Extension<Identity>>) -> Json<serde_json::Value> {
    match identity {
        Some(Extension(identity)) => Json(serde_json::json!({
            "id": identity.id,
            "role": identity.role,
        })),
        None => Json(serde_json::json!({ "id": null })),
    }
}
