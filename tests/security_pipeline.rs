//! End-to-end tests for the enforcement pipeline over real HTTP.

use perimeter::audit::log::Severity;
use perimeter::config::schema::EndpointLimit;
use perimeter::config::SecurityConfig;
use perimeter::security::waf::{PatternKind, RuleAction, WafRule};

mod common;

fn rule(id: &str, pattern: &str, action: RuleAction) -> WafRule {
    WafRule {
        id: id.to_string(),
        pattern: pattern.to_string(),
        pattern_kind: PatternKind::Substring,
        severity: Severity::High,
        action,
        active: true,
    }
}

#[tokio::test]
async fn test_clean_traffic_passes() {
    let harness = common::start_server(SecurityConfig::default()).await;
    let client = common::client();

    let res = client
        .post(harness.url("/api/echo"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "hello");

    harness.shutdown.trigger();
}

#[tokio::test]
async fn test_injection_blocked_and_source_blocklisted() {
    let mut config = SecurityConfig::default();
    config.waf.rules.push(rule("sqli-1", "' or 1=1", RuleAction::Block));
    let harness = common::start_server(config).await;
    let client = common::client();

    let res = client
        .post(harness.url("/api/echo"))
        .body("name=' OR 1=1 --")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    // The source address is now blocklisted; clean requests are denied
    // without touching the rules.
    let res = client
        .post(harness.url("/api/echo"))
        .body("clean")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "blocked");

    harness.shutdown.trigger();
}

#[tokio::test]
async fn test_forged_forwarding_header_does_not_evade_blocklist() {
    let mut config = SecurityConfig::default();
    config.waf.rules.push(rule("sqli-1", "' or 1=1", RuleAction::Block));
    let harness = common::start_server(config).await;
    let client = common::client();

    let res = client
        .post(harness.url("/api/echo"))
        .header("x-forwarded-for", "1.1.1.1")
        .body("name=' OR 1=1 --")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    // The socket peer was blocklisted, not the forged address, so
    // rotating the header does not shed the block.
    let res = client
        .post(harness.url("/api/echo"))
        .header("x-forwarded-for", "2.2.2.2")
        .body("clean")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let entries = harness.ctx.filter.blocklist().entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].address, "127.0.0.1");

    harness.shutdown.trigger();
}

#[tokio::test]
async fn test_trusted_proxy_forwarded_address_is_enforced() {
    let mut config = SecurityConfig::default();
    config.listener.trusted_proxies = vec!["127.0.0.1".to_string()];
    config.waf.rules.push(rule("sqli-1", "' or 1=1", RuleAction::Block));
    let harness = common::start_server(config).await;
    let client = common::client();

    let res = client
        .post(harness.url("/api/echo"))
        .header("x-forwarded-for", "203.0.113.50")
        .body("name=' OR 1=1 --")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let entries = harness.ctx.filter.blocklist().entries().unwrap();
    assert_eq!(entries[0].address, "203.0.113.50");

    // The proxy itself is not blocked; traffic it forwards for other
    // clients still passes.
    let res = client
        .post(harness.url("/api/echo"))
        .header("x-forwarded-for", "203.0.113.51")
        .body("clean")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // The forwarded client stays blocked.
    let res = client
        .post(harness.url("/api/echo"))
        .header("x-forwarded-for", "203.0.113.50")
        .body("clean")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    harness.shutdown.trigger();
}

#[tokio::test]
async fn test_oversized_body_rejected_without_penalty() {
    let harness = common::start_server(SecurityConfig::default()).await;
    let client = common::client();

    let res = client
        .post(harness.url("/api/echo"))
        .body("a".repeat(2 * 1024 * 1024))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);

    // The source is not blocklisted; normal traffic still passes.
    assert!(harness.ctx.filter.blocklist().entries().unwrap().is_empty());
    let res = client
        .post(harness.url("/api/echo"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    harness.shutdown.trigger();
}

#[tokio::test]
async fn test_redirect_rule() {
    let mut config = SecurityConfig::default();
    config.waf.redirect_location = "/trapped".to_string();
    config.waf.rules.push(rule("scanner-1", "wp-admin", RuleAction::Redirect));
    let harness = common::start_server(config).await;
    let client = common::client();

    let res = client
        .post(harness.url("/api/echo"))
        .body("GET /wp-admin/setup.php")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 307);
    assert_eq!(res.headers()["location"], "/trapped");

    harness.shutdown.trigger();
}

#[tokio::test]
async fn test_endpoint_rate_limit_returns_429() {
    let mut config = SecurityConfig::default();
    config.rate_limit.endpoints.push(EndpointLimit {
        endpoint: "/api/echo".to_string(),
        max_requests: 3,
        window_secs: 60,
    });
    let harness = common::start_server(config).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client
            .post(harness.url("/api/echo"))
            .body("x")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }

    let res = client
        .post(harness.url("/api/echo"))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 429);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "rate_limited");

    harness.shutdown.trigger();
}

#[tokio::test]
async fn test_identity_attached_for_valid_token() {
    let harness = common::start_server(SecurityConfig::default()).await;
    let client = common::client();
    let token = harness.login("user-1");

    let res = client
        .get(harness.url("/api/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["id"], "user-1");
    assert_eq!(body["role"], "user");

    // A bad token does not fail the request, it just stays anonymous.
    let res = client
        .get(harness.url("/api/whoami"))
        .bearer_auth("bogus")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["id"].is_null());

    harness.shutdown.trigger();
}

#[tokio::test]
async fn test_revoked_session_goes_anonymous() {
    let harness = common::start_server(SecurityConfig::default()).await;
    let client = common::client();
    let token = harness.login("user-1");

    harness.ctx.sessions.revoke(&token).unwrap();

    let res = client
        .get(harness.url("/api/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["id"].is_null());

    harness.shutdown.trigger();
}

#[tokio::test]
async fn test_config_reload_applies_new_rules() {
    let harness = common::start_server(SecurityConfig::default()).await;
    let client = common::client();

    let res = client
        .post(harness.url("/api/echo"))
        .body("union select *")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let mut config = SecurityConfig::default();
    config.waf.rules.push(rule("sqli-2", "union select", RuleAction::Block));
    harness.ctx.apply_config(config);

    let res = client
        .post(harness.url("/api/echo"))
        .body("union select *")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    harness.shutdown.trigger();
}
