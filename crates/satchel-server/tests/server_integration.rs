//! Server integration tests.
//!
//! These tests verify the server starts correctly and handles requests.

mod common;

use anyhow::Result;

#[tokio::test]
async fn test_server_starts_and_responds_to_health() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.client.get(server.url("/health")).send().await?;
    assert!(resp.status().is_success());
    assert!(
        common::session_set_cookie(&resp).is_none(),
        "health checks must not mint sessions"
    );

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["status"], "ok");
    assert!(body.get("version").is_some());

    Ok(())
}

#[tokio::test]
async fn test_multiple_servers_different_ports() -> Result<()> {
    let server1 = common::TestServer::start().await?;
    let server2 = common::TestServer::start().await?;

    assert_ne!(
        server1.addr, server2.addr,
        "Servers should be on different ports"
    );

    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_404() -> Result<()> {
    let server = common::TestServer::start().await?;

    let resp = server.client.get(server.url("/nope")).send().await?;
    assert_eq!(resp.status().as_u16(), 404);

    Ok(())
}
