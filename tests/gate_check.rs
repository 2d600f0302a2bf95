use anyhow::Result;
use httptest::{
    matchers::request,
    responders::{json_encoded, status_code},
    Expectation, Server,
};
use serde_json::json;

use statsig_server::StatsigUser;

use common::{create_client, expect_fetch_config_specs, expect_log_emission};

pub mod common;

#[tokio::test]
async fn test_check_gate_local() -> Result<()> {
    let http_server = Server::run();
    expect_fetch_config_specs(&http_server);
    expect_log_emission(&http_server);
    let client = create_client(&http_server).await;

    let user = StatsigUser::new("1238".to_string(), "production".to_string());
    assert!(client.check_gate("test_gate".to_string(), user).await);

    // unknown gates are off
    let user = StatsigUser::new("1238".to_string(), "production".to_string());
    assert!(!client.check_gate("no_such_gate".to_string(), user).await);

    // a user without an id never passes
    let user = StatsigUser::new("".to_string(), "production".to_string());
    assert!(!client.check_gate("test_gate".to_string(), user).await);

    Ok(())
}

#[tokio::test]
async fn test_check_gate_falls_back_to_server() -> Result<()> {
    let http_server = Server::run();
    expect_fetch_config_specs(&http_server);
    expect_log_emission(&http_server);
    http_server.expect(
        Expectation::matching(request::method_path("POST", "/check_gate"))
            .times(1)
            .respond_with(json_encoded(json!({
                "name": "unsupported_gate",
                "value": true,
                "rule_id": "srv",
            }))),
    );
    let client = create_client(&http_server).await;

    // the condition kind is unknown locally, so the check goes to the API
    let user = StatsigUser::new("1238".to_string(), "production".to_string());
    assert!(client.check_gate("unsupported_gate".to_string(), user).await);

    Ok(())
}

#[tokio::test]
async fn test_check_gate_fallback_failure_defaults_off() -> Result<()> {
    let http_server = Server::run();
    expect_fetch_config_specs(&http_server);
    expect_log_emission(&http_server);
    http_server.expect(
        Expectation::matching(request::method_path("POST", "/check_gate"))
            .times(1..)
            .respond_with(status_code(500)),
    );
    let client = create_client(&http_server).await;

    let user = StatsigUser::new("1238".to_string(), "production".to_string());
    assert!(!client.check_gate("unsupported_gate".to_string(), user).await);

    Ok(())
}

#[tokio::test]
async fn test_shutdown_flushes_exposures() -> Result<()> {
    let http_server = Server::run();
    expect_fetch_config_specs(&http_server);
    http_server.expect(
        Expectation::matching(request::method_path("POST", "/log_event"))
            .times(1)
            .respond_with(status_code(202)),
    );
    let client = create_client(&http_server).await;

    let user = StatsigUser::new("1238".to_string(), "production".to_string());
    assert!(client.check_gate("test_gate".to_string(), user).await);

    // the buffered exposure goes out with the shutdown flush
    client.shutdown().await;

    Ok(())
}
