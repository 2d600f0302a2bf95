use std::time::Duration;

use statsig_server::{Client, StatsigOptions, StatsigUser};

#[tokio::main]
async fn main() {
    let api_key = std::env::var("STATSIG_API_KEY").expect("STATSIG_API_KEY must be set");
    let client = Client::new(
        api_key,
        StatsigOptions {
            config_sync_interval: Some(Duration::from_secs(5)),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let user = StatsigUser::new("1238".to_string(), "production".to_string());
    println!(
        "{:?}",
        client
            .check_gate("test_feature_gate_new".to_string(), user)
            .await
    );

    let user = StatsigUser::new("1239".to_string(), "production".to_string());
    println!(
        "{:?}",
        client
            .get_config("test_dynamic_config".to_string(), user)
            .await
    );

    tokio::time::sleep(Duration::from_secs(20)).await;

    let user = StatsigUser::new("1238".to_string(), "production".to_string());
    println!(
        "{:?}",
        client
            .check_gate("test_feature_gate_new".to_string(), user)
            .await
    );

    client.shutdown().await;
}
