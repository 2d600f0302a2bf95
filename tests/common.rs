use std::sync::Arc;

use httptest::{matchers::request, responders::json_encoded, Expectation, Server};
use serde_json::json;
use statsig_server::{Client, StatsigOptions};

pub fn expect_fetch_config_specs(server: &Server) {
    server.expect(
        Expectation::matching(request::method_path("POST", "/download_config_specs"))
            .times(..)
            .respond_with(json_encoded(json!({
                "has_updates": true,
                "time": 1,
                "dynamic_configs": [
                    {
                      "name": "test_dynamic_config",
                      "type": "dynamic_config",
                      "salt": "salt",
                      "enabled": true,
                      "defaultValue": {
                        "value": "DEFAULT"
                      },
                      "rules": [
                        {
                          "name": "test_reject_email_name",
                          "id": "id_reject_email",
                          "passPercentage": 0,
                          "conditions": [
                            {
                              "type": "user_field",
                              "targetValue": [
                                "test@example.com"
                              ],
                              "operator": "any",
                              "field": "email",
                              "additionalValues": {}
                            }
                          ],
                          "returnValue": {
                            "value": "EMAIL"
                          }
                        },
                        {
                          "name": "test_1239_name",
                          "id": "id_1239_name",
                          "passPercentage": 100,
                          "conditions": [
                            {
                              "type": "user_field",
                              "targetValue": [
                                "1239"
                              ],
                              "operator": "any",
                              "field": "userID",
                              "additionalValues": {}
                            },
                            {
                              "type": "user_field",
                              "targetValue": [
                                "secretid"
                              ],
                              "operator": "any",
                              "field": "secondaryId",
                              "additionalValues": {}
                            }
                          ],
                          "returnValue": {
                            "value": "1239"
                          }
                        },
                      ],
                    }
                ],
                "feature_gates": [
                    {
                        "name": "test_gate",
                        "type": "feature_gate",
                        "salt": "salt",
                        "enabled": true,
                        "defaultValue": false,
                        "rules": [{
                            "name": "public",
                            "id": "public1",
                            "passPercentage": 100,
                            "returnValue": true,
                            "conditions": [{
                                "type": "public",
                            }],
                        }],
                    },
                    {
                        "name": "unsupported_gate",
                        "type": "feature_gate",
                        "salt": "salt",
                        "enabled": true,
                        "defaultValue": false,
                        "rules": [{
                            "name": "future",
                            "id": "future1",
                            "passPercentage": 100,
                            "returnValue": true,
                            "conditions": [{
                                "type": "unsupported_future_kind",
                            }],
                        }],
                    }
                ],
            }))),
    );
}

pub fn expect_log_emission(server: &Server) {
    server.expect(
        Expectation::matching(request::method_path("POST", "/log_event"))
            .times(..)
            .respond_with(json_encoded(json!({}))),
    );
}

pub async fn create_client(server: &Server) -> Arc<Client> {
    Client::new(
        "secret-api_key".to_string(),
        StatsigOptions {
            api_url: Some(format!("http://{}", server.addr())),
            ..Default::default()
        },
    )
    .await
    .expect("should be able to create statsig client")
}
