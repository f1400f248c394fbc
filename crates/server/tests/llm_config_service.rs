mod common;

use common::{fixture, seed_default_config};
use tutorium_core::domain::DomainError;
use tutorium_server::service::{LlmConfigUpdate, NewLlmConfig, ServiceError};

fn config(name: &str, is_default: bool) -> NewLlmConfig {
    NewLlmConfig {
        name: name.to_string(),
        model_name: "gpt-4o-mini".to_string(),
        api_key: "sk-test".to_string(),
        base_prompt: "You are a patient AI tutor.".to_string(),
        temperature: 0.7,
        max_tokens: 1000,
        is_default,
        is_active: true,
    }
}

#[tokio::test]
async fn at_most_one_default_config_survives_creation() {
    let fx = fixture().await;

    let first = fx
        .llm_configs
        .create_config(config("first", true))
        .await
        .expect("first config should be created");
    let second = fx
        .llm_configs
        .create_config(config("second", true))
        .await
        .expect("second config should be created");

    let configs = fx
        .llm_configs
        .list_configs()
        .await
        .expect("listing should succeed");
    let defaults: Vec<_> = configs.iter().filter(|c| c.is_default).collect();

    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second);

    let resolved = fx
        .llm_configs
        .get_default_config()
        .await
        .expect("lookup should succeed")
        .expect("a default should exist");
    assert_eq!(resolved.id, second);
    assert_ne!(resolved.id, first);
}

#[tokio::test]
async fn promoting_a_config_demotes_the_previous_default() {
    let fx = fixture().await;

    let first = fx
        .llm_configs
        .create_config(config("first", true))
        .await
        .expect("first config should be created");
    let second = fx
        .llm_configs
        .create_config(config("second", false))
        .await
        .expect("second config should be created");

    let updated = fx
        .llm_configs
        .update_config(
            second,
            LlmConfigUpdate {
                is_default: Some(true),
                ..LlmConfigUpdate::default()
            },
        )
        .await
        .expect("update should succeed");
    assert!(updated);

    let configs = fx
        .llm_configs
        .list_configs()
        .await
        .expect("listing should succeed");
    for c in &configs {
        assert_eq!(c.is_default, c.id == second, "only the promoted config may be default");
    }
    assert!(configs.iter().any(|c| c.id == first && !c.is_default));
}

#[tokio::test]
async fn out_of_range_temperature_is_rejected() {
    let fx = fixture().await;

    let mut bad = config("bad", false);
    bad.temperature = 2.5;

    let err = fx
        .llm_configs
        .create_config(bad)
        .await
        .expect_err("temperature 2.5 should be rejected");

    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::InvalidTemperature(_))
    ));
}

#[tokio::test]
async fn inactive_default_is_not_resolved() {
    let fx = fixture().await;
    seed_default_config(&fx).await;

    let default = fx
        .llm_configs
        .get_default_config()
        .await
        .expect("lookup should succeed")
        .expect("default should exist");

    fx.llm_configs
        .update_config(
            default.id,
            LlmConfigUpdate {
                is_active: Some(false),
                ..LlmConfigUpdate::default()
            },
        )
        .await
        .expect("update should succeed");

    let resolved = fx
        .llm_configs
        .get_default_config()
        .await
        .expect("lookup should succeed");
    assert!(resolved.is_none());
}
