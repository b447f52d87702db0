use std::env;

use dotenvy::dotenv;
use kotoba_session::engine::ConversationEngine;
use kotoba_session::{ProviderConfig, ProviderKind};

fn has_env(key: &str) -> bool {
    env::var(key).is_ok_and(|value| !value.trim().is_empty())
}

#[tokio::test]
#[ignore = "requires live provider credentials"]
async fn every_configured_provider_answers_a_history_turn() {
    let _ = dotenv();

    for provider in [ProviderKind::OpenAi, ProviderKind::Claude, ProviderKind::Gemini] {
        if !has_env(provider.api_key_env()) {
            eprintln!("skip {provider}: {} missing", provider.api_key_env());
            continue;
        }
        let mut engine = ConversationEngine::builder(ProviderConfig::new(provider))
            .system_prompt("You are a helpful assistant.")
            .build()
            .expect("engine");

        let reply = engine
            .chat_with_history("Please introduce Rust language in one sentence.", None)
            .await
            .expect("live reply");
        assert!(!reply.text.trim().is_empty(), "{provider} returned empty text");
        assert_eq!(engine.history().len(), 3);
    }
}
