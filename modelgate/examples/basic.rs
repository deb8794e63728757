//! Basic usage: register several backends and route requests between them.
//!
//! Run with `OPENAI_API_KEY` set and, optionally, a local Ollama server:
//!
//! ```text
//! OLLAMA_URL=http://localhost:11434 cargo run --example basic
//! ```

use modelgate::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let service = ModelService::builder()
        .sink(Arc::new(TracingSink::new()))
        .model("openai", Arc::new(OpenAiProvider::from_env()?))
        .build()?;

    if let Ok(url) = std::env::var("OLLAMA_URL") {
        service.register_model("local", Arc::new(ollama(url, "llama3")?))?;
    }

    service.init_all().await?;
    println!("Registered models: {:?}", service.model_ids());

    // Example 1: default model
    println!("\n=== Example 1: Default model ===\n");
    match service.get_text("What is Rust? Answer in one sentence.", None).await {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: {}", e),
    }

    // Example 2: conversation against a named model with config
    println!("\n=== Example 2: Messages with config ===\n");
    let target = if service.model_ids().iter().any(|id| id == "local") {
        "local"
    } else {
        "openai"
    };
    let request = GenerationRequest::messages(vec![
        ChatMessage::user("Name a systems language."),
        ChatMessage::assistant("Rust."),
        ChatMessage::user("Why is it memory safe?"),
    ])
    .with_config(
        RequestConfig::new()
            .with_temperature(0.2)
            .with_max_tokens(120)
            .with_stop_sequences(["\n\n"]),
    );

    match service.execute_text(Some(target), request).await {
        Ok(text) => println!("[{}] {}", target, text),
        Err(ModelError::UnknownModel(id)) => eprintln!("No such model: {}", id),
        Err(e) => eprintln!("Error: {}", e),
    }

    println!("\n=== All Examples Completed ===");
    Ok(())
}
