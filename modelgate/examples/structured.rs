//! Structured output with a schema derived from a Rust type.
//!
//! ```text
//! OPENAI_API_KEY=sk-... cargo run --example structured --features schema
//! ```

use modelgate::prelude::*;
use modelgate::schemars::JsonSchema;
use modelgate::MemorySink;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, JsonSchema)]
struct ProductAnalysis {
    /// Name of the product
    product_name: String,
    /// Overall rating out of 5
    rating: f32,
    /// List of advantages
    pros: Vec<String>,
    /// List of disadvantages
    cons: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let sink = Arc::new(MemorySink::new());
    let service = ModelService::builder()
        .sink(sink.clone())
        .model("openai", Arc::new(OpenAiProvider::from_env()?))
        .build()?;

    let analysis: ProductAnalysis = service
        .get_object_as(
            "Analyze the MacBook Pro M3 and provide a rating out of 5, list of pros and cons.",
            Some(RequestConfig::new().with_temperature(0.2).with_max_tokens(400)),
        )
        .await?;

    println!("Product: {}", analysis.product_name);
    println!("Rating: {}/5", analysis.rating);
    for pro in &analysis.pros {
        println!("  + {}", pro);
    }
    for con in &analysis.cons {
        println!("  - {}", con);
    }

    println!("\nLifecycle events:");
    for event in sink.events() {
        println!("{}", serde_json::to_string(&event)?);
    }

    Ok(())
}
