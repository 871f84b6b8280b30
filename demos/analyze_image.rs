//! Example showing how to analyze a clothing photo and print the matches
//!
//! ```text
//! OPENAI_API_KEY=sk-... cargo run --example analyze_image -- path/to/outfit.jpg
//! ```

use anyhow::{Context, Result};
use stylematch::{analyze, init, AppState, Config, ImageInput};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the application
    init()?;

    let path = std::env::args()
        .nth(1)
        .context("usage: analyze_image <image-path>")?;

    // Load the image
    let data = std::fs::read(&path).with_context(|| format!("failed to read {}", path))?;
    let image = ImageInput::from_bytes(data)?;

    // Build state from the environment (OPENAI_API_KEY, STYLEMATCH_*)
    let state = AppState::new(Config::from_env()?)?;

    let response = analyze(&state, &image, None).await;
    for result in &response.recommendations {
        println!("{}:", result.recommended_item);
        for item in &result.matches {
            println!("  - {} ({}, {})", item.name, item.color, item.style);
        }
    }
    if let Some(error) = &response.error {
        eprintln!("Analysis failed: {}", error);
    }

    Ok(())
}
