//! Demo of the vault search pipeline.
//!
//! Usage: cargo run -p lodestone-retrieval --example search_demo [vault_dir]
//!
//! With no argument a small throwaway vault is seeded for the run. The
//! hashing provider keeps the demo offline; swap in `OpenAIProvider` for
//! real embeddings.

use std::path::PathBuf;
use std::sync::Arc;

use lodestone_embeddings::HashingProvider;
use lodestone_retrieval::{ContextOptions, EngineConfig, SearchOptions, VaultEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logs
    tracing_subscriber::fmt::init();

    println!("🔎 Lodestone Semantic Search Demo\n");

    let (vault_dir, _guard) = match std::env::args().nth(1) {
        Some(dir) => (PathBuf::from(dir), None),
        None => {
            let temp = tempfile::tempdir()?;
            seed_demo_vault(temp.path())?;
            (temp.path().to_path_buf(), Some(temp))
        }
    };

    let engine = VaultEngine::builder()
        .with_config(EngineConfig::new(&vault_dir))
        .with_provider(Arc::new(HashingProvider::new()))
        .build()
        .await?;

    println!("📚 Indexing {}...", vault_dir.display());
    let report = engine.reindex(false).await?;
    println!("   ✓ Notes indexed: {}", report.indexed);
    println!("   ✓ Notes skipped: {}", report.skipped);
    println!("   ✓ Chunks written: {}", report.chunks_written);
    println!("   ✓ Errors: {}", report.errors.len());
    println!("   ✓ Duration: {}ms\n", report.duration_ms);

    let stats = engine.stats().await?;
    println!(
        "📊 Engine: {} notes, {} entries, provider '{}' ({} dims)\n",
        stats.documents, stats.entries, stats.provider, stats.dimension
    );

    for query in ["pasta with garlic", "vector index design"] {
        println!("🔍 Query: {query}");
        let results = engine
            .search_with(query, SearchOptions::default().with_min_score(0.1))
            .await?;
        if results.is_empty() {
            println!("   (no matches)\n");
            continue;
        }
        for result in &results {
            println!(
                "   {:.3}  {}  [{}]",
                result.score, result.path, result.heading
            );
        }
        println!();
    }

    println!("🧩 Context for 'pasta with garlic':\n");
    let bundle = engine
        .build_context_with(
            "pasta with garlic",
            ContextOptions::default().with_min_relevance(0.1),
        )
        .await?;
    println!("{}", bundle.render());

    Ok(())
}

fn seed_demo_vault(root: &std::path::Path) -> std::io::Result<()> {
    std::fs::create_dir_all(root.join("recipes"))?;
    std::fs::write(
        root.join("recipes/pasta.md"),
        "---\ntags: [cooking]\n---\n# Pasta\nTomato basil pasta with garlic and olive oil.",
    )?;
    std::fs::write(
        root.join("engine.md"),
        "# Engine\nVector index design notes for the search engine. #work",
    )?;
    Ok(())
}
