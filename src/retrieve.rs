//! `stim retrieve` and `stim context`: inspect retrieval without generating.

use anyhow::Result;

use crate::adapters::RetrievalOutcome;
use crate::config::Config;
use crate::models::{truncate_chars, ContextItem};
use crate::router::RetrievalRouter;
use crate::selector::ContextSelector;

/// Fan `query` out to every enabled adapter and print each outcome.
pub async fn run_retrieve(config: &Config, query: &str) -> Result<()> {
    let router = RetrievalRouter::from_config(config);
    let reports = router.retrieve_detailed(query).await;

    let mut total = 0;
    for report in &reports {
        let status = match &report.retrieval.outcome {
            RetrievalOutcome::Fetched => "ok".to_string(),
            RetrievalOutcome::Degraded(reason) => format!("fallback ({})", reason),
        };
        println!("== {} [{}] {}", report.adapter, report.source, status);
        for doc in &report.retrieval.documents {
            println!("  - {}", doc.title);
            if !doc.url.is_empty() {
                println!("    url: {}", doc.url);
            }
            println!("    excerpt: \"{}\"", excerpt(&doc.text));
        }
        total += report.retrieval.documents.len();
    }

    println!();
    println!("{} documents from {} adapters", total, reports.len());
    Ok(())
}

/// Run context selection for `topic` and print the chosen tier and items.
pub async fn run_context(config: &Config, topic: &str) -> Result<()> {
    let selector = ContextSelector::from_config(config);
    let selection = selector.select(topic).await?;

    println!("topic: {}", selection.topic);
    println!("tier: {}", selection.tier);
    println!("real-world context: {}", selection.used_real_world_context);
    println!();

    println!("candidates ({}):", selection.candidates.len());
    print_items(&selection.candidates);
    println!("relevant ({}):", selection.relevant.len());
    print_items(&selection.relevant);
    Ok(())
}

fn print_items(items: &[ContextItem]) {
    for (i, item) in items.iter().enumerate() {
        match item.distance {
            Some(d) => println!(
                "{}. [{:.3}] {} / {}",
                i + 1,
                d,
                item.source(),
                item.metadata.title
            ),
            None => println!("{}. {} / {}", i + 1, item.source(), item.metadata.title),
        }
        println!("    excerpt: \"{}\"", excerpt(&item.text));
    }
    println!();
}

fn excerpt(text: &str) -> String {
    truncate_chars(&text.replace('\n', " "), 160)
        .trim()
        .to_string()
}
