//! `stim generate`, `stim ask` and `stim topics`.

use anyhow::Result;

use crate::config::Config;
use crate::pipeline::StimulusPipeline;
use crate::router::RetrievalRouter;
use crate::topics::{make_topics, seed_concepts, SITUATIONS};

pub async fn run_generate(config: &Config, topic: &str, question: bool, json: bool) -> Result<()> {
    let pipeline = StimulusPipeline::from_config(config);
    let report = pipeline.run(topic, question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    eprintln!(
        "tier: {}  real-world context: {}  relevant: {}/{}",
        report.tier,
        report.used_real_world_context,
        report.relevant.len(),
        report.candidates.len()
    );
    println!("{}", report.stimulus);
    Ok(())
}

pub async fn run_ask(config: &Config, question: &str, json: bool) -> Result<()> {
    let pipeline = StimulusPipeline::from_config(config);
    let report = pipeline.answer(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.answer);
    println!();
    println!("Sources:");
    for (i, item) in report.sources.iter().enumerate() {
        println!(
            "  [{}] {} - {} ({})",
            i + 1,
            item.source().label(),
            item.metadata.title,
            item.metadata.url
        );
    }
    Ok(())
}

/// Print the topic catalogue, extended with `concepts`. Without any,
/// concepts are seeded through the configured adapters.
pub async fn run_topics(config: &Config, concepts: &[String], limit: usize) -> Result<()> {
    let concepts = if concepts.is_empty() {
        seed_concepts(&RetrievalRouter::from_config(config)).await
    } else {
        concepts.to_vec()
    };

    for topic in make_topics(&concepts, SITUATIONS, limit) {
        println!("{}", topic);
    }
    Ok(())
}
