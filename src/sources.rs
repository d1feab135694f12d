//! `stim sources`: registered adapters and context store state.

use anyhow::Result;

use crate::config::Config;
use crate::router::RetrievalRouter;
use crate::store::ContextStore;

pub fn list_sources(config: &Config) -> Result<()> {
    let router = RetrievalRouter::from_config(config);

    println!("{:<12} {:<20} {:<6} DESCRIPTION", "ADAPTER", "SOURCE", "LIMIT");
    for adapter in router.adapters() {
        println!(
            "{:<12} {:<20} {:<6} {}",
            adapter.name(),
            adapter.source(),
            adapter.default_limit(),
            adapter.description()
        );
    }
    if router.is_empty() {
        println!("(no adapters enabled)");
    }

    let store = ContextStore::open(&config.store);
    println!();
    println!(
        "context store: {} (backend: {}, dims: {})",
        store.state().as_str(),
        config.store.backend,
        config.store.dims
    );

    Ok(())
}
