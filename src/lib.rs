//! # Stimulus Harness
//!
//! Retrieval-backed generation of critical-thinking scenarios.
//!
//! A topic is expanded into several search phrases, fanned out to four
//! public document sources, deduplicated, optionally ranked through an
//! in-memory vector store, filtered for relevance, and handed to a text
//! generator. Every external dependency has a degraded substitute, so a
//! scenario is always produced.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Adapters   │──▶│   Router    │──▶│   Selector   │──▶│    Prompt    │
//! │ OA/WP/GD/UK │   │  (fan-out)  │   │ store / raw  │   │  Assembler   │
//! └─────────────┘   └─────────────┘   │ / placeholder│   └──────┬───────┘
//!                                     └──────────────┘          │
//!                      ┌────────────────────────────────────────┤
//!                      ▼                                        ▼
//!                 ┌──────────┐                            ┌──────────┐
//!                 │   CLI    │                            │   HTTP   │
//!                 │  (stim)  │                            │  (axum)  │
//!                 └──────────┘                            └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Documents, context items, source tags |
//! | [`error`] | Error kinds at each seam |
//! | [`adapters`] | OpenAlex, Wikipedia, GDELT and GOV.UK adapters |
//! | [`router`] | Concurrent fan-out across adapters |
//! | [`embedding`] | Embedding provider and similarity helpers |
//! | [`store`] | Context store with a pluggable vector backend |
//! | [`topics`] | Topic catalogue, concept seeding and query expansion |
//! | [`selector`] | Fallback ladder and relevance filter |
//! | [`generation`] | Text generation with rate-limit retry |
//! | [`prompt`] | Prompt construction and output cleanup |
//! | [`pipeline`] | End-to-end stimulus generation |
//! | [`server`] | JSON HTTP API |

pub mod adapters;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod generation;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod retrieve;
pub mod router;
pub mod selector;
pub mod server;
pub mod sources;
pub mod store;
pub mod topics;
