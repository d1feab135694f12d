//! Router, selector, assembler and HTTP surface wired together with
//! in-process adapters and generators. No network access.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stimulus_harness::adapters::{Retrieval, RetrievalOutcome, SourceAdapter};
use stimulus_harness::config::{PromptConfig, RetrievalConfig, StoreConfig};
use stimulus_harness::embedding::HashEmbedder;
use stimulus_harness::error::{GenerationError, PipelineError, SourceError};
use stimulus_harness::generation::{DisabledGenerator, Generator};
use stimulus_harness::models::{ContextTier, Document, SourceTag};
use stimulus_harness::pipeline::StimulusPipeline;
use stimulus_harness::prompt::{fallback_scenario, PromptAssembler};
use stimulus_harness::router::RetrievalRouter;
use stimulus_harness::selector::ContextSelector;
use stimulus_harness::server::build_router;
use stimulus_harness::store::{
    ContextStore, InMemoryBackend, Neighbor, StoreEntry, VectorBackend,
};
use stimulus_harness::topics::{seed_concepts, DEFAULT_CONCEPTS};

// ============ Test doubles ============

/// Returns fixed documents, or fails when `texts` is `None`.
struct Stub {
    name: &'static str,
    source: SourceTag,
    texts: Option<Vec<&'static str>>,
}

impl Stub {
    fn boxed(name: &'static str, source: SourceTag, texts: &[&'static str]) -> Box<dyn SourceAdapter> {
        Box::new(Stub {
            name,
            source,
            texts: Some(texts.to_vec()),
        })
    }

    fn failing(name: &'static str, source: SourceTag) -> Box<dyn SourceAdapter> {
        Box::new(Stub {
            name,
            source,
            texts: None,
        })
    }
}

#[async_trait]
impl SourceAdapter for Stub {
    fn name(&self) -> &str {
        self.name
    }
    fn source(&self) -> SourceTag {
        self.source
    }
    fn default_limit(&self) -> usize {
        5
    }
    async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<Document>, SourceError> {
        match &self.texts {
            Some(texts) => Ok(texts
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    Document::new(
                        *t,
                        format!("{} {}", self.name, i),
                        format!("https://{}.example/{}", self.name, i),
                        self.source,
                        None,
                    )
                })
                .collect()),
            None => Err(SourceError::Unavailable("connection refused".into())),
        }
    }
    fn fallback(&self, query: &str) -> Document {
        Document::new(
            format!("{} fallback for {}", self.name, query),
            "fallback",
            format!("https://{}.example/fallback", self.name),
            self.source,
            None,
        )
    }
}

/// An adapter whose fallback path yields nothing at all.
struct Silent;

#[async_trait]
impl SourceAdapter for Silent {
    fn name(&self) -> &str {
        "silent"
    }
    fn source(&self) -> SourceTag {
        SourceTag::NewsIndex
    }
    fn default_limit(&self) -> usize {
        5
    }
    async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<Document>, SourceError> {
        Err(SourceError::Unavailable("down".into()))
    }
    fn fallback(&self, query: &str) -> Document {
        Document::new(query, "", "", SourceTag::NewsIndex, None)
    }
    async fn retrieve(&self, _query: &str, _limit: usize) -> Retrieval {
        Retrieval {
            documents: Vec::new(),
            outcome: RetrievalOutcome::Degraded(SourceError::Unavailable("down".into())),
        }
    }
}

/// A backend that accepts everything and never finds a match.
struct NoMatches;

#[async_trait]
impl VectorBackend for NoMatches {
    async fn insert(&self, _collection: &str, entries: Vec<StoreEntry>) -> anyhow::Result<usize> {
        Ok(entries.len())
    }
    async fn nearest(
        &self,
        _collection: &str,
        _query: &[f32],
        _top_k: usize,
    ) -> anyhow::Result<Vec<Neighbor>> {
        Ok(Vec::new())
    }
    async fn drop_collection(&self, _collection: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Returns one never-before-seen document per call.
#[derive(Default)]
struct Fresh {
    calls: AtomicUsize,
}

#[async_trait]
impl SourceAdapter for Fresh {
    fn name(&self) -> &str {
        "fresh"
    }
    fn source(&self) -> SourceTag {
        SourceTag::NewsIndex
    }
    fn default_limit(&self) -> usize {
        1
    }
    async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<Document>, SourceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Document::new(
            format!("privacy note {}", n),
            format!("Note {}", n),
            format!("https://fresh.example/{}", n),
            SourceTag::NewsIndex,
            None,
        )])
    }
    fn fallback(&self, query: &str) -> Document {
        Document::new(query, "fallback", "", SourceTag::NewsIndex, None)
    }
}

/// Shares an in-memory backend with the test so it can be inspected.
struct Shared(Arc<InMemoryBackend>);

#[async_trait]
impl VectorBackend for Shared {
    async fn insert(&self, collection: &str, entries: Vec<StoreEntry>) -> anyhow::Result<usize> {
        self.0.insert(collection, entries).await
    }
    async fn nearest(
        &self,
        collection: &str,
        query: &[f32],
        top_k: usize,
    ) -> anyhow::Result<Vec<Neighbor>> {
        self.0.nearest(collection, query, top_k).await
    }
    async fn drop_collection(&self, collection: &str) -> anyhow::Result<()> {
        self.0.drop_collection(collection).await
    }
}

/// Succeeds with documents carrying the given titles.
struct Titled(&'static [&'static str]);

#[async_trait]
impl SourceAdapter for Titled {
    fn name(&self) -> &str {
        "titled"
    }
    fn source(&self) -> SourceTag {
        SourceTag::AcademicIndex
    }
    fn default_limit(&self) -> usize {
        5
    }
    async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<Document>, SourceError> {
        Ok(self
            .0
            .iter()
            .map(|t| Document::new("body", *t, "", SourceTag::AcademicIndex, None))
            .collect())
    }
    fn fallback(&self, query: &str) -> Document {
        Document::new(query, "", "", SourceTag::AcademicIndex, None)
    }
}

struct Scripted(Result<String, GenerationError>);

#[async_trait]
impl Generator for Scripted {
    fn model_name(&self) -> &str {
        "scripted"
    }
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.0.clone()
    }
}

fn router(adapters: Vec<Box<dyn SourceAdapter>>) -> RetrievalRouter {
    let mut router = RetrievalRouter::new(Duration::from_secs(5));
    for a in adapters {
        router.register(a);
    }
    router
}

fn no_match_store() -> ContextStore {
    ContextStore::new(Ok(Box::new(NoMatches)), Box::new(HashEmbedder::new(32)))
}

fn selector(adapters: Vec<Box<dyn SourceAdapter>>, store: ContextStore) -> ContextSelector {
    ContextSelector::new(router(adapters), store, RetrievalConfig::default())
}

fn assembler(reply: Result<String, GenerationError>) -> PromptAssembler {
    PromptAssembler::new(
        Box::new(Scripted(reply)),
        Box::new(DisabledGenerator),
        PromptConfig::default(),
    )
}

// ============ Router ============

#[tokio::test]
async fn router_output_is_sum_of_adapter_outputs() {
    let r = router(vec![
        Stub::boxed("a", SourceTag::AcademicIndex, &["one", "two", "three"]),
        Stub::failing("b", SourceTag::Encyclopedia),
        Stub::boxed("c", SourceTag::NewsIndex, &["four", "five"]),
        Stub::failing("d", SourceTag::GovernmentIndex),
    ]);

    let docs = r.retrieve("privacy").await;
    assert_eq!(docs.len(), 3 + 1 + 2 + 1);
    assert_eq!(docs[3].text, "b fallback for privacy");
    assert_eq!(docs[3].source, SourceTag::Encyclopedia);
}

// ============ Selector tiers ============

#[tokio::test]
async fn operational_store_without_matches_uses_raw_documents() {
    let s = selector(
        vec![
            Stub::boxed("a", SourceTag::AcademicIndex, &["a0", "a1", "a2"]),
            Stub::boxed("b", SourceTag::NewsIndex, &["b0", "b1", "b2"]),
        ],
        no_match_store(),
    );
    assert!(s.store().is_operational());

    let selection = s.select("privacy").await.unwrap();
    assert_eq!(selection.tier, ContextTier::RawDocuments);
    // three query variants hit the same URLs; dedup leaves six, limit keeps five
    let texts: Vec<&str> = selection.candidates.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["a0", "a1", "a2", "b0", "b1"]);
    assert!(selection.used_real_world_context);
}

#[tokio::test]
async fn in_memory_store_uses_vector_search() {
    let s = selector(
        vec![Stub::boxed(
            "a",
            SourceTag::NewsIndex,
            &["privacy one", "privacy two", "privacy three"],
        )],
        ContextStore::open(&StoreConfig::default()),
    );

    let selection = s.select("privacy").await.unwrap();
    assert_eq!(selection.tier, ContextTier::VectorSearch);
    assert_eq!(selection.candidates.len(), 3);
    let distances: Vec<f32> = selection
        .candidates
        .iter()
        .map(|c| c.distance.unwrap())
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn vector_search_only_ranks_documents_from_the_same_request() {
    let backend = Arc::new(InMemoryBackend::new(32).unwrap());
    let store = ContextStore::new(
        Ok(Box::new(Shared(backend.clone()))),
        Box::new(HashEmbedder::new(32)),
    );
    let settings = RetrievalConfig {
        final_limit: 100,
        ..RetrievalConfig::default()
    };
    let s = ContextSelector::new(router(vec![Box::new(Fresh::default())]), store, settings);

    let mut last = None;
    for _ in 0..50 {
        last = Some(s.select("privacy").await.unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.tier, ContextTier::VectorSearch);
    assert_eq!(last.candidates.len(), 3);
    // the 50th request saw calls 147, 148 and 149
    assert!(last
        .candidates
        .iter()
        .all(|c| c.metadata.url.trim_start_matches("https://fresh.example/").parse::<usize>().unwrap() >= 147));
    assert_eq!(backend.collection_count(), 0);
}

#[tokio::test]
async fn degraded_store_and_silent_adapters_yield_placeholder() {
    let s = selector(
        vec![
            Box::new(Silent),
            Box::new(Silent),
            Box::new(Silent),
            Box::new(Silent),
        ],
        ContextStore::degraded(),
    );

    let selection = s.select("gene editing ethics").await.unwrap();
    assert_eq!(selection.tier, ContextTier::Placeholder);
    assert_eq!(selection.candidates.len(), 1);
    assert!(selection.candidates[0].text.contains("gene editing ethics"));
    assert_eq!(selection.candidates[0].source(), SourceTag::EducationalContent);
    assert!(!selection.used_real_world_context);
}

#[tokio::test]
async fn failing_adapters_contribute_fallbacks_as_raw_documents() {
    let s = selector(
        vec![
            Stub::failing("a", SourceTag::AcademicIndex),
            Stub::failing("b", SourceTag::Encyclopedia),
            Stub::failing("c", SourceTag::NewsIndex),
            Stub::failing("d", SourceTag::GovernmentIndex),
        ],
        ContextStore::degraded(),
    );

    let selection = s.select("privacy").await.unwrap();
    assert_eq!(selection.tier, ContextTier::RawDocuments);
    // fallbacks share a URL per adapter across query variants
    assert_eq!(selection.candidates.len(), 4);
}

#[tokio::test]
async fn empty_topic_is_rejected() {
    let s = selector(vec![], ContextStore::degraded());
    assert_eq!(s.select("   ").await.unwrap_err(), PipelineError::EmptyTopic);
}

// ============ Relevance filter ============

#[tokio::test]
async fn keyword_filter_keeps_matching_documents() {
    let settings = RetrievalConfig {
        relevance_limit: 5,
        ..RetrievalConfig::default()
    };
    let s = ContextSelector::new(
        router(vec![
            Stub::boxed("a", SourceTag::AcademicIndex, &["Surveillance in classrooms"]),
            Stub::boxed("b", SourceTag::Encyclopedia, &["Mass surveillance overview"]),
            Stub::boxed("c", SourceTag::NewsIndex, &["Parents object to surveillance"]),
            Stub::boxed("d", SourceTag::GovernmentIndex, &["Surveillance camera code"]),
        ]),
        ContextStore::degraded(),
        settings,
    );

    let selection = s.select("school surveillance policy").await.unwrap();
    assert_eq!(selection.candidates.len(), 4);
    assert_eq!(selection.relevant.len(), 4);
}

#[tokio::test]
async fn keyword_filter_drops_unrelated_unless_prioritized() {
    let s = selector(
        vec![Stub::boxed("news", SourceTag::NewsIndex, &["elections"])],
        ContextStore::degraded(),
    );
    let selection = s.select("voting technology").await.unwrap();
    assert_eq!(selection.candidates.len(), 1);
    assert!(selection.relevant.is_empty());

    let s = selector(
        vec![Stub::boxed("gov", SourceTag::GovernmentIndex, &["elections"])],
        ContextStore::degraded(),
    );
    let selection = s.select("voting technology").await.unwrap();
    assert_eq!(selection.relevant.len(), 1);
}

// ============ Pipeline ============

#[tokio::test]
async fn pipeline_cleans_generated_text() {
    let pipeline = StimulusPipeline::new(
        selector(
            vec![Stub::boxed("a", SourceTag::NewsIndex, &["privacy rules"])],
            ContextStore::degraded(),
        ),
        assembler(Ok("Okay, here is the scenario.\nActual content.".into())),
    );

    let report = pipeline.run("privacy", false).await.unwrap();
    assert_eq!(report.stimulus, "Actual content.");
    assert_eq!(report.tier, ContextTier::RawDocuments);
    assert!(report.used_real_world_context);
}

#[tokio::test]
async fn pipeline_survives_generation_failure() {
    let pipeline = StimulusPipeline::new(
        selector(vec![], ContextStore::degraded()),
        assembler(Err(GenerationError::RateLimited("HTTP 429".into()))),
    );

    let report = pipeline.run("housing algorithm fairness", true).await.unwrap();
    let expected = format!(
        "{}\n\nWhat assumptions might be driving the different positions you see here?",
        fallback_scenario("housing algorithm fairness")
    );
    assert_eq!(report.stimulus, expected);
    assert_eq!(report.tier, ContextTier::Placeholder);
}

#[tokio::test]
async fn pipeline_rejects_empty_topic() {
    let pipeline = StimulusPipeline::new(
        selector(vec![], ContextStore::degraded()),
        assembler(Ok("text".into())),
    );
    assert_eq!(
        pipeline.run("", false).await.unwrap_err(),
        PipelineError::EmptyTopic
    );
}

#[tokio::test]
async fn pipeline_answers_with_numbered_sources() {
    let pipeline = StimulusPipeline::new(
        selector(
            vec![Stub::boxed("gov", SourceTag::GovernmentIndex, &["camera code text"])],
            ContextStore::degraded(),
        ),
        assembler(Ok(" Councils must follow the code [1].\n".into())),
    );

    let report = pipeline.answer("who regulates cameras").await.unwrap();
    assert_eq!(report.answer, "Councils must follow the code [1].");
    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].source(), SourceTag::GovernmentIndex);
}

#[tokio::test]
async fn pipeline_answer_reports_generation_failure() {
    let pipeline = StimulusPipeline::new(
        selector(vec![], ContextStore::degraded()),
        assembler(Err(GenerationError::Api {
            status: 500,
            message: "boom".into(),
        })),
    );
    assert!(matches!(
        pipeline.answer("why").await.unwrap_err(),
        PipelineError::Generation(GenerationError::Api { status: 500, .. })
    ));
}

// ============ Concept seeding ============

#[tokio::test]
async fn seed_concepts_reads_retrieved_titles() {
    let r = router(vec![Box::new(Titled(&[
        "Ethics of Facial Recognition",
        "Algorithmic accountability in policing",
    ]))]);
    assert_eq!(
        seed_concepts(&r).await,
        vec!["accountability", "ethics", "policing", "recognition"]
    );
}

#[tokio::test]
async fn seed_concepts_fall_back_to_defaults() {
    let r = router(vec![Stub::failing("a", SourceTag::AcademicIndex)]);
    assert_eq!(seed_concepts(&r).await, DEFAULT_CONCEPTS);
}

// ============ HTTP ============

async fn serve_pipeline(pipeline: StimulusPipeline) -> String {
    let app = build_router(Arc::new(pipeline));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn http_endpoints() {
    let base = serve_pipeline(StimulusPipeline::new(
        selector(
            vec![Stub::boxed("a", SourceTag::NewsIndex, &["privacy rules"])],
            ContextStore::degraded(),
        ),
        assembler(Ok("SCENARIO:\n\nA council meets.".into())),
    ))
    .await;
    let client = reqwest::Client::new();

    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let sources: serde_json::Value = client
        .get(format!("{}/sources", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sources["store"], "degraded");
    assert_eq!(sources["adapters"][0]["name"], "a");
    assert_eq!(sources["adapters"][0]["source"], "news-index");

    let context: serde_json::Value = client
        .post(format!("{}/context", base))
        .json(&serde_json::json!({ "topic": "privacy" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(context["tier"], "raw_documents");
    assert_eq!(context["candidates"][0]["metadata"]["source"], "news-index");

    let stimulus: serde_json::Value = client
        .post(format!("{}/stimulus", base))
        .json(&serde_json::json!({ "topic": "privacy" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stimulus["stimulus"], "A council meets.");

    let resp = client
        .post(format!("{}/stimulus", base))
        .json(&serde_json::json!({ "topic": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let answer: serde_json::Value = client
        .post(format!("{}/answer", base))
        .json(&serde_json::json!({ "question": "privacy rules" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answer["answer"], "SCENARIO:\n\nA council meets.");
    assert_eq!(answer["sources"][0]["metadata"]["source"], "news-index");
}

#[tokio::test]
async fn http_answer_generation_failure_is_bad_gateway() {
    let base = serve_pipeline(StimulusPipeline::new(
        selector(vec![], ContextStore::degraded()),
        assembler(Err(GenerationError::Disabled)),
    ))
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{}/answer", base))
        .json(&serde_json::json!({ "question": "why" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 502);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "generation_failed");
    assert_eq!(body["error"]["message"], "generation provider is disabled");
}
