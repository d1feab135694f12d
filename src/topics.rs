//! Topic catalogue, concept seeding and query expansion.
//!
//! A topic is expanded into seven search phrases, one per angle
//! (background, current issues, regulation, stakeholders, ethics, case
//! studies, controversy). The selector sends only the first few to the
//! router.
//!
//! Concepts that vary the catalogue are either supplied by the caller or
//! seeded from the titles of documents retrieved for [`SEED_QUERY`].

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::info;

use crate::router::RetrievalRouter;

/// Concrete situations used as default scenario topics.
pub const SITUATIONS: &[&str] = &[
    "school surveillance policy",
    "workplace monitoring ethics",
    "NHS data sharing policy",
    "social media algorithm transparency",
    "police body camera implementation",
    "university AI admissions system",
    "council budget allocation priorities",
    "housing algorithm fairness review",
    "banking AI credit decisions",
    "transport data privacy concerns",
    "hospital resource allocation system",
    "voting technology security debate",
    "employee performance monitoring",
    "court AI evidence evaluation",
    "education technology privacy",
];

/// Broad query whose result titles seed the concept list.
pub const SEED_QUERY: &str =
    "critical thinking ethics policy education technology environment health justice privacy AI";

/// Concepts used when seeding finds nothing.
pub const DEFAULT_CONCEPTS: &[&str] = &["ethics", "policy", "technology", "justice", "privacy"];

const MAX_CONCEPTS: usize = 20;
const MAX_CONCEPT_CHARS: usize = 25;

// Abstract nouns: -ing, -tion, -ity, -ics, -ism.
static CONCEPT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b[a-z]+(?:ing|tion|ity|ics|ism)\b").ok());

/// Number of phrases produced by [`expand_topic`].
pub const EXPANSION_COUNT: usize = 7;

/// Build the seven search phrases for `topic`.
///
/// `"{concept} in {context}"` is split on the first `" in "`; any other
/// topic is used whole as the concept with an empty context.
pub fn expand_topic(topic: &str) -> Vec<String> {
    let (concept, context) = match topic.split_once(" in ") {
        Some((concept, context)) => (concept.trim(), context.trim()),
        None => (topic.trim(), ""),
    };

    [
        format!("{concept} definition background"),
        format!("{concept} {context} current issues UK"),
        format!("{concept} policy law regulation UK"),
        format!("{concept} stakeholders concerns {context}"),
        format!("{concept} ethics risks {context}"),
        format!("{concept} case studies examples UK"),
        format!("{concept} debate controversy {context}"),
    ]
    .into_iter()
    .map(|q| collapse_whitespace(&q))
    .collect()
}

/// Combine the situation catalogue with extracted concepts.
///
/// Returns every situation, then `"{situation} involving {concept}"` for
/// the first three concepts against the first five situations (skipping
/// pairs where the situation already mentions the concept). Duplicates are
/// removed keeping first occurrence; the list is cut at `limit`.
pub fn make_topics(concepts: &[String], situations: &[&str], limit: usize) -> Vec<String> {
    let mut topics: Vec<String> = situations.iter().map(|s| s.to_string()).collect();

    for concept in concepts.iter().take(3) {
        let needle = concept.to_lowercase();
        for situation in situations.iter().take(5) {
            if situation.to_lowercase().contains(&needle) {
                continue;
            }
            topics.push(format!("{} involving {}", situation, concept));
        }
    }

    let mut seen = std::collections::HashSet::new();
    topics.retain(|t| seen.insert(t.clone()));
    topics.truncate(limit);
    topics
}

/// Lowercased abstract nouns found in `titles`, sorted, without
/// duplicates, at most twenty.
pub fn extract_concepts<'a>(titles: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let Some(re) = CONCEPT_RE.as_ref() else {
        return Vec::new();
    };

    let mut concepts = BTreeSet::new();
    for title in titles {
        let title = title.to_lowercase();
        for m in re.find_iter(&title) {
            if m.as_str().chars().count() <= MAX_CONCEPT_CHARS {
                concepts.insert(m.as_str().to_string());
            }
        }
    }
    concepts.into_iter().take(MAX_CONCEPTS).collect()
}

/// Retrieve [`SEED_QUERY`] through `router` and extract concepts from the
/// document titles, or return [`DEFAULT_CONCEPTS`] if there are none.
pub async fn seed_concepts(router: &RetrievalRouter) -> Vec<String> {
    let docs = router.retrieve(SEED_QUERY).await;
    let concepts = extract_concepts(docs.iter().map(|d| d.title.as_str()));
    if concepts.is_empty() {
        info!(documents = docs.len(), "no concepts in retrieved titles, using defaults");
        return DEFAULT_CONCEPTS.iter().map(|c| c.to_string()).collect();
    }
    info!(concepts = concepts.len(), "seeded concepts");
    concepts
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
