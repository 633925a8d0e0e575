//! In-process similarity index.
//!
//! One index instance serves every tenant; documents carry their owner in
//! the payload and the tenant layer filters results. Ranking is cosine
//! similarity over term-frequency vectors, which is deliberately simple:
//! this adapter exists to exercise the contract, not to compete with a real
//! vector database.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::{VectorHit, VectorIndex};

struct Document {
    text: String,
    terms: HashMap<String, f32>,
    norm: f32,
    payload: Value,
}

#[derive(Default)]
pub struct InMemoryVectorIndex {
    documents: RwLock<Vec<Document>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn term_frequencies(text: &str) -> HashMap<String, f32> {
    let mut terms: HashMap<String, f32> = HashMap::new();
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *terms.entry(token.to_string()).or_insert(0.0) += 1.0;
    }
    terms
}

fn norm(terms: &HashMap<String, f32>) -> f32 {
    terms.values().map(|v| v * v).sum::<f32>().sqrt()
}

fn cosine(a: &HashMap<String, f32>, a_norm: f32, b: &HashMap<String, f32>, b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a
        .iter()
        .filter_map(|(term, weight)| b.get(term).map(|other| weight * other))
        .sum();
    dot / (a_norm * b_norm)
}

impl VectorIndex for InMemoryVectorIndex {
    fn add(&self, text: &str, payload: Value) {
        let terms = term_frequencies(text);
        let norm = norm(&terms);
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents.push(Document {
            text: text.to_string(),
            terms,
            norm,
            payload,
        });
    }

    fn search(&self, query: &str, k: usize) -> Vec<VectorHit> {
        let query_terms = term_frequencies(query);
        let query_norm = norm(&query_terms);

        let documents = self.documents.read().unwrap_or_else(|e| e.into_inner());
        let mut hits: Vec<VectorHit> = documents
            .iter()
            .map(|doc| VectorHit {
                score: cosine(&query_terms, query_norm, &doc.terms, doc.norm),
                text: doc.text.clone(),
                payload: doc.payload.clone(),
            })
            .filter(|hit| hit.score > 0.0)
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ranks_closer_documents_first() {
        let index = InMemoryVectorIndex::new();
        index.add("the cat sat on the mat", json!({"id": "a"}));
        index.add("dogs chase cats sometimes", json!({"id": "b"}));
        index.add("quarterly revenue report", json!({"id": "c"}));

        let hits = index.search("cat on a mat", 10);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].payload["id"], "a");
        // unrelated document scores zero and is dropped
        assert!(hits.iter().all(|h| h.payload["id"] != "c"));
    }

    #[test]
    fn truncates_to_k() {
        let index = InMemoryVectorIndex::new();
        for i in 0..10 {
            index.add("shared words here", json!({"id": i}));
        }
        assert_eq!(index.search("shared words", 3).len(), 3);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let index = InMemoryVectorIndex::new();
        index.add("something", json!({}));
        assert!(index.search("", 5).is_empty());
    }
}
