//! Pairwise thought similarity and greedy topic clustering.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::graph::Thought;
use crate::text::{cosine, jaccard, keyword_set, tokenize};

const VECTOR_WEIGHT: f64 = 0.5;
const KEYWORD_WEIGHT: f64 = 0.2;
const TFIDF_WEIGHT: f64 = 0.3;

/// A group of thoughts about the same topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCluster {
    /// Top terms of the cluster joined by " / "
    pub label: String,
    /// Members in thought order
    pub thought_numbers: Vec<u32>,
}

/// Similarity scoring between thoughts.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    cluster_threshold: f64,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl SimilarityEngine {
    /// Create an engine whose clusters join pairs above `cluster_threshold`.
    pub fn new(cluster_threshold: f64) -> Self {
        Self { cluster_threshold }
    }

    /// Similarity of two thoughts in `[0, 1]`. Symmetric.
    ///
    /// `0.5·cosine(vectors) + 0.2·Jaccard(keywords) + 0.3·tfidf_cosine(texts)`.
    pub fn similarity(&self, a: &Thought, b: &Thought) -> f64 {
        if a.text.trim() == b.text.trim() {
            return 1.0;
        }

        let vector = cosine(&a.vector, &b.vector);
        let keywords = jaccard(&keyword_set(&a.text), &keyword_set(&b.text));
        let tfidf = tfidf_cosine(&a.text, &b.text);

        (VECTOR_WEIGHT * vector + KEYWORD_WEIGHT * keywords + TFIDF_WEIGHT * tfidf).clamp(0.0, 1.0)
    }

    /// Most similar earlier thought, if any.
    pub fn most_similar<'a>(
        &self,
        thought: &Thought,
        prior: impl IntoIterator<Item = &'a Thought>,
    ) -> Option<(u32, f64)> {
        prior
            .into_iter()
            .map(|p| (p.thought_number, self.similarity(thought, p)))
            .fold(None, |best, candidate| match best {
                Some((_, score)) if score >= candidate.1 => best,
                _ => Some(candidate),
            })
    }

    /// Greedy single-link clustering in thought order.
    ///
    /// Each unclustered thought seeds a cluster holding every later
    /// unclustered thought whose similarity to the seed is above the
    /// threshold. Every thought lands in exactly one cluster.
    pub fn cluster(&self, thoughts: &[Thought]) -> Vec<TopicCluster> {
        let mut assigned = vec![false; thoughts.len()];
        let mut groups: Vec<Vec<usize>> = Vec::new();

        for i in 0..thoughts.len() {
            if assigned[i] {
                continue;
            }
            assigned[i] = true;
            let mut members = vec![i];
            for j in (i + 1)..thoughts.len() {
                if !assigned[j] && self.similarity(&thoughts[i], &thoughts[j]) > self.cluster_threshold
                {
                    assigned[j] = true;
                    members.push(j);
                }
            }
            groups.push(members);
        }

        let documents: Vec<Vec<String>> = thoughts.iter().map(|t| tokenize(&t.text)).collect();

        groups
            .iter()
            .enumerate()
            .map(|(index, members)| {
                let terms: Vec<String> = members
                    .iter()
                    .flat_map(|&m| documents[m].iter().cloned())
                    .collect();
                let top = top_terms(&terms, &documents, 2);
                TopicCluster {
                    label: if top.is_empty() {
                        format!("topic_{}", index + 1)
                    } else {
                        top.join(" / ")
                    },
                    thought_numbers: members.iter().map(|&m| thoughts[m].thought_number).collect(),
                }
            })
            .collect()
    }
}

fn term_frequencies(tokens: &[String]) -> BTreeMap<&str, f64> {
    let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    let len = tokens.len() as f64;
    for value in counts.values_mut() {
        *value /= len;
    }
    counts
}

/// Smoothed inverse document frequency: `ln((1+N)/(1+df)) + 1`.
fn idf(documents: usize, df: usize) -> f64 {
    ((1.0 + documents as f64) / (1.0 + df as f64)).ln() + 1.0
}

/// TF-IDF cosine of two texts over the two-document corpus they form.
pub fn tfidf_cosine(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let fa = term_frequencies(&ta);
    let fb = term_frequencies(&tb);
    let vocabulary: BTreeSet<&str> = fa.keys().chain(fb.keys()).copied().collect();

    let mut dot = 0.0;
    let mut na = 0.0;
    let mut nb = 0.0;
    for term in vocabulary {
        let df = usize::from(fa.contains_key(term)) + usize::from(fb.contains_key(term));
        let weight = idf(2, df);
        let wa = fa.get(term).copied().unwrap_or(0.0) * weight;
        let wb = fb.get(term).copied().unwrap_or(0.0) * weight;
        dot += wa * wb;
        na += wa * wa;
        nb += wb * wb;
    }

    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Highest TF-IDF terms of `terms` scored against `documents`.
fn top_terms(terms: &[String], documents: &[Vec<String>], limit: usize) -> Vec<String> {
    let candidates: Vec<String> = terms
        .iter()
        .filter(|t| t.chars().count() > 3)
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let tf = term_frequencies(&candidates);
    let mut scored: Vec<(&str, f64)> = tf
        .iter()
        .map(|(term, freq)| {
            let df = documents
                .iter()
                .filter(|doc| doc.iter().any(|t| t == term))
                .count();
            (*term, freq * idf(documents.len(), df))
        })
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(limit)
        .map(|(term, _)| term.to_string())
        .collect()
}
