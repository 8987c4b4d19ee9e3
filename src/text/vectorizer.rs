//! Deterministic pseudo-embeddings.
//!
//! [`HashVectorizer`] turns tokens into fixed-dimension vectors with a
//! multi-hash scheme and caches them per token. Callers depend on the
//! [`Vectorizer`] trait so another embedding backend can be substituted
//! without touching the similarity engine.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use lru::LruCache;
use tracing::debug;

use super::tokenize;
use crate::config::VectorConfig;
use crate::error::SessionError;

/// Prime seeds for the token hash functions.
pub const HASH_SEEDS: &[u64] = &[31, 37, 41, 43, 47];

/// Text-to-vector backend.
pub trait Vectorizer: Send + Sync {
    /// Length of every vector produced.
    fn dimension(&self) -> usize;

    /// Vectorize a whole text. Pure: equal inputs yield equal outputs.
    fn vectorize(&self, text: &str) -> Vec<f32>;
}

/// Multi-hash pseudo-embedding backend with an LRU token cache.
///
/// An optional pretrained table overrides the hash vector for the tokens it
/// contains.
pub struct HashVectorizer {
    dimension: usize,
    cache: Mutex<LruCache<String, Arc<[f32]>>>,
    pretrained: RwLock<Option<Arc<PretrainedVectors>>>,
}

impl HashVectorizer {
    /// Create a vectorizer with the given dimension and cache capacity.
    pub fn new(dimension: usize, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            dimension: dimension.max(1),
            cache: Mutex::new(LruCache::new(capacity)),
            pretrained: RwLock::new(None),
        }
    }

    /// Create a vectorizer from configuration.
    pub fn from_config(config: &VectorConfig) -> Self {
        Self::new(config.dimension, config.cache_size)
    }

    /// Install a pretrained table. Clears the token cache.
    pub fn install_pretrained(&self, table: PretrainedVectors) {
        let mut slot = self
            .pretrained
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Arc::new(table));
        drop(slot);

        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Whether a pretrained table is installed.
    pub fn has_pretrained(&self) -> bool {
        self.pretrained
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Number of cached token vectors.
    pub fn cached_tokens(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Vector for a single (lowercase) token.
    pub fn token_vector(&self, token: &str) -> Arc<[f32]> {
        {
            let mut cache = self
                .cache
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(hit) = cache.get(token) {
                return Arc::clone(hit);
            }
        }

        let vector: Arc<[f32]> = match self.pretrained_vector(token) {
            Some(v) => v.into(),
            None => hash_token(token, self.dimension).into(),
        };

        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .put(token.to_string(), Arc::clone(&vector));

        vector
    }

    fn pretrained_vector(&self, token: &str) -> Option<Vec<f32>> {
        let slot = self.pretrained.read().ok()?;
        let table = slot.as_ref()?;
        let raw = table.get(token)?;

        let mut fitted: Vec<f32> = raw.iter().copied().take(self.dimension).collect();
        fitted.resize(self.dimension, 0.0);
        normalize(&mut fitted);
        Some(fitted)
    }
}

impl Vectorizer for HashVectorizer {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let v = self.token_vector(&token);
            for (acc, x) in out.iter_mut().zip(v.iter()) {
                *acc += x;
            }
        }
        normalize(&mut out);
        out
    }
}

/// Hash a token into an L2-normalized vector.
///
/// Each prime seed rolls a polynomial hash over the whole token. For every
/// character position `p` the mixed hash of `(token hash, p)` picks a bucket
/// that receives a signed weight of `1/(p+1)`, so unrelated tokens only
/// share buckets by chance.
pub fn hash_token(token: &str, dimension: usize) -> Vec<f32> {
    let dimension = dimension.max(1);
    let mut v = vec![0.0f32; dimension];
    let positions = token.chars().count().max(1);

    for &seed in HASH_SEEDS {
        let h = token
            .chars()
            .fold(seed, |h, ch| h.wrapping_mul(seed).wrapping_add(ch as u64));
        for p in 0..positions {
            let mixed = mix(h ^ (p as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
            let bucket = (mixed % dimension as u64) as usize;
            let weight = 1.0 / (p as f32 + 1.0);
            if (mixed >> 32) & 1 == 0 {
                v[bucket] += weight;
            } else {
                v[bucket] -= weight;
            }
        }
    }

    normalize(&mut v);
    v
}

/// 64-bit finalizer (murmur3 fmix64).
fn mix(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

/// Scale a vector to unit length in place. Zero vectors are left alone.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity. 0.0 for empty, mismatched or zero-norm vectors.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

// ============================================================================
// Pretrained vectors
// ============================================================================

/// Word vectors parsed from a GloVe-style text file.
#[derive(Debug, Clone, Default)]
pub struct PretrainedVectors {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl PretrainedVectors {
    /// Parse `word f1 f2 ...` lines. Malformed lines and lines whose width
    /// disagrees with the first valid line are skipped.
    pub fn parse(content: &str) -> Self {
        let mut dimension = 0usize;
        let mut vectors = HashMap::new();

        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else {
                continue;
            };
            let values: Result<Vec<f32>, _> = parts.map(str::parse::<f32>).collect();
            let Ok(values) = values else {
                continue;
            };
            if values.is_empty() {
                continue;
            }
            if dimension == 0 {
                dimension = values.len();
            } else if values.len() != dimension {
                continue;
            }
            vectors.insert(word.to_lowercase(), values);
        }

        Self { dimension, vectors }
    }

    /// Width of the stored vectors (0 when empty).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of words in the table.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the table holds no words.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Raw vector for a word.
    pub fn get(&self, word: &str) -> Option<&[f32]> {
        self.vectors.get(word).map(Vec::as_slice)
    }
}

/// Source of pretrained vectors, loaded once and off the hot path.
#[async_trait]
pub trait VectorSource: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    /// Load the table.
    async fn load(&self) -> Result<PretrainedVectors, SessionError>;
}

/// Loads pretrained vectors from a local text file.
#[derive(Debug, Clone)]
pub struct FileVectorSource {
    path: PathBuf,
}

impl FileVectorSource {
    /// Create a source for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VectorSource for FileVectorSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<PretrainedVectors, SessionError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SessionError::VectorLoad {
                path: self.describe(),
                message: e.to_string(),
            })?;

        let table = PretrainedVectors::parse(&content);
        if table.is_empty() {
            return Err(SessionError::VectorLoad {
                path: self.describe(),
                message: "no valid vector lines".to_string(),
            });
        }

        debug!(
            path = %self.describe(),
            words = table.len(),
            dimension = table.dimension(),
            "Parsed pretrained vectors"
        );
        Ok(table)
    }
}
