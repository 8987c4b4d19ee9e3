//! Heuristic analysis engines.
//!
//! Each engine is a pure function of its inputs and never fails; missing
//! structure degrades to neutral defaults. The store runs them in a fixed
//! order for every incoming thought:
//!
//! ```text
//! vectorize → similarity → contradiction → alignment → recommendation
//! ```
//!
//! - [`SimilarityEngine`]: pairwise similarity and topic clustering
//! - [`ContradictionEngine`]: thought-vs-thought and prompt-vs-thought conflicts
//! - [`AlignmentEngine`]: prompt alignment, drift and missing aspects
//! - [`RecommendationEngine`]: strategies, biases, estimates and pattern analysis

mod alignment;
mod contradiction;
mod recommendation;
mod similarity;

pub use alignment::*;
pub use contradiction::*;
pub use recommendation::*;
pub use similarity::*;
