//! Text feature extraction.
//!
//! Tokenization, stopword filtering, n-gram keyword extraction, light
//! stemming and string-distance utilities shared by every analysis engine.
//! All functions are pure; the only cached state lives in
//! [`HashVectorizer`].

mod vectorizer;

pub use vectorizer::*;

use std::collections::{BTreeSet, HashMap};

/// Common English words that carry no topical signal.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "can't", "cannot", "could", "couldn't", "did", "didn't", "do", "does",
    "doesn't", "doing", "don't", "down", "during", "each", "few", "for", "from", "further", "had",
    "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "i'm", "if",
    "in", "into", "is", "isn't", "it", "it's", "its", "itself", "just", "me", "more", "most",
    "must", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
    "our", "ours", "out", "over", "own", "same", "she", "should", "shouldn't", "so", "some",
    "such", "than", "that", "the", "their", "them", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "wasn't", "we",
    "were", "weren't", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
    "with", "won't", "would", "wouldn't", "you", "your", "yours",
];

/// Words that negate the statement they precede.
pub const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "none", "cannot", "can't", "don't", "doesn't", "didn't", "isn't",
    "wasn't", "aren't", "weren't", "won't", "wouldn't", "shouldn't", "couldn't", "without",
    "neither", "nor", "false", "incorrect",
];

/// Returns true if `word` (already lowercase) is a stopword.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Returns true if `word` (already lowercase) is a negation word.
pub fn is_negation(word: &str) -> bool {
    NEGATION_WORDS.contains(&word)
}

/// Split text into lowercase words.
///
/// A word is a run of alphanumeric characters, optionally joined by inner
/// apostrophes or hyphens (`can't`, `built-in`).
pub fn words(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        let ch = if ch == '\u{2019}' { '\'' } else { ch };
        if ch.is_alphanumeric() || ch == '\'' || ch == '-' {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            push_word(&mut out, &mut current);
        }
    }
    if !current.is_empty() {
        push_word(&mut out, &mut current);
    }

    out
}

fn push_word(out: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim_matches(|c| c == '\'' || c == '-');
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

/// Lowercase, stopword-filtered tokens in text order.
pub fn tokenize(text: &str) -> Vec<String> {
    words(text).into_iter().filter(|w| !is_stopword(w)).collect()
}

/// Split text into trimmed, non-empty sentences.
pub fn sentences(text: &str) -> Vec<String> {
    text.split(|c| matches!(c, '.' | '!' | '?' | ';' | '\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Whether an n-gram of lowercase words is worth keeping as a phrase.
pub fn is_significant(phrase: &[String]) -> bool {
    match phrase {
        [] => false,
        [single] => single.chars().count() > 3 && !is_stopword(single),
        [first, .., last] => {
            !phrase.iter().all(|w| is_stopword(w)) && !is_stopword(first) && !is_stopword(last)
        }
    }
}

/// Contiguous significant phrases of `min..=max` words, in text order.
pub fn ngrams(words: &[String], min: usize, max: usize) -> Vec<String> {
    let min = min.max(1);
    let mut out = Vec::new();

    for start in 0..words.len() {
        for n in min..=max {
            let Some(window) = words.get(start..start + n) else {
                break;
            };
            if is_significant(window) {
                out.push(window.join(" "));
            }
        }
    }

    out
}

/// Rank significant 1-3 word phrases of `text` and keep the top `limit`.
///
/// Ranking is by frequency, then shorter phrases, then first occurrence.
/// Phrases never span sentence boundaries.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    // phrase -> (count, word count, first position)
    let mut stats: HashMap<String, (usize, usize, usize)> = HashMap::new();
    let mut position = 0usize;

    for sentence in sentences(text) {
        for phrase in ngrams(&words(&sentence), 1, 3) {
            let len = phrase.split(' ').count();
            stats
                .entry(phrase)
                .and_modify(|entry| entry.0 += 1)
                .or_insert((1, len, position));
            position += 1;
        }
    }

    let mut ranked: Vec<(String, (usize, usize, usize))> = stats.into_iter().collect();
    ranked.sort_by(|(_, a), (_, b)| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
    ranked.into_iter().take(limit).map(|(p, _)| p).collect()
}

/// Set of significant single-word keywords.
pub fn keyword_set(text: &str) -> BTreeSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() > 3)
        .collect()
}

/// Jaccard index of two sets; 0.0 when both are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// True if `phrase` occurs as a contiguous word sequence in `haystack`.
pub fn contains_phrase(haystack: &[String], phrase: &[String]) -> bool {
    if phrase.is_empty() || phrase.len() > haystack.len() {
        return false;
    }
    haystack.windows(phrase.len()).any(|w| w == phrase)
}

const STEM_SUFFIXES: &[(&str, &str)] = &[
    ("ingly", ""),
    ("ings", ""),
    ("ing", ""),
    ("ments", ""),
    ("ment", ""),
    ("ness", ""),
    ("tions", "t"),
    ("tion", "t"),
    ("edly", ""),
    ("ies", "y"),
    ("ied", "y"),
    ("ed", ""),
    ("es", ""),
    ("ly", ""),
    ("s", ""),
];

/// Light suffix-stripping stemmer. Never shortens a word below 3 characters.
pub fn stem(word: &str) -> String {
    let word = word.to_lowercase();
    let mut stemmed = word.clone();

    for (suffix, replacement) in STEM_SUFFIXES {
        if *suffix == "s" && word.ends_with("ss") {
            continue;
        }
        if let Some(base) = word.strip_suffix(suffix) {
            if base.chars().count() + replacement.len() >= 3 {
                stemmed = format!("{}{}", base, replacement);
                break;
            }
        }
    }

    if stemmed.chars().count() >= 4 && stemmed.ends_with('e') {
        stemmed.pop();
    }

    stemmed
}

/// Character-level Levenshtein distance.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Normalized edit-distance similarity in `[0, 1]`, case-insensitive.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

/// Relevance of a short phrase to a sentence in `[0, 1]`.
///
/// Blend of word-overlap Jaccard (0.4), edit-distance similarity (0.3) and
/// the fraction of the phrase's stems found in the sentence (0.3).
pub fn phrase_relevance(phrase: &str, sentence: &str) -> f64 {
    let phrase_tokens: BTreeSet<String> = tokenize(phrase).into_iter().collect();
    let sentence_tokens: BTreeSet<String> = tokenize(sentence).into_iter().collect();

    let overlap = jaccard(&phrase_tokens, &sentence_tokens);
    let edit = string_similarity(phrase, sentence);

    let phrase_stems: BTreeSet<String> = phrase_tokens.iter().map(|t| stem(t)).collect();
    let sentence_stems: BTreeSet<String> = sentence_tokens.iter().map(|t| stem(t)).collect();
    let stem_match = if phrase_stems.is_empty() {
        0.0
    } else {
        phrase_stems.intersection(&sentence_stems).count() as f64 / phrase_stems.len() as f64
    };

    (0.4 * overlap + 0.3 * edit + 0.3 * stem_match).clamp(0.0, 1.0)
}

/// Best [`phrase_relevance`] of `phrase` against any sentence of `text`.
pub fn best_sentence_relevance(phrase: &str, text: &str) -> f64 {
    sentences(text)
        .iter()
        .map(|s| phrase_relevance(phrase, s))
        .fold(0.0, f64::max)
}

/// Truncate text to at most `max` characters, appending an ellipsis when cut.
pub fn summarize(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}
