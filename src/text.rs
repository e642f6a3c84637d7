//! Small keyword-based NLP helpers shared by the Insight Aggregator (§4.G)
//! and the Knowledge-Graph Builder's extraction fallback (§4.H). None of
//! this calls an LLM — it's the deterministic path used when no model is
//! configured, or as the scoring layer underneath clustering.

const POSITIVE_WORDS: &[&str] = &[
    "love", "great", "excellent", "amazing", "good", "like", "best", "fantastic", "wonderful",
    "happy", "perfect", "awesome", "enjoy", "nice", "impressive", "useful", "easy", "helpful",
    "recommend", "satisfied",
];

const NEGATIVE_WORDS: &[&str] = &[
    "hate", "terrible", "awful", "bad", "worst", "dislike", "disappointing", "poor", "annoying",
    "frustrating", "useless", "difficult", "confusing", "broken", "waste", "expensive", "slow",
    "unhappy", "angry", "worried",
];

/// Lowercase, split on non-alphanumeric boundaries, drop stopwords, numeric
/// tokens, and anything shorter than 3 characters.
pub fn tokenize(text: &str, stopwords: &[String]) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !stopwords.iter().any(|s| s == w))
        .map(|w| w.to_string())
        .collect()
}

/// Positive-minus-negative keyword balance, normalized to [-1, 1]. Zero when
/// neither kind of word appears.
pub fn score_sentiment(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let pos = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
    let neg = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
    if pos + neg == 0.0 {
        0.0
    } else {
        (pos - neg) / (pos + neg)
    }
}

const EMOTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("Joy", &["happy", "love", "joy", "delight", "excited", "great", "amazing"]),
    ("Anger", &["angry", "hate", "furious", "annoyed", "frustrating", "frustrated"]),
    ("Sadness", &["sad", "disappointed", "disappointing", "unhappy", "upset"]),
    ("Fear", &["worried", "afraid", "scared", "anxious", "nervous"]),
    ("Surprise", &["surprised", "shocked", "unexpected", "wow"]),
];

/// Assign up to two emotion labels by fixed keyword match, falling back to a
/// sentiment-derived label when no keyword hits (§4.H fallback step v).
pub fn detect_emotions(text: &str, sentiment: f64) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found: Vec<String> = EMOTION_KEYWORDS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(label, _)| label.to_string())
        .collect();

    if found.is_empty() {
        found.push(if sentiment > 0.3 {
            "Joy".to_string()
        } else if sentiment < -0.3 {
            "Anger".to_string()
        } else {
            "Neutral".to_string()
        });
    }
    found.truncate(2);
    found
}

/// Collapse all whitespace runs (including newlines) to a single space and
/// trim the ends. Used for single-line identity fields.
pub fn sanitize_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace within each paragraph while preserving paragraph
/// breaks (blank lines), for narrative text such as a background story.
pub fn sanitize_narrative(text: &str) -> String {
    text.split("\n\n")
        .map(sanitize_line)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn count_ngrams<'a>(tokens: &'a [String], n: usize) -> Vec<(String, usize)> {
    use std::collections::HashMap;
    let mut counts: HashMap<String, usize> = HashMap::new();
    if tokens.len() < n {
        return Vec::new();
    }
    for window in tokens.windows(n) {
        let phrase = window.join(" ");
        *counts.entry(phrase).or_insert(0) += 1;
    }
    let mut out: Vec<(String, usize)> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Fallback concept extraction: bigrams first, then unigrams not already
/// covered by a chosen bigram, capped at `limit` (§4.H fallback steps i-iii).
pub fn fallback_concepts(text: &str, stopwords: &[String], limit: usize) -> Vec<String> {
    let tokens = tokenize(text, stopwords);
    let bigrams = count_ngrams(&tokens, 2);
    let unigrams = count_ngrams(&tokens, 1);

    let mut chosen = Vec::new();
    let mut covered_words: std::collections::HashSet<String> = std::collections::HashSet::new();

    for (phrase, _) in bigrams.iter() {
        if chosen.len() >= limit {
            break;
        }
        chosen.push(phrase.clone());
        for word in phrase.split(' ') {
            covered_words.insert(word.to_string());
        }
    }

    for (word, _) in unigrams.iter() {
        if chosen.len() >= limit {
            break;
        }
        if covered_words.contains(word) {
            continue;
        }
        chosen.push(word.clone());
    }

    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_sentiment_positive_and_negative() {
        assert!(score_sentiment("I love this, it's great") > 0.0);
        assert!(score_sentiment("I hate this, it's terrible") < 0.0);
        assert_eq!(score_sentiment("The sky is blue"), 0.0);
    }

    #[test]
    fn test_tokenize_drops_stopwords_and_short_tokens() {
        let stopwords = vec!["the".to_string(), "is".to_string()];
        let tokens = tokenize("The car is red and fast", &stopwords);
        assert_eq!(tokens, vec!["car", "red", "and", "fast"]);
    }

    #[test]
    fn test_fallback_concepts_prefers_bigrams() {
        let stopwords: Vec<String> = Vec::new();
        let text = "electric cars electric cars are efficient and electric cars are quiet";
        let concepts = fallback_concepts(text, &stopwords, 3);
        assert!(concepts.contains(&"electric cars".to_string()));
    }

    #[test]
    fn test_detect_emotions_falls_back_to_sentiment() {
        let emotions = detect_emotions("The weather is mild today", 0.5);
        assert_eq!(emotions, vec!["Joy".to_string()]);
    }

    #[test]
    fn test_sanitize_line_collapses_internal_whitespace() {
        assert_eq!(sanitize_line("  Jane   \n Kowalski\t "), "Jane Kowalski");
    }

    #[test]
    fn test_sanitize_narrative_preserves_paragraph_breaks() {
        let input = "Grew up   in Warsaw.\n\n\nStudied  design\nat university.";
        let out = sanitize_narrative(input);
        assert_eq!(out, "Grew up in Warsaw.\n\nStudied design at university.");
    }
}
