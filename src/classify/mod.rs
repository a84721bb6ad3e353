//! Keyword-scoring layer classifier.
//!
//! Scores each of the seven layers by counting substring keyword matches
//! against lower-cased input text. The built-in keyword table is an
//! immutable constant; caller-supplied extra keywords are merged
//! functionally per call, so concurrent classifications can never observe
//! each other. Ties break by the fixed layer-priority order
//! ([`Layer::ALL`]), not match order, for determinism.

use std::collections::HashMap;

use crate::models::Layer;

/// Built-in keyword table. Matching is lowercase substring, so keep entries
/// lowercase and specific enough not to fire on fragments.
const BUILTIN_KEYWORDS: [(Layer, &[&str]); 7] = [
    (
        Layer::Economics,
        &[
            "salary", "invoice", "bank", "payment", "purchase", "bought", "sold", "rent",
            "mortgage", "invest", "tax", "budget", "paycheck", "refund",
        ],
    ),
    (
        Layer::Education,
        &[
            "school", "university", "college", "course", "lecture", "exam", "study", "homework",
            "degree", "class", "tutorial", "seminar", "thesis",
        ],
    ),
    (
        Layer::Work,
        &[
            "meeting", "project", "deadline", "office", "client", "interview", "standup",
            "presentation", "shift", "conference", "sprint", "review", "colleague",
        ],
    ),
    (
        Layer::Health,
        &[
            "doctor", "dentist", "gym", "workout", "run", "yoga", "hospital", "medication",
            "appointment", "therapy", "checkup", "vaccine", "sleep", "diet",
        ],
    ),
    (
        Layer::Relationships,
        &[
            "birthday", "wedding", "anniversary", "dinner with", "date night", "family", "friend",
            "party", "visit", "mom", "dad", "reunion",
        ],
    ),
    (
        Layer::Travel,
        &[
            "flight", "hotel", "airport", "trip", "vacation", "train", "booking", "passport",
            "itinerary", "beach", "tour", "roadtrip", "airbnb",
        ],
    ),
    (
        Layer::Media,
        &[
            "movie", "film", "concert", "album", "book", "series", "episode", "game", "podcast",
            "museum", "exhibition", "photo", "video",
        ],
    ),
];

/// Fixed bonus added to the travel score when the caller reports a
/// populated location field.
const LOCATION_TRAVEL_BONUS: u32 = 2;

/// Per-call classifier configuration.
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// Extra keywords merged over the built-in table (functional merge,
    /// the built-in table is never mutated).
    pub extra_keywords: HashMap<Layer, Vec<String>>,
    /// Scores strictly below this fall back to the default layer.
    /// Zero behaves like one: an empty match never classifies.
    pub min_score: u32,
    /// The record being classified has a populated location field.
    pub location_populated: bool,
}

impl ClassifyOptions {
    pub fn new() -> Self {
        Self { extra_keywords: HashMap::new(), min_score: 1, location_populated: false }
    }
}

/// A classification outcome: the winning layer, its score, and the
/// keywords that matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub layer: Layer,
    pub score: u32,
    pub matched: Vec<String>,
}

/// Classify free text into one of the seven layers.
///
/// Highest score wins; ties break by [`Layer::ALL`] priority order. A total
/// below `min_score` yields the default layer with the (sub-threshold)
/// matches still reported.
pub fn classify(text: &str, opts: &ClassifyOptions) -> Classification {
    let lower = text.to_lowercase();
    let min_score = opts.min_score.max(1);

    let mut best: Option<Classification> = None;
    // Priority order doubles as tie-break: an equal later score never
    // replaces an earlier one.
    for layer in Layer::ALL {
        let (score, matched) = score_layer(layer, &lower, opts);
        if score > 0 && best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(Classification { layer, score, matched });
        }
    }

    match best {
        Some(c) if c.score >= min_score => c,
        Some(c) => Classification { layer: Layer::default(), score: c.score, matched: c.matched },
        None => Classification { layer: Layer::default(), score: 0, matched: Vec::new() },
    }
}

/// Classify several structured fields as one text (title, description,
/// place name...). Fields are joined with spaces before scoring so a
/// keyword split across fields does not accidentally match.
pub fn classify_fields(fields: &[&str], opts: &ClassifyOptions) -> Classification {
    let joined = fields.join(" ");
    classify(&joined, opts)
}

/// Every layer with a positive score, ordered by score descending then
/// priority order.
pub fn classify_multi(text: &str, opts: &ClassifyOptions) -> Vec<Classification> {
    let lower = text.to_lowercase();
    let mut all: Vec<Classification> = Layer::ALL
        .iter()
        .filter_map(|&layer| {
            let (score, matched) = score_layer(layer, &lower, opts);
            (score > 0).then_some(Classification { layer, score, matched })
        })
        .collect();
    // Stable sort: equal scores keep priority order.
    all.sort_by(|a, b| b.score.cmp(&a.score));
    all
}

fn score_layer(layer: Layer, lower_text: &str, opts: &ClassifyOptions) -> (u32, Vec<String>) {
    let mut score = 0u32;
    let mut matched = Vec::new();

    let builtin = BUILTIN_KEYWORDS
        .iter()
        .find(|(l, _)| *l == layer)
        .map(|(_, kws)| *kws)
        .unwrap_or(&[]);
    let extra = opts.extra_keywords.get(&layer);

    let keywords = builtin
        .iter()
        .map(|k| *k)
        .chain(extra.into_iter().flatten().map(String::as_str));

    for keyword in keywords {
        if !keyword.is_empty() && lower_text.contains(&keyword.to_lowercase()) {
            score += 1;
            matched.push(keyword.to_string());
        }
    }

    if layer == Layer::Travel && opts.location_populated {
        score += LOCATION_TRAVEL_BONUS;
    }

    (score, matched)
}
