use serde::{Deserialize, Serialize};

/// Hybrid search weighting. The defaults are empirically tuned values
/// carried as configuration, not asserted-correct invariants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchWeights {
    pub vector: f64,
    pub keyword: f64,
    pub category_boost: f64,
    pub name_boost: f64,
    pub tag_boost: f64,
    pub description_boost: f64,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            vector: 0.7,
            keyword: 1.5,
            category_boost: 0.3,
            name_boost: 0.2,
            tag_boost: 0.15,
            description_boost: 0.1,
        }
    }
}

/// Optional equality filters applied before scoring.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub requirement_type: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub similarity: f64,
    pub keyword_boost: f64,
    pub score: f64,
}

/// A filtered candidate row as it comes back from the store, before scoring.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub similarity: f64,
}

/// Highest matching tier wins: category > name > tag > description.
pub fn keyword_boost(query_text: &str, candidate: &Candidate, weights: &SearchWeights) -> f64 {
    let query = query_text.trim().to_lowercase();
    if query.is_empty() {
        return 0.0;
    }
    if candidate.category.to_lowercase().contains(&query) {
        return weights.category_boost;
    }
    if candidate.name.to_lowercase().contains(&query) {
        return weights.name_boost;
    }
    if candidate
        .tags
        .iter()
        .any(|tag| tag.to_lowercase().contains(&query))
    {
        return weights.tag_boost;
    }
    if candidate.description.to_lowercase().contains(&query) {
        return weights.description_boost;
    }
    0.0
}

/// Score, floor-filter, sort descending, truncate.
///
/// The similarity floor never suppresses keyword matches: a row with a
/// non-zero boost is kept even below `min_similarity`.
pub fn rank(
    candidates: Vec<Candidate>,
    query_text: &str,
    weights: &SearchWeights,
    limit: usize,
    min_similarity: Option<f64>,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .map(|candidate| {
            let boost = keyword_boost(query_text, &candidate, weights);
            let score = weights.vector * candidate.similarity + weights.keyword * boost;
            SearchHit {
                id: candidate.id,
                name: candidate.name,
                description: candidate.description,
                category: candidate.category,
                tags: candidate.tags,
                similarity: candidate.similarity,
                keyword_boost: boost,
                score,
            }
        })
        .filter(|hit| match min_similarity {
            Some(floor) => hit.score >= floor || hit.keyword_boost > 0.0,
            None => true,
        })
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}
