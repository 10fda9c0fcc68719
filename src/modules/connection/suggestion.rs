use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{modules::user::schema::UserEntity, utils::fold_case};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionWeights {
    pub mutual: u32,
    pub university: u32,
    pub major: u32,
    pub interest: u32,
}

impl Default for SuggestionWeights {
    fn default() -> Self {
        Self { mutual: 10, university: 20, major: 15, interest: 5 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SuggestionSettings {
    pub weights: SuggestionWeights,
    /// Upper bound on candidates loaded per scoring pass.
    pub pool_size: i64,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self { weights: SuggestionWeights::default(), pool_size: 500 }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub user: UserEntity,
    pub mutual_connections_count: usize,
    pub common_university: bool,
    pub common_major: bool,
    pub common_interests: Vec<String>,
    pub score: u32,
}

fn same_text(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let a = fold_case(a);
            !a.is_empty() && a == fold_case(b)
        }
        _ => false,
    }
}

/// Lowercased interests of `me` that `other` shares, in `me`'s order.
fn shared_interests(me: &[String], other: &[String]) -> Vec<String> {
    let theirs: HashSet<String> = other.iter().map(|i| fold_case(i)).collect();
    let mut seen = HashSet::new();
    me.iter()
        .map(|i| fold_case(i))
        .filter(|i| !i.is_empty() && theirs.contains(i) && seen.insert(i.clone()))
        .collect()
}

pub fn score(
    me: &UserEntity,
    candidate: UserEntity,
    mutual_count: usize,
    weights: &SuggestionWeights,
) -> ScoredCandidate {
    let common_university = same_text(me.university.as_deref(), candidate.university.as_deref());
    let common_major = same_text(me.major.as_deref(), candidate.major.as_deref());
    let common_interests = shared_interests(&me.interests, &candidate.interests);

    let mutual = u32::try_from(mutual_count).unwrap_or(u32::MAX);
    let interests = u32::try_from(common_interests.len()).unwrap_or(u32::MAX);

    let score = weights
        .mutual
        .saturating_mul(mutual)
        .saturating_add(if common_university { weights.university } else { 0 })
        .saturating_add(if common_major { weights.major } else { 0 })
        .saturating_add(weights.interest.saturating_mul(interests));

    ScoredCandidate {
        user: candidate,
        mutual_connections_count: mutual_count,
        common_university,
        common_major,
        common_interests,
        score,
    }
}

/// Scores every eligible candidate and orders them by score descending, then id ascending.
/// Candidates in `exclude`, the caller, duplicates and zero scores are dropped.
pub fn rank(
    me: &UserEntity,
    candidates: Vec<UserEntity>,
    mutual_counts: &HashMap<Uuid, usize>,
    exclude: &HashSet<Uuid>,
    weights: &SuggestionWeights,
) -> Vec<ScoredCandidate> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter(|c| c.id != me.id && !exclude.contains(&c.id) && c.is_visible())
        .filter(|c| seen.insert(c.id))
        .map(|c| {
            let mutual = mutual_counts.get(&c.id).copied().unwrap_or(0);
            score(me, c, mutual, weights)
        })
        .filter(|s| s.score > 0)
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.user.id.cmp(&b.user.id)));
    ranked
}
