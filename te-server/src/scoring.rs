//! Scoring, ranking and peer averaging
//!
//! Pure functions over already-loaded rows; `api::results` does the loading.
//!
//! - Accuracy is `correct / total`, reported as a whole percentage in 0..=100.
//! - Rank is "top X%": the share of the ranked population (participants with
//!   at least one trial) strictly ahead, plus the participant, rounded up,
//!   in 1..=100.
//! - A peer average is the mean of per-participant accuracies in a bucket.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use te_common::db::{Participant, SourceType};

use crate::coerce::round_half_up;
use crate::db::stats::ParticipantScore;
use crate::db::trials::TrialDetail;

/// Whole percentage of `correct` out of `total`, clamped to 0..=100
pub fn percent(correct: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    round_half_up(100.0 * correct as f64 / total as f64).clamp(0, 100)
}

/// Whether `a` scored strictly better than `b`, compared as exact fractions
fn beats(a: &ParticipantScore, b: (i64, i64)) -> bool {
    let (b_correct, b_total) = b;
    a.correct * b_total > b_correct * a.total
}

/// "Top X%" rank of a `(correct, total)` score within `population`
///
/// `better` counts participants strictly ahead; the result is
/// `ceil(100 * (better + 1) / n)` clamped to 1..=100, and 100 for an empty
/// population.
pub fn rank_top_percent<'a, I>(mine: (i64, i64), population: I) -> i64
where
    I: IntoIterator<Item = &'a ParticipantScore>,
{
    let mut n = 0i64;
    let mut better = 0i64;
    for score in population {
        n += 1;
        if beats(score, mine) {
            better += 1;
        }
    }
    if n == 0 {
        return 100;
    }
    let top = (100 * (better + 1) + n - 1) / n;
    top.clamp(1, 100)
}

/// Mean accuracy percentage of the given participants; `None` if empty
pub fn peer_average<'a, I>(peers: I) -> Option<i64>
where
    I: IntoIterator<Item = &'a ParticipantScore>,
{
    let mut n = 0usize;
    let mut sum = 0.0f64;
    for score in peers {
        if score.total <= 0 {
            continue;
        }
        n += 1;
        sum += 100.0 * score.correct as f64 / score.total as f64;
    }
    if n == 0 {
        return None;
    }
    Some(round_half_up(sum / n as f64).clamp(0, 100))
}

/// One-sentence comparison against the global average
pub fn insight(score: i64, global_average: i64) -> String {
    let delta = score - global_average;
    if delta >= 10 {
        "You performed significantly better than the global average.".to_string()
    } else if delta > 0 {
        "You performed better than the global average.".to_string()
    } else if delta == 0 {
        "You performed in line with the global average.".to_string()
    } else {
        "You performed below the global average. AI images are getting harder to spot!"
            .to_string()
    }
}

// ============================================================================
// Results document
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlineMetrics {
    pub overall_accuracy: i64,
    pub correct_count: i64,
    pub total_count: i64,
    pub global_rank_top_percent: i64,
    pub country_rank_top_percent: i64,
    pub country_code: String,
    pub global_participants: i64,
    pub country_participants: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Primary,
    Contrast,
    Muted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerComparisonEntry {
    pub label: String,
    pub value: i64,
    pub tone: Tone,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerComparison {
    pub headline_percent: i64,
    pub entries: Vec<PeerComparisonEntry>,
    pub insight: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRow {
    pub category: String,
    pub correct: i64,
    pub total: i64,
    pub peer_avg: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerResult {
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRow {
    pub image_url: String,
    pub image_alt: String,
    pub correct_answer: String,
    pub user_guess: String,
    pub result: AnswerResult,
    pub origin: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsData {
    pub headline: HeadlineMetrics,
    pub peer_comparison: PeerComparison,
    pub categories: Vec<CategoryRow>,
    pub answers: Vec<AnswerRow>,
}

/// Assemble the results document for `participant`
///
/// `trials` are the participant's own trials, `population` every ranked
/// participant (the caller included), `category_totals` pooled
/// (correct, total) per category across everyone.
pub fn build_results(
    participant: &Participant,
    trials: &[TrialDetail],
    population: &[ParticipantScore],
    category_totals: &HashMap<String, (i64, i64)>,
) -> ResultsData {
    let correct = trials.iter().filter(|t| t.is_correct).count() as i64;
    let total = trials.len() as i64;
    let score = percent(correct, total);
    let mine = (correct, total);

    let country_peers: Vec<&ParticipantScore> = population
        .iter()
        .filter(|p| p.country_code == participant.country_code)
        .collect();

    let headline = HeadlineMetrics {
        overall_accuracy: score,
        correct_count: correct,
        total_count: total,
        global_rank_top_percent: rank_top_percent(mine, population),
        country_rank_top_percent: rank_top_percent(mine, country_peers.iter().copied()),
        country_code: participant.country_code.clone(),
        global_participants: population.len() as i64,
        country_participants: country_peers.len() as i64,
    };

    let global_average = peer_average(population).unwrap_or(score);
    let mut entries = vec![
        PeerComparisonEntry {
            label: "Your Score".to_string(),
            value: score,
            tone: Tone::Primary,
        },
        PeerComparisonEntry {
            label: "Global Average".to_string(),
            value: global_average,
            tone: Tone::Contrast,
        },
    ];

    let buckets: [(&str, Option<&str>, PeerAttribute); 4] = [
        ("By Age Range", participant.age_range.as_deref(), age_range),
        ("By Education Level", participant.education_level.as_deref(), education_level),
        ("By Occupation", participant.occupation_field.as_deref(), occupation_field),
        ("By Income Range", participant.income_bucket.as_deref(), income_bucket),
    ];
    for (label, own, attribute) in buckets {
        let Some(value) = own else { continue };
        let peers = population.iter().filter(|p| attribute(p) == Some(value));
        if let Some(average) = peer_average(peers) {
            entries.push(PeerComparisonEntry {
                label: format!("{} ({})", label, value),
                value: average,
                tone: Tone::Muted,
            });
        }
    }

    let peer_comparison = PeerComparison {
        headline_percent: score,
        entries,
        insight: insight(score, global_average),
    };

    ResultsData {
        headline,
        peer_comparison,
        categories: category_rows(trials, category_totals),
        answers: trials.iter().filter_map(answer_row).collect(),
    }
}

type PeerAttribute = fn(&ParticipantScore) -> Option<&str>;

fn age_range(p: &ParticipantScore) -> Option<&str> {
    p.age_range.as_deref()
}

fn education_level(p: &ParticipantScore) -> Option<&str> {
    p.education_level.as_deref()
}

fn occupation_field(p: &ParticipantScore) -> Option<&str> {
    p.occupation_field.as_deref()
}

fn income_bucket(p: &ParticipantScore) -> Option<&str> {
    p.income_bucket.as_deref()
}

fn category_rows(
    trials: &[TrialDetail],
    category_totals: &HashMap<String, (i64, i64)>,
) -> Vec<CategoryRow> {
    let mut mine: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for trial in trials {
        let entry = mine.entry(trial.category.as_str()).or_default();
        entry.0 += trial.is_correct as i64;
        entry.1 += 1;
    }

    mine.into_iter()
        .map(|(category, (correct, total))| {
            let peer_avg = category_totals
                .get(category)
                .map(|&(c, t)| percent(c, t))
                .unwrap_or_else(|| percent(correct, total));
            CategoryRow {
                category: category.to_string(),
                correct,
                total,
                peer_avg,
            }
        })
        .collect()
}

fn answer_row(trial: &TrialDetail) -> Option<AnswerRow> {
    let origin: SourceType = trial.source_type.parse().ok()?;
    let guess: SourceType = trial.user_choice.parse().ok()?;

    Some(AnswerRow {
        image_url: trial.image_url.clone(),
        image_alt: format!("{} {} thumbnail", origin.label(), trial.category),
        correct_answer: origin.label().to_string(),
        user_guess: guess.label().to_string(),
        result: if trial.is_correct {
            AnswerResult::Correct
        } else {
            AnswerResult::Incorrect
        },
        origin,
        author: trial.author.clone(),
        model: trial.model.clone(),
        created_at: trial.created_at.clone(),
        confidence: (trial.confidence > 0).then_some(trial.confidence),
    })
}
