use analysis_core::stats::round_to;
use analysis_core::{AnalysisError, NewsArticle, SignalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const POSITIVE_WORDS: &[&str] = &[
    "surge", "surges", "jump", "jumps", "gain", "gains", "rise", "rises", "soar", "soars",
    "rally", "rallies", "bull", "bullish", "boom", "growth", "profit", "beat", "beats",
    "exceed", "exceeds", "upgrade", "upgraded", "buy", "strong", "record", "high", "success",
    "win", "wins", "breakthrough", "innovation", "positive", "optimistic", "confidence",
    "recovery", "rebound", "outperform", "momentum", "dividend", "buyback", "upside",
    "robust", "accelerating", "overweight", "tailwind",
];

const NEGATIVE_WORDS: &[&str] = &[
    "fall", "falls", "drop", "drops", "plunge", "plunges", "crash", "decline", "declines",
    "loss", "losses", "bear", "bearish", "miss", "misses", "fail", "fails", "downgrade",
    "downgraded", "sell", "weak", "low", "concern", "concerns", "fear", "fears", "risk",
    "warning", "cut", "cuts", "layoff", "layoffs", "lawsuit", "fraud", "investigation",
    "negative", "pessimistic", "recession", "crisis", "slump", "underperform", "headwind",
    "bankruptcy", "probe", "dilution", "underweight",
];

const POSITIVE_PHRASES: &[&str] = &[
    "beat expectations", "beats expectations", "raised guidance", "raises guidance",
    "record revenue", "record high", "all-time high", "price target raised", "strong buy",
    "better than expected",
];

const NEGATIVE_PHRASES: &[&str] = &[
    "missed expectations", "misses expectations", "cut guidance", "cuts guidance",
    "lowered guidance", "price target cut", "profit warning", "all-time low",
    "going concern", "worse than expected",
];

/// A multi-word phrase counts as this many single words.
const PHRASE_WEIGHT: f64 = 3.0;
const LABEL_THRESHOLD: f64 = 0.05;
/// Publish-time age assumed for articles without a timestamp.
const UNKNOWN_AGE_HOURS: f64 = 168.0;
const MAX_HEADLINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score > LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score < -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHeadline {
    pub title: String,
    pub score: f64,
    pub sentiment: SentimentLabel,
    pub age_hours: Option<f64>,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub articles_analyzed: usize,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub weighted_score: f64,
    pub recent_headlines: Vec<ScoredHeadline>,
}

/// Lexicon-based headline scorer.
pub struct SentimentAnalysisEngine {
    positive_words: HashSet<&'static str>,
    negative_words: HashSet<&'static str>,
    negation_words: HashSet<&'static str>,
    positive_phrases: Vec<Vec<&'static str>>,
    negative_phrases: Vec<Vec<&'static str>>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|w| w.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_phrases(phrases: &[&'static str]) -> Vec<Vec<&'static str>> {
    let mut out: Vec<Vec<&'static str>> = phrases.iter().map(|p| p.split(' ').collect()).collect();
    // Longest first so "price target raised" wins over any shorter overlap
    out.sort_by(|a, b| b.len().cmp(&a.len()));
    out
}

/// Recency weight for a headline of the given age; unknown ages fall in the one-week cohort.
pub fn recency_weight(age_hours: Option<f64>) -> f64 {
    let age = age_hours.unwrap_or(UNKNOWN_AGE_HOURS);
    if age <= 24.0 {
        1.0
    } else if age <= 72.0 {
        0.7
    } else if age <= 168.0 {
        0.4
    } else {
        0.2
    }
}

impl SentimentAnalysisEngine {
    pub fn new() -> Self {
        Self {
            positive_words: POSITIVE_WORDS.iter().copied().collect(),
            negative_words: NEGATIVE_WORDS.iter().copied().collect(),
            negation_words: NEGATION_WORDS.iter().copied().collect(),
            positive_phrases: split_phrases(POSITIVE_PHRASES),
            negative_phrases: split_phrases(NEGATIVE_PHRASES),
        }
    }

    fn phrase_at(&self, words: &[String], i: usize) -> Option<(usize, f64)> {
        let matches = |phrase: &Vec<&str>| {
            words.len() >= i + phrase.len() && phrase.iter().zip(&words[i..]).all(|(p, w)| *p == w.as_str())
        };
        if let Some(p) = self.positive_phrases.iter().find(|p| matches(p)) {
            return Some((p.len(), 1.0));
        }
        if let Some(p) = self.negative_phrases.iter().find(|p| matches(p)) {
            return Some((p.len(), -1.0));
        }
        None
    }

    /// Polarity in [-1, 1]: `(pos - neg) / (pos + neg)` over lexicon hits.
    ///
    /// Phrases count three times a single word; a negation word directly before
    /// a hit flips its polarity.
    pub fn score_text(&self, text: &str) -> f64 {
        let words = tokenize(text);
        let mut positive = 0.0;
        let mut negative = 0.0;

        let mut i = 0;
        while i < words.len() {
            let (len, polarity, weight) = if let Some((len, polarity)) = self.phrase_at(&words, i) {
                (len, polarity, PHRASE_WEIGHT)
            } else if self.positive_words.contains(words[i].as_str()) {
                (1, 1.0, 1.0)
            } else if self.negative_words.contains(words[i].as_str()) {
                (1, -1.0, 1.0)
            } else {
                i += 1;
                continue;
            };

            let negated = i > 0 && self.negation_words.contains(words[i - 1].as_str());
            let polarity = if negated { -polarity } else { polarity };
            if polarity > 0.0 {
                positive += weight;
            } else {
                negative += weight;
            }
            i += len;
        }

        let total = positive + negative;
        if total == 0.0 {
            return 0.0;
        }
        (positive - negative) / total
    }

    /// Recency-weighted headline sentiment as of `as_of`.
    ///
    /// An empty batch is a valid, neutral result rather than an error.
    pub fn analyze(&self, news: &[NewsArticle], as_of: DateTime<Utc>) -> Result<SignalResult<SentimentReading>, AnalysisError> {
        if news.is_empty() {
            return Ok(SignalResult::new(0.0, "No recent news", SentimentReading::default()));
        }

        let mut reading = SentimentReading {
            articles_analyzed: news.len(),
            ..Default::default()
        };
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for article in news {
            let score = self.score_text(&article.title);
            let age_hours = article
                .published_utc
                .map(|published| (as_of - published).num_seconds() as f64 / 3600.0);
            let weight = recency_weight(age_hours);
            let sentiment = SentimentLabel::from_score(score);

            match sentiment {
                SentimentLabel::Positive => reading.positive_count += 1,
                SentimentLabel::Negative => reading.negative_count += 1,
                SentimentLabel::Neutral => reading.neutral_count += 1,
            }
            weighted_sum += score * weight;
            weight_total += weight;

            if reading.recent_headlines.len() < MAX_HEADLINES {
                reading.recent_headlines.push(ScoredHeadline {
                    title: article.title.clone(),
                    score: round_to(score, 3),
                    sentiment,
                    age_hours: age_hours.map(|a| round_to(a, 1)),
                    weight,
                });
            }
        }

        let weighted = if weight_total > 0.0 { weighted_sum / weight_total } else { 0.0 };
        reading.weighted_score = round_to(weighted, 3);

        let interpretation = format!(
            "{} ({} positive, {} negative of {} headlines)",
            match SentimentLabel::from_score(weighted) {
                SentimentLabel::Positive => "Positive",
                SentimentLabel::Negative => "Negative",
                SentimentLabel::Neutral => "Neutral",
            },
            reading.positive_count,
            reading.negative_count,
            reading.articles_analyzed
        );

        tracing::debug!(articles = news.len(), weighted, "scored news sentiment");
        Ok(SignalResult::new(weighted, interpretation, reading))
    }
}

impl Default for SentimentAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}
