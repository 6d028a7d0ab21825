use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::JobSettings;
use crate::knowledge::{JobEntry, KnowledgeBase};
use crate::matching::{content_terms, tokenize, NormalizedText, TermMatcher};

pub const GENERAL_JOB: &str = "general";

/// Structured reading of the declared task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobProfile {
    pub job_type: String,
    pub confidence: f64,
    pub priority_weights: BTreeMap<String, f64>,
    pub matched_patterns: Vec<String>,
    /// Content words of the task text.
    pub task_terms: Vec<String>,
}

impl JobProfile {
    pub fn is_general(&self) -> bool {
        self.job_type == GENERAL_JOB
    }

    /// Priority weight of `tier`, zero when the job does not mention it.
    pub fn weight(&self, tier: &str) -> f64 {
        self.priority_weights.get(tier).copied().unwrap_or(0.0)
    }
}

/// Maps free-text task descriptions onto the job-pattern table.
#[derive(Debug, Clone)]
pub struct JobAnalyzer {
    knowledge: Arc<KnowledgeBase>,
    matcher: Arc<TermMatcher>,
    settings: JobSettings,
}

impl JobAnalyzer {
    pub fn new(knowledge: Arc<KnowledgeBase>, matcher: Arc<TermMatcher>, settings: JobSettings) -> Self {
        Self {
            knowledge,
            matcher,
            settings,
        }
    }

    /// Never fails: unmatched text yields the `general` profile.
    pub fn analyze(&self, task_text: &str) -> JobProfile {
        let text = self.matcher.normalize(task_text);
        let task_terms = content_terms(task_text);

        let mut best: Option<(&JobEntry, f64, Vec<String>)> = None;
        for job in &self.knowledge.jobs {
            let (score, matched) = self.match_score(&text, job);
            debug!(job = %job.name, score, "job match score");
            if score > 0.0 && best.as_ref().map_or(true, |(_, top, _)| score > *top) {
                best = Some((job, score, matched));
            }
        }

        match best {
            Some((job, score, matched_patterns)) => JobProfile {
                job_type: job.name.clone(),
                confidence: (score / self.settings.confidence_saturation).clamp(0.0, 1.0),
                priority_weights: job.priority_weights.clone(),
                matched_patterns,
                task_terms,
            },
            None => self.general(task_terms),
        }
    }

    /// Each matched pattern scores its specificity; longer phrases are more
    /// specific than single words.
    fn match_score(&self, text: &NormalizedText, job: &JobEntry) -> (f64, Vec<String>) {
        let mut score = 0.0;
        let mut matched = Vec::new();
        for pattern in &job.patterns {
            if self.matcher.contains(text, pattern) {
                score += tokenize(pattern).len() as f64 * self.settings.specificity_per_word;
                matched.push(pattern.clone());
            }
        }
        (score, matched)
    }

    /// Uniform weights over every known tier. Confidence reflects how many
    /// task words at least overlap the persona vocabulary.
    fn general(&self, task_terms: Vec<String>) -> JobProfile {
        let universe = self.knowledge.tier_universe();
        let uniform = 1.0 / universe.len().max(1) as f64;
        let priority_weights = universe.into_iter().map(|t| (t, uniform)).collect();

        let confidence = if task_terms.is_empty() {
            0.0
        } else {
            let hits = task_terms
                .iter()
                .filter(|term| self.in_vocabulary(term))
                .count();
            (self.settings.general_confidence_cap * hits as f64 / task_terms.len() as f64)
                .clamp(0.0, self.settings.general_confidence_cap)
        };

        JobProfile {
            job_type: GENERAL_JOB.to_string(),
            confidence,
            priority_weights,
            matched_patterns: Vec::new(),
            task_terms,
        }
    }

    fn in_vocabulary(&self, term: &str) -> bool {
        let normalized = self.matcher.normalize(term);
        self.knowledge
            .personas
            .iter()
            .flat_map(|p| p.tiers.iter())
            .flat_map(|t| t.keywords.iter())
            .any(|kw| self.matcher.contains(&normalized, kw))
    }
}
