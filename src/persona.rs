use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::PersonaSettings;
use crate::knowledge::{FocusTier, KnowledgeBase, PersonaEntry};
use crate::matching::{NormalizedText, TermMatcher};

pub const UNKNOWN_PERSONA: &str = "unknown";

/// Structured reading of the declared role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaProfile {
    pub role_label: String,
    pub confidence: f64,
    pub focus_keywords: Vec<FocusTier>,
}

impl PersonaProfile {
    pub fn unknown() -> Self {
        Self {
            role_label: UNKNOWN_PERSONA.to_string(),
            confidence: 0.0,
            focus_keywords: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.role_label == UNKNOWN_PERSONA
    }

    pub fn tier(&self, name: &str) -> Option<&FocusTier> {
        self.focus_keywords.iter().find(|t| t.name == name)
    }
}

/// Maps free-text role descriptions onto the persona table.
#[derive(Debug, Clone)]
pub struct PersonaAnalyzer {
    knowledge: Arc<KnowledgeBase>,
    matcher: Arc<TermMatcher>,
    settings: PersonaSettings,
}

impl PersonaAnalyzer {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        matcher: Arc<TermMatcher>,
        settings: PersonaSettings,
    ) -> Self {
        Self {
            knowledge,
            matcher,
            settings,
        }
    }

    /// Never fails: text with no keyword hit yields the `unknown` profile.
    ///
    /// The persona with the highest weighted hit score wins; on equal scores
    /// the one declared first in the table is kept.
    pub fn analyze(&self, role_text: &str) -> PersonaProfile {
        let text = self.matcher.normalize(role_text);
        if text.is_empty() {
            return PersonaProfile::unknown();
        }

        let mut best: Option<(&PersonaEntry, f64)> = None;
        for persona in &self.knowledge.personas {
            let score = self.match_score(&text, persona);
            debug!(persona = %persona.name, score, "persona match score");
            if score > 0.0 && best.map_or(true, |(_, top)| score > top) {
                best = Some((persona, score));
            }
        }

        let Some((persona, score)) = best else {
            return PersonaProfile::unknown();
        };

        let confidence = (score / self.settings.confidence_saturation)
            .max(self.settings.confidence_floor)
            .clamp(0.0, 1.0);

        PersonaProfile {
            role_label: persona.name.clone(),
            confidence,
            focus_keywords: persona.tiers.clone(),
        }
    }

    fn match_score(&self, text: &NormalizedText, persona: &PersonaEntry) -> f64 {
        persona
            .tiers
            .iter()
            .map(|tier| self.matcher.count_hits(text, &tier.keywords) as f64 * tier.weight)
            .sum()
    }
}
