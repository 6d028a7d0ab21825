use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::debug;

use crate::config::RankLimits;
use crate::section::{ScoredSection, SectionKey, SubSection};

/// Characters of normalised text compared when removing duplicate excerpts.
const DEDUPE_PREFIX_CHARS: usize = 200;

#[derive(Debug, Clone, Default)]
pub struct RankedResult {
    pub sections: Vec<ScoredSection>,
    pub sub_sections: Vec<SubSection>,
}

impl RankedResult {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.sub_sections.is_empty()
    }
}

/// Relevance descending, then document order, page and block position.
pub fn compare_sections(a: &ScoredSection, b: &ScoredSection) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| a.key().cmp(&b.key()))
}

/// Quality descending, then the parent's position, then chunk order.
pub fn compare_sub_sections(a: &SubSection, b: &SubSection) -> Ordering {
    b.quality_score
        .total_cmp(&a.quality_score)
        .then_with(|| a.parent.cmp(&b.parent))
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}

/// Orders and caps both lists. Sub-sections survive only when their parent
/// made the section list and clears the relevance floor.
pub fn rank(
    mut sections: Vec<ScoredSection>,
    mut sub_sections: Vec<SubSection>,
    limits: &RankLimits,
) -> RankedResult {
    let candidates = sections.len();
    sections.sort_by(compare_sections);
    sections.truncate(limits.top_n_sections);

    let eligible: HashSet<SectionKey> = sections
        .iter()
        .filter(|s| s.relevance_score >= limits.min_relevance)
        .map(ScoredSection::key)
        .collect();
    sub_sections.retain(|s| eligible.contains(&s.parent));
    sub_sections.sort_by(compare_sub_sections);

    if limits.dedupe_subsections {
        let mut seen = HashSet::new();
        sub_sections.retain(|s| seen.insert(dedupe_key(&s.refined_text)));
    }
    sub_sections.truncate(limits.top_n_subsections);

    debug!(
        candidates,
        sections = sections.len(),
        sub_sections = sub_sections.len(),
        "ranking complete"
    );

    RankedResult {
        sections,
        sub_sections,
    }
}

fn dedupe_key(text: &str) -> String {
    let normalized = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    normalized.chars().take(DEDUPE_PREFIX_CHARS).collect()
}
