//! The request pipeline: analyze the persona and job, pull page text, score
//! and refine every section, then rank.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::extract::{PageBlock, PageSource};
use crate::job::{JobAnalyzer, JobProfile};
use crate::knowledge::KnowledgeBase;
use crate::matching::{LevenshteinRatio, TermMatcher};
use crate::models::{
    Document, ExtractedSection, InputJson, Metadata, OutputJson, StageTimings, SubsectionAnalysis,
};
use crate::persona::{PersonaAnalyzer, PersonaProfile};
use crate::ranker::{rank, RankedResult};
use crate::refiner::TextRefiner;
use crate::scorer::{SectionScore, SectionScorer};
use crate::section::{Category, PageSpan, ScoredSection, SectionCandidate, SubSection};
use crate::utils::{preview, round_to};

/// Everything the pipeline worked out for one request, before it is turned
/// into the output document.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub persona: PersonaProfile,
    pub job: JobProfile,
    pub ranked: RankedResult,
    pub timings: StageTimings,
}

/// Identity of a scoring result within one request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey<'a> {
    persona: &'a str,
    job: &'a str,
    text: String,
}

pub struct Engine {
    config: EngineConfig,
    personas: PersonaAnalyzer,
    jobs: JobAnalyzer,
    scorer: SectionScorer,
    refiner: TextRefiner,
}

impl Engine {
    /// Validates both the tables and the configuration before building.
    pub fn new(knowledge: KnowledgeBase, config: EngineConfig) -> Result<Self> {
        knowledge.validate()?;
        config.validate()?;

        let knowledge = Arc::new(knowledge);
        let matcher = Arc::new(
            TermMatcher::new(LevenshteinRatio, config.matching.fuzzy_threshold)
                .with_min_fuzzy_len(config.matching.min_fuzzy_len),
        );

        Ok(Self {
            personas: PersonaAnalyzer::new(
                knowledge.clone(),
                matcher.clone(),
                config.persona.clone(),
            ),
            jobs: JobAnalyzer::new(knowledge.clone(), matcher.clone(), config.job.clone()),
            scorer: SectionScorer::new(knowledge, matcher, config.scoring.clone()),
            refiner: TextRefiner::new(config.refiner.clone()),
            config,
        })
    }

    pub fn builtin() -> Result<Self> {
        Self::new(KnowledgeBase::builtin(), EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn process(&self, input: &InputJson, source: &dyn PageSource) -> Result<OutputJson> {
        let started = Instant::now();
        let analysis = self.analyze(input, source)?;
        let elapsed = started.elapsed().as_secs_f64();
        Ok(self.build_output(input, analysis, elapsed))
    }

    pub fn analyze(&self, input: &InputJson, source: &dyn PageSource) -> Result<Analysis> {
        validate_input(input)?;
        let mut timings = StageTimings::default();

        let stage = Instant::now();
        let persona = self.personas.analyze(&input.persona.role);
        let job = self.jobs.analyze(&input.job_to_be_done.task);
        timings.analysis_ms = millis(stage);
        info!(
            persona = %persona.role_label,
            persona_confidence = persona.confidence,
            job = %job.job_type,
            job_confidence = job.confidence,
            "request analyzed"
        );

        let stage = Instant::now();
        let mut candidates = Vec::new();
        for (index, document) in input.documents.iter().enumerate() {
            let blocks = self.document_blocks(document, source)?;
            let before = candidates.len();
            candidates.extend(build_candidates(
                document,
                index,
                blocks,
                self.config.stitch_page_breaks,
            ));
            debug!(
                document = %document.filename,
                sections = candidates.len() - before,
                "document sections"
            );
        }
        timings.extraction_ms = millis(stage);

        let stage = Instant::now();
        let scores = self.score_candidates(&candidates, &persona, &job);
        timings.scoring_ms = millis(stage);

        let stage = Instant::now();
        let mut sections = Vec::with_capacity(candidates.len());
        let mut sub_sections = Vec::new();
        for (candidate, score) in candidates.into_iter().zip(scores) {
            let refinement = self.refiner.refine(&candidate.raw_text);
            let title = refinement
                .iter()
                .next()
                .map(|chunk| chunk.title)
                .filter(|title| usable_title(title))
                .unwrap_or_else(|| fallback_title(score.category).to_string());

            if score.relevance_score >= self.config.limits.min_relevance {
                for (ordinal, chunk) in refinement.iter().enumerate() {
                    let quality = self.scorer.score_subsection(&chunk.body, &persona, &job);
                    sub_sections.push(SubSection {
                        document_id: candidate.document_id.clone(),
                        document_index: candidate.document_index,
                        pages: candidate.pages,
                        parent: candidate.key(),
                        ordinal,
                        title: chunk.title,
                        refined_text: chunk.body,
                        quality_score: quality.combined(&self.config.subsection_weights),
                        quality,
                    });
                }
            }

            sections.push(ScoredSection {
                candidate,
                relevance_score: score.relevance_score,
                category: score.category,
                title,
                breakdown: score.breakdown,
            });
        }
        timings.refinement_ms = millis(stage);

        let stage = Instant::now();
        let ranked = rank(sections, sub_sections, &self.config.limits);
        timings.ranking_ms = millis(stage);

        if let Some(top) = ranked.sections.first() {
            debug!(
                score = top.relevance_score,
                title = %preview(&top.title, 60),
                "top section"
            );
        }
        info!(
            sections = ranked.sections.len(),
            sub_sections = ranked.sub_sections.len(),
            "request ranked"
        );

        Ok(Analysis {
            persona,
            job,
            ranked,
            timings,
        })
    }

    /// Missing documents abort the request; unreadable ones count as empty.
    fn document_blocks(&self, document: &Document, source: &dyn PageSource) -> Result<Vec<PageBlock>> {
        match source.pages(document) {
            Ok(blocks) => Ok(blocks),
            Err(Error::DocumentNotFound(path)) => Err(Error::DocumentNotFound(path)),
            Err(e) => {
                warn!(document = %document.filename, error = %e, "treating document as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Scores each distinct section text once and fans the results back out
    /// to every candidate carrying that text.
    fn score_candidates(
        &self,
        candidates: &[SectionCandidate],
        persona: &PersonaProfile,
        job: &JobProfile,
    ) -> Vec<SectionScore> {
        let mut slots: HashMap<MemoKey<'_>, usize> = HashMap::new();
        let mut unique_texts: Vec<String> = Vec::new();
        let mut assignment = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let key = MemoKey {
                persona: &persona.role_label,
                job: &job.job_type,
                text: normalize_for_memo(&candidate.raw_text),
            };
            let slot = *slots.entry(key).or_insert_with_key(|key| {
                unique_texts.push(key.text.clone());
                unique_texts.len() - 1
            });
            assignment.push(slot);
        }
        debug!(
            candidates = candidates.len(),
            unique = unique_texts.len(),
            "scoring sections"
        );

        #[cfg(feature = "parallel")]
        let unique_scores: Vec<SectionScore> = unique_texts
            .par_iter()
            .map(|text| self.scorer.score(text, persona, job))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let unique_scores: Vec<SectionScore> = unique_texts
            .iter()
            .map(|text| self.scorer.score(text, persona, job))
            .collect();

        assignment
            .into_iter()
            .map(|slot| unique_scores[slot].clone())
            .collect()
    }

    fn build_output(&self, input: &InputJson, analysis: Analysis, elapsed_seconds: f64) -> OutputJson {
        let Analysis {
            persona,
            job,
            ranked,
            timings,
        } = analysis;

        let extracted_sections = ranked
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| ExtractedSection {
                document: s.candidate.document_id.clone(),
                section_title: s.title.clone(),
                importance_rank: i as u32 + 1,
                page_number: s.candidate.page_number,
                relevance_score: round_to(s.relevance_score, 2),
            })
            .collect();

        let subsection_analysis = ranked
            .sub_sections
            .into_iter()
            .map(|s| SubsectionAnalysis {
                document: s.document_id,
                refined_text: s.refined_text,
                page_number: s.pages,
                quality_score: round_to(s.quality_score, 3),
            })
            .collect();

        OutputJson {
            metadata: Metadata {
                input_documents: input.documents.iter().map(|d| d.filename.clone()).collect(),
                persona: input.persona.role.clone(),
                job_to_be_done: input.job_to_be_done.task.clone(),
                processing_timestamp: Utc::now().to_rfc3339(),
                persona_label: persona.role_label,
                persona_confidence: round_to(persona.confidence, 3),
                job_type: job.job_type,
                job_confidence: round_to(job.confidence, 3),
                processing_time_seconds: round_to(elapsed_seconds, 3),
                stage_timings: self.config.record_stage_timings.then_some(timings),
            },
            extracted_sections,
            subsection_analysis,
        }
    }
}

fn validate_input(input: &InputJson) -> Result<()> {
    if input.documents.is_empty() {
        return Err(Error::MalformedInput("no documents declared".to_string()));
    }
    if input.persona.role.trim().is_empty() {
        return Err(Error::MalformedInput("persona role is blank".to_string()));
    }
    if input.job_to_be_done.task.trim().is_empty() {
        return Err(Error::MalformedInput("job_to_be_done task is blank".to_string()));
    }
    let mut seen = HashSet::new();
    for document in &input.documents {
        if document.filename.trim().is_empty() {
            return Err(Error::MalformedInput("document with a blank filename".to_string()));
        }
        if !seen.insert(document.filename.as_str()) {
            return Err(Error::MalformedInput(format!(
                "duplicate document '{}'",
                document.filename
            )));
        }
    }
    Ok(())
}

/// Turns extracted blocks into section candidates. With stitching on, a
/// block cut off mid-sentence at the bottom of a page absorbs the first
/// block of the next page when that block continues in lower case.
fn build_candidates(
    document: &Document,
    document_index: usize,
    blocks: Vec<PageBlock>,
    stitch_page_breaks: bool,
) -> Vec<SectionCandidate> {
    let mut candidates: Vec<SectionCandidate> = Vec::new();
    let mut current_page = None;
    // Per page, so a source that comes back to a page keeps keys unique.
    let mut next_block: HashMap<u32, usize> = HashMap::new();

    for block in blocks {
        if block.text.trim().is_empty() {
            continue;
        }
        let first_on_page = current_page != Some(block.page_number);
        current_page = Some(block.page_number);
        let counter = next_block.entry(block.page_number).or_insert(0);
        let block_index = *counter;
        *counter += 1;

        if stitch_page_breaks && first_on_page {
            if let Some(previous) = candidates.last_mut() {
                if previous.pages.end + 1 == block.page_number
                    && ends_mid_sentence(&previous.raw_text)
                    && starts_lowercase(&block.text)
                {
                    previous.raw_text.push('\n');
                    previous.raw_text.push_str(block.text.trim());
                    previous.pages.extend_to(block.page_number);
                    continue;
                }
            }
        }

        candidates.push(SectionCandidate {
            document_id: document.filename.clone(),
            document_index,
            page_number: block.page_number,
            pages: PageSpan::single(block.page_number),
            block_index,
            raw_text: block.text,
        });
    }
    candidates
}

fn ends_mid_sentence(text: &str) -> bool {
    text.trim_end()
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, ',' | ';' | '-'))
}

fn starts_lowercase(text: &str) -> bool {
    text.trim_start().chars().next().is_some_and(char::is_lowercase)
}

fn normalize_for_memo(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A title needs at least two alphabetic words to be worth showing.
fn usable_title(title: &str) -> bool {
    title
        .split_whitespace()
        .filter(|w| w.chars().any(char::is_alphabetic))
        .count()
        >= 2
}

fn fallback_title(category: Category) -> &'static str {
    match category {
        Category::Methodology => "Methodology and approach",
        Category::Results => "Key results and findings",
        Category::Background => "Background and context",
        Category::Logistics => "Practical logistics",
        Category::Other => "General information",
    }
}

fn millis(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::MemoryPageSource;
    use crate::models::{JobToBeDone, Persona};
    use pretty_assertions::assert_eq;

    fn input(documents: &[&str], role: &str, task: &str) -> InputJson {
        InputJson {
            challenge_info: None,
            documents: documents
                .iter()
                .map(|f| Document {
                    filename: f.to_string(),
                    title: String::new(),
                })
                .collect(),
            persona: Persona {
                role: role.to_string(),
            },
            job_to_be_done: JobToBeDone {
                task: task.to_string(),
            },
        }
    }

    fn doc(name: &str) -> Document {
        Document {
            filename: name.to_string(),
            title: String::new(),
        }
    }

    #[test]
    fn test_rejects_malformed_requests() {
        let engine = Engine::builtin().unwrap();
        let source = MemoryPageSource::new();
        for bad in [
            input(&[], "Researcher", "Review"),
            input(&["a.pdf"], "  ", "Review"),
            input(&["a.pdf"], "Researcher", ""),
            input(&["a.pdf", "a.pdf"], "Researcher", "Review"),
        ] {
            let err = engine.analyze(&bad, &source).unwrap_err();
            assert!(matches!(err, Error::MalformedInput(_)), "{err}");
        }
    }

    #[test]
    fn test_missing_document_is_fatal() {
        let engine = Engine::builtin().unwrap();
        let err = engine
            .analyze(&input(&["gone.pdf"], "Researcher", "Review"), &MemoryPageSource::new())
            .unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[test]
    fn test_document_without_pages_yields_no_sections() {
        let engine = Engine::builtin().unwrap();
        let mut source = MemoryPageSource::new();
        source.insert_blocks("empty.pdf", Vec::new());
        let analysis = engine
            .analyze(&input(&["empty.pdf"], "Travel Planner", "Plan a trip"), &source)
            .unwrap();
        assert!(analysis.ranked.is_empty());
        assert_eq!(analysis.persona.role_label, "travel_planner");
    }

    #[test]
    fn test_stitches_sentence_across_page_break() {
        let blocks = vec![
            PageBlock::new(1, "Intro block that ends properly with enough words here."),
            PageBlock::new(1, "The harbour walk continues past the old fort and the"),
            PageBlock::new(2, "lighthouse before returning to the market square at noon."),
            PageBlock::new(2, "A separate paragraph about the museum opening hours."),
        ];
        let candidates = build_candidates(&doc("a.pdf"), 0, blocks.clone(), true);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[1].pages, PageSpan::range(1, 2));
        assert!(candidates[1].raw_text.contains("lighthouse"));
        assert_eq!(candidates[2].page_number, 2);
        assert_eq!(candidates[2].block_index, 1);

        let unstitched = build_candidates(&doc("a.pdf"), 0, blocks, false);
        assert_eq!(unstitched.len(), 4);
    }

    #[test]
    fn test_revisited_page_keeps_section_keys_unique() {
        let blocks = vec![
            PageBlock::new(2, "Second page opening paragraph about the coastal trail."),
            PageBlock::new(1, "First page paragraph about arriving at the airport."),
            PageBlock::new(2, "Another second page paragraph about the night market."),
        ];
        let candidates = build_candidates(&doc("a.pdf"), 0, blocks, true);
        let keys: Vec<_> = candidates.iter().map(SectionCandidate::key).collect();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "{keys:?}");
        assert_eq!(candidates[0].block_index, 0);
        assert_eq!(candidates[2].block_index, 1);
    }

    #[test]
    fn test_duplicate_blocks_scored_identically() {
        let engine = Engine::builtin().unwrap();
        let text = "Book a hotel near the beach and plan the itinerary for the group.";
        let mut source = MemoryPageSource::new();
        source.insert_blocks("a.pdf", vec![PageBlock::new(1, text)]);
        source.insert_blocks("b.pdf", vec![PageBlock::new(4, format!("  {text}\n"))]);
        let analysis = engine
            .analyze(&input(&["a.pdf", "b.pdf"], "Travel Planner", "Plan a trip"), &source)
            .unwrap();
        let sections = &analysis.ranked.sections;
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].relevance_score, sections[1].relevance_score);
        // Equal scores fall back to document order.
        assert_eq!(sections[0].candidate.document_id, "a.pdf");
    }

    #[test]
    fn test_fallback_title_for_unusable_first_sentence() {
        assert!(!usable_title("42."));
        assert!(!usable_title("Hotels"));
        assert!(usable_title("Coastal Adventures"));
        assert_eq!(fallback_title(Category::Logistics), "Practical logistics");
    }

    #[test]
    fn test_stage_timings_only_when_enabled() {
        let mut source = MemoryPageSource::new();
        source.insert_blocks(
            "a.pdf",
            vec![PageBlock::new(1, "Book a hotel near the beach for the whole group.")],
        );
        let request = input(&["a.pdf"], "Travel Planner", "Plan a trip");

        let engine = Engine::builtin().unwrap();
        let output = engine.process(&request, &source).unwrap();
        assert!(output.metadata.stage_timings.is_none());

        let config = EngineConfig {
            record_stage_timings: true,
            ..EngineConfig::default()
        };
        let engine = Engine::new(KnowledgeBase::builtin(), config).unwrap();
        let output = engine.process(&request, &source).unwrap();
        assert!(output.metadata.stage_timings.is_some());
        assert_eq!(output.extracted_sections[0].importance_rank, 1);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.limits.min_relevance = 0.0;
        config.subsection_weights.persona_alignment = 0.9;
        let err = Engine::new(KnowledgeBase::builtin(), config).err().unwrap();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
