use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::matching::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_MIN_FUZZY_LEN};

pub const INPUT_FILE_NAME: &str = "challenge1b_input.json";
pub const OUTPUT_FILE_NAME: &str = "challenge1b_output.json";

const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    pub fuzzy_threshold: f64,
    pub min_fuzzy_len: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            min_fuzzy_len: DEFAULT_MIN_FUZZY_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    /// Weighted hit score that maps to full confidence.
    pub confidence_saturation: f64,
    /// Minimum confidence once any keyword has matched.
    pub confidence_floor: f64,
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            confidence_saturation: 2.0,
            confidence_floor: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Pattern score that maps to full confidence.
    pub confidence_saturation: f64,
    /// Upper bound on confidence for the `general` fallback.
    pub general_confidence_cap: f64,
    /// Specificity added per word of a matched pattern.
    pub specificity_per_word: f64,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            confidence_saturation: 3.0,
            general_confidence_cap: 0.4,
            specificity_per_word: 1.0,
        }
    }
}

/// Coefficients of the 100-point relevance score and of sub-section quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub persona_max: f64,
    pub points_per_hit: f64,
    pub tier_hit_cap: usize,
    /// Multiplier on a tier's job priority weight when boosting its hits.
    pub job_tier_boost: f64,

    pub indicator_max: f64,
    pub length_max: f64,
    pub length_band_min: usize,
    pub length_band_max: usize,
    /// Words past the band at which length fitness reaches zero.
    pub length_decay_words: usize,
    pub structure_max: f64,
    /// Share of the structure points earned by complete sentences; the rest
    /// is withheld in proportion to OCR noise.
    pub sentence_share: f64,
    pub noise_penalty_scale: f64,
    pub section_type_bonus: f64,
    /// Job weight at which a tier counts as a priority for the type bonus.
    pub high_priority_weight: f64,

    /// Persona keyword hits that saturate sub-section persona alignment.
    pub subsection_hit_saturation: f64,
    pub density_scale: f64,
    pub readable_sentence_min: f64,
    pub readable_sentence_max: f64,
    pub readability_partial: f64,
    /// Share of job relevance taken from task-term overlap.
    pub task_term_share: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            persona_max: 60.0,
            points_per_hit: 6.0,
            tier_hit_cap: 3,
            job_tier_boost: 1.0,
            indicator_max: 15.0,
            length_max: 10.0,
            length_band_min: 50,
            length_band_max: 300,
            length_decay_words: 600,
            structure_max: 10.0,
            sentence_share: 0.6,
            noise_penalty_scale: 10.0,
            section_type_bonus: 5.0,
            high_priority_weight: 0.2,
            subsection_hit_saturation: 6.0,
            density_scale: 10.0,
            readable_sentence_min: 8.0,
            readable_sentence_max: 30.0,
            readability_partial: 0.5,
            task_term_share: 0.3,
        }
    }
}

impl ScoringPolicy {
    pub fn budget(&self) -> f64 {
        self.persona_max
            + self.indicator_max
            + self.length_max
            + self.structure_max
            + self.section_type_bonus
    }

    fn validate(&self) -> Result<()> {
        let caps = [
            ("persona_max", self.persona_max),
            ("points_per_hit", self.points_per_hit),
            ("job_tier_boost", self.job_tier_boost),
            ("indicator_max", self.indicator_max),
            ("length_max", self.length_max),
            ("structure_max", self.structure_max),
            ("section_type_bonus", self.section_type_bonus),
            ("noise_penalty_scale", self.noise_penalty_scale),
            ("subsection_hit_saturation", self.subsection_hit_saturation),
            ("density_scale", self.density_scale),
        ];
        if let Some((name, _)) = caps.iter().find(|(_, v)| !(v.is_finite() && *v >= 0.0)) {
            return Err(Error::InvalidConfig(format!("scoring.{name} must be >= 0")));
        }
        if self.budget() > 100.0 + WEIGHT_TOLERANCE {
            return Err(Error::InvalidConfig(format!(
                "scoring components add up to {}, more than 100",
                self.budget()
            )));
        }
        if self.length_band_min > self.length_band_max {
            return Err(Error::InvalidConfig(
                "scoring.length_band_min exceeds length_band_max".to_string(),
            ));
        }
        for (name, v) in [
            ("sentence_share", self.sentence_share),
            ("high_priority_weight", self.high_priority_weight),
            ("readability_partial", self.readability_partial),
            ("task_term_share", self.task_term_share),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidConfig(format!(
                    "scoring.{name} must be within [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Weights of the four sub-section quality components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsectionWeights {
    pub persona_alignment: f64,
    pub job_relevance: f64,
    pub content_density: f64,
    pub readability: f64,
}

impl Default for SubsectionWeights {
    fn default() -> Self {
        Self {
            persona_alignment: 0.40,
            job_relevance: 0.30,
            content_density: 0.20,
            readability: 0.10,
        }
    }
}

impl SubsectionWeights {
    fn validate(&self) -> Result<()> {
        let parts = [
            self.persona_alignment,
            self.job_relevance,
            self.content_density,
            self.readability,
        ];
        if parts.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(Error::InvalidConfig(
                "subsection weights must be within [0, 1]".to_string(),
            ));
        }
        let sum: f64 = parts.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(Error::InvalidConfig(format!(
                "subsection weights sum to {sum}, expected 1.0"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankLimits {
    pub top_n_sections: usize,
    pub top_n_subsections: usize,
    /// Sections scoring below this never contribute sub-sections.
    pub min_relevance: f64,
    pub dedupe_subsections: bool,
}

impl Default for RankLimits {
    fn default() -> Self {
        Self {
            top_n_sections: 20,
            top_n_subsections: 50,
            min_relevance: 5.0,
            dedupe_subsections: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerSettings {
    /// Structural segments shorter than this are merged into a neighbour.
    pub min_segment_words: usize,
    /// Text shorter than this is never split.
    pub short_text_words: usize,
    pub min_chunk_words: usize,
    pub target_chunk_words: usize,
    pub max_chunk_words: usize,
    pub max_title_chars: usize,
}

impl Default for RefinerSettings {
    fn default() -> Self {
        Self {
            min_segment_words: 8,
            short_text_words: 20,
            min_chunk_words: 50,
            target_chunk_words: 150,
            max_chunk_words: 300,
            max_title_chars: 80,
        }
    }
}

/// Everything tunable about one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matching: MatchingSettings,
    pub persona: PersonaSettings,
    pub job: JobSettings,
    pub scoring: ScoringPolicy,
    pub subsection_weights: SubsectionWeights,
    pub limits: RankLimits,
    pub refiner: RefinerSettings,
    /// Join a block that breaks mid-sentence with its continuation on the
    /// next page.
    pub stitch_page_breaks: bool,
    pub record_stage_timings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matching: MatchingSettings::default(),
            persona: PersonaSettings::default(),
            job: JobSettings::default(),
            scoring: ScoringPolicy::default(),
            subsection_weights: SubsectionWeights::default(),
            limits: RankLimits::default(),
            refiner: RefinerSettings::default(),
            stitch_page_breaks: true,
            record_stage_timings: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.matching.fuzzy_threshold) {
            return Err(Error::InvalidConfig(
                "matching.fuzzy_threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.persona.confidence_saturation <= 0.0 || self.job.confidence_saturation <= 0.0 {
            return Err(Error::InvalidConfig(
                "confidence_saturation must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.persona.confidence_floor)
            || !(0.0..=1.0).contains(&self.job.general_confidence_cap)
        {
            return Err(Error::InvalidConfig(
                "confidence bounds must be within [0, 1]".to_string(),
            ));
        }
        let r = &self.refiner;
        if r.min_chunk_words > r.max_chunk_words || r.target_chunk_words > r.max_chunk_words {
            return Err(Error::InvalidConfig(
                "refiner chunk sizes must satisfy min, target <= max".to_string(),
            ));
        }
        if r.max_title_chars < 8 {
            return Err(Error::InvalidConfig(
                "refiner.max_title_chars must be at least 8".to_string(),
            ));
        }
        self.scoring.validate()?;
        self.subsection_weights.validate()
    }
}

/// Input, output and PDF locations of one collection in batch mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPaths {
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub pdf_dir: PathBuf,
}

/// Batch layout: `<collections>/<name>/challenge1b_input.json` with PDFs in
/// `<name>/PDFs` (or `<name>/pdfs`).
pub struct CollectionLayout {
    pub collections_dir: PathBuf,
}

impl CollectionLayout {
    pub fn new(collections_dir: impl Into<PathBuf>) -> Self {
        Self {
            collections_dir: collections_dir.into(),
        }
    }

    pub fn from_current_dir() -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        Ok(Self::new(current_dir.join("collections")))
    }

    /// Collections that carry an input file, sorted by directory name.
    pub fn get_collection_paths(&self) -> Result<Vec<CollectionPaths>> {
        let mut collections = Vec::new();
        for entry in WalkDir::new(&self.collections_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                Error::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
                )
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            let input = entry.path().join(INPUT_FILE_NAME);
            if !input.is_file() {
                continue;
            }
            collections.push(CollectionPaths {
                name: entry.file_name().to_string_lossy().to_string(),
                output: entry.path().join(OUTPUT_FILE_NAME),
                pdf_dir: pdf_dir_for(&input),
                input,
            });
        }
        Ok(collections)
    }
}

/// The PDF directory that sits beside an input file.
pub fn pdf_dir_for(input: &Path) -> PathBuf {
    let base = input.parent().unwrap_or_else(|| Path::new("."));
    let upper = base.join("PDFs");
    if upper.is_dir() {
        upper
    } else {
        base.join("pdfs")
    }
}
