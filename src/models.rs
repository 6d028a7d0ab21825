use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::section::PageSpan;
use crate::utils::ensure_directory_exists;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeInfo {
    pub challenge_id: String,
    pub test_case_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobToBeDone {
    pub task: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge_info: Option<ChallengeInfo>,
    pub documents: Vec<Document>,
    pub persona: Persona,
    pub job_to_be_done: JobToBeDone,
}

impl InputJson {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::MalformedInput(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| Error::MalformedInput(format!("{}: {e}", path.display())))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedSection {
    pub document: String,
    pub section_title: String,
    pub importance_rank: u32,
    pub page_number: u32,
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub refined_text: String,
    pub page_number: PageSpan,
    pub quality_score: f64,
}

/// Wall-clock milliseconds spent in each pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StageTimings {
    pub analysis_ms: f64,
    pub extraction_ms: f64,
    pub scoring_ms: f64,
    pub refinement_ms: f64,
    pub ranking_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub processing_timestamp: String,
    pub persona_label: String,
    pub persona_confidence: f64,
    pub job_type: String,
    pub job_confidence: f64,
    pub processing_time_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_timings: Option<StageTimings>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputJson {
    pub metadata: Metadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}

impl OutputJson {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes pretty JSON, creating the parent directory when needed.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_directory_exists(parent)?;
        }
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = r#"{
        "challenge_info": {"challenge_id": "round_1b_002", "test_case_name": "travel_planner"},
        "documents": [{"filename": "South of France - Cities.pdf", "title": "Cities"}],
        "persona": {"role": "Travel Planner"},
        "job_to_be_done": {"task": "Plan a trip of 4 days for a group of 10 college friends."}
    }"#;

    #[test]
    fn test_parses_challenge_input() {
        let input = InputJson::from_json_str(INPUT).unwrap();
        assert_eq!(input.documents.len(), 1);
        assert_eq!(input.persona.role, "Travel Planner");
        let info = input.challenge_info.unwrap();
        assert_eq!(info.challenge_id, "round_1b_002");
        assert_eq!(info.description, None);
    }

    #[test]
    fn test_challenge_info_and_title_optional() {
        let input = InputJson::from_json_str(
            r#"{"documents": [{"filename": "a.pdf"}],
                "persona": {"role": "Researcher"},
                "job_to_be_done": {"task": "Review"}}"#,
        )
        .unwrap();
        assert!(input.challenge_info.is_none());
        assert_eq!(input.documents[0].title, "");
    }

    #[test]
    fn test_schema_mismatch_is_malformed_input() {
        let err = InputJson::from_json_str(r#"{"documents": "nope"}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_output_page_number_shapes() {
        let rows = vec![
            SubsectionAnalysis {
                document: "a.pdf".into(),
                refined_text: "One.".into(),
                page_number: PageSpan::single(3),
                quality_score: 0.5,
            },
            SubsectionAnalysis {
                document: "a.pdf".into(),
                refined_text: "Two.".into(),
                page_number: PageSpan::range(3, 4),
                quality_score: 0.4,
            },
        ];
        let json = serde_json::to_value(&rows).unwrap();
        assert_eq!(json[0]["page_number"], serde_json::json!(3));
        assert_eq!(json[1]["page_number"], serde_json::json!("3-4"));
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        let output = OutputJson {
            metadata: Metadata {
                input_documents: vec!["a.pdf".into()],
                persona: "Researcher".into(),
                job_to_be_done: "Review".into(),
                processing_timestamp: "2024-01-01T00:00:00+00:00".into(),
                persona_label: "researcher".into(),
                persona_confidence: 0.5,
                job_type: "literature_review".into(),
                job_confidence: 0.33,
                processing_time_seconds: 0.01,
                stage_timings: None,
            },
            extracted_sections: vec![],
            subsection_analysis: vec![],
        };
        output.write_to(&path).unwrap();
        let back: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["metadata"]["persona_label"], "researcher");
        assert!(back["metadata"].get("stage_timings").is_none());
    }
}
