//! Persona-driven document analysis.
//!
//! Given a set of documents, a persona description and a job-to-be-done,
//! the engine ranks the sections of those documents by relevance to the
//! persona and job, and extracts refined excerpts from the best of them.
//!
//! ```no_run
//! use persona_digest::{Engine, InputJson, PdfPageSource};
//!
//! # fn main() -> persona_digest::Result<()> {
//! let input = InputJson::from_json_file("challenge1b_input.json".as_ref())?;
//! let engine = Engine::builtin()?;
//! let output = engine.process(&input, &PdfPageSource::new("PDFs"))?;
//! output.write_to("challenge1b_output.json".as_ref())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod job;
pub mod knowledge;
pub mod matching;
pub mod models;
pub mod persona;
pub mod ranker;
pub mod refiner;
pub mod scorer;
pub mod section;
pub mod utils;

pub use config::EngineConfig;
pub use engine::{Analysis, Engine};
pub use error::{Error, Result};
pub use extract::{MemoryPageSource, PageBlock, PageSource, PdfPageSource};
pub use job::{JobAnalyzer, JobProfile};
pub use knowledge::KnowledgeBase;
pub use models::{InputJson, OutputJson};
pub use persona::{PersonaAnalyzer, PersonaProfile};
pub use ranker::{rank, RankedResult};
pub use refiner::{RefinedChunk, Refinement, TextRefiner};
pub use scorer::{SectionScorer, SubsectionQuality};
pub use section::{Category, PageSpan, ScoredSection, SubSection};
