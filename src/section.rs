//! Section-level data carried between the refiner, scorer and ranker.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::scorer::{ScoreBreakdown, SubsectionQuality};

/// Coarse section taxonomy, in detector priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Methodology,
    Results,
    Background,
    Logistics,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Methodology => "methodology",
            Category::Results => "results",
            Category::Background => "background",
            Category::Logistics => "logistics",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive page range. Serialises as a bare number for a single page and
/// as `"start-end"` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageSpan {
    pub start: u32,
    pub end: u32,
}

impl PageSpan {
    pub fn single(page: u32) -> Self {
        Self {
            start: page,
            end: page,
        }
    }

    pub fn range(start: u32, end: u32) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    pub fn extend_to(&mut self, page: u32) {
        self.start = self.start.min(page);
        self.end = self.end.max(page);
    }
}

impl fmt::Display for PageSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl Serialize for PageSpan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_single() {
            serializer.serialize_u32(self.start)
        } else {
            serializer.collect_str(self)
        }
    }
}

/// Identity of a section within one request. Also its tie-break order:
/// document declaration order, then page, then block position on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionKey {
    pub document_index: usize,
    pub page_number: u32,
    pub block_index: usize,
}

/// One contiguous block of extracted text.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionCandidate {
    pub document_id: String,
    pub document_index: usize,
    pub page_number: u32,
    pub pages: PageSpan,
    pub block_index: usize,
    pub raw_text: String,
}

impl SectionCandidate {
    pub fn key(&self) -> SectionKey {
        SectionKey {
            document_index: self.document_index,
            page_number: self.page_number,
            block_index: self.block_index,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredSection {
    pub candidate: SectionCandidate,
    pub relevance_score: f64,
    pub category: Category,
    pub title: String,
    pub breakdown: ScoreBreakdown,
}

impl ScoredSection {
    pub fn key(&self) -> SectionKey {
        self.candidate.key()
    }
}

/// A refined excerpt of a section.
#[derive(Debug, Clone)]
pub struct SubSection {
    pub document_id: String,
    pub document_index: usize,
    pub pages: PageSpan,
    pub parent: SectionKey,
    pub ordinal: usize,
    pub title: String,
    pub refined_text: String,
    pub quality_score: f64,
    pub quality: SubsectionQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_span_serialises_single_as_number() {
        let json = serde_json::to_string(&PageSpan::single(4)).unwrap();
        assert_eq!(json, "4");
    }

    #[test]
    fn test_page_span_serialises_range_as_string() {
        let json = serde_json::to_string(&PageSpan::range(5, 3)).unwrap();
        assert_eq!(json, "\"3-5\"");
    }

    #[test]
    fn test_page_span_extend() {
        let mut span = PageSpan::single(2);
        span.extend_to(3);
        assert_eq!(span, PageSpan::range(2, 3));
        assert!(!span.is_single());
    }

    #[test]
    fn test_section_key_orders_by_document_then_page() {
        let a = SectionKey {
            document_index: 0,
            page_number: 9,
            block_index: 3,
        };
        let b = SectionKey {
            document_index: 1,
            page_number: 1,
            block_index: 0,
        };
        assert!(a < b);
    }

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&Category::Logistics).unwrap();
        assert_eq!(json, "\"logistics\"");
        let back: Category = serde_json::from_str("\"methodology\"").unwrap();
        assert_eq!(back, Category::Methodology);
    }
}
