//! Page text for the engine.
//!
//! The engine never parses binary formats itself; it asks a `PageSource`
//! for the text blocks of each declared document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;
use pdf::content::{Content, Op, TextDrawAdjusted};
use pdf::file::FileOptions;
use pdf::object::Resolve;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::Document;
use crate::utils::preview;

/// Blocks with fewer words than this are folded into the next block.
pub const DEFAULT_MIN_BLOCK_WORDS: usize = 8;

/// Vertical text moves larger than this start a new line.
const LINE_BREAK_MOVE: f32 = 12.0;
/// Vertical text moves larger than this start a new paragraph.
const PARAGRAPH_BREAK_MOVE: f32 = 24.0;

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());
static INLINE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// One contiguous block of text on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBlock {
    pub page_number: u32,
    pub text: String,
}

impl PageBlock {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }
}

pub trait PageSource {
    /// Text blocks of `document`, in page order then reading order.
    ///
    /// A document that is missing altogether is `Error::DocumentNotFound`;
    /// one that exists but cannot be read is `Error::Extraction`.
    fn pages(&self, document: &Document) -> Result<Vec<PageBlock>>;
}

/// Splits page text into blocks on blank lines. Lines inside a block keep
/// their breaks; short blocks are merged into the following one so headings
/// stay with their bodies.
pub fn split_blocks(text: &str, min_words: usize) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\u{000C}', "\n\n");
    let raw: Vec<String> = BLANK_LINES
        .split(&normalized)
        .map(|block| {
            block
                .lines()
                .map(|line| INLINE_SPACES.replace_all(line.trim(), " ").into_owned())
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|block| !block.is_empty())
        .collect();

    let mut blocks: Vec<String> = Vec::with_capacity(raw.len());
    let mut carry: Option<String> = None;
    for block in raw {
        let block = match carry.take() {
            Some(mut short) => {
                short.push('\n');
                short.push_str(&block);
                short
            }
            None => block,
        };
        if block.split_whitespace().count() < min_words {
            carry = Some(block);
        } else {
            blocks.push(block);
        }
    }
    if let Some(short) = carry {
        match blocks.last_mut() {
            Some(last) => {
                last.push('\n');
                last.push_str(&short);
            }
            None => blocks.push(short),
        }
    }
    blocks
}

fn page_blocks(pages: Vec<(u32, String)>, min_words: usize) -> Vec<PageBlock> {
    pages
        .into_iter()
        .flat_map(|(page_number, text)| {
            split_blocks(&text, min_words)
                .into_iter()
                .map(move |block| PageBlock::new(page_number, block))
        })
        .collect()
}

/// Reads PDFs from a directory with the `pdf` crate, falling back to the
/// `pdftotext` command when the content streams yield nothing.
#[derive(Debug, Clone)]
pub struct PdfPageSource {
    pdf_dir: PathBuf,
    min_block_words: usize,
    use_pdftotext: bool,
}

impl PdfPageSource {
    pub fn new(pdf_dir: impl Into<PathBuf>) -> Self {
        Self {
            pdf_dir: pdf_dir.into(),
            min_block_words: DEFAULT_MIN_BLOCK_WORDS,
            use_pdftotext: true,
        }
    }

    pub fn without_pdftotext(mut self) -> Self {
        self.use_pdftotext = false;
        self
    }

    fn extract_pages(&self, path: &Path, document: &str) -> Result<Vec<(u32, String)>> {
        let parsed = extract_pdf_text(path);
        let failure = match parsed {
            Ok(pages) if pages.iter().any(|(_, text)| !text.trim().is_empty()) => {
                return Ok(pages)
            }
            Ok(_) => "no text in content streams".to_string(),
            Err(e) => e.to_string(),
        };

        if !self.use_pdftotext {
            return Err(extraction(document, failure));
        }
        info!(document, reason = %failure, "falling back to pdftotext");
        extract_with_pdftotext(path).map_err(|fallback| {
            extraction(document, format!("{failure}; pdftotext: {fallback}"))
        })
    }
}

impl PageSource for PdfPageSource {
    fn pages(&self, document: &Document) -> Result<Vec<PageBlock>> {
        let path = self.pdf_dir.join(&document.filename);
        if !path.exists() {
            return Err(Error::DocumentNotFound(path));
        }
        debug!(path = %path.display(), "opening PDF");
        let pages = self.extract_pages(&path, &document.filename)?;
        let blocks = page_blocks(pages, self.min_block_words);
        debug!(
            document = %document.filename,
            blocks = blocks.len(),
            first = %blocks.first().map(|b| preview(&b.text, 60)).unwrap_or_default(),
            "extracted blocks"
        );
        Ok(blocks)
    }
}

fn extraction(document: &str, reason: impl Into<String>) -> Error {
    Error::Extraction {
        document: document.to_string(),
        reason: reason.into(),
    }
}

fn extract_pdf_text(path: &Path) -> std::result::Result<Vec<(u32, String)>, pdf::error::PdfError> {
    let file = FileOptions::cached().open(path)?;
    let mut pages = Vec::new();

    for index in 0..file.num_pages() {
        let page_number = index + 1;
        let page = match file.get_page(index) {
            Ok(page) => page,
            Err(e) => {
                warn!(page = page_number, error = %e, "skipping unreadable page");
                continue;
            }
        };
        let mut text = String::new();
        if let Some(content) = &page.contents {
            if let Err(e) = extract_text_from_content(&file, content, &mut text) {
                warn!(page = page_number, error = %e, "failed to read page content");
            }
        }
        pages.push((page_number, text));
    }
    Ok(pages)
}

fn extract_text_from_content(
    resolver: &impl Resolve,
    content: &Content,
    text: &mut String,
) -> std::result::Result<(), pdf::error::PdfError> {
    for op in content.operations(resolver)? {
        match op {
            Op::TextDraw { text: t } => push_fragment(text, &t.to_string_lossy()),
            Op::TextDrawAdjusted { array } => {
                for item in array {
                    match item {
                        TextDrawAdjusted::Text(t) => push_fragment(text, &t.to_string_lossy()),
                        TextDrawAdjusted::Spacing(_) => text.push(' '),
                    }
                }
            }
            Op::TextNewline => text.push('\n'),
            Op::MoveTextPosition { translation } => {
                let dy = translation.y.abs();
                if dy > PARAGRAPH_BREAK_MOVE {
                    text.push_str("\n\n");
                } else if dy > LINE_BREAK_MOVE {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn push_fragment(text: &mut String, fragment: &str) {
    if fragment.trim().is_empty() {
        return;
    }
    text.push_str(fragment);
    text.push(' ');
}

/// `pdftotext` separates pages with form feeds.
fn extract_with_pdftotext(path: &Path) -> std::result::Result<Vec<(u32, String)>, String> {
    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg(path)
        .arg("-")
        .output()
        .map_err(|e| format!("failed to run pdftotext (is poppler-utils installed?): {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "exit status {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    if text.trim().is_empty() {
        return Err("no text extracted".to_string());
    }
    Ok(text
        .split('\u{000C}')
        .enumerate()
        .map(|(i, page)| (i as u32 + 1, page.to_string()))
        .filter(|(_, page)| !page.trim().is_empty())
        .collect())
}

/// Pre-extracted blocks keyed by document filename.
#[derive(Debug, Clone)]
pub struct MemoryPageSource {
    documents: HashMap<String, Vec<PageBlock>>,
    min_block_words: usize,
}

impl MemoryPageSource {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            min_block_words: DEFAULT_MIN_BLOCK_WORDS,
        }
    }

    /// Stores blocks exactly as given.
    pub fn insert_blocks(&mut self, filename: impl Into<String>, blocks: Vec<PageBlock>) {
        self.documents.insert(filename.into(), blocks);
    }

    /// Stores whole-page text, split into blocks the same way PDF pages are.
    pub fn insert_pages<I, S>(&mut self, filename: impl Into<String>, pages: I)
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let pages = pages.into_iter().map(|(n, text)| (n, text.into())).collect();
        let blocks = page_blocks(pages, self.min_block_words);
        self.documents.insert(filename.into(), blocks);
    }

    pub fn with_pages<I, S>(mut self, filename: impl Into<String>, pages: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        self.insert_pages(filename, pages);
        self
    }
}

impl Default for MemoryPageSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSource for MemoryPageSource {
    fn pages(&self, document: &Document) -> Result<Vec<PageBlock>> {
        self.documents
            .get(&document.filename)
            .cloned()
            .ok_or_else(|| Error::DocumentNotFound(PathBuf::from(&document.filename)))
    }
}
