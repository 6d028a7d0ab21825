//! Splits a section into self-contained excerpts and cleans extraction
//! artefacts out of them.
//!
//! Splitting tries, in order: list markers at line starts, heading-like
//! lines, sentences opening with a transition phrase, and finally plain
//! sentence grouping. The first strategy producing at least two segments of
//! reasonable size wins.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::RefinerSettings;
use crate::utils::truncate_on_char_boundary;

static LIST_MARKER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\(?\d{1,2}[.)]|[•\-*▪◦●]|\(?[a-z][.)])\s+\S").unwrap()
});
static LEADING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\(?\d{1,2}[.)]|[•\-*▪◦●]|\(?[a-z][.)])\s+").unwrap());
static LINE_BREAK_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})-[ \t]*\r?\n[ \t]*(\p{Ll})").unwrap());
static DOTTED_INITIALISM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\p{Lu}\.){2,}$").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r" +([,;:!?.])").unwrap());
static MISSING_SPACE_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll})([,;:])(\p{L})").unwrap());
static MISSING_SPACE_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{Ll}{2})([.!?])(\p{Lu})").unwrap());

const ABBREVIATIONS: &[&str] = &[
    "e.g.", "i.e.", "etc.", "vs.", "approx.", "cf.", "al.", "fig.", "no.", "mr.", "mrs.", "ms.",
    "dr.", "st.", "jr.", "inc.", "ltd.", "min.", "max.",
];

const TRANSITIONS: &[&str] = &[
    "however", "in addition", "moreover", "furthermore", "additionally", "nevertheless",
    "in contrast", "similarly", "for example", "in conclusion", "finally",
];

/// Single characters kept even when they sit between two words.
const KEPT_SINGLE_CHARS: &[char] = &['a', 'A', 'I', '&', '-', '+'];

const MAX_CLEAN_PASSES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinedChunk {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    heading: Option<String>,
    body: String,
}

impl Segment {
    fn plain(body: impl Into<String>) -> Self {
        Self {
            heading: None,
            body: body.into(),
        }
    }

    fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }

    /// Appends `other` after this segment's body.
    fn absorb(&mut self, other: Segment) {
        if let Some(heading) = other.heading {
            push_words(&mut self.body, &heading);
        }
        push_words(&mut self.body, &other.body);
    }
}

fn push_words(buf: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(text);
}

/// Segments of one section. Cleaning happens on iteration, so a refinement
/// that is only partially consumed never cleans the rest.
#[derive(Debug, Clone)]
pub struct Refinement {
    segments: Vec<Segment>,
    max_title_chars: usize,
}

impl Refinement {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Restartable: every call walks the segments from the beginning.
    pub fn iter(&self) -> impl Iterator<Item = RefinedChunk> + '_ {
        self.segments
            .iter()
            .filter_map(move |seg| finish_segment(seg, self.max_title_chars))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextRefiner {
    settings: RefinerSettings,
}

impl TextRefiner {
    pub fn new(settings: RefinerSettings) -> Self {
        Self { settings }
    }

    pub fn refine(&self, raw: &str) -> Refinement {
        let max_title_chars = self.settings.max_title_chars;
        let text = raw.trim();
        if text.is_empty() {
            return Refinement {
                segments: Vec::new(),
                max_title_chars,
            };
        }

        if text.split_whitespace().count() < self.settings.short_text_words {
            let (heading, body) = leading_heading(text);
            return Refinement {
                segments: vec![Segment { heading, body }],
                max_title_chars,
            };
        }

        let strategies: [fn(&str) -> Vec<Segment>; 3] =
            [split_list_markers, split_headings, split_transitions];
        for strategy in strategies {
            let segments = merge_short(strategy(text), self.settings.min_segment_words);
            if segments.len() >= 2 {
                return Refinement {
                    segments,
                    max_title_chars,
                };
            }
        }

        let (heading, body) = leading_heading(text);
        let mut segments = self.chunk_sentences(&body);
        if let Some(first) = segments.first_mut() {
            first.heading = heading;
        }
        Refinement {
            segments,
            max_title_chars,
        }
    }

    /// Convenience for callers that want everything at once.
    pub fn refine_all(&self, raw: &str) -> Vec<RefinedChunk> {
        self.refine(raw).iter().collect()
    }

    /// Groups sentences into chunks near the target size, never exceeding
    /// the maximum unless a single sentence does.
    fn chunk_sentences(&self, text: &str) -> Vec<Segment> {
        let s = &self.settings;
        let mut chunks: Vec<(String, usize)> = Vec::new();
        let mut current = String::new();
        let mut current_words = 0;

        for sentence in split_sentences(text) {
            let words = sentence.split_whitespace().count();
            if current_words > 0 && current_words + words > s.max_chunk_words {
                chunks.push((std::mem::take(&mut current), current_words));
                current_words = 0;
            }
            push_words(&mut current, &sentence);
            current_words += words;
            if current_words >= s.target_chunk_words {
                chunks.push((std::mem::take(&mut current), current_words));
                current_words = 0;
            }
        }
        if current_words > 0 {
            chunks.push((current, current_words));
        }

        if chunks.len() >= 2 {
            let (_, last_words) = chunks[chunks.len() - 1];
            let (_, prev_words) = chunks[chunks.len() - 2];
            if last_words < s.min_chunk_words && prev_words + last_words <= s.max_chunk_words {
                if let Some((last, _)) = chunks.pop() {
                    if let Some((prev, words)) = chunks.last_mut() {
                        push_words(prev, &last);
                        *words += last_words;
                    }
                }
            }
        }

        chunks.into_iter().map(|(body, _)| Segment::plain(body)).collect()
    }
}

fn finish_segment(seg: &Segment, max_title_chars: usize) -> Option<RefinedChunk> {
    let mut body = clean_text(&seg.body);
    let heading = seg.heading.as_deref().map(clean_text);
    if !body.chars().any(char::is_alphanumeric) {
        body = heading.clone()?;
    }
    let title_source = match heading {
        Some(h) => h,
        None => split_sentences(&body).into_iter().next().unwrap_or_else(|| body.clone()),
    };
    Some(RefinedChunk {
        title: make_title(&title_source, max_title_chars),
        body,
    })
}

/// Trims terminal punctuation and shortens on a word boundary.
pub fn make_title(text: &str, max_chars: usize) -> String {
    let title = text.trim().trim_end_matches(['.', ':', ';', ',']).trim_end();
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let cut = truncate_on_char_boundary(title, max_chars.saturating_sub(3));
    let cut = match cut.rfind(' ') {
        Some(pos) if pos > 0 => &cut[..pos],
        _ => cut,
    };
    format!("{}...", cut.trim_end_matches([',', ';', ':', '-', ' ']))
}

/// Folds segments shorter than `min_words` into the following segment, or
/// into the previous one when there is no following segment.
fn merge_short(segments: Vec<Segment>, min_words: usize) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut carry: Option<Segment> = None;

    for seg in segments {
        let seg = match carry.take() {
            Some(mut short) => {
                short.absorb(seg);
                short
            }
            None => seg,
        };
        if seg.word_count() < min_words {
            carry = Some(seg);
        } else {
            out.push(seg);
        }
    }

    if let Some(short) = carry {
        match out.last_mut() {
            Some(last) => last.absorb(short),
            None => out.push(short),
        }
    }
    out
}

fn split_list_markers(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if LIST_MARKER_LINE.is_match(line) && !current.is_empty() {
            segments.push(Segment::plain(std::mem::take(&mut current)));
        }
        push_words(&mut current, line);
    }
    if !current.is_empty() {
        segments.push(Segment::plain(current));
    }
    segments
}

/// Short title-case line without terminal punctuation. Longer words must be
/// capitalised so that a wrapped sentence line is not taken for a heading.
fn is_heading_line(line: &str) -> bool {
    let line = line.trim();
    let Some(first) = line.chars().next() else {
        return false;
    };
    let last = line.chars().last().unwrap_or(first);
    let title_case = line.split_whitespace().all(|word| {
        word.chars().filter(|c| c.is_alphabetic()).count() < 4
            || word.chars().next().is_some_and(|c| !c.is_lowercase())
    });
    first.is_uppercase()
        && title_case
        && line.chars().count() <= 60
        && line.split_whitespace().count() <= 10
        && !matches!(last, '.' | ',' | ';' | ':' | '!' | '?' | '-')
}

/// A line that can open the body under a heading.
fn opens_body(line: &str) -> bool {
    !is_heading_line(line)
        && line
            .trim_start()
            .chars()
            .next()
            .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
}

/// Separates a heading on the first line from the text below it.
fn leading_heading(text: &str) -> (Option<String>, String) {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    match lines.as_slice() {
        [first, second, ..] if is_heading_line(first) && opens_body(second) => {
            (Some(first.to_string()), lines[1..].join("\n"))
        }
        _ => (None, text.to_string()),
    }
}

fn split_headings(text: &str) -> Vec<Segment> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let mut segments = Vec::new();
    let mut current = Segment::plain("");

    for (i, line) in lines.iter().enumerate() {
        let has_body_after = lines.get(i + 1).is_some_and(|next| opens_body(next));
        if is_heading_line(line) && has_body_after {
            if current.heading.is_some() || !current.body.is_empty() {
                segments.push(std::mem::replace(&mut current, Segment::plain("")));
            }
            current.heading = Some(line.to_string());
        } else {
            push_words(&mut current.body, line);
        }
    }
    if current.heading.is_some() || !current.body.is_empty() {
        segments.push(current);
    }
    segments
}

fn starts_with_transition(sentence: &str) -> bool {
    let lower = sentence.trim_start().to_lowercase();
    TRANSITIONS.iter().any(|t| {
        lower.starts_with(t)
            && lower[t.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn split_transitions(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    for sentence in split_sentences(text) {
        if starts_with_transition(&sentence) && !current.is_empty() {
            segments.push(Segment::plain(std::mem::take(&mut current)));
        }
        push_words(&mut current, &sentence);
    }
    if !current.is_empty() {
        segments.push(Segment::plain(current));
    }
    segments
}

fn is_abbreviation(token: &str) -> bool {
    let lower = token.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) {
        return true;
    }
    if DOTTED_INITIALISM.is_match(token) {
        return true;
    }
    // Initials such as "J." in a name.
    let mut chars = token.chars();
    matches!((chars.next(), chars.next(), chars.next()), (Some(c), Some('.'), None) if c.is_uppercase())
}

/// Splits on `.`, `!` or `?` followed by whitespace and an uppercase letter,
/// digit or opening quote, except after a known abbreviation.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        if !chars.get(i + 1).is_some_and(|(_, next)| next.is_whitespace()) {
            continue;
        }
        let following = chars[i + 1..]
            .iter()
            .map(|(_, ch)| *ch)
            .find(|ch| !ch.is_whitespace());
        let opens_sentence = following.is_some_and(|f| {
            f.is_uppercase() || f.is_ascii_digit() || matches!(f, '"' | '\'' | '(')
        });
        if !opens_sentence {
            continue;
        }
        let end = pos + c.len_utf8();
        if c == '.' {
            let token = text[start..end].split_whitespace().last().unwrap_or("");
            if is_abbreviation(token) {
                continue;
            }
        }
        let sentence = text[start..end].split_whitespace().collect::<Vec<_>>().join(" ");
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = end;
    }

    let tail = text[start..].split_whitespace().collect::<Vec<_>>().join(" ");
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Repairs common extraction artefacts. Idempotent.
pub fn clean_text(text: &str) -> String {
    let mut current = LINE_BREAK_HYPHEN
        .replace_all(&replace_special_chars(text), "$1$2")
        .into_owned();
    for _ in 0..MAX_CLEAN_PASSES {
        let next = clean_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn replace_special_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201F}' | '\u{2033}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            '\u{00A0}' | '\u{2009}' | '\u{202F}' => out.push(' '),
            '\u{00AD}' | '\u{200B}' | '\u{FEFF}' => {}
            _ => out.push(c),
        }
    }
    out
}

fn clean_pass(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(text.trim(), "$1");
    let text = MISSING_SPACE_CLAUSE.replace_all(&text, "$1$2 $3");
    let text = MISSING_SPACE_SENTENCE.replace_all(&text, "$1$2 $3");
    let text = drop_spurious_periods(&text);
    let text = drop_stray_chars(&text);
    let mut text = text.as_str();
    while let Some(m) = LEADING_MARKER.find(text) {
        text = &text[m.end()..];
    }
    finish_sentence(text.trim())
}

/// "the old. town" -> "the old town", unless the dotted word is an
/// abbreviation.
fn drop_spurious_periods(text: &str) -> String {
    let tokens: Vec<&str> = text.split(' ').collect();
    let mut out: Vec<&str> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let next_lower = tokens
            .get(i + 1)
            .and_then(|n| n.chars().next())
            .is_some_and(char::is_lowercase);
        let single_dot = token.ends_with('.') && !token.ends_with("..");
        if next_lower
            && single_dot
            && token.chars().any(char::is_alphabetic)
            && !is_abbreviation(token)
        {
            out.push(&token[..token.len() - 1]);
        } else {
            out.push(token);
        }
    }
    out.join(" ")
}

/// Removes lone symbols and letters wedged between two words.
fn drop_stray_chars(text: &str) -> String {
    let tokens: Vec<&str> = text.split(' ').collect();
    let mut out: Vec<&str> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let mut chars = token.chars();
        let stray = match (chars.next(), chars.next()) {
            (Some(c), None) => {
                !KEPT_SINGLE_CHARS.contains(&c)
                    && !c.is_ascii_digit()
                    && !c.is_uppercase()
                    && !matches!(c, '.' | ',' | '"' | '\'' | '(' | ')')
            }
            _ => false,
        };
        let between_words = i > 0
            && out
                .last()
                .and_then(|p| p.chars().last())
                .is_some_and(char::is_alphabetic)
            && tokens
                .get(i + 1)
                .and_then(|n| n.chars().next())
                .is_some_and(char::is_alphabetic);
        if !(stray && between_words) {
            out.push(token);
        }
    }
    out.join(" ")
}

fn finish_sentence(text: &str) -> String {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut out: String = first.to_uppercase().chain(chars).collect();
    if out.chars().last().is_some_and(char::is_alphanumeric) {
        out.push('.');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn refiner() -> TextRefiner {
        TextRefiner::default()
    }

    #[test]
    fn test_blank_input_yields_nothing() {
        let refinement = refiner().refine("  \n\t ");
        assert!(refinement.is_empty());
        assert_eq!(refinement.iter().count(), 0);
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = refiner().refine_all("the old town has narrow streets and a lively market");
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].body,
            "The old town has narrow streets and a lively market."
        );
        assert_eq!(
            chunks[0].title,
            "The old town has narrow streets and a lively market"
        );
    }

    #[test]
    fn test_splits_numbered_list() {
        let text = "1. Visit the old harbour early in the morning to avoid the crowds.\n\
                    2. Take the coastal train to Cassis for a day of swimming and hiking.\n\
                    3. Book dinner at a small bistro in the old town well ahead of time.";
        let chunks = refiner().refine_all(text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].body.starts_with("Visit the old harbour"));
        assert!(chunks[1].body.starts_with("Take the coastal train"));
        assert!(chunks[2].body.starts_with("Book dinner"));
    }

    #[test]
    fn test_splits_on_headings() {
        let text = "Coastal Adventures\n\
                    The coastline offers sandy beaches, hidden coves and clear water for snorkeling.\n\
                    Culinary Experiences\n\
                    Provence is famous for its markets, olive oil and long lunches under plane trees.";
        let chunks = refiner().refine_all(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].title, "Coastal Adventures");
        assert_eq!(chunks[1].title, "Culinary Experiences");
        assert!(chunks[1].body.starts_with("Provence is famous"));
    }

    #[test]
    fn test_leading_heading_becomes_title() {
        let text = "Coastal Adventures\n\
                    The coastline offers sandy beaches, hidden coves and clear water for snorkeling. \
                    The calanques near Cassis are perfect for kayaking with a group of friends.";
        let chunks = refiner().refine_all(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].title, "Coastal Adventures");
        assert!(chunks[0].body.starts_with("The coastline offers"));
    }

    #[test]
    fn test_wrapped_sentence_line_is_not_a_heading() {
        let text = "Nice is the capital of the French\n\
                    Riviera and a lively base for day trips along the coast to Monaco and Menton.";
        let chunks = refiner().refine_all(text);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].title.starts_with("Nice is the capital of the French Riviera"));
    }

    #[test]
    fn test_splits_on_transitions() {
        let text = "The museum district holds most of the major collections in the city. \
                    Opening hours vary by season and some close on Mondays. \
                    However, the smaller galleries stay open late on Thursdays and rarely have queues. \
                    In addition, a combined pass covers entry to twelve sites over three days.";
        let chunks = refiner().refine_all(text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[1].body.starts_with("However,"));
        assert!(chunks[2].body.starts_with("In addition,"));
    }

    #[test]
    fn test_short_segments_merge_forward() {
        let text = "1. Pack light.\n\
                    2. Bring comfortable shoes because most of the old town is cobbled and steep.\n\
                    3. Carry some cash since many small bakeries and markets do not take cards.";
        let chunks = refiner().refine_all(text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].body.starts_with("Pack light."));
        assert!(chunks[0].body.contains("Bring comfortable shoes"));
    }

    #[test]
    fn test_sentence_chunking_respects_sizes() {
        let sentence = "Walking tours leave the main square every hour during the summer season. ";
        let text = sentence.repeat(60);
        let refinement = refiner().refine(&text);
        let settings = RefinerSettings::default();
        assert!(refinement.segment_count() >= 2);
        for chunk in refinement.iter() {
            let words = chunk.body.split_whitespace().count();
            assert!(words <= settings.max_chunk_words, "{words}");
            assert!(words >= settings.min_chunk_words, "{words}");
        }
    }

    #[test]
    fn test_iteration_is_restartable() {
        let text = "1. First stop is the harbour where the fishing boats come in each morning.\n\
                    2. Second stop is the castle hill with its views over the whole bay area.";
        let refinement = refiner().refine(text);
        let first: Vec<_> = refinement.iter().collect();
        let second: Vec<_> = refinement.iter().collect();
        assert_eq!(first, second);
        assert_eq!(refinement.iter().take(1).count(), 1);
    }

    #[test]
    fn test_split_sentences_keeps_abbreviations() {
        let sentences =
            split_sentences("Bring snacks, e.g. Fruit and nuts. Then go! 3 hours later we rest.");
        assert_eq!(
            sentences,
            vec![
                "Bring snacks, e.g. Fruit and nuts.",
                "Then go!",
                "3 hours later we rest."
            ]
        );
    }

    #[test]
    fn test_clean_collapses_whitespace_and_fixes_punctuation() {
        assert_eq!(
            clean_text("  the  hotel ,near\nthe beach"),
            "The hotel, near the beach."
        );
        assert_eq!(clean_text("the end.Next day"), "The end. Next day.");
    }

    #[test]
    fn test_clean_removes_spurious_period() {
        assert_eq!(
            clean_text("Visit the old. town in spring"),
            "Visit the old town in spring."
        );
        assert_eq!(
            clean_text("Bring snacks, e.g. fruit and nuts"),
            "Bring snacks, e.g. fruit and nuts."
        );
    }

    #[test]
    fn test_clean_keeps_dotted_initialisms() {
        assert_eq!(clean_text("U.S. travel tips"), "U.S. travel tips.");
        assert_eq!(
            clean_text("flights from the U.K. usually land in Nice"),
            "Flights from the U.K. usually land in Nice."
        );
    }

    #[test]
    fn test_clean_normalizes_special_characters() {
        assert_eq!(clean_text("ﬁnd the ﬂow"), "Find the flow.");
        assert_eq!(
            clean_text("\u{201C}Nice\u{201D} \u{2014} a city"),
            "\"Nice\" - a city."
        );
        assert_eq!(clean_text("explo-\nration of caves"), "Exploration of caves.");
    }

    #[test]
    fn test_clean_strips_markers_and_stray_characters() {
        assert_eq!(clean_text("• Pack light"), "Pack light.");
        assert_eq!(clean_text("2) visit the fort"), "Visit the fort.");
        assert_eq!(clean_text("museums ~ galleries"), "Museums galleries.");
        assert_eq!(clean_text("food & wine"), "Food & wine.");
    }

    #[test]
    fn test_clean_is_idempotent() {
        for sample in [
            "  the  hotel ,near\nthe beach",
            "• a) visit the old. town ~ today!",
            "ﬁnd the ﬂow…and then. stop",
            "U.S. travel tips: e.g. pack light.Then go",
        ] {
            let once = clean_text(sample);
            assert_eq!(clean_text(&once), once, "sample {sample:?}");
        }
    }

    #[test]
    fn test_title_truncates_on_word_boundary() {
        let title = make_title(
            "An unusually long opening sentence that keeps going well past any sensible title length for a summary",
            40,
        );
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= 40);
        assert!(!title.trim_end_matches("...").ends_with(' '));
    }
}
