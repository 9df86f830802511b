//! Visible paragraph text for source pages.

use std::sync::LazyLock;

use firmscope_shared::FetchConfig;
use scraper::{Html, Selector};

use crate::text::normalize_whitespace;

/// Placeholder text for a page that yielded no qualifying paragraphs.
pub const NO_RELEVANT_DATA: &str = "No relevant data found.";

static P_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

/// Which paragraphs of a page count as source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphRule {
    /// Paragraphs must be strictly longer than this many characters.
    pub min_chars: usize,
    /// At most this many paragraphs are kept.
    pub limit: usize,
}

impl Default for ParagraphRule {
    fn default() -> Self {
        Self {
            min_chars: 50,
            limit: 5,
        }
    }
}

impl From<&FetchConfig> for ParagraphRule {
    fn from(config: &FetchConfig) -> Self {
        Self {
            min_chars: config.paragraph_min_chars,
            limit: config.paragraph_limit,
        }
    }
}

/// Apply `rule` to already-extracted paragraph texts, space-joining the survivors.
///
/// Returns [`NO_RELEVANT_DATA`] when nothing qualifies.
pub fn select_paragraphs<I, S>(texts: I, rule: ParagraphRule) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kept: Vec<String> = texts
        .into_iter()
        .map(|t| normalize_whitespace(t.as_ref()))
        .filter(|t| t.chars().count() > rule.min_chars)
        .take(rule.limit)
        .collect();

    if kept.is_empty() {
        NO_RELEVANT_DATA.to_string()
    } else {
        kept.join(" ")
    }
}

/// Extract the qualifying `<p>` texts of an HTML document.
pub fn visible_paragraph_text(html: &str, rule: ParagraphRule) -> String {
    let doc = Html::parse_document(html);
    let texts = doc
        .select(&P_SEL)
        .map(|p| p.text().collect::<String>());
    select_paragraphs(texts, rule)
}
