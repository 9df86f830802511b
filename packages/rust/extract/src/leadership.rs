//! Leadership page discovery and executive block collection.
//!
//! Both functions work on raw HTML. Leadership pages vary too much for
//! structural extraction, so the blocks collected here are handed to the
//! model rather than parsed further.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::text::{normalize_whitespace, truncate_content};

/// Anchor text that points at a leadership or team page.
static LEADERSHIP_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(leadership|team|executives|management|about-us|board)")
        .expect("leadership link regex")
});

/// Role keywords that mark a `div` as executive-related.
static ROLE_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(CEO|CTO|CFO|Founder|Executive|Director|Board|Leadership|Manager|Officer)")
        .expect("role keyword regex")
});

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

static HEADING_OR_P_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, p").expect("valid selector"));

static DIV_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div").expect("valid selector"));

fn element_text(el: &ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

// ---------------------------------------------------------------------------
// Leadership link
// ---------------------------------------------------------------------------

/// Find the first anchor whose text looks like a leadership link, resolved
/// against `base`. Only http(s) targets are returned.
pub fn find_leadership_link(html: &str, base: &Url) -> Option<Url> {
    let doc = Html::parse_document(html);

    for anchor in doc.select(&ANCHOR_SEL) {
        let text = element_text(&anchor);
        if !LEADERSHIP_LINK_RE.is_match(&text) {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.starts_with("javascript:") || href.starts_with("mailto:") {
            continue;
        }
        match base.join(href) {
            Ok(mut resolved) if matches!(resolved.scheme(), "http" | "https") => {
                resolved.set_fragment(None);
                debug!(%resolved, anchor = %text, "leadership link found");
                return Some(resolved);
            }
            _ => continue,
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Executive blocks
// ---------------------------------------------------------------------------

/// Collect candidate executive text from a leadership page.
///
/// Blocks are every `h2`/`h3`/`h4` heading paired with the next `<p>` in
/// document order (`"{heading}: {paragraph}"`), followed by every `div`
/// whose text mentions a role keyword. Blocks are whitespace-normalized,
/// exact duplicates dropped, joined by newlines and cut to `max_chars`.
///
/// Returns `None` when the page has nothing to offer.
pub fn collect_executive_blocks(html: &str, max_chars: usize) -> Option<String> {
    let doc = Html::parse_document(html);
    let mut blocks: Vec<String> = Vec::new();

    // Walk headings and paragraphs backwards so each heading sees the
    // nearest paragraph after it.
    let ordered: Vec<ElementRef<'_>> = doc.select(&HEADING_OR_P_SEL).collect();
    let mut next_paragraph: Option<String> = None;
    let mut heading_blocks: Vec<String> = Vec::new();
    for el in ordered.iter().rev() {
        let text = element_text(el);
        if el.value().name() == "p" {
            next_paragraph = Some(text);
            continue;
        }
        if text.is_empty() {
            continue;
        }
        heading_blocks.push(match next_paragraph.as_deref() {
            Some(p) if !p.is_empty() => format!("{text}: {p}"),
            _ => text,
        });
    }
    heading_blocks.reverse();
    blocks.extend(heading_blocks);

    blocks.extend(
        doc.select(&DIV_SEL)
            .map(|div| element_text(&div))
            .filter(|text| ROLE_KEYWORD_RE.is_match(text)),
    );

    let mut seen = HashSet::new();
    let unique: Vec<String> = blocks
        .into_iter()
        .filter(|b| !b.is_empty() && seen.insert(b.clone()))
        .collect();

    if unique.is_empty() {
        return None;
    }

    debug!(blocks = unique.len(), "executive blocks collected");
    Some(truncate_content(&unique.join("\n"), max_chars))
}
