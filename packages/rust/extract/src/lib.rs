//! HTML content extraction for Firmscope.
//!
//! Turns fetched pages into the text fragments the model sees:
//! - [`visible_paragraph_text`]: the paragraph rule applied to source pages
//! - [`find_leadership_link`]: anchor scan for a company's leadership page
//! - [`collect_executive_blocks`]: heading/paragraph pairs and role-tagged blocks

mod leadership;
mod paragraphs;
mod text;

pub use leadership::{collect_executive_blocks, find_leadership_link};
pub use paragraphs::{NO_RELEVANT_DATA, ParagraphRule, select_paragraphs, visible_paragraph_text};
pub use text::{TRUNCATION_MARKER, normalize_whitespace, truncate_content};
