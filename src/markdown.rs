//! Markdown to HTML conversion.
//!
//! The rest of the build only sees the [`MarkdownConverter`] trait, so the
//! dialect is decided here and nowhere else.

use pulldown_cmark::{Options, Parser, html};

/// Converts markdown source into an HTML fragment.
pub trait MarkdownConverter: Send + Sync {
    fn to_html(&self, markdown: &str) -> String;
}

/// CommonMark with tables, strikethrough and footnotes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CmarkConverter;

impl MarkdownConverter for CmarkConverter {
    fn to_html(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_FOOTNOTES);
        let parser = Parser::new_ext(markdown, options);
        let mut out = String::new();
        html::push_html(&mut out, parser);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_paragraphs_and_emphasis() {
        let html = CmarkConverter.to_html("Some *text* here.");
        assert_eq!(html, "<p>Some <em>text</em> here.</p>\n");
    }

    #[test]
    fn renders_tables() {
        let html = CmarkConverter.to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn empty_input() {
        assert_eq!(CmarkConverter.to_html(""), "");
    }
}
