//! Markdown to hypertext transformation.
//!
//! A line oriented dialect: the tokenizer lifts fenced blocks out first so
//! their interior stays verbatim, every other line is classified after the
//! inline substitutions ran over it, and adjacent singleton wrappers are
//! merged while rendering.

use lazy_static::lazy_static;
use regex::Regex;

mod inline;

lazy_static! {
    static ref ORDERED_ITEM: Regex = Regex::new(r"^[0-9]+\.(.*)$").unwrap();
    static ref BLOCK_TAG: Regex = Regex::new(r"(?i)^</?(ul|ol|li|h|p|bl)").unwrap();
}

const CODE_FENCE: &str = "```";
const SCRIPT_FENCE: &str = "&&&";

#[derive(Debug, PartialEq)]
enum Block {
    Heading(usize, String),
    Code(String),
    Script(String),
    UnorderedItem(String),
    OrderedItem(String),
    Quote(String),
    Rule,
    Line(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Markdown;

impl Markdown {
    pub fn new() -> Self {
        Self
    }

    /// Stateless transformation of markdown text into hypertext.
    pub fn render(&self, text: &str) -> String {
        render_blocks(&tokenize(text))
    }
}

fn tokenize(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = vec![];
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with(CODE_FENCE) {
            if let Some((interior, next)) = take_fenced(&lines, i, CODE_FENCE) {
                blocks.push(Block::Code(interior));
                i = next;
                continue;
            }
        }

        if lines[i].starts_with(SCRIPT_FENCE) {
            if let Some((interior, next)) = take_fenced(&lines, i, SCRIPT_FENCE) {
                blocks.push(Block::Script(interior));
                i = next;
                continue;
            }
        }

        blocks.push(classify(lines[i]));
        i += 1;
    }

    blocks
}

/// Collects the interior of a fenced block verbatim. The opening line is the
/// fence marker plus an optional language tag; both fence lines are dropped.
/// Returns None when the fence never closes, so the opening line falls
/// through to the line rules.
fn take_fenced(lines: &[&str], start: usize, fence: &str) -> Option<(String, usize)> {
    let close = lines[start + 1..]
        .iter()
        .position(|line| line.starts_with(fence))?;

    let interior = lines[start + 1..start + 1 + close].join("\n");

    Some((interior, start + close + 2))
}

fn classify(line: &str) -> Block {
    // Heading lines are recognized before the inline rules run; their
    // content still receives inline treatment.
    if let Some(stripped) = line.strip_prefix('#') {
        let level = 1 + stripped.chars().take_while(|&c| c == '#').count();
        let content = stripped.trim_start_matches('#');
        return Block::Heading(level, inline::apply(content.trim()));
    }

    // Inline rules run before the remaining line rules: a line whose leading
    // delimiter was consumed by emphasis is not a list item.
    let line = inline::apply(line);

    if let Some(item) = line.strip_prefix('*') {
        return Block::UnorderedItem(item.trim().to_string());
    }

    if let Some(caps) = ORDERED_ITEM.captures(&line) {
        return Block::OrderedItem(caps[1].trim().to_string());
    }

    if let Some(item) = line.strip_prefix('>').or_else(|| line.strip_prefix("&gt;")) {
        return Block::Quote(item.trim().to_string());
    }

    if line.len() >= 5 && line.chars().all(|c| c == '-') {
        return Block::Rule;
    }

    Block::Line(line)
}

fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut i = 0;

    while i < blocks.len() {
        match &blocks[i] {
            Block::Heading(level, content) => {
                out.push_str(&format!("<h{level}>{content}</h{level}>\n"));
                i += 1;
            }
            Block::Code(interior) => {
                out.push_str(&format!("<pre>{}</pre>\n", interior.trim()));
                i += 1;
            }
            Block::Script(interior) => {
                out.push_str(&format!(
                    "<script type=\"text/javascript\">{}</script>\n",
                    interior.trim()
                ));
                i += 1;
            }
            Block::UnorderedItem(_) => {
                out.push_str("<ul>\n");
                while let Some(Block::UnorderedItem(item)) = blocks.get(i) {
                    out.push_str(&format!("\t<li>{item}</li>\n"));
                    i += 1;
                }
                out.push_str("</ul>\n");
            }
            Block::OrderedItem(_) => {
                out.push_str("<ol>\n");
                while let Some(Block::OrderedItem(item)) = blocks.get(i) {
                    out.push_str(&format!("\t<li>{item}</li>\n"));
                    i += 1;
                }
                out.push_str("</ol>\n");
            }
            Block::Quote(_) => {
                let mut items = vec![];
                while let Some(Block::Quote(item)) = blocks.get(i) {
                    items.push(item.as_str());
                    i += 1;
                }
                out.push_str(&format!("<blockquote>{}</blockquote>\n", items.join("\n")));
            }
            Block::Rule => {
                out.push_str("<hr />\n");
                i += 1;
            }
            Block::Line(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    if BLOCK_TAG.is_match(trimmed) {
                        out.push_str(text);
                        out.push('\n');
                    } else {
                        out.push_str(&format!("<p>{trimmed}</p>\n"));
                    }
                }
                i += 1;
            }
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(text: &str) -> String {
        Markdown::new().render(text)
    }

    #[test]
    fn headings_by_mark_count() {
        assert_eq!(render("# One"), "<h1>One</h1>");
        assert_eq!(render("### Three"), "<h3>Three</h3>");
        assert_eq!(render("######Six"), "<h6>Six</h6>");
    }

    #[test]
    fn heading_content_gets_inline_treatment() {
        assert_eq!(
            render("## A **bold** move"),
            "<h2>A <strong>bold</strong> move</h2>"
        );
    }

    #[test]
    fn bold_and_emphasis() {
        assert_eq!(
            render("**bold** and *em*"),
            "<p><strong>bold</strong> and <em>em</em></p>"
        );
        assert_eq!(
            render("__bold__ and _em_"),
            "<p><strong>bold</strong> and <em>em</em></p>"
        );
    }

    #[test]
    fn image_is_not_swallowed_by_link_rule() {
        assert_eq!(
            render("![alt text](pic.png)"),
            "<p><img src='pic.png' alt='alt text'></p>"
        );
    }

    #[test]
    fn linked_image() {
        assert_eq!(
            render("[![alt](pic.png)](http://example.com)"),
            "<p><a href='http://example.com'><img src='pic.png' alt='alt'></a></p>"
        );
    }

    #[test]
    fn hyperlink() {
        assert_eq!(
            render("[home](http://example.com)"),
            "<p><a href='http://example.com'>home</a></p>"
        );
    }

    #[test]
    fn strikethrough_and_inline_quote() {
        assert_eq!(render("~~gone~~"), "<p><del>gone</del></p>");
        assert_eq!(render(r#":"said so":"#), "<p><q>said so</q></p>");
    }

    #[test]
    fn inline_code_runs_after_emphasis() {
        // Backticks do not protect their interior from earlier inline rules.
        assert_eq!(render("`*x*`"), "<p><code><em>x</em></code></p>");
    }

    #[test]
    fn fenced_code_interior_is_verbatim() {
        let text = "```\n* not a list\n**verbatim**\n```";
        assert_eq!(render(text), "<pre>* not a list\n**verbatim**</pre>");
    }

    #[test]
    fn fenced_code_language_tag_is_dropped() {
        assert_eq!(render("```rust\nlet x = 1;\n```"), "<pre>let x = 1;</pre>");
    }

    #[test]
    fn fenced_code_preserves_interior_whitespace() {
        let text = "```\nfn main() {\n    body();\n}\n```";
        assert_eq!(render(text), "<pre>fn main() {\n    body();\n}</pre>");
    }

    #[test]
    fn unterminated_fence_falls_through_to_line_rules() {
        assert!(!render("```\nno closing fence").contains("<pre>"));
    }

    #[test]
    fn script_block_passes_through_literally() {
        let text = "&&&\nconsole.log('*hi*');\n&&&";
        assert_eq!(
            render(text),
            "<script type=\"text/javascript\">console.log('*hi*');</script>"
        );
    }

    #[test]
    fn consecutive_list_items_merge() {
        assert_eq!(
            render("* one\n* two"),
            "<ul>\n\t<li>one</li>\n\t<li>two</li>\n</ul>"
        );
    }

    #[test]
    fn ordered_list_items_merge() {
        assert_eq!(
            render("1. first\n2. second"),
            "<ol>\n\t<li>first</li>\n\t<li>second</li>\n</ol>"
        );
    }

    #[test]
    fn adjacent_blockquote_lines_merge() {
        assert_eq!(render("> a\n> b"), "<blockquote>a\nb</blockquote>");
    }

    #[test]
    fn emphasis_consumes_a_would_be_list_marker() {
        // The leading star pairs with a later one before list classification.
        assert_eq!(render("*one* two"), "<p><em>one</em> two</p>");
    }

    #[test]
    fn horizontal_rule_needs_five_hyphens() {
        assert_eq!(render("-----"), "<hr />");
        assert_eq!(render("----"), "<p>----</p>");
    }

    #[test]
    fn paragraphs_wrap_plain_lines_only() {
        assert_eq!(
            render("plain\n<h1>raw</h1>\nmore"),
            "<p>plain</p>\n<h1>raw</h1>\n<p>more</p>"
        );
    }

    #[test]
    fn blank_lines_produce_nothing() {
        assert_eq!(render("a\n\n\nb"), "<p>a</p>\n<p>b</p>");
    }

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(render(""), "");
    }
}
