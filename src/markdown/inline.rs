use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref IMAGE: Regex = Regex::new(r"!\[([^\[]+)\]\(([^)]+)\)").unwrap();
    static ref LINK: Regex = Regex::new(r"\[([^\[]+)\]\(([^)]+)\)").unwrap();
    static ref BOLD: Regex = Regex::new(r"\*\*(.*?)\*\*|__(.*?)__").unwrap();
    static ref EMPHASIS: Regex = Regex::new(r"\*(.*?)\*|_(.*?)_").unwrap();
    static ref STRIKETHROUGH: Regex = Regex::new(r"~~(.*?)~~").unwrap();
    static ref QUOTE: Regex = Regex::new(r#":"(.*?)":"#).unwrap();
    static ref CODE: Regex = Regex::new(r"`(.*?)`").unwrap();
}

/// Applies the inline rules in their fixed order. Images must be consumed
/// before hyperlinks (the image pattern is a superset of the link pattern)
/// and the doubled delimiter pair before single emphasis.
pub(super) fn apply(line: &str) -> String {
    let text = IMAGE.replace_all(line, "<img src='${2}' alt='${1}'>");
    let text = LINK.replace_all(&text, "<a href='${2}'>${1}</a>");
    let text = BOLD.replace_all(&text, |caps: &Captures| {
        format!("<strong>{}</strong>", either_group(caps))
    });
    let text = EMPHASIS.replace_all(&text, |caps: &Captures| {
        format!("<em>{}</em>", either_group(caps))
    });
    let text = STRIKETHROUGH.replace_all(&text, "<del>${1}</del>");
    let text = QUOTE.replace_all(&text, "<q>${1}</q>");
    let text = CODE.replace_all(&text, "<code>${1}</code>");

    text.into_owned()
}

fn either_group<'t>(caps: &Captures<'t>) -> &'t str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default()
}
