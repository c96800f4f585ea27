use crate::{
    config::{Config, SourceMode},
    error::PamphletError,
    fetch::Fetcher,
    layout::{Rendered, Templater},
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A front matter value. Keys configured as list attributes hold an ordered
/// sequence of trimmed entries instead of the raw comma string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Scalar(String),
    List(Vec<String>),
}

/// One content item, identified by its source URL. Created URL-only by the
/// directory scan, then filled in by `fetch` and `parse_content`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct File {
    /// Source URL the raw content is fetched from
    pub url: String,

    /// Owning content type
    #[serde(rename = "type")]
    pub type_name: String,

    /// Layout used for the single view
    pub layout: String,

    /// Slug derived from the URL tail
    pub name: String,

    pub extension: String,

    /// Content is already hypertext and skips markdown rendering
    pub html: bool,

    /// Raw fetched text, front matter included
    pub content: String,

    pub title: Option<String>,
    pub seotitle: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,

    /// Display date, formatted through the configured date format
    pub date: Option<String>,

    /// Resolved point in time backing `date`
    pub datetime: Option<DateTime<Utc>>,

    pub tags: Vec<String>,

    /// Remaining front matter keys, visible to templates as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetaValue>,

    /// Canonical navigable identifier, a pure function of (url, type, mode)
    pub permalink: String,

    /// Rendered hypertext body
    pub body: String,

    /// Raw datetime candidate: the transport's last-modified timestamp,
    /// overridden by an explicit `datetime` front matter key
    #[serde(skip)]
    datetime_raw: Option<String>,

    /// Body text reconstituted from the segments after the front matter
    #[serde(skip)]
    raw_body: String,
}

impl File {
    pub fn new(
        url: impl Into<String>,
        type_name: impl Into<String>,
        layout: impl Into<String>,
        html: bool,
    ) -> Self {
        Self {
            url: url.into(),
            type_name: type_name.into(),
            layout: layout.into(),
            html,
            ..Default::default()
        }
    }

    /// Fetches the raw content. The transport's last-modified timestamp is
    /// kept as a datetime fallback until parsing decides otherwise.
    pub async fn fetch(&mut self, fetcher: &dyn Fetcher) -> Result<(), PamphletError> {
        debug!("loading {}", self.url);

        let response = fetcher.get(&self.url).await?;
        self.content = response.body;

        if response.last_modified.is_some() {
            self.datetime_raw = response.last_modified;
        }

        Ok(())
    }

    /// Fills in every derived attribute from the fetched content.
    pub fn parse_content(
        &mut self,
        config: &Config,
        date_parser: &Regex,
        render_body: &dyn Fn(&str) -> String,
    ) {
        self.set_filename(config);
        self.set_permalink(config);
        self.parse_front_matter(config);
        self.set_date(config, date_parser);
        self.set_body(render_body);
    }

    fn set_filename(&mut self, config: &Config) {
        let tail = self.url.rsplit('/').next().unwrap_or(&self.url);
        self.name = tail
            .strip_suffix(config.extension.as_str())
            .unwrap_or(tail)
            .to_string();
        self.extension = self.url.rsplit('.').next().unwrap_or_default().to_string();
    }

    fn set_permalink(&mut self, config: &Config) {
        self.permalink = match config.mode {
            SourceMode::Github => format!("#/{}/{}", self.type_name, self.name),
            SourceMode::Server => match self.url.strip_suffix(config.extension.as_str()) {
                Some(base) => format!("{base}.html"),
                None => self.url.clone(),
            },
        };
    }

    /// Splits the content on the separator line. Segment 1 is the metadata
    /// block; all later segments are rejoined with the separator, since the
    /// body may legitimately contain the separator pattern itself.
    fn parse_front_matter(&mut self, config: &Config) {
        let separator = config.front_matter_separator.as_str();
        let segments = split_segments(&self.content, separator);

        if segments.len() < 2 {
            self.raw_body = self.content.clone();
            return;
        }

        self.raw_body = segments[2..].join(&format!("\n{separator}\n"));

        for line in segments[1].lines() {
            // Only the first colon delimits; values may contain more.
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };

            let (key, value) = (key.trim(), value.trim());

            // Empty values are dropped; explicit "false" survives.
            if value.is_empty() {
                continue;
            }

            self.assign(key, value, config);
        }
    }

    fn assign(&mut self, key: &str, value: &str, config: &Config) {
        if config.list_attributes.iter().any(|a| a == key) {
            let items: Vec<String> = value.split(',').map(|s| s.trim().to_string()).collect();
            if key == "tags" {
                self.tags = items;
            } else {
                self.extra.insert(key.to_string(), MetaValue::List(items));
            }
            return;
        }

        match key {
            "title" => self.title = Some(value.to_string()),
            "seotitle" => self.seotitle = Some(value.to_string()),
            "excerpt" => self.excerpt = Some(value.to_string()),
            "author" => self.author = Some(value.to_string()),
            "image" => self.image = Some(value.to_string()),
            "date" => self.date = Some(value.to_string()),
            "datetime" => self.datetime_raw = Some(value.to_string()),
            _ => {
                self.extra
                    .insert(key.to_string(), MetaValue::Scalar(value.to_string()));
            }
        }
    }

    /// Date precedence: explicit `date` front matter, then a date embedded
    /// in the URL, then the last-modified fallback. The first matching
    /// source wins; later ones are not consulted.
    fn set_date(&mut self, config: &Config, date_parser: &Regex) {
        if let Some(date) = self.date.clone() {
            if let Some(datetime) = parse_datetime(&date) {
                self.datetime = Some(datetime);
                self.date = Some(datetime.format(&config.date_format).to_string());
            }
        } else if let Some(found) = date_parser.find(&self.url) {
            if let Some(datetime) = parse_datetime(found.as_str()) {
                self.datetime = Some(datetime);
                self.date = Some(datetime.format(&config.date_format).to_string());
            }
        } else if let Some(raw) = self.datetime_raw.clone() {
            if let Some(datetime) = parse_datetime(&raw) {
                self.datetime = Some(datetime);
                self.date = Some(datetime.format(&config.date_format).to_string());
            }
        }
    }

    fn set_body(&mut self, render_body: &dyn Fn(&str) -> String) {
        self.body = if self.html {
            self.raw_body.clone()
        } else {
            render_body(&self.raw_body)
        };
    }

    /// True when every whitespace separated term occurs in the raw content
    /// or the title, case-insensitively.
    pub fn matches_search(&self, query: &str) -> bool {
        let content = self.content.to_lowercase();
        let title = self
            .title
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        query
            .to_lowercase()
            .split_whitespace()
            .all(|term| content.contains(term) || title.contains(term))
    }

    pub async fn render(&self, templater: &mut Templater) -> Result<Rendered, PamphletError> {
        let title = self
            .seotitle
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| "Page".to_string());

        let html = templater.render(&self.layout, self).await?;

        Ok(Rendered {
            title: Some(title),
            html,
        })
    }
}

/// Splits text into the groups of lines between separator lines.
fn split_segments(content: &str, separator: &str) -> Vec<String> {
    let mut segments = vec![];
    let mut current: Vec<&str> = vec![];

    for line in content.lines() {
        if line == separator {
            segments.push(current.join("\n"));
            current.clear();
        } else {
            current.push(line);
        }
    }

    segments.push(current.join("\n"));
    segments
}

fn parse_datetime(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Some(datetime.with_timezone(&Utc));
    }

    if let Ok(datetime) = DateTime::parse_from_rfc2822(input) {
        return Some(datetime.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    // Year and month only, as the URL date pattern allows
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{input}-01"), "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}
