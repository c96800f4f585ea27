use crate::{
    config::{Config, LayoutConfig, TypeConfig},
    error::PamphletError,
    fetch::Fetcher,
    file::File,
    layout::{Rendered, Templater},
};
use futures::future::join_all;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, error, info};

pub mod scan;

/// Tag occurrence within a collection, in order of first discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub count: usize,
}

/// The files of one content type. The backing list owns every file; the
/// active view is a list of indices into it, so filtering can never clone
/// or mutate the files themselves.
#[derive(Debug)]
pub struct FileCollection {
    type_name: String,
    layout: LayoutConfig,
    html: bool,
    files: Vec<File>,
    active: Vec<usize>,
}

impl FileCollection {
    pub fn new(type_config: &TypeConfig) -> Self {
        Self {
            type_name: type_config.name.clone(),
            layout: type_config.layout.clone(),
            html: type_config.html,
            files: vec![],
            active: vec![],
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn active_files(&self) -> Vec<&File> {
        self.active.iter().filter_map(|&i| self.files.get(i)).collect()
    }

    /// Discovers the file URLs for this type, loads every file behind a
    /// single join and parses the results. Files that fail to load are
    /// dropped from the collection; the rest of the site stays usable.
    pub async fn init(
        &mut self,
        config: &Config,
        date_parser: &Regex,
        fetcher: &dyn Fetcher,
        render_body: &(dyn Fn(&str) -> String + Sync),
    ) -> Result<(), PamphletError> {
        let urls = scan::discover(&self.type_name, config, fetcher).await?;

        debug!("discovered {} files for {}", urls.len(), self.type_name);

        self.files = urls
            .into_iter()
            .map(|url| {
                File::new(
                    url,
                    self.type_name.clone(),
                    self.layout.single.clone(),
                    self.html,
                )
            })
            .collect();

        let results = join_all(self.files.iter_mut().map(|file| file.fetch(fetcher))).await;

        let mut loaded = Vec::with_capacity(self.files.len());
        for (file, result) in std::mem::take(&mut self.files).into_iter().zip(results) {
            match result {
                Ok(()) => loaded.push(file),
                Err(e) => error!("error loading {}: {e}", file.url),
            }
        }
        self.files = loaded;

        for file in &mut self.files {
            file.parse_content(config, date_parser, render_body);
        }

        self.active = (0..self.files.len()).collect();

        info!(
            "initialized collection {} with {} files",
            self.type_name,
            self.files.len()
        );

        Ok(())
    }

    /// Replaces the active view with the files matching the query.
    pub fn search(&mut self, query: &str) {
        self.active = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.matches_search(query))
            .map(|(i, _)| i)
            .collect();
    }

    /// Replaces the active view with the files carrying an exact tag match.
    pub fn get_by_tag(&mut self, tag: &str) {
        self.active = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.tags.iter().any(|t| t == tag))
            .map(|(i, _)| i)
            .collect();
    }

    /// Restores the active view to the full backing list.
    pub fn reset_search(&mut self) {
        self.active = (0..self.files.len()).collect();
    }

    pub fn get_by_permalink(
        &self,
        permalink: &str,
        webpath: &str,
    ) -> Result<&File, PamphletError> {
        debug!("retrieving file by permalink {permalink}");

        let prefixed = format!("{webpath}{permalink}");

        self.files
            .iter()
            .find(|file| file.permalink == permalink || file.permalink == prefixed)
            .ok_or_else(|| PamphletError::NotFound(permalink.to_string()))
    }

    /// Every distinct tag with its occurrence count, ordered by first
    /// discovery across the backing list.
    pub fn get_tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = vec![];

        for file in &self.files {
            for tag in &file.tags {
                match tags.iter_mut().find(|t| &t.name == tag) {
                    Some(tag) => tag.count += 1,
                    None => tags.push(Tag {
                        name: tag.clone(),
                        count: 1,
                    }),
                }
            }
        }

        tags
    }

    /// Newest-first presentation for reverse-chronological types, applied
    /// once after the initial load.
    pub fn reverse(&mut self) {
        self.files.reverse();
        self.active = (0..self.files.len()).collect();
    }

    /// Explicit ordering override; sticks for the rest of the session.
    pub fn sort_with(&mut self, compare: impl FnMut(&File, &File) -> std::cmp::Ordering) {
        self.files.sort_by(compare);
        self.active = (0..self.files.len()).collect();
    }

    pub async fn render(&self, templater: &mut Templater) -> Result<Rendered, PamphletError> {
        let title = self
            .layout
            .title
            .clone()
            .unwrap_or_else(|| "Listing".to_string());

        let html = templater.render(&self.layout.list, self.render_data()?).await?;

        Ok(Rendered {
            title: Some(title),
            html,
        })
    }

    /// Template data: the backing list under `files`, the active view under
    /// the type name, plus the tag census.
    fn render_data(&self) -> Result<serde_json::Value, PamphletError> {
        let mut data = serde_json::Map::new();

        data.insert(
            "type".to_string(),
            serde_json::Value::String(self.type_name.clone()),
        );
        data.insert("layout".to_string(), serde_json::to_value(&self.layout)?);
        data.insert("files".to_string(), serde_json::to_value(&self.files)?);
        data.insert("tags".to_string(), serde_json::to_value(self.get_tags())?);
        data.insert(
            self.type_name.clone(),
            serde_json::to_value(self.active_files())?,
        );

        Ok(serde_json::Value::Object(data))
    }
}
