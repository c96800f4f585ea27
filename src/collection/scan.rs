use crate::{
    config::{github_url, Config, SourceMode},
    error::PamphletError,
    fetch::Fetcher,
};
use async_recursion::async_recursion;
use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error};

lazy_static! {
    static ref ANCHOR_HREF: Regex =
        Regex::new(r#"<a\s[^>]*href\s*=\s*["']([^"']+)["']"#).unwrap();
}

/// One entry of a repository contents response. Directories carry no
/// download URL and are skipped: the API already enumerates the full set.
#[derive(Debug, Deserialize)]
struct RepoEntry {
    #[serde(default)]
    #[allow(dead_code)]
    path: String,
    download_url: Option<String>,
}

/// Enumerates the content file URLs under one type root.
pub async fn discover(
    type_name: &str,
    config: &Config,
    fetcher: &dyn Fetcher,
) -> Result<Vec<String>, PamphletError> {
    let root = file_list_url(type_name, config);
    debug!("scanning {root}");

    match config.mode {
        SourceMode::Github => {
            let response = fetcher.get(&root).await?;
            let entries: Vec<RepoEntry> = serde_json::from_str(&response.body)?;

            Ok(entries
                .into_iter()
                .filter_map(|entry| entry.download_url)
                .filter(|url| is_valid_file(url, &config.extension))
                .collect())
        }
        SourceMode::Server => scan_listing(fetcher, config, &root, true).await,
    }
}

pub fn file_list_url(type_name: &str, config: &Config) -> String {
    match (config.mode, &config.github) {
        (SourceMode::Github, Some(github)) => github_url(type_name, github),
        _ => format!("{}{type_name}", config.webpath),
    }
}

/// Scans one directory listing. Subdirectories found in the root scan are
/// scanned exactly one level deeper, concurrently, with recursion disabled;
/// the whole scan joins on that fixed set before returning.
#[async_recursion]
async fn scan_listing(
    fetcher: &dyn Fetcher,
    config: &Config,
    directory: &str,
    recurse: bool,
) -> Result<Vec<String>, PamphletError> {
    debug!("scanning directory {directory}");

    let listing = fetcher.get(directory).await?;

    let mut files = vec![];
    let mut subdirectories = vec![];

    for caps in ANCHOR_HREF.captures_iter(&listing.body) {
        let url = resolve_href(&caps[1], directory);

        if is_valid_file(&url, &config.extension) {
            files.push(url);
        } else if recurse && url.ends_with('/') && url != config.webpath {
            // Absolutely resolved listings point back at the site root and
            // are excluded by the webpath check above.
            subdirectories.push(url);
        }
    }

    let nested = join_all(
        subdirectories
            .iter()
            .map(|subdirectory| scan_listing(fetcher, config, subdirectory, false)),
    )
    .await;

    for result in nested {
        match result {
            Ok(found) => files.extend(found),
            Err(e) => error!("error scanning subdirectory: {e}"),
        }
    }

    Ok(files)
}

/// Absolute-rooted hrefs pass through; relative ones are joined to the
/// parent directory.
fn resolve_href(href: &str, parent: &str) -> String {
    if href.starts_with('/') {
        return href.to_string();
    }

    if parent.ends_with('/') {
        format!("{parent}{href}")
    } else {
        format!("{parent}/{href}")
    }
}

/// A candidate file must carry the content extension, or be hypertext.
fn is_valid_file(url: &str, extension: &str) -> bool {
    let ext = url.rsplit('.').next().unwrap_or_default();
    ext == extension.trim_start_matches('.') || ext == "html"
}
