use crate::error::PamphletError;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Site configuration, usually read from a JSON file published next to the
/// content it describes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Path prefix the site is served under. Must end in a slash.
    #[serde(default = "default_webpath")]
    pub webpath: String,

    /// Directory under the webpath containing the layout templates.
    #[serde(default = "default_layout_directory")]
    pub layout_directory: String,

    /// Content type to show when the URL carries no path.
    #[serde(default)]
    pub default_view: String,

    /// Layout rendered when a route cannot be resolved.
    #[serde(default = "default_error_layout")]
    pub error_layout: String,

    /// Where content directories are discovered from.
    #[serde(default)]
    pub mode: SourceMode,

    /// Repository settings, required in hosted mode.
    pub github: Option<GithubConfig>,

    /// The content types served by this site.
    #[serde(default)]
    pub types: Vec<TypeConfig>,

    /// A line consisting solely of this text delimits the front matter block.
    #[serde(default = "default_front_matter_separator")]
    pub front_matter_separator: String,

    /// Front matter keys parsed as comma separated lists instead of scalars.
    #[serde(default = "default_list_attributes")]
    pub list_attributes: Vec<String>,

    /// Pattern matched against a file URL to extract a date when the front
    /// matter carries none.
    #[serde(default = "default_date_parser")]
    pub date_parser: String,

    /// chrono format string applied to resolved dates for display.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Extension of the published content files.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Origin prefix stripped from intercepted link targets, e.g.
    /// `https://example.com`. Empty when links are path-absolute.
    #[serde(default)]
    pub origin: String,
}

impl Config {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, PamphletError> {
        let config = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&config)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            webpath: default_webpath(),
            layout_directory: default_layout_directory(),
            default_view: String::new(),
            error_layout: default_error_layout(),
            mode: SourceMode::default(),
            github: None,
            types: vec![],
            front_matter_separator: default_front_matter_separator(),
            list_attributes: default_list_attributes(),
            date_parser: default_date_parser(),
            date_format: default_date_format(),
            extension: default_extension(),
            origin: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceMode {
    /// Directories are plain hypertext listings served next to the files.
    #[default]
    Server,
    /// Directories are enumerated through a repository hosting API.
    Github,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeConfig {
    pub name: String,
    pub layout: LayoutConfig,

    /// Files of this type are already hypertext and skip markdown rendering.
    #[serde(default)]
    pub html: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Layout for a single file view.
    pub single: String,
    /// Layout for the listing view.
    pub list: String,
    /// Document title used for listings of this type.
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_host")]
    pub host: String,
    pub username: String,
    pub repo: String,
    #[serde(default = "default_github_branch")]
    pub branch: String,
    /// Optional path inside the repository the content lives under.
    pub prefix: Option<String>,
}

/// Contents endpoint for one type root, e.g.
/// `https://api.github.com/repos/user/repo/contents/posts?ref=main`.
pub fn github_url(type_name: &str, github: &GithubConfig) -> String {
    let mut parts = vec![
        github.host.clone(),
        "repos".to_string(),
        github.username.clone(),
        github.repo.clone(),
        "contents".to_string(),
        format!("{type_name}?ref={}", github.branch),
    ];

    if let Some(prefix) = &github.prefix {
        parts.insert(5, prefix.clone());
    }

    parts.join("/")
}

fn default_webpath() -> String {
    "/".to_string()
}

fn default_layout_directory() -> String {
    "layouts".to_string()
}

fn default_error_layout() -> String {
    "error".to_string()
}

fn default_front_matter_separator() -> String {
    "---".to_string()
}

fn default_list_attributes() -> Vec<String> {
    vec!["tags".to_string()]
}

fn default_date_parser() -> String {
    r"\d{4}-\d{2}(?:-\d{2})?".to_string()
}

fn default_date_format() -> String {
    "%-m/%-d/%Y".to_string()
}

fn default_extension() -> String {
    ".md".to_string()
}

fn default_github_host() -> String {
    "https://api.github.com".to_string()
}

fn default_github_branch() -> String {
    "master".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str(
            r#"{
                "defaultView": "posts",
                "types": [{
                    "name": "posts",
                    "layout": { "single": "post", "list": "post-list", "title": "Posts" }
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.default_view, "posts");

        assert_eq!(config.webpath, "/");
        assert_eq!(config.extension, ".md");
        assert_eq!(config.front_matter_separator, "---");
        assert_eq!(config.list_attributes, vec!["tags".to_string()]);
        assert_eq!(config.mode, SourceMode::Server);
        assert_eq!(config.types.len(), 1);
    }

    #[test]
    fn github_url_with_prefix() {
        let github = GithubConfig {
            host: "https://api.github.com".to_string(),
            username: "user".to_string(),
            repo: "site".to_string(),
            branch: "main".to_string(),
            prefix: Some("content".to_string()),
        };

        assert_eq!(
            github_url("posts", &github),
            "https://api.github.com/repos/user/site/contents/content/posts?ref=main"
        );
    }

    #[test]
    fn github_url_without_prefix() {
        let github = GithubConfig {
            host: "https://api.github.com".to_string(),
            username: "user".to_string(),
            repo: "site".to_string(),
            branch: "master".to_string(),
            prefix: None,
        };

        assert_eq!(
            github_url("posts", &github),
            "https://api.github.com/repos/user/site/contents/posts?ref=master"
        );
    }
}
