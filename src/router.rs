use crate::{collection::FileCollection, config::Config, file::File};

/// View resolved for the current URL. Recomputed in full on every
/// navigation; nothing persists across reloads except the URL itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Initializing,
    Listing,
    Single,
    Error,
}

/// The pieces of the current URL the resolver works from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    /// First path segment under the webpath, trailing `.html` stripped
    pub type_name: Option<String>,
    /// Remaining segments joined back together
    pub filename: String,
    /// `s` query parameter
    pub search: String,
    /// `tag` query parameter
    pub tag: String,
    /// Hash fragment, opaque to the resolver
    pub hash: String,
}

/// Resolver output, kept on the runtime after every navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterState {
    pub mode: ViewMode,
    pub type_name: Option<String>,
    pub filename: Option<String>,
    pub search: String,
    pub tag: String,
    pub hash: String,
}

/// Navigation-completed notification for external observers.
pub struct RouteEvent<'a> {
    pub type_name: Option<&'a str>,
    pub file: Option<&'a File>,
    pub mode: ViewMode,
    pub search: &'a str,
    pub tag: &'a str,
    pub collection: Option<&'a FileCollection>,
}

/// Browser-style history: push preserves the back stack, replace rewrites
/// the current entry in place.
#[derive(Debug, Clone)]
pub struct History {
    stack: Vec<String>,
    index: usize,
}

impl History {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            stack: vec![initial.into()],
            index: 0,
        }
    }

    pub fn current(&self) -> &str {
        &self.stack[self.index]
    }

    pub fn push(&mut self, url: impl Into<String>) {
        self.stack.truncate(self.index + 1);
        self.stack.push(url.into());
        self.index += 1;
    }

    pub fn replace(&mut self, url: impl Into<String>) {
        self.stack[self.index] = url.into();
    }

    pub fn back(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    pub fn forward(&mut self) -> bool {
        if self.index + 1 < self.stack.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }
}

/// Breaks a URL down into the route pieces. The first path segment doubles
/// as the browsable listing URL, so a trailing `.html` marker on it is
/// trimmed before it names a type.
pub fn resolve(url: &str, webpath: &str) -> Route {
    let (path, query, hash) = split_url(url);

    let mut segments: Vec<&str> = path
        .get(webpath.len()..)
        .unwrap_or_default()
        .split('/')
        .collect();

    let first = segments.first().copied().unwrap_or_default();
    let first = first.strip_suffix(".html").unwrap_or(first);
    segments[0] = first;

    Route {
        type_name: (!first.is_empty()).then(|| first.to_string()),
        filename: segments[1..].join("/"),
        search: query_param(query, "s").unwrap_or_default(),
        tag: query_param(query, "tag").unwrap_or_default(),
        hash: hash.to_string(),
    }
}

/// True when the target is a page the runtime can serve itself: a single
/// item under a known type, a known type's listing, or the homepage.
pub fn is_page_link(href: &str, config: &Config) -> bool {
    let Some(path) = strip_origin(href, config) else {
        return false;
    };

    for type_config in &config.types {
        let single = format!("{}{}/", config.webpath, type_config.name);
        if path.starts_with(&single) && path.ends_with(".html") {
            return true;
        }

        let listing = format!("{}{}.html", config.webpath, type_config.name);
        if path.starts_with(&listing) {
            return true;
        }
    }

    path == config.webpath
}

/// The path part of an intercepted link, with the configured origin
/// removed. None when the link points at a foreign origin.
pub fn strip_origin<'a>(href: &'a str, config: &Config) -> Option<&'a str> {
    let path = href.strip_prefix(config.origin.as_str())?;

    if path.starts_with(&config.webpath) {
        Some(path)
    } else {
        None
    }
}

fn split_url(url: &str) -> (&str, &str, &str) {
    let (rest, hash) = match url.split_once('#') {
        Some((rest, hash)) => (rest, hash),
        None => (url, ""),
    };

    let (rest, query) = match rest.split_once('?') {
        Some((rest, query)) => (rest, query),
        None => (rest, ""),
    };

    // Drop a scheme://host prefix when present
    let path = match rest.find("://") {
        Some(scheme) => {
            let after = &rest[scheme + 3..];
            match after.find('/') {
                Some(slash) => &after[slash..],
                None => "",
            }
        }
        None => rest,
    };

    (path, query, hash)
}

fn query_param(query: &str, name: &str) -> Option<String> {
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == name {
            let value = value.replace('+', " ");
            return Some(
                urlencoding::decode(&value)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or(value),
            );
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayoutConfig, TypeConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn listing_url_strips_the_extension_marker() {
        let route = resolve("/posts.html", "/");

        assert_eq!(route.type_name.as_deref(), Some("posts"));
        assert_eq!(route.filename, "");
    }

    #[test]
    fn single_url_keeps_the_filename_extension() {
        let route = resolve("/posts/my-file.html", "/");

        assert_eq!(route.type_name.as_deref(), Some("posts"));
        assert_eq!(route.filename, "my-file.html");
    }

    #[test]
    fn nested_filenames_are_rejoined() {
        let route = resolve("/posts/2024/my-file.html", "/");
        assert_eq!(route.filename, "2024/my-file.html");
    }

    #[test]
    fn empty_path_has_no_type() {
        assert_eq!(resolve("/", "/").type_name, None);
    }

    #[test]
    fn query_parameters_are_decoded() {
        let route = resolve("/posts.html?s=hello+big%20world&tag=rust", "/");

        assert_eq!(route.search, "hello big world");
        assert_eq!(route.tag, "rust");
    }

    #[test]
    fn hash_fragment_is_kept_opaque() {
        let route = resolve("/posts.html#some/state", "/");
        assert_eq!(route.hash, "some/state");
    }

    #[test]
    fn full_urls_resolve_like_paths() {
        let route = resolve("https://example.com/posts/my-file.html?s=x", "/");

        assert_eq!(route.type_name.as_deref(), Some("posts"));
        assert_eq!(route.filename, "my-file.html");
        assert_eq!(route.search, "x");
    }

    #[test]
    fn webpath_prefix_is_stripped_before_segmentation() {
        let route = resolve("/blog/posts.html", "/blog/");
        assert_eq!(route.type_name.as_deref(), Some("posts"));
    }

    #[test]
    fn history_push_truncates_the_forward_stack() {
        let mut history = History::new("/");
        history.push("/a.html");
        history.push("/b.html");

        assert!(history.back());
        assert_eq!(history.current(), "/a.html");

        history.push("/c.html");
        assert!(!history.forward());
        assert_eq!(history.current(), "/c.html");
    }

    #[test]
    fn history_replace_rewrites_in_place() {
        let mut history = History::new("/");
        history.replace("/posts.html");

        assert_eq!(history.current(), "/posts.html");
        assert!(!history.back());
    }

    fn link_config() -> Config {
        let mut config = Config::default();
        config.origin = "https://example.com".to_string();
        config.types = vec![TypeConfig {
            name: "posts".to_string(),
            layout: LayoutConfig {
                single: "post".to_string(),
                list: "post-list".to_string(),
                title: None,
            },
            html: false,
        }];
        config
    }

    #[test]
    fn single_and_listing_links_are_intercepted() {
        let config = link_config();

        assert!(is_page_link(
            "https://example.com/posts/my-file.html",
            &config
        ));
        assert!(is_page_link("https://example.com/posts.html?s=x", &config));
        assert!(is_page_link("https://example.com/", &config));
    }

    #[test]
    fn foreign_links_navigate_natively() {
        let config = link_config();

        assert!(!is_page_link("https://elsewhere.com/posts/a.html", &config));
        assert!(!is_page_link("https://example.com/assets/pic.png", &config));
        assert!(!is_page_link(
            "https://example.com/posts/readme.txt",
            &config
        ));
    }
}
