use crate::{
    collection::FileCollection,
    config::{Config, SourceMode},
    error::PamphletError,
    fetch::Fetcher,
    file::File,
    layout::{Rendered, Templater},
    markdown::Markdown,
    router::{self, History, RouteEvent, RouterState, ViewMode},
};
use futures::future::join_all;
use regex::Regex;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error, info, warn};

type MarkdownFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
type RouteObserver = Box<dyn Fn(&RouteEvent<'_>) + Send + Sync>;
type Plugin = Box<dyn Fn(&Cms) + Send + Sync>;

/// The site runtime: owns the collections, the template adapter, the
/// navigation history and the resolved router state.
pub struct Cms {
    config: Config,
    date_parser: Regex,
    collections: HashMap<String, FileCollection>,
    templater: Templater,
    fetcher: Arc<dyn Fetcher>,
    history: History,
    ready: bool,
    state: RouterState,
    rendered: Option<Rendered>,
    document_title: Option<String>,
    markdown_override: Option<MarkdownFn>,
    on_route: Option<RouteObserver>,
    plugins: HashMap<String, Plugin>,
}

impl std::fmt::Debug for Cms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cms")
            .field("config", &self.config)
            .field("collections", &self.collections)
            .field("ready", &self.ready)
            .field("state", &self.state)
            .field("rendered", &self.rendered)
            .field("document_title", &self.document_title)
            .finish_non_exhaustive()
    }
}

impl Cms {
    /// Validates the configuration and sets up the runtime. Nothing is
    /// fetched yet; `init` does the loading.
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>) -> Result<Self, PamphletError> {
        validate(&config)?;

        let date_parser = Regex::new(&config.date_parser).map_err(|e| {
            PamphletError::Configuration(format!("invalid date pattern: {e}"))
        })?;

        let templater = Templater::new(&config, fetcher.clone())?;

        let collections = config
            .types
            .iter()
            .map(|type_config| {
                (
                    type_config.name.clone(),
                    FileCollection::new(type_config),
                )
            })
            .collect();

        let history = History::new(config.webpath.clone());

        Ok(Self {
            config,
            date_parser,
            collections,
            templater,
            fetcher,
            history,
            ready: false,
            state: RouterState::default(),
            rendered: None,
            document_title: None,
            markdown_override: None,
            on_route: None,
            plugins: HashMap::new(),
        })
    }

    /// Substitute markdown engine, used verbatim in place of the built-in
    /// one. Must be set before `init`.
    pub fn set_markdown_engine(&mut self, engine: impl Fn(&str) -> String + Send + Sync + 'static) {
        self.markdown_override = Some(Arc::new(engine));
    }

    /// Registers the navigation-completed observer.
    pub fn on_route(&mut self, observer: impl Fn(&RouteEvent<'_>) + Send + Sync + 'static) {
        self.on_route = Some(Box::new(observer));
    }

    /// Records a named extension in the registration table.
    pub fn register_plugin(
        &mut self,
        name: impl Into<String>,
        plugin: impl Fn(&Cms) + Send + Sync + 'static,
    ) {
        self.plugins.insert(name.into(), Box::new(plugin));
    }

    /// Runs a registered extension. False when the name is unknown.
    pub fn run_plugin(&self, name: &str) -> bool {
        match self.plugins.get(name) {
            Some(plugin) => {
                plugin(self);
                true
            }
            None => false,
        }
    }

    /// Initializes every collection behind one join, applies the
    /// newest-first convention to post-like types and resolves the current
    /// URL. Collections that fail to initialize stay empty; the rest of the
    /// site remains usable.
    pub async fn init(&mut self) -> Result<(), PamphletError> {
        let markdown = Markdown::new();
        let custom = self.markdown_override.clone();
        let render_body = move |text: &str| match &custom {
            Some(engine) => engine(text),
            None => markdown.render(text),
        };

        let config = &self.config;
        let date_parser = &self.date_parser;
        let fetcher = self.fetcher.clone();

        let results = join_all(self.collections.values_mut().map(|collection| {
            let name = collection.type_name().to_string();
            let fetcher = fetcher.clone();
            let render_body = &render_body;
            async move {
                (
                    name,
                    collection
                        .init(config, date_parser, fetcher.as_ref(), render_body)
                        .await,
                )
            }
        }))
        .await;

        for (name, result) in results {
            if let Err(e) = result {
                error!("error initializing collection {name}: {e}");
            }
        }

        // Reverse order to display newest posts first for post types
        for (name, collection) in self.collections.iter_mut() {
            if name.starts_with("post") {
                collection.reverse();
            }
        }

        self.ready = true;
        info!("initialized {} collections", self.collections.len());

        self.route().await
    }

    /// Resolves the current URL into a view and renders it. Every
    /// navigation trigger funnels through here; resolving an unchanged URL
    /// is idempotent.
    pub async fn route(&mut self) -> Result<(), PamphletError> {
        loop {
            let current = self.history.current().to_string();
            let route = router::resolve(&current, &self.config.webpath);

            debug!("resolving {current}");

            let Some(type_name) = route.type_name.clone() else {
                // Corrective redirect, so no history entry is added.
                let target = format!(
                    "{}{}.html",
                    self.config.webpath, self.config.default_view
                );
                debug!("empty route, replacing with default view {target}");
                self.history.replace(target);
                continue;
            };

            let mut file: Option<File> = None;

            let outcome = if !route.filename.is_empty() {
                let permalink = format!("{type_name}/{}", route.filename.trim());

                let found = self
                    .collections
                    .get(&type_name)
                    .ok_or_else(|| PamphletError::NotFound(type_name.clone()))
                    .and_then(|collection| {
                        collection.get_by_permalink(&permalink, &self.config.webpath)
                    })
                    .map(|found| found.clone());

                match found {
                    Ok(single) => {
                        let rendered = single.render(&mut self.templater).await?;
                        file = Some(single);
                        Ok((ViewMode::Single, rendered))
                    }
                    Err(e) => Err(e),
                }
            } else {
                match self.collections.get_mut(&type_name) {
                    Some(collection) => {
                        // Search takes priority over the tag filter.
                        if !route.search.is_empty() {
                            collection.search(&route.search);
                        } else if !route.tag.is_empty() {
                            collection.get_by_tag(&route.tag);
                        } else {
                            collection.reset_search();
                        }

                        let rendered = collection.render(&mut self.templater).await?;
                        Ok((ViewMode::Listing, rendered))
                    }
                    None => Err(PamphletError::NotFound(type_name.clone())),
                }
            };

            let (mode, rendered) = match outcome {
                Ok(view) => view,
                Err(e) => {
                    debug!("route resolution failed: {e}");
                    let rendered =
                        render_error(&mut self.templater, &self.config).await?;
                    (ViewMode::Error, rendered)
                }
            };

            if let Some(title) = &rendered.title {
                self.document_title = Some(title.clone());
            }

            self.state = RouterState {
                mode,
                type_name: Some(type_name.clone()),
                filename: (!route.filename.is_empty()).then(|| route.filename.clone()),
                search: route.search.clone(),
                tag: route.tag.clone(),
                hash: route.hash.clone(),
            };
            self.rendered = Some(rendered);

            if let Some(observer) = &self.on_route {
                observer(&RouteEvent {
                    type_name: Some(&type_name),
                    file: file.as_ref(),
                    mode,
                    search: &route.search,
                    tag: &route.tag,
                    collection: self.collections.get(&type_name),
                });
            }

            return Ok(());
        }
    }

    /// Push navigation: adds a history entry and resolves.
    pub async fn navigate(&mut self, url: impl Into<String>) -> Result<(), PamphletError> {
        self.history.push(url);
        self.route().await
    }

    /// Replace navigation, for corrective redirects only.
    pub async fn replace(&mut self, url: impl Into<String>) -> Result<(), PamphletError> {
        self.history.replace(url);
        self.route().await
    }

    pub async fn back(&mut self) -> Result<(), PamphletError> {
        if self.history.back() {
            self.route().await
        } else {
            Ok(())
        }
    }

    pub async fn forward(&mut self) -> Result<(), PamphletError> {
        if self.history.forward() {
            self.route().await
        } else {
            Ok(())
        }
    }

    /// Converts a click on a page-internal link into push navigation.
    /// False means the link is not ours and should navigate natively.
    pub async fn handle_link_click(&mut self, href: &str) -> Result<bool, PamphletError> {
        if !router::is_page_link(href, &self.config) {
            return Ok(false);
        }

        let target = router::strip_origin(href, &self.config)
            .unwrap_or(href)
            .to_string();

        self.navigate(target).await?;
        Ok(true)
    }

    /// Reorders a collection in place and re-renders it. The new order
    /// sticks for the rest of the session.
    pub async fn sort(
        &mut self,
        type_name: &str,
        compare: impl FnMut(&File, &File) -> std::cmp::Ordering,
    ) -> Result<(), PamphletError> {
        if !self.ready {
            warn!("not ready to perform action");
            return Ok(());
        }

        let Some(collection) = self.collections.get_mut(type_name) else {
            return Err(PamphletError::NotFound(type_name.to_string()));
        };

        collection.sort_with(compare);

        let rendered = collection.render(&mut self.templater).await?;
        if let Some(title) = &rendered.title {
            self.document_title = Some(title.clone());
        }
        self.rendered = Some(rendered);

        Ok(())
    }

    /// Navigates to the search URL for a type instead of filtering in
    /// place, so the query lands in the history.
    pub async fn search(&mut self, type_name: &str, query: &str) -> Result<(), PamphletError> {
        if !self.ready {
            warn!("not ready to perform action");
            return Ok(());
        }

        let url = format!(
            "{}{type_name}.html?s={}",
            self.config.webpath,
            urlencoding::encode(query)
        );

        self.navigate(url).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &RouterState {
        &self.state
    }

    pub fn rendered(&self) -> Option<&Rendered> {
        self.rendered.as_ref()
    }

    pub fn document_title(&self) -> Option<&str> {
        self.document_title.as_deref()
    }

    pub fn current_url(&self) -> &str {
        self.history.current()
    }

    pub fn collection(&self, type_name: &str) -> Option<&FileCollection> {
        self.collections.get(type_name)
    }
}

fn validate(config: &Config) -> Result<(), PamphletError> {
    if config.types.is_empty() {
        return Err(PamphletError::Configuration(
            "at least one content type is required".to_string(),
        ));
    }

    if config.default_view.trim().is_empty() {
        return Err(PamphletError::Configuration(
            "defaultView must name a content type".to_string(),
        ));
    }

    if config.mode == SourceMode::Github && config.github.is_none() {
        return Err(PamphletError::Configuration(
            "hosted mode requires repository settings".to_string(),
        ));
    }

    Ok(())
}

async fn render_error(
    templater: &mut Templater,
    config: &Config,
) -> Result<Rendered, PamphletError> {
    let html = templater
        .render(&config.error_layout, serde_json::json!({}))
        .await?;

    Ok(Rendered { title: None, html })
}
