use crate::{config::Config, error::PamphletError, fetch::Fetcher};
use minijinja::{context, value::Value, Environment, Syntax};
use serde::Serialize;
use std::{collections::HashSet, sync::Arc};
use tracing::debug;

/// Result of rendering a layout. `title` is the document title the view
/// asked for, when it set one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub title: Option<String>,
    pub html: String,
}

/// Renders named layouts against a data object. Layout sources are fetched
/// from `{webpath}{layout_directory}/{name}.html` on first use and kept for
/// the lifetime of the runtime; templates see the data object as `data`.
pub struct Templater {
    env: Environment<'static>,
    loaded: HashSet<String>,
    base: String,
    fetcher: Arc<dyn Fetcher>,
}

impl Templater {
    pub fn new(config: &Config, fetcher: Arc<dyn Fetcher>) -> Result<Self, PamphletError> {
        let mut env = Environment::new();

        // Published layouts use ERB style markers: `<%= %>` interpolates,
        // `<% %>` is a statement.
        env.set_syntax(Syntax {
            block_start: "<%".into(),
            block_end: "%>".into(),
            variable_start: "<%=".into(),
            variable_end: "%>".into(),
            comment_start: "<%#".into(),
            comment_end: "%>".into(),
        })?;

        Ok(Self {
            env,
            loaded: HashSet::new(),
            base: format!("{}{}", config.webpath, config.layout_directory),
            fetcher,
        })
    }

    pub async fn render(
        &mut self,
        layout: &str,
        data: impl Serialize,
    ) -> Result<String, PamphletError> {
        if !self.loaded.contains(layout) {
            let url = format!("{}/{layout}.html", self.base);
            debug!("loading layout {url}");

            let response = self
                .fetcher
                .get(&url)
                .await
                .map_err(|_| PamphletError::LayoutLoad(layout.to_string()))?;

            self.env.add_template_owned(layout.to_string(), response.body)?;
            self.loaded.insert(layout.to_string());
        }

        let template = self.env.get_template(layout)?;

        Ok(template.render(context! { data => Value::from_serializable(&data) })?)
    }
}
