//! Composed page templates built once at startup
//!
//! The template directory is laid out as:
//!
//! ```text
//! ui/html/
//! ├── base.html          shared skeleton
//! ├── partials/*.html    shared fragments
//! └── pages/*.html       one file per page, each extending base.html
//! ```
//!
//! [`TemplateCache::build`] composes one environment per page file and keys it
//! by the page's file name. The cache is read-only after construction.
//!
//! # Example
//!
//! ```rust,no_run
//! use snippetbox::template::TemplateCache;
//!
//! # fn example() -> anyhow::Result<()> {
//! let cache = TemplateCache::build("./ui/html")?;
//! let html = cache.render("home.html", minijinja::context! { current_year => 2024 })?;
//! # Ok(())
//! # }
//! ```

pub mod helpers;

use minijinja::Environment;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

use helpers::HELPERS;

/// Name of the shared skeleton inside every composed environment
pub const BASE_TEMPLATE: &str = "base.html";

/// Errors raised while building the cache or rendering a page
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A template file or directory could not be read
    #[error("failed to read template '{path}': {source}")]
    Read {
        /// Path that failed
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No partial templates were found
    #[error("no partial templates found in {0}")]
    NoPartials(String),

    /// The helper table contains an unusable name
    #[error("invalid template helper name: '{0}'")]
    InvalidHelper(String),

    /// The requested page was never built into the cache
    #[error("the template {0} does not exist")]
    NotFound(String),

    /// Template compilation or rendering failed
    #[error("template error: {0}")]
    Render(#[from] minijinja::Error),
}

/// Immutable mapping from page file name to its composed environment
pub struct TemplateCache {
    pages: HashMap<String, Environment<'static>>,
}

impl fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.pages.keys().collect();
        names.sort();
        f.debug_struct("TemplateCache").field("pages", &names).finish()
    }
}

impl TemplateCache {
    /// Compose every page under `root/pages` with the base skeleton and partials.
    ///
    /// Helpers are registered into each environment before any source is added.
    pub fn build(root: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let root = root.as_ref();
        helpers::validate(HELPERS)?;

        let base_path = root.join(BASE_TEMPLATE);
        let base = fs::read_to_string(&base_path).map_err(|source| TemplateError::Read {
            path: base_path.display().to_string(),
            source,
        })?;

        let partials_dir = root.join("partials");
        let partials = read_html_files(&partials_dir)?;
        if partials.is_empty() {
            return Err(TemplateError::NoPartials(partials_dir.display().to_string()));
        }

        let mut pages = HashMap::new();
        for (file_name, source) in read_html_files(&root.join("pages"))? {
            let mut env = Environment::new();
            for &(name, helper) in HELPERS {
                env.add_filter(name, helper);
            }
            env.add_template_owned(BASE_TEMPLATE, base.clone())?;
            for (partial, partial_source) in &partials {
                env.add_template_owned(format!("partials/{partial}"), partial_source.clone())?;
            }
            env.add_template_owned(page_template_name(&file_name), source)?;

            tracing::debug!(page = %file_name, "composed page template");
            pages.insert(file_name, env);
        }

        Ok(Self { pages })
    }

    /// Render `page` with `data` into a complete buffer.
    ///
    /// Nothing is returned unless the whole page rendered, so callers never
    /// send a truncated body.
    pub fn render<S: Serialize>(&self, page: &str, data: S) -> Result<String, TemplateError> {
        let env = self
            .pages
            .get(page)
            .ok_or_else(|| TemplateError::NotFound(page.to_string()))?;
        let template = env.get_template(&page_template_name(page))?;
        Ok(template.render(data)?)
    }

    /// True if `page` was composed at build time.
    #[must_use]
    pub fn contains(&self, page: &str) -> bool {
        self.pages.contains_key(page)
    }

    /// Number of composed pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True if no pages were found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

fn page_template_name(file_name: &str) -> String {
    format!("pages/{file_name}")
}

/// Read every `*.html` file directly inside `dir`, sorted by file name.
fn read_html_files(dir: &Path) -> Result<Vec<(String, String)>, TemplateError> {
    let read_err = |source| TemplateError::Read {
        path: dir.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let source = fs::read_to_string(&path).map_err(|source| TemplateError::Read {
            path: path.display().to_string(),
            source,
        })?;
        files.push((file_name.to_string(), source));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
