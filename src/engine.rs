//! Orchestration over the configured backend: validate input, resolve the
//! template, dispatch the choreography, shape the result.

use log::debug;

use crate::catalog::TemplateCatalog;
use crate::{Error, Generator, GeneratorConfig, Result};

/// Successful outcome of one generation request. Never partially populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub template_id: String,
    pub image_url: String,
}

/// The form extraction & submission engine.
///
/// Stateless between invocations: no cache and no shared mutable store.
/// Concurrent requests share only the immutable catalog and the backend's
/// configuration.
pub struct Engine {
    catalog: TemplateCatalog,
    backend: Box<dyn Generator>,
}

impl Engine {
    pub fn new(catalog: TemplateCatalog, config: GeneratorConfig) -> Result<Self> {
        let backend = crate::new_generator(&config)?;
        Ok(Self { catalog, backend })
    }

    /// Catalog in use, exposed for boundary-level precondition checks.
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Drive the full choreography for one request.
    pub async fn generate(&self, template_id: &str, text: &str) -> Result<GenerationResult> {
        if text.trim().is_empty() {
            return Err(Error::MissingInput);
        }
        let template_url = self.catalog.resolve(template_id)?;

        debug!("generating template {} via {}", template_id, template_url);
        let image_url = self.backend.generate(template_url, text).await?;

        Ok(GenerationResult {
            template_id: template_id.to_string(),
            image_url,
        })
    }
}

/// Split raw user text into ordered fragments, one per remote input field.
pub fn split_fragments(text: &str) -> Vec<String> {
    text.split('|').map(str::to_string).collect()
}

/// Positional assignment of fragments to discovered input fields.
///
/// Fragment i goes to field i. Extra fragments are silently dropped; when
/// there are fewer fragments than fields the remaining fields are left
/// untouched.
pub fn assign_fragments<'a>(fragments: &'a [String], field_count: usize) -> Vec<(usize, &'a str)> {
    fragments
        .iter()
        .take(field_count)
        .enumerate()
        .map(|(index, fragment)| (index, fragment.as_str()))
        .collect()
}
