//! textfx
//!
//! A small HTTP service that produces stylized text-effect images by driving
//! remote generator pages. Given a template id and user text it performs the
//! site's multi-step submission flow and returns the URL of the rendered
//! image.
//!
//! The remote pages are not a versioned API: selectors, hidden field names,
//! and response shapes can change without notice. Every extraction step
//! therefore works through an ordered list of fallback strategies, and every
//! step fails with a distinct [`Error`] variant instead of a generic fault.
//!
//! Two interchangeable backends implement the same capability, selected by
//! [`GeneratorConfig::mode`]:
//!
//! - **Protocol backend** (default): replays the site's form submission over
//!   plain HTTP, threading cookies and hidden form tokens explicitly between
//!   steps. Cheap per request, but the first to break when the remote markup
//!   drifts.
//! - **DOM backend** (`cdp` feature): drives a live headless-Chrome session
//!   per request, discovering inputs and the submit control with selector
//!   fallbacks and picking the generated artifact out of the rendered
//!   images. Heavier, but tolerates markup drift better.
//!
//! # Example
//!
//! ```no_run
//! use textfx::{Engine, GeneratorConfig, TemplateCatalog};
//!
//! # async fn run() -> textfx::Result<()> {
//! let engine = Engine::new(TemplateCatalog::builtin(), GeneratorConfig::default())?;
//! let result = engine.generate("1", "Hello|World").await?;
//! println!("{}", result.image_url);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

pub mod catalog;
pub mod engine;
pub mod error;
pub mod extract;
pub mod protocol;
pub mod server;

// CDP backend (feature-gated; requires a Chrome binary at runtime)
#[cfg(feature = "cdp")]
pub mod cdp;

pub use catalog::TemplateCatalog;
pub use engine::{Engine, GenerationResult};
pub use error::{Error, Result};

/// Automation strategy used to drive the remote page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Scripted HTTP replay of the site's submission protocol
    Protocol,
    /// Live headless-browser session per request
    Dom,
}

/// Configuration for the generation engine
///
/// Defaults match the behavior of the remote site's own pages: a generic
/// user agent, a 30 second network timeout, and a 3 second settle delay
/// after submission in DOM mode.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Which backend drives the remote page
    pub mode: Mode,
    /// User agent sent with every request and page load
    pub user_agent: String,
    /// Timeout for page loads and HTTP calls in milliseconds
    pub timeout_ms: u64,
    /// Fixed delay after triggering submission before scanning for output
    /// (DOM mode). The page offers no completion signal, so this is a
    /// heuristic wait.
    pub settle_ms: u64,
    /// Rendered images at or below this layout width are treated as
    /// decorative and never selected as output
    pub min_image_width: u32,
    /// Submit each `|`-separated fragment as its own form field in protocol
    /// mode instead of one combined value
    pub split_protocol_text: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Protocol,
            user_agent: "Mozilla/5.0".to_string(),
            timeout_ms: 30000,
            settle_ms: 3000,
            min_image_width: 200,
            split_protocol_text: false,
        }
    }
}

/// Capability contract shared by both backends.
///
/// Given a template page URL and the raw user text, drive the remote
/// submission flow and yield the resolved output image URL or a classified
/// failure. Implementations hold no per-request state; any number of calls
/// may run concurrently.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, template_url: &str, text: &str) -> Result<String>;
}

/// Create the backend selected by `config.mode`.
///
/// DOM mode is only available when the crate was built with the `cdp`
/// feature; requesting it otherwise is a configuration error.
pub fn new_generator(config: &GeneratorConfig) -> Result<Box<dyn Generator>> {
    match config.mode {
        Mode::Protocol => Ok(Box::new(protocol::ProtocolGenerator::new(config.clone())?)),

        #[cfg(feature = "cdp")]
        Mode::Dom => Ok(Box::new(cdp::DomGenerator::new(config.clone()))),

        #[cfg(not(feature = "cdp"))]
        Mode::Dom => Err(Error::ConfigError(
            "DOM mode requires the `cdp` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.mode, Mode::Protocol);
        assert_eq!(config.timeout_ms, 30000);
        assert_eq!(config.settle_ms, 3000);
        assert_eq!(config.min_image_width, 200);
        assert!(!config.split_protocol_text);
    }

    #[test]
    fn test_protocol_backend_constructs() {
        let config = GeneratorConfig::default();
        assert!(new_generator(&config).is_ok());
    }

    #[cfg(not(feature = "cdp"))]
    #[test]
    fn test_dom_mode_without_cdp_is_config_error() {
        let config = GeneratorConfig {
            mode: Mode::Dom,
            ..Default::default()
        };
        match new_generator(&config) {
            Err(Error::ConfigError(_)) => {}
            other => panic!("expected ConfigError, got {:?}", other.map(|_| ())),
        }
    }
}
