//! DOM backend: drives a live headless-Chrome session per request (uses the
//! `headless_chrome` crate).
//!
//! A browser session is an expensive, exclusively-owned resource. It is
//! acquired at the start of the choreography and owned by that scope, so the
//! child process is torn down on every exit path, including failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::browser::tab::element::Element;
use headless_chrome::browser::tab::Tab;
use headless_chrome::{Browser, LaunchOptions};
use log::warn;

use crate::engine::{assign_fragments, split_fragments};
use crate::extract::{select_output_image, ImageCandidate};
use crate::{Error, Generator, GeneratorConfig, Result};

// Candidate text inputs, most specific first. The first selector that
// matches anything wins.
const INPUT_SELECTORS: &[&str] = &[r#"[name="text[]"]"#, "input[type=text]", "textarea"];

// Known submission triggers across the catalog's pages.
const SUBMIT_SELECTORS: &[&str] = &["button[type=submit]", ".btn-create", "#submit", ".create-button"];

// Last-resort trigger discovery: click the first button whose visible label
// looks like an action word.
const SEMANTIC_CLICK_JS: &str = r#"(function () {
    var buttons = Array.prototype.slice.call(document.querySelectorAll('button'));
    var match = buttons.filter(function (b) {
        return /create|generate|make/i.test(b.innerText);
    })[0];
    if (match) { match.click(); return true; }
    return false;
})()"#;

// Snapshot of every rendered image, serialized so the candidates can be
// filtered on the Rust side.
const COLLECT_IMAGES_JS: &str = r#"JSON.stringify(
    Array.prototype.slice.call(document.images).map(function (img) {
        return {
            src: img.src || '',
            width: img.width,
            naturalWidth: img.naturalWidth,
            naturalHeight: img.naturalHeight
        };
    })
)"#;

/// Headless-browser implementation of the [`Generator`] contract.
pub struct DomGenerator {
    config: GeneratorConfig,
}

impl DomGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Generator for DomGenerator {
    async fn generate(&self, template_url: &str, text: &str) -> Result<String> {
        let config = self.config.clone();
        let url = template_url.to_string();
        let fragments = split_fragments(text);

        // The CDP client is synchronous; run the whole choreography on a
        // blocking thread so the event loop never stalls on it.
        tokio::task::spawn_blocking(move || run_session(&config, &url, &fragments))
            .await
            .map_err(|e| Error::RemoteError(format!("DOM session aborted: {}", e)))?
    }
}

fn run_session(config: &GeneratorConfig, url: &str, fragments: &[String]) -> Result<String> {
    let launch_options = LaunchOptions::default_builder()
        .headless(true)
        .build()
        .map_err(|e| Error::ConfigError(format!("Failed to build launch options: {}", e)))?;

    // Owned by this scope: dropping `browser` terminates the child process
    // regardless of which branch below returns.
    let browser = Browser::new(launch_options)
        .map_err(|e| Error::ConfigError(format!("Failed to launch browser: {}", e)))?;
    let tab = browser
        .new_tab()
        .map_err(|e| Error::ConfigError(format!("Failed to create tab: {}", e)))?;

    tab.set_user_agent(&config.user_agent, None, None)
        .map_err(|e| Error::ConfigError(format!("Failed to set user agent: {}", e)))?;
    tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

    tab.navigate_to(url)
        .map_err(|e| Error::Unreachable(format!("Navigation failed: {}", e)))?;
    tab.wait_until_navigated()
        .map_err(|e| Error::Unreachable(format!("Wait for navigation failed: {}", e)))?;

    fill_inputs(&tab, fragments)?;
    trigger_submission(&tab)?;

    // Heuristic settle wait for asynchronous rendering; the page offers no
    // completion signal to poll for.
    std::thread::sleep(Duration::from_millis(config.settle_ms));

    extract_image(&tab, config.min_image_width)
}

// Evaluate the ordered selector strategies and return the matches of the
// first one that finds anything.
fn find_first_all<'a>(tab: &'a Arc<Tab>, selectors: &[&str]) -> Vec<Element<'a>> {
    for selector in selectors {
        if let Ok(elements) = tab.find_elements(selector) {
            if !elements.is_empty() {
                return elements;
            }
        }
    }
    Vec::new()
}

fn fill_inputs(tab: &Arc<Tab>, fragments: &[String]) -> Result<()> {
    let inputs = find_first_all(tab, INPUT_SELECTORS);
    if inputs.is_empty() {
        return Err(Error::InputsNotFound);
    }

    for (index, fragment) in assign_fragments(fragments, inputs.len()) {
        let input = &inputs[index];
        input
            .click()
            .map_err(|e| Error::RemoteError(format!("Failed to focus input {}: {}", index, e)))?;
        // Clear any pre-filled value before typing.
        input
            .call_js_fn("function() { this.value = ''; }", vec![], false)
            .map_err(|e| Error::RemoteError(format!("Failed to clear input {}: {}", index, e)))?;
        input
            .type_into(fragment)
            .map_err(|e| Error::RemoteError(format!("Failed to fill input {}: {}", index, e)))?;
    }
    Ok(())
}

fn trigger_submission(tab: &Arc<Tab>) -> Result<()> {
    for selector in SUBMIT_SELECTORS {
        if let Ok(button) = tab.find_element(selector) {
            button
                .click()
                .map_err(|e| Error::RemoteError(format!("Failed to click submit: {}", e)))?;
            return Ok(());
        }
    }

    // A miss here is not terminal: the image scan will come up empty and
    // classify the failure downstream.
    if let Err(e) = tab.evaluate(SEMANTIC_CLICK_JS, false) {
        warn!("semantic button scan failed: {}", e);
    }
    Ok(())
}

fn extract_image(tab: &Arc<Tab>, min_width: u32) -> Result<String> {
    let evaluated = tab
        .evaluate(COLLECT_IMAGES_JS, false)
        .map_err(|e| Error::RemoteError(format!("Image scan failed: {}", e)))?;

    let candidates: Vec<ImageCandidate> = match evaluated.value {
        Some(serde_json::Value::String(raw)) => serde_json::from_str(&raw)
            .map_err(|e| Error::RemoteError(format!("Image scan returned malformed data: {}", e)))?,
        Some(other) => serde_json::from_value(other)
            .map_err(|e| Error::RemoteError(format!("Image scan returned malformed data: {}", e)))?,
        None => Vec::new(),
    };

    select_output_image(&candidates, min_width)
        .map(|image| image.src.clone())
        .ok_or(Error::ImageNotFound)
}
