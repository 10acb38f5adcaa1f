//! Protocol backend: replays the remote site's form submission flow over
//! plain HTTP instead of driving a live browser.
//!
//! The choreography is: GET the template page, lift the hidden control
//! fields out of the HTML, multipart-POST them back with the user text,
//! extract the server-generated payload from the response, and POST that
//! payload to the site's image-creation endpoint. Session correlation is
//! carried explicitly as a cookie string threaded between steps; there is no
//! implicit session object and nothing survives the request.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{COOKIE, SET_COOKIE, USER_AGENT};
use reqwest::multipart;
use scraper::{Html, Selector};
use url::Url;

use crate::engine::split_fragments;
use crate::{Error, Generator, GeneratorConfig, Result};

/// Hidden control fields lifted from the template page form.
///
/// `token` anchors the remote contract: when it is missing the page layout
/// changed or an anti-automation challenge was served, and the flow stops
/// before any submission. The other fields are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFormState {
    pub token: String,
    pub build_server: Option<String>,
    pub build_server_id: Option<String>,
    pub submit: String,
}

// Per-request session state, created after the first fetch and discarded
// after submission.
#[derive(Debug, Clone)]
struct SessionContext {
    cookie: Option<String>,
    form: RemoteFormState,
}

/// Scripted-HTTP implementation of the [`Generator`] contract.
pub struct ProtocolGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl ProtocolGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn text_fields(&self, text: &str) -> Vec<String> {
        if self.config.split_protocol_text {
            split_fragments(text)
        } else {
            vec![text.to_string()]
        }
    }
}

#[async_trait]
impl Generator for ProtocolGenerator {
    async fn generate(&self, template_url: &str, text: &str) -> Result<String> {
        // Step 1: fetch the template page and capture the session cookie.
        let response = self
            .client
            .get(template_url)
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await
            .map_err(|e| Error::Unreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::RemoteError(format!(
                "Template page returned {}",
                response.status()
            )));
        }
        let cookie = cookie_header(&response);
        let body = response
            .text()
            .await
            .map_err(|e| Error::Unreachable(e.to_string()))?;

        // Step 2: lift the hidden control fields. No token, no submission.
        let form = parse_form_state(&body)?;
        let session = SessionContext { cookie, form };
        debug!(
            "form state for {}: build_server={:?} submit={:?}",
            template_url, session.form.build_server, session.form.submit
        );

        // Step 3: replay the submission as a multipart POST with the
        // correlated cookie.
        let mut parts = multipart::Form::new();
        for value in self.text_fields(text) {
            parts = parts.text("text[]", value);
        }
        parts = parts
            .text("submit", session.form.submit.clone())
            .text("token", session.form.token.clone());
        if let Some(server) = &session.form.build_server {
            parts = parts.text("build_server", server.clone());
        }
        if let Some(id) = &session.form.build_server_id {
            parts = parts.text("build_server_id", id.clone());
        }

        let mut request = self
            .client
            .post(template_url)
            .header(USER_AGENT, &self.config.user_agent)
            .multipart(parts);
        if let Some(cookie) = &session.cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::RemoteError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::RemoteError(format!(
                "Form submission returned {}",
                response.status()
            )));
        }
        let body = response
            .text()
            .await
            .map_err(|e| Error::RemoteError(e.to_string()))?;

        // Step 4: the response embeds a server-generated payload.
        let payload = extract_payload(&body)?;

        // Step 5: POST the decoded payload to the image-creation endpoint.
        let fields = payload_fields(&payload)?;
        let endpoint = create_image_endpoint(template_url)?;
        let mut request = self
            .client
            .post(endpoint)
            .header(USER_AGENT, &self.config.user_agent)
            .form(&fields);
        if let Some(cookie) = &session.cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::RemoteError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::RemoteError(format!(
                "Image creation returned {}",
                response.status()
            )));
        }
        let created: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::RemoteError(format!("Image creation response is not JSON: {}", e)))?;

        // Step 6: the asset path hides under one of two known field names.
        let asset = created
            .get("fullsize_image")
            .and_then(|v| v.as_str())
            .or_else(|| created.get("image").and_then(|v| v.as_str()))
            .ok_or(Error::ImageNotFound)?;

        resolve_asset_url(session.form.build_server.as_deref(), template_url, asset)
    }
}

// Collapse Set-Cookie headers into a single Cookie value carried by the
// follow-up requests.
fn cookie_header(response: &reqwest::Response) -> Option<String> {
    let pairs: Vec<String> = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(|pair| pair.trim().to_string())
        .filter(|pair| !pair.is_empty())
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

fn named_value(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"[name="{}"]"#, name)).ok()?;
    document
        .select(&selector)
        .find_map(|el| el.value().attr("value").map(str::to_string))
}

/// Parse the hidden control fields out of the template page.
pub fn parse_form_state(html: &str) -> Result<RemoteFormState> {
    let document = Html::parse_document(html);

    let token = named_value(&document, "token").ok_or(Error::TokenNotFound)?;
    let build_server = named_value(&document, "build_server");
    let build_server_id = named_value(&document, "build_server_id");

    // Submit label: value attribute first, visible text second, the site's
    // historical default last.
    let submit = named_value(&document, "submit")
        .or_else(|| {
            let selector = Selector::parse(r#"[name="submit"]"#).unwrap();
            document
                .select(&selector)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .find(|label| !label.is_empty())
        })
        .unwrap_or_else(|| "Go".to_string());

    Ok(RemoteFormState {
        token,
        build_server,
        build_server_id,
        submit,
    })
}

/// Extract the server-generated payload from the submission response.
///
/// The payload shows up either as the content of the `#form_value` element
/// or as the value of a same-named input, depending on which variant of the
/// page was served.
pub fn extract_payload(html: &str) -> Result<String> {
    let document = Html::parse_document(html);

    let by_id = Selector::parse("#form_value").unwrap();
    if let Some(el) = document.select(&by_id).next() {
        if let Some(value) = el.value().attr("value") {
            if !value.trim().is_empty() {
                return Ok(value.trim().to_string());
            }
        }
        let text = el.text().collect::<String>();
        let text = text.trim();
        if !text.is_empty() {
            return Ok(text.to_string());
        }
    }

    if let Some(value) = named_value(&document, "form_value") {
        if !value.trim().is_empty() {
            return Ok(value.trim().to_string());
        }
    }

    Err(Error::PayloadNotFound)
}

// Decode the payload into form fields for the image-creation POST.
fn payload_fields(payload: &str) -> Result<Vec<(String, String)>> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| Error::RemoteError(format!("Malformed generation payload: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::RemoteError("Generation payload is not a JSON object".to_string()))?;

    Ok(object
        .iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect())
}

fn create_image_endpoint(template_url: &str) -> Result<Url> {
    let base = Url::parse(template_url)
        .map_err(|e| Error::RemoteError(format!("Invalid template URL: {}", e)))?;
    base.join("/effect/create-image")
        .map_err(|e| Error::RemoteError(format!("Invalid template URL: {}", e)))
}

/// Resolve the asset path returned by the creation endpoint against the
/// build-server base, falling back to the template origin when the page did
/// not advertise one.
pub fn resolve_asset_url(
    build_server: Option<&str>,
    template_url: &str,
    asset: &str,
) -> Result<String> {
    if asset.starts_with("http://") || asset.starts_with("https://") {
        return Ok(asset.to_string());
    }
    let base = build_server.unwrap_or(template_url);
    let base = Url::parse(base)
        .map_err(|e| Error::RemoteError(format!("Invalid build server URL: {}", e)))?;
    let resolved = base
        .join(asset)
        .map_err(|e| Error::RemoteError(format!("Invalid asset path: {}", e)))?;
    Ok(resolved.to_string())
}
