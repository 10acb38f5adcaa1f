//! Integration tests for the protocol backend against a stubbed remote site.

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tiny_http::{Header, Method, Response, Server};

use textfx::protocol::ProtocolGenerator;
use textfx::{Error, Generator, GeneratorConfig};

#[derive(Clone)]
struct StubOptions {
    include_token: bool,
    include_build_server: bool,
    include_payload: bool,
    creation_body: &'static str,
    template_status: u16,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            include_token: true,
            include_build_server: true,
            include_payload: true,
            creation_body: r#"{"success":true,"image":"/out/123.png"}"#,
            template_status: 200,
        }
    }
}

struct StubRemote {
    base_url: String,
    posts: Arc<AtomicUsize>,
    cookies: Arc<Mutex<Vec<String>>>,
    form_bodies: Arc<Mutex<Vec<String>>>,
}

fn html_header() -> Header {
    "Content-Type: text/html; charset=utf-8".parse::<Header>().unwrap()
}

fn json_header() -> Header {
    "Content-Type: application/json".parse::<Header>().unwrap()
}

/// Start a stub implementing the remote site's three-step contract.
fn start_stub(options: StubOptions) -> StubRemote {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", server.server_addr());

    let posts = Arc::new(AtomicUsize::new(0));
    let cookies = Arc::new(Mutex::new(Vec::new()));
    let form_bodies = Arc::new(Mutex::new(Vec::new()));

    let template_page = {
        let token = if options.include_token {
            r#"<input type="hidden" name="token" value="tok-123" />"#
        } else {
            ""
        };
        let build_server = if options.include_build_server {
            r#"<input type="hidden" name="build_server" value="https://cdn.example" />"#
        } else {
            ""
        };
        format!(
            r#"<!DOCTYPE html>
<html><body><form method="post">
<input type="text" name="text[]" />
{token}
{build_server}
<input type="hidden" name="build_server_id" value="7" />
<button type="submit" name="submit" value="GO">GO</button>
</form></body></html>"#
        )
    };

    let submission_page = if options.include_payload {
        r#"<html><body><div id="form_value">{"effect":"neon","text":"Hello"}</div></body></html>"#
    } else {
        "<html><body>no payload here</body></html>"
    };

    {
        let posts = posts.clone();
        let cookies = cookies.clone();
        let form_bodies = form_bodies.clone();
        std::thread::spawn(move || {
            for mut request in server.incoming_requests() {
                if let Some(cookie) = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Cookie"))
                    .map(|h| h.value.as_str().to_string())
                {
                    cookies.lock().unwrap().push(cookie);
                }

                match (request.method().clone(), request.url().to_string()) {
                    (Method::Get, url) if url == "/template.html" => {
                        let response = Response::from_string(template_page.clone())
                            .with_status_code(options.template_status)
                            .with_header(html_header())
                            .with_header(
                                "Set-Cookie: sid=abc123; Path=/".parse::<Header>().unwrap(),
                            );
                        let _ = request.respond(response);
                    }
                    (Method::Post, url) if url == "/template.html" => {
                        posts.fetch_add(1, Ordering::SeqCst);
                        let mut body = String::new();
                        let _ = request.as_reader().read_to_string(&mut body);
                        form_bodies.lock().unwrap().push(body);
                        let response =
                            Response::from_string(submission_page).with_header(html_header());
                        let _ = request.respond(response);
                    }
                    (Method::Post, url) if url == "/effect/create-image" => {
                        posts.fetch_add(1, Ordering::SeqCst);
                        let response = Response::from_string(options.creation_body)
                            .with_header(json_header());
                        let _ = request.respond(response);
                    }
                    _ => {
                        let _ = request.respond(Response::from_string("Not Found").with_status_code(404));
                    }
                }
            }
        });
    }

    StubRemote {
        base_url,
        posts,
        cookies,
        form_bodies,
    }
}

fn generator() -> ProtocolGenerator {
    ProtocolGenerator::new(GeneratorConfig::default()).unwrap()
}

#[tokio::test]
async fn full_flow_resolves_image_url() {
    let stub = start_stub(StubOptions::default());
    let template_url = format!("{}/template.html", stub.base_url);

    let url = generator().generate(&template_url, "Hello").await.unwrap();
    assert_eq!(url, "https://cdn.example/out/123.png");

    // Both the form POST and the creation POST carried the session cookie.
    let cookies = stub.cookies.lock().unwrap();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c == "sid=abc123"));

    // The combined text was submitted as a single field.
    let bodies = stub.form_bodies.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0].matches(r#"name="text[]""#).count(), 1);
    assert!(bodies[0].contains("Hello"));
    assert!(bodies[0].contains("tok-123"));
}

#[tokio::test]
async fn missing_token_stops_before_submission() {
    let stub = start_stub(StubOptions {
        include_token: false,
        ..Default::default()
    });
    let template_url = format!("{}/template.html", stub.base_url);

    match generator().generate(&template_url, "Hello").await {
        Err(Error::TokenNotFound) => {}
        other => panic!("expected TokenNotFound, got {:?}", other),
    }
    assert_eq!(stub.posts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_payload_is_classified() {
    let stub = start_stub(StubOptions {
        include_payload: false,
        ..Default::default()
    });
    let template_url = format!("{}/template.html", stub.base_url);

    match generator().generate(&template_url, "Hello").await {
        Err(Error::PayloadNotFound) => {}
        other => panic!("expected PayloadNotFound, got {:?}", other),
    }
    // The form POST ran; the creation POST never did.
    assert_eq!(stub.posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn creation_without_asset_field_is_image_not_found() {
    let stub = start_stub(StubOptions {
        creation_body: r#"{"success":true}"#,
        ..Default::default()
    });
    let template_url = format!("{}/template.html", stub.base_url);

    match generator().generate(&template_url, "Hello").await {
        Err(Error::ImageNotFound) => {}
        other => panic!("expected ImageNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn fullsize_image_preferred_over_image() {
    let stub = start_stub(StubOptions {
        creation_body: r#"{"fullsize_image":"/out/full.png","image":"/out/small.png"}"#,
        ..Default::default()
    });
    let template_url = format!("{}/template.html", stub.base_url);

    let url = generator().generate(&template_url, "Hello").await.unwrap();
    assert_eq!(url, "https://cdn.example/out/full.png");
}

#[tokio::test]
async fn build_server_fallback_is_template_origin() {
    let stub = start_stub(StubOptions {
        include_build_server: false,
        ..Default::default()
    });
    let template_url = format!("{}/template.html", stub.base_url);

    let url = generator().generate(&template_url, "Hello").await.unwrap();
    assert_eq!(url, format!("{}/out/123.png", stub.base_url));
}

#[tokio::test]
async fn split_text_submits_one_part_per_fragment() {
    let stub = start_stub(StubOptions::default());
    let template_url = format!("{}/template.html", stub.base_url);

    let split = ProtocolGenerator::new(GeneratorConfig {
        split_protocol_text: true,
        ..Default::default()
    })
    .unwrap();
    split.generate(&template_url, "A|B").await.unwrap();

    let bodies = stub.form_bodies.lock().unwrap();
    assert_eq!(bodies[0].matches(r#"name="text[]""#).count(), 2);
}

#[tokio::test]
async fn error_status_is_remote_error() {
    let stub = start_stub(StubOptions {
        template_status: 503,
        ..Default::default()
    });
    let template_url = format!("{}/template.html", stub.base_url);

    match generator().generate(&template_url, "Hello").await {
        Err(Error::RemoteError(_)) => {}
        other => panic!("expected RemoteError, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_remote_is_classified() {
    // Nothing listens on port 9 on loopback.
    match generator()
        .generate("http://127.0.0.1:9/template.html", "Hello")
        .await
    {
        Err(Error::Unreachable(_)) => {}
        other => panic!("expected Unreachable, got {:?}", other),
    }
}
