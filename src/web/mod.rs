//! Embedded web page for convopt.
//!
//! Provides a lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A single-page UI with API settings, samples, analysis and optimization tabs
//! - JSON API endpoints backing that page
//!
//! Launched via `convopt serve` (default: `http://127.0.0.1:9747`).
//!
//! Requests are handled one at a time on the calling thread. While an LLM
//! request is in flight the next HTTP request waits; the page disables its
//! buttons so the user does not queue duplicates.

pub mod api;
mod frontend;

use std::io::Cursor;

use anyhow::{Context, Result};
use colored::Colorize;
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::llm::Transport;
use crate::storage::KeyValueStore;

pub use api::{ApiReply, AppState};

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the web server on the given address.
///
/// Blocks the current thread. Handler errors become 500 responses; the
/// server keeps running.
pub fn serve<S: KeyValueStore, T: Transport>(
    addr: &str,
    state: &mut AppState<S, T>,
    open: bool,
) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("{} running at http://{addr}", "convopt".bold().cyan());
    println!("Press Ctrl+C to stop.\n");

    if open {
        let _ = open_browser(&format!("http://{addr}"));
    }

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        // Read body up-front for methods that carry one
        let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
            let mut buf = String::new();
            let _ = request.as_reader().read_to_string(&mut buf);
            Some(buf)
        } else {
            None
        };

        let response = match dispatch(state, &method, &url, body.as_deref()) {
            Ok(Route::Page) => serve_frontend(),
            Ok(Route::Json(reply)) => json_response(&reply),
            Err(e) => json_response(&ApiReply::error(500, "internal", format!("{e:#}"))),
        };
        let status = response.status_code().0;
        let _ = request.respond(response);

        // Brief access log
        println!(
            "{} {} {} {}",
            chrono::Local::now().format("%H:%M:%S"),
            method,
            url,
            status
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// What a request resolved to.
#[derive(Debug)]
pub enum Route {
    /// The embedded HTML page.
    Page,
    /// A JSON API reply.
    Json(ApiReply),
}

/// Dispatch an incoming request to the appropriate handler.
pub fn dispatch<S: KeyValueStore, T: Transport>(
    state: &mut AppState<S, T>,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<Route> {
    // Strip query string for path matching
    let path = url.split('?').next().unwrap_or(url);
    let body = body.unwrap_or("{}");

    let reply = match (method, path) {
        // Frontend
        (&Method::Get, "/") | (&Method::Get, "/index.html") => return Ok(Route::Page),

        // API: Samples
        (&Method::Get, "/api/samples") => api::list_samples(state)?,
        (&Method::Post, "/api/samples") => api::add_sample(state, body)?,
        (&Method::Delete, p) if p.starts_with("/api/samples/") => {
            let id = &p["/api/samples/".len()..];
            api::remove_sample(state, id)?
        }

        // API: Configuration
        (&Method::Get, "/api/config") => api::get_config(state)?,
        (&Method::Put, "/api/config") => api::put_config(state, body)?,
        (&Method::Post, "/api/config/test") => api::test_config(state)?,

        // API: Analysis & optimization
        (&Method::Post, "/api/analyze") => api::analyze(state)?,
        (&Method::Get, "/api/analysis") => api::get_analysis(state)?,
        (&Method::Post, "/api/optimize") => api::optimize(state, body)?,

        // 404
        _ => ApiReply::error(404, "not_found", "not found"),
    };

    Ok(Route::Json(reply))
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Serve the embedded single-page frontend.
fn serve_frontend() -> Response<Cursor<Vec<u8>>> {
    Response::from_data(frontend::INDEX_HTML.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

fn json_response(reply: &ApiReply) -> Response<Cursor<Vec<u8>>> {
    Response::from_data(reply.body.to_string().into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(reply.status))
}

/// JSON content type header.
fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8")
        .expect("static header is valid")
}

/// HTML content type header.
fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").expect("static header is valid")
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
