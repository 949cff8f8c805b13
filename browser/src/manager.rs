use std::time::Duration;

use chromiumoxide::Browser;
use chromiumoxide::Page;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::BrowserError;
use crate::Result;
use crate::config::ConnectConfig;

#[derive(Deserialize)]
struct JsonVersion {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

async fn discover_ws_via_port(port: u16) -> Result<String> {
    let url = format!("http://127.0.0.1:{port}/json/version");
    let resp = Client::new()
        .get(&url)
        .send()
        .await
        .map_err(|e| BrowserError::CdpError(format!("failed to reach Chrome debug port: {e}")))?;

    if !resp.status().is_success() {
        return Err(BrowserError::CdpError(format!(
            "Chrome /json/version returned {}",
            resp.status()
        )));
    }

    let body: JsonVersion = resp
        .json()
        .await
        .map_err(|e| BrowserError::CdpError(format!("failed to parse Chrome debug response: {e}")))?;

    Ok(body.web_socket_debugger_url)
}

/// Scan the process table for a Chrome started with a debug port and
/// verify the port actually answers.
async fn scan_for_chrome_debug_port() -> Option<u16> {
    let output = tokio::process::Command::new("ps")
        .arg("aux")
        .output()
        .await
        .ok()?;

    let ps_output = String::from_utf8_lossy(&output.stdout);

    let mut found_ports = Vec::new();
    for line in ps_output.lines() {
        if !(line.contains("chrome") || line.contains("Chrome") || line.contains("chromium")) {
            continue;
        }
        if let Some(rest) = line.split("--remote-debugging-port=").nth(1) {
            let port_str = rest.split_whitespace().next().unwrap_or(rest);
            if let Ok(port) = port_str.parse::<u16>() {
                // Port 0 means Chrome picked a random port; not discoverable.
                if port > 0 {
                    found_ports.push(port);
                }
            }
        }
    }

    found_ports.sort_unstable();
    found_ports.dedup();

    info!(
        "found {} Chrome process(es) with debug ports: {:?}",
        found_ports.len(),
        found_ports
    );

    for port in found_ports {
        let url = format!("http://127.0.0.1:{port}/json/version");
        let client = Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .ok()?;

        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("verified Chrome debug port {port} is reachable");
                return Some(port);
            }
            Ok(resp) => debug!("Chrome port {port} returned status {}", resp.status()),
            Err(_) => debug!("could not connect to Chrome port {port}"),
        }
    }

    warn!("no reachable Chrome debug ports found");
    None
}

/// A live attachment to the user's browser. Dropping the connection aborts
/// the CDP event pump; the browser itself is left running.
pub struct BrowserConnection {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
}

impl BrowserConnection {
    pub fn browser(&self) -> &Browser {
        &self.browser
    }
}

impl Drop for BrowserConnection {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

/// Attach to a running Chrome per the config. Tries, in order: an explicit
/// WebSocket URL, an explicit debug port, and a process-table scan.
pub async fn connect(config: &ConnectConfig) -> Result<BrowserConnection> {
    let ws = if let Some(ws) = config.ws_url.clone() {
        ws
    } else {
        let port = if config.debug_port > 0 {
            config.debug_port
        } else {
            info!("auto-scanning for Chrome debug ports");
            scan_for_chrome_debug_port().await.ok_or_else(|| {
                BrowserError::ConfigError(
                    "no running Chrome with a debug port found; start Chrome with \
                     --remote-debugging-port or pass --connect-ws"
                        .to_string(),
                )
            })?
        };
        discover_ws_via_port(port).await?
    };

    info!("connecting to Chrome via WebSocket: {ws}");
    let (browser, mut handler) = Browser::connect(ws).await?;
    let handler_task = tokio::spawn(async move {
        while let Some(_evt) = handler.next().await {}
    });

    Ok(BrowserConnection {
        browser,
        handler_task,
    })
}

/// Find the open tab whose URL starts with the app prefix.
pub async fn find_app_page(conn: &BrowserConnection, url_prefix: &str) -> Result<Page> {
    let pages = conn.browser.pages().await?;
    for page in pages {
        match page.url().await {
            Ok(Some(url)) if url.starts_with(url_prefix) => {
                info!("attached to app page at {url}");
                return Ok(page);
            }
            Ok(_) => {}
            Err(e) => debug!("could not read page url: {e}"),
        }
    }
    Err(BrowserError::TargetNotFound(url_prefix.to_string()))
}
