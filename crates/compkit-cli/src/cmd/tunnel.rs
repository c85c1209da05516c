use anyhow::Context;
use compkit_core::config::Config;
use compkit_core::plan::ENV_TUNNEL_URL;
use std::path::{Path, PathBuf};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStderr, Command},
    time::{timeout, Duration},
};

const TIMEOUT_ENV: &str = "COMPKIT_TUNNEL_TIMEOUT_SECS";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error(
        "cloudflared not found\n\n\
         `compkit tunnel` exposes the local dev server through a Cloudflare quick tunnel.\n\n\
         Install it:\n\
         \n\
           macOS    brew install cloudflare/cloudflare/cloudflared\n\
           Windows  winget install Cloudflare.cloudflared\n\
           Linux    https://pkg.cloudflare.com/index.html"
    )]
    NotFound,

    #[error("cloudflared did not report a tunnel URL within {0} seconds")]
    Timeout(u64),

    #[error(
        "cloudflared exited before the tunnel was ready.\n\
         Try running manually: cloudflared tunnel --url http://localhost:{port}"
    )]
    ExitedEarly { port: u16 },

    #[error("process error: {0}")]
    Process(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Tunnel
// ---------------------------------------------------------------------------

/// A running cloudflared quick tunnel, killed on [`Tunnel::stop`] or drop.
pub struct Tunnel {
    pub url: String,
    process: Child,
}

impl Tunnel {
    pub async fn start(port: u16) -> Result<Self, TunnelError> {
        let binary = find_cloudflared()?;
        let timeout_secs = std::env::var(TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        tracing::info!("starting cloudflared for http://localhost:{port}");
        let mut child = Command::new(binary)
            .args([
                "tunnel",
                "--url",
                &format!("http://localhost:{port}"),
                "--no-autoupdate",
            ])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let Some(stderr) = child.stderr.take() else {
            let _ = child.kill().await;
            return Err(TunnelError::ExitedEarly { port });
        };

        match timeout(Duration::from_secs(timeout_secs), wait_for_url(stderr, port)).await {
            Ok(Ok((url, rest))) => {
                // cloudflared dies on SIGPIPE if nobody drains its log.
                tokio::spawn(async move {
                    let mut rest = rest;
                    let _ = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await;
                });
                Ok(Tunnel {
                    url,
                    process: child,
                })
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                Err(e)
            }
            Err(_) => {
                let _ = child.kill().await;
                Err(TunnelError::Timeout(timeout_secs))
            }
        }
    }

    pub async fn stop(mut self) {
        let _ = self.process.kill().await;
        let _ = self.process.wait().await;
    }
}

async fn wait_for_url(
    stderr: ChildStderr,
    port: u16,
) -> Result<(String, BufReader<ChildStderr>), TunnelError> {
    let mut lines = BufReader::new(stderr).lines();
    while let Some(line) = lines.next_line().await? {
        tracing::debug!("cloudflared: {line}");
        if let Some(url) = extract_tunnel_url(&line) {
            return Ok((url.to_string(), lines.into_inner()));
        }
    }
    Err(TunnelError::ExitedEarly { port })
}

fn find_cloudflared() -> Result<PathBuf, TunnelError> {
    which::which("cloudflared").map_err(|_| TunnelError::NotFound)
}

/// First `https://<sub>.trycloudflare.com` token in a cloudflared log line.
fn extract_tunnel_url(line: &str) -> Option<&str> {
    line.split(|c: char| c.is_whitespace() || c == '|' || c == '"' || c == '\'')
        .filter_map(|word| word.strip_prefix("https://").map(|host| (word, host)))
        .find(|(_, host)| {
            host.trim_end_matches('/')
                .split('/')
                .next()
                .is_some_and(|h| h.ends_with(".trycloudflare.com"))
        })
        .map(|(word, _)| word)
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

pub fn run(root: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let port = port.unwrap_or(config.dev_server_port);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let tunnel = Tunnel::start(port).await?;
        println!();
        println!("  Local:   http://localhost:{port}");
        println!("  Tunnel:  {}", tunnel.url);
        println!();
        println!("  Build against it with:");
        println!("    {ENV_TUNNEL_URL}={} compkit build watch:tunnel", tunnel.url);
        println!();
        println!("Ctrl+C to stop");

        tokio::signal::ctrl_c().await?;
        tunnel.stop().await;
        Ok::<(), anyhow::Error>(())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_on_its_own_line() {
        assert_eq!(
            extract_tunnel_url("https://calm-otter-pine.trycloudflare.com"),
            Some("https://calm-otter-pine.trycloudflare.com")
        );
    }

    #[test]
    fn url_inside_cloudflared_banner() {
        let line = "2024-05-01T10:00:00Z INF |  https://calm-otter.trycloudflare.com                |";
        assert_eq!(
            extract_tunnel_url(line),
            Some("https://calm-otter.trycloudflare.com")
        );
    }

    #[test]
    fn other_hosts_are_ignored() {
        assert_eq!(extract_tunnel_url("see https://developers.cloudflare.com/docs"), None);
        assert_eq!(extract_tunnel_url("https://trycloudflare.com.evil.example"), None);
        assert_eq!(extract_tunnel_url("Requesting new quick Tunnel..."), None);
    }
}
