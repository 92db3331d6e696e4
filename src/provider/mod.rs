use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::wire::{ImageReply, ImageRequest, TextRequest};

pub mod offline;
pub mod openai;
pub mod pollinations;

#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, req: &TextRequest) -> Result<String>;
    async fn imagine(&self, req: &ImageRequest) -> Result<ImageReply>;
}

pub type DynProvider = Box<dyn Provider + Send + Sync>;

pub fn make_provider(cfg: &Config) -> Result<DynProvider> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    match cfg.provider {
        ProviderKind::Pollinations => Ok(Box::new(pollinations::Pollinations::new(
            cfg.text_base_url.clone(),
            cfg.image_base_url.clone(),
            timeout,
        )?)),
        ProviderKind::OpenAI => Ok(Box::new(openai::OpenAIProvider::from_env(
            cfg.openai_base_url.clone(),
            timeout,
        )?)),
        ProviderKind::Offline => Ok(Box::new(offline::Offline)),
    }
}

/// Keep error bodies readable in messages.
pub(crate) fn truncate_text(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    format!("{head}…")
}

/// One-shot HTTP server for exercising the network providers.
#[cfg(test)]
pub(crate) mod stub {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    pub struct Received {
        /// Request line and headers, lowercased.
        pub head: String,
        pub body: Vec<u8>,
    }

    impl Received {
        pub fn json(&self) -> serde_json::Value {
            serde_json::from_slice(&self.body).unwrap()
        }
    }

    /// Answers the first connection with `status` and `body`, then hands back
    /// what the client sent.
    pub async fn serve_once(
        status: &str,
        content_type: &str,
        body: impl Into<Vec<u8>>,
    ) -> (String, JoinHandle<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let body = body.into();
        let head = format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let received = read_request(&mut sock).await;
            sock.write_all(head.as_bytes()).await.unwrap();
            sock.write_all(&body).await.unwrap();
            let _ = sock.shutdown().await;
            received
        });
        (base, handle)
    }

    async fn read_request(sock: &mut TcpStream) -> Received {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len || n == 0 {
                    let body = buf[end + 4..].to_vec();
                    return Received { head, body };
                }
            } else if n == 0 {
                return Received { head: String::from_utf8_lossy(&buf).to_lowercase(), body: Vec::new() };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_bodies() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefgh", 3), "abc…");
    }

    #[test]
    fn offline_provider_needs_no_network() {
        let cfg = Config { provider: ProviderKind::Offline, ..Config::default() };
        let p = make_provider(&cfg).unwrap();
        assert_eq!(p.name(), "offline");
    }
}
