use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{truncate_text, Provider};
use crate::wire::{ImageReply, ImageRequest, Message, TextRequest};

pub const TEXT_BASE: &str = "https://text.pollinations.ai";
pub const IMAGE_BASE: &str = "https://image.pollinations.ai";

/// Pollinations text and image endpoints. No key is needed.
pub struct Pollinations {
    client: Client,
    text_base: String,
    image_base: String,
}

#[derive(Serialize)]
struct TextBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    private: bool,
}

impl Pollinations {
    pub fn new(text_base: String, image_base: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building pollinations http client")?;
        Ok(Self { client, text_base, image_base })
    }

    pub fn image_url(&self, req: &ImageRequest) -> Result<Url> {
        let mut url = Url::parse(&self.image_base)
            .with_context(|| format!("invalid image base url {}", self.image_base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("image base url cannot carry a path: {}", self.image_base))?
            .pop_if_empty()
            .push("prompt")
            .push(&req.prompt);
        url.query_pairs_mut()
            .append_pair("model", &req.model)
            .append_pair("seed", &req.seed.to_string())
            .append_pair("width", &req.width.to_string())
            .append_pair("height", &req.height.to_string())
            .append_pair("enhance", &req.enhance.to_string())
            .append_pair("nologo", &req.nologo.to_string());
        Ok(url)
    }
}

#[async_trait]
impl Provider for Pollinations {
    fn name(&self) -> &str {
        "pollinations"
    }

    async fn complete(&self, req: &TextRequest) -> Result<String> {
        let url = format!("{}/", self.text_base.trim_end_matches('/'));
        let body = TextBody {
            model: &req.model,
            messages: &req.messages,
            seed: req.seed,
            private: true,
        };

        debug!(%url, model = %req.model, turns = req.messages.len(), "pollinations text request");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("pollinations text request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("pollinations read body failed")?;
        debug!(%status, body = %text, "pollinations text response");
        if !status.is_success() {
            bail!("Pollinations text error ({}): {}", status, truncate_text(&text, 512));
        }
        Ok(text.trim().to_string())
    }

    async fn imagine(&self, req: &ImageRequest) -> Result<ImageReply> {
        let url = self.image_url(req)?;
        debug!(%url, "pollinations image request");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("pollinations image request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Pollinations image error ({}): {}", status, truncate_text(&body, 512));
        }
        let mime_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes().await.context("pollinations read image failed")?;
        Ok(ImageReply::new(bytes, mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::stub::serve_once;

    fn provider(base: &str) -> Pollinations {
        Pollinations::new(base.to_string(), base.to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn text_is_posted_as_private_chat_and_trimmed() {
        let (base, server) = serve_once("200 OK", "text/plain", "  The stars align.  \n").await;
        let req = TextRequest {
            model: "openai".into(),
            messages: vec![Message::system("You are a fortune teller"), Message::user("Read my card")],
            seed: Some(3),
        };
        let reply = provider(&base).complete(&req).await.unwrap();
        assert_eq!(reply, "The stars align.");

        let received = server.await.unwrap();
        assert!(received.head.starts_with("post / http/1.1"));
        let body = received.json();
        assert_eq!(body["model"], "openai");
        assert_eq!(body["private"], true);
        assert_eq!(body["seed"], 3);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Read my card");
    }

    #[tokio::test]
    async fn seedless_text_request_omits_the_seed() {
        let (base, server) = serve_once("200 OK", "text/plain", "ok").await;
        let req = TextRequest { model: "evil".into(), messages: vec![Message::user("hi")], seed: None };
        provider(&base).complete(&req).await.unwrap();
        assert!(server.await.unwrap().json().get("seed").is_none());
    }

    #[tokio::test]
    async fn image_bytes_and_content_type_come_back_untouched() {
        let png = vec![0x89, b'P', b'N', b'G', 1, 2, 3];
        let (base, server) = serve_once("200 OK", "image/png", png.clone()).await;
        let req = ImageRequest::new("flux", "The Moon", 7);
        let reply = provider(&base).imagine(&req).await.unwrap();
        assert_eq!(reply.bytes.as_ref(), png.as_slice());
        assert_eq!(reply.byte_len, png.len());
        assert_eq!(reply.mime_type.as_deref(), Some("image/png"));

        let received = server.await.unwrap();
        assert!(received.head.starts_with("get /prompt/the%20moon?model=flux&seed=7"));
    }

    #[tokio::test]
    async fn server_errors_carry_status_and_truncated_body() {
        let (base, _server) = serve_once("500 Internal Server Error", "text/plain", "x".repeat(600)).await;
        let req = TextRequest { model: "openai".into(), messages: vec![Message::user("hi")], seed: None };
        let err = provider(&base).complete(&req).await.unwrap_err().to_string();
        assert!(err.contains("500 Internal Server Error"));
        assert!(err.contains(&format!("{}…", "x".repeat(512))));
        assert!(!err.contains(&"x".repeat(513)));

        let (base, _server) = serve_once("503 Service Unavailable", "text/plain", "busy").await;
        let err = provider(&base)
            .imagine(&ImageRequest::new("flux", "The Sun", 1))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("503 Service Unavailable"));
        assert!(err.ends_with("busy"));
    }

    #[test]
    fn image_url_encodes_prompt_and_parameters() {
        let p = Pollinations::new(
            TEXT_BASE.into(),
            format!("{IMAGE_BASE}/"),
            Duration::from_secs(5),
        )
        .unwrap();
        let req = ImageRequest::new("flux", "The crazy panda, mystic", 42);
        let url = p.image_url(&req).unwrap();
        assert!(url
            .as_str()
            .starts_with("https://image.pollinations.ai/prompt/The%20crazy%20panda"));
        assert_eq!(url.path_segments().unwrap().count(), 2);
        let query = url.query().unwrap();
        assert!(query.contains("model=flux"));
        assert!(query.contains("seed=42"));
        assert!(query.contains("width=514"));
        assert!(query.contains("height=1024"));
        assert!(query.contains("nologo=true"));
    }
}
