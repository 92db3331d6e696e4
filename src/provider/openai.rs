use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::truncate_text;
use crate::wire::{ImageReply, ImageRequest, TextRequest};

pub const API_BASE: &str = "https://api.openai.com";

/// OpenAI chat completions for text and image generations for cards.
pub struct OpenAIProvider {
    api_key: String,
    api_base: String,
    client: Client,
    timeout: Duration,
}

impl OpenAIProvider {
    pub fn new(api_key: String, api_base: String, timeout: Duration) -> Self {
        Self { api_key, api_base, client: Client::new(), timeout }
    }

    pub fn from_env(api_base: String, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY env var is not set"))?;
        Ok(Self::new(api_key, api_base, timeout))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let url = self.url(path);
        debug!(%url, "openai request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .with_context(|| format!("openai request to {path} failed"))?;

        let status = resp.status();
        let text = resp.text().await?;
        debug!(%status, "openai response");

        if !status.is_success() {
            bail!("OpenAI API error ({}): {}", status, truncate_text(&text, 512));
        }
        Ok(text)
    }
}

/// Portrait sizes accepted by the image models.
fn image_size(model: &str, width: u32, height: u32) -> &'static str {
    let portrait = height > width;
    match (model.starts_with("dall-e"), portrait) {
        (true, true) => "1024x1792",
        (false, true) => "1024x1536",
        (_, false) => "1024x1024",
    }
}

#[async_trait]
impl super::Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, req: &TextRequest) -> Result<String> {
        let mut body = json!({
            "model": req.model,
            "messages": req.messages,
        });
        if let Some(seed) = req.seed {
            body["seed"] = json!(seed);
        }
        let text = self.post("v1/chat/completions", &body).await?;

        #[derive(Deserialize)]
        struct ChatMessage {
            #[serde(default)]
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChatMessage,
        }
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse OpenAI response: {e}\nRaw: {}", truncate_text(&text, 512)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or_else(|| anyhow!("OpenAI returned no message content"))
    }

    async fn imagine(&self, req: &ImageRequest) -> Result<ImageReply> {
        let mut body = json!({
            "model": req.model,
            "prompt": req.prompt,
            "n": 1,
            "size": image_size(&req.model, req.width, req.height),
        });
        if req.model.starts_with("dall-e") {
            body["response_format"] = json!("b64_json");
        }
        let text = self.post("v1/images/generations", &body).await?;

        #[derive(Deserialize)]
        struct ImageData {
            #[serde(default)]
            b64_json: Option<String>,
        }
        #[derive(Deserialize)]
        struct ImagesResponse {
            data: Vec<ImageData>,
        }

        let parsed: ImagesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse OpenAI image response: {e}"))?;
        let encoded = parsed
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or_else(|| anyhow!("OpenAI returned no image data"))?;
        let bytes = BASE64.decode(encoded.trim()).context("decoding OpenAI image payload")?;
        Ok(ImageReply::new(bytes, Some("image/png".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use crate::provider::stub::serve_once;
    use crate::provider::Provider;
    use crate::wire::Message;

    fn provider(base: &str) -> OpenAIProvider {
        OpenAIProvider::new("sk-test".into(), base.to_string(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn chat_reply_is_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  The tower falls.\n"}}]}"#;
        let (base, server) = serve_once("200 OK", "application/json", body).await;
        let req = TextRequest {
            model: "gpt-4.1-mini".into(),
            messages: vec![Message::system("sys"), Message::user("Read my card")],
            seed: Some(4),
        };
        assert_eq!(provider(&base).complete(&req).await.unwrap(), "The tower falls.");

        let received = server.await.unwrap();
        assert!(received.head.starts_with("post /v1/chat/completions http/1.1"));
        assert!(received.head.contains("authorization: bearer sk-test"));
        let sent = received.json();
        assert_eq!(sent["model"], "gpt-4.1-mini");
        assert_eq!(sent["seed"], 4);
        assert_eq!(sent["messages"][1]["content"], "Read my card");
    }

    #[tokio::test]
    async fn image_payload_is_base64_decoded() {
        let raw = vec![0x89, b'P', b'N', b'G', 9, 9];
        let body = format!(r#"{{"data":[{{"b64_json":"{}"}}]}}"#, BASE64.encode(&raw));
        let (base, server) = serve_once("200 OK", "application/json", body).await;
        let reply = provider(&base)
            .imagine(&ImageRequest::new("dall-e-3", "The Moon", 1))
            .await
            .unwrap();
        assert_eq!(reply.bytes.as_ref(), raw.as_slice());

        let sent = server.await.unwrap().json();
        assert_eq!(sent["size"], "1024x1792");
        assert_eq!(sent["response_format"], "b64_json");
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_body() {
        let (base, _server) = serve_once("401 Unauthorized", "application/json", r#"{"error":"bad key"}"#).await;
        let req = TextRequest { model: "gpt-4.1-mini".into(), messages: vec![Message::user("hi")], seed: None };
        let err = provider(&base).complete(&req).await.unwrap_err().to_string();
        assert!(err.contains("401 Unauthorized"));
        assert!(err.contains("bad key"));
    }

    #[test]
    fn portrait_sizes_depend_on_model_family() {
        assert_eq!(image_size("dall-e-3", 514, 1024), "1024x1792");
        assert_eq!(image_size("gpt-image-1", 514, 1024), "1024x1536");
        assert_eq!(image_size("gpt-image-1", 1024, 1024), "1024x1024");
    }

    #[test]
    fn urls_join_without_double_slash() {
        let p = OpenAIProvider::new("k".into(), "https://api.openai.com/".into(), Duration::from_secs(1));
        assert_eq!(p.url("v1/chat/completions"), "https://api.openai.com/v1/chat/completions");
    }
}
