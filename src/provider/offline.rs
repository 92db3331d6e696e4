use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::io::Cursor;

use super::Provider;
use crate::wire::{ImageReply, ImageRequest, TextRequest};

/// Answers locally: text echoes the prompt, images are a flat colour derived
/// from the prompt and seed. Handy for rehearsals and tests.
pub struct Offline;

pub fn color_from_prompt(prompt: &str, seed: u64) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(seed.to_be_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

#[async_trait]
impl Provider for Offline {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, req: &TextRequest) -> Result<String> {
        let prompt = req.last_user_prompt();
        let gist: String = prompt.chars().take(120).collect();
        Ok(format!(
            "The cards are quiet today. I see: {gist}. The rest is hidden in the mist."
        ))
    }

    async fn imagine(&self, req: &ImageRequest) -> Result<ImageReply> {
        let (r, g, b) = color_from_prompt(&req.prompt, req.seed);
        let mut img = RgbImage::new(req.width.max(1), req.height.max(1));
        for pixel in img.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .context("encoding offline card image")?;
        Ok(ImageReply::new(buf, Some("image/png".into())))
    }
}
