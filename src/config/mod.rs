use anyhow::{bail, Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{Args, ProviderKind};
use crate::provider::{openai, pollinations};
use crate::vocab::Language;
use crate::wire::{DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub language: Option<String>,
    pub images_dir: PathBuf,
    pub pdf_dir: PathBuf,
    pub provider: ProviderKind,
    pub text_model: Option<String>,
    pub evil_model: Option<String>,
    pub image_model: Option<String>,
    pub text_base_url: String,
    pub image_base_url: String,
    pub openai_base_url: String,
    pub timeout_secs: u64,
    pub image_width: u32,
    pub image_height: u32,
    pub seed: Option<u64>,
    pub show_image: bool,
    pub test_mode: bool,
    pub pauses: bool,
    pub save_transcript: bool,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: ".".into(),
            data_dir: "languages".into(),
            language: None,
            images_dir: "generated_images".into(),
            pdf_dir: "generated_predictions".into(),
            provider: ProviderKind::Pollinations,
            text_model: None,
            evil_model: None,
            image_model: None,
            text_base_url: pollinations::TEXT_BASE.into(),
            image_base_url: pollinations::IMAGE_BASE.into(),
            openai_base_url: openai::API_BASE.into(),
            timeout_secs: 300,
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            seed: None,
            show_image: false,
            test_mode: false,
            pauses: true,
            save_transcript: false,
            debug: false,
        }
    }
}

/// Model handles used for the three kinds of calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Models {
    pub text: String,
    pub evil: String,
    pub image: String,
}

impl Models {
    pub fn defaults_for(kind: ProviderKind) -> Self {
        let (text, evil, image) = match kind {
            ProviderKind::Pollinations => ("openai", "evil", "flux"),
            ProviderKind::OpenAI => ("gpt-4.1-mini", "gpt-4.1-mini", "gpt-image-1"),
            ProviderKind::Offline => ("offline", "offline", "offline"),
        };
        Self { text: text.into(), evil: evil.into(), image: image.into() }
    }
}

impl Config {
    /// Defaults, overlaid with the file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let cfg: Config = match ext {
            "toml" => toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
            }
            other => bail!("unsupported config format `{other}` for {}", path.display()),
        };
        Ok(cfg)
    }

    /// Command-line values win over the file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(v) = &args.data_dir { self.data_dir = v.clone(); }
        if let Some(v) = &args.language { self.language = Some(v.clone()); }
        if let Some(v) = &args.images_dir { self.images_dir = v.clone(); }
        if let Some(v) = &args.pdf_dir { self.pdf_dir = v.clone(); }
        if let Some(v) = args.provider { self.provider = v; }
        if let Some(v) = &args.text_model { self.text_model = Some(v.clone()); }
        if let Some(v) = &args.evil_model { self.evil_model = Some(v.clone()); }
        if let Some(v) = &args.image_model { self.image_model = Some(v.clone()); }
        if let Some(v) = args.timeout_secs { self.timeout_secs = v; }
        if let Some(v) = args.seed { self.seed = Some(v); }
        self.show_image |= args.show_image;
        self.test_mode |= args.test_mode;
        self.save_transcript |= args.save_transcript;
        self.debug |= args.debug;
        if args.no_pauses { self.pauses = false; }
    }

    pub fn models(&self) -> Models {
        let defaults = Models::defaults_for(self.provider);
        Models {
            text: self.text_model.clone().unwrap_or(defaults.text),
            evil: self.evil_model.clone().unwrap_or(defaults.evil),
            image: self.image_model.clone().unwrap_or(defaults.image),
        }
    }

    /// Language fixed by configuration, accepting either the key or the name.
    pub fn preset_language(&self) -> Result<Option<Language>> {
        let Some(raw) = self.language.as_deref() else {
            return Ok(None);
        };
        if let Some(lang) = Language::from_choice(raw) {
            return Ok(Some(lang));
        }
        Ok(Some(Language::from_name(raw.trim())?))
    }

    /// A relative data dir missing from the working directory is looked up
    /// next to the crate's own `languages` folder.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if self.data_dir.is_relative() && !self.data_dir.exists() {
            let bundled = Path::new(env!("CARGO_MANIFEST_DIR")).join(&self.data_dir);
            if bundled.exists() {
                return bundled;
            }
        }
        self.data_dir.clone()
    }

    pub fn language_dir(&self, language: Language) -> PathBuf {
        self.resolved_data_dir().join(language.name())
    }
}
