use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(alias = "pollinations-ai")]
    Pollinations,
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    #[value(alias = "dry-run")]
    Offline,
}

#[derive(Parser, Debug, Default)]
#[command(name = "fortune_teller", version, about = "A fortune teller that draws AI-painted cards and reads your future")]
pub struct Args {
    /// TOML or YAML file with default settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Folder holding one sub-folder per language
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// `e`/`English` or `i`/`Italiano`; asked interactively when missing
    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub images_dir: Option<PathBuf>,

    #[arg(long)]
    pub pdf_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long)]
    pub text_model: Option<String>,

    #[arg(long)]
    pub evil_model: Option<String>,

    #[arg(long)]
    pub image_model: Option<String>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Seed for the card draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Open every card in the system image viewer
    #[arg(long, default_value_t = false)]
    pub show_image: bool,

    /// Only draw and print cards; no API calls
    #[arg(long, default_value_t = false)]
    pub test_mode: bool,

    #[arg(long, default_value_t = false)]
    pub no_pauses: bool,

    /// Save every request/response under .fortune/tx/<session>
    #[arg(long, default_value_t = false)]
    pub save_transcript: bool,

    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_aliases_and_flags() {
        let args = Args::parse_from([
            "fortune_teller",
            "--provider",
            "open-ai",
            "--language",
            "i",
            "--test-mode",
            "--seed",
            "7",
        ]);
        assert_eq!(args.provider, Some(ProviderKind::OpenAI));
        assert_eq!(args.language.as_deref(), Some("i"));
        assert!(args.test_mode);
        assert!(!args.show_image);
        assert_eq!(args.seed, Some(7));
    }
}
