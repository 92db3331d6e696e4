use anyhow::{anyhow, Result};
use fs_err as fs;
use image::{DynamicImage, ImageFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

use crate::config::{Config, Models};
use crate::deck::Deck;
use crate::errors::FortuneError;
use crate::exec;
use crate::log::Transcript;
use crate::prompt::{self, Person};
use crate::provider::DynProvider;
use crate::vocab::{Language, Phrases, Vocabulary};
use crate::wire::{ImageRequest, Message, TextReply, TextRequest};

/// A card picture as stored on disk.
#[derive(Debug, Clone)]
pub struct CardImage {
    pub path: PathBuf,
    pub image: DynamicImage,
}

/// One thread of messages with a single model.
#[derive(Debug, Clone)]
pub struct Conversation {
    model: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(model: impl Into<String>, system: &str, history: &[Message]) -> Self {
        let mut messages = vec![Message::system(system)];
        messages.extend_from_slice(history);
        Self { model: model.into(), messages }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Sends `prompt` as the next user turn and records the answer.
    async fn turn(
        &mut self,
        provider: &DynProvider,
        transcript: &mut Transcript,
        stage: &str,
        prompt: &str,
    ) -> Result<String> {
        self.messages.push(Message::user(prompt));
        let req = TextRequest { model: self.model.clone(), messages: self.messages.clone(), seed: None };
        let raw = provider
            .complete(&req)
            .await
            .map_err(|e| FortuneError::Provider(format!("{stage}: {e:#}")))?;
        transcript.save_stage(stage, &req, &TextReply { content: &raw })?;
        self.messages.push(Message::assistant(raw.clone()));
        Ok(raw)
    }
}

/// Session state of the fortune teller: the deck, what was foretold so far
/// and the conversation currently going on.
pub struct FortuneTeller {
    language: Language,
    phrases: Phrases,
    deck: Deck,
    username: String,
    prophecies: Vec<Message>,
    conversation: Option<Conversation>,
    provider: DynProvider,
    models: Models,
    images_dir: PathBuf,
    image_size: (u32, u32),
    show_image: bool,
    transcript: Transcript,
    images_saved: usize,
    rng: StdRng,
}

impl FortuneTeller {
    pub fn new(vocab: Vocabulary, provider: DynProvider, cfg: &Config, transcript: Transcript) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            language: vocab.language,
            deck: Deck::from_vocabulary(&vocab),
            phrases: vocab.phrases,
            username: "User".into(),
            prophecies: Vec::new(),
            conversation: None,
            provider,
            models: cfg.models(),
            images_dir: cfg.images_dir.clone(),
            image_size: (cfg.image_width, cfg.image_height),
            show_image: cfg.show_image,
            transcript,
            images_saved: 0,
            rng,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn phrases(&self) -> &Phrases {
        &self.phrases
    }

    pub fn referrer(&self) -> String {
        self.phrases.referrer()
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn current_card(&self) -> &str {
        self.deck.current()
    }

    pub fn card_history(&self) -> &[String] {
        self.deck.history()
    }

    pub fn prophecies(&self) -> &[Message] {
        &self.prophecies
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn pick_card(&mut self) -> Result<String> {
        Ok(self.deck.pick(&mut self.rng)?.to_string())
    }

    /// Reads the current card for `person`.
    pub async fn hear_the_ancient_voices(&mut self, person: &Person) -> Result<String> {
        self.username = person.name.clone();
        let text_prompt = prompt::prophecy_prompt(self.language, self.deck.current(), person);
        let mut conv = Conversation::new(&self.models.text, &self.phrases.text("system"), &[]);
        let raw = conv
            .turn(&self.provider, &mut self.transcript, "prophecy", &text_prompt)
            .await?;
        self.prophecies.push(Message::assistant(raw.clone()));
        Ok(prompt::format_reply(&raw))
    }

    /// Paints the current card, or repaints it following `refinement`.
    pub async fn look_into_the_crystal_ball(&mut self, refinement: Option<&str>) -> Result<CardImage> {
        let (stage, image_prompt) = match refinement {
            Some(instructions) => ("card.refine", prompt::refine_image_prompt(self.language, instructions)),
            None => ("card", prompt::card_image_prompt(self.language, self.deck.current())),
        };
        let mut req = ImageRequest::new(&self.models.image, image_prompt, self.rng.gen());
        (req.width, req.height) = self.image_size;

        let reply = self
            .provider
            .imagine(&req)
            .await
            .map_err(|e| FortuneError::Provider(format!("{stage}: {e:#}")))?;
        self.transcript.save_stage(stage, &req, &reply)?;

        let image = image::load_from_memory(&reply.bytes)
            .map_err(|e| FortuneError::Image(format!("undecodable card image: {e}")))?;
        self.images_saved += 1;
        let path = save_card_image(&self.images_dir, self.images_saved, &image)?;

        if self.show_image {
            if let Err(e) = exec::open_in_viewer(&path) {
                tracing::warn!("{e:#}");
            }
        }
        Ok(CardImage { path, image })
    }

    /// Starts the closing conversation about every card drawn so far.
    pub async fn summarize_prophecies(&mut self) -> Result<String> {
        let text_prompt = prompt::summary_prompt(self.language, &self.deck.quoted_history());
        let mut conv = Conversation::new(&self.models.text, &self.phrases.text("system"), &[]);
        let raw = conv
            .turn(&self.provider, &mut self.transcript, "summary", &text_prompt)
            .await?;
        self.conversation = Some(conv);
        Ok(prompt::format_reply(&raw))
    }

    /// The fortune teller takes offence and answers with the evil model.
    pub async fn punish_insolence(&mut self, user_text: &str) -> Result<String> {
        let mut conv = Conversation::new(&self.models.evil, &self.phrases.text("system"), &self.prophecies);
        let raw = conv
            .turn(&self.provider, &mut self.transcript, "insolence", user_text)
            .await?;
        self.conversation = Some(conv);
        Ok(prompt::format_reply(&raw))
    }

    /// Continues whatever conversation is open.
    pub async fn reply(&mut self, user_text: &str) -> Result<String> {
        let conv = self
            .conversation
            .as_mut()
            .ok_or_else(|| anyhow!("no conversation in progress"))?;
        let raw = conv
            .turn(&self.provider, &mut self.transcript, "reply", user_text)
            .await?;
        Ok(prompt::format_reply(&raw))
    }

    pub fn forget_old_prophecies(&mut self) {
        self.deck.forget();
        self.prophecies.clear();
        self.conversation = None;
    }
}

fn save_card_image(dir: &Path, seq: usize, image: &DynamicImage) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
    let path = dir.join(format!("img_{timestamp}_{seq:03}.png"));
    image
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|e| FortuneError::Image(format!("saving {}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), "card image saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ProviderKind;
    use crate::provider::offline::Offline;
    use crate::wire::Role;

    fn vocab() -> Vocabulary {
        let phrases = Phrases::parse(
            "system = You are a fortune teller\nreferrer = Fortune teller\n",
            Path::new("vocabulary.txt"),
        )
        .unwrap();
        Vocabulary {
            language: Language::English,
            subjects: vec!["fox".into()],
            adjectives: vec!["red".into()],
            golden_cards: vec!["The Moon".into()],
            phrases,
        }
    }

    fn teller(dir: &Path) -> FortuneTeller {
        let cfg = Config {
            provider: ProviderKind::Offline,
            images_dir: dir.join("images"),
            image_width: 12,
            image_height: 24,
            seed: Some(5),
            ..Config::default()
        };
        FortuneTeller::new(vocab(), Box::new(Offline), &cfg, Transcript::disabled())
    }

    #[tokio::test]
    async fn prophecy_is_remembered_for_the_evil_model() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = teller(tmp.path());
        let card = t.pick_card().unwrap();
        let person = Person { name: "Ada".into(), ..Person::default() };
        let prophecy = t.hear_the_ancient_voices(&person).await.unwrap();
        assert!(prophecy.starts_with('\n'));
        assert_eq!(t.username(), "Ada");
        assert_eq!(t.prophecies().len(), 1);
        assert!(t.prophecies()[0].content.contains(&card));

        t.punish_insolence("whatever").await.unwrap();
        let conv = t.conversation().unwrap();
        assert_eq!(conv.model(), "offline");
        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Assistant, Role::User, Role::Assistant]);

        t.reply("and then?").await.unwrap();
        assert_eq!(t.conversation().unwrap().messages().len(), 6);
    }

    #[tokio::test]
    async fn card_images_land_in_the_images_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = teller(tmp.path());
        t.pick_card().unwrap();
        let card = t.look_into_the_crystal_ball(None).await.unwrap();
        assert!(card.path.starts_with(tmp.path().join("images")));
        assert_eq!((card.image.width(), card.image.height()), (12, 24));
        let refined = t.look_into_the_crystal_ball(Some("more stars")).await.unwrap();
        assert!(refined.path.exists());
    }

    #[tokio::test]
    async fn summary_and_forget() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = teller(tmp.path());
        assert!(t.reply("hello?").await.is_err());
        t.pick_card().unwrap();
        t.pick_card().unwrap();
        let summary = t.summarize_prophecies().await.unwrap();
        assert!(summary.contains("You picked 2 fortune teller cards"));
        t.forget_old_prophecies();
        assert!(t.card_history().is_empty());
        assert!(t.conversation().is_none());
    }
}
