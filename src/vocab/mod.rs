use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::errors::VocabError;

pub const SUBJECTS_FILE: &str = "subjects.txt";
pub const ADJECTIVES_FILE: &str = "adjectives.txt";
pub const GOLDEN_CARDS_FILE: &str = "golden_cards.txt";
pub const VOCABULARY_FILE: &str = "vocabulary.txt";

const REQUIRED_PHRASES: [&str; 14] = [
    "system",
    "referrer",
    "greeting",
    "yes",
    "no",
    "question1",
    "question2",
    "question3",
    "question4",
    "confirm",
    "like_image_string",
    "continue_reading_future",
    "goodbye",
    "confused",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    English,
    Italiano,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Italiano, Language::English];

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Italiano => "Italiano",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, VocabError> {
        Self::ALL
            .into_iter()
            .find(|l| l.name() == name)
            .ok_or_else(|| VocabError::UnknownLanguage(name.to_string()))
    }

    /// The language is named after the last component of its data directory.
    pub fn from_dir(dir: &Path) -> Result<Self, VocabError> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_name(&name)
    }

    /// Keys accepted by the interactive language prompt.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "e" => Some(Language::English),
            "i" => Some(Language::Italiano),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phrase {
    Text(String),
    Choices(Vec<String>),
}

impl Phrase {
    /// `a-b-c` is a list of accepted answers, `a+b` a multi-line text.
    pub fn parse(raw: &str) -> Self {
        if raw.contains('-') {
            Phrase::Choices(raw.split('-').map(|s| s.to_string()).collect())
        } else if raw.contains('+') {
            Phrase::Text(raw.split('+').collect::<Vec<_>>().join("\n"))
        } else {
            Phrase::Text(raw.to_string())
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Phrase::Text(t) => t.clone(),
            Phrase::Choices(c) => c.join("-"),
        }
    }

    pub fn contains(&self, reply: &str) -> bool {
        match self {
            Phrase::Text(t) => t == reply,
            Phrase::Choices(c) => c.iter().any(|x| x == reply),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Phrases {
    map: HashMap<String, Phrase>,
}

impl Phrases {
    pub fn parse(content: &str, file: &Path) -> Result<Self, VocabError> {
        let mut map = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once(" = ").ok_or_else(|| VocabError::MalformedLine {
                file: file.to_path_buf(),
                line: idx + 1,
            })?;
            map.insert(key.trim().to_string(), Phrase::parse(value));
        }
        Ok(Self { map })
    }

    pub fn text(&self, key: &str) -> String {
        self.map.get(key).map(Phrase::as_text).unwrap_or_default()
    }

    /// Accepted answers for `key`; a plain text phrase is a single choice.
    pub fn choices(&self, key: &str) -> Vec<String> {
        match self.map.get(key) {
            Some(Phrase::Choices(c)) => c.clone(),
            Some(Phrase::Text(t)) => vec![t.clone()],
            None => Vec::new(),
        }
    }

    pub fn referrer(&self) -> String {
        self.text("referrer")
    }

    pub fn is_yes(&self, reply: &str) -> bool {
        self.map.get("yes").is_some_and(|p| p.contains(reply.trim()))
    }

    pub fn is_no(&self, reply: &str) -> bool {
        self.map.get("no").is_some_and(|p| p.contains(reply.trim()))
    }

    fn check_required(&self) -> Result<(), VocabError> {
        for key in REQUIRED_PHRASES {
            if !self.map.contains_key(key) {
                return Err(VocabError::MissingPhrase(key.to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub language: Language,
    pub subjects: Vec<String>,
    pub adjectives: Vec<String>,
    pub golden_cards: Vec<String>,
    pub phrases: Phrases,
}

impl Vocabulary {
    pub fn load(dir: &Path) -> Result<Self, VocabError> {
        let language = Language::from_dir(dir)?;
        if !dir.is_dir() {
            return Err(VocabError::LanguageDirMissing(dir.to_path_buf()));
        }
        let found = fs::read_dir(dir)?.count();
        if found != 4 {
            return Err(VocabError::UnexpectedFileCount { dir: dir.to_path_buf(), found });
        }

        let subjects = read_list(&dir.join(SUBJECTS_FILE))?;
        let adjectives = read_list(&dir.join(ADJECTIVES_FILE))?;
        let golden_cards = read_list(&dir.join(GOLDEN_CARDS_FILE))?;

        let vocab_path = dir.join(VOCABULARY_FILE);
        let phrases = Phrases::parse(&fs::read_to_string(&vocab_path)?, &vocab_path)?;
        phrases.check_required()?;

        tracing::debug!(
            language = %language,
            subjects = subjects.len(),
            adjectives = adjectives.len(),
            golden = golden_cards.len(),
            "vocabulary loaded"
        );

        Ok(Self { language, subjects, adjectives, golden_cards, phrases })
    }
}

fn read_list(path: &Path) -> Result<Vec<String>, VocabError> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(|l| l.trim_end_matches('\r').to_string())
        .filter(|l| !l.trim().is_empty())
        .collect())
}
