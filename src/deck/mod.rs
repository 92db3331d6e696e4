use rand::Rng;

use crate::errors::DeckError;
use crate::vocab::{Language, Vocabulary};

/// Cards of one reading session.
///
/// Golden cards are whole titles; the other source assembles a title from one
/// subject and one adjective. Drawn entries leave their pool for good, so the
/// pools may hold duplicates to weight how often an entry comes up.
#[derive(Debug, Clone)]
pub struct Deck {
    language: Language,
    subjects: Vec<String>,
    adjectives: Vec<String>,
    golden: Vec<String>,
    history: Vec<String>,
    current: String,
}

impl Deck {
    pub fn new(
        language: Language,
        subjects: Vec<String>,
        adjectives: Vec<String>,
        golden: Vec<String>,
    ) -> Self {
        Self {
            language,
            subjects,
            adjectives,
            golden,
            history: Vec::new(),
            current: default_card(language).to_string(),
        }
    }

    pub fn from_vocabulary(vocab: &Vocabulary) -> Self {
        Self::new(
            vocab.language,
            vocab.subjects.clone(),
            vocab.adjectives.clone(),
            vocab.golden_cards.clone(),
        )
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// History titles wrapped in double quotes, as they appear in prompts.
    pub fn quoted_history(&self) -> Vec<String> {
        self.history.iter().map(|t| format!("\"{t}\"")).collect()
    }

    fn golden_available(&self) -> bool {
        !self.golden.is_empty()
    }

    fn mixed_available(&self) -> bool {
        !self.subjects.is_empty() && !self.adjectives.is_empty()
    }

    /// Draw a title that has not come up yet in this session.
    pub fn pick<R: Rng>(&mut self, rng: &mut R) -> Result<&str, DeckError> {
        loop {
            let use_golden = match (self.golden_available(), self.mixed_available()) {
                (false, false) => return Err(DeckError::Exhausted),
                (true, false) => true,
                (false, true) => false,
                (true, true) => rng.gen_bool(0.5),
            };

            let title = if use_golden {
                let idx = rng.gen_range(0..self.golden.len());
                self.golden.remove(idx)
            } else {
                let subject = self.subjects.remove(rng.gen_range(0..self.subjects.len()));
                let adjective = self.adjectives.remove(rng.gen_range(0..self.adjectives.len()));
                compose_title(self.language, &subject, &adjective)
            };

            if self.history.contains(&title) {
                tracing::debug!(%title, "duplicate card drawn, drawing again");
                continue;
            }
            self.history.push(title.clone());
            self.current = title;
            return Ok(&self.current);
        }
    }

    pub fn forget(&mut self) {
        self.history.clear();
        self.current.clear();
    }
}

pub fn default_card(language: Language) -> &'static str {
    match language {
        Language::English => "The crazy panda",
        Language::Italiano => "Il tasso ninja",
    }
}

pub fn compose_title(language: Language, subject: &str, adjective: &str) -> String {
    match language {
        Language::English => format!("The {adjective} {subject}"),
        Language::Italiano => format!("{subject} {}", agree_italian(subject, adjective)),
    }
}

/// Adjectives ending in `*` take their final vowel from the subject.
pub fn agree_italian(subject: &str, adjective: &str) -> String {
    let Some(stem) = adjective.strip_suffix('*') else {
        return adjective.to_string();
    };
    let article = if subject.starts_with("l'") {
        "l'"
    } else {
        subject.split(' ').next().unwrap_or_default()
    };
    let feminine = matches!(article, "la" | "La");
    let ending = match subject.chars().last() {
        Some('o') => 'o',
        _ if feminine => 'a',
        _ => 'o',
    };
    format!("{stem}{ending}")
}
