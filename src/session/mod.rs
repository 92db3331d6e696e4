use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::errors::DeckError;
use crate::prompt::{self, Person};
use crate::report::Report;
use crate::teller::{CardImage, FortuneTeller};
use crate::ux::Console;
use crate::vocab::Language;

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The user did not want a reading.
    Declined,
    /// The user typed `exit` while giving their details.
    Quit,
    Completed {
        cards: Vec<String>,
        report: Option<PathBuf>,
    },
}

/// Asks for a language until one of the menu keys is typed.
pub fn choose_language<C: Console>(console: &mut C, preset: Option<Language>) -> Result<Language> {
    if let Some(lang) = preset {
        return Ok(lang);
    }
    loop {
        console.line(prompt::LANGUAGE_MENU);
        let reply = console.ask("User")?;
        match Language::from_choice(&reply) {
            Some(lang) => return Ok(lang),
            None => console.line(prompt::LANGUAGE_NOT_RECOGNIZED),
        }
    }
}

pub struct Session<'c, C: Console> {
    teller: FortuneTeller,
    console: &'c mut C,
    pdf_dir: PathBuf,
    test_mode: bool,
    pauses: bool,
}

impl<'c, C: Console> Session<'c, C> {
    pub fn new(teller: FortuneTeller, console: &'c mut C, cfg: &Config) -> Self {
        Self {
            teller,
            console,
            pdf_dir: cfg.pdf_dir.clone(),
            test_mode: cfg.test_mode,
            pauses: cfg.pauses,
        }
    }

    pub fn teller(&self) -> &FortuneTeller {
        &self.teller
    }

    fn say(&mut self, text: &str) {
        let referrer = self.teller.referrer();
        self.console.say(&referrer, text);
    }

    fn say_phrase(&mut self, key: &str) {
        let text = self.teller.phrases().text(key);
        self.say(&text);
    }

    fn busy(&mut self) {
        let msg = prompt::waiting(self.teller.language());
        self.console.busy(msg);
    }

    async fn pause(&self, millis: u64) {
        if self.pauses {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }

    pub async fn run(&mut self) -> Result<Outcome> {
        self.say_phrase("greeting");
        loop {
            let reply = self.console.ask("User")?;
            if self.teller.phrases().is_yes(&reply) {
                let Some(person) = self.gather_details()? else {
                    return Ok(Outcome::Quit);
                };
                return self.read_cards(&person).await;
            } else if self.teller.phrases().is_no(&reply) {
                self.say_phrase("goodbye");
                return Ok(Outcome::Declined);
            } else {
                self.say_phrase("confused");
            }
        }
    }

    /// Name, age, lucky number and colour, repeated until confirmed.
    /// `None` when the user asks to exit.
    fn gather_details(&mut self) -> Result<Option<Person>> {
        loop {
            self.say_phrase("question1");
            let name = self.console.ask("User")?;
            self.say_phrase("question2");
            let age = self.console.ask(&name)?;
            self.say_phrase("question3");
            let number = Person::normalize_number(&self.console.ask(&name)?);
            self.say_phrase("question4");
            let color = self.console.ask(&name)?;

            let person = Person { name, age, number, color };
            let check = prompt::confirm_details(self.teller.language(), &person);
            self.say(&check);
            let reply = self.console.ask(&person.name)?;
            if self.teller.phrases().is_yes(&reply) {
                self.say_phrase("confirm");
                return Ok(Some(person));
            }
            if reply.trim() == "exit" {
                return Ok(None);
            }
        }
    }

    async fn read_cards(&mut self, person: &Person) -> Result<Outcome> {
        let mut report = Report::new(format!("{} - {}", self.teller.referrer(), person.name));
        let path = Report::default_path(&self.pdf_dir);

        // The report keeps whatever was read even if a later call fails.
        let read = self.reading_loop(person, &mut report).await;
        let saved = report.save(&path);
        read?;
        let report = saved?.map(|bytes| {
            let size = humansize::format_size(bytes, humansize::DECIMAL);
            self.console.line(&format!("\n{} ({size})", path.display()));
            path
        });

        Ok(Outcome::Completed { cards: self.teller.card_history().to_vec(), report })
    }

    async fn reading_loop(&mut self, person: &Person, report: &mut Report) -> Result<()> {
        loop {
            let card = match self.teller.pick_card() {
                Ok(card) => card,
                Err(e) if e.downcast_ref::<DeckError>().is_some() => {
                    tracing::warn!("{e}");
                    if !self.test_mode && !self.teller.card_history().is_empty() {
                        let summary = self.summary_conversation(person).await?;
                        report.add_text_page(&summary);
                    }
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            if self.test_mode {
                self.console.line(&card);
            } else {
                self.busy();
                let prophecy = self.teller.hear_the_ancient_voices(person).await?;
                self.say(&prophecy);

                let image = self.refine_until_liked(person).await?;
                report.add_card_page(&image.image, &card, &prophecy);
            }

            self.say_phrase("continue_reading_future");
            let reply = self.console.ask(&person.name)?;
            if self.teller.phrases().is_yes(&reply) {
                continue;
            } else if self.teller.phrases().is_no(&reply) {
                if !self.test_mode {
                    let summary = self.summary_conversation(person).await?;
                    report.add_text_page(&summary);
                }
                return Ok(());
            } else if !self.test_mode {
                self.punish_insolence(person, &reply).await?;
                return Ok(());
            }
        }
    }

    /// "no" paints the card again from scratch, any other answer is taken
    /// as instructions for the next version.
    async fn refine_until_liked(&mut self, person: &Person) -> Result<CardImage> {
        let mut refinement: Option<String> = None;
        loop {
            self.busy();
            let image = self.teller.look_into_the_crystal_ball(refinement.as_deref()).await?;
            self.say_phrase("like_image_string");
            let reply = self.console.ask(&person.name)?;
            if self.teller.phrases().is_yes(&reply) {
                return Ok(image);
            }
            self.say("ok");
            refinement = if self.teller.phrases().is_no(&reply) { None } else { Some(reply) };
        }
    }

    /// Returns the first summary, which is what goes in the report.
    async fn summary_conversation(&mut self, person: &Person) -> Result<String> {
        let lang = self.teller.language();
        self.busy();
        let first = self.teller.summarize_prophecies().await?;
        let mut summary = first.clone();
        loop {
            self.say(&summary);
            self.say(prompt::ask_anything_else(lang));
            let reply = self.console.ask(&person.name)?;
            if prompt::is_plain_no(&reply) {
                self.say("ok");
                self.pause(2000).await;
                self.say(prompt::farewell(lang));
                return Ok(first);
            }
            self.busy();
            summary = self.teller.reply(&reply).await?;
        }
    }

    /// Keeps answering with the evil model until told to shut up.
    async fn punish_insolence(&mut self, person: &Person, insolence: &str) -> Result<()> {
        let lang = self.teller.language();
        let referrer = self.teller.referrer();
        self.busy();
        let mut evil = self.teller.punish_insolence(insolence).await?;
        loop {
            self.say(&evil);
            let reply = self.console.ask(&person.name)?;
            if prompt::is_shut_up(&reply) {
                break;
            }
            self.busy();
            evil = self.teller.reply(&reply).await?;
        }

        self.console.line("");
        self.console.overwrite(&format!("{referrer}: ok...      "));
        self.pause(1000).await;
        self.console.line(&format!("{referrer}: {}", prompt::rude(lang)));
        self.pause(2000).await;
        let mut shown = format!("{referrer}: ");
        for ch in prompt::leave_me_alone(lang).chars() {
            shown.push(ch);
            self.console.overwrite(&format!("{shown}                 "));
            self.pause(300).await;
        }
        self.console.line("");
        Ok(())
    }
}
