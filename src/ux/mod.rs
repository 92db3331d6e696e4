use anyhow::{bail, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

/// Where the conversation is shown and the user's answers come from.
pub trait Console {
    /// `speaker: text` on a fresh paragraph.
    fn say(&mut self, speaker: &str, text: &str);
    fn line(&mut self, text: &str);
    /// Shows `prompt: ` and reads one line, without the trailing newline.
    fn ask(&mut self, prompt: &str) -> Result<String>;
    /// Redraws the current line in place.
    fn overwrite(&mut self, text: &str);
    fn busy(&mut self, _msg: &str) {}
    fn idle(&mut self) {}
}

#[derive(Default)]
pub struct Terminal {
    spinner: Option<ProgressBar>,
}

impl Terminal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Console for Terminal {
    fn say(&mut self, speaker: &str, text: &str) {
        self.idle();
        println!("\n{}: {}", speaker.magenta().bold(), text);
    }

    fn line(&mut self, text: &str) {
        self.idle();
        println!("{text}");
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.idle();
        print!("\n{}: ", prompt.cyan().bold());
        let _ = io::stdout().flush();
        let mut s = String::new();
        if io::stdin().read_line(&mut s)? == 0 {
            bail!("input closed");
        }
        Ok(s.trim_end_matches(['\r', '\n']).to_string())
    }

    fn overwrite(&mut self, text: &str) {
        print!("{text}\r");
        let _ = io::stdout().flush();
    }

    fn busy(&mut self, msg: &str) {
        self.idle();
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.magenta} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        self.spinner = Some(pb);
    }

    fn idle(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}

/// Plays back canned answers and records everything shown.
#[derive(Debug, Default)]
pub struct Scripted {
    answers: VecDeque<String>,
    shown: Vec<String>,
}

impl Scripted {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: answers.into_iter().map(Into::into).collect(), shown: Vec::new() }
    }

    pub fn shown(&self) -> &[String] {
        &self.shown
    }

    pub fn transcript(&self) -> String {
        self.shown.join("\n")
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Console for Scripted {
    fn say(&mut self, speaker: &str, text: &str) {
        self.shown.push(format!("{speaker}: {text}"));
    }

    fn line(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        let Some(answer) = self.answers.pop_front() else {
            bail!("script ran out of answers at prompt `{prompt}`");
        };
        self.shown.push(format!("{prompt}: {answer}"));
        Ok(answer)
    }

    fn overwrite(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }
}
