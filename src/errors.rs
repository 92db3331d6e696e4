use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabError {
    #[error("language not recognized: {0}")] UnknownLanguage(String),
    #[error("the selected language folder does not exist: {}", .0.display())] LanguageDirMissing(PathBuf),
    #[error("unexpected number of files in the selected language folder {} (found {found}, expected 4)", .dir.display())]
    UnexpectedFileCount { dir: PathBuf, found: usize },
    #[error("{}:{line}: expected `key = value`", .file.display())]
    MalformedLine { file: PathBuf, line: usize },
    #[error("vocabulary is missing the `{0}` phrase")] MissingPhrase(String),
    #[error("error while opening the vocabulary files: {0}")] Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeckError {
    #[error("the deck is exhausted: no unseen card can be drawn")] Exhausted,
}

#[derive(Error, Debug)]
pub enum FortuneError {
    #[error("provider error: {0}")] Provider(String),
    #[error("image error: {0}")] Image(String),
    #[error("report error: {0}")] Report(String),
}
