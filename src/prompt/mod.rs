use serde::{Deserialize, Serialize};

use crate::vocab::Language;

pub const LANGUAGE_MENU: &str = "Select language [i = Italiano, e = English] then type enter";
pub const LANGUAGE_NOT_RECOGNIZED: &str = "Not recognized\n\nSelect language: [i = italiano, e = english]";

/// What the seeker tells the fortune teller about themself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: String,
    pub number: String,
    pub color: String,
}

impl Default for Person {
    fn default() -> Self {
        Self {
            name: "Tommaso".into(),
            age: "32".into(),
            number: "2".into(),
            color: "green".into(),
        }
    }
}

impl Person {
    /// Lucky numbers are kept as typed; integers are normalized.
    pub fn normalize_number(raw: &str) -> String {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => n.to_string(),
            Err(_) => raw.to_string(),
        }
    }
}

pub fn prophecy_prompt(lang: Language, card: &str, p: &Person) -> String {
    match lang {
        Language::English => format!(
            "You picked a card named \"{card}\" from a fortune teller card deck. \
You have to guess my personality, my future, my best dreams and my worst fears by interpreting the meaning of this card.\
Here are small hints about me: my name is {}, I am {} years old, my lucky number is {} and my favourite color is {}. Take these into account.",
            p.name, p.age, p.number, p.color
        ),
        Language::Italiano => format!(
            "Hai appena pescato una carta intitolata \"{card}\" da un mazzo di tarocchi. \
Interpreta i segni il significato mistico di questa carta per indovinare la mia personalità, il mio futuro, i miei sogni e le mie paure. Tieni conto di queste informazioni.\
Ecco alcune informazioni su di me: mi chiamo {}, ho {} anni, il mio numero fortunato è {} e il mio colore preferito è {}.",
            p.name, p.age, p.number, p.color
        ),
    }
}

pub fn card_image_prompt(lang: Language, card: &str) -> String {
    let description = match lang {
        Language::English => format!(
            "Fortune teller card of {card}, title: \"{card}\" bold antique font at bottom of the card, \
mystic, epic, fortune teller card, Divination, 2D, mysterious"
        ),
        Language::Italiano => format!(
            "Carta dei tarocchi che raffigura {card}. IL testo visibile nella carta è il titolo: \"{card}\", \
in grassetto nel bordo inferiore della carta, in italiano, mistico, divinazione, tarocchi, cartomante, 2D, no prospettiva"
        ),
    };
    format!("INPUT = {card}\n\nOUTPUT = {description}")
}

pub fn refine_image_prompt(lang: Language, instructions: &str) -> String {
    match lang {
        Language::English => format!(
            "Change the previous image with the following instructions: {instructions}. \
Keep the same fortune teller card format and the same card title, as well as the image style."
        ),
        Language::Italiano => format!(
            "Cambia questa immagine con le seguenti istruzioni: {instructions}. \
Mantieni lo stesso formato di carta dei tarocchi e lo stesso titolo della carta, così come lo stile con cui hai generato la prima carta."
        ),
    }
}

pub fn summary_prompt(lang: Language, quoted_titles: &[String]) -> String {
    let all_cards = quoted_titles.join(", ");
    let count = quoted_titles.len();
    match lang {
        Language::English => format!(
            "You picked {count} fortune teller cards with the following names: {all_cards}. \
Summarize the meaning of this combination of cards."
        ),
        Language::Italiano => format!(
            "Hai appena pescato {count} carte dal mazzo dei tarocchi con i seguenti nomi: {all_cards}. \
Combina i significati di queste singole carte per prevedere il mio futuro."
        ),
    }
}

pub fn confirm_details(lang: Language, p: &Person) -> String {
    match lang {
        Language::English => format!(
            "so your name is {}, your age is {}, your lucky number is {} and your favourite color is {}, is that correct?",
            p.name, p.age, p.number, p.color
        ),
        Language::Italiano => format!(
            "Quindi il tuo nome è {}, la tua età è {}, il tuo numero fortunato è {} e il tuo colore preferito è {}, giusto?",
            p.name, p.age, p.number, p.color
        ),
    }
}

pub fn ask_anything_else(lang: Language) -> &'static str {
    match lang {
        Language::English => "do you want to ask me anything about this interpretation?",
        Language::Italiano => "vuoi chiedermi qualcosa riguardo questa interpretazione?",
    }
}

pub fn farewell(lang: Language) -> &'static str {
    match lang {
        Language::English => "bye!",
        Language::Italiano => "ciao!",
    }
}

pub fn rude(lang: Language) -> &'static str {
    match lang {
        Language::English => "ok... rude",
        Language::Italiano => "ok... maleducato",
    }
}

pub fn leave_me_alone(lang: Language) -> &'static str {
    match lang {
        Language::English => "now LEAVE ME ALONE. BYE!",
        Language::Italiano => "ora LASCIAMI IN PACE. CIAO!",
    }
}

pub fn waiting(lang: Language) -> &'static str {
    match lang {
        Language::English => "the cards are speaking...",
        Language::Italiano => "le carte stanno parlando...",
    }
}

/// One line per sentence, each input line preceded by a newline.
pub fn format_reply(raw: &str) -> String {
    let mut reply = String::new();
    for line in raw.split('\n') {
        reply.push('\n');
        reply.push_str(&line.split(". ").collect::<Vec<_>>().join(".\n"));
    }
    reply
}

fn normalize_exclamation(reply: &str) -> String {
    reply.trim().trim_end_matches('!').trim_end().to_lowercase()
}

/// The only way to quiet an angry fortune teller.
pub fn is_shut_up(reply: &str) -> bool {
    const EXITS: [&str; 7] = [
        "shut up",
        "shutp up",
        "zitto",
        "zitta",
        "stai zitto",
        "stai zitta",
        "smettila",
    ];
    let r = normalize_exclamation(reply);
    EXITS.contains(&r.as_str())
}

/// A bare "no" closes the summary conversation.
pub fn is_plain_no(reply: &str) -> bool {
    normalize_exclamation(reply) == "no"
}
