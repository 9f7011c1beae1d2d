//! Prompt and completion formats shared by training and generation

/// Separates the word and definition from the expected completion
pub const PROMPT_SEPARATOR: &str = "\n\n###\n\n";

/// Stop sequence ending every fine-tuning completion
pub const END_MARKER: &str = " END";

/// Who speaks a turn of the few-shot conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarterMessage {
    pub speaker: Speaker,
    pub content: &'static str,
}

/// Few-shot conversation that primes a chat model to answer in the
/// `text,translation,cloze` format
pub const STARTING_MESSAGES: [StarterMessage; 3] = [
    StarterMessage {
        speaker: Speaker::User,
        content: "Create a training sentence for a German vocabulary word. Also include the English translation. The response should be a CSV formatted string.",
    },
    StarterMessage {
        speaker: Speaker::User,
        content: "Input:einheimisch",
    },
    StarterMessage {
        speaker: Speaker::Assistant,
        content: "Die einheimische Jägerschaft hält sich zurück.,The local hunters hold back.,einheimische",
    },
];

/// Prompt of a fine-tuned completion model
pub fn format_prompt(word: &str, definition: &str) -> String {
    format!("{}\n{}{}", word.trim(), definition.trim(), PROMPT_SEPARATOR)
}

/// Completion a fine-tuned model is trained to produce
pub fn format_completion(text: &str, translation: &str, cloze: &str) -> String {
    format!(" {},{},{}{}", text, translation, cloze, END_MARKER)
}

/// Full chat conversation asking for a cloze of `word`
pub fn chat_prompt(word: &str) -> Vec<(Speaker, String)> {
    STARTING_MESSAGES
        .iter()
        .map(|message| (message.speaker, message.content.to_string()))
        .chain(std::iter::once((Speaker::User, format!("Input: {}", word))))
        .collect()
}
