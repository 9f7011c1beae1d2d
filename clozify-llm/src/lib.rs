//! Cloze generation with OpenAI models
//!
//! Two ways to turn a vocabulary word into a cloze sentence:
//! - [`ChatGenerator`]: a chat model primed with a few-shot conversation
//! - [`CompletionGenerator`]: a completion model fine-tuned on data from
//!   [`build_training_examples`]
//!
//! Both answer with a CSV-style `text,translation,cloze` line.

pub mod chat;
pub mod completion;
pub mod error;
pub mod finetune;
pub mod generate;
pub mod prompt;

pub use chat::{ChatConfig, ChatGenerator, DEFAULT_CHAT_MODEL};
pub use completion::{CompletionConfig, CompletionGenerator};
pub use error::{LlmError, Result};
pub use finetune::{build_training_examples, write_jsonl, write_jsonl_file, TrainingExample};
pub use generate::{generate_batch, ClozeGenerator};
pub use prompt::{
    chat_prompt, format_completion, format_prompt, Speaker, StarterMessage, END_MARKER,
    PROMPT_SEPARATOR, STARTING_MESSAGES,
};
