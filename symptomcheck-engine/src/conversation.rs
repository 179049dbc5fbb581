use crate::traits::Content;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub prompt: String,
    pub reply: String,
}

/// Append-only prompt/reply history of one chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Full request for a new turn: every prior exchange, then `prompt`.
    pub fn request_with(&self, prompt: &str) -> Vec<Content> {
        let mut contents = Vec::with_capacity(self.turns.len() * 2 + 1);
        for turn in &self.turns {
            contents.push(Content::user_text(turn.prompt.clone()));
            contents.push(Content::model_text(turn.reply.clone()));
        }
        contents.push(Content::user_text(prompt));
        contents
    }

    pub fn push(&mut self, prompt: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(Turn {
            prompt: prompt.into(),
            reply: reply.into(),
        });
    }
}
