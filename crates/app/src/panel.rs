//! Chat panel model: the transcript and input state the sidebar renders.

use chrono::Local;

pub const THINKING_TEXT: &str = "Thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    You,
    Robo,
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::You => "You",
            Sender::Robo => "Robo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Message,
    /// Transient placeholder shown while a reply is pending
    Thinking,
    Error,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub sender: Sender,
    pub kind: EntryKind,
    pub body: String,
    pub timestamp: String,
}

impl Entry {
    fn new(sender: Sender, kind: EntryKind, body: impl Into<String>) -> Self {
        Self {
            sender,
            kind,
            body: body.into(),
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ChatPanel {
    entries: Vec<Entry>,
    input_enabled: bool,
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            input_enabled: true,
        }
    }
}

impl ChatPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Record a user prompt and show the placeholder. Input stays disabled
    /// until [`ChatPanel::finish`] runs.
    pub fn begin(&mut self, prompt: &str) {
        self.entries
            .push(Entry::new(Sender::You, EntryKind::Message, prompt));
        self.entries
            .push(Entry::new(Sender::Robo, EntryKind::Thinking, THINKING_TEXT));
        self.input_enabled = false;
    }

    /// Replace the placeholder with the reply (or error) and unlock input.
    /// Returns the entry that was added.
    pub fn finish(&mut self, reply: Result<String, String>) -> &Entry {
        self.remove_placeholder();
        let entry = match reply {
            Ok(text) => Entry::new(Sender::Robo, EntryKind::Message, text),
            Err(reason) => Entry::new(Sender::Robo, EntryKind::Error, reason),
        };
        self.entries.push(entry);
        self.input_enabled = true;
        &self.entries[self.entries.len() - 1]
    }

    /// Informational line from the app itself (notices, launcher output).
    pub fn note(&mut self, text: impl Into<String>) {
        self.entries
            .push(Entry::new(Sender::Robo, EntryKind::Message, text));
    }

    pub fn pending(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.kind == EntryKind::Thinking)
    }

    fn remove_placeholder(&mut self) {
        if let Some(pos) = self
            .entries
            .iter()
            .rposition(|e| e.kind == EntryKind::Thinking)
        {
            self.entries.remove(pos);
        }
    }
}
