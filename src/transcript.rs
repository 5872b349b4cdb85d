//! Append-only record of what has been said in the current interface session.

use crate::events::{TranscriptEntry, TranscriptRole};

/// Ordered list of displayed messages.
///
/// Entries can only be appended; there is no way to remove, reorder or edit
/// one once it is in.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: TranscriptRole, text: impl Into<String>) {
        self.entries.push(TranscriptEntry::new(role, text));
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(TranscriptRole::User, text);
    }

    pub fn push_agent(&mut self, text: impl Into<String>) {
        self.push(TranscriptRole::Agent, text);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TranscriptEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a TranscriptEntry;
    type IntoIter = std::slice::Iter<'a, TranscriptEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
