use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Bad,
    Terrible,
}

impl Mood {
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Great => "great",
            Self::Good => "good",
            Self::Okay => "okay",
            Self::Bad => "bad",
            Self::Terrible => "terrible",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Great => "😄",
            Self::Good => "🙂",
            Self::Okay => "😐",
            Self::Bad => "😔",
            Self::Terrible => "😢",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for Mood {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "great" => Ok(Self::Great),
            "good" => Ok(Self::Good),
            "okay" | "ok" => Ok(Self::Okay),
            "bad" => Ok(Self::Bad),
            "terrible" => Ok(Self::Terrible),
            other => Err(anyhow!("invalid mood: {other} (expected great, good, okay, bad or terrible)")),
        }
    }
}

/// One free-text entry per day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: Uuid,

    pub entry_date: NaiveDate,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub mood: Option<Mood>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryUpsert {
    pub entry_date: NaiveDate,
    pub content: String,
    pub mood: Option<Mood>,
}

impl EntryUpsert {
    pub fn new(entry_date: NaiveDate, content: impl Into<String>, mood: Option<Mood>) -> Self {
        Self {
            entry_date,
            content: content.into(),
            mood,
        }
    }
}

/// Writes the entry for `input.entry_date`, replacing content and mood of an
/// existing one. An entry needs text or a mood.
pub fn upsert_entry_in(entries: &mut Vec<JournalEntry>, input: EntryUpsert) -> anyhow::Result<JournalEntry> {
    let content = input.content.trim().to_string();
    if content.is_empty() && input.mood.is_none() {
        bail!("journal entry needs some text or a mood");
    }

    if let Some(entry) = entries
        .iter_mut()
        .find(|entry| entry.entry_date == input.entry_date)
    {
        entry.content = content;
        entry.mood = input.mood;
        return Ok(entry.clone());
    }

    let entry = JournalEntry {
        id: Uuid::new_v4(),
        entry_date: input.entry_date,
        content,
        mood: input.mood,
    };
    entries.push(entry.clone());
    Ok(entry)
}

pub fn entry_on(entries: &[JournalEntry], date: NaiveDate) -> Option<JournalEntry> {
    entries.iter().find(|entry| entry.entry_date == date).cloned()
}
