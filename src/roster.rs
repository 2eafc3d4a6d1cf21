//! The guessable universe: case-insensitive lookup and autocomplete
//! suggestions over the normalized roster entries.

use crate::model::RosterEntry;

pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Resolves player input to a roster entry. Matches the company name,
    /// the base ticker or the suffixed display ticker, all case-insensitive.
    pub fn find(&self, input: &str) -> Option<&RosterEntry> {
        let needle = input.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.entries.iter().find(|e| {
            e.name.to_lowercase() == needle
                || e.ticker.to_lowercase() == needle
                || e.display_ticker.to_lowercase() == needle
        })
    }

    /// Autocomplete: entries whose name or ticker contains the fragment,
    /// case-insensitive, capped at `limit`.
    pub fn suggest(&self, fragment: &str, limit: usize) -> Vec<&RosterEntry> {
        let needle = fragment.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.ticker.to_lowercase().contains(&needle)
                    || e.display_ticker.to_lowercase().contains(&needle)
            })
            .take(limit)
            .collect()
    }
}
