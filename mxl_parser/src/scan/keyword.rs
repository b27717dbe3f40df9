//! Longest-match scanning over a fixed keyword set.

use crate::utils::char_at;

/// A fixed set of keywords with a precomputed character alphabet. Scanning
/// walks forward while characters stay within the alphabet and remembers
/// the longest prefix that is itself a complete keyword, so `<` and `<>`
/// can coexist without ordering tricks.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    keywords: Vec<&'static str>,
    alphabet: Vec<char>,
}

impl KeywordSet {
    pub fn new(keywords: &[&'static str]) -> Self {
        let mut alphabet: Vec<char> = Vec::new();
        for keyword in keywords {
            for c in keyword.chars() {
                if !alphabet.contains(&c) {
                    alphabet.push(c);
                }
            }
        }
        Self {
            keywords: keywords.to_vec(),
            alphabet,
        }
    }

    /// Longest keyword starting at `pos`, or `None`. Matching is
    /// case-sensitive.
    pub fn scan(&self, source: &str, pos: usize) -> Option<&'static str> {
        let mut best = None;
        let mut len = 0;
        while let Some(c) = char_at(source, pos + len) {
            if !self.alphabet.contains(&c) {
                break;
            }
            len += c.len_utf8();
            let candidate = &source[pos..pos + len];
            if let Some(keyword) = self.keywords.iter().find(|k| **k == candidate) {
                best = Some(*keyword);
            }
        }
        best
    }
}
