//! Item-key resolver: `name` optionally followed by a bracketed,
//! comma-separated parameter list with one level of array nesting.

use serde::{Deserialize, Serialize};

use crate::config::constants::compile_time;
use crate::parser::{Matched, Outcome, SyntaxError};
use crate::utils::byte_at;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyParamKind {
    Quoted,
    Unquoted,
    /// Nested `[...]` list, kept as one opaque span.
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyParam {
    pub kind: KeyParamKind,
    pub offset: usize,
    pub len: usize,
}

impl Matched for KeyParam {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMatch {
    pub offset: usize,
    pub len: usize,
    /// Length of the bare key name, before any `[`.
    pub name_len: usize,
    pub parameters: Vec<KeyParam>,
}

impl Matched for KeyMatch {
    fn offset(&self) -> usize {
        self.offset
    }
    fn len(&self) -> usize {
        self.len
    }
}

impl KeyMatch {
    pub fn name<'a>(&self, source: &'a str) -> &'a str {
        &source[self.offset..self.offset + self.name_len]
    }
}

fn is_key_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-'
}

enum State {
    New,
    Quoted,
    Unquoted,
    End,
}

/// Matches an item key starting at `pos`. Only the top-level parameters
/// are recorded; an array parameter is one span covering its brackets.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyParser;

impl KeyParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, source: &str, pos: usize) -> Outcome<KeyMatch> {
        let mut end = pos;
        while byte_at(source, end).is_some_and(is_key_name_byte) {
            end += 1;
        }
        if end == pos {
            return Outcome::Fail(SyntaxError::incorrect(pos));
        }
        let name_len = end - pos;

        if byte_at(source, end) != Some(b'[') {
            return Outcome::Complete(KeyMatch {
                offset: pos,
                len: name_len,
                name_len,
                parameters: Vec::new(),
            });
        }

        let mut parameters = Vec::new();
        // Level 1 is the main list, level 2 an array parameter.
        let mut level: usize = 1;
        let mut array_start = 0;
        let mut param_start = 0;
        let mut after_comma = false;
        end += 1;
        let mut state = State::New;
        loop {
            match state {
                State::New => {
                    while byte_at(source, end) == Some(b' ') {
                        end += 1;
                    }
                    match byte_at(source, end) {
                        Some(b'"') => {
                            param_start = end;
                            end += 1;
                            state = State::Quoted;
                        }
                        Some(b'[') if level < compile_time::query::MAX_KEY_BRACKET_DEPTH + 1 => {
                            if level == 2 {
                                return Outcome::Fail(SyntaxError::incorrect(end));
                            }
                            array_start = end;
                            level = 2;
                            end += 1;
                        }
                        Some(b'[') => return Outcome::Fail(SyntaxError::incorrect(end)),
                        Some(b']') if level == 2 => {
                            end += 1;
                            level = 1;
                            parameters.push(KeyParam {
                                kind: KeyParamKind::Array,
                                offset: array_start,
                                len: end - array_start,
                            });
                            match self.after_param(source, &mut end, &mut level, &mut after_comma) {
                                Ok(next) => state = next,
                                Err(err) => return Outcome::Fail(err),
                            }
                        }
                        Some(b']') => {
                            // A comma right before the bracket leaves one
                            // more empty parameter to record.
                            if after_comma {
                                parameters.push(KeyParam {
                                    kind: KeyParamKind::Unquoted,
                                    offset: end,
                                    len: 0,
                                });
                            }
                            end += 1;
                            state = State::End;
                        }
                        Some(b',') => {
                            if level == 1 {
                                parameters.push(KeyParam {
                                    kind: KeyParamKind::Unquoted,
                                    offset: end,
                                    len: 0,
                                });
                            }
                            end += 1;
                            after_comma = true;
                        }
                        Some(_) => {
                            param_start = end;
                            state = State::Unquoted;
                        }
                        None => return Outcome::Fail(SyntaxError::incorrect(end)),
                    }
                }
                State::Quoted => match scan_quoted(source, param_start) {
                    Some(len) => {
                        if level == 1 {
                            parameters.push(KeyParam {
                                kind: KeyParamKind::Quoted,
                                offset: param_start,
                                len,
                            });
                        }
                        end = param_start + len;
                        match self.after_param(source, &mut end, &mut level, &mut after_comma) {
                            Ok(next) => state = next,
                            Err(err) => return Outcome::Fail(err),
                        }
                    }
                    None => return Outcome::Fail(SyntaxError::incorrect(param_start)),
                },
                State::Unquoted => {
                    while byte_at(source, end).is_some_and(|b| b != b',' && b != b']') {
                        end += 1;
                    }
                    if byte_at(source, end).is_none() {
                        return Outcome::Fail(SyntaxError::incorrect(end));
                    }
                    if level == 1 {
                        parameters.push(KeyParam {
                            kind: KeyParamKind::Unquoted,
                            offset: param_start,
                            len: end - param_start,
                        });
                    }
                    match byte_at(source, end) {
                        Some(b',') => {
                            end += 1;
                            after_comma = true;
                            state = State::New;
                        }
                        _ => {
                            // Closing bracket of the current level.
                            end += 1;
                            if level == 2 {
                                level = 1;
                                parameters.push(KeyParam {
                                    kind: KeyParamKind::Array,
                                    offset: array_start,
                                    len: end - array_start,
                                });
                                match self.after_param(source, &mut end, &mut level, &mut after_comma) {
                                    Ok(next) => state = next,
                                    Err(err) => return Outcome::Fail(err),
                                }
                            } else {
                                state = State::End;
                            }
                        }
                    }
                }
                State::End => {
                    return Outcome::Complete(KeyMatch {
                        offset: pos,
                        len: end - pos,
                        name_len,
                        parameters,
                    })
                }
            }
        }
    }

    /// After a completed quoted or array parameter only a separator or the
    /// closing bracket may follow.
    fn after_param(
        &self,
        source: &str,
        end: &mut usize,
        level: &mut usize,
        after_comma: &mut bool,
    ) -> Result<State, SyntaxError> {
        while byte_at(source, *end) == Some(b' ') {
            *end += 1;
        }
        match byte_at(source, *end) {
            Some(b',') => {
                *end += 1;
                *after_comma = true;
                Ok(State::New)
            }
            Some(b']') if *level == 2 => {
                // The caller records the array span from State::New.
                Ok(State::New)
            }
            Some(b']') => {
                *end += 1;
                Ok(State::End)
            }
            _ => Err(SyntaxError::incorrect(*end)),
        }
    }
}

/// Quoted key parameter: only `\"` is an escape, a lone backslash is a
/// literal character.
fn scan_quoted(source: &str, pos: usize) -> Option<usize> {
    let mut len = 1;
    loop {
        match byte_at(source, pos + len)? {
            b'\\' if byte_at(source, pos + len + 1) == Some(b'"') => len += 2,
            b'"' => return Some(len + 1),
            _ => {
                let c = source[pos + len..].chars().next()?;
                len += c.len_utf8();
            }
        }
    }
}
