//! Compiles path templates into anchored, case-insensitive regular expressions.
//!
//! Supported syntax:
//!
//! | template            | matches                                         |
//! |---------------------|-------------------------------------------------|
//! | `/users/:id`        | one segment, captured as `id`                   |
//! | `/files/:name(\d+)` | a segment matching the custom pattern           |
//! | `/:lang?/about`     | an optional segment                             |
//! | `/assets/:path+`    | one or more segments, captured together         |
//! | `/docs/:path*`      | zero or more segments                           |
//! | `/calc/(.*)`        | an unnamed group, captured by position          |
//! | `/file.:ext`        | a parameter delimited by `.` instead of `/`     |
//!
//! A `\` escapes the next character. A trailing `/` in the template is optional in the path.

use super::PathParams;
use crate::error::PathError;
use regex::Regex;
use std::fmt;

/// How a captured value is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKey {
    Named(String),
    Positional(usize),
}

#[derive(Debug, Clone)]
struct Slot {
    key: ParamKey,
    group: String,
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    source: String,
    regex: Regex,
    slots: Vec<Slot>,
}

impl PathTemplate {
    pub fn compile(template: &str) -> Result<Self, PathError> {
        let (pattern, slots) = Compiler::new(template).compile()?;
        let regex = Regex::new(&pattern)
            .map_err(|source| PathError::InvalidPattern { template: template.to_owned(), source })?;
        Ok(Self { source: template.to_owned(), regex, slots })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Keys of every parameter in template order.
    pub fn keys(&self) -> impl Iterator<Item = &ParamKey> {
        self.slots.iter().map(|slot| &slot.key)
    }

    /// Names of the named parameters in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.keys().filter_map(|key| match key {
            ParamKey::Named(name) => Some(name.as_str()),
            ParamKey::Positional(_) => None,
        })
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` and returns the captured parameters. Optional parameters that did
    /// not participate in the match are left out.
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let captures = self.regex.captures(path)?;
        let mut params = PathParams::empty();
        for slot in &self.slots {
            let Some(value) = captures.name(&slot.group) else {
                continue;
            };
            match &slot.key {
                ParamKey::Named(name) => params.insert(name.clone(), value.as_str().to_owned()),
                ParamKey::Positional(_) => params.push_positional(value.as_str().to_owned()),
            }
        }
        Some(params)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Compiler<'a> {
    template: &'a str,
    chars: Vec<char>,
    pos: usize,
    pattern: String,
    literal: String,
    slots: Vec<Slot>,
    positional: usize,
}

impl<'a> Compiler<'a> {
    fn new(template: &'a str) -> Self {
        Self {
            template,
            chars: template.chars().collect(),
            pos: 0,
            pattern: String::from("(?i)^"),
            literal: String::new(),
            slots: Vec::new(),
            positional: 0,
        }
    }

    fn compile(mut self) -> Result<(String, Vec<Slot>), PathError> {
        while let Some(c) = self.peek(0) {
            match c {
                '\\' => {
                    self.pos += 1;
                    let escaped = self.peek(0).unwrap_or('\\');
                    self.pos += 1;
                    self.literal.push(escaped);
                }
                ':' if self.peek(1).is_some_and(is_name_char) => {
                    self.pos += 1;
                    let name = self.take_name();
                    let custom = self.take_group()?;
                    self.push_param(ParamKey::Named(name), custom);
                }
                '(' => {
                    let custom = self.take_group()?;
                    let key = ParamKey::Positional(self.positional);
                    self.positional += 1;
                    self.push_param(key, custom);
                }
                _ => {
                    self.literal.push(c);
                    self.pos += 1;
                }
            }
        }

        if self.literal.ends_with('/') {
            self.literal.pop();
        }
        self.flush_literal();
        self.pattern.push_str("/?$");
        Ok((self.pattern, self.slots))
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn take_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek(0).filter(|c| is_name_char(*c)) {
            name.push(c);
            self.pos += 1;
        }
        name
    }

    /// Reads a parenthesized pattern if one starts at the cursor.
    fn take_group(&mut self) -> Result<Option<String>, PathError> {
        if self.peek(0) != Some('(') {
            return Ok(None);
        }
        let start = self.pos;
        let mut depth = 0_usize;
        let mut group = String::new();
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            match c {
                '\\' => {
                    group.push(c);
                    if let Some(escaped) = self.peek(0) {
                        group.push(escaped);
                        self.pos += 1;
                    }
                    continue;
                }
                '(' => {
                    depth += 1;
                    if depth == 1 {
                        continue;
                    }
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        if group.is_empty() {
                            return Err(PathError::EmptyGroup { template: self.template.to_owned(), position: start });
                        }
                        return Ok(Some(group));
                    }
                }
                _ => {}
            }
            group.push(c);
        }
        Err(PathError::UnbalancedGroup { template: self.template.to_owned(), position: start })
    }

    fn push_param(&mut self, key: ParamKey, custom: Option<String>) {
        let modifier = match self.peek(0) {
            Some(m @ ('?' | '*' | '+')) => {
                self.pos += 1;
                Some(m)
            }
            _ => None,
        };

        let prefix = match self.literal.chars().last() {
            Some(c @ ('/' | '.')) => {
                self.literal.pop();
                Some(c)
            }
            _ => None,
        };
        self.flush_literal();

        let delimiter = prefix.unwrap_or('/');
        let inner = custom.unwrap_or_else(|| format!("[^{}]+?", regex::escape(&delimiter.to_string())));
        let prefix = prefix.map(|c| regex::escape(&c.to_string())).unwrap_or_default();
        let group = format!("p{}", self.slots.len());

        let fragment = match modifier {
            Some('?') => format!("(?:{prefix}(?P<{group}>{inner}))?"),
            Some('+') => format!("{prefix}(?P<{group}>(?:{inner})(?:{prefix}(?:{inner}))*)"),
            Some('*') => format!("(?:{prefix}(?P<{group}>(?:{inner})(?:{prefix}(?:{inner}))*))?"),
            _ => format!("{prefix}(?P<{group}>{inner})"),
        };
        self.pattern.push_str(&fragment);
        self.slots.push(Slot { key, group });
    }

    fn flush_literal(&mut self) {
        self.pattern.push_str(&regex::escape(&self.literal));
        self.literal.clear();
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
