//! LDAP-style record filters.
//!
//! Grammar:
//!
//! ```text
//! filter  = "(" ( "&" filter+ | "|" filter+ | "!" filter | item ) ")"
//! item    = key ( "=" | "~=" | ">=" | "<=" ) value
//! ```
//!
//! In `=` values an unescaped `*` is a wildcard; `(key=*)` tests presence.
//! `\` escapes the next character.

use crate::{ConfigRecord, ConfigStoreError};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equal { key: String, value: String },
    Approx { key: String, value: String },
    GreaterEq { key: String, value: String },
    LessEq { key: String, value: String },
    Present(String),
    Substring { key: String, parts: Vec<String> },
}

impl Filter {
    pub fn equal(key: &str, value: &str) -> Self {
        Filter::Equal {
            key: key.to_owned(),
            value: value.to_owned(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, ConfigStoreError> {
        let mut parser = Parser {
            chars: input.chars().collect(),
            pos: 0,
        };
        parser
            .parse_root()
            .map_err(|reason| ConfigStoreError::MalformedFilter {
                filter: input.to_owned(),
                reason,
            })
    }

    pub fn matches(&self, record: &ConfigRecord) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(record)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(record)),
            Filter::Not(inner) => !inner.matches(record),
            Filter::Equal { key, value } => record.property(key) == Some(value.as_str()),
            Filter::Approx { key, value } => record
                .property(key)
                .is_some_and(|actual| normalize(actual) == normalize(value)),
            Filter::GreaterEq { key, value } => record
                .property(key)
                .is_some_and(|actual| compare(actual, value).is_ge()),
            Filter::LessEq { key, value } => record
                .property(key)
                .is_some_and(|actual| compare(actual, value).is_le()),
            Filter::Present(key) => record.property(key).is_some(),
            Filter::Substring { key, parts } => record
                .property(key)
                .is_some_and(|actual| substring_match(actual, parts)),
        }
    }
}

impl FromStr for Filter {
    type Err = ConfigStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) => write_composite(f, '&', filters),
            Filter::Or(filters) => write_composite(f, '|', filters),
            Filter::Not(inner) => write!(f, "(!{inner})"),
            Filter::Equal { key, value } => write!(f, "({key}={})", escape(value)),
            Filter::Approx { key, value } => write!(f, "({key}~={})", escape(value)),
            Filter::GreaterEq { key, value } => write!(f, "({key}>={})", escape(value)),
            Filter::LessEq { key, value } => write!(f, "({key}<={})", escape(value)),
            Filter::Present(key) => write!(f, "({key}=*)"),
            Filter::Substring { key, parts } => {
                let value = parts.iter().map(String::as_str).map(escape).collect::<Vec<_>>();
                write!(f, "({key}={})", value.join("*"))
            }
        }
    }
}

fn write_composite(f: &mut fmt::Formatter<'_>, op: char, filters: &[Filter]) -> fmt::Result {
    write!(f, "({op}")?;
    for filter in filters {
        write!(f, "{filter}")?;
    }
    write!(f, ")")
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Numeric comparison when both sides parse as integers, lexical otherwise.
fn compare(actual: &str, expected: &str) -> std::cmp::Ordering {
    match (actual.trim().parse::<i64>(), expected.trim().parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => actual.cmp(expected),
    }
}

fn substring_match(actual: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return false;
    };
    let Some(mut remaining) = actual.strip_prefix(first.as_str()) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

fn push_char(parts: &mut [String], c: char) {
    if let Some(last) = parts.last_mut() {
        last.push(c);
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

#[derive(Clone, Copy)]
enum Op {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

impl Parser {
    fn parse_root(&mut self) -> Result<Filter, String> {
        let filter = self.parse_filter()?;
        self.skip_ws();
        if self.pos != self.chars.len() {
            return Err(format!("unexpected trailing input at offset {}", self.pos));
        }
        Ok(filter)
    }

    fn parse_filter(&mut self) -> Result<Filter, String> {
        self.skip_ws();
        self.expect('(')?;
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.parse_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.parse_list()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.parse_filter()?))
            }
            Some(_) => self.parse_item()?,
            None => return Err("unexpected end of filter".to_owned()),
        };
        self.skip_ws();
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> Result<Vec<Filter>, String> {
        let mut filters = Vec::new();
        self.skip_ws();
        while self.peek() == Some('(') {
            filters.push(self.parse_filter()?);
            self.skip_ws();
        }
        if filters.is_empty() {
            return Err(format!("empty composite at offset {}", self.pos));
        }
        Ok(filters)
    }

    fn parse_item(&mut self) -> Result<Filter, String> {
        let start = self.pos;
        let op = loop {
            match self.peek() {
                Some('=') => {
                    self.pos += 1;
                    break Op::Equal;
                }
                Some(c @ ('~' | '>' | '<')) => {
                    self.pos += 1;
                    self.expect('=')?;
                    break match c {
                        '~' => Op::Approx,
                        '>' => Op::GreaterEq,
                        _ => Op::LessEq,
                    };
                }
                Some('(' | ')') | None => {
                    return Err(format!("missing operator at offset {}", self.pos));
                }
                Some(_) => self.pos += 1,
            }
        };
        let key_end = self.pos - if matches!(op, Op::Equal) { 1 } else { 2 };
        let key: String = self.chars[start..key_end].iter().collect();
        let key = key.trim().to_owned();
        if key.is_empty() {
            return Err(format!("empty attribute at offset {start}"));
        }

        let parts = self.parse_value()?;
        match op {
            Op::Equal => Ok(match parts.as_slice() {
                [value] => Filter::Equal {
                    key,
                    value: value.clone(),
                },
                [a, b] if a.is_empty() && b.is_empty() => Filter::Present(key),
                _ => Filter::Substring { key, parts },
            }),
            _ => {
                let [value] = <[String; 1]>::try_from(parts)
                    .map_err(|_| format!("wildcard not allowed for '{key}'"))?;
                Ok(match op {
                    Op::Approx => Filter::Approx { key, value },
                    Op::GreaterEq => Filter::GreaterEq { key, value },
                    _ => Filter::LessEq { key, value },
                })
            }
        }
    }

    /// Reads up to the closing `)`, splitting on unescaped `*`.
    fn parse_value(&mut self) -> Result<Vec<String>, String> {
        let mut parts = vec![String::new()];
        loop {
            match self.peek() {
                Some(')') => return Ok(parts),
                Some('(') => return Err(format!("unescaped '(' at offset {}", self.pos)),
                Some('\\') => {
                    self.pos += 1;
                    let c = self
                        .peek()
                        .ok_or_else(|| "dangling escape at end of filter".to_owned())?;
                    push_char(&mut parts, c);
                    self.pos += 1;
                }
                Some('*') => {
                    parts.push(String::new());
                    self.pos += 1;
                }
                Some(c) => {
                    push_char(&mut parts, c);
                    self.pos += 1;
                }
                None => return Err("unexpected end of filter, expected ')'".to_owned()),
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        match self.peek() {
            Some(found) if found == c => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(format!(
                "expected '{c}' at offset {}, found '{found}'",
                self.pos
            )),
            None => Err(format!("expected '{c}' at end of filter")),
        }
    }
}
