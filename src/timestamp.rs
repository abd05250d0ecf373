//! Moment-style date patterns (`YYYY-MM-DD HH:mm:ss`).
//!
//! A pattern is parsed once into tokens, then rendered through chrono for the
//! completion marker text and turned into a regex fragment so existing markers
//! can be recognized in the document.

use chrono::{DateTime, Local, TimeZone};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Year4,
    Year2,
    MonthLong,
    MonthShort,
    Month2,
    Month1,
    WeekdayLong,
    WeekdayShort,
    Day2,
    Day1,
    Hour24Padded,
    Hour24,
    Hour12Padded,
    Hour12,
    Minute2,
    Minute1,
    Second2,
    Second1,
    MeridiemUpper,
    MeridiemLower,
}

// Longest tokens first so `YYYY` wins over `YY`, `MMMM` over `MM`, etc.
const TOKENS: &[(&str, Token)] = &[
    ("YYYY", Token::Year4),
    ("YY", Token::Year2),
    ("MMMM", Token::MonthLong),
    ("MMM", Token::MonthShort),
    ("MM", Token::Month2),
    ("M", Token::Month1),
    ("dddd", Token::WeekdayLong),
    ("ddd", Token::WeekdayShort),
    ("DD", Token::Day2),
    ("D", Token::Day1),
    ("HH", Token::Hour24Padded),
    ("H", Token::Hour24),
    ("hh", Token::Hour12Padded),
    ("h", Token::Hour12),
    ("mm", Token::Minute2),
    ("m", Token::Minute1),
    ("ss", Token::Second2),
    ("s", Token::Second1),
    ("A", Token::MeridiemUpper),
    ("a", Token::MeridiemLower),
];

#[derive(Debug, Clone)]
pub struct DatePattern {
    raw: String,
    tokens: Vec<Token>,
}

impl DatePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(Error::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "pattern is empty".to_string(),
            });
        }

        let mut tokens: Vec<Token> = Vec::new();
        let mut rest = pattern;

        'outer: while !rest.is_empty() {
            // [escaped text]
            if let Some(inner) = rest.strip_prefix('[') {
                let close = inner.find(']').ok_or_else(|| Error::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: "unclosed '['".to_string(),
                })?;
                push_literal(&mut tokens, &inner[..close]);
                rest = &inner[close + 1..];
                continue;
            }

            for (text, token) in TOKENS {
                if let Some(after) = rest.strip_prefix(text) {
                    tokens.push(token.clone());
                    rest = after;
                    continue 'outer;
                }
            }

            let ch = rest.chars().next().unwrap_or_default();
            push_literal(&mut tokens, &ch.to_string());
            rest = &rest[ch.len_utf8()..];
        }

        Ok(Self {
            raw: pattern.to_string(),
            tokens,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Render the current local time (`formatNow`).
    pub fn format_now(&self) -> String {
        self.format(&Local::now())
    }

    pub fn format<Tz: TimeZone>(&self, dt: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        dt.format(&self.strftime()).to_string()
    }

    /// Equivalent chrono strftime string.
    fn strftime(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            let spec = match token {
                Token::Literal(text) => {
                    out.push_str(&text.replace('%', "%%"));
                    continue;
                }
                Token::Year4 => "%Y",
                Token::Year2 => "%y",
                Token::MonthLong => "%B",
                Token::MonthShort => "%b",
                Token::Month2 => "%m",
                Token::Month1 => "%-m",
                Token::WeekdayLong => "%A",
                Token::WeekdayShort => "%a",
                Token::Day2 => "%d",
                Token::Day1 => "%-d",
                Token::Hour24Padded => "%H",
                Token::Hour24 => "%-H",
                Token::Hour12Padded => "%I",
                Token::Hour12 => "%-I",
                Token::Minute2 => "%M",
                Token::Minute1 => "%-M",
                Token::Second2 => "%S",
                Token::Second1 => "%-S",
                Token::MeridiemUpper => "%p",
                Token::MeridiemLower => "%P",
            };
            out.push_str(spec);
        }
        out
    }

    /// Regex fragment (no anchors, no groups) matching any rendering of the pattern.
    pub fn regex_fragment(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            let part = match token {
                Token::Literal(text) => regex::escape(text),
                Token::Year4 => r"\d{4}".to_string(),
                Token::Year2
                | Token::Month2
                | Token::Day2
                | Token::Hour24Padded
                | Token::Hour12Padded
                | Token::Minute2
                | Token::Second2 => r"\d{2}".to_string(),
                Token::Month1
                | Token::Day1
                | Token::Hour24
                | Token::Hour12
                | Token::Minute1
                | Token::Second1 => r"\d{1,2}".to_string(),
                Token::MonthLong
                | Token::MonthShort
                | Token::WeekdayLong
                | Token::WeekdayShort => r"\p{L}+".to_string(),
                Token::MeridiemUpper | Token::MeridiemLower => "(?i:am|pm)".to_string(),
            };
            out.push_str(&part);
        }
        out
    }
}

fn push_literal(tokens: &mut Vec<Token>, text: &str) {
    if let Some(Token::Literal(prev)) = tokens.last_mut() {
        prev.push_str(text);
    } else if !text.is_empty() {
        tokens.push(Token::Literal(text.to_string()));
    }
}
