//! Path templates for renaming catalog files
//!
//! A template is literal text interspersed with `%x` tokens:
//!
//! | Token | Field         |
//! |-------|---------------|
//! | `%a`  | artist        |
//! | `%b`  | album         |
//! | `%t`  | title         |
//! | `%n`  | track number  |
//! | `%N`  | total tracks  |
//! | `%d`  | disc number   |
//! | `%D`  | total discs   |
//! | `%p`  | publisher     |
//! | `%g`  | genre         |
//! | `%y`  | year          |
//!
//! Only the character right after each `%` is interpreted; whatever follows
//! it up to the next `%` is literal, so `%abcd` renders the artist followed
//! by `bcd`. There is no escape for a literal `%`.
//!
//! Rendered text is joined onto the record's base path as is. Tag values are
//! not sanitized, so a leading `/` or a `..` segment can point `render`
//! outside the base path; `render_within` refuses such destinations.

use crate::models::TagRecord;
use af_common::{Error, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Marker introducing a token
const TOKEN_MARKER: char = '%';

/// Template token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Artist,
    Album,
    Title,
    TrackNum,
    TotalTracks,
    DiscNum,
    TotalDiscs,
    Publisher,
    Genre,
    Year,
}

impl Token {
    pub const ALL: [Token; 10] = [
        Token::Artist,
        Token::Album,
        Token::Title,
        Token::TrackNum,
        Token::TotalTracks,
        Token::DiscNum,
        Token::TotalDiscs,
        Token::Publisher,
        Token::Genre,
        Token::Year,
    ];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'a' => Some(Token::Artist),
            'b' => Some(Token::Album),
            't' => Some(Token::Title),
            'n' => Some(Token::TrackNum),
            'N' => Some(Token::TotalTracks),
            'd' => Some(Token::DiscNum),
            'D' => Some(Token::TotalDiscs),
            'p' => Some(Token::Publisher),
            'g' => Some(Token::Genre),
            'y' => Some(Token::Year),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Token::Artist => 'a',
            Token::Album => 'b',
            Token::Title => 't',
            Token::TrackNum => 'n',
            Token::TotalTracks => 'N',
            Token::DiscNum => 'd',
            Token::TotalDiscs => 'D',
            Token::Publisher => 'p',
            Token::Genre => 'g',
            Token::Year => 'y',
        }
    }

    /// Substitution text for this token; absent values render empty
    pub fn value(self, record: &TagRecord) -> String {
        let number = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_default();
        match self {
            Token::Artist => record.artist.clone(),
            Token::Album => record.album.clone(),
            Token::Title => record.title.clone(),
            Token::TrackNum => number(record.track_num),
            Token::TotalTracks => number(record.total_tracks),
            Token::DiscNum => number(record.disc_num),
            Token::TotalDiscs => number(record.total_discs),
            Token::Publisher => record.publisher.clone(),
            Token::Genre => record.genre.clone(),
            Token::Year => record.year.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(Token),
}

/// Compiled path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    pattern: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse and validate a template
    ///
    /// # Errors
    /// `Error::InvalidPattern` when a `%` is followed by an unknown character
    /// or ends the pattern.
    pub fn compile(pattern: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.char_indices();

        while let Some((pos, c)) = chars.next() {
            if c != TOKEN_MARKER {
                literal.push(c);
                continue;
            }

            let token = match chars.next() {
                Some((_, letter)) => Token::from_char(letter).ok_or_else(|| {
                    Error::InvalidPattern(format!(
                        "unknown token '%{}' at position {} in \"{}\"",
                        letter, pos, pattern
                    ))
                })?,
                None => {
                    return Err(Error::InvalidPattern(format!(
                        "dangling '%' at end of \"{}\"",
                        pattern
                    )))
                }
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Token(token));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Render the template without the base path
    pub fn render_relative(&self, record: &TagRecord) -> String {
        let mut rendered = String::with_capacity(self.pattern.len() * 2);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Token(token) => rendered.push_str(&token.value(record)),
            }
        }
        rendered
    }

    /// Destination path: the rendered template joined onto the record's base path
    pub fn render(&self, record: &TagRecord) -> PathBuf {
        Path::new(&record.base_path).join(self.render_relative(record))
    }

    /// Like `render`, but the destination must stay under the base path
    ///
    /// # Errors
    /// `Error::InvalidPattern` when the rendered text is absolute or contains
    /// a `..` segment.
    pub fn render_within(&self, record: &TagRecord) -> Result<PathBuf> {
        let relative = self.render_relative(record);
        let escapes = Path::new(&relative).components().any(|component| {
            matches!(
                component,
                Component::RootDir | Component::Prefix(_) | Component::ParentDir
            )
        });

        if escapes {
            return Err(Error::InvalidPattern(format!(
                "\"{}\" renders {:?}, outside base path {:?}",
                self.pattern, relative, record.base_path
            )));
        }
        Ok(Path::new(&record.base_path).join(relative))
    }
}

impl FromStr for PathTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// True when every `%` in the pattern is followed by a known token letter
pub fn validate(pattern: &str) -> bool {
    PathTemplate::compile(pattern).is_ok()
}

/// Compile `pattern` and render it for `record` in one step
pub fn render(record: &TagRecord, pattern: &str) -> Result<PathBuf> {
    Ok(PathTemplate::compile(pattern)?.render(record))
}
