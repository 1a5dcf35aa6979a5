use std::fmt::Formatter;
use thiserror::Error;

use crate::dsl::engine::ParserError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error writing the parse tree as JSON {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Error writing YAML output {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Formatting error when writing {0}")]
    FormatError(#[from] std::fmt::Error),
    #[error("I/O error when reading {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parser Error when parsing {0}")]
    ParseError(SyntaxError),
    #[error("Invalid value `{0}`")]
    InvalidValue(String),
    #[error("Either a load balancer with pool definitions or box definitions must be present")]
    EmptyFormation,
    #[error(
        "Named sequence does not exist for {sequence}: names = {}, missing = {}",
        .names.join(", "),
        .missing.join(", ")
    )]
    MissingNamedSequence {
        sequence: String,
        names: Vec<String>,
        missing: Vec<String>,
    },
    #[error("Named sequences include each other in a cycle: {}", .chain.join(" -> "))]
    CyclicInclude { chain: Vec<String> },
    #[error("Named sequence `{0}` is declared more than once")]
    DuplicateNamedSequence(String),
    #[error("Bootstrap sequence for {0} still contains an include")]
    UnresolvedInclude(String),
    #[error("Types of captured values are incompatible `{0}`")]
    IncompatibleError(String),
    #[error("The path `{0}` does not exist")]
    FileNotFoundError(String),
    #[error("{0}")]
    IllegalArguments(String),
}

impl Error {
    /// Semantic errors are raised after the text was recognized structurally.
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            Error::EmptyFormation
                | Error::MissingNamedSequence { .. }
                | Error::CyclicInclude { .. }
                | Error::DuplicateNamedSequence(_)
                | Error::UnresolvedInclude(_)
                | Error::InvalidValue(_)
        )
    }
}

/// Where a commit was crossed before the failure that aborted the parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Anchor {
    pub rule: String,
    pub line: u32,
    pub column: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub source: String,
    pub line: u32,
    pub column: usize,
    pub context: String,
    pub expected: Vec<String>,
    pub found: String,
    pub committed: Option<Anchor>,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let source = if self.source.is_empty() {
            "<input>"
        } else {
            self.source.as_str()
        };
        write!(
            f,
            "{} at line {} at column {}, when handling {}, expected {}, found {}",
            source,
            self.line,
            self.column,
            self.context,
            self.expected.join(" or "),
            self.found
        )?;
        if let Some(anchor) = &self.committed {
            write!(
                f,
                " (inside {} starting at line {} column {})",
                anchor.rule, anchor.line, anchor.column
            )?;
        }
        Ok(())
    }
}

impl<'a> From<ParserError<'a>> for SyntaxError {
    fn from(err: ParserError<'a>) -> Self {
        let fragment = *err.span.fragment();
        let line = fragment.split(|c| c == '\n' || c == '\r').next().unwrap_or("");
        let found = if fragment.is_empty() {
            "end of input".to_string()
        } else if line.is_empty() {
            "end of line".to_string()
        } else {
            format!("`{line}`")
        };
        SyntaxError {
            source: err.span.extra.to_string(),
            line: err.span.location_line(),
            column: err.span.get_utf8_column(),
            context: err.context,
            expected: err.expected,
            found,
            committed: err.anchor,
        }
    }
}

impl<'a> From<nom::Err<ParserError<'a>>> for Error {
    fn from(err: nom::Err<ParserError<'a>>) -> Self {
        match err {
            nom::Err::Failure(e) | nom::Err::Error(e) => Error::ParseError(e.into()),
            nom::Err::Incomplete(_) => Error::ParseError(SyntaxError {
                source: String::new(),
                line: 0,
                column: 0,
                context: String::new(),
                expected: vec!["more input".to_string()],
                found: "end of input".to_string(),
                committed: None,
            }),
        }
    }
}
