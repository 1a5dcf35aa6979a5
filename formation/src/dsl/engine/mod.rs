//!
//! A small backtracking PEG engine. Grammars are an arena of named rules that refer
//! to each other through stable [`RuleId`]s; expressions are plain data and are
//! interpreted by [`evaluate::Matcher`] over a [`Span`] cursor. Primitive matches
//! delegate to nom, and recoverable vs. committed failures map onto
//! `nom::Err::Error` and `nom::Err::Failure`.
//!

use std::fmt::Formatter;
use std::ops::RangeInclusive;

use indexmap::IndexMap;
use nom::error::ErrorKind;
use nom_locate::LocatedSpan;

use crate::dsl::errors::Anchor;
use crate::dsl::Result;

pub(crate) mod evaluate;

pub(crate) type Span<'a> = LocatedSpan<&'a str, &'a str>;

pub(crate) type IResult<'a, I, O> = nom::IResult<I, O, ParserError<'a>>;

#[cfg(test)]
pub(crate) fn from_str2(in_str: &str) -> Span {
    Span::new_extra(in_str, "")
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                          Parser errors                                                         //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, PartialEq, Debug)]
pub(crate) struct ParserError<'a> {
    pub(crate) context: String,
    pub(crate) span: Span<'a>,
    pub(crate) kind: ErrorKind,
    pub(crate) expected: Vec<String>,
    pub(crate) anchor: Option<Anchor>,
}

impl<'a> ParserError<'a> {
    pub(crate) fn new(span: Span<'a>, kind: ErrorKind, context: String, expected: String) -> Self {
        ParserError {
            context,
            span,
            kind,
            expected: vec![expected],
            anchor: None,
        }
    }

    pub(crate) fn offset(&self) -> usize {
        self.span.location_offset()
    }

    //
    // Furthest failure wins. Failures at the same offset merge what they expected
    // so that a choice reports every alternative it tried there.
    //
    pub(crate) fn furthest(self, other: Self) -> Self {
        if other.offset() > self.offset() {
            return other;
        }
        if other.offset() < self.offset() {
            return self;
        }
        let mut merged = self;
        for each in other.expected {
            if !merged.expected.contains(&each) {
                merged.expected.push(each);
            }
        }
        merged
    }
}

impl<'a> nom::error::ParseError<Span<'a>> for ParserError<'a> {
    fn from_error_kind(input: Span<'a>, kind: ErrorKind) -> Self {
        ParserError {
            context: "".to_string(),
            span: input,
            kind,
            expected: vec![],
            anchor: None,
        }
    }

    fn append(_input: Span<'a>, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(self, other: Self) -> Self {
        self.furthest(other)
    }
}

impl<'a> std::fmt::Display for ParserError<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Error parsing file {} at line {} at column {}, when handling {}, expected {}",
            self.span.extra,
            self.span.location_line(),
            self.span.get_utf8_column(),
            self.context,
            self.expected.join(" or ")
        )
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                          Expressions and rules                                                 //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

///
/// A set of characters matched by a single `one_of`. Either an explicit list of
/// characters, inclusive ranges, or both.
///
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CharClass {
    pub(crate) label: &'static str,
    pub(crate) chars: &'static str,
    pub(crate) ranges: &'static [RangeInclusive<char>],
}

impl CharClass {
    pub(crate) fn contains(&self, ch: char) -> bool {
        self.chars.contains(ch) || self.ranges.iter().any(|r| r.contains(&ch))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RuleId(usize);

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Expr {
    Literal(&'static str),
    OneOf(CharClass),
    Wildcard,
    Sequence(Vec<Expr>),
    Choice(Vec<Expr>),
    Many(Box<Expr>),
    ManyOrNone(Box<Expr>),
    Optional(Box<Expr>),
    Not(Box<Expr>),
    Commit,
    Ignore(Box<Expr>),
    Capture(&'static str, Box<Expr>),
    Rule(RuleId),
}

impl From<RuleId> for Expr {
    fn from(id: RuleId) -> Self {
        Expr::Rule(id)
    }
}

impl Expr {
    pub(crate) fn describe(&self) -> String {
        match self {
            Expr::Literal(text) => format!("{:?}", text),
            Expr::OneOf(class) => class.label.to_string(),
            Expr::Wildcard => "any character".to_string(),
            Expr::Not(inner) => format!("not {}", inner.describe()),
            Expr::Commit => "commit".to_string(),
            Expr::Sequence(_) => "sequence".to_string(),
            Expr::Choice(_) => "choice".to_string(),
            Expr::Many(inner) | Expr::ManyOrNone(inner) | Expr::Optional(inner) => {
                inner.describe()
            }
            Expr::Ignore(inner) | Expr::Capture(_, inner) => inner.describe(),
            Expr::Rule(id) => format!("rule#{}", id.0),
        }
    }
}

pub(crate) fn literal(text: &'static str) -> Expr {
    Expr::Literal(text)
}

pub(crate) fn one_of(class: CharClass) -> Expr {
    Expr::OneOf(class)
}

pub(crate) fn wildcard() -> Expr {
    Expr::Wildcard
}

pub(crate) fn sequence(items: Vec<Expr>) -> Expr {
    Expr::Sequence(items)
}

pub(crate) fn choice(items: Vec<Expr>) -> Expr {
    Expr::Choice(items)
}

pub(crate) fn many<E: Into<Expr>>(expr: E) -> Expr {
    Expr::Many(Box::new(expr.into()))
}

pub(crate) fn many_or_none<E: Into<Expr>>(expr: E) -> Expr {
    Expr::ManyOrNone(Box::new(expr.into()))
}

pub(crate) fn optional<E: Into<Expr>>(expr: E) -> Expr {
    Expr::Optional(Box::new(expr.into()))
}

pub(crate) fn not<E: Into<Expr>>(expr: E) -> Expr {
    Expr::Not(Box::new(expr.into()))
}

pub(crate) fn commit() -> Expr {
    Expr::Commit
}

pub(crate) fn ignore<E: Into<Expr>>(expr: E) -> Expr {
    Expr::Ignore(Box::new(expr.into()))
}

pub(crate) fn capture<E: Into<Expr>>(name: &'static str, expr: E) -> Expr {
    Expr::Capture(name, Box::new(expr.into()))
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                                                                                //
//                          Captures and semantic actions                                         //
//                                                                                                //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Value<N> {
    Text(String),
    Node(N),
}

///
/// Named bindings of the rule currently being matched. Binding the same name
/// more than once appends, so a capture under a repetition collects every match
/// in source order.
///
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Captures<N> {
    bindings: Vec<(&'static str, Value<N>)>,
}

impl<N> Default for Captures<N> {
    fn default() -> Self {
        Captures { bindings: vec![] }
    }
}

impl<N> Captures<N> {
    pub(crate) fn bind(&mut self, name: &'static str, value: Value<N>) {
        self.bindings.push((name, value));
    }

    pub(crate) fn mark(&self) -> usize {
        self.bindings.len()
    }

    pub(crate) fn reset(&mut self, mark: usize) {
        self.bindings.truncate(mark);
    }

    #[cfg(test)]
    pub(crate) fn is_bound(&self, name: &str) -> bool {
        self.bindings.iter().any(|(each, _)| *each == name)
    }

    pub(crate) fn values<'c>(&'c self, name: &'c str) -> impl Iterator<Item = &'c Value<N>> + 'c {
        self.bindings
            .iter()
            .filter(move |(each, _)| *each == name)
            .map(|(_, value)| value)
    }

    /// All matched text under `name`, concatenated.
    pub(crate) fn text(&self, name: &str) -> String {
        self.values(name)
            .filter_map(|value| match value {
                Value::Text(text) => Some(text.as_str()),
                Value::Node(_) => None,
            })
            .collect()
    }

    pub(crate) fn nodes<'c>(&'c self, name: &'c str) -> impl Iterator<Item = &'c N> + 'c {
        self.values(name).filter_map(|value| match value {
            Value::Node(node) => Some(node),
            Value::Text(_) => None,
        })
    }

    pub(crate) fn node<'c>(&'c self, name: &'c str) -> Option<&'c N> {
        self.nodes(name).next()
    }
}

pub(crate) type Action<N> = Box<dyn Fn(&Captures<N>) -> Result<Vec<N>> + Send + Sync>;

pub(crate) struct Rule<N> {
    pub(crate) name: &'static str,
    pub(crate) body: Expr,
    pub(crate) action: Option<Action<N>>,
}

impl<N> std::fmt::Debug for Rule<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("body", &self.body)
            .field("action", &self.action.is_some())
            .finish()
    }
}

///
/// Immutable rule table. Built once through a [`GrammarBuilder`] and only read
/// afterwards, so one instance can serve any number of parses.
///
#[derive(Debug)]
pub(crate) struct Grammar<N> {
    rules: Vec<Rule<N>>,
    index: IndexMap<&'static str, RuleId>,
    start: RuleId,
}

impl<N> Grammar<N> {
    pub(crate) fn rule(&self, id: RuleId) -> &Rule<N> {
        &self.rules[id.0]
    }

    #[cfg(test)]
    pub(crate) fn lookup(&self, name: &str) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    pub(crate) fn start(&self) -> RuleId {
        self.start
    }
}

pub(crate) struct GrammarBuilder<N> {
    rules: Vec<Rule<N>>,
    index: IndexMap<&'static str, RuleId>,
}

impl<N> Default for GrammarBuilder<N> {
    fn default() -> Self {
        GrammarBuilder {
            rules: vec![],
            index: IndexMap::new(),
        }
    }
}

impl<N: Clone + 'static> GrammarBuilder<N> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, name: &'static str, body: Expr, action: Option<Action<N>>) -> RuleId {
        let id = RuleId(self.rules.len());
        self.rules.push(Rule { name, body, action });
        self.index.insert(name, id);
        id
    }

    /// A rule without an action is transparent, its values flow to the caller.
    pub(crate) fn rule(&mut self, name: &'static str, body: Expr) -> RuleId {
        self.add(name, body, None)
    }

    pub(crate) fn rule_with<F>(&mut self, name: &'static str, body: Expr, action: F) -> RuleId
    where
        F: Fn(&Captures<N>) -> Result<Vec<N>> + Send + Sync + 'static,
    {
        self.add(name, body, Some(Box::new(action)))
    }

    ///
    /// One `element`, then zero or more `separator element` pairs. Separators are
    /// dropped and the constructor sees the element nodes in source order.
    ///
    pub(crate) fn listify(
        &mut self,
        name: &'static str,
        element: RuleId,
        separator: Expr,
        constructor: fn(Vec<N>) -> Result<N>,
    ) -> RuleId {
        let body = sequence(vec![
            capture("first", element),
            capture(
                "rest",
                many_or_none(sequence(vec![ignore(separator), element.into()])),
            ),
        ]);
        self.rule_with(name, body, move |captures| {
            let items = captures
                .nodes("first")
                .chain(captures.nodes("rest"))
                .cloned()
                .collect();
            Ok(vec![constructor(items)?])
        })
    }

    pub(crate) fn build(self, start: RuleId) -> Grammar<N> {
        Grammar {
            rules: self.rules,
            index: self.index,
            start,
        }
    }
}
