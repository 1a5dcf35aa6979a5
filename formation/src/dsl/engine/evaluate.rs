use log::trace;
use nom::bytes::complete::tag;
use nom::character::complete::{anychar, satisfy};
use nom::error::ErrorKind;

use super::{Captures, Expr, Grammar, IResult, ParserError, RuleId, Span, Value};
use crate::dsl::errors::{Anchor, Error};
use crate::dsl::Result;

type Matched<'a, N> = IResult<'a, Span<'a>, Vec<Value<N>>>;

#[derive(Clone, Debug)]
struct Frame<'a> {
    name: &'static str,
    start: Span<'a>,
}

///
/// Interprets a [`Grammar`] over one input. A matcher is single use: it owns the
/// per-parse state (rule stack, capture scopes, furthest failure) while the
/// grammar it borrows stays shared and read-only.
///
pub(crate) struct Matcher<'g, 'a, N> {
    grammar: &'g Grammar<N>,
    frames: Vec<Frame<'a>>,
    scopes: Vec<Captures<N>>,
    lookahead: usize,
    furthest: Option<ParserError<'a>>,
    rejection: Option<Error>,
}

impl<'g, 'a, N: Clone> Matcher<'g, 'a, N> {
    pub(crate) fn new(grammar: &'g Grammar<N>) -> Self {
        Matcher {
            grammar,
            frames: vec![],
            scopes: vec![Captures::default()],
            lookahead: 0,
            furthest: None,
            rejection: None,
        }
    }

    pub(crate) fn parse(self, input: Span<'a>) -> Result<Vec<N>> {
        let start = self.grammar.start();
        self.parse_rule(start, input)
    }

    ///
    /// Matches `id` against the whole of `input`. Anything left unconsumed is a
    /// syntax error; the reported error is the committed failure if one was hit,
    /// otherwise the furthest failure seen while matching.
    ///
    pub(crate) fn parse_rule(mut self, id: RuleId, input: Span<'a>) -> Result<Vec<N>> {
        trace!(
            "Matching rule {} against {} bytes from {:?}",
            self.grammar.rule(id).name,
            input.fragment().len(),
            input.extra
        );
        let outcome = self.eval(&Expr::Rule(id), input);
        if let Some(rejected) = self.rejection.take() {
            return Err(rejected);
        }
        match outcome {
            Ok((rest, values)) if rest.fragment().is_empty() => Ok(values
                .into_iter()
                .filter_map(|value| match value {
                    Value::Node(node) => Some(node),
                    Value::Text(_) => None,
                })
                .collect()),
            Ok((rest, _)) => {
                let err = self.record(rest, ErrorKind::Eof, "end of input".to_string());
                Err(Error::from(nom::Err::Error(self.furthest_or(err))))
            }
            Err(nom::Err::Error(e)) => Err(Error::from(nom::Err::Error(self.furthest_or(e)))),
            Err(failure) => Err(Error::from(failure)),
        }
    }

    fn furthest_or(&mut self, err: ParserError<'a>) -> ParserError<'a> {
        match self.furthest.take() {
            Some(furthest) => furthest.furthest(err),
            None => err,
        }
    }

    fn scope(&self) -> &Captures<N> {
        // the root scope is never popped
        &self.scopes[self.scopes.len() - 1]
    }

    fn scope_mut(&mut self) -> &mut Captures<N> {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn context(&self) -> String {
        self.frames
            .iter()
            .map(|frame| frame.name)
            .collect::<Vec<&str>>()
            .join("/")
    }

    fn record(&mut self, input: Span<'a>, kind: ErrorKind, expected: String) -> ParserError<'a> {
        let err = ParserError::new(input, kind, self.context(), expected);
        if self.lookahead == 0 {
            let furthest = match self.furthest.take() {
                Some(previous) => previous.furthest(err.clone()),
                None => err.clone(),
            };
            self.furthest = Some(furthest);
        }
        err
    }

    fn fail(&mut self, input: Span<'a>, kind: ErrorKind, expected: String) -> nom::Err<ParserError<'a>> {
        nom::Err::Error(self.record(input, kind, expected))
    }

    fn describe(&self, expr: &Expr) -> String {
        match expr {
            Expr::Rule(id) => self.grammar.rule(*id).name.to_string(),
            Expr::Not(inner) => format!("not {}", self.describe(inner)),
            Expr::Choice(items) => items
                .iter()
                .map(|item| self.describe(item))
                .collect::<Vec<String>>()
                .join(" or "),
            other => other.describe(),
        }
    }

    fn anchor(&self, mut err: ParserError<'a>) -> ParserError<'a> {
        if err.anchor.is_none() {
            if let Some(frame) = self.frames.last() {
                err.anchor = Some(Anchor {
                    rule: frame.name.to_string(),
                    line: frame.start.location_line(),
                    column: frame.start.get_utf8_column(),
                });
            }
        }
        err
    }

    fn eval(&mut self, expr: &Expr, input: Span<'a>) -> Matched<'a, N> {
        let mark = self.scope().mark();
        let result = self.eval_expr(expr, input);
        if result.is_err() {
            self.scope_mut().reset(mark);
        }
        result
    }

    fn eval_expr(&mut self, expr: &Expr, input: Span<'a>) -> Matched<'a, N> {
        match expr {
            Expr::Literal(text) => match tag::<_, _, ParserError<'a>>(*text)(input) {
                Ok((rest, matched)) => Ok((rest, vec![Value::Text(matched.fragment().to_string())])),
                Err(_) => Err(self.fail(input, ErrorKind::Tag, expr.describe())),
            },

            Expr::OneOf(class) => {
                match satisfy::<_, _, ParserError<'a>>(|ch| class.contains(ch))(input) {
                    Ok((rest, ch)) => Ok((rest, vec![Value::Text(ch.to_string())])),
                    Err(_) => Err(self.fail(input, ErrorKind::OneOf, expr.describe())),
                }
            }

            Expr::Wildcard => match anychar::<_, ParserError<'a>>(input) {
                Ok((rest, ch)) => Ok((rest, vec![Value::Text(ch.to_string())])),
                Err(_) => Err(self.fail(input, ErrorKind::Eof, expr.describe())),
            },

            Expr::Sequence(items) => self.sequence(items, input),

            Expr::Choice(items) => self.choice(items, input),

            Expr::Many(inner) => self.repeat(inner, input, 1),

            Expr::ManyOrNone(inner) => self.repeat(inner, input, 0),

            Expr::Optional(inner) => match self.eval(inner, input) {
                Err(nom::Err::Error(_)) => Ok((input, vec![])),
                other => other,
            },

            Expr::Not(inner) => {
                let mark = self.scope().mark();
                self.lookahead += 1;
                let result = self.eval(inner, input);
                self.lookahead -= 1;
                self.scope_mut().reset(mark);
                match result {
                    Ok(_) => {
                        let expected = self.describe(expr);
                        Err(self.fail(input, ErrorKind::Not, expected))
                    }
                    Err(_) => {
                        // whatever happened inside the lookahead stays there
                        self.rejection = None;
                        Ok((input, vec![]))
                    }
                }
            }

            // only meaningful as an element of a sequence
            Expr::Commit => Ok((input, vec![])),

            Expr::Ignore(inner) => {
                let (rest, _) = self.eval(inner, input)?;
                Ok((rest, vec![]))
            }

            Expr::Capture(name, inner) => {
                let (rest, values) = self.eval(inner, input)?;
                for value in &values {
                    self.scope_mut().bind(name, value.clone());
                }
                Ok((rest, values))
            }

            Expr::Rule(id) => self.rule(*id, input),
        }
    }

    //
    // Elements are matched in order. Once a commit has been crossed a recoverable
    // failure of a later element becomes a committed one, anchored at the rule the
    // sequence belongs to.
    //
    fn sequence(&mut self, items: &[Expr], input: Span<'a>) -> Matched<'a, N> {
        let mut rest = input;
        let mut values = vec![];
        let mut committed = false;
        for item in items {
            if let Expr::Commit = item {
                committed = true;
                continue;
            }
            match self.eval(item, rest) {
                Ok((next, mut matched)) => {
                    rest = next;
                    values.append(&mut matched);
                }
                Err(nom::Err::Error(e)) if committed => {
                    return Err(nom::Err::Failure(self.anchor(e)));
                }
                Err(e) => return Err(e),
            }
        }
        Ok((rest, values))
    }

    fn choice(&mut self, items: &[Expr], input: Span<'a>) -> Matched<'a, N> {
        let mut error: Option<ParserError<'a>> = None;
        for item in items {
            match self.eval(item, input) {
                Err(nom::Err::Error(e)) => {
                    error = Some(match error {
                        Some(previous) => previous.furthest(e),
                        None => e,
                    });
                }
                other => return other,
            }
        }
        let err = match error {
            Some(err) => err,
            None => ParserError::new(input, ErrorKind::Alt, self.context(), "an alternative".to_string()),
        };
        Err(nom::Err::Error(err))
    }

    fn repeat(&mut self, inner: &Expr, input: Span<'a>, min: usize) -> Matched<'a, N> {
        let mut rest = input;
        let mut values = vec![];
        let mut count = 0;
        loop {
            match self.eval(inner, rest) {
                Ok((next, mut matched)) => {
                    let progressed = next.location_offset() > rest.location_offset();
                    rest = next;
                    values.append(&mut matched);
                    count += 1;
                    if !progressed {
                        break;
                    }
                }
                Err(nom::Err::Error(e)) => {
                    if count < min {
                        return Err(nom::Err::Error(e));
                    }
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok((rest, values))
    }

    fn rule(&mut self, id: RuleId, input: Span<'a>) -> Matched<'a, N> {
        let grammar = self.grammar;
        let rule = grammar.rule(id);
        self.frames.push(Frame {
            name: rule.name,
            start: input,
        });
        if rule.action.is_some() {
            self.scopes.push(Captures::default());
        }
        let result = self.eval(&rule.body, input);
        let captures = if rule.action.is_some() {
            self.scopes.pop()
        } else {
            None
        };
        self.frames.pop();
        let (rest, values) = result?;

        match (&rule.action, captures) {
            (Some(action), Some(captures)) => match action(&captures) {
                Ok(nodes) => Ok((rest, nodes.into_iter().map(Value::Node).collect())),
                Err(e) => {
                    trace!(
                        "Rule {} rejected match at line {}: {}",
                        rule.name,
                        input.location_line(),
                        e
                    );
                    self.rejection = Some(e);
                    Err(nom::Err::Failure(ParserError::new(
                        input,
                        ErrorKind::Verify,
                        rule.name.to_string(),
                        format!("a valid {}", rule.name),
                    )))
                }
            },
            _ => Ok((rest, values)),
        }
    }
}
