//! nom grammar for the changelog DSL text syntax.
//!
//! ```text
//! document  := ws (node ws)* EOF
//! node      := ident [ '(' args ')' | bare-args ] [ '{' ws (node ws)* '}' ]
//! arg       := ident ':' literal | literal
//! literal   := """raw""" | "string" | 'string' | number | true | false | null | '[' literal, ... ']'
//! ws        := (whitespace | // comment | /* comment */ | ';')*
//! ```
//!
//! Bare (unparenthesised) arguments must start on the same line as the node
//! name, which is what lets `comment "text"` and `empty` sit on consecutive
//! lines without ambiguity.

use crate::parser::SyntaxError;
use crate::parser::ir::{Attributes, Node, Value};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_until, take_while1},
    character::complete::{char, digit1, multispace1, not_line_ending, satisfy, space0, space1},
    combinator::{cut, eof, map, map_res, not, opt, recognize, value, verify},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
};

/// A parsed argument before it is split into attributes and positionals.
#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Named(String, Value),
    Positional(Value),
}

/// Parse DSL source text into its top-level nodes.
pub fn parse_document(source: &str) -> Result<Vec<Node>, SyntaxError> {
    let grammar = Grammar::new(source);
    let result = delimited(ws, many0(terminated(|i| grammar.node(i), ws)), eof)(source);

    match result {
        Ok((_, nodes)) => Ok(nodes),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(SyntaxError {
            line: grammar.line_of(e.input),
            message: if e.code == ErrorKind::TooLarge {
                describe_out_of_range(e.input)
            } else {
                describe_unexpected(e.input)
            },
        }),
        Err(nom::Err::Incomplete(_)) => Err(SyntaxError {
            line: grammar.line_of(""),
            message: "unexpected end of input".to_string(),
        }),
    }
}

/// Holds the full source so nodes can record their line numbers.
struct Grammar<'s> {
    src: &'s str,
    /// Byte offset at which each line starts; always begins with 0.
    line_starts: Vec<usize>,
}

impl<'s> Grammar<'s> {
    fn new(src: &'s str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(src.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { src, line_starts }
    }

    /// 1-based line of the position where `rest` begins.
    fn line_of(&self, rest: &str) -> usize {
        let offset = self.src.len().saturating_sub(rest.len());
        self.line_starts.partition_point(|&start| start <= offset)
    }

    fn node(&self, input: &'s str) -> IResult<&'s str, Node> {
        let line = self.line_of(input);
        let (input, name) = identifier(input)?;
        let (input, args) = opt(alt((preceded(space0, paren_args), bare_args)))(input)?;
        let (input, children) = opt(preceded(space0, |i| self.block(i)))(input)?;

        let mut node = Node::new(name);
        node.line = line;
        node.children = children.unwrap_or_default();
        let mut attributes = Attributes::new();
        for arg in args.unwrap_or_default() {
            match arg {
                Arg::Named(key, val) => attributes.insert(key, val),
                Arg::Positional(val) => node.args.push(val),
            }
        }
        node.attributes = attributes;
        Ok((input, node))
    }

    fn block(&self, input: &'s str) -> IResult<&'s str, Vec<Node>> {
        preceded(
            pair(char('{'), ws),
            cut(terminated(
                many0(terminated(|i| self.node(i), ws)),
                char('}'),
            )),
        )(input)
    }
}

fn describe_unexpected(rest: &str) -> String {
    let snippet: String = rest
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .take(24)
        .collect();
    if snippet.is_empty() {
        "unexpected end of input".to_string()
    } else {
        format!("unexpected input near '{}'", snippet)
    }
}

fn describe_out_of_range(rest: &str) -> String {
    let literal: String = rest
        .chars()
        .enumerate()
        .take_while(|&(i, c)| c.is_ascii_digit() || (i == 0 && c == '-'))
        .map(|(_, c)| c)
        .collect();
    format!("integer literal '{}' is out of range", literal)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), not_line_ending))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

/// Whitespace, newlines, comments and `;` separators.
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((multispace1, line_comment, block_comment, tag(";")))),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    verify(take_while1(is_ident_char), |s: &str| {
        !s.starts_with(|c: char| c.is_ascii_digit())
    })(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_char)))
}

fn escape_char(input: &str) -> IResult<&str, &str> {
    alt((
        value("\\", tag("\\")),
        value("\"", tag("\"")),
        value("'", tag("'")),
        value("\n", tag("n")),
        value("\t", tag("t")),
        value("\r", tag("r")),
    ))(input)
}

fn triple_quoted(input: &str) -> IResult<&str, String> {
    map(
        delimited(tag("\"\"\""), take_until("\"\"\""), tag("\"\"\"")),
        str::to_string,
    )(input)
}

fn double_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(is_not("\\\""), '\\', escape_char)),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn single_quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('\''),
        map(
            opt(escaped_transform(is_not("\\'"), '\\', escape_char)),
            Option::unwrap_or_default,
        ),
        char('\''),
    )(input)
}

fn number(input: &str) -> IResult<&str, Value> {
    terminated(
        alt((
            map_res(
                recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
                |s: &str| s.parse::<f64>().map(Value::Float),
            ),
            integer,
        )),
        not(satisfy(is_ident_char)),
    )(input)
}

/// Digits that do not fit an `i64` are a hard error rather than a
/// backtrack, so the report points at the number.
fn integer(input: &str) -> IResult<&str, Value> {
    let (rest, digits) = recognize(pair(opt(char('-')), digit1))(input)?;
    match digits.parse::<i64>() {
        Ok(n) => Ok((rest, Value::Int(n))),
        Err(_) => Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge))),
    }
}

fn list(input: &str) -> IResult<&str, Value> {
    map(
        delimited(
            pair(char('['), ws),
            terminated(
                separated_list0(delimited(ws, char(','), ws), literal),
                opt(pair(ws, char(','))),
            ),
            pair(ws, char(']')),
        ),
        Value::List,
    )(input)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(triple_quoted, Value::String),
        map(double_quoted, Value::String),
        map(single_quoted, Value::String),
        number,
        value(Value::Bool(true), keyword("true")),
        value(Value::Bool(false), keyword("false")),
        value(Value::Null, keyword("null")),
        list,
    ))(input)
}

fn named_arg(input: &str) -> IResult<&str, Arg> {
    map(
        separated_pair(identifier, tuple((space0, char(':'), ws)), literal),
        |(key, val)| Arg::Named(key.to_string(), val),
    )(input)
}

fn argument(input: &str) -> IResult<&str, Arg> {
    alt((named_arg, map(literal, Arg::Positional)))(input)
}

fn paren_args(input: &str) -> IResult<&str, Vec<Arg>> {
    preceded(
        pair(char('('), ws),
        cut(terminated(
            separated_list0(delimited(ws, char(','), ws), argument),
            tuple((opt(pair(ws, char(','))), ws, char(')'))),
        )),
    )(input)
}

fn bare_args(input: &str) -> IResult<&str, Vec<Arg>> {
    preceded(
        space1,
        separated_list1(tuple((space0, char(','), ws)), argument),
    )(input)
}
