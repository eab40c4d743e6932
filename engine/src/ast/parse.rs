use super::{
    expr::{Expression, Statement, StatementBody},
    matches::{
        AddressMatch, Code, DirectionalMatch, DirectionalMatchGroup, IcmpMatch, InterfaceMatch,
        RegularMatch, RegularMatchGroup,
    },
    range::NumericRange,
};
use crate::{
    lex::{complete, Lex, LexErrorKind},
    magic::MagicKey,
    token::{
        tokenize, Command, Conjunction, Direction, FlowDirection, IcmpCommand, IfaceCommand,
        Negation, Standalone, Token, TokenKind,
    },
};
use std::cmp::{max, min};
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::net::{AddrParseError, IpAddr};
use std::num::ParseIntError;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, PartialEq, Eq, Clone, Error)]
/// ParseErrorKind describes why a filter was rejected.
pub enum ParseErrorKind {
    /// The input could not be split into tokens
    #[error("{0}")]
    Lex(#[from] LexErrorKind),

    /// Expected a token of another class
    #[error("expected {0}")]
    Expected(&'static str),

    /// Expected the next token to be an int
    #[error("{err} while parsing with radix {radix}")]
    ParseInt {
        /// The error that occurred parsing the token as an int
        #[source]
        err: ParseIntError,
        /// The base of the number
        radix: u32,
    },

    /// Expected the next token to be an IPv4 or IPv6 address
    #[error("{0}")]
    ParseAddress(#[source] AddrParseError),

    /// A `(` was never closed
    #[error("missing closing parenthesis")]
    UnclosedParenthesis,

    /// A `)` without a matching `(`
    #[error("unmatched closing parenthesis")]
    UnmatchedParenthesis,

    /// Input left over after a complete filter
    #[error("unrecognised input")]
    EOF,

    /// Nesting beyond [`ParserSettings::max_depth`]
    #[error("filter nests deeper than {limit} levels")]
    TooDeep {
        /// The configured limit
        limit: usize,
    },
}

type ParseResult<'i, T> = Result<T, (ParseErrorKind, &'i str)>;

/// An opaque filter parsing error associated with the original input.
///
/// For now, you can just print it in a debug or a human-readable fashion.
#[derive(Debug, PartialEq)]
pub struct ParseError<'i> {
    /// The error that occurred when parsing the input
    pub(crate) kind: ParseErrorKind,

    /// The input that caused the parse error
    pub(crate) input: &'i str,

    /// The line number on the input where the error occurred
    pub(crate) line_number: usize,

    /// The start of the bad input
    pub(crate) span_start: usize,

    /// The number of characters that span the bad input
    pub(crate) span_len: usize,
}

impl Error for ParseError<'_> {}

impl<'i> ParseError<'i> {
    /// Create a new ParseError for the input, ParseErrorKind and span in the
    /// input.
    pub fn new(mut input: &'i str, (kind, span): (ParseErrorKind, &'i str)) -> Self {
        let input_range = input.as_ptr() as usize..=input.as_ptr() as usize + input.len();
        assert!(
            input_range.contains(&(span.as_ptr() as usize))
                && input_range.contains(&(span.as_ptr() as usize + span.len()))
        );
        let mut span_start = span.as_ptr() as usize - input.as_ptr() as usize;

        let (line_number, line_start) = input[..span_start]
            .match_indices('\n')
            .map(|(pos, _)| pos + 1)
            .scan(0, |line_number, line_start| {
                *line_number += 1;
                Some((*line_number, line_start))
            })
            .last()
            .unwrap_or_default();

        input = &input[line_start..];

        span_start -= line_start;
        let mut span_len = span.len();

        if let Some(line_end) = input.find('\n') {
            input = &input[..line_end];
            span_len = min(span_len, line_end - span_start);
        }

        ParseError {
            kind,
            input,
            line_number,
            span_start,
            span_len,
        }
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Zero-based line of the bad input.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Zero-based byte column of the bad input within its line.
    pub fn column(&self) -> usize {
        self.span_start
    }

    pub fn span_len(&self) -> usize {
        self.span_len
    }
}

impl Display for ParseError<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Filter parsing error ({}:{}):",
            self.line_number + 1,
            self.span_start + 1
        )?;

        writeln!(f, "{}", self.input)?;

        for _ in 0..self.span_start {
            write!(f, " ")?;
        }

        for _ in 0..max(1, self.span_len) {
            write!(f, "^")?;
        }

        writeln!(f, " {}", self.kind)?;

        Ok(())
    }
}

/// Parser settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserSettings {
    /// Maximum nesting of parentheses and chained conjunctions.
    /// Default: 128
    pub max_depth: usize,
}

impl Default for ParserSettings {
    #[inline]
    fn default() -> Self {
        Self { max_depth: 128 }
    }
}

/// A structure used to drive parsing of filter text into an [`Expression`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterParser {
    pub(crate) settings: ParserSettings,
}

impl FilterParser {
    /// Creates a new parser with default settings.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new parser with the specified settings.
    #[inline]
    pub fn with_settings(settings: ParserSettings) -> Self {
        Self { settings }
    }

    /// Retrieve parser settings.
    #[inline]
    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Parses a filter into an AST form. The empty filter parses to
    /// [`Expression::Empty`].
    pub fn parse<'i>(&self, input: &'i str) -> Result<Expression, ParseError<'i>> {
        self.parse_tokens(input).map_err(|err| {
            let err = ParseError::new(input, err);
            debug!(
                kind = %err.kind,
                line = err.line_number + 1,
                column = err.span_start + 1,
                "rejected filter"
            );
            err
        })
    }

    fn parse_tokens<'i>(&self, input: &'i str) -> ParseResult<'i, Expression> {
        let tokens = tokenize(input).map_err(|(kind, span)| (ParseErrorKind::Lex(kind), span))?;
        let mut cursor = Cursor {
            input,
            tokens: &tokens,
            pos: 0,
            depth: 0,
            max_depth: self.settings.max_depth,
        };
        let expr = cursor.expression()?;
        cursor.finish()?;
        debug!(tokens = tokens.len(), "parsed filter");
        Ok(expr)
    }
}

/// Parses a filter with default settings.
pub fn parse(input: &str) -> Result<Expression, ParseError<'_>> {
    FilterParser::new().parse(input)
}

/// Decimal by default, `0x` hexadecimal and `0b` binary.
fn parse_number(text: &str) -> Result<u64, ParseErrorKind> {
    let (digits, radix) = if let Some(digits) = text.strip_prefix("0x") {
        (digits, 16)
    } else if let Some(digits) = text.strip_prefix("0b") {
        (digits, 2)
    } else {
        (text, 10)
    };
    u64::from_str_radix(digits, radix).map_err(|err| ParseErrorKind::ParseInt { err, radix })
}

struct Cursor<'i, 't> {
    input: &'i str,
    tokens: &'t [Token<'i>],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'i, 't> Cursor<'i, 't> {
    fn peek(&self) -> Option<&'t Token<'i>> {
        self.tokens.get(self.pos)
    }

    /// Span of the current token, or the end of input.
    fn span(&self) -> &'i str {
        match self.peek() {
            Some(token) => token.text,
            None => &self.input[self.input.len()..],
        }
    }

    fn fail<T>(&self, kind: ParseErrorKind) -> ParseResult<'i, T> {
        Err((kind, self.span()))
    }

    fn expected<T>(&self, what: &'static str) -> ParseResult<'i, T> {
        self.fail(ParseErrorKind::Expected(what))
    }

    fn next_if(&mut self, f: impl FnOnce(&Token<'i>) -> bool) -> Option<&'t Token<'i>> {
        let token = self.peek().filter(|token| f(token))?;
        self.pos += 1;
        Some(token)
    }

    fn next_kind(&mut self, kind: TokenKind) -> Option<&'t Token<'i>> {
        self.next_if(|token| token.kind == kind)
    }

    /// The current token read as a keyword of `T`, if it spells one.
    fn peek_word<T: Lex<'i>>(&self) -> Option<T> {
        let token = self.peek()?;
        if token.kind == TokenKind::String {
            return None;
        }
        complete(T::lex(token.text)).ok()
    }

    fn word<T: Lex<'i>>(&mut self) -> Option<T> {
        let word = self.peek_word()?;
        self.pos += 1;
        Some(word)
    }

    fn finish(&self) -> ParseResult<'i, ()> {
        match self.peek() {
            None => Ok(()),
            Some(token) if token.is_symbol(")") => self.fail(ParseErrorKind::UnmatchedParenthesis),
            Some(_) => self.fail(ParseErrorKind::EOF),
        }
    }

    fn expression(&mut self) -> ParseResult<'i, Expression> {
        match self.peek() {
            None => Ok(Expression::Empty),
            Some(token) if token.is_symbol(")") => Ok(Expression::Empty),
            Some(_) => self.chain(),
        }
    }

    fn chain(&mut self) -> ParseResult<'i, Expression> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return self.fail(ParseErrorKind::TooDeep {
                limit: self.max_depth,
            });
        }

        let left = Box::new(self.statement()?);
        let expr = match self.word::<Conjunction>() {
            Some(op) => Expression::Conjunction {
                left,
                op,
                right: Box::new(self.chain()?),
            },
            None => Expression::Single(left),
        };

        self.depth -= 1;
        Ok(expr)
    }

    fn statement(&mut self) -> ParseResult<'i, Statement> {
        let negated = self.word::<Negation>().is_some();

        let body = if let Some(group) = self.directional()? {
            StatementBody::Directional(group)
        } else if let Some(group) = self.regular()? {
            StatementBody::Regular(group)
        } else if let Some(open) = self.next_if(|token| token.is_symbol("(")) {
            let inner = self.expression()?;
            if self.next_if(|token| token.is_symbol(")")).is_none() {
                return match self.peek() {
                    None => Err((ParseErrorKind::UnclosedParenthesis, open.text)),
                    Some(_) => self.expected("conjunction or closing parenthesis"),
                };
            }
            StatementBody::SubExpression(Box::new(inner))
        } else {
            return self.expected("match statement");
        };

        Ok(Statement { negated, body })
    }

    fn directional(&mut self) -> ParseResult<'i, Option<DirectionalMatchGroup>> {
        let direction = self.word::<Direction>();
        let command = match self.peek_word::<Command>() {
            Some(command) if command.is_directional() => command,
            _ if direction.is_some() => return self.expected("directional match"),
            _ => return Ok(None),
        };
        self.pos += 1;

        let body = match command {
            Command::Address => DirectionalMatch::Address(self.address_match()?),
            Command::Interface => DirectionalMatch::Interface(self.interface()?),
            Command::Port => DirectionalMatch::Port(self.range()?),
            Command::Asn => DirectionalMatch::Asn(self.range()?),
            Command::Netsize => DirectionalMatch::Netsize(self.range()?),
            Command::Cid => DirectionalMatch::Cid(self.range()?),
            Command::Vrf => DirectionalMatch::Vrf(self.range()?),
            _ => return self.expected("directional match"),
        };
        Ok(Some(DirectionalMatchGroup { direction, body }))
    }

    fn regular(&mut self) -> ParseResult<'i, Option<RegularMatchGroup>> {
        if let Some(standalone) = self.word::<Standalone>() {
            let body = match standalone {
                Standalone::Incoming => RegularMatch::FlowDirection(FlowDirection::Incoming),
                Standalone::Outgoing => RegularMatch::FlowDirection(FlowDirection::Outgoing),
                Standalone::Normalized => RegularMatch::Normalized,
            };
            return Ok(Some(RegularMatchGroup { body }));
        }

        let Some(command) = self.word::<Command>() else {
            return Ok(None);
        };

        let body = match command {
            Command::Router => RegularMatch::Router(self.address()?),
            Command::NextHop => RegularMatch::NextHop(self.address()?),
            Command::Bytes => RegularMatch::Bytes(self.range()?),
            Command::Packets => RegularMatch::Packets(self.range()?),
            Command::Country => match self.next_kind(TokenKind::CountryCode) {
                Some(token) => RegularMatch::Country(token.text.to_owned()),
                None => return self.expected("country code"),
            },
            Command::Direction => match self.word::<FlowDirection>() {
                Some(direction) => RegularMatch::FlowDirection(direction),
                None => return self.expected("incoming or outgoing"),
            },
            Command::Duration => RegularMatch::Duration(self.range()?),
            Command::Etype => RegularMatch::Etype(self.code(TokenKind::EtypeMagic)?),
            Command::Proto => RegularMatch::Proto(self.code(TokenKind::ProtoMagic)?),
            Command::Status => RegularMatch::Status(self.code(TokenKind::StatusMagic)?),
            Command::TcpFlags => RegularMatch::TcpFlags(self.code(TokenKind::TcpFlagsMagic)?),
            Command::IpTos => RegularMatch::IpTos(self.range()?),
            Command::Dscp => RegularMatch::Dscp(self.code(TokenKind::DscpMagic)?),
            Command::Ecn => RegularMatch::Ecn(self.code(TokenKind::EcnMagic)?),
            Command::SamplingRate => RegularMatch::SamplingRate(self.range()?),
            Command::Icmp => RegularMatch::Icmp(match self.word::<IcmpCommand>() {
                Some(IcmpCommand::Type) => IcmpMatch::Type(self.number()?),
                Some(IcmpCommand::Code) => IcmpMatch::Code(self.number()?),
                None => return self.expected("icmp type or code"),
            }),
            Command::Bps => RegularMatch::Bps(self.range()?),
            Command::Pps => RegularMatch::Pps(self.range()?),
            Command::PassesThrough => RegularMatch::PassesThrough(self.range()?),
            Command::Med => RegularMatch::Med(self.range()?),
            Command::LocalPref => RegularMatch::LocalPref(self.range()?),
            Command::NextHopAsn => RegularMatch::NextHopAsn(self.range()?),
            Command::Rpki => RegularMatch::Rpki(self.code(TokenKind::RpkiMagic)?),
            Command::Address
            | Command::Interface
            | Command::Port
            | Command::Asn
            | Command::Netsize
            | Command::Cid
            | Command::Vrf => return self.expected("match statement"),
        };
        Ok(Some(RegularMatchGroup { body }))
    }

    fn interface(&mut self) -> ParseResult<'i, InterfaceMatch> {
        Ok(match self.word::<IfaceCommand>() {
            Some(IfaceCommand::Name) => InterfaceMatch::Name(self.string()?),
            Some(IfaceCommand::Desc) => InterfaceMatch::Description(self.string()?),
            Some(IfaceCommand::Speed) => InterfaceMatch::Speed(self.range()?),
            None => {
                self.next_if(|token| token.is_word("id"));
                InterfaceMatch::Id(self.number()?)
            }
        })
    }

    fn address_match(&mut self) -> ParseResult<'i, AddressMatch> {
        let address = self.address()?;
        let mask = match self.next_if(|token| token.is_symbol("/")) {
            Some(_) => Some(self.number()?),
            None => None,
        };
        Ok(AddressMatch { address, mask })
    }

    fn address(&mut self) -> ParseResult<'i, IpAddr> {
        match self.next_kind(TokenKind::Address) {
            Some(token) => token
                .text
                .parse()
                .map_err(|err| (ParseErrorKind::ParseAddress(err), token.text)),
            None => self.expected("address"),
        }
    }

    fn string(&mut self) -> ParseResult<'i, String> {
        match self.next_kind(TokenKind::String) {
            Some(token) => Ok(token.text.to_owned()),
            None => self.expected("quoted string"),
        }
    }

    fn number(&mut self) -> ParseResult<'i, u64> {
        match self.next_kind(TokenKind::Number) {
            Some(token) => parse_number(token.text).map_err(|kind| (kind, token.text)),
            None => self.expected("number"),
        }
    }

    fn code<K: MagicKey>(&mut self, kind: TokenKind) -> ParseResult<'i, Code<K>> {
        match self.next_kind(kind) {
            Some(token) => match K::table().code(token.text) {
                Some(code) => Ok(Code::Key(K::from_code(code))),
                None => Err((ParseErrorKind::Expected(K::table().name()), token.text)),
            },
            None => self.number().map(Code::Number),
        }
    }

    fn range(&mut self) -> ParseResult<'i, NumericRange> {
        if let Some(unary) = self.next_kind(TokenKind::Unary) {
            let n = self.number()?;
            return Ok(if unary.text == "<" {
                NumericRange::Less(n)
            } else {
                NumericRange::Greater(n)
            });
        }

        let lower = self.number()?;
        if self.next_if(|token| token.is_symbol("-")).is_some() {
            let upper = self.number()?;
            return Ok(NumericRange::Between { lower, upper });
        }
        Ok(NumericRange::Equal(lower))
    }
}

impl Debug for Cursor<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("pos", &self.pos)
            .field("next", &self.peek())
            .field("depth", &self.depth)
            .finish()
    }
}
