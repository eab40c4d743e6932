use crate::lex::{expect, is_word_char, skip_space, take_while, Lex, LexError, LexErrorKind};
use crate::magic::{DSCP, ECN, ETYPE, PROTO, RPKI, STATUS, TCP_FLAGS};
use serde::Serialize;
use tracing::trace;

lex_enum!(Negation {
    "not" => Not,
});

lex_enum!(
    /// Joins two statements.
    ///
    /// There is no precedence between the two: `a and b or c` groups as
    /// `a and (b or c)`.
    #[serde(rename_all = "lowercase")]
    Conjunction {
        "and" => And,
        "or" => Or,
    }
);

lex_enum!(
    /// Side of a flow a directional match applies to.
    #[serde(rename_all = "lowercase")]
    Direction {
        "src" => Src,
        "dst" => Dst,
    }
);

lex_enum!(
    #[serde(rename_all = "lowercase")]
    FlowDirection {
        "incoming" => Incoming,
        "outgoing" => Outgoing,
    }
);

lex_enum!(Standalone {
    "incoming" => Incoming,
    "outgoing" => Outgoing,
    "normalized" => Normalized,
});

lex_enum!(
    /// Words that introduce a match.
    Command {
        "bytes" => Bytes,
        "packets" => Packets,
        "port" => Port,
        "asn" => Asn,
        "passes-through" | "via-asn" => PassesThrough,
        "interface" | "iface" => Interface,
        "address" => Address,
        "router" => Router,
        "country" => Country,
        "direction" => Direction,
        "duration" => Duration,
        "etype" => Etype,
        "proto" => Proto,
        "status" => Status,
        "tcpflags" => TcpFlags,
        "iptos" => IpTos,
        "dscp" => Dscp,
        "ecn" => Ecn,
        "nexthopasn" => NextHopAsn,
        "nexthop" => NextHop,
        "netsize" => Netsize,
        "vrf" => Vrf,
        "samplingrate" => SamplingRate,
        "cid" => Cid,
        "icmp" => Icmp,
        "bps" => Bps,
        "pps" => Pps,
        "med" => Med,
        "localpref" => LocalPref,
        "rpki" => Rpki,
    }
);

impl Command {
    /// Whether the command takes an optional `src`/`dst` qualifier.
    pub fn is_directional(self) -> bool {
        matches!(
            self,
            Command::Address
                | Command::Interface
                | Command::Port
                | Command::Asn
                | Command::Netsize
                | Command::Cid
                | Command::Vrf
        )
    }
}

lex_enum!(IfaceCommand {
    "name" => Name,
    "desc" => Desc,
    "speed" => Speed,
});

lex_enum!(IcmpCommand {
    "type" => Type,
    "code" => Code,
});

/// Token classes, listed in the order the tokenizer tries them.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub enum TokenKind {
    Negation,
    Conjunction,
    EcnMagic,
    DscpMagic,
    EtypeMagic,
    ProtoMagic,
    StatusMagic,
    TcpFlagsMagic,
    RpkiMagic,
    Direction,
    Match,
    Standalone,
    IfaceSubcommand,
    IcmpSubcommand,
    CountryCode,
    Address,
    Number,
    Unary,
    Symbol,
    String,
}

impl TokenKind {
    const RULES: [TokenKind; 20] = [
        TokenKind::Negation,
        TokenKind::Conjunction,
        TokenKind::EcnMagic,
        TokenKind::DscpMagic,
        TokenKind::EtypeMagic,
        TokenKind::ProtoMagic,
        TokenKind::StatusMagic,
        TokenKind::TcpFlagsMagic,
        TokenKind::RpkiMagic,
        TokenKind::Direction,
        TokenKind::Match,
        TokenKind::Standalone,
        TokenKind::IfaceSubcommand,
        TokenKind::IcmpSubcommand,
        TokenKind::CountryCode,
        TokenKind::Address,
        TokenKind::Number,
        TokenKind::Unary,
        TokenKind::Symbol,
        TokenKind::String,
    ];

    /// Word classes only match at a word boundary.
    pub(crate) fn is_word(self) -> bool {
        !matches!(
            self,
            TokenKind::Address
                | TokenKind::Number
                | TokenKind::Unary
                | TokenKind::Symbol
                | TokenKind::String
        )
    }

    /// Matches this class at the start of `input`, returning the rest.
    fn lex(self, input: &str) -> Result<&str, LexError<'_>> {
        fn rest<T>((_, rest): (T, &str)) -> &str {
            rest
        }

        match self {
            TokenKind::Negation => Negation::lex(input).map(rest),
            TokenKind::Conjunction => Conjunction::lex(input).map(rest),
            TokenKind::EcnMagic => ECN.lex_keyword(input),
            TokenKind::DscpMagic => DSCP.lex_keyword(input),
            TokenKind::EtypeMagic => ETYPE.lex_keyword(input),
            TokenKind::ProtoMagic => PROTO.lex_keyword(input),
            TokenKind::StatusMagic => STATUS.lex_keyword(input),
            TokenKind::TcpFlagsMagic => TCP_FLAGS.lex_keyword(input),
            TokenKind::RpkiMagic => RPKI.lex_keyword(input),
            TokenKind::Direction => Direction::lex(input).map(rest),
            TokenKind::Match => Command::lex(input).map(rest),
            TokenKind::Standalone => Standalone::lex(input).map(rest),
            TokenKind::IfaceSubcommand => IfaceCommand::lex(input).map(rest),
            TokenKind::IcmpSubcommand => IcmpCommand::lex(input).map(rest),
            TokenKind::CountryCode => lex_country_code(input),
            TokenKind::Address => lex_address(input),
            TokenKind::Number => take_while(input, "number", |c| {
                matches!(c, '0'..='9' | 'a'..='f' | 'x')
            })
            .map(rest),
            TokenKind::Unary => expect(input, "<").or_else(|_| expect(input, ">")),
            TokenKind::Symbol => ["-", "/", "(", ")"]
                .into_iter()
                .find_map(|s| expect(input, s).ok())
                .ok_or((LexErrorKind::ExpectedName("symbol"), input)),
            TokenKind::String => lex_quoted(input).map(rest),
        }
    }
}

fn lex_country_code(input: &str) -> Result<&str, LexError<'_>> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(a), Some(b)) if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
            let rest = chars.as_str();
            if rest.starts_with(is_word_char) {
                Err((LexErrorKind::ExpectedName("country code"), input))
            } else {
                Ok(rest)
            }
        }
        _ => Err((LexErrorKind::ExpectedName("country code"), input)),
    }
}

fn is_hex_lower(c: char) -> bool {
    matches!(c, '0'..='9' | 'a'..='f')
}

/// A run that looks like an IPv4 or IPv6 address. Validation happens in the
/// parser.
fn lex_address(input: &str) -> Result<&str, LexError<'_>> {
    let err = || (LexErrorKind::ExpectedName("address"), input);
    let rest = input
        .strip_prefix(|c: char| matches!(c, '1'..='9' | 'a'..='f'))
        .ok_or_else(err)?
        .trim_start_matches(is_hex_lower);
    let rest = rest
        .strip_prefix(|c: char| c == '.' || c == ':')
        .ok_or_else(err)?;
    match take_while(rest, "address", |c| is_hex_lower(c) || c == '.' || c == ':') {
        Ok((_, rest)) => Ok(rest),
        Err(_) => Err(err()),
    }
}

/// Returns the unquoted body.
fn lex_quoted(input: &str) -> Result<(&str, &str), LexError<'_>> {
    let quote = if input.starts_with('\'') {
        '\''
    } else if input.starts_with('"') {
        '"'
    } else {
        return Err((LexErrorKind::ExpectedName("string"), input));
    };
    let body = &input[1..];
    match body.find(quote) {
        Some(end) => Ok((&body[..end], &body[end + 1..])),
        None => Err((LexErrorKind::MissingEndingQuote, input)),
    }
}

/// A classified slice of the filter text.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub struct Token<'i> {
    pub kind: TokenKind,
    /// Matched text; the body without quotes for strings.
    pub text: &'i str,
    /// Byte offset of the token start in the filter text.
    pub position: usize,
}

impl Token<'_> {
    pub(crate) fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }

    /// Whether this is a bare word spelled `word`.
    pub(crate) fn is_word(&self, word: &str) -> bool {
        self.kind.is_word() && self.text == word
    }
}

/// Splits filter text into tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, LexError<'_>> {
    let mut tokens = Vec::new();
    let mut rest = skip_space(input);

    while !rest.is_empty() {
        let position = input.len() - rest.len();
        let at_boundary = !input[..position].ends_with(is_word_char);

        let mut matched = None;
        for kind in TokenKind::RULES {
            if kind.is_word() && !at_boundary {
                continue;
            }
            match kind.lex(rest) {
                Ok(after) => {
                    matched = Some((kind, after));
                    break;
                }
                Err((LexErrorKind::MissingEndingQuote, span)) => {
                    return Err((LexErrorKind::MissingEndingQuote, span));
                }
                Err(_) => {}
            }
        }

        let (kind, after) = match matched {
            Some(matched) => matched,
            None => {
                let end = match rest.find(char::is_whitespace) {
                    Some(0) => rest.chars().next().map_or(0, char::len_utf8),
                    Some(end) => end,
                    None => rest.len(),
                };
                return Err((LexErrorKind::UnrecognisedToken, &rest[..end]));
            }
        };

        let text = if kind == TokenKind::String {
            &rest[1..rest.len() - after.len() - 1]
        } else {
            &rest[..rest.len() - after.len()]
        };
        tokens.push(Token {
            kind,
            text,
            position,
        });
        rest = skip_space(after);
    }

    trace!(count = tokens.len(), ?tokens, "tokenized filter");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, &str)> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("not src port 80 and proto tcp"),
            [
                (TokenKind::Negation, "not"),
                (TokenKind::Direction, "src"),
                (TokenKind::Match, "port"),
                (TokenKind::Number, "80"),
                (TokenKind::Conjunction, "and"),
                (TokenKind::Match, "proto"),
                (TokenKind::ProtoMagic, "tcp"),
            ]
        );
    }

    #[test]
    fn test_magic_before_match() {
        assert_eq!(
            kinds("icmp type 3"),
            [
                (TokenKind::ProtoMagic, "icmp"),
                (TokenKind::IcmpSubcommand, "type"),
                (TokenKind::Number, "3"),
            ]
        );
        assert_eq!(kinds("dscp default"), [(TokenKind::Match, "dscp"), (TokenKind::DscpMagic, "default")]);
    }

    #[test]
    fn test_word_boundary() {
        // a keyword prefix inside a longer word is not the keyword
        assert_eq!(kinds("notfound"), [(TokenKind::RpkiMagic, "notfound")]);
        assert_eq!(kinds("icmpv6"), [(TokenKind::ProtoMagic, "icmpv6")]);
        assert_eq!(kinds("nexthopasn 3"), [(TokenKind::Match, "nexthopasn"), (TokenKind::Number, "3")]);
        assert_eq!(kinds("via-asn 3")[0], (TokenKind::Match, "via-asn"));
        assert_eq!(
            tokenize("portal"),
            Err((LexErrorKind::UnrecognisedToken, "portal"))
        );
    }

    #[test]
    fn test_country_code() {
        assert_eq!(kinds("country dE"), [(TokenKind::Match, "country"), (TokenKind::CountryCode, "dE")]);
        assert_eq!(kinds("iface id 2")[1], (TokenKind::CountryCode, "id"));
    }

    #[test]
    fn test_address_and_number() {
        assert_eq!(
            kinds("address 10.0.0.0/24"),
            [
                (TokenKind::Match, "address"),
                (TokenKind::Address, "10.0.0.0"),
                (TokenKind::Symbol, "/"),
                (TokenKind::Number, "24"),
            ]
        );
        assert_eq!(kinds("2001:db8::1"), [(TokenKind::Address, "2001:db8::1")]);
        assert_eq!(kinds("0x0800"), [(TokenKind::Number, "0x0800")]);
        assert_eq!(
            kinds("0b1-0x23"),
            [
                (TokenKind::Number, "0b1"),
                (TokenKind::Symbol, "-"),
                (TokenKind::Number, "0x23"),
            ]
        );
        assert_eq!(kinds("<5"), [(TokenKind::Unary, "<"), (TokenKind::Number, "5")]);
    }

    #[test]
    fn test_strings() {
        let tokens = tokenize("iface name 'Hu0/1'").unwrap();
        assert_eq!(
            tokens[2],
            Token {
                kind: TokenKind::String,
                text: "Hu0/1",
                position: 11,
            }
        );
        assert_eq!(kinds(r#"desc "it's""#)[1], (TokenKind::String, "it's"));
        assert_eq!(kinds("''")[0], (TokenKind::String, ""));
        assert_err!(
            tokenize(r#"src iface desc "lksj'"#),
            LexErrorKind::MissingEndingQuote,
            r#""lksj'"#
        );
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("  (proto 6)").unwrap();
        let positions: Vec<_> = tokens.iter().map(|token| token.position).collect();
        assert_eq!(positions, [2, 3, 9, 10]);
    }

    #[test]
    fn test_unrecognised() {
        assert_eq!(
            tokenize("port 80 & port 81"),
            Err((LexErrorKind::UnrecognisedToken, "&"))
        );
        assert_eq!(tokenize(""), Ok(vec![]));
    }
}
