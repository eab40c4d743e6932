use crate::{
    ast::{
        visitor::{visit, Node, Visitor},
        DirectionalMatch, Expression, NumericRange, RegularMatch, StatementBody,
    },
    magic::MagicKey,
    token::{Negation, Standalone},
};
use std::convert::Infallible;
use std::fmt::{self, Display, Formatter};
use std::fmt::Write;

/// Turns an expression back into filter text.
///
/// The output is canonical rather than a copy of the input: keywords use
/// their first spelling, numbers are decimal and tokens are separated by
/// single spaces. Parsing the output again yields an equivalent filter.
#[derive(Debug, Default)]
pub struct Printer {
    tokens: Vec<String>,
}

impl Printer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text printed so far.
    pub fn into_string(self) -> String {
        self.tokens.join(" ")
    }

    fn emit(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    fn emit_key<K: MagicKey>(&mut self, key: K) {
        match key.keyword() {
            Some(keyword) => self.emit(keyword),
            None => self.emit(key.code().to_string()),
        }
    }

    fn emit_range(&mut self, range: &NumericRange) {
        match *range {
            NumericRange::Between { lower, upper } => {
                self.emit(lower.to_string());
                self.emit("-");
                self.emit(upper.to_string());
            }
            NumericRange::Less(n) => {
                self.emit("<");
                self.emit(n.to_string());
            }
            NumericRange::Greater(n) => {
                self.emit(">");
                self.emit(n.to_string());
            }
            NumericRange::Equal(n) => self.emit(n.to_string()),
        }
    }
}

impl<'a> Visitor<'a> for Printer {
    type Error = Infallible;

    fn visit(&mut self, node: Node<'a>) -> Result<(), Infallible> {
        match node {
            Node::Expression(_) | Node::DirectionalMatchGroup(_) | Node::RegularMatchGroup(_) => {}
            Node::Statement(statement) => {
                if let StatementBody::SubExpression(inner) = &statement.body {
                    if statement.negated {
                        self.visit(Node::Negation)?;
                    }
                    self.emit("(");
                    self.visit(Node::Expression(inner))?;
                    self.emit(")");
                    return Ok(());
                }
            }
            Node::Negation => self.emit(Negation::Not.as_str()),
            Node::Conjunction(op) => self.emit(op.as_str()),
            Node::Direction(direction) => self.emit(direction.as_str()),
            Node::DirectionalMatch(body) => {
                self.emit(body.command().as_str());
                if let DirectionalMatch::Interface(iface) = body {
                    if let Some(subcommand) = iface.subcommand() {
                        self.emit(subcommand.as_str());
                    }
                }
            }
            Node::RegularMatch(body) => {
                if let Some(command) = body.command() {
                    self.emit(command.as_str());
                }
                match body {
                    RegularMatch::FlowDirection(direction) => self.emit(direction.as_str()),
                    RegularMatch::Normalized => self.emit(Standalone::Normalized.as_str()),
                    RegularMatch::Icmp(icmp) => self.emit(icmp.subcommand().as_str()),
                    _ => {}
                }
            }
            Node::Range(range) => self.emit_range(range),
            Node::Number(n) => self.emit(n.to_string()),
            Node::Address(address) => self.emit(address.to_string()),
            Node::Mask(mask) => match self.tokens.last_mut() {
                Some(address) => {
                    let _ = write!(address, "/{mask}");
                }
                None => self.emit(format!("/{mask}")),
            },
            Node::Text(text) => {
                if text.contains('\'') {
                    self.emit(format!("\"{text}\""));
                } else {
                    self.emit(format!("'{text}'"));
                }
            }
            Node::CountryCode(code) => self.emit(code),
            Node::ProtoKey(key) => self.emit_key(key),
            Node::EtypeKey(key) => self.emit_key(key),
            Node::StatusKey(key) => self.emit_key(key),
            Node::TcpFlagsKey(key) => self.emit_key(key),
            Node::DscpKey(key) => self.emit_key(key),
            Node::EcnKey(key) => self.emit_key(key),
            Node::RpkiKey(key) => self.emit_key(key),
        }

        node.walk(self)
    }
}

/// Renders an expression as filter text.
pub fn render(expr: &Expression) -> String {
    let mut printer = Printer::new();
    match visit(expr, &mut printer) {
        Ok(()) => {}
        Err(never) => match never {},
    }
    printer.into_string()
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn canonical(filter: &str) -> String {
        render(&parse(filter).unwrap())
    }

    #[test]
    fn test_render() {
        assert_eq!(canonical(""), "");
        assert_eq!(
            canonical("not src address 10.0.0.0/8 or proto tcp"),
            "not src address 10.0.0.0/8 or proto tcp"
        );
        assert_eq!(
            canonical("(proto 6 and port 456) or src iface 0 and address 1.1.1.1"),
            "( proto 6 and port 456 ) or src interface 0 and address 1.1.1.1"
        );
        assert_eq!(canonical("not (port 1)"), "not ( port 1 )");
        assert_eq!(canonical("()"), "( )");
    }

    #[test]
    fn test_ranges_and_numbers() {
        assert_eq!(canonical("port 1-2"), "port 1 - 2");
        assert_eq!(canonical("bytes <10"), "bytes < 10");
        assert_eq!(canonical("dst asn >0x10"), "dst asn > 16");
        assert_eq!(canonical("etype 0x0800"), "etype 2048");
        assert_eq!(canonical("dst address 2001:db8::1/128"), "dst address 2001:db8::1/128");
    }

    #[test]
    fn test_keywords() {
        assert_eq!(canonical("dscp besteffort"), "dscp default");
        assert_eq!(canonical("via-asn 5"), "passes-through 5");
        assert_eq!(canonical("iface id 5"), "interface 5");
        assert_eq!(canonical("direction incoming"), "incoming");
        assert_eq!(canonical("normalized"), "normalized");
        assert_eq!(canonical("icmp code 3"), "icmp code 3");
        assert_eq!(canonical("country dE"), "country dE");
        assert_eq!(canonical("src iface speed 10-100"), "src interface speed 10 - 100");
    }

    #[test]
    fn test_strings() {
        assert_eq!(canonical(r#"iface name "Hu""#), "interface name 'Hu'");
        assert_eq!(canonical(r#"iface desc "it's""#), r#"interface desc "it's""#);
    }

    #[test]
    fn test_display() {
        let expr = parse("proto udp and   not port 53").unwrap();
        assert_eq!(expr.to_string(), "proto udp and not port 53");
    }
}
