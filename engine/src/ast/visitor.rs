use super::{
    expr::{Expression, Statement, StatementBody},
    matches::{
        Code, DirectionalMatch, DirectionalMatchGroup, IcmpMatch, InterfaceMatch, RegularMatch,
        RegularMatchGroup,
    },
    range::NumericRange,
};
use crate::magic::{DscpKey, EcnKey, EtypeKey, ProtoKey, RpkiKey, StatusKey, TcpFlagsKey};
use crate::token::{Conjunction, Direction};
use std::net::IpAddr;

/// A borrowed view of any node in the AST.
///
/// Visitors outside this crate must keep a wildcard arm when matching on it
/// and answer unknown variants with
/// [`UnknownNodeError`](crate::UnknownNodeError).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Node<'a> {
    Expression(&'a Expression),
    Conjunction(Conjunction),
    Statement(&'a Statement),
    /// Present only on negated statements.
    Negation,
    DirectionalMatchGroup(&'a DirectionalMatchGroup),
    Direction(Direction),
    DirectionalMatch(&'a DirectionalMatch),
    RegularMatchGroup(&'a RegularMatchGroup),
    RegularMatch(&'a RegularMatch),
    Range(&'a NumericRange),
    Number(u64),
    Address(&'a IpAddr),
    Mask(u64),
    Text(&'a str),
    CountryCode(&'a str),
    ProtoKey(ProtoKey),
    EtypeKey(EtypeKey),
    StatusKey(StatusKey),
    TcpFlagsKey(TcpFlagsKey),
    DscpKey(DscpKey),
    EcnKey(EcnKey),
    RpkiKey(RpkiKey),
}

macro_rules! key_nodes {
    ($($key:ident),*) => {
        $(impl From<$key> for Node<'_> {
            fn from(key: $key) -> Self {
                Node::$key(key)
            }
        })*
    };
}

key_nodes!(ProtoKey, EtypeKey, StatusKey, TcpFlagsKey, DscpKey, EcnKey, RpkiKey);

fn code_node<'a, K: Into<Node<'a>> + Copy>(code: &Code<K>) -> Node<'a> {
    match *code {
        Code::Number(n) => Node::Number(n),
        Code::Key(key) => key.into(),
    }
}

impl<'a> Node<'a> {
    /// Visits the children of this node in source order.
    ///
    /// This is the default body of [`Visitor::visit`]; a visitor overriding
    /// `visit` calls it to descend.
    pub fn walk<V: Visitor<'a>>(self, visitor: &mut V) -> Result<(), V::Error> {
        match self {
            Node::Expression(expr) => match expr {
                Expression::Empty => Ok(()),
                Expression::Single(statement) => visitor.visit(Node::Statement(statement)),
                Expression::Conjunction { left, op, right } => {
                    visitor.visit(Node::Statement(left))?;
                    visitor.visit(Node::Conjunction(*op))?;
                    visitor.visit(Node::Expression(right))
                }
            },
            Node::Statement(statement) => {
                if statement.negated {
                    visitor.visit(Node::Negation)?;
                }
                match &statement.body {
                    StatementBody::Directional(group) => {
                        visitor.visit(Node::DirectionalMatchGroup(group))
                    }
                    StatementBody::Regular(group) => visitor.visit(Node::RegularMatchGroup(group)),
                    StatementBody::SubExpression(expr) => visitor.visit(Node::Expression(expr)),
                }
            }
            Node::DirectionalMatchGroup(group) => {
                if let Some(direction) = group.direction {
                    visitor.visit(Node::Direction(direction))?;
                }
                visitor.visit(Node::DirectionalMatch(&group.body))
            }
            Node::DirectionalMatch(body) => match body {
                DirectionalMatch::Address(address) => {
                    visitor.visit(Node::Address(&address.address))?;
                    match address.mask {
                        Some(mask) => visitor.visit(Node::Mask(mask)),
                        None => Ok(()),
                    }
                }
                DirectionalMatch::Interface(iface) => visitor.visit(match iface {
                    InterfaceMatch::Id(id) => Node::Number(*id),
                    InterfaceMatch::Name(text) | InterfaceMatch::Description(text) => {
                        Node::Text(text)
                    }
                    InterfaceMatch::Speed(range) => Node::Range(range),
                }),
                DirectionalMatch::Port(range)
                | DirectionalMatch::Asn(range)
                | DirectionalMatch::Netsize(range)
                | DirectionalMatch::Cid(range)
                | DirectionalMatch::Vrf(range) => visitor.visit(Node::Range(range)),
            },
            Node::RegularMatchGroup(group) => visitor.visit(Node::RegularMatch(&group.body)),
            Node::RegularMatch(body) => match body {
                RegularMatch::Router(address) | RegularMatch::NextHop(address) => {
                    visitor.visit(Node::Address(address))
                }
                RegularMatch::Country(code) => visitor.visit(Node::CountryCode(code)),
                RegularMatch::FlowDirection(_) | RegularMatch::Normalized => Ok(()),
                RegularMatch::Etype(code) => visitor.visit(code_node(code)),
                RegularMatch::Proto(code) => visitor.visit(code_node(code)),
                RegularMatch::Status(code) => visitor.visit(code_node(code)),
                RegularMatch::TcpFlags(code) => visitor.visit(code_node(code)),
                RegularMatch::Dscp(code) => visitor.visit(code_node(code)),
                RegularMatch::Ecn(code) => visitor.visit(code_node(code)),
                RegularMatch::Rpki(code) => visitor.visit(code_node(code)),
                RegularMatch::Icmp(IcmpMatch::Type(n) | IcmpMatch::Code(n)) => {
                    visitor.visit(Node::Number(*n))
                }
                RegularMatch::Bytes(range)
                | RegularMatch::Packets(range)
                | RegularMatch::Duration(range)
                | RegularMatch::IpTos(range)
                | RegularMatch::SamplingRate(range)
                | RegularMatch::Bps(range)
                | RegularMatch::Pps(range)
                | RegularMatch::PassesThrough(range)
                | RegularMatch::Med(range)
                | RegularMatch::LocalPref(range)
                | RegularMatch::NextHopAsn(range) => visitor.visit(Node::Range(range)),
            },
            Node::Conjunction(_)
            | Node::Negation
            | Node::Direction(_)
            | Node::Range(_)
            | Node::Number(_)
            | Node::Address(_)
            | Node::Mask(_)
            | Node::Text(_)
            | Node::CountryCode(_)
            | Node::ProtoKey(_)
            | Node::EtypeKey(_)
            | Node::StatusKey(_)
            | Node::TcpFlagsKey(_)
            | Node::DscpKey(_)
            | Node::EcnKey(_)
            | Node::RpkiKey(_) => Ok(()),
        }
    }

    /// Name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Node::Expression(_) => "Expression",
            Node::Conjunction(_) => "Conjunction",
            Node::Statement(_) => "Statement",
            Node::Negation => "Negation",
            Node::DirectionalMatchGroup(_) => "DirectionalMatchGroup",
            Node::Direction(_) => "Direction",
            Node::DirectionalMatch(_) => "DirectionalMatch",
            Node::RegularMatchGroup(_) => "RegularMatchGroup",
            Node::RegularMatch(_) => "RegularMatch",
            Node::Range(_) => "Range",
            Node::Number(_) => "Number",
            Node::Address(_) => "Address",
            Node::Mask(_) => "Mask",
            Node::Text(_) => "Text",
            Node::CountryCode(_) => "CountryCode",
            Node::ProtoKey(_) => "ProtoKey",
            Node::EtypeKey(_) => "EtypeKey",
            Node::StatusKey(_) => "StatusKey",
            Node::TcpFlagsKey(_) => "TcpFlagsKey",
            Node::DscpKey(_) => "DscpKey",
            Node::EcnKey(_) => "EcnKey",
            Node::RpkiKey(_) => "RpkiKey",
        }
    }
}

/// Trait used to visit all nodes in the AST.
///
/// The default `visit` just descends. An implementation does its own work
/// before or after calling [`Node::walk`]; an error stops the traversal.
pub trait Visitor<'a>: Sized {
    type Error;

    #[inline]
    fn visit(&mut self, node: Node<'a>) -> Result<(), Self::Error> {
        node.walk(self)
    }
}

/// Visits an expression tree from its root.
pub fn visit<'a, V: Visitor<'a>>(root: &'a Expression, visitor: &mut V) -> Result<(), V::Error> {
    visitor.visit(Node::Expression(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use std::convert::Infallible;

    #[derive(Default)]
    struct NodeNames(Vec<&'static str>);

    impl<'a> Visitor<'a> for NodeNames {
        type Error = Infallible;

        fn visit(&mut self, node: Node<'a>) -> Result<(), Infallible> {
            self.0.push(node.name());
            node.walk(self)
        }
    }

    fn names(filter: &str) -> Vec<&'static str> {
        let expr = parse(filter).unwrap();
        let mut names = NodeNames::default();
        visit(&expr, &mut names).unwrap();
        names.0
    }

    #[test]
    fn test_walk_order() {
        assert_eq!(names(""), ["Expression"]);
        assert_eq!(
            names("not src address 10.0.0.0/8 or proto tcp"),
            [
                "Expression",
                "Statement",
                "Negation",
                "DirectionalMatchGroup",
                "Direction",
                "DirectionalMatch",
                "Address",
                "Mask",
                "Conjunction",
                "Expression",
                "Statement",
                "RegularMatchGroup",
                "RegularMatch",
                "ProtoKey",
            ]
        );
        assert_eq!(
            names("(normalized)"),
            [
                "Expression",
                "Statement",
                "Expression",
                "Statement",
                "RegularMatchGroup",
                "RegularMatch",
            ]
        );
    }

    struct FirstNumber;

    impl<'a> Visitor<'a> for FirstNumber {
        type Error = u64;

        fn visit(&mut self, node: Node<'a>) -> Result<(), u64> {
            match node {
                Node::Number(n) => Err(n),
                _ => node.walk(self),
            }
        }
    }

    #[test]
    fn test_error_stops_walk() {
        // ranges and keys are not numbers
        let expr = parse("port 5 and proto tcp").unwrap();
        assert_eq!(visit(&expr, &mut FirstNumber), Ok(()));

        let expr = parse("iface 7 and proto 9").unwrap();
        assert_eq!(visit(&expr, &mut FirstNumber), Err(7));
    }

    #[test]
    fn test_default_visit() {
        struct Nothing;
        impl Visitor<'_> for Nothing {
            type Error = ();
        }

        let expr = parse("src port 1-2 and (country de or rpki valid)").unwrap();
        assert_eq!(visit(&expr, &mut Nothing), Ok(()));
    }
}
