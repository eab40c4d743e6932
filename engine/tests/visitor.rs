mod common;

use flowfilter::{
    ast::visitor::{visit, Node, Visitor},
    check_flow, parse, Expression, FlowFilter, UnknownNodeError,
};
use std::net::IpAddr;

/// Collects the addresses a filter mentions and refuses anything it does not
/// know how to traverse.
#[derive(Default)]
struct Addresses(Vec<IpAddr>);

impl<'a> Visitor<'a> for Addresses {
    type Error = UnknownNodeError;

    fn visit(&mut self, node: Node<'a>) -> Result<(), UnknownNodeError> {
        match node {
            Node::Address(address) => {
                self.0.push(*address);
                Ok(())
            }
            Node::Expression(_)
            | Node::Statement(_)
            | Node::Conjunction(_)
            | Node::Negation
            | Node::DirectionalMatchGroup(_)
            | Node::Direction(_)
            | Node::DirectionalMatch(_)
            | Node::RegularMatchGroup(_)
            | Node::RegularMatch(_)
            | Node::Mask(_)
            | Node::Range(_) => node.walk(self),
            _ => Err(UnknownNodeError::new(node)),
        }
    }
}

#[test]
fn external_visitor() {
    let expr = parse("src address 10.0.0.0/8 or (router 10.0.0.1 and port 1-2)").unwrap();
    let mut addresses = Addresses::default();
    assert_eq!(visit(&expr, &mut addresses), Ok(()));
    assert_eq!(
        addresses.0,
        ["10.0.0.0".parse::<IpAddr>().unwrap(), "10.0.0.1".parse().unwrap()]
    );
}

#[test]
fn unknown_node_propagates() {
    let expr = parse("address 10.0.0.1 and proto tcp and address 10.0.0.2").unwrap();
    let mut addresses = Addresses::default();
    assert_eq!(
        visit(&expr, &mut addresses),
        Err(UnknownNodeError { node: "ProtoKey" })
    );
    // the walk stopped at the failing node
    assert_eq!(addresses.0.len(), 1);
}

#[test]
fn shared_expression_across_threads() {
    let expr: Expression = parse("proto icmp and (port 1024 or bytes >5) and not status dropped").unwrap();
    let flow = common::flow();
    let tcp = common::tcp_flow();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let mut filter = FlowFilter::new();
                for _ in 0..1000 {
                    assert_eq!(filter.check_flow(&expr, &flow), Ok(true));
                    assert_eq!(filter.check_flow(&expr, &tcp), Ok(false));
                }
            });
        }
    });

    assert_eq!(check_flow(&expr, &flow), Ok(true));
}
