use crate::ast::visitor::Node;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// The quantity a numeric range was matched against.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    Bytes,
    Packets,
    Port,
    Asn,
    Netsize,
    Cid,
    Vrf,
    InterfaceSpeed,
    Duration,
    IpTos,
    SamplingRate,
    Bps,
    Pps,
    PassesThrough,
    Med,
    LocalPref,
    NextHopAsn,
}

impl Display for RangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RangeKind::Bytes => "byte count",
            RangeKind::Packets => "packet count",
            RangeKind::Port => "port",
            RangeKind::Asn => "asn",
            RangeKind::Netsize => "netsize",
            RangeKind::Cid => "cid",
            RangeKind::Vrf => "vrf",
            RangeKind::InterfaceSpeed => "interface speed",
            RangeKind::Duration => "duration",
            RangeKind::IpTos => "iptos",
            RangeKind::SamplingRate => "sampling rate",
            RangeKind::Bps => "bps",
            RangeKind::Pps => "pps",
            RangeKind::PassesThrough => "passes-through",
            RangeKind::Med => "med",
            RangeKind::LocalPref => "localpref",
            RangeKind::NextHopAsn => "nexthopasn",
        })
    }
}

/// A range whose lower bound is above its upper bound.
///
/// Ranges are validated when a flow is checked, so this is what
/// [`check_flow`](crate::check_flow) fails with.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("bad {kind} range, lower {lower} > upper {upper}")]
pub struct RangeError {
    pub kind: RangeKind,
    pub lower: u64,
    pub upper: u64,
}

/// A visitor met a node variant it does not know about.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("visitor does not handle {node} nodes")]
pub struct UnknownNodeError {
    pub node: &'static str,
}

impl UnknownNodeError {
    pub fn new(node: Node<'_>) -> Self {
        UnknownNodeError { node: node.name() }
    }
}

#[test]
fn test_display() {
    let err = RangeError {
        kind: RangeKind::Port,
        lower: 1024,
        upper: 10,
    };
    assert_eq!(err.to_string(), "bad port range, lower 1024 > upper 10");

    let err = UnknownNodeError::new(Node::Negation);
    assert_eq!(err.to_string(), "visitor does not handle Negation nodes");
}
