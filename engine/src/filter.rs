use crate::{
    ast::{
        visitor::{visit, Node, Visitor},
        DirectionalMatch, Expression, IcmpMatch, InterfaceMatch, NumericRange, RegularMatch,
    },
    errors::{RangeError, RangeKind},
    flow::{canonical_address, FlowRecord},
    token::{Conjunction, Direction, FlowDirection},
};
use tracing::debug;

const PROTO_ICMP: u32 = 1;
const PROTO_TCP: u32 = 6;

/// Partial result of a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Single(bool),
    Sided { src: bool, dst: bool },
}

/// Evaluates expressions against flow records.
///
/// The result stack lives here rather than in the tree, so a parsed filter
/// can be shared between threads while each thread owns its `FlowFilter`.
/// Reusing one across records keeps the stack allocation.
#[derive(Debug, Default)]
pub struct FlowFilter {
    results: Vec<Outcome>,
}

impl FlowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `flow` matches `expr`. Fails on the first inverted range.
    pub fn check_flow(&mut self, expr: &Expression, flow: &FlowRecord) -> Result<bool, RangeError> {
        self.results.clear();
        let mut evaluation = Evaluation {
            flow,
            results: &mut self.results,
        };
        if let Err(err) = visit(expr, &mut evaluation) {
            debug!(%err, "flow evaluation aborted");
            return Err(err);
        }
        Ok(evaluation.pop())
    }
}

/// Checks one record with a fresh [`FlowFilter`].
pub fn check_flow(expr: &Expression, flow: &FlowRecord) -> Result<bool, RangeError> {
    FlowFilter::new().check_flow(expr, flow)
}

struct Evaluation<'f> {
    flow: &'f FlowRecord,
    results: &'f mut Vec<Outcome>,
}

impl Evaluation<'_> {
    fn push(&mut self, result: bool) {
        self.results.push(Outcome::Single(result));
    }

    fn pop(&mut self) -> bool {
        match self.results.pop() {
            Some(Outcome::Single(result)) => result,
            outcome => unreachable!("expected a single result, found {outcome:?}"),
        }
    }

    fn pop_sided(&mut self) -> (bool, bool) {
        match self.results.pop() {
            Some(Outcome::Sided { src, dst }) => (src, dst),
            outcome => unreachable!("expected a directional result, found {outcome:?}"),
        }
    }

    fn directional(&self, body: &DirectionalMatch) -> Result<(bool, bool), RangeError> {
        let flow = self.flow;
        match body {
            DirectionalMatch::Address(address) => Ok((
                address.matches(flow.src_ip()),
                address.matches(flow.dst_ip()),
            )),
            DirectionalMatch::Interface(iface) => match iface {
                InterfaceMatch::Id(id) => Ok((
                    u64::from(flow.in_if) == *id,
                    u64::from(flow.out_if) == *id,
                )),
                InterfaceMatch::Name(name) => Ok((
                    contains_ignore_case(&flow.src_if_name, name),
                    contains_ignore_case(&flow.dst_if_name, name),
                )),
                InterfaceMatch::Description(desc) => Ok((
                    contains_ignore_case(&flow.src_if_desc, desc),
                    contains_ignore_case(&flow.dst_if_desc, desc),
                )),
                // speeds are kept in kbit/s, filters speak Mbit/s
                InterfaceMatch::Speed(range) => sides(
                    RangeKind::InterfaceSpeed,
                    range,
                    u64::from(flow.src_if_speed / 1000),
                    u64::from(flow.dst_if_speed / 1000),
                ),
            },
            DirectionalMatch::Port(range) => sides(
                RangeKind::Port,
                range,
                flow.src_port.into(),
                flow.dst_port.into(),
            ),
            DirectionalMatch::Asn(range) => {
                sides(RangeKind::Asn, range, flow.src_as.into(), flow.dst_as.into())
            }
            DirectionalMatch::Netsize(range) => sides(
                RangeKind::Netsize,
                range,
                flow.src_net.into(),
                flow.dst_net.into(),
            ),
            DirectionalMatch::Cid(range) => {
                sides(RangeKind::Cid, range, flow.src_cid.into(), flow.dst_cid.into())
            }
            DirectionalMatch::Vrf(range) => sides(
                RangeKind::Vrf,
                range,
                flow.ingress_vrf_id.into(),
                flow.egress_vrf_id.into(),
            ),
        }
    }

    fn regular(&self, body: &RegularMatch) -> Result<bool, RangeError> {
        let flow = self.flow;
        Ok(match body {
            RegularMatch::Router(address) => {
                flow.sampler_ip() == Some(canonical_address(*address))
            }
            RegularMatch::NextHop(address) => {
                flow.next_hop_ip() == Some(canonical_address(*address))
            }
            RegularMatch::Bytes(range) => range.contains(RangeKind::Bytes, flow.bytes)?,
            RegularMatch::Packets(range) => range.contains(RangeKind::Packets, flow.packets)?,
            RegularMatch::Country(code) => flow
                .remote_country
                .to_uppercase()
                .contains(&code.to_uppercase()),
            RegularMatch::FlowDirection(FlowDirection::Incoming) => flow.flow_direction == 0,
            RegularMatch::FlowDirection(FlowDirection::Outgoing) => flow.flow_direction == 1,
            RegularMatch::Normalized => flow.normalized == 1,
            RegularMatch::Duration(range) => range.contains(RangeKind::Duration, flow.duration())?,
            RegularMatch::Etype(code) => u64::from(flow.etype) == code.value(),
            RegularMatch::Proto(code) => u64::from(flow.proto) == code.value(),
            RegularMatch::Status(code) => code.matches_flags(flow.forwarding_status.into()),
            RegularMatch::TcpFlags(code) => {
                flow.proto == PROTO_TCP && code.matches_flags(flow.tcp_flags.into())
            }
            RegularMatch::IpTos(range) => range.contains(RangeKind::IpTos, flow.ip_tos.into())?,
            RegularMatch::Dscp(code) => u64::from(flow.ip_tos >> 2) == code.value(),
            RegularMatch::Ecn(code) => u64::from(flow.ip_tos & 0b11) == code.value(),
            RegularMatch::SamplingRate(range) => {
                range.contains(RangeKind::SamplingRate, flow.sampling_rate)?
            }
            // type and code travel in the destination port
            RegularMatch::Icmp(icmp) => {
                let (observed, expected) = match *icmp {
                    IcmpMatch::Type(icmp_type) => (flow.dst_port / 256, icmp_type),
                    IcmpMatch::Code(icmp_code) => (flow.dst_port % 256, icmp_code),
                };
                flow.proto == PROTO_ICMP && u64::from(observed) == expected
            }
            RegularMatch::Bps(range) => range.contains(RangeKind::Bps, flow.bps())?,
            RegularMatch::Pps(range) => range.contains(RangeKind::Pps, flow.pps())?,
            RegularMatch::PassesThrough(range) => {
                range.check(RangeKind::PassesThrough)?;
                flow.as_path.iter().any(|&asn| range.includes(asn.into()))
            }
            RegularMatch::Med(range) => range.contains(RangeKind::Med, flow.med.into())?,
            RegularMatch::LocalPref(range) => {
                range.contains(RangeKind::LocalPref, flow.local_pref.into())?
            }
            RegularMatch::NextHopAsn(range) => {
                range.contains(RangeKind::NextHopAsn, flow.next_hop_as.into())?
            }
            RegularMatch::Rpki(code) => u64::from(flow.validation_status) == code.value(),
        })
    }
}

fn sides(
    kind: RangeKind,
    range: &NumericRange,
    src: u64,
    dst: u64,
) -> Result<(bool, bool), RangeError> {
    Ok((range.contains(kind, src)?, range.contains(kind, dst)?))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl<'a> Visitor<'a> for Evaluation<'_> {
    type Error = RangeError;

    fn visit(&mut self, node: Node<'a>) -> Result<(), RangeError> {
        node.walk(self)?;

        match node {
            Node::Expression(expr) => {
                let result = match expr {
                    Expression::Empty => true,
                    Expression::Single(_) => self.pop(),
                    Expression::Conjunction { op, .. } => {
                        let right = self.pop();
                        let left = self.pop();
                        match op {
                            Conjunction::And => left && right,
                            Conjunction::Or => left || right,
                        }
                    }
                };
                self.push(result);
            }
            Node::Statement(statement) => {
                let result = self.pop();
                self.push(result != statement.negated);
            }
            Node::DirectionalMatchGroup(group) => {
                let (src, dst) = self.pop_sided();
                self.push(match group.direction {
                    Some(Direction::Src) => src,
                    Some(Direction::Dst) => dst,
                    None => src || dst,
                });
            }
            Node::DirectionalMatch(body) => {
                let (src, dst) = self.directional(body)?;
                self.results.push(Outcome::Sided { src, dst });
            }
            Node::RegularMatchGroup(_) => {
                let result = self.pop();
                self.push(result);
            }
            Node::RegularMatch(body) => {
                let result = self.regular(body)?;
                self.push(result);
            }
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
            | Node::RpkiKey(_) => {}
        }

        Ok(())
    }
}
