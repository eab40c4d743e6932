use super::range::NumericRange;
use crate::flow::canonical_address;
use crate::magic::{DscpKey, EcnKey, EtypeKey, MagicKey, ProtoKey, RpkiKey, StatusKey, TcpFlagsKey};
use crate::token::{Command, Direction, FlowDirection, IcmpCommand, IfaceCommand};
use cidr::{IpCidr, IpInet};
use serde::Serialize;
use std::net::IpAddr;

/// A field value given either as a number or as a table keyword.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
#[serde(untagged)]
pub enum Code<K> {
    Number(u64),
    Key(K),
}

impl<K: MagicKey> Code<K> {
    pub fn value(&self) -> u64 {
        match *self {
            Code::Number(n) => n,
            Code::Key(key) => key.code(),
        }
    }

    /// Keywords act as masks, numbers compare exactly.
    pub fn matches_flags(&self, observed: u64) -> bool {
        match *self {
            Code::Number(n) => observed == n,
            Code::Key(key) => observed & key.code() == key.code(),
        }
    }
}

/// A match that can be restricted to one side of the flow.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
pub struct DirectionalMatchGroup {
    /// Without a direction either side may match.
    pub direction: Option<Direction>,
    pub body: DirectionalMatch,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
pub enum DirectionalMatch {
    Address(AddressMatch),
    Interface(InterfaceMatch),
    Port(NumericRange),
    Asn(NumericRange),
    Netsize(NumericRange),
    Cid(NumericRange),
    Vrf(NumericRange),
}

impl DirectionalMatch {
    pub fn command(&self) -> Command {
        match self {
            DirectionalMatch::Address(_) => Command::Address,
            DirectionalMatch::Interface(_) => Command::Interface,
            DirectionalMatch::Port(_) => Command::Port,
            DirectionalMatch::Asn(_) => Command::Asn,
            DirectionalMatch::Netsize(_) => Command::Netsize,
            DirectionalMatch::Cid(_) => Command::Cid,
            DirectionalMatch::Vrf(_) => Command::Vrf,
        }
    }
}

/// An address, optionally with a prefix length.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub struct AddressMatch {
    pub address: IpAddr,
    pub mask: Option<u64>,
}

impl AddressMatch {
    /// The network selected by the prefix length, or `None` when the length
    /// does not fit the address family.
    pub fn network(&self) -> Option<IpCidr> {
        let mask = self.mask?;
        let len = u8::try_from(mask).ok()?;
        IpInet::new(canonical_address(self.address), len)
            .ok()
            .map(|inet| inet.network())
    }

    pub fn matches(&self, observed: Option<IpAddr>) -> bool {
        let Some(observed) = observed else {
            return false;
        };
        match self.mask {
            Some(_) => self
                .network()
                .is_some_and(|network| network.contains(&observed)),
            None => canonical_address(self.address) == observed,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
pub enum InterfaceMatch {
    Id(u64),
    Name(String),
    Description(String),
    Speed(NumericRange),
}

impl InterfaceMatch {
    /// Sub-command keyword; the id form is written without one.
    pub fn subcommand(&self) -> Option<IfaceCommand> {
        match self {
            InterfaceMatch::Id(_) => None,
            InterfaceMatch::Name(_) => Some(IfaceCommand::Name),
            InterfaceMatch::Description(_) => Some(IfaceCommand::Desc),
            InterfaceMatch::Speed(_) => Some(IfaceCommand::Speed),
        }
    }
}

/// A match over a property of the whole flow.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
#[serde(transparent)]
pub struct RegularMatchGroup {
    pub body: RegularMatch,
}

#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
pub enum RegularMatch {
    Router(IpAddr),
    NextHop(IpAddr),
    Bytes(NumericRange),
    Packets(NumericRange),
    Country(String),
    FlowDirection(FlowDirection),
    Normalized,
    Duration(NumericRange),
    Etype(Code<EtypeKey>),
    Proto(Code<ProtoKey>),
    Status(Code<StatusKey>),
    TcpFlags(Code<TcpFlagsKey>),
    IpTos(NumericRange),
    Dscp(Code<DscpKey>),
    Ecn(Code<EcnKey>),
    SamplingRate(NumericRange),
    Icmp(IcmpMatch),
    Bps(NumericRange),
    Pps(NumericRange),
    /// Any AS of the path is in range.
    PassesThrough(NumericRange),
    Med(NumericRange),
    LocalPref(NumericRange),
    NextHopAsn(NumericRange),
    Rpki(Code<RpkiKey>),
}

impl RegularMatch {
    /// Command keyword; `None` for the standalone forms.
    pub fn command(&self) -> Option<Command> {
        Some(match self {
            RegularMatch::Router(_) => Command::Router,
            RegularMatch::NextHop(_) => Command::NextHop,
            RegularMatch::Bytes(_) => Command::Bytes,
            RegularMatch::Packets(_) => Command::Packets,
            RegularMatch::Country(_) => Command::Country,
            RegularMatch::FlowDirection(_) | RegularMatch::Normalized => return None,
            RegularMatch::Duration(_) => Command::Duration,
            RegularMatch::Etype(_) => Command::Etype,
            RegularMatch::Proto(_) => Command::Proto,
            RegularMatch::Status(_) => Command::Status,
            RegularMatch::TcpFlags(_) => Command::TcpFlags,
            RegularMatch::IpTos(_) => Command::IpTos,
            RegularMatch::Dscp(_) => Command::Dscp,
            RegularMatch::Ecn(_) => Command::Ecn,
            RegularMatch::SamplingRate(_) => Command::SamplingRate,
            RegularMatch::Icmp(_) => Command::Icmp,
            RegularMatch::Bps(_) => Command::Bps,
            RegularMatch::Pps(_) => Command::Pps,
            RegularMatch::PassesThrough(_) => Command::PassesThrough,
            RegularMatch::Med(_) => Command::Med,
            RegularMatch::LocalPref(_) => Command::LocalPref,
            RegularMatch::NextHopAsn(_) => Command::NextHopAsn,
            RegularMatch::Rpki(_) => Command::Rpki,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub enum IcmpMatch {
    Type(u64),
    Code(u64),
}

impl IcmpMatch {
    pub fn subcommand(&self) -> IcmpCommand {
        match self {
            IcmpMatch::Type(_) => IcmpCommand::Type,
            IcmpMatch::Code(_) => IcmpCommand::Code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn address(address: &str, mask: Option<u64>) -> AddressMatch {
        AddressMatch {
            address: address.parse().unwrap(),
            mask,
        }
    }

    #[test]
    fn test_address_exact() {
        let v4 = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 200));
        assert!(address("10.0.0.200", None).matches(Some(v4)));
        assert!(!address("10.0.0.201", None).matches(Some(v4)));
        assert!(!address("10.0.0.200", None).matches(None));
        assert!(address("::ffff:10.0.0.200", None).matches(Some(v4)));
    }

    #[test]
    fn test_address_prefix() {
        let v4 = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 200)));
        assert!(address("10.0.0.0", Some(24)).matches(v4));
        assert!(address("10.0.0.77", Some(24)).matches(v4));
        assert!(!address("10.0.0.0", Some(30)).matches(v4));
        assert!(address("1.0.0.1", Some(0)).matches(v4));
        // longer than the family allows
        assert!(!address("10.0.0.200", Some(33)).matches(v4));
        assert!(!address("10.0.0.200", Some(300)).matches(v4));

        let v6 = Some(IpAddr::V6(Ipv6Addr::new(0x2001, 0x7c0, 0, 0x254, 0, 0, 0, 6)));
        assert!(address("2001:7c0:0:254::", Some(64)).matches(v6));
        assert!(!address("2001:7c0:0:255::", Some(64)).matches(v6));
        assert!(!address("10.0.0.0", Some(0)).matches(v6));
    }

    #[test]
    fn test_code() {
        let status: Code<StatusKey> = Code::Key(StatusKey::from_code(0b1000_0010));
        assert!(status.matches_flags(0b1000_0010));
        assert!(status.matches_flags(0b1000_0011));
        assert!(!status.matches_flags(0b0100_0010));

        let exact: Code<StatusKey> = Code::Number(0b1000_0010);
        assert!(!exact.matches_flags(0b1000_0011));
        assert_eq!(exact.value(), 130);
    }
}
