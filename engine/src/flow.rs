use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A flow record as produced by the collector pipeline.
///
/// Addresses are kept as raw bytes: 4 for IPv4, 16 for IPv6. Missing fields
/// deserialize to their zero value.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowRecord {
    pub src_addr: Vec<u8>,
    pub dst_addr: Vec<u8>,
    pub src_port: u32,
    pub dst_port: u32,
    pub src_as: u32,
    pub dst_as: u32,
    pub src_net: u32,
    pub dst_net: u32,
    pub ingress_vrf_id: u32,
    pub egress_vrf_id: u32,

    pub in_if: u32,
    pub out_if: u32,
    pub src_if_name: String,
    pub src_if_desc: String,
    /// Interface speed in kbit/s.
    pub src_if_speed: u32,
    pub dst_if_name: String,
    pub dst_if_desc: String,
    pub dst_if_speed: u32,

    pub bytes: u64,
    pub packets: u64,
    /// Seconds since the epoch.
    pub time_flow_start: u64,
    pub time_flow_end: u64,

    pub sampler_address: Vec<u8>,
    pub next_hop: Vec<u8>,
    pub remote_country: String,
    pub etype: u32,
    pub proto: u32,
    pub forwarding_status: u32,
    pub tcp_flags: u32,
    pub ip_tos: u32,
    pub sampling_rate: u64,
    /// 0 for incoming, 1 for outgoing.
    pub flow_direction: u32,
    pub normalized: u32,
    pub src_cid: u32,
    pub dst_cid: u32,

    pub as_path: Vec<u32>,
    pub med: u32,
    pub local_pref: u32,
    pub next_hop_as: u32,
    pub validation_status: u32,
}

impl FlowRecord {
    pub fn src_ip(&self) -> Option<IpAddr> {
        address_from_bytes(&self.src_addr)
    }

    pub fn dst_ip(&self) -> Option<IpAddr> {
        address_from_bytes(&self.dst_addr)
    }

    pub fn sampler_ip(&self) -> Option<IpAddr> {
        address_from_bytes(&self.sampler_address)
    }

    pub fn next_hop_ip(&self) -> Option<IpAddr> {
        address_from_bytes(&self.next_hop)
    }

    /// Flow duration in seconds; zero if the end precedes the start.
    pub fn duration(&self) -> u64 {
        self.time_flow_end.saturating_sub(self.time_flow_start)
    }

    /// Bits per second, treating a zero duration as one second.
    pub fn bps(&self) -> u64 {
        self.bytes.saturating_mul(8) / self.duration().max(1)
    }

    pub fn pps(&self) -> u64 {
        self.packets / self.duration().max(1)
    }
}

/// IPv4-mapped IPv6 addresses become plain IPv4.
pub fn canonical_address(address: IpAddr) -> IpAddr {
    match address {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(address, IpAddr::V4),
        IpAddr::V4(_) => address,
    }
}

/// Reads a 4 or 16 byte address; any other length has no address.
pub fn address_from_bytes(raw: &[u8]) -> Option<IpAddr> {
    let address = if let Ok(octets) = <[u8; 4]>::try_from(raw) {
        IpAddr::V4(Ipv4Addr::from(octets))
    } else if let Ok(octets) = <[u8; 16]>::try_from(raw) {
        IpAddr::V6(Ipv6Addr::from(octets))
    } else {
        return None;
    };
    Some(canonical_address(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses() {
        assert_eq!(
            address_from_bytes(&[10, 0, 0, 1]),
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
        );
        let mut mapped = [0; 16];
        mapped[10] = 0xff;
        mapped[11] = 0xff;
        mapped[12..].copy_from_slice(&[10, 0, 0, 1]);
        assert_eq!(
            address_from_bytes(&mapped),
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert_eq!(address_from_bytes(&[]), None);
        assert_eq!(address_from_bytes(&[1, 2, 3]), None);
    }

    #[test]
    fn test_rates() {
        let flow = FlowRecord {
            bytes: 20_490_000,
            packets: 400,
            time_flow_start: 10_000,
            time_flow_end: 10_250,
            ..FlowRecord::default()
        };
        assert_eq!(flow.duration(), 250);
        assert_eq!(flow.bps(), 655_680);
        assert_eq!(flow.pps(), 1);

        let instant = FlowRecord {
            bytes: 10,
            packets: 3,
            time_flow_start: 7,
            time_flow_end: 7,
            ..FlowRecord::default()
        };
        assert_eq!(instant.bps(), 80);
        assert_eq!(instant.pps(), 3);

        let backwards = FlowRecord {
            time_flow_start: 10,
            time_flow_end: 5,
            ..FlowRecord::default()
        };
        assert_eq!(backwards.duration(), 0);
    }

    #[test]
    fn test_deserialize_defaults() {
        let flow: FlowRecord =
            serde_json::from_str(r#"{"proto": 6, "src_addr": [10, 0, 0, 1]}"#).unwrap();
        assert_eq!(flow.proto, 6);
        assert_eq!(flow.src_ip(), Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert_eq!(flow.dst_port, 0);
        assert!(flow.as_path.is_empty());
    }
}
