use flowfilter::FlowRecord;

/// A sampled ICMP flow from 10.0.0.200 to 2001:7c0:0:254::6.
pub fn flow() -> FlowRecord {
    FlowRecord {
        src_addr: vec![10, 0, 0, 200],
        dst_addr: vec![
            0x20, 0x01, 0x07, 0xc0, 0x00, 0x00, 0x02, 0x54, 0, 0, 0, 0, 0, 0, 0, 0x06,
        ],
        src_port: 0,
        dst_port: 1024,
        src_as: 553,
        dst_as: 12345,
        in_if: 1,
        out_if: 2,
        src_if_name: "Hu0/1/1/4".to_owned(),
        src_if_desc: "some IX".to_owned(),
        src_if_speed: 100_000,
        dst_if_name: "Te1/1/1/1".to_owned(),
        dst_if_desc: "customer".to_owned(),
        dst_if_speed: 10_000,
        src_net: 24,
        dst_net: 11,
        ingress_vrf_id: 1,
        egress_vrf_id: 2,
        sampler_address: vec![10, 0, 0, 1],
        next_hop: vec![10, 11, 0, 1],
        bytes: 20_490_000,
        packets: 400,
        flow_direction: 0,
        normalized: 0,
        time_flow_start: 10_000,
        time_flow_end: 10_250,
        remote_country: "DE".to_owned(),
        etype: 0x0800,
        proto: 1,
        forwarding_status: 0b0100_0010,
        tcp_flags: 0b01_0010,
        ip_tos: 0b11,
        sampling_rate: 32,
        src_cid: 123,
        dst_cid: 0,
        as_path: vec![553, 680, 12345],
        med: 10,
        local_pref: 100,
        next_hop_as: 680,
        validation_status: 1,
    }
}

/// The fixture as a TCP flow.
#[allow(dead_code)]
pub fn tcp_flow() -> FlowRecord {
    FlowRecord {
        proto: 6,
        dst_port: 443,
        src_port: 51000,
        remote_country: "NL".to_owned(),
        flow_direction: 1,
        normalized: 1,
        ..flow()
    }
}
