//! Keyword tables for the symbolic values of flow fields.
//!
//! Each table maps a keyword (`tcp`, `ipv6`, `acldrop`, ...) to the numeric
//! code it stands for. The lexer uses the keyword columns to classify words,
//! the parser to resolve them and the printer to turn codes back into words.

use crate::lex::{expect_word, LexError, LexErrorKind};
use fnv::{FnvBuildHasher, FnvHashMap};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt::{self, Debug, Formatter};
use std::sync::LazyLock;

/// A bidirectional keyword table.
pub struct MagicTable {
    name: &'static str,
    codes: IndexMap<&'static str, u64, FnvBuildHasher>,
    keywords: FnvHashMap<u64, &'static str>,
}

impl MagicTable {
    fn new(name: &'static str, entries: &[(&'static str, u64)]) -> Self {
        let mut codes = IndexMap::with_capacity_and_hasher(entries.len(), FnvBuildHasher::default());
        let mut keywords = FnvHashMap::default();
        for &(keyword, code) in entries {
            codes.insert(keyword, code);
            // first keyword wins the reverse lookup
            keywords.entry(code).or_insert(keyword);
        }
        MagicTable {
            name,
            codes,
            keywords,
        }
    }

    /// Name of the field this table describes.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Code of a keyword, if it belongs to this table.
    pub fn code(&self, keyword: &str) -> Option<u64> {
        self.codes.get(keyword).copied()
    }

    /// Canonical keyword for a code.
    pub fn keyword(&self, code: u64) -> Option<&'static str> {
        self.keywords.get(&code).copied()
    }

    /// All keywords in declaration order.
    pub fn keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.codes.keys().copied()
    }

    /// Consumes one of this table's keywords as a whole word.
    pub(crate) fn lex_keyword<'i>(&self, input: &'i str) -> Result<&'i str, LexError<'i>> {
        self.keywords()
            .find_map(|keyword| expect_word(input, keyword).ok())
            .ok_or((LexErrorKind::ExpectedName(self.name), input))
    }
}

impl Debug for MagicTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MagicTable")
            .field("name", &self.name)
            .field("codes", &self.codes)
            .finish()
    }
}

pub static ECN: LazyLock<MagicTable> =
    LazyLock::new(|| MagicTable::new("ecn", &[("ce", 0b11), ("ect1", 0b01), ("ect0", 0b10)]));

pub static DSCP: LazyLock<MagicTable> =
    LazyLock::new(|| MagicTable::new("dscp", &[("default", 0), ("besteffort", 0)]));

pub static ETYPE: LazyLock<MagicTable> = LazyLock::new(|| {
    MagicTable::new(
        "etype",
        &[("ipv4", 0x0800), ("arp", 0x0806), ("ipv6", 0x86DD)],
    )
});

pub static PROTO: LazyLock<MagicTable> = LazyLock::new(|| {
    MagicTable::new(
        "proto",
        &[
            ("icmp", 1),
            ("tcp", 6),
            ("udp", 17),
            ("icmpv6", 58),
            ("ipip", 94),
            ("vrrp", 112),
        ],
    )
});

pub static STATUS: LazyLock<MagicTable> = LazyLock::new(|| {
    MagicTable::new(
        "status",
        &[
            ("forwarded", 0b0100_0000),
            ("dropped", 0b1000_0000),
            ("acldeny", 0b1000_0001),
            ("acldrop", 0b1000_0010),
            ("unroutable", 0b1000_0011),
            ("consumed", 0b1100_0000),
            ("policerdrop", 0b1000_1010),
        ],
    )
});

pub static TCP_FLAGS: LazyLock<MagicTable> = LazyLock::new(|| {
    MagicTable::new(
        "tcpflags",
        &[
            ("fin", 0b1),
            ("finack", 0b1_0001),
            ("syn", 0b10),
            ("rst", 0b100),
            ("psh", 0b1000),
            ("ack", 0b1_0000),
            ("urg", 0b10_0000),
            ("synack", 0b1_0010),
            ("cwr", 0b1000_0000),
            ("ece", 0b1_0000_0000),
        ],
    )
});

pub static RPKI: LazyLock<MagicTable> = LazyLock::new(|| {
    MagicTable::new(
        "rpki",
        &[("unknown", 0), ("valid", 1), ("notfound", 2), ("invalid", 3)],
    )
});

/// A code that was written as a keyword of one of the tables.
pub trait MagicKey: Copy {
    fn table() -> &'static MagicTable;

    fn from_code(code: u64) -> Self;

    fn code(self) -> u64;

    fn keyword(self) -> Option<&'static str> {
        Self::table().keyword(self.code())
    }
}

macro_rules! magic_key {
    ($(#[$meta:meta])* $name:ident => $table:ident) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
        pub struct $name(u64);

        impl MagicKey for $name {
            fn table() -> &'static MagicTable {
                &$table
            }

            fn from_code(code: u64) -> Self {
                $name(code)
            }

            fn code(self) -> u64 {
                self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
                match self.keyword() {
                    Some(keyword) => ser.serialize_str(keyword),
                    None => ser.serialize_u64(self.0),
                }
            }
        }
    };
}

magic_key!(
    /// Explicit congestion notification bits of the IP TOS byte.
    EcnKey => ECN
);
magic_key!(
    /// Differentiated services code point.
    DscpKey => DSCP
);
magic_key!(EtypeKey => ETYPE);
magic_key!(ProtoKey => PROTO);
magic_key!(
    /// Forwarding status mask.
    StatusKey => STATUS
);
magic_key!(
    /// TCP flags mask.
    TcpFlagsKey => TCP_FLAGS
);
magic_key!(
    /// RPKI route origin validation state.
    RpkiKey => RPKI
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(PROTO.code("tcp"), Some(6));
        assert_eq!(PROTO.code("tcpx"), None);
        assert_eq!(PROTO.keyword(17), Some("udp"));
        assert_eq!(PROTO.keyword(200), None);
        assert_eq!(ETYPE.code("ipv6"), Some(0x86DD));
        assert_eq!(STATUS.code("acldrop"), Some(0b1000_0010));
        assert_eq!(TCP_FLAGS.code("ece"), Some(256));
    }

    #[test]
    fn test_first_keyword_wins() {
        assert_eq!(DSCP.code("besteffort"), Some(0));
        assert_eq!(DSCP.keyword(0), Some("default"));
    }

    #[test]
    fn test_declaration_order() {
        assert_eq!(
            RPKI.keywords().collect::<Vec<_>>(),
            ["unknown", "valid", "notfound", "invalid"]
        );
    }

    #[test]
    fn test_lex_keyword() {
        assert_eq!(TCP_FLAGS.lex_keyword("synack rest"), Ok(" rest"));
        assert_eq!(TCP_FLAGS.lex_keyword("syn)"), Ok(")"));
        assert_eq!(PROTO.lex_keyword("icmpv6"), Ok(""));
        assert_eq!(
            PROTO.lex_keyword("icmpv7"),
            Err((LexErrorKind::ExpectedName("proto"), "icmpv7"))
        );
    }

    #[test]
    fn test_serialize() {
        assert_json!(ProtoKey::from_code(6), "tcp");
        assert_json!(ProtoKey::from_code(99), 99);
        assert_json!(DscpKey::from_code(0), "default");
    }
}
