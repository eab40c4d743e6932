//! A filter language over network flow records.
//!
//! ```
//! use flowfilter::{check_flow, parse, FlowRecord};
//!
//! let expr = parse("proto tcp and dst port 443").unwrap();
//! let flow = FlowRecord {
//!     proto: 6,
//!     dst_port: 443,
//!     ..FlowRecord::default()
//! };
//! assert_eq!(check_flow(&expr, &flow), Ok(true));
//! assert_eq!(expr.to_string(), "proto tcp and dst port 443");
//! ```
#![warn(missing_debug_implementations, rust_2018_idioms)]

#[macro_use]
mod lex;

pub mod ast;
mod errors;
mod filter;
mod flow;
pub mod magic;
mod printer;
mod token;

pub use self::{
    ast::{
        parse, AddressMatch, Code, DirectionalMatch, DirectionalMatchGroup, Expression,
        FilterParser, IcmpMatch, InterfaceMatch, NumericRange, ParseError, ParseErrorKind,
        ParserSettings, RegularMatch, RegularMatchGroup, Statement, StatementBody,
    },
    errors::{RangeError, RangeKind, UnknownNodeError},
    filter::{check_flow, FlowFilter},
    flow::{address_from_bytes, FlowRecord},
    lex::{LexError, LexErrorKind},
    printer::{render, Printer},
    token::{
        tokenize, Command, Conjunction, Direction, FlowDirection, IcmpCommand, IfaceCommand,
        Token, TokenKind,
    },
};
