mod expr;
mod matches;
mod parse;
mod range;
pub mod visitor;

pub use self::{
    expr::{Expression, Statement, StatementBody},
    matches::{
        AddressMatch, Code, DirectionalMatch, DirectionalMatchGroup, IcmpMatch, InterfaceMatch,
        RegularMatch, RegularMatchGroup,
    },
    parse::{parse, FilterParser, ParseError, ParseErrorKind, ParserSettings},
    range::NumericRange,
};
