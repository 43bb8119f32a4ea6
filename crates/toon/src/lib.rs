//! TOON: a compact tabular text format for arrays of uniform flat records.
//!
//! The format exists to keep model prompts and responses token-efficient
//! compared to verbose JSON. A table is a header line
//! `name[N]{field1,field2}:` followed by one two-space-indented,
//! comma-joined row per record:
//!
//! ```text
//! requirements[2]{id,name,priority}:
//!   FR-001,User login,must
//!   FR-002,"Audit, with commas",should
//! ```
//!
//! Scalar-only tables round-trip exactly. Nested tables are not supported.

pub mod decode;
pub mod encode;
pub mod lexer;
pub mod table;

pub use decode::{decode, decode_lenient, ToonError};
pub use encode::encode;
pub use table::Table;
