//! Policy documents: typed schema and validating parser.
//!
//! A policy describes, per destination, which navigations are allowed and
//! which are blocked, plus in-page rules for hiding elements and intercepting
//! links. Documents arrive untyped (remote fetch or the bundled default) and
//! are validated as a whole before anything else sees them.
//!
//! ## Example
//!
//! ```rust,ignore
//! use navgate::policy;
//!
//! let policy = policy::parse_str(include_str!("policy.json"))?;
//! for id in policy.destination_ids() {
//!     println!("{id}: {}", policy.destination(id)?.start);
//! }
//! ```

mod parser;
mod schema;
mod validator;

pub use parser::{
    ValidationReport, get_version, list_destination_ids, parse, parse_str, validate,
};
pub use schema::{DestinationPolicy, DomRules, FilterMode, FilterModeLevel, Policy};
pub use validator::POLICY_SCHEMA_JSON;
