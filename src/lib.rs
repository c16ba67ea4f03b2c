//! # mongocell
//!
//! Resolves what an analyst types into a notebook cell into an unambiguous
//! MongoDB command descriptor, without evaluating any of it.
//!
//! ## Quick Example
//!
//! ```rust
//! use mongocell::prelude::*;
//!
//! let defaults = SessionDefaults::new("prod").with_current_database("shop");
//! let cmd = mongocell::resolve(
//!     "db['events'].find({'_id': {'$in': ['a', 'b']}}, {'_id': 1})",
//!     InputKind::Chain,
//!     &defaults,
//! )?;
//!
//! assert_eq!(cmd.operation, Operation::Find);
//! assert_eq!(cmd.database.as_deref(), Some("shop"));
//! assert_eq!(cmd.collection.as_deref(), Some("events"));
//! assert_eq!(cmd.query_args.len(), 2);
//! # Ok::<(), mongocell::error::ParseError>(())
//! ```
//!
//! ## Input surfaces
//!
//! | Surface | Example |
//! |---------|---------|
//! | Chain   | `c['shop'].orders.find_one({status: 'open'})` |
//! | Admin   | `use shop`, `curdb`, `listdbs` |
//! | Line    | `show_collections -i prod -d shop` |
//! | Cell    | `find -i prod -d shop -c orders` + `{"a": 1}, {"_id": 0}` |

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod help;
pub mod parser;
pub mod session;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::engine::{dispatch, Backend, CatalogBackend, CollectionRef};
    pub use crate::error::*;
    pub use crate::format::{render, Rendered, Response};
    pub use crate::parser::{resolve, InputKind};
    pub use crate::session::{Catalog, Session, SessionDefaults};
}

/// Resolve typed input into a validated command descriptor.
///
/// # Example
///
/// ```
/// use mongocell::{resolve, parser::InputKind, session::SessionDefaults};
///
/// let cmd = resolve("show_dbs -i prod", InputKind::Line, &SessionDefaults::new("prod")).unwrap();
/// assert_eq!(cmd.database, None);
/// ```
pub fn resolve(
    raw: &str,
    kind: parser::InputKind,
    defaults: &session::SessionDefaults<'_>,
) -> error::ParseResult<ast::CommandDescriptor> {
    parser::resolve(raw, kind, defaults)
}
