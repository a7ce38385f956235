//! Terra Query
//!
//! Declarative entity selection for event handlers.
//!
//! Responsibilities:
//! - Queries: by id, id list, secondary-index key(s), with frozen/optional
//!   modifiers and required components
//! - Involved and prepare specifications: the named read/write set of one
//!   event, including new-id and access-check requests
//! - Expand specifications into the concrete ids to fetch, skipping
//!   unresolved index keys
//! - Count and bound new-id requests
//! - Match fetched entities against queries

mod error;
mod involved;
mod query;
mod resolve;
mod satisfy;

pub use error::{QueryError, QueryResult};
pub use involved::{Involved, InvolvedSpec, PrepareSpec};
pub use query::{q, Query, QueryTarget};
pub use resolve::{
    count_new_ids, determine_ids, determine_ids_used, index_keys, IndexResolver, IndexSnapshot,
    Lookup,
};
pub use satisfy::{satisfy_query, EntitySource, QueryMatch};
