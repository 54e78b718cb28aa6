//! Postgres implementation of the grant portal `PortalStore` port.
//!
//! Every collection is a set of JSONB documents in one table. Composite
//! operations run in a single transaction, serialised per collection with
//! transaction-scoped advisory locks.

mod documents;
mod schema;
mod store;

pub use schema::initialize_schema;
pub use store::PgPortalStore;
