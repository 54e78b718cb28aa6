//! Grant portal core
//!
//! Domain types and workflow rules for a yearly grant round:
//! - one current application cycle whose stage gates everything else
//! - applications with a content-addressed proposal PDF
//! - primary/secondary reviewer assignment and the review lifecycle
//! - funding decisions, applicant results and post-grant report tracking
//! - reviewer whitelist, account registration and FAQ entries
//!
//! Persistence goes through [`ports::PortalStore`]; [`memory::MemoryStore`] is
//! the in-process adapter, `grant_portal_postgres` the durable one.

pub mod application;
pub mod blob_store;
pub mod cycle;
pub mod decision;
pub mod error;
pub mod faq;
pub mod memory;
pub mod policy;
pub mod ports;
pub mod principal;
pub mod report;
pub mod review;
pub mod service;
pub mod users;
pub mod whitelist;

pub use error::{PortalError, Result};
pub use policy::{PortalPolicy, StagePolicy};
pub use principal::{Principal, Role};
pub use service::PortalService;
