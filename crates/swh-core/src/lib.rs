//! # swh-core — Foundational Types for the Software Heritage Web Client
//!
//! This crate is the leaf of the workspace. It defines the value types every
//! other crate speaks in when it refers to an archived object.
//!
//! ## Key Design Principles
//!
//! 1. **Typed identifiers, not strings.** A [`Swhid`] carries its
//!    [`ObjectKind`] and a fixed-length digest. Once a payload has been typed,
//!    no hash travels through the system as a bare `String`.
//!
//! 2. **Single `ObjectKind` enum.** Five variants, exhaustive `match`
//!    everywhere. Adding a kind forces every dispatcher to handle it.
//!
//! 3. **Offset-preserving timestamps.** Archive dates are author-local; the
//!    [`ArchiveTimestamp`] alias keeps the original UTC offset instead of
//!    normalising it away.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `swh-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod swhid;
pub mod temporal;

pub use error::{SwhidError, TimestampError};
pub use swhid::{ObjectKind, Swhid, SWHID_DIGEST_LEN, SWHID_SCHEME_VERSION};
pub use temporal::{parse_timestamp, ArchiveTimestamp};
