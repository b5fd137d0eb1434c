//! Object-storage listing clients.
//!
//! The [`client::ListingClient`] trait abstracts over which service answers
//! listing calls.  Implementations include the AWS SDK client and a
//! scripted in-memory client.

pub mod aws;
pub mod client;
pub mod memory;
