//! Call and reply payloads plus the error taxonomy.
//!
//! A wire-level call is a two-element tuple, `[Str(procedure),
//! Tuple(arguments)]`; a reply is a single element representing the return
//! value. A reply may instead be a *fault*, a reserved tuple shape carrying
//! an error kind and message, which clients surface as typed errors rather
//! than return values.

pub mod calls;
pub mod error;
pub mod replies;

pub use calls::{decode_call, encode_call};
pub use error::{Result, TagwireError};
pub use replies::{decode_reply, encode_fault, encode_reply, fault_of};
