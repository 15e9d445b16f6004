//! MonetDB MAPI protocol.
//!
//! # Messaging Overview
//!
//! All communication is a stream of text messages. On the wire each message is
//! cut into blocks, see [`block`] for the framing.
//!
//! ```text
//! | u16 le            | payload
//! |-------------------|--------
//! | len << 1 | final  | ..
//! ```
//!
//! # Session Overview
//!
//! - server sends a login [challenge][auth::Challenge]
//! - client answers with a salted password digest
//! - server sends an empty message (the prompt) on success, or an error message
//! - client sends commands, one at a time, the server answers each with exactly one message
//!
//! SQL commands are sent as `s<query>;`. Protocol directives such as
//! `Xreply_size -1` are sent verbatim.
//!
//! # Responses
//!
//! | leading   | meaning                            |
//! |-----------|------------------------------------|
//! | (empty)   | prompt, nothing to report          |
//! | `!`       | error                              |
//! | `&1`      | table result                       |
//! | `&5`      | prepared statement                 |
//! | `^`       | redirect, another challenge follows |
//! | other     | success without table              |
pub mod block;
pub mod auth;
pub mod message;
pub mod table;
pub mod tuple;
pub mod error;

pub use block::{BlockDecoder, BlockHeader};
pub use message::{Message, ResultKind};
pub use error::{AuthError, DatabaseError, ProtocolError};
