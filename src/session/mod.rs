//! Stream session table
//!
//! One record per currently-live stream: the creator's connection, the set
//! of subscribed viewer connections, the authoritative viewer count, and a
//! bounded ring of recent chat events. A session exists if and only if its
//! creator holds an active registered connection and has not stopped the
//! stream; when the creator's connection is removed for any reason the
//! session is destroyed and every viewer is notified.

pub mod entry;
pub mod error;
pub mod history;
pub mod table;

pub use entry::StreamSession;
pub use error::SessionError;
pub use history::ChatHistory;
pub use table::SessionTable;
