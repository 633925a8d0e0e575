//! Request middleware: the auth gate, the query-parameter key guard, and
//! the post-response usage tracker.

pub mod auth;
pub mod guard;
pub mod usage;
