//! # userauth
//!
//! User registration and login over a PostgreSQL database. Every persistent
//! operation goes through a stored routine (`insert_user_and_role`,
//! `get_hashed_password`, `update_last_login`, ...); the service itself keeps
//! no state beyond the lifetime of a request.
//!
//! ## Credentials
//!
//! Passwords are hashed server side into PHC strings (Argon2id for new
//! records) and verified in constant time. Login failures always answer
//! `401` with the same message so callers cannot probe which emails exist.
//!
//! ## Errors
//!
//! Database failures are logged and answered with a generic `500`; the
//! underlying error text never reaches the client.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
