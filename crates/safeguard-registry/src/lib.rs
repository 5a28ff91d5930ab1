//! safeguard-registry — Enrolled subject storage.
//!
//! Subjects live in a single SQLite table; each subject's photo is written
//! next to the database as `<upload_dir>/<id>.png`. Enrollment is
//! append-only and the most recently created subject is the active one.

mod store;

pub use store::{NewSubject, Subject, SubjectSource, SubjectStore, MAX_AGE};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("all fields required: {0} is empty")]
    MissingField(&'static str),
    #[error("age must be between 0 and {max}, got {got}")]
    InvalidAge { got: u32, max: u32 },
    #[error("stored timestamp is invalid: {0}")]
    InvalidTimestamp(String),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
}
