//! Query modules, one per table
//!
//! Functions take the pool and return `sqlx::Result`; handlers convert
//! errors into HTTP responses.

pub mod activity;
pub mod announcements;
pub mod departments;
pub mod documents;
pub mod feedback;
pub mod records;
pub mod timetables;
pub mod users;
