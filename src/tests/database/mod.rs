//! Store-level tests against real SQLite files.

mod histories;
mod messages;
