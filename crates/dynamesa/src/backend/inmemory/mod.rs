//! In-memory backend.
//!
//! Keeps tables in process memory and evaluates conditions directly, with
//! the service's paging rules: rows are read in key order, a page holds at
//! most `page_size` rows, and filters apply after a page is read.

mod backend;

pub use backend::InMemoryBackend;
