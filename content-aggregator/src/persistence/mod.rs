//! Storage for favorites and the manual content order.
//!
//! All three backends speak the same read and write shapes, so stores and
//! the reconciler never know which one they are talking to.

pub mod http;
pub mod memory;
pub mod postgres;

pub use http::HttpBackend;
pub use memory::MemoryBackend;
pub use postgres::PgBackend;
