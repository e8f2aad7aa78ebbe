pub mod models;
pub mod repository;
pub mod writer;

pub use repository::{ProductRepository, SqliteRepository};
pub use writer::DbWriter;
