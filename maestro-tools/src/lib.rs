//! Tool Registry (L3, spec §4.3) and the retrieval tools layered on top of
//! it (L4, spec §4.4): document_search, web_search, web_page_fetcher,
//! arxiv_fetcher, calculator, file_reader.

pub mod arxiv_fetcher;
pub mod calculator;
pub mod document_search;
pub mod error;
pub mod file_reader;
pub mod registry;
pub mod schema;
pub mod vector_store;
pub mod web_page_fetcher;
pub mod web_search;

pub use error::{ToolError, ToolErrorKind};
pub use registry::{Tool, ToolRegistry};
pub use schema::{ToolCategory, ToolSchema};
