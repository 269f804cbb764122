//! SQL text processing: placeholder translation and pagination rewrites.

pub mod pagination;
pub mod scanner;
mod translate;

pub use pagination::{paginate, Paginated};
pub use translate::{translate, PreparedTemplate, QueryTranslator};
