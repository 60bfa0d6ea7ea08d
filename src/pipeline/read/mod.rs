// Read side: paginated fetch, derived fields, cached table, cascading filters

pub mod cache;
pub mod expand;
pub mod fetch;
pub mod filter;

pub use cache::{Invalidate, ResultCache};
pub use expand::{expand, expand_row};
pub use fetch::PaginatedFetcher;
pub use filter::{Dimension, FilterEngine, FilterOptions, FilterStage, OptionScope, Selections};
