//! Reference vertex programs.

mod page_rank;
mod shortest_path;

pub use page_rank::PageRankProgram;
pub use shortest_path::ShortestPathProgram;
