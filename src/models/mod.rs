pub mod columns;
pub mod posting;
pub mod report;
pub mod table;

pub use posting::*;
pub use report::*;
pub use table::*;
