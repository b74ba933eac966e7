pub mod stage1_compare;
pub mod stage2_match;
pub mod stage3_cross;

pub use stage1_compare::*;
pub use stage2_match::*;
pub use stage3_cross::*;
