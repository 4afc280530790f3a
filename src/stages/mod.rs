pub mod stage0_roles;
pub mod stage1_classify;
pub mod stage2_segment;
pub mod stage3_kpis;

pub use stage0_roles::*;
pub use stage1_classify::*;
pub use stage2_segment::*;
pub use stage3_kpis::*;
