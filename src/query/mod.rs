pub mod classifier;
pub mod gate;

pub use classifier::{classify, Classification, Violation, DANGEROUS_KEYWORDS};
pub use gate::{gate, GateDecision};
