pub mod detector;
pub mod similarity;

pub use detector::*;
pub use similarity::*;
