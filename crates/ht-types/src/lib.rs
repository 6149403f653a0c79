pub mod errors;
pub mod score;
pub mod tuning;

pub use errors::*;
pub use tuning::*;
