pub mod engine;
mod error;
pub mod fml;
pub mod solver;
pub mod sys;

pub use engine::{Pdr, PdrOutcome, pdr};
pub use error::TocsinError;
pub use fml::ConjFml;
pub use sys::{TransitionSystem, Vocabulary};
