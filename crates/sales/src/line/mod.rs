//! Line-level computation: product resolution and monetary totals.

pub mod resolver;
pub mod values;

pub use resolver::LineInformationResolver;
pub use values::{LineValueComputer, LineValues};
