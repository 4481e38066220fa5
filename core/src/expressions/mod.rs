//! Filter expressions: leaf predicates and the boolean tree built from them.

mod condition;
mod predicate;


pub use condition::Where;
pub use predicate::{Field, Operator};
