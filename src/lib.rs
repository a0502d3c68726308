mod differ;
mod driver;
mod dual;
pub mod error;
mod node;
mod parser;
mod scalar;
mod tape;
mod unary_fn;

pub use differ::{derive, Differ, Seed};
#[cfg(feature = "rayon")]
pub use driver::ParallelFor;
pub use driver::{DriverConfig, Executor, Outcome, Sequential, Unit, WorkerPool};
pub use dual::Dual;
pub use error::{DiffError, ParseError, ReturnCode, Status};
pub use node::{Arity, OpNode, Operation};
pub use parser::{Derivation, Reducer, SymbolTable};
pub use scalar::Scalar;
pub use unary_fn::{Elementary, UnaryFn};
