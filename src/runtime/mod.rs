pub mod context;
pub mod error;
pub mod interpreter;
pub mod scope;

pub use context::{Binding, Context};
pub use error::{RuntimeError, RuntimeResult};
pub use interpreter::interpret;
