pub use errors::*;
pub use properties::*;

mod errors;
mod properties;
