mod containers;
mod pod;
mod proxy;
mod value;

pub use containers::*;
pub use pod::*;
pub use proxy::*;
pub use value::*;
