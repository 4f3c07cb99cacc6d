mod constant;
mod error;
mod fan;
mod param_gen;
mod random;

pub use constant::ConstParamGen;
pub use error::{InitErr, Result};
pub use fan::{FanParamGen, FanScheme};
pub use param_gen::ParamGen;
pub use random::RandParamGen;
