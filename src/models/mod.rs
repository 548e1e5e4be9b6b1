pub mod admission;
pub mod enums;
pub mod filters;
pub mod patient;
pub mod staff;
pub mod unit;

pub use admission::*;
pub use enums::*;
pub use filters::*;
pub use patient::*;
pub use staff::*;
pub use unit::*;
