mod context;
pub use context::*;

mod temp;
pub use temp::*;

mod mocks;
pub use mocks::*;
