pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Combine, Confirm, Init, Shard, Split, Status, Version, Watch};
