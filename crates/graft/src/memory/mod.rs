mod reader;

#[cfg(test)]
pub mod mock;

pub use reader::{InProcessReader, ReadMemory};

#[cfg(test)]
pub use mock::{MockMemoryBuilder, MockMemoryReader};
