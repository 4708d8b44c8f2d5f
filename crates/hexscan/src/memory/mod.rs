mod process;
mod reader;
pub mod region;
mod stream;

#[cfg(test)]
pub mod fixture;
#[cfg(test)]
pub mod mock;

pub use process::*;
pub use reader::{MemoryAccessor, NOP, ReadMemory, WriteMemory};
pub use region::{MemoryRegion, Permissions, RegionFilter, parse_maps};
pub use stream::{Access, MemoryStream};

#[cfg(test)]
pub use mock::{MockMemory, MockMemoryBuilder};
