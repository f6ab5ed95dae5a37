pub mod container;
pub mod label;
pub mod pack_list;
pub mod prop;

pub use container::*;
pub use label::*;
pub use pack_list::*;
pub use prop::*;
