pub mod containers;
pub mod labels;
pub mod pack_lists;
pub mod props;
pub mod viewer;

pub use containers::*;
pub use labels::*;
pub use pack_lists::*;
pub use props::*;
pub use viewer::*;
