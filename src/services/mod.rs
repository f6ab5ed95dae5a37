pub mod container_tree;
pub mod inventory_service;
pub mod label_service;
pub mod pack_list_service;
pub mod qr;
pub mod weight;

pub use container_tree::{ContainerNode, ContainerTree, TreeError};
pub use inventory_service::InventoryService;
pub use label_service::LabelService;
pub use pack_list_service::PackListService;
pub use qr::{HttpQrService, QrCodeGenerator, QrCodeRequest, QrError};
pub use weight::WeightSummary;
