use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

use services::{InventoryService, LabelService, PackListService};

pub type AppState = (
    Arc<PackListService>,
    Arc<InventoryService>,
    Arc<LabelService>,
);
