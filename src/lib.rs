pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod planner;
pub mod storage;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use error::PlannerError;
pub use model::{GroceryItem, GroceryList, Task};
