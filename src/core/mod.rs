pub mod batch_pricing;
pub mod etl;
pub mod exclusion;
pub mod pricing;

pub use crate::domain::model::{RunReport, Table};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
