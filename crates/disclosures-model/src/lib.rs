pub mod config;
pub mod dataset;
pub mod error;
pub mod listing;
pub mod report;

pub use config::*;
pub use dataset::*;
pub use error::*;
pub use listing::*;
pub use report::*;
