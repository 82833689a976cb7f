pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod transform;

pub use error::HistoryError;
