//! Distiller core: pure batch bookkeeping, free of IO.
mod batch;
mod input;

pub use batch::{record, BatchMode, BatchReport, ItemOutput, Step};
pub use input::parse_urls;
