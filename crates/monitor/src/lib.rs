//! Library entrypoint for embedding the monitoring cycle inside other
//! binaries: the API process runs one cycle in-process per trigger. The
//! binary in `main.rs` remains available for development/CI use.

pub mod alert;
pub mod cycle;
pub mod report;
pub mod source;

pub use cycle::{run_cycle, CycleSettings};
pub use report::{AddressOutcome, AlertOutcome, CycleReport, DeliveryOutcome};
pub use source::{EtherscanSource, SourceError, TransactionSource};
