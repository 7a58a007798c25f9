//! Dispatch layer: the five-state pass, company-level seeding, and batch
//! processing.

mod batch;
mod company_checker;
mod dispatcher;

pub use batch::{BatchOutput, BatchReport, RowTask};
pub use company_checker::CompanyChecker;
pub use dispatcher::{DispatchResult, DispatchStatus, Dispatcher};
