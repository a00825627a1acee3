//! Use cases and infrastructure services for finance-service.

pub mod card_statement;
pub mod database;
pub mod import;
pub mod metrics;
pub mod notifications;
pub mod payables;
pub mod settlement;

pub use card_statement::{CardSpending, CardStatement, CardStatementService};
pub use database::Database;
pub use import::ImportService;
pub use metrics::{get_metrics, init_metrics};
pub use notifications::{DueDateSweep, NotificationService};
pub use payables::{PayablesReport, PayablesService};
pub use settlement::{CardSettlementTarget, SettlementRequest, SettlementService};
