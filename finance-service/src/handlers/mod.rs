pub mod cards;
pub mod health;
pub mod imports;
pub mod notifications;
pub mod payables;

pub use cards::{get_card_statement, get_spending_summary};
pub use health::{health_check, metrics_handler, readiness_check};
pub use imports::{get_import_job, upload_statement};
pub use notifications::{
    check_due_dates, list_notifications, mark_all_notifications_read, mark_notification_read,
};
pub use payables::{get_payables, settle};
