pub mod imports;
pub mod notifications;
pub mod payables;

pub use imports::{ImportJobResponse, ImportResponse};
pub use notifications::{NotificationsQuery, UpdatedCount};
pub use payables::{CardTargetBody, MonthQuery, PayablesQuery, SettleRequest};
