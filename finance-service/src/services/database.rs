//! PostgreSQL store for finance-service.
//!
//! Enum columns are stored as their wire codes and decoded on read; an
//! unknown code is a data error, not a silent default.

use crate::billing::Period;
use crate::models::{
    BillableTransaction, CardSchedule, Category, CreditCard, ImportJob, ImportJobStatus,
    NewNotification, NewTransaction, Notification, NotificationType, PaymentMethod, PaymentStatus,
    Transaction, TransactionCategory, TransactionType, User,
};
use crate::repositories::{
    CategoryRepository, CreditCardRepository, HealthCheck, ImportJobRepository,
    NotificationRepository, TransactionFilter, TransactionRepository, UserRepository,
};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::FromRow;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::query::QueryAs;
use sqlx::Postgres;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const TRANSACTION_COLUMNS: &str = "t.id, t.user_id, t.name, t.description, t.amount, \
    t.transaction_date, t.due_date, t.transaction_type, t.category, t.category_id, \
    t.payment_method, t.is_recurring, t.payment_status, t.paid_at, t.credit_card_id, \
    t.import_job_id, t.created_utc, t.updated_utc, t.deleted_at";

const CARD_COLUMNS: &str = "id, user_id, name, last_four_digits, brand, due_day, closing_day, \
    credit_limit, is_active, created_utc, updated_utc";

const JOB_COLUMNS: &str =
    "id, user_id, status, total, processed, credit_card_id, created_utc, updated_utc";

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, notification_type, title, message, is_read, transaction_id, created_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[instrument(skip(database_url), fields(service = "finance-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn select_transactions<'q>(
        &self,
        operation: &'static str,
        query: QueryAs<'q, Postgres, TransactionRow, PgArguments>,
    ) -> Result<Vec<Transaction>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&[operation])
            .start_timer();

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Transaction query {} failed: {}", operation, e))
            })?;

        timer.observe_duration();

        rows.into_iter().map(Transaction::try_from).collect()
    }
}

// -----------------------------------------------------------------------------
// Row types
// -----------------------------------------------------------------------------

fn decode<T>(parsed: Option<T>, column: &str, raw: &str) -> Result<T, AppError> {
    parsed.ok_or_else(|| {
        AppError::DatabaseError(anyhow::anyhow!("Unknown {} value '{}'", column, raw))
    })
}

fn day_of_month(value: Option<i16>) -> Option<u32> {
    value.and_then(|d| u32::try_from(d).ok()).filter(|d| *d > 0)
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: Option<String>,
    name: Option<String>,
    created_utc: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            created_at: row.created_utc,
        }
    }
}

#[derive(FromRow)]
struct CategoryRow {
    id: Uuid,
    user_id: String,
    name: String,
    created_utc: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            created_at: row.created_utc,
        }
    }
}

#[derive(FromRow)]
struct CardRow {
    id: Uuid,
    user_id: String,
    name: String,
    last_four_digits: Option<String>,
    brand: Option<String>,
    due_day: Option<i16>,
    closing_day: Option<i16>,
    credit_limit: Option<Decimal>,
    is_active: bool,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl From<CardRow> for CreditCard {
    fn from(row: CardRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            last_four_digits: row.last_four_digits,
            brand: row.brand,
            due_day: day_of_month(row.due_day),
            closing_day: day_of_month(row.closing_day),
            limit: row.credit_limit,
            is_active: row.is_active,
            created_at: row.created_utc,
            updated_at: row.updated_utc,
        }
    }
}

#[derive(FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    name: String,
    description: Option<String>,
    amount: Decimal,
    transaction_date: NaiveDate,
    due_date: Option<NaiveDate>,
    transaction_type: String,
    category: String,
    category_id: Option<Uuid>,
    payment_method: String,
    is_recurring: bool,
    payment_status: String,
    paid_at: Option<DateTime<Utc>>,
    credit_card_id: Option<Uuid>,
    import_job_id: Option<Uuid>,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            transaction_type: decode(
                TransactionType::parse(&row.transaction_type),
                "transaction_type",
                &row.transaction_type,
            )?,
            category: decode(
                TransactionCategory::parse(&row.category),
                "category",
                &row.category,
            )?,
            payment_method: decode(
                PaymentMethod::parse(&row.payment_method),
                "payment_method",
                &row.payment_method,
            )?,
            payment_status: decode(
                PaymentStatus::parse(&row.payment_status),
                "payment_status",
                &row.payment_status,
            )?,
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            amount: row.amount,
            date: row.transaction_date,
            due_date: row.due_date,
            category_id: row.category_id,
            is_recurring: row.is_recurring,
            paid_at: row.paid_at,
            credit_card_id: row.credit_card_id,
            import_job_id: row.import_job_id,
            created_at: row.created_utc,
            updated_at: row.updated_utc,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(FromRow)]
struct BillableRow {
    #[sqlx(flatten)]
    transaction: TransactionRow,
    card_name: Option<String>,
    card_due_day: Option<i16>,
    card_closing_day: Option<i16>,
}

impl TryFrom<BillableRow> for BillableTransaction {
    type Error = AppError;

    fn try_from(row: BillableRow) -> Result<Self, Self::Error> {
        let has_card = row.transaction.credit_card_id.is_some() && row.card_name.is_some();
        let card = has_card.then(|| CardSchedule {
            name: row.card_name,
            due_day: day_of_month(row.card_due_day),
            closing_day: day_of_month(row.card_closing_day),
        });
        Ok(Self {
            transaction: Transaction::try_from(row.transaction)?,
            card,
        })
    }
}

#[derive(FromRow)]
struct ImportJobRow {
    id: Uuid,
    user_id: String,
    status: String,
    total: i32,
    processed: i32,
    credit_card_id: Option<Uuid>,
    created_utc: DateTime<Utc>,
    updated_utc: DateTime<Utc>,
}

impl TryFrom<ImportJobRow> for ImportJob {
    type Error = AppError;

    fn try_from(row: ImportJobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: decode(ImportJobStatus::parse(&row.status), "status", &row.status)?,
            id: row.id,
            user_id: row.user_id,
            total: row.total,
            processed: row.processed,
            credit_card_id: row.credit_card_id,
            created_at: row.created_utc,
            updated_at: row.updated_utc,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: String,
    notification_type: String,
    title: String,
    message: String,
    is_read: bool,
    transaction_id: Option<Uuid>,
    created_utc: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            notification_type: decode(
                NotificationType::parse(&row.notification_type),
                "notification_type",
                &row.notification_type,
            )?,
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            is_read: row.is_read,
            transaction_id: row.transaction_id,
            created_at: row.created_utc,
        })
    }
}

/// Year and month binds for a period. The month only applies with a year.
fn period_binds(period: &Period) -> (Option<i32>, Option<i32>) {
    let year = period.year;
    let month = year.and(period.month).and_then(|m| i32::try_from(m).ok());
    (year, month)
}

// -----------------------------------------------------------------------------
// Repository implementations
// -----------------------------------------------------------------------------

#[async_trait]
impl HealthCheck for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for Database {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user"])
            .start_timer();

        let user = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, created_utc FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find user: {}", e)))?;

        timer.observe_duration();

        Ok(user.map(User::from))
    }
}

#[async_trait]
impl CategoryRepository for Database {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Category>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_categories"])
            .start_timer();

        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, user_id, name, created_utc FROM categories WHERE user_id = $1 ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list categories: {}", e)))?;

        timer.observe_duration();

        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self), fields(user_id = %user_id, name = %name))]
    async fn create(&self, user_id: &str, name: &str) -> Result<Category, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_category"])
            .start_timer();

        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (id, user_id, name)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Category '{}' already exists", name))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create category: {}", e)),
        })?;

        timer.observe_duration();

        info!(category_id = %row.id, "Category created");

        Ok(row.into())
    }

    #[instrument(skip(self), fields(user_id = %user_id, name = %name))]
    async fn exists_by_name(&self, user_id: &str, name: &str) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["category_exists"])
            .start_timer();

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE user_id = $1 AND LOWER(name) = LOWER($2))",
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check category: {}", e)))?;

        timer.observe_duration();

        Ok(exists)
    }
}

#[async_trait]
impl CreditCardRepository for Database {
    #[instrument(skip(self), fields(credit_card_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CreditCard>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_credit_card"])
            .start_timer();

        let row = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {} FROM credit_cards WHERE id = $1",
            CARD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find credit card: {}", e)))?;

        timer.observe_duration();

        Ok(row.map(CreditCard::from))
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_active_by_user(&self, user_id: &str) -> Result<Vec<CreditCard>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_credit_cards"])
            .start_timer();

        let rows = sqlx::query_as::<_, CardRow>(&format!(
            "SELECT {} FROM credit_cards WHERE user_id = $1 AND is_active ORDER BY name",
            CARD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list credit cards: {}", e)))?;

        timer.observe_duration();

        Ok(rows.into_iter().map(CreditCard::from).collect())
    }
}

#[async_trait]
impl TransactionRepository for Database {
    #[instrument(skip(self, input), fields(user_id = %input.user_id, import_job_id = ?input.import_job_id))]
    async fn create(&self, input: &NewTransaction) -> Result<Transaction, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_transaction"])
            .start_timer();

        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO transactions AS t (
                id, user_id, name, description, amount, transaction_date, due_date,
                transaction_type, category, category_id, payment_method, is_recurring,
                credit_card_id, import_job_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.user_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.amount)
        .bind(input.date)
        .bind(input.due_date)
        .bind(input.transaction_type.as_str())
        .bind(input.category.as_str())
        .bind(input.category_id)
        .bind(input.payment_method.as_str())
        .bind(input.is_recurring)
        .bind(input.credit_card_id)
        .bind(input.import_job_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create transaction: {}", e)))?;

        timer.observe_duration();

        Transaction::try_from(row)
    }

    #[instrument(skip(self), fields(user_id = %user_id, transaction_id = %id))]
    async fn find_by_id(&self, user_id: &str, id: Uuid) -> Result<Option<Transaction>, AppError> {
        let sql = format!(
            "SELECT {} FROM transactions t WHERE t.user_id = $1 AND t.id = $2 AND t.deleted_at IS NULL",
            TRANSACTION_COLUMNS
        );
        let rows = self
            .select_transactions(
                "find_transaction",
                sqlx::query_as(&sql).bind(user_id).bind(id),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, filter), fields(user_id = %user_id, transaction_type = transaction_type.as_str()))]
    async fn find_billable(
        &self,
        user_id: &str,
        transaction_type: TransactionType,
        filter: &TransactionFilter,
    ) -> Result<Vec<BillableTransaction>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_billable"])
            .start_timer();

        let (year, month) = period_binds(&filter.period);

        let rows = sqlx::query_as::<_, BillableRow>(&format!(
            r#"
            SELECT {}, c.name AS card_name, c.due_day AS card_due_day, c.closing_day AS card_closing_day
            FROM transactions t
            LEFT JOIN credit_cards c ON c.id = t.credit_card_id
            WHERE t.user_id = $1
              AND t.deleted_at IS NULL
              AND t.transaction_type = $2
              AND (t.due_date IS NOT NULL OR ($6::boolean AND t.credit_card_id IS NOT NULL))
              AND ($3::varchar IS NULL OR t.payment_status = $3)
              AND (t.due_date IS NULL OR $4::int IS NULL OR EXTRACT(YEAR FROM t.due_date)::int = $4)
              AND (t.due_date IS NULL OR $5::int IS NULL OR EXTRACT(MONTH FROM t.due_date)::int = $5)
            ORDER BY t.due_date ASC NULLS LAST, t.created_utc ASC
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .bind(transaction_type.as_str())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(year)
        .bind(month)
        .bind(transaction_type == TransactionType::Expense)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find billable transactions: {}", e)))?;

        timer.observe_duration();

        rows.into_iter().map(BillableTransaction::try_from).collect()
    }

    #[instrument(skip(self), fields(user_id = %user_id, credit_card_id = %credit_card_id))]
    async fn list_by_credit_card(
        &self,
        user_id: &str,
        credit_card_id: Uuid,
    ) -> Result<Vec<Transaction>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM transactions t
            WHERE t.user_id = $1 AND t.credit_card_id = $2 AND t.deleted_at IS NULL
            ORDER BY t.transaction_date ASC, t.created_utc ASC
            "#,
            TRANSACTION_COLUMNS
        );
        self.select_transactions(
            "list_card_transactions",
            sqlx::query_as(&sql).bind(user_id).bind(credit_card_id),
        )
        .await
    }

    #[instrument(skip(self, ids), fields(user_id = %user_id, count = ids.len()))]
    async fn mark_as_paid(
        &self,
        user_id: &str,
        ids: &[Uuid],
        paid_at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_transactions_paid"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET payment_status = 'PAID', paid_at = $3, updated_utc = NOW()
            WHERE user_id = $1 AND id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .bind(paid_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to mark transactions paid: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, ids), fields(user_id = %user_id, count = ids.len()))]
    async fn mark_as_pending(&self, user_id: &str, ids: &[Uuid]) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_transactions_pending"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET payment_status = 'PENDING', paid_at = NULL, updated_utc = NOW()
            WHERE user_id = $1 AND id = ANY($2) AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to mark transactions pending: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn find_pending_due_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM transactions t
            WHERE t.deleted_at IS NULL
              AND t.transaction_type = 'EXPENSE'
              AND t.payment_status = 'PENDING'
              AND t.due_date BETWEEN $1 AND $2
            ORDER BY t.due_date ASC
            "#,
            TRANSACTION_COLUMNS
        );
        self.select_transactions(
            "find_upcoming_due",
            sqlx::query_as(&sql).bind(start).bind(end),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_pending_due_before(&self, date: NaiveDate) -> Result<Vec<Transaction>, AppError> {
        let sql = format!(
            r#"
            SELECT {} FROM transactions t
            WHERE t.deleted_at IS NULL
              AND t.transaction_type = 'EXPENSE'
              AND t.payment_status = 'PENDING'
              AND t.due_date < $1
            ORDER BY t.due_date ASC
            "#,
            TRANSACTION_COLUMNS
        );
        self.select_transactions("find_overdue", sqlx::query_as(&sql).bind(date))
            .await
    }
}

#[async_trait]
impl ImportJobRepository for Database {
    #[instrument(skip(self), fields(user_id = %user_id, total = total))]
    async fn create(
        &self,
        user_id: &str,
        total: i32,
        credit_card_id: Option<Uuid>,
    ) -> Result<ImportJob, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_import_job"])
            .start_timer();

        let row = sqlx::query_as::<_, ImportJobRow>(&format!(
            r#"
            INSERT INTO import_jobs (id, user_id, total, credit_card_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(total)
        .bind(credit_card_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create import job: {}", e)))?;

        timer.observe_duration();

        ImportJob::try_from(row)
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ImportJob>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_import_job"])
            .start_timer();

        let row = sqlx::query_as::<_, ImportJobRow>(&format!(
            "SELECT {} FROM import_jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find import job: {}", e)))?;

        timer.observe_duration();

        row.map(ImportJob::try_from).transpose()
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn increment_processed(&self, id: Uuid) -> Result<ImportJob, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["increment_import_job"])
            .start_timer();

        let row = sqlx::query_as::<_, ImportJobRow>(&format!(
            r#"
            UPDATE import_jobs
            SET processed = processed + 1, updated_utc = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to increment import job: {}", e)))?;

        timer.observe_duration();

        match row {
            Some(row) => ImportJob::try_from(row),
            None => Err(AppError::not_found(format!("Import job {} not found", id))),
        }
    }

    #[instrument(skip(self), fields(job_id = %id, status = status.as_str()))]
    async fn mark_status(&self, id: Uuid, status: ImportJobStatus) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_import_job_status"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE import_jobs
            SET status = $2, updated_utc = NOW()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update import job: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationRepository for Database {
    #[instrument(skip(self, input), fields(user_id = %input.user_id, notification_type = input.notification_type.as_str()))]
    async fn create(&self, input: &NewNotification) -> Result<Notification, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_notification"])
            .start_timer();

        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            INSERT INTO notifications (id, user_id, notification_type, title, message, transaction_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.user_id)
        .bind(input.notification_type.as_str())
        .bind(&input.title)
        .bind(&input.message)
        .bind(input.transaction_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create notification: {}", e)))?;

        timer.observe_duration();

        Notification::try_from(row)
    }

    #[instrument(skip(self), fields(user_id = %user_id, transaction_id = %transaction_id))]
    async fn exists_since(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        transaction_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["notification_exists"])
            .start_timer();

        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM notifications
                WHERE user_id = $1 AND notification_type = $2
                  AND transaction_id = $3 AND created_utc >= $4
            )
            "#,
        )
        .bind(user_id)
        .bind(notification_type.as_str())
        .bind(transaction_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check notification: {}", e)))?;

        timer.observe_duration();

        Ok(exists)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_by_user(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_notifications"])
            .start_timer();

        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {} FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
            ORDER BY created_utc DESC
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list notifications: {}", e)))?;

        timer.observe_duration();

        rows.into_iter().map(Notification::try_from).collect()
    }

    #[instrument(skip(self), fields(user_id = %user_id, notification_id = %id))]
    async fn mark_as_read(&self, user_id: &str, id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_notification_read"])
            .start_timer();

        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to mark notification read: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn mark_all_as_read(&self, user_id: &str) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_all_notifications_read"])
            .start_timer();

        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to mark notifications read: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }
}
