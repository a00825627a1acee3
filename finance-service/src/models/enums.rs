//! Closed vocabularies shared by parsing, classification and storage.
//!
//! Every enum stores and serializes as its SCREAMING_SNAKE_CASE code. `parse`
//! accepts only an exact code; anything else is `None`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Expense,
    Deposit,
    Investment,
}

impl TransactionType {
    pub const ALL: [Self; 3] = [Self::Expense, Self::Deposit, Self::Investment];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "EXPENSE",
            Self::Deposit => "DEPOSIT",
            Self::Investment => "INVESTMENT",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionCategory {
    Education,
    Entertainment,
    Services,
    Food,
    Health,
    Housing,
    Other,
    Salary,
    Transportation,
    Utility,
    FoodDelivery,
    Signature,
    Gaming,
}

impl TransactionCategory {
    pub const ALL: [Self; 13] = [
        Self::Education,
        Self::Entertainment,
        Self::Services,
        Self::Food,
        Self::Health,
        Self::Housing,
        Self::Other,
        Self::Salary,
        Self::Transportation,
        Self::Utility,
        Self::FoodDelivery,
        Self::Signature,
        Self::Gaming,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Education => "EDUCATION",
            Self::Entertainment => "ENTERTAINMENT",
            Self::Services => "SERVICES",
            Self::Food => "FOOD",
            Self::Health => "HEALTH",
            Self::Housing => "HOUSING",
            Self::Other => "OTHER",
            Self::Salary => "SALARY",
            Self::Transportation => "TRANSPORTATION",
            Self::Utility => "UTILITY",
            Self::FoodDelivery => "FOOD_DELIVERY",
            Self::Signature => "SIGNATURE",
            Self::Gaming => "GAMING",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    BankTransfer,
    BankSlip,
    Cash,
    Pix,
    Other,
}

impl PaymentMethod {
    pub const ALL: [Self; 7] = [
        Self::CreditCard,
        Self::DebitCard,
        Self::BankTransfer,
        Self::BankSlip,
        Self::Cash,
        Self::Pix,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "CREDIT_CARD",
            Self::DebitCard => "DEBIT_CARD",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::BankSlip => "BANK_SLIP",
            Self::Cash => "CASH",
            Self::Pix => "PIX",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == code)
    }
}

/// Stored settlement state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        [Self::Pending, Self::Paid]
            .into_iter()
            .find(|v| v.as_str() == code)
    }
}

/// Stored status combined with today's date relative to the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectiveStatus {
    Paid,
    Pending,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportJobStatus {
    Pending,
    Completed,
    Failed,
}

impl ImportJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        [Self::Pending, Self::Completed, Self::Failed]
            .into_iter()
            .find(|v| v.as_str() == code)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    DueDateReminder,
    Overdue,
    LowBalance,
    HighExpense,
    BudgetAlert,
    MonthlySummary,
    PaymentReceived,
}

impl NotificationType {
    pub const ALL: [Self; 7] = [
        Self::DueDateReminder,
        Self::Overdue,
        Self::LowBalance,
        Self::HighExpense,
        Self::BudgetAlert,
        Self::MonthlySummary,
        Self::PaymentReceived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DueDateReminder => "DUE_DATE_REMINDER",
            Self::Overdue => "OVERDUE",
            Self::LowBalance => "LOW_BALANCE",
            Self::HighExpense => "HIGH_EXPENSE",
            Self::BudgetAlert => "BUDGET_ALERT",
            Self::MonthlySummary => "MONTHLY_SUMMARY",
            Self::PaymentReceived => "PAYMENT_RECEIVED",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementMode {
    Pay,
    Unpay,
}

impl SettlementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pay => "PAY",
            Self::Unpay => "UNPAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementScope {
    Transaction,
    CardStatement,
}

impl SettlementScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transaction => "TRANSACTION",
            Self::CardStatement => "CARD_STATEMENT",
        }
    }
}
