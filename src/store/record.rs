//! Transaction record as read from the store

pub const TRANSACTIONS_TABLE: &str = "transactions";
pub const TIME_COLUMN: &str = "Time";
pub const AMOUNT_COLUMN: &str = "Amount";
pub const LABEL_COLUMN: &str = "Class";

/// Number of anonymized `V1..V28` features in the source dataset
pub const ANONYMIZED_FEATURES: usize = 28;

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// SQLite rowid
    pub id: i64,
    /// Seconds since the first transaction in the dataset
    pub time: f64,
    pub amount: f64,
    /// Known fraud flag; `None` when the label is missing
    pub label: Option<bool>,
}

impl Transaction {
    pub fn is_fraud(&self) -> bool {
        self.label == Some(true)
    }
}

/// Interpret a `Class` cell; only an exact 1 counts as fraud, like `Class = 1` in SQL
pub fn label_from_class(class: Option<f64>) -> Option<bool> {
    class.map(|c| c == 1.0)
}
