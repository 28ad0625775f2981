//! Transactions table layout and batch loader
//!
//! Mirrors the table the bulk CSV loader produces (`Time, V1..V28, Amount,
//! Class`). Used to build fixture stores; the analysis stages never write.

use super::record::{
    AMOUNT_COLUMN, ANONYMIZED_FEATURES, LABEL_COLUMN, TIME_COLUMN, TRANSACTIONS_TABLE,
};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// One row to load; `features` shorter than 28 is padded with NULL
#[derive(Debug, Clone, Default)]
pub struct NewTransaction {
    pub time: f64,
    pub features: Vec<f64>,
    pub amount: f64,
    pub class: Option<i64>,
}

impl NewTransaction {
    pub fn new(time: f64, amount: f64, class: i64) -> Self {
        Self {
            time,
            features: Vec::new(),
            amount,
            class: Some(class),
        }
    }
}

fn feature_columns() -> Vec<String> {
    (1..=ANONYMIZED_FEATURES).map(|i| format!("V{}", i)).collect()
}

pub fn create_transactions_table(conn: &Connection) -> rusqlite::Result<()> {
    let features = feature_columns()
        .iter()
        .map(|c| format!("{} REAL", c))
        .collect::<Vec<_>>()
        .join(", ");

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} ({} REAL, {}, {} REAL, {} INTEGER)",
            TRANSACTIONS_TABLE, TIME_COLUMN, features, AMOUNT_COLUMN, LABEL_COLUMN
        ),
        [],
    )?;
    Ok(())
}

/// Append rows in a single transaction; returns the number inserted
pub fn insert_transactions(
    conn: &mut Connection,
    rows: &[NewTransaction],
) -> rusqlite::Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut columns = vec![TIME_COLUMN.to_string()];
    columns.extend(feature_columns());
    columns.push(AMOUNT_COLUMN.to_string());
    columns.push(LABEL_COLUMN.to_string());

    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        TRANSACTIONS_TABLE,
        columns.join(", "),
        placeholders
    );

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&sql)?;
        for row in rows {
            let mut values = Vec::with_capacity(columns.len());
            values.push(Value::Real(row.time));
            for i in 0..ANONYMIZED_FEATURES {
                values.push(row.features.get(i).map_or(Value::Null, |v| Value::Real(*v)));
            }
            values.push(Value::Real(row.amount));
            values.push(row.class.map_or(Value::Null, Value::Integer));
            stmt.execute(params_from_iter(values))?;
        }
    }
    tx.commit()?;

    log::debug!("✅ Loaded {} transactions", rows.len());
    Ok(rows.len())
}
