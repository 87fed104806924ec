use crate::error::Result;
use crate::schema::Transaction;
use crate::utils::parse_ledger_date;
use std::io::Read;

/// One raw IR row as produced by the upstream bank-format transforms:
/// date, signed amount, description, category.
#[derive(Debug, serde::Deserialize)]
struct IrRow {
    date: String,
    amount: f64,
    description: String,
    category: String,
}

/// Reads a headerless IR CSV document into transactions, in row order.
/// Malformed dates surface as `DateParse` immediately.
pub fn read_ledger<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(reader);

    let mut transactions = Vec::new();
    for row in csv_reader.deserialize::<IrRow>() {
        let row = row?;
        transactions.push(Transaction {
            date: parse_ledger_date(&row.date)?,
            amount: row.amount,
            description: row.description,
            category: row.category,
        });
    }

    Ok(transactions)
}

/// Drops intra-account transfers, which carry no analytical information.
pub fn filter_internal(transactions: Vec<Transaction>) -> Vec<Transaction> {
    transactions
        .into_iter()
        .filter(|t| !t.is_internal())
        .collect()
}
