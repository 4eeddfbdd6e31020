use crate::error::{FiscalLedgerError, Result};
use crate::table::{FieldValue, Record, Table};
use chrono::NaiveDate;
use log::debug;
use std::io::Read;

pub const CODE_COLUMN: &str = "code";
pub const NAME_COLUMN: &str = "name";
pub const DATE_COLUMN: &str = "date";
pub const AMOUNT_COLUMN: &str = "amount";

#[derive(Debug, Clone)]
pub struct TrialBalanceRow {
    pub account_code: String,
    pub account_name: String,
    pub date: NaiveDate,
    pub amount: f64,
}

impl From<&TrialBalanceRow> for Record {
    fn from(row: &TrialBalanceRow) -> Self {
        Record::new()
            .with(CODE_COLUMN, FieldValue::infer(&row.account_code))
            .with(NAME_COLUMN, row.account_name.as_str())
            .with(DATE_COLUMN, row.date)
            .with(AMOUNT_COLUMN, row.amount)
    }
}

pub fn convert_tb_to_table(rows: &[TrialBalanceRow]) -> Table {
    rows.iter().map(Record::from).collect()
}

/// Reads a headed CSV into records, inferring numbers and ISO dates per
/// cell. Empty cells are left out of the record.
pub fn read_records_csv<R: Read>(reader: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(FiscalLedgerError::MissingColumn(
            "CSV input has no header row".to_string(),
        ));
    }

    let mut table = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = Record::new();
        for (column, cell) in headers.iter().zip(row.iter()) {
            if cell.is_empty() {
                continue;
            }
            record.set(column, FieldValue::infer(cell));
        }
        table.push(record);
    }

    debug!(
        "Read {} records with columns [{}]",
        table.len(),
        headers.iter().collect::<Vec<_>>().join(", ")
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_tb_rows() {
        let rows = vec![TrialBalanceRow {
            account_code: "1200".to_string(),
            account_name: "Trade debtors".to_string(),
            date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            amount: 1_500.0,
        }];
        let table = convert_tb_to_table(&rows);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].number(CODE_COLUMN).unwrap(), 1200.0);
        assert_eq!(table[0].text(NAME_COLUMN).unwrap(), "Trade debtors");
        assert_eq!(
            table[0].date(DATE_COLUMN).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_read_records_csv() {
        let data = "code,name,date,amount\n1010, Cash ,2023-06-30,100.5\n4100,Sales,2023-03-31,\n";
        let table = read_records_csv(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].number("code").unwrap(), 1010.0);
        assert_eq!(table[0].text("name").unwrap(), "Cash");
        assert_eq!(table[0].number("amount").unwrap(), 100.5);
        assert!(table[1].get("amount").is_none());
    }

    #[test]
    fn test_read_records_csv_ragged_row() {
        let data = "code,amount\n1010,1.0,extra\n";
        assert!(read_records_csv(data.as_bytes()).is_err());
    }
}
