//! Data access port trait.

use crate::domain::error::MeanrevError;
use crate::domain::ohlcv::OhlcvTable;

/// Supplier and sink of named OHLCV tables.
pub trait DataPort {
    fn fetch_table(&self, name: &str) -> Result<OhlcvTable, MeanrevError>;

    fn store_table(&self, name: &str, table: &OhlcvTable) -> Result<(), MeanrevError>;

    fn list_tables(&self) -> Result<Vec<String>, MeanrevError>;
}
