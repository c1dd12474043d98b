//! Holiday calendar operations.

use chrono::{Datelike, NaiveDate};
use rusqlite::params;

use super::appointments::date_to_string;
use super::{Database, DbResult};

impl Database {
    /// Replace the holidays of `year` wholesale.
    pub fn replace_holidays(&self, year: i32, dates: &[NaiveDate]) -> DbResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM holidays WHERE anno = ?", [year])?;
        for date in dates.iter().filter(|d| d.year() == year) {
            tx.execute(
                "INSERT OR IGNORE INTO holidays (data, anno) VALUES (?1, ?2)",
                params![date_to_string(*date), year],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Holidays of `year` as ISO strings, in date order.
    pub fn holidays_for_year(&self, year: i32) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM holidays WHERE anno = ? ORDER BY data")?;
        let rows = stmt.query_map([year], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
