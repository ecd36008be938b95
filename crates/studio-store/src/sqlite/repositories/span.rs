//! Trace spans recorded for a run.

use rusqlite::{Connection, Row, params};

use crate::errors::Result;
use crate::sqlite::row_types::SpanRow;

/// Span repository.
pub struct SpanRepo;

impl SpanRepo {
    /// Insert or replace a span (exporters resend spans when they close).
    pub fn upsert(conn: &Connection, span: &SpanRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO span_table (id, run_id, trace_id, parent_span_id, name, start_time,
                                     end_time, status_code, attributes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                end_time = excluded.end_time,
                status_code = excluded.status_code,
                attributes = excluded.attributes",
            params![
                span.id,
                span.run_id,
                span.trace_id,
                span.parent_span_id,
                span.name,
                span.start_time,
                span.end_time,
                span.status_code,
                span.attributes
            ],
        )?;
        Ok(())
    }

    /// Spans of a run ordered by start time.
    pub fn list_by_run(conn: &Connection, run_id: &str) -> Result<Vec<SpanRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, run_id, trace_id, parent_span_id, name, start_time, end_time,
                    status_code, attributes
             FROM span_table WHERE run_id = ?1 ORDER BY start_time, rowid",
        )?;
        let rows = stmt
            .query_map(params![run_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<SpanRow> {
        Ok(SpanRow {
            id: row.get(0)?,
            run_id: row.get(1)?,
            trace_id: row.get(2)?,
            parent_span_id: row.get(3)?,
            name: row.get(4)?,
            start_time: row.get(5)?,
            end_time: row.get(6)?,
            status_code: row.get(7)?,
            attributes: row.get(8)?,
        })
    }
}
