use chrono::{NaiveDate, NaiveDateTime};
use sqlparser::ast::{self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::Ms;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertBooking {
        id: Ulid,
        start: Ms,
        end: Ms,
        notes: Option<String>,
    },
    DeleteBooking {
        id: Ulid,
    },
    InsertMaintenance {
        id: Ulid,
        start: Ms,
        end: Ms,
        description: String,
    },
    DeleteMaintenance {
        id: Ulid,
    },
    SelectBookings {
        window: Option<(Ms, Ms)>,
    },
    SelectMaintenance {
        window: Option<(Ms, Ms)>,
    },
    SelectAvailability {
        start: Ms,
        end: Ms,
        min_duration: Option<Ms>,
    },
    Listen {
        channel: String,
    },
    Unlisten {
        channel: String,
    },
    UnlistenAll,
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let trimmed = sql.trim();
    let upper = trimmed.to_uppercase();
    if upper.starts_with("LISTEN ") {
        let channel = trimmed[7..].trim().trim_matches(';').to_string();
        return Ok(Command::Listen { channel });
    }
    if upper.starts_with("UNLISTEN ") {
        let channel = trimmed[9..].trim().trim_matches(';').to_string();
        if channel == "*" {
            return Ok(Command::UnlistenAll);
        }
        return Ok(Command::Unlisten { channel });
    }

    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "bookings" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("bookings", 3, values.len()));
            }
            let notes = if values.len() >= 4 {
                parse_string_or_null(&values[3])?
            } else {
                None
            };
            Ok(Command::InsertBooking {
                id: parse_ulid(&values[0])?,
                start: parse_ms(&values[1])?,
                end: parse_ms(&values[2])?,
                notes,
            })
        }
        "maintenance" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("maintenance", 4, values.len()));
            }
            Ok(Command::InsertMaintenance {
                id: parse_ulid(&values[0])?,
                start: parse_ms(&values[1])?,
                end: parse_ms(&values[2])?,
                description: parse_string(&values[3])?,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    let id = extract_where_id(&delete.selection)?;

    match table.as_str() {
        "bookings" => Ok(Command::DeleteBooking { id }),
        "maintenance" => Ok(Command::DeleteMaintenance { id }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    let (mut start, mut end, mut min_duration) = (None, None, None);
    if let Some(selection) = &select.selection {
        extract_range_filters(selection, &mut start, &mut end, &mut min_duration)?;
    }

    match table.as_str() {
        "bookings" => Ok(Command::SelectBookings {
            window: window_from_filters(start, end)?,
        }),
        "maintenance" => Ok(Command::SelectMaintenance {
            window: window_from_filters(start, end)?,
        }),
        "availability" => Ok(Command::SelectAvailability {
            start: start.ok_or(SqlError::MissingFilter("start"))?,
            end: end.ok_or(SqlError::MissingFilter("end"))?,
            min_duration,
        }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// Either both bounds or neither; a half-filtered window is a caller bug.
fn window_from_filters(start: Option<Ms>, end: Option<Ms>) -> Result<Option<(Ms, Ms)>, SqlError> {
    match (start, end) {
        (Some(s), Some(e)) => Ok(Some((s, e))),
        (None, None) => Ok(None),
        (None, Some(_)) => Err(SqlError::MissingFilter("start")),
        (Some(_), None) => Err(SqlError::MissingFilter("end")),
    }
}

fn extract_range_filters(
    expr: &Expr,
    start: &mut Option<Ms>,
    end: &mut Option<Ms>,
    min_duration: &mut Option<Ms>,
) -> Result<(), SqlError> {
    if let Expr::BinaryOp { left, op, right } = expr {
        match op {
            ast::BinaryOperator::And => {
                extract_range_filters(left, start, end, min_duration)?;
                extract_range_filters(right, start, end, min_duration)?;
            }
            ast::BinaryOperator::Eq => {
                if expr_column_name(left).as_deref() == Some("min_duration") {
                    *min_duration = Some(parse_ms_expr(right)?);
                }
            }
            ast::BinaryOperator::GtEq => {
                if expr_column_name(left).as_deref() == Some("start") {
                    *start = Some(parse_ms_expr(right)?);
                }
            }
            ast::BinaryOperator::LtEq => {
                if expr_column_name(left).as_deref() == Some("end") {
                    *end = Some(parse_ms_expr(right)?);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => match values.rows.as_slice() {
            [] => Err(SqlError::Parse("empty VALUES".into())),
            [row] => Ok(row.clone()),
            _ => Err(SqlError::Unsupported("multi-row INSERT".into())),
        },
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<Ulid, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some("id") {
                parse_ulid(right)
            } else {
                Err(SqlError::MissingFilter("id"))
            }
        }
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) | Value::Number(s, _) => {
                Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
            }
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

/// Timestamps are epoch milliseconds or naive ISO-8601 strings
/// (`2026-08-07T10:00:00`). Naive means naive: the string is taken as-is,
/// no timezone conversion.
fn parse_timestamp_str(s: &str) -> Result<Ms, SqlError> {
    if let Ok(ms) = s.parse::<Ms>() {
        return Ok(ms);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        // Midnight of that day
        return Ok(d.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis());
    }
    Err(SqlError::Parse(format!("bad timestamp: {s}")))
}

fn parse_ms_expr(expr: &Expr) -> Result<Ms, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad i64: {e}"))),
            Value::SingleQuotedString(s) => parse_timestamp_str(s),
            _ => Err(SqlError::Parse(format!("expected timestamp, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_ms_expr(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_ms(expr: &Expr) -> Result<Ms, SqlError> {
    parse_ms_expr(expr)
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    if let Some(Value::SingleQuotedString(s)) = extract_value(expr) {
        Ok(s.clone())
    } else {
        Err(SqlError::Parse(format!("expected string, got {expr:?}")))
    }
}

fn parse_string_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    match extract_value(expr) {
        Some(Value::Null) => Ok(None),
        Some(Value::SingleQuotedString(s)) => Ok(Some(s.clone())),
        _ => Err(SqlError::Parse(format!("expected string or NULL, got {expr:?}"))),
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";

    #[test]
    fn parse_insert_booking() {
        let sql = format!(
            r#"INSERT INTO bookings (id, start, "end") VALUES ('{ID}', 1000, 2000)"#
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertBooking { id, start, end, notes } => {
                assert_eq!(id.to_string(), ID);
                assert_eq!(start, 1000);
                assert_eq!(end, 2000);
                assert_eq!(notes, None);
            }
            _ => panic!("expected InsertBooking, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_booking_with_notes() {
        let sql = format!(
            r#"INSERT INTO bookings (id, start, "end", notes) VALUES ('{ID}', 1000, 2000, 'checkride with CFI')"#
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertBooking { notes, .. } => {
                assert_eq!(notes.as_deref(), Some("checkride with CFI"));
            }
            cmd => panic!("expected InsertBooking, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_booking_null_notes() {
        let sql = format!(
            r#"INSERT INTO bookings (id, start, "end", notes) VALUES ('{ID}', 1000, 2000, NULL)"#
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertBooking { notes, .. } => assert_eq!(notes, None),
            cmd => panic!("expected InsertBooking, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_booking_iso_timestamps() {
        let sql = format!(
            r#"INSERT INTO bookings (id, start, "end") VALUES ('{ID}', '2026-08-07T10:00:00', '2026-08-07T12:00')"#
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertBooking { start, end, .. } => {
                assert_eq!(end - start, 2 * 3_600_000);
            }
            cmd => panic!("expected InsertBooking, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_maintenance() {
        let sql = format!(
            r#"INSERT INTO maintenance (id, start, "end", description) VALUES ('{ID}', 1000, 2000, 'annual inspection')"#
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertMaintenance { description, .. } => {
                assert_eq!(description, "annual inspection");
            }
            cmd => panic!("expected InsertMaintenance, got {cmd:?}"),
        }
    }

    #[test]
    fn maintenance_requires_description() {
        let sql = format!(r#"INSERT INTO maintenance (id, start, "end") VALUES ('{ID}', 1000, 2000)"#);
        assert!(matches!(parse_sql(&sql), Err(SqlError::WrongArity(..))));
    }

    #[test]
    fn parse_delete_booking() {
        let sql = format!("DELETE FROM bookings WHERE id = '{ID}'");
        match parse_sql(&sql).unwrap() {
            Command::DeleteBooking { id } => assert_eq!(id.to_string(), ID),
            cmd => panic!("expected DeleteBooking, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_delete_maintenance() {
        let sql = format!("DELETE FROM maintenance WHERE id = '{ID}'");
        assert!(matches!(
            parse_sql(&sql).unwrap(),
            Command::DeleteMaintenance { .. }
        ));
    }

    #[test]
    fn parse_select_bookings_unfiltered() {
        let cmd = parse_sql("SELECT * FROM bookings").unwrap();
        assert_eq!(cmd, Command::SelectBookings { window: None });
    }

    #[test]
    fn parse_select_bookings_window() {
        let sql = "SELECT * FROM bookings WHERE start >= 1000 AND \"end\" <= 2000";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::SelectBookings {
                window: Some((1000, 2000))
            }
        );
    }

    #[test]
    fn parse_select_window_iso() {
        let sql =
            "SELECT * FROM maintenance WHERE start >= '2026-08-07' AND \"end\" <= '2026-08-08'";
        match parse_sql(sql).unwrap() {
            Command::SelectMaintenance { window: Some((s, e)) } => {
                assert_eq!(e - s, 24 * 3_600_000);
            }
            cmd => panic!("expected windowed SelectMaintenance, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_half_window_rejected() {
        let sql = "SELECT * FROM bookings WHERE start >= 1000";
        assert!(matches!(parse_sql(sql), Err(SqlError::MissingFilter("end"))));
    }

    #[test]
    fn parse_select_availability() {
        let sql = "SELECT * FROM availability WHERE start >= 1000 AND \"end\" <= 2000";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::SelectAvailability {
                start: 1000,
                end: 2000,
                min_duration: None
            }
        );
    }

    #[test]
    fn parse_select_availability_min_duration() {
        let sql = "SELECT * FROM availability WHERE start >= 1000 AND \"end\" <= 2000 AND min_duration = 1800000";
        match parse_sql(sql).unwrap() {
            Command::SelectAvailability { min_duration, .. } => {
                assert_eq!(min_duration, Some(1_800_000));
            }
            cmd => panic!("expected SelectAvailability, got {cmd:?}"),
        }
    }

    #[test]
    fn availability_requires_window() {
        let sql = "SELECT * FROM availability";
        assert!(matches!(parse_sql(sql), Err(SqlError::MissingFilter(_))));
    }

    #[test]
    fn parse_listen_unlisten() {
        assert_eq!(
            parse_sql("LISTEN schedule").unwrap(),
            Command::Listen {
                channel: "schedule".into()
            }
        );
        assert_eq!(
            parse_sql("UNLISTEN bookings;").unwrap(),
            Command::Unlisten {
                channel: "bookings".into()
            }
        );
        assert_eq!(parse_sql("UNLISTEN *").unwrap(), Command::UnlistenAll);
    }

    #[test]
    fn unknown_table_errors() {
        let sql = format!("INSERT INTO oil_logs (id) VALUES ('{ID}')");
        assert!(matches!(parse_sql(&sql), Err(SqlError::UnknownTable(_))));
    }

    #[test]
    fn empty_errors() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
    }

    #[test]
    fn bad_timestamp_errors() {
        let sql = format!(r#"INSERT INTO bookings (id, start, "end") VALUES ('{ID}', 'someday', 'never')"#);
        assert!(matches!(parse_sql(&sql), Err(SqlError::Parse(_))));
    }
}
