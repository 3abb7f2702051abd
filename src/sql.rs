use chrono::NaiveDate;
use sqlparser::ast::{self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::limits::*;
use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertSalesManager(SalesManager),
    InsertSlots {
        slots: Vec<Slot>,
    },
    DeleteSlot {
        id: i64,
    },
    DeleteSalesManager {
        id: i64,
    },
    SelectAvailability {
        request: AvailabilityRequest,
        strategy: Option<Strategy>,
    },
    SelectSalesManagers,
    SelectSlots {
        date: NaiveDate,
        manager_ids: Vec<i64>,
        booked: Option<bool>,
    },
    SelectHealth,
}

/// Parse a single statement; anything after the first is ignored.
pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    let Some(first) = stmts.first() else {
        return Err(SqlError::Empty);
    };
    parse_statement(first)
}

/// Parse every `;`-separated statement of a simple query.
pub fn parse_statements(sql: &str) -> Result<Vec<Command>, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }
    stmts.iter().map(parse_statement).collect()
}

fn parse_statement(stmt: &Statement) -> Result<Command, SqlError> {
    match stmt {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let rows = extract_all_insert_rows(insert)?;

    match table.as_str() {
        "sales_managers" => {
            if rows.len() != 1 {
                return Err(SqlError::Unsupported("multi-row INSERT INTO sales_managers".into()));
            }
            let values = &rows[0];
            if values.len() < 5 {
                return Err(SqlError::WrongArity("sales_managers", 5, values.len()));
            }
            let name = parse_string(&values[1])?;
            if name.chars().count() > MAX_NAME_LEN {
                return Err(SqlError::Invalid(format!("name longer than {MAX_NAME_LEN} characters")));
            }
            Ok(Command::InsertSalesManager(SalesManager {
                id: parse_i64(&values[0])?,
                name,
                languages: parse_token_list(&values[2])?.into_iter().collect(),
                products: parse_token_list(&values[3])?.into_iter().collect(),
                customer_ratings: parse_token_list(&values[4])?.into_iter().collect(),
            }))
        }
        "slots" => {
            if rows.len() > MAX_BATCH_ROWS {
                return Err(SqlError::Invalid(format!("more than {MAX_BATCH_ROWS} rows in one INSERT")));
            }
            let mut slots = Vec::with_capacity(rows.len());
            for (i, row) in rows.iter().enumerate() {
                if row.len() < 4 {
                    return Err(SqlError::WrongArity("slots", 4, row.len()));
                }
                let slot = parse_slot_row(row).map_err(|e| SqlError::Parse(format!("row {i}: {e}")))?;
                slots.push(slot);
            }
            Ok(Command::InsertSlots { slots })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_slot_row(row: &[Expr]) -> Result<Slot, SqlError> {
    Ok(Slot::new(
        parse_i64(&row[0])?,
        parse_i64(&row[1])?,
        parse_instant_expr(&row[2])?,
        parse_bool(&row[3])?,
    ))
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    let id = extract_where_id(&delete.selection)?;

    match table.as_str() {
        "slots" => Ok(Command::DeleteSlot { id }),
        "sales_managers" => Ok(Command::DeleteSalesManager { id }),
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

    let mut predicates = Vec::new();
    if let Some(selection) = &select.selection {
        collect_predicates(selection, &mut predicates)?;
    }

    match table.as_str() {
        "availability" => parse_availability_filters(&predicates),
        "slots" => parse_slot_filters(&predicates),
        "sales_managers" => {
            reject_filters("sales_managers", &predicates)?;
            Ok(Command::SelectSalesManagers)
        }
        "health" => {
            reject_filters("health", &predicates)?;
            Ok(Command::SelectHealth)
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_availability_filters(predicates: &[(String, Predicate<'_>)]) -> Result<Command, SqlError> {
    let (mut date, mut language, mut rating, mut products, mut strategy) = (None, None, None, None, None);
    for (column, predicate) in predicates {
        match column.as_str() {
            "date" => date = Some(parse_date_expr(predicate.single(column)?)?),
            "language" => language = Some(parse_token(predicate.single(column)?)?),
            "rating" => rating = Some(parse_token(predicate.single(column)?)?),
            "products" | "product" => products = Some(predicate_tokens(predicate)?),
            "strategy" => {
                let raw = parse_string(predicate.single(column)?)?;
                strategy = Some(raw.parse::<Strategy>().map_err(SqlError::Invalid)?);
            }
            _ => return Err(SqlError::UnknownColumn("availability", column.clone())),
        }
    }

    let products: Vec<String> = products.ok_or(SqlError::MissingFilter("products"))?;
    if products.is_empty() {
        return Err(SqlError::Invalid("products must not be empty".into()));
    }
    if products.len() > MAX_REQUESTED_PRODUCTS {
        return Err(SqlError::Invalid(format!("more than {MAX_REQUESTED_PRODUCTS} products requested")));
    }

    Ok(Command::SelectAvailability {
        request: AvailabilityRequest {
            date: date.ok_or(SqlError::MissingFilter("date"))?,
            products,
            language: language.ok_or(SqlError::MissingFilter("language"))?,
            rating: rating.ok_or(SqlError::MissingFilter("rating"))?,
        },
        strategy,
    })
}

fn parse_slot_filters(predicates: &[(String, Predicate<'_>)]) -> Result<Command, SqlError> {
    let (mut date, mut manager_ids, mut booked) = (None, None, None);
    for (column, predicate) in predicates {
        match column.as_str() {
            "date" => date = Some(parse_date_expr(predicate.single(column)?)?),
            "sales_manager_id" => {
                let ids = match predicate {
                    Predicate::Eq(expr) => vec![parse_i64(expr)?],
                    Predicate::In(list) => list.iter().map(parse_i64).collect::<Result<Vec<_>, _>>()?,
                };
                if ids.len() > MAX_BATCH_ROWS {
                    return Err(SqlError::Invalid(format!("more than {MAX_BATCH_ROWS} ids")));
                }
                manager_ids = Some(ids);
            }
            "booked" => booked = Some(parse_bool(predicate.single(column)?)?),
            _ => return Err(SqlError::UnknownColumn("slots", column.clone())),
        }
    }

    Ok(Command::SelectSlots {
        date: date.ok_or(SqlError::MissingFilter("date"))?,
        manager_ids: manager_ids.ok_or(SqlError::MissingFilter("sales_manager_id"))?,
        booked,
    })
}

fn reject_filters(table: &'static str, predicates: &[(String, Predicate<'_>)]) -> Result<(), SqlError> {
    match predicates.first() {
        Some((column, _)) => Err(SqlError::UnknownColumn(table, column.clone())),
        None => Ok(()),
    }
}

// ── WHERE clause ──────────────────────────────────────────────

/// A single `column = value` or `column IN (...)` condition.
enum Predicate<'a> {
    Eq(&'a Expr),
    In(&'a [Expr]),
}

impl<'a> Predicate<'a> {
    fn single(&self, column: &str) -> Result<&'a Expr, SqlError> {
        match self {
            Predicate::Eq(expr) => Ok(*expr),
            Predicate::In(_) => Err(SqlError::Unsupported(format!("IN list for {column}"))),
        }
    }
}

/// Flatten an AND-tree of equality / IN conditions.
fn collect_predicates<'a>(expr: &'a Expr, out: &mut Vec<(String, Predicate<'a>)>) -> Result<(), SqlError> {
    match expr {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::And,
            right,
        } => {
            collect_predicates(left, out)?;
            collect_predicates(right, out)
        }
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            let column = expr_column_name(left).ok_or_else(|| SqlError::Unsupported(format!("condition: {expr}")))?;
            out.push((column, Predicate::Eq(right)));
            Ok(())
        }
        Expr::InList {
            expr: column,
            list,
            negated: false,
        } => {
            let column = expr_column_name(column).ok_or_else(|| SqlError::Unsupported(format!("condition: {expr}")))?;
            out.push((column, Predicate::In(list)));
            Ok(())
        }
        Expr::Nested(inner) => collect_predicates(inner, out),
        other => Err(SqlError::Unsupported(format!("condition: {other}"))),
    }
}

fn predicate_tokens(predicate: &Predicate<'_>) -> Result<Vec<String>, SqlError> {
    match predicate {
        Predicate::Eq(expr) => parse_token_list(expr),
        Predicate::In(list) => list.iter().map(parse_token).collect(),
    }
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

fn extract_all_insert_rows(insert: &ast::Insert) -> Result<Vec<Vec<Expr>>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.is_empty() {
                return Err(SqlError::Parse("empty VALUES".into()));
            }
            Ok(values.rows.clone())
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn extract_where_id(selection: &Option<Expr>) -> Result<i64, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } if expr_column_name(left).as_deref() == Some("id") => parse_i64(right),
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

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) | Some(Value::DoubleQuotedString(s)) => Ok(s.clone()),
        Some(value) => Err(SqlError::Parse(format!("expected string, got {value}"))),
        None => Err(SqlError::Parse(format!("expected value, got {expr}"))),
    }
}

/// A language, product or rating name.
fn parse_token(expr: &Expr) -> Result<String, SqlError> {
    validate_token(parse_string(expr)?)
}

fn validate_token(token: String) -> Result<String, SqlError> {
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(SqlError::Invalid("empty token".into()));
    }
    if token.chars().count() > MAX_TOKEN_LEN {
        return Err(SqlError::Invalid(format!("token longer than {MAX_TOKEN_LEN} characters")));
    }
    Ok(token)
}

/// `ARRAY['a', 'b']`, a Postgres array literal `'{a,b}'`, or a single `'a'`.
fn parse_token_list(expr: &Expr) -> Result<Vec<String>, SqlError> {
    if let Expr::Array(array) = expr {
        return array.elem.iter().map(parse_token).collect();
    }
    let raw = parse_string(expr)?;
    let trimmed = raw.trim();
    match trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(inner) if inner.trim().is_empty() => Ok(Vec::new()),
        Some(inner) => inner
            .split(',')
            .map(|item| validate_token(item.trim().trim_matches('"').to_string()))
            .collect(),
        None => Ok(vec![validate_token(raw)?]),
    }
}

fn parse_i64(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad integer {s}: {e}"))),
            Value::SingleQuotedString(s) => s
                .trim()
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad integer {s}: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_i64(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr}")))
    }
}

/// Integer milliseconds, or an RFC 3339 string.
fn parse_instant_expr(expr: &Expr) -> Result<Ms, SqlError> {
    let ms = match extract_value(expr) {
        Some(Value::SingleQuotedString(s)) => match s.trim().parse::<i64>() {
            Ok(ms) => ms,
            Err(_) => parse_instant(s).map_err(|e| SqlError::Invalid(e.to_string()))?,
        },
        _ => parse_i64(expr)?,
    };
    slot_start(ms).map_err(|e| SqlError::Invalid(e.to_string()))
}

fn parse_date_expr(expr: &Expr) -> Result<NaiveDate, SqlError> {
    let raw = parse_string(expr)?;
    parse_day(&raw).map_err(|e| SqlError::Invalid(e.to_string()))
}

fn parse_bool(expr: &Expr) -> Result<bool, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::SingleQuotedString(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(SqlError::Parse(format!("bad bool: {s}"))),
            },
            Value::Number(n, _) => Ok(n != "0"),
            _ => Err(SqlError::Parse(format!("expected bool, got {value}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr}")))
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(&'static str, String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
    Invalid(String),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(t, c) => write!(f, "unknown column for {t}: {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
            SqlError::Invalid(s) => write!(f, "invalid value: {s}"),
        }
    }
}

impl std::error::Error for SqlError {}

#[cfg(test)]
mod tests {
    use super::*;

    const AVAIL: &str = "SELECT * FROM availability WHERE date = '2024-05-03' AND language = 'German' AND rating = 'Gold'";

    fn ms(s: &str) -> Ms {
        parse_instant(s).unwrap()
    }

    #[test]
    fn parse_insert_sales_manager_with_arrays() {
        let sql = "INSERT INTO sales_managers (id, name, languages, products, customer_ratings) \
                   VALUES (2, 'Seller 2', ARRAY['German', 'English'], ARRAY['SolarPanels', 'Heatpumps'], ARRAY['Gold'])";
        let cmd = parse_sql(sql).unwrap();
        assert_eq!(
            cmd,
            Command::InsertSalesManager(SalesManager::new(
                2,
                "Seller 2",
                ["German", "English"],
                ["SolarPanels", "Heatpumps"],
                ["Gold"],
            ))
        );
    }

    #[test]
    fn parse_insert_sales_manager_with_array_literals() {
        let sql = "INSERT INTO sales_managers VALUES (3, 'Seller 3', '{German}', '{Heatpumps, SolarPanels}', '{}')";
        match parse_sql(sql).unwrap() {
            Command::InsertSalesManager(m) => {
                assert_eq!(m.id, 3);
                assert_eq!(m.products.len(), 2);
                assert!(m.products.contains("SolarPanels"));
                assert!(m.customer_ratings.is_empty());
            }
            cmd => panic!("expected InsertSalesManager, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_sales_manager_wrong_arity() {
        let sql = "INSERT INTO sales_managers VALUES (3, 'Seller 3', '{German}')";
        assert_eq!(parse_sql(sql), Err(SqlError::WrongArity("sales_managers", 5, 3)));
    }

    #[test]
    fn parse_insert_slots_batch() {
        let sql = "INSERT INTO slots (id, sales_manager_id, start_date, booked) VALUES \
                   (1, 2, '2024-05-03T10:30:00Z', false), \
                   (2, 2, '2024-05-03T11:00:00.000Z', true), \
                   (3, 2, 1714735800000, 'f')";
        match parse_sql(sql).unwrap() {
            Command::InsertSlots { slots } => {
                assert_eq!(slots.len(), 3);
                assert_eq!(slots[0], Slot::new(1, 2, ms("2024-05-03T10:30:00Z"), false));
                assert!(slots[1].booked);
                assert_eq!(slots[2].span.start, ms("2024-05-03T11:30:00Z"));
                assert!(slots.iter().all(|s| s.span.end - s.span.start == HOUR_MS));
            }
            cmd => panic!("expected InsertSlots, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_slot_bad_timestamp_names_row() {
        let sql = "INSERT INTO slots VALUES (1, 2, '2024-05-03T10:30:00Z', false), (2, 2, 'noon', false)";
        let err = parse_sql(sql).unwrap_err();
        assert!(err.to_string().contains("row 1"), "{err}");
    }

    #[test]
    fn parse_insert_slot_rejects_unrepresentable_start() {
        for start in ["9223372036854775000", "'9223372036854775000'", "-9223372036854775000"] {
            let sql = format!("INSERT INTO slots VALUES (1, 1, {start}, false)");
            assert!(
                matches!(parse_sql(&sql), Err(SqlError::Parse(ref msg)) if msg.contains("row 0")),
                "{start}"
            );
        }
    }

    #[test]
    fn parse_delete_slot_and_manager() {
        assert_eq!(parse_sql("DELETE FROM slots WHERE id = 7").unwrap(), Command::DeleteSlot { id: 7 });
        assert_eq!(
            parse_sql("DELETE FROM sales_managers WHERE id = '3'").unwrap(),
            Command::DeleteSalesManager { id: 3 }
        );
        assert_eq!(parse_sql("DELETE FROM slots"), Err(SqlError::MissingFilter("id")));
    }

    #[test]
    fn parse_select_availability_in_list() {
        let sql = format!("{AVAIL} AND products IN ('SolarPanels', 'Heatpumps')");
        match parse_sql(&sql).unwrap() {
            Command::SelectAvailability { request, strategy } => {
                assert_eq!(request.date, parse_day("2024-05-03").unwrap());
                assert_eq!(request.products, vec!["SolarPanels", "Heatpumps"]);
                assert_eq!(request.language, "German");
                assert_eq!(request.rating, "Gold");
                assert_eq!(strategy, None);
            }
            cmd => panic!("expected SelectAvailability, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_availability_array_and_strategy() {
        let sql = format!("{AVAIL} AND products = ARRAY['Heatpumps'] AND strategy = 'db'");
        match parse_sql(&sql).unwrap() {
            Command::SelectAvailability { request, strategy } => {
                assert_eq!(request.products, vec!["Heatpumps"]);
                assert_eq!(strategy, Some(Strategy::Store));
            }
            cmd => panic!("expected SelectAvailability, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_availability_literal_products() {
        let sql = format!("{AVAIL} AND products = '{{SolarPanels,Heatpumps}}'");
        match parse_sql(&sql).unwrap() {
            Command::SelectAvailability { request, .. } => {
                assert_eq!(request.products, vec!["SolarPanels", "Heatpumps"]);
            }
            cmd => panic!("expected SelectAvailability, got {cmd:?}"),
        }
    }

    #[test]
    fn availability_requires_every_filter() {
        let no_products = parse_sql(AVAIL).unwrap_err();
        assert_eq!(no_products, SqlError::MissingFilter("products"));

        let no_rating = "SELECT * FROM availability WHERE date = '2024-05-03' AND language = 'German' AND products IN ('Heatpumps')";
        assert_eq!(parse_sql(no_rating), Err(SqlError::MissingFilter("rating")));
    }

    #[test]
    fn availability_rejects_bad_values() {
        let empty = format!("{AVAIL} AND products = '{{}}'");
        assert!(matches!(parse_sql(&empty), Err(SqlError::Invalid(_))));

        let bad_date = "SELECT * FROM availability WHERE date = '2024-02-30' AND language = 'German' AND rating = 'Gold' AND products IN ('Heatpumps')";
        assert!(matches!(parse_sql(bad_date), Err(SqlError::Invalid(_))));

        let bad_strategy = format!("{AVAIL} AND products IN ('Heatpumps') AND strategy = 'fastest'");
        assert!(matches!(parse_sql(&bad_strategy), Err(SqlError::Invalid(_))));

        let long = "x".repeat(MAX_TOKEN_LEN + 1);
        let long_token = format!("{AVAIL} AND products IN ('{long}')");
        assert!(matches!(parse_sql(&long_token), Err(SqlError::Invalid(_))));

        let unknown = format!("{AVAIL} AND products IN ('Heatpumps') AND region = 'north'");
        assert_eq!(
            parse_sql(&unknown),
            Err(SqlError::UnknownColumn("availability", "region".into()))
        );
    }

    #[test]
    fn availability_rejects_non_equality_conditions() {
        let sql = format!("{AVAIL} AND products IN ('Heatpumps') OR rating = 'Silver'");
        assert!(matches!(parse_sql(&sql), Err(SqlError::Unsupported(_))));
    }

    #[test]
    fn parse_select_slots() {
        let sql = "SELECT * FROM slots WHERE date = '2024-05-03' AND sales_manager_id IN (1, 2) AND booked = false";
        assert_eq!(
            parse_sql(sql).unwrap(),
            Command::SelectSlots {
                date: parse_day("2024-05-03").unwrap(),
                manager_ids: vec![1, 2],
                booked: Some(false),
            }
        );
        let single = "SELECT * FROM slots WHERE sales_manager_id = 4 AND date = '2024-05-03'";
        assert!(matches!(
            parse_sql(single).unwrap(),
            Command::SelectSlots { booked: None, ref manager_ids, .. } if manager_ids == &vec![4]
        ));
    }

    #[test]
    fn parse_select_listing_tables() {
        assert_eq!(parse_sql("SELECT * FROM sales_managers").unwrap(), Command::SelectSalesManagers);
        assert_eq!(parse_sql("select status from HEALTH").unwrap(), Command::SelectHealth);
        assert!(matches!(
            parse_sql("SELECT * FROM health WHERE status = 'ok'"),
            Err(SqlError::UnknownColumn("health", _))
        ));
    }

    #[test]
    fn parse_unknown_table_errors() {
        let sql = "INSERT INTO bookings (id) VALUES (1)";
        assert_eq!(parse_sql(sql), Err(SqlError::UnknownTable("bookings".into())));
        assert!(matches!(parse_sql("SELECT * FROM calendars"), Err(SqlError::UnknownTable(_))));
    }

    #[test]
    fn parse_statements_keeps_order() {
        let sql = "DELETE FROM slots WHERE id = 4; DELETE FROM slots WHERE id = 6; SELECT * FROM health;";
        assert_eq!(
            parse_statements(sql).unwrap(),
            vec![
                Command::DeleteSlot { id: 4 },
                Command::DeleteSlot { id: 6 },
                Command::SelectHealth,
            ]
        );
        assert!(matches!(
            parse_statements("SELECT * FROM health; DROP TABLE slots"),
            Err(SqlError::Unsupported(_))
        ));
    }

    #[test]
    fn parse_empty_errors() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
    }

    #[test]
    fn parse_unsupported_statement() {
        assert!(matches!(parse_sql("DROP TABLE slots"), Err(SqlError::Unsupported(_))));
    }
}
