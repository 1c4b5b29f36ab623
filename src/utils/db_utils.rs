use chrono::NaiveDate;
use sqlx::{Executor, MySql};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
    Null,
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// `columns` come from typed change sets, never from request JSON keys.
/// `touch` holds fixed assignments appended to every update
/// (e.g. `updated = NOW()`). Returns `None` when there is nothing to change.
pub fn build_update_sql(
    table: &str,
    columns: Vec<(&'static str, SqlValue)>,
    touch: &[&str],
    id_column: &str,
    id_value: u64,
) -> Option<SqlUpdate> {
    if columns.is_empty() {
        return None;
    }

    let set_clause = columns
        .iter()
        .map(|(name, _)| format!("{name} = ?"))
        .chain(touch.iter().map(|t| t.to_string()))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {table} SET {set_clause} WHERE {id_column} = ?");

    let mut values: Vec<SqlValue> = columns.into_iter().map(|(_, value)| value).collect();
    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Some(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update<'e, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_set_clause_with_touch_columns() {
        let update = build_update_sql(
            "employees",
            vec![
                ("position", SqlValue::String("Lead".into())),
                ("status", SqlValue::String("Inactive".into())),
            ],
            &["version = version + 1", "updated = NOW()"],
            "id",
            7,
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE employees SET position = ?, status = ?, version = version + 1, updated = NOW() WHERE id = ?"
        );
        assert_eq!(update.values.last(), Some(&SqlValue::U64(7)));
        assert_eq!(update.values.len(), 3);
    }

    #[test]
    fn empty_change_set_builds_nothing() {
        assert!(build_update_sql("departments", Vec::new(), &["updated = NOW()"], "id", 1).is_none());
    }
}
