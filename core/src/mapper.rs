//! One implementation of select, validate, insert, update and delete for
//! every [`Entity`], driven entirely by its field descriptors.
//!
//! Statement construction is kept separate from execution so the generated
//! SQL can be inspected without a database.

use tracing::warn;

use crate::error::{MapperError, Operation, Result, Violation};
use crate::schema::{Constraint, Entity, Field, FieldKind};
use crate::session::{Row, Session};
use crate::value::{Value, ValueError};

/// SQL text plus its bind parameters, grouped in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    /// Columns whose generated values are requested back.
    pub returning: Vec<&'static str>,
    pub params: Vec<Vec<Value>>,
}

impl Statement {
    #[must_use]
    pub fn groups(&self) -> Vec<&[Value]> {
        self.params.iter().map(Vec::as_slice).collect()
    }
}

fn check_metadata<E: Entity>() -> Result<()> {
    if E::TABLE.trim().is_empty() {
        return Err(MapperError::Metadata {
            entity: E::NAME,
            message: "table name is empty".to_string(),
        });
    }
    if E::mapped_fields().next().is_none() {
        return Err(MapperError::Metadata {
            entity: E::NAME,
            message: "no mapped fields".to_string(),
        });
    }
    Ok(())
}

fn require_primary_key<E: Entity>(operation: Operation) -> Result<()> {
    if E::primary_key_fields().next().is_none() {
        return Err(MapperError::MissingPrimaryKey {
            entity: E::NAME,
            operation,
        });
    }
    Ok(())
}

/// `key = ?` conditions over every primary-key field, with their values.
fn key_conditions<E: Entity>(entity: &E, operation: Operation) -> Result<(Vec<String>, Vec<Value>)> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    for field in E::primary_key_fields() {
        let value = field.value(entity);
        if value.is_null() {
            return Err(MapperError::MissingPrimaryKey {
                entity: E::NAME,
                operation,
            });
        }
        conditions.push(format!("{} = ?", field.name));
        values.push(value);
    }
    if conditions.is_empty() {
        return Err(MapperError::MissingPrimaryKey {
            entity: E::NAME,
            operation,
        });
    }
    Ok((conditions, values))
}

/// Build `SELECT * FROM <table> [WHERE ...] [ORDER BY ...]` from a criteria
/// instance. Every non-null field is an equality filter, or a `LIKE` filter
/// when it is text containing a wildcard marker.
pub fn build_select<E: Entity>(criteria: &E) -> Result<Statement> {
    check_metadata::<E>()?;

    let mut filters = Vec::new();
    let mut params = Vec::new();
    let mut order_by = Vec::new();

    for field in E::mapped_fields() {
        let value = field.value(criteria);
        if !value.is_null() {
            let op = if value.is_pattern() { "LIKE" } else { "=" };
            filters.push(format!("{} {op} ?", field.name));
            params.push(value);
        }
        if let Some(order) = field.order {
            order_by.push(format!("{} {}", field.name, order.as_sql()));
        }
    }

    let mut sql = format!("SELECT * FROM {}", E::TABLE);
    if !filters.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&filters.join(" AND "));
    }
    if !order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by.join(", "));
    }

    Ok(Statement {
        sql,
        returning: Vec::new(),
        params: vec![params],
    })
}

/// Build an `INSERT`. Primary-key fields without a value are left to the
/// store and requested back; every other field is an explicit column.
pub fn build_insert<E: Entity>(entity: &E) -> Result<Statement> {
    check_metadata::<E>()?;
    require_primary_key::<E>(Operation::Insert)?;

    let mut returning = Vec::new();
    let mut columns = Vec::new();
    let mut params = Vec::new();

    for field in E::mapped_fields() {
        let value = field.value(entity);
        if field.primary_key && value.is_null() {
            returning.push(field.name);
            continue;
        }
        columns.push(field.name);
        params.push(value);
    }

    if columns.is_empty() {
        return Err(MapperError::NoColumns {
            entity: E::NAME,
            operation: Operation::Insert,
        });
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        E::TABLE,
        columns.join(", ")
    );
    Ok(Statement {
        sql,
        returning,
        params: vec![params],
    })
}

/// Build `UPDATE <table> SET ... WHERE <keys>`; SET values bind before key values.
pub fn build_update<E: Entity>(entity: &E) -> Result<Statement> {
    check_metadata::<E>()?;

    let mut assignments = Vec::new();
    let mut values = Vec::new();
    for field in E::mapped_fields().filter(|f| !f.primary_key) {
        assignments.push(format!("{} = ?", field.name));
        values.push(field.value(entity));
    }
    if assignments.is_empty() {
        return Err(MapperError::NoColumns {
            entity: E::NAME,
            operation: Operation::Update,
        });
    }

    let (conditions, keys) = key_conditions(entity, Operation::Update)?;
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        E::TABLE,
        assignments.join(", "),
        conditions.join(" AND ")
    );
    Ok(Statement {
        sql,
        returning: Vec::new(),
        params: vec![values, keys],
    })
}

pub fn build_delete<E: Entity>(entity: &E) -> Result<Statement> {
    check_metadata::<E>()?;

    let (conditions, keys) = key_conditions(entity, Operation::Delete)?;
    let sql = format!("DELETE FROM {} WHERE {}", E::TABLE, conditions.join(" AND "));
    Ok(Statement {
        sql,
        returning: Vec::new(),
        params: vec![keys],
    })
}

fn report<E: Entity>(operation: Operation) -> impl Fn(&MapperError) {
    move |err: &MapperError| {
        warn!(entity = E::NAME, %operation, error = %err, "mapper operation failed");
    }
}

fn query_error<E: Entity>(operation: Operation) -> impl FnOnce(rusqlite::Error) -> MapperError {
    move |source| MapperError::Query {
        entity: E::NAME,
        operation,
        source,
    }
}

fn mapping_error<E: Entity>(operation: Operation, column: &'static str, message: String) -> MapperError {
    MapperError::Mapping {
        entity: E::NAME,
        operation,
        column,
        message,
    }
}

/// Assign a store value to a field, converting it to the field's kind first.
fn assign<E: Entity>(entity: &mut E, field: &Field<E>, raw: Value, operation: Operation) -> Result<()> {
    let value = raw
        .coerce(field.kind)
        .map_err(|e| mapping_error::<E>(operation, field.name, e.to_string()))?;
    (field.set)(entity, value).map_err(|e| mapping_error::<E>(operation, field.name, e.to_string()))
}

fn from_row<E: Entity>(mut row: Row) -> Result<E> {
    let mut entity = E::default();
    for field in E::mapped_fields() {
        let raw = row.take(field.name).ok_or_else(|| {
            mapping_error::<E>(
                Operation::Select,
                field.name,
                "column missing from result".to_string(),
            )
        })?;
        assign(&mut entity, field, raw, Operation::Select)?;
    }
    Ok(entity)
}

/// Select every row matching `criteria`, in sort-key order.
///
/// Each row becomes a fresh instance. A row that cannot be mapped fails the
/// whole call; no partial list is returned.
pub fn select<E: Entity>(session: &impl Session, criteria: &E) -> Result<Vec<E>> {
    let result = (|| -> Result<Vec<E>> {
        let stmt = build_select(criteria)?;
        let rows = session
            .query(&stmt.sql, &stmt.groups())
            .map_err(query_error::<E>(Operation::Select))?;
        rows.into_iter().map(from_row::<E>).collect()
    })();
    result.inspect_err(report::<E>(Operation::Select))
}

/// Check every mapped field against its constraints in declaration order,
/// stopping at the first violation.
pub fn validate<E: Entity>(entity: &E) -> Result<()> {
    let result = (|| -> Result<()> {
        check_metadata::<E>()?;
        for field in E::mapped_fields() {
            let value = field.value(entity);
            if value.is_blank() {
                if field.is_required() {
                    return Err(violation::<E>(field, Violation::Missing));
                }
                continue;
            }
            for constraint in field.constraints {
                if let Err(v) = check(*constraint, &value) {
                    return Err(violation::<E>(field, v));
                }
            }
        }
        Ok(())
    })();
    result.inspect_err(report::<E>(Operation::Validate))
}

fn violation<E: Entity>(field: &Field<E>, violation: Violation) -> MapperError {
    MapperError::Validation {
        entity: E::NAME,
        field: field.name,
        violation,
    }
}

fn check(constraint: Constraint, value: &Value) -> std::result::Result<(), Violation> {
    let number = || {
        value
            .as_f64()
            .ok_or_else(|| Violation::WrongKind(ValueError::new(FieldKind::Decimal, value)))
    };
    match constraint {
        Constraint::Required => Ok(()),
        Constraint::OneOf(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => Ok(()),
            Some(_) => Err(Violation::NotOneOf(allowed)),
            None => Err(Violation::WrongKind(ValueError::new(FieldKind::Text, value))),
        },
        Constraint::Range { min, max } => {
            let n = number()?;
            if n < min || n > max {
                Err(Violation::OutOfRange { min, max })
            } else {
                Ok(())
            }
        }
        Constraint::Above(bound) => {
            if number()? > bound {
                Ok(())
            } else {
                Err(Violation::NotAbove(bound))
            }
        }
        Constraint::AtLeast(bound) => {
            if number()? >= bound {
                Ok(())
            } else {
                Err(Violation::Below(bound))
            }
        }
    }
}

/// Insert `entity`, then copy any store-generated keys back onto it.
pub fn insert<E: Entity>(session: &impl Session, entity: &mut E) -> Result<()> {
    let result = (|| -> Result<()> {
        let stmt = build_insert(entity)?;
        let executed = session
            .execute(&stmt.sql, &stmt.returning, &stmt.groups())
            .map_err(query_error::<E>(Operation::Insert))?;
        if executed.affected == 0 {
            return Err(MapperError::NoRowsAffected {
                entity: E::NAME,
                operation: Operation::Insert,
            });
        }
        if let Some(keys) = executed.generated {
            for (column, raw) in stmt.returning.iter().zip(keys) {
                let field = E::mapped_fields()
                    .find(|f| f.name == *column)
                    .ok_or_else(|| MapperError::Metadata {
                        entity: E::NAME,
                        message: format!("no field for generated column '{column}'"),
                    })?;
                assign(entity, field, raw, Operation::Insert)?;
            }
        }
        Ok(())
    })();
    result.inspect_err(report::<E>(Operation::Insert))
}

/// Write every non-key field of `entity` to the row its primary key names.
pub fn update<E: Entity>(session: &impl Session, entity: &E) -> Result<()> {
    let result = (|| -> Result<()> {
        let stmt = build_update(entity)?;
        let executed = session
            .execute(&stmt.sql, &[], &stmt.groups())
            .map_err(query_error::<E>(Operation::Update))?;
        if executed.affected == 0 {
            return Err(MapperError::NoRowsAffected {
                entity: E::NAME,
                operation: Operation::Update,
            });
        }
        Ok(())
    })();
    result.inspect_err(report::<E>(Operation::Update))
}

pub fn delete<E: Entity>(session: &impl Session, entity: &E) -> Result<()> {
    let result = (|| -> Result<()> {
        let stmt = build_delete(entity)?;
        let executed = session
            .execute(&stmt.sql, &[], &stmt.groups())
            .map_err(query_error::<E>(Operation::Delete))?;
        if executed.affected == 0 {
            return Err(MapperError::NoRowsAffected {
                entity: E::NAME,
                operation: Operation::Delete,
            });
        }
        Ok(())
    })();
    result.inspect_err(report::<E>(Operation::Delete))
}
