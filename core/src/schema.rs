//! Per-entity field metadata.
//!
//! Every mapped type describes itself with a static, ordered list of
//! [`Field`] descriptors. Declaration order is significant: it fixes column
//! order in generated statements, bind-parameter order, validation order,
//! and sort precedence.

use std::fmt;

use serde::Serialize;

use crate::value::{Value, ValueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Decimal,
    Text,
    Date,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Text => "text",
            FieldKind::Date => "date",
        })
    }
}

/// A validation rule attached to a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Non-null, and non-blank when textual.
    Required,
    /// Text must equal one of the listed values exactly.
    OneOf(&'static [&'static str]),
    /// Inclusive numeric range.
    Range { min: f64, max: f64 },
    /// Strictly greater than the bound.
    Above(f64),
    /// Greater than or equal to the bound.
    AtLeast(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

pub type Getter<E> = fn(&E) -> Value;
pub type Setter<E> = fn(&mut E, Value) -> Result<(), ValueError>;

/// Static descriptor for one persisted field of entity `E`.
pub struct Field<E> {
    pub name: &'static str,
    pub kind: FieldKind,
    pub constraints: &'static [Constraint],
    pub primary_key: bool,
    pub order: Option<SortOrder>,
    pub ignored: bool,
    pub get: Getter<E>,
    pub set: Setter<E>,
}

impl<E> Field<E> {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind, get: Getter<E>, set: Setter<E>) -> Self {
        Self {
            name,
            kind,
            constraints: &[],
            primary_key: false,
            order: None,
            ignored: false,
            get,
            set,
        }
    }

    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub const fn check(mut self, constraints: &'static [Constraint]) -> Self {
        self.constraints = constraints;
        self
    }

    #[must_use]
    pub const fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    /// Keep the field out of persistence, criteria and validation.
    #[must_use]
    pub const fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.constraints.contains(&Constraint::Required)
    }

    #[must_use]
    pub fn value(&self, entity: &E) -> Value {
        (self.get)(entity)
    }
}

impl<E> fmt::Debug for Field<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("constraints", &self.constraints)
            .field("primary_key", &self.primary_key)
            .field("order", &self.order)
            .field("ignored", &self.ignored)
            .finish_non_exhaustive()
    }
}

/// A record type mapped onto one table.
///
/// Implementors declare metadata only; all persistence lives in
/// [`crate::mapper`].
pub trait Entity: Default + Sized + 'static {
    /// Human-readable type name used in error messages.
    const NAME: &'static str;
    const TABLE: &'static str;
    const FIELDS: &'static [Field<Self>];

    /// Descriptors that take part in mapping, in declaration order.
    fn mapped_fields() -> impl Iterator<Item = &'static Field<Self>> {
        Self::FIELDS.iter().filter(|f| !f.ignored)
    }

    fn primary_key_fields() -> impl Iterator<Item = &'static Field<Self>> {
        Self::mapped_fields().filter(|f| f.primary_key)
    }
}

/// Declare a [`Field`] whose accessor reads and writes the struct field of
/// the same name. An explicit column name can be given for struct fields
/// whose column is not a valid Rust identifier.
#[macro_export]
macro_rules! field {
    ($entity:ty, $member:ident, $kind:ident) => {
        $crate::field!($entity, $member, stringify!($member), $kind)
    };
    ($entity:ty, $member:ident, $column:expr, $kind:ident) => {
        $crate::schema::Field::<$entity>::new(
            $column,
            $crate::schema::FieldKind::$kind,
            |e| $crate::value::Value::from(e.$member.clone()),
            |e, v| {
                e.$member = $crate::value::FromValue::from_value(v)?;
                Ok(())
            },
        )
    };
}
