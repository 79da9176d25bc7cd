use std::fmt;

use crate::value::ValueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Validate,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Select => "selection",
            Operation::Validate => "validation",
            Operation::Insert => "insertion",
            Operation::Update => "update",
            Operation::Delete => "deletion",
        })
    }
}

/// The rule a field value broke.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    Missing,
    NotOneOf(&'static [&'static str]),
    OutOfRange { min: f64, max: f64 },
    NotAbove(f64),
    Below(f64),
    WrongKind(ValueError),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing => f.write_str("is required"),
            Violation::NotOneOf(allowed) => {
                write!(f, "must be one of the following: {}", allowed.join(", "))
            }
            Violation::OutOfRange { min, max } => write!(f, "must be between {min} and {max}"),
            Violation::NotAbove(bound) => write!(f, "must be greater than {bound}"),
            Violation::Below(bound) => write!(f, "must be at least {bound}"),
            Violation::WrongKind(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("Missing metadata for {entity}: {message}")]
    Metadata {
        entity: &'static str,
        message: String,
    },

    #[error("Invalid {entity}: value for field '{field}' {violation}")]
    Validation {
        entity: &'static str,
        field: &'static str,
        violation: Violation,
    },

    #[error("Encountered an error during {operation} for {entity}: {source}")]
    Query {
        entity: &'static str,
        operation: Operation,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Encountered an error while parsing {operation} results for {entity}: column '{column}': {message}")]
    Mapping {
        entity: &'static str,
        operation: Operation,
        column: &'static str,
        message: String,
    },

    #[error("Missing parameter fields for {operation} of {entity}")]
    NoColumns {
        entity: &'static str,
        operation: Operation,
    },

    #[error("Missing primary key field(s) for {operation} of {entity}")]
    MissingPrimaryKey {
        entity: &'static str,
        operation: Operation,
    },

    #[error("Failed to perform {operation} for {entity}: no rows affected")]
    NoRowsAffected {
        entity: &'static str,
        operation: Operation,
    },

    #[error("{entity} refers to a missing {related} (id {key})")]
    MissingRelated {
        entity: &'static str,
        related: &'static str,
        key: String,
    },
}

impl MapperError {
    /// The field that failed validation, if this is a validation error.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            MapperError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MapperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field_and_rule() {
        let err = MapperError::Validation {
            entity: "Meal",
            field: "type",
            violation: Violation::NotOneOf(&["breakfast", "lunch", "dinner"]),
        };
        assert_eq!(
            err.to_string(),
            "Invalid Meal: value for field 'type' must be one of the following: breakfast, lunch, dinner"
        );
        assert_eq!(err.field(), Some("type"));
    }

    #[test]
    fn test_operation_errors_name_entity_and_operation() {
        let err = MapperError::NoRowsAffected {
            entity: "FoodItem",
            operation: Operation::Update,
        };
        assert_eq!(
            err.to_string(),
            "Failed to perform update for FoodItem: no rows affected"
        );
        let err = MapperError::MissingPrimaryKey {
            entity: "ShoppingListItem",
            operation: Operation::Delete,
        };
        assert_eq!(
            err.to_string(),
            "Missing primary key field(s) for deletion of ShoppingListItem"
        );
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_range_message() {
        let v = Violation::OutOfRange { min: 1.0, max: 7.0 };
        assert_eq!(v.to_string(), "must be between 1 and 7");
    }
}
