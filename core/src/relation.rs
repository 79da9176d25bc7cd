//! Memoized lookups of related rows.

use std::cell::OnceCell;
use std::fmt;

use crate::error::{MapperError, Result};
use crate::mapper;
use crate::schema::Entity;
use crate::session::Session;

/// A lazily loaded value owned by an entity.
///
/// The first successful load is kept until [`Related::invalidate`]. A failed
/// load leaves the cell empty so the next call retries. Comparing two cells
/// always succeeds: cached data never affects entity equality.
pub struct Related<T> {
    cell: OnceCell<T>,
}

impl<T> Related<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// The cached value, if one has been loaded.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn get_or_try_load(&self, load: impl FnOnce() -> Result<T>) -> Result<&T> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }
        let value = load()?;
        Ok(self.cell.get_or_init(|| value))
    }

    pub fn invalidate(&mut self) {
        self.cell.take();
    }
}

impl<T> Default for Related<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Related<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T> PartialEq for Related<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for Related<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Related").field(value).finish(),
            None => f.write_str("Related(<unloaded>)"),
        }
    }
}

/// Load the single row of `R` whose primary key matches `criteria`.
///
/// `owner` and `key` only describe the reference for the error raised when
/// no such row exists.
pub(crate) fn load_one<R: Entity>(
    session: &impl Session,
    criteria: Option<R>,
    owner: &'static str,
    key: impl fmt::Display,
) -> Result<R> {
    let missing = || MapperError::MissingRelated {
        entity: owner,
        related: R::NAME,
        key: key.to_string(),
    };
    let criteria = criteria.ok_or_else(missing)?;
    mapper::select(session, &criteria)?
        .into_iter()
        .next()
        .ok_or_else(missing)
}

/// Load every `R` matching `criteria`, or nothing when the parent is unsaved.
pub(crate) fn load_many<R: Entity>(
    session: &impl Session,
    criteria: Option<R>,
) -> Result<Vec<R>> {
    match criteria {
        Some(criteria) => mapper::select(session, &criteria),
        None => Ok(Vec::new()),
    }
}
