//! Queries bound to a factory.

use std::sync::Arc;

use crate::core::bom::downcast;
use crate::core::component::{Component, NamedComponent};
use crate::core::name::Name;
use crate::core::query::Query;
use crate::resolver::errors::FactoryError;
use crate::resolver::Factory;

/// A query ready to run against a factory.
///
/// ```rust,ignore
/// let greeting = factory
///     .query_by_name(Name::of::<String>("greeting"))
///     .find_one()?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BoundQuery<'a> {
    factory: &'a Factory,
    query: Query,
}

impl<'a> BoundQuery<'a> {
    pub(crate) fn new(factory: &'a Factory, query: Query) -> Self {
        BoundQuery { factory, query }
    }

    pub fn mandatory(self) -> Self {
        BoundQuery {
            query: self.query.mandatory(),
            ..self
        }
    }

    pub fn optional(self) -> Self {
        BoundQuery {
            query: self.query.optional(),
            ..self
        }
    }

    pub fn query(&self) -> Query {
        self.query
    }

    /// Identities of the matching components, building nothing but
    /// activation flags.
    pub fn find_names(&self) -> Vec<Name> {
        let mut names = self.factory.find_names(&self.query);
        names.sort();
        names
    }

    /// Every matching component, ordered by priority then name.
    pub fn find(&self) -> Result<Vec<NamedComponent>, FactoryError> {
        self.factory.find(&self.query, &[])
    }

    /// The single matching component.
    ///
    /// Fails with [`FactoryError::Ambiguous`] when more than one matches.
    pub fn find_one(&self) -> Result<Option<NamedComponent>, FactoryError> {
        let mut found = self.find()?;
        match found.len() {
            0 | 1 => Ok(found.pop()),
            _ => Err(FactoryError::ambiguous(&self.query, &found)),
        }
    }

    /// Every matching component, downcast to `T`.
    pub fn find_as<T: Component>(&self) -> Result<Vec<Arc<T>>, FactoryError> {
        self.find()?.iter().map(downcast::<T>).collect()
    }

    /// The single matching component, downcast to `T`.
    pub fn find_one_as<T: Component>(&self) -> Result<Option<Arc<T>>, FactoryError> {
        self.find_one()?.as_ref().map(downcast::<T>).transpose()
    }
}
