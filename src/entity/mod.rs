//! Entity-level iteration on top of the keyset iterator.

use std::marker::PhantomData;
use std::rc::Rc;

use log::debug;

use crate::error::{KeysetError, KeysetResult};
use crate::iter::{Batches, Items, iterate_query_items, iterate_select_query};
use crate::options::{IterateOptions, RepositoryOptions};
use crate::query::{Query, Record};
use crate::storage::row::Row;

/// Converts a raw row into an entity.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> KeysetResult<Self>;
}

/// Something that can start queries over one entity type.
pub trait EntitySource {
    type Entity: Record;
    type Query: Query;

    /// Name of the field that identifies an entity, if declared.
    fn primary_key(&self) -> Option<&str>;

    /// Starts a fresh, unfiltered query over the entity's table.
    fn create_query(&self) -> Self::Query;

    /// Executes `query` and builds full entities from the result.
    fn materialize(&self, query: Self::Query) -> KeysetResult<Vec<Self::Entity>>;
}

/// An entity source made of a query factory and a materializer. It declares no
/// primary key, so the id key has to be given in the options.
pub struct QueryFactory<Q, E, F, M> {
    factory: F,
    materializer: M,
    _types: PhantomData<fn() -> (Q, E)>,
}

impl<Q, E, F, M> QueryFactory<Q, E, F, M>
where
    F: Fn() -> Q,
    M: Fn(Q) -> KeysetResult<Vec<E>>,
{
    pub fn new(factory: F, materializer: M) -> Self {
        QueryFactory { factory, materializer, _types: PhantomData }
    }
}

impl<Q, E, F, M> EntitySource for QueryFactory<Q, E, F, M>
where
    Q: Query,
    E: Record,
    F: Fn() -> Q,
    M: Fn(Q) -> KeysetResult<Vec<E>>,
{
    type Entity = E;
    type Query = Q;

    fn primary_key(&self) -> Option<&str> {
        None
    }

    fn create_query(&self) -> Q {
        (self.factory)()
    }

    fn materialize(&self, query: Q) -> KeysetResult<Vec<E>> {
        (self.materializer)(query)
    }
}

fn resolve_key<S: EntitySource>(source: &S, options: &RepositoryOptions) -> KeysetResult<String> {
    let key = options
        .id_key
        .as_deref()
        .or_else(|| source.primary_key())
        .filter(|k| !k.trim().is_empty())
        .ok_or(KeysetError::MissingIterationKey)?;
    Ok(key.to_string())
}

/// Iterates an entity source in batches, keyed by its primary key unless
/// `options.id_key` says otherwise.
pub fn iterate_repository<S>(
    source: S,
    options: RepositoryOptions,
) -> KeysetResult<Batches<impl Fn() -> S::Query, S::Entity>>
where
    S: EntitySource + 'static,
{
    let iteration_key = resolve_key(&source, &options)?;
    debug!("iterating entities by '{}'", iteration_key);

    let source = Rc::new(source);
    let materializer = Rc::clone(&source);
    let spec = move || source.create_query();
    let options = IterateOptions {
        batch_size: options.batch_size,
        iteration_key,
        order: options.order,
        extractor: Box::new(move |query: S::Query| materializer.materialize(query)),
    };
    iterate_select_query(spec, options)
}

/// Iterates an entity source one entity at a time.
pub fn iterate_repository_entities<S>(
    source: S,
    options: RepositoryOptions,
) -> KeysetResult<Items<Batches<impl Fn() -> S::Query, S::Entity>, S::Entity>>
where
    S: EntitySource + 'static,
{
    Ok(iterate_query_items(iterate_repository(source, options)?))
}
