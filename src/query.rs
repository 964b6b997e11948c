//! Expandable query wrapper.
//!
//! [`as_expandable`] wraps a query so that every expression handed to its
//! provider is rewritten first. The backend then only ever sees fully
//! expanded trees, while callers keep composing queries out of reusable
//! predicate trees.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::ast::{Expr, Type, Value};
use crate::config::RewriteOptions;
use crate::error::RewriteError;
use crate::rewrite::rewrite_with;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("cannot expand query expression: {0}")]
    Rewrite(#[from] RewriteError),

    #[error("query backend failed: {0}")]
    Backend(String),
}

/// A composable query: an expression plus the provider that runs it.
pub trait Query: Send + Sync {
    fn expression(&self) -> &Expr;

    /// Type of the elements the query yields.
    fn element_type(&self) -> &Type;

    fn provider(&self) -> Arc<dyn QueryProvider>;

    fn as_any(&self) -> &dyn Any;
}

/// Builds and executes queries from expression trees.
pub trait QueryProvider: Send + Sync {
    fn create_query(&self, expr: Expr, element: &Type) -> Result<Arc<dyn Query>, QueryError>;

    /// Create a query whose element type the provider infers.
    fn create_untyped_query(&self, expr: Expr) -> Result<Arc<dyn Query>, QueryError>;

    fn execute(&self, expr: Expr, result: &Type) -> Result<Value, QueryError>;

    fn execute_untyped(&self, expr: Expr) -> Result<Value, QueryError>;
}

/// A query whose provider rewrites expressions before delegating.
pub struct Expandable {
    inner: Arc<dyn Query>,
    options: RewriteOptions,
}

impl Expandable {
    pub fn inner(&self) -> &Arc<dyn Query> {
        &self.inner
    }
}

impl Query for Expandable {
    fn expression(&self) -> &Expr {
        self.inner.expression()
    }

    fn element_type(&self) -> &Type {
        self.inner.element_type()
    }

    fn provider(&self) -> Arc<dyn QueryProvider> {
        Arc::new(ExpandingProvider {
            inner: self.inner.provider(),
            options: self.options.clone(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Provider of an [`Expandable`] query.
pub struct ExpandingProvider {
    inner: Arc<dyn QueryProvider>,
    options: RewriteOptions,
}

impl ExpandingProvider {
    fn expand(&self, expr: &Expr) -> Result<Expr, QueryError> {
        let rewritten = rewrite_with(expr, &self.options)?;
        if !rewritten.stats.is_empty() {
            debug!(stats = ?rewritten.stats, "expanded query expression");
        }
        Ok(rewritten.tree)
    }
}

impl QueryProvider for ExpandingProvider {
    /// Typed queries stay expandable so further composition is expanded too.
    fn create_query(&self, expr: Expr, element: &Type) -> Result<Arc<dyn Query>, QueryError> {
        let created = self.inner.create_query(self.expand(&expr)?, element)?;
        Ok(as_expandable_with(created, &self.options))
    }

    fn create_untyped_query(&self, expr: Expr) -> Result<Arc<dyn Query>, QueryError> {
        self.inner.create_untyped_query(self.expand(&expr)?)
    }

    fn execute(&self, expr: Expr, result: &Type) -> Result<Value, QueryError> {
        self.inner.execute(self.expand(&expr)?, result)
    }

    fn execute_untyped(&self, expr: Expr) -> Result<Value, QueryError> {
        self.inner.execute_untyped(self.expand(&expr)?)
    }
}

/// Wrap `query` so its provider expands expressions with default options.
///
/// A query that is already expandable is returned as is.
pub fn as_expandable(query: Arc<dyn Query>) -> Arc<dyn Query> {
    as_expandable_with(query, &RewriteOptions::default())
}

pub fn as_expandable_with(query: Arc<dyn Query>, options: &RewriteOptions) -> Arc<dyn Query> {
    if query.as_any().is::<Expandable>() {
        return query;
    }
    Arc::new(Expandable {
        inner: query,
        options: options.clone(),
    })
}
