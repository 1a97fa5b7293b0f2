use std::{fmt, future::Future, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    built_router::ErrorFormatter, BuildErrors, BuiltRouter, Config, Context, Endpoint, Middleware,
    ProcedureBuilder, PtsqError, Router, Schema,
};

/// Ptsq is a starting point for constructing procedures and routers.
///
/// It carries the settings shared by everything declared from it: global middleware, the [`Config`] and the error formatter.
///
/// ```rust
/// use ptsq::{Config, Ptsq};
///
/// let p = Ptsq::new()
///     .config(Config::new().title("Api"))
///     .error_formatter(|err| err);
/// # let _ = p;
/// ```
#[derive(Clone, Default)]
pub struct Ptsq {
    middlewares: Vec<Middleware>,
    config: Config,
    formatter: Option<ErrorFormatter>,
}

impl fmt::Debug for Ptsq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ptsq")
            .field("middlewares", &self.middlewares)
            .field("config", &self.config)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

impl Ptsq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    /// Rewrite every error before it's sent over the wire.
    ///
    /// The formatter runs after internal errors are redacted. It can't turn a failed call into a successful one.
    pub fn error_formatter(
        mut self,
        formatter: impl Fn(PtsqError) -> PtsqError + Send + Sync + 'static,
    ) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// Add a middleware that runs first on every procedure declared from now on.
    pub fn with(mut self, mw: Middleware) -> Self {
        self.middlewares.push(mw);
        self
    }

    pub fn router(&self) -> Router {
        Router::new()
    }

    pub fn procedure(&self) -> ProcedureBuilder {
        self.middlewares
            .iter()
            .cloned()
            .fold(ProcedureBuilder::new(), ProcedureBuilder::with)
    }

    pub fn args(&self, schema: Schema) -> ProcedureBuilder {
        self.procedure().args(schema)
    }

    pub fn query<F, Fut, I, O, E>(&self, resolver: F) -> Endpoint
    where
        F: Fn(Context, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        I: DeserializeOwned + 'static,
        O: Serialize + Send + 'static,
        E: Into<PtsqError> + Send + 'static,
    {
        self.procedure().query(resolver)
    }

    pub fn mutation<F, Fut, I, O, E>(&self, resolver: F) -> Endpoint
    where
        F: Fn(Context, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, E>> + Send + 'static,
        I: DeserializeOwned + 'static,
        O: Serialize + Send + 'static,
        E: Into<PtsqError> + Send + 'static,
    {
        self.procedure().mutation(resolver)
    }

    /// Validate `router` and freeze it.
    ///
    /// Every declaration problem in the tree is returned at once.
    pub fn build(&self, router: Router) -> Result<BuiltRouter, BuildErrors> {
        let mut errors = Vec::new();
        let mut requires = Vec::new();
        router.check("", &mut errors, &mut requires);

        if !errors.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!("router failed to build with {} errors", errors.len());

            return Err(BuildErrors(errors));
        }

        Ok(BuiltRouter::new(
            router,
            requires,
            self.config.clone(),
            self.formatter.clone(),
        ))
    }
}
