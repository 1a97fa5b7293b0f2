use std::fmt;

use crate::{Context, Response};

use super::{chain, Chain, Meta};

/// The rest of the chain after the current middleware.
///
/// Values added with [`Next::extend`] or [`Next::with_ctx`] are visible to later steps and the resolver only.
pub struct Next {
    pub(crate) chain: Chain,
    pub(crate) index: usize,
    pub(crate) ctx: Context,
    pub(crate) patch: Context,
    pub(crate) meta: Meta,
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("patch", &self.patch)
            .field("meta", &self.meta)
            .finish()
    }
}

impl Next {
    /// Add a value to the context of later steps, replacing any value of the same type.
    pub fn extend<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.patch = self.patch.with(value);
        self
    }

    /// Merge a whole context into the context of later steps.
    pub fn with_ctx(mut self, patch: Context) -> Self {
        self.patch = self.patch.merge(&patch);
        self
    }

    /// Replace the metadata seen by later steps.
    ///
    /// Later steps decode their arguments from the new `meta.input`.
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub async fn run(self) -> Response {
        let ctx = if self.patch.is_empty() {
            self.ctx
        } else {
            self.ctx.merge(&self.patch)
        };

        chain::call(self.chain, self.index, ctx, self.meta).await
    }
}
