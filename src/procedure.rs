//! Queries and mutations.
//!
//! A procedure is declared with a [`ProcedureBuilder`], usually obtained from [`Ptsq::procedure`](crate::Ptsq::procedure), and finished with [`ProcedureBuilder::query`] or [`ProcedureBuilder::mutation`].

mod builder;
mod procedure;

pub use builder::ProcedureBuilder;
pub use procedure::{Endpoint, EndpointSchema};
