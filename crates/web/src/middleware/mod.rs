//! The standard middleware stages.
//!
//! Each stage is a [`Decorator`](crate::decorator::Decorator) over a
//! [`RequestHandler`](crate::handler::RequestHandler). [`standard_stages`] composes,
//! outermost first: logging, data preparsing, response normalization, then the dispatch itself.

mod logging;
mod normalize;
mod preparse;

pub use logging::{LoggingDecorator, LoggingHandler};
pub use normalize::{NormalizeDecorator, NormalizeHandler};
pub use preparse::{PreparseDecorator, PreparseHandler};

use crate::decorator::DecoratorComposer;
use crate::responder::Normalizer;

pub type StandardStages = DecoratorComposer<DecoratorComposer<NormalizeDecorator, PreparseDecorator>, LoggingDecorator>;

/// The stages every route goes through, see the [module documentation](self)
pub fn standard_stages(normalizer: Normalizer) -> StandardStages {
    DecoratorComposer::new(DecoratorComposer::new(NormalizeDecorator::new(normalizer), PreparseDecorator), LoggingDecorator)
}
