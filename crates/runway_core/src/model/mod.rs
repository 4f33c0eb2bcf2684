mod market;
mod results;

pub use market::{
    MarketModel, MatrixColumn, ReturnMatrix, ReturnSampler, ReturnSource, SampledReturns,
};
pub use results::{EnsembleResult, PathFailure, PathOutcome, PathResult, YearRecord};
