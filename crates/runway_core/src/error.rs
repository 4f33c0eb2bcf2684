use std::fmt;

/// Errors raised while validating configuration, before any simulation runs
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Search bounds are empty or inverted
    InvalidBounds { lower: f64, upper: f64 },
    /// A count (horizon, path count, iteration cap) must be at least one
    NonPositive { field: &'static str },
    /// A success-rate percentage must lie within [0, 100]
    RateOutOfRange { field: &'static str, value: f64 },
    /// Lower rebalancing threshold above the upper one
    ThresholdOrder { lower: f64, upper: f64 },
    /// Withdrawal floor above the withdrawal cap
    FloorAboveCap { floor: f64, cap: f64 },
    /// A numeric parameter is negative or not finite
    InvalidValue {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBounds { lower, upper } => {
                write!(f, "invalid search bounds: lower {lower} must be below upper {upper}")
            }
            ConfigError::NonPositive { field } => write!(f, "{field} must be at least 1"),
            ConfigError::RateOutOfRange { field, value } => {
                write!(f, "{field} must be within [0, 100], got {value}")
            }
            ConfigError::ThresholdOrder { lower, upper } => {
                write!(
                    f,
                    "lower threshold {lower} must not exceed upper threshold {upper}"
                )
            }
            ConfigError::FloorAboveCap { floor, cap } => {
                write!(f, "withdrawal floor {floor} exceeds withdrawal cap {cap}")
            }
            ConfigError::InvalidValue {
                field,
                value,
                reason,
            } => write!(f, "invalid {field} ({value}): {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors related to the return distribution
#[derive(Debug, Clone, PartialEq)]
pub enum MarketError {
    InvalidDistributionParameters {
        mean: f64,
        volatility: f64,
        reason: &'static str,
    },
}

impl fmt::Display for MarketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketError::InvalidDistributionParameters {
                mean,
                volatility,
                reason,
            } => write!(
                f,
                "invalid normal return parameters (mean={mean}, volatility={volatility}): {reason}"
            ),
        }
    }
}

impl std::error::Error for MarketError {}

/// Errors raised by the outcome aggregator
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateError {
    /// No completed paths to summarize
    Empty,
    /// Too many paths failed or were cancelled
    InsufficientCompletion {
        completed: usize,
        missing: usize,
        required: usize,
    },
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateError::Empty => write!(f, "no completed paths to summarize"),
            AggregateError::InsufficientCompletion {
                completed,
                missing,
                required,
            } => write!(
                f,
                "only {completed} paths completed ({missing} missing), at least {required} required"
            ),
        }
    }
}

impl std::error::Error for AggregateError {}

/// Top-level error for simulation entry points
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    Config(ConfigError),
    Market(MarketError),
    Aggregate(AggregateError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Config(e) => write!(f, "configuration error: {e}"),
            SimulationError::Market(e) => write!(f, "market error: {e}"),
            SimulationError::Aggregate(e) => write!(f, "aggregation error: {e}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Config(e) => Some(e),
            SimulationError::Market(e) => Some(e),
            SimulationError::Aggregate(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimulationError {
    fn from(err: ConfigError) -> Self {
        SimulationError::Config(err)
    }
}

impl From<MarketError> for SimulationError {
    fn from(err: MarketError) -> Self {
        SimulationError::Market(err)
    }
}

impl From<AggregateError> for SimulationError {
    fn from(err: AggregateError) -> Self {
        SimulationError::Aggregate(err)
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
