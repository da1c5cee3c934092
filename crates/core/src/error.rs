use thiserror::Error;

#[derive(Error, Debug)]
pub enum StauError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown aspect: {0}")]
    UnknownAspect(String),

    #[error("Unknown time unit: {0}")]
    UnknownTimeUnit(String),

    #[error("Percentile {0} outside [50, 100)")]
    Percentile(f64),

    #[error("Event id {0} out of range for a log of {1} events")]
    EventOutOfRange(usize, usize),

    #[error("Empty event log")]
    EmptyLog,
}
