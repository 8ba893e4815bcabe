use thiserror::Error;

use super::structs::{CarId, Floor};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no elevator available for call at floor {floor}")]
    NoElevatorAvailable { floor: Floor },

    #[error("car {0} is out of service")]
    OutOfService(CarId),

    #[error("signal queue is full ({capacity} pending)")]
    QueueOverflow { capacity: usize },

    #[error("floor {floor} is outside the building range {min}..={max}")]
    InvalidFloor { floor: Floor, min: Floor, max: Floor },

    #[error("invalid signal: {reason}")]
    InvalidSignal { reason: String },

    #[error("unknown car {0}")]
    UnknownCar(CarId),

    #[error("dispatcher is shutting down")]
    ShuttingDown,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
