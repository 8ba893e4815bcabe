pub mod error;
pub mod macros;
pub mod structs;

pub use error::ConfigError;
pub use error::DispatchError;
pub use error::Result;
pub use structs::CarEvent;
pub use structs::CarId;
pub use structs::CarSnapshot;
pub use structs::CarState;
pub use structs::Direction;
pub use structs::DispatchRecord;
pub use structs::DoorState;
pub use structs::Floor;
pub use structs::Outcome;
pub use structs::ServiceState;
pub use structs::Signal;
pub use structs::SignalKind;
