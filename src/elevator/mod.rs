pub mod car;
pub mod car_tests;
pub mod fleet;
pub mod mover;
pub mod mover_tests;

pub use fleet::CarHandle;
pub use fleet::FleetRegistry;
pub use mover::MoverHandle;
