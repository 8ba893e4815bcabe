pub mod coordinator;
pub mod queue;

pub use coordinator::Dispatcher;
pub use queue::signal_queue;
pub use queue::DispatchHandle;
