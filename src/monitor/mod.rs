//! Run monitoring: the poll loop, state vocabulary, and progress output.

mod poller;
mod progress;
mod state;

pub use poller::*;
pub use progress::*;
pub use state::*;
