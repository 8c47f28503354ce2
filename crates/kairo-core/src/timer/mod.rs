mod clock;
mod engine;
mod ticker;

pub use clock::{SessionClock, Tick};
pub use engine::{RunState, SessionEngine};
pub use ticker::{TickSource, Wakeup};
