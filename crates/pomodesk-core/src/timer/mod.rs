mod backend;
mod countdown;
mod session;

pub use backend::{
    backend_for, BackgroundTicker, ForegroundTicker, TimingBackend, TimingMessage,
    TimingMessageKind,
};
pub use countdown::{remaining_secs, Countdown, Tick};
pub use session::{SessionMachine, SessionType, Transition};
