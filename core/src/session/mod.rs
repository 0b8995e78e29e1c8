pub mod stream;

pub use stream::{SessionConfig, SessionHandle, SessionState, StreamSession, DEFAULT_TICK};
