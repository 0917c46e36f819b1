pub mod client;
pub mod events;

pub use client::{LiveConnection, LiveEndpoint, WsLiveEndpoint};
pub use events::{ServerEvent, SessionSetup};
