pub mod core;
pub mod service;
pub mod session;
pub mod streaming;
pub mod utils;

pub use crate::core::{
    config::{AccountType, IgConfig},
    errors::IgError,
    types::*,
};
pub use service::{Confirmation, IgService, NavigationEntry};
pub use session::{AuthProtocol, SessionHandler, SessionOptions};
pub use streaming::{IgStreamService, StreamingCredentials};
