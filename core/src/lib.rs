/// VanishLink - ephemeral messaging core
///
/// Message lifecycle, real-time transport contract, and the vanish-timer
/// state machine for a two-party chat client. UI, auth, and payments are
/// external callers that hold a user identity and drive this API.

pub mod config;
pub mod error;
pub mod presence;
pub mod responder;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;
pub mod vanish;

pub use config::Config;
pub use error::{ChatError, Result};
pub use session::ChatSession;
pub use store::{ChatStore, Conversation, Message};
pub use types::{ChatEvent, DeliveryStatus, UserProfile, VanishOptions};
