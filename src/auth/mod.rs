//! Authentication module
//!
//! Token issuance and verification, refresh-token sessions and rotation,
//! login throttling and the route-level gate.

pub mod extract;
pub mod gate;
pub mod handlers;
mod rate_limit;
pub mod refresh;
pub mod session;
pub mod token;
pub mod users;

pub use extract::AuthenticatedUser;
pub use gate::{AuthGate, AuthGateLayer, GateDecision};
pub use rate_limit::{RateLimiter, RateLimitConfig};
pub use refresh::{RefreshFlow, RefreshOutcome};
pub use session::{MemorySessionStore, SessionStore};
pub use token::{Claims, IssuedToken, TokenCodec, TokenKind};
pub use users::{MemoryUserDirectory, UserDirectory};
