//! Live-session room credentials.

pub mod handlers;
pub mod issuer;

pub use issuer::{
    room_name_for, submission_for_room, CredentialStore, MemoryCredentialStore, RoomCredential,
    RoomCredentialIssuer,
};
