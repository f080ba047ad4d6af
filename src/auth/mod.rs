//! Bearer-token verification. Tokens are minted by the external identity provider;
//! this service only checks them and reads the user identifier.

mod claims;
pub mod jwt;

pub use jwt::AuthUser;
