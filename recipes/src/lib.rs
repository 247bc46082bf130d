//! Composable authentication recipes.
//!
//! Each recipe owns a slice of the auth surface: passwordless login codes,
//! third-party sign-in, email verification, and the composite that unifies
//! the first two into one user model. Recipes expose their business logic as
//! replaceable tables of async operations; hosts customize behavior by
//! wrapping table entries at init time instead of subclassing anything.
//!
//! The entry point is [`init::init`], called once per process with an
//! [`init::AuthKitConfig`]. Everything downstream of it is frozen.

pub mod emailverification;
pub mod init;
pub mod passwordless;
pub mod third_party_passwordless;
pub mod thirdparty;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use init::{AuthKit, AuthKitConfig, init, instance, reset};
pub use third_party_passwordless::{
    ThirdPartyPasswordlessConfig, ThirdPartyPasswordlessOverride, ThirdPartyPasswordlessRecipe,
    User,
};
