//! # Authkit Core
//!
//! Composition, override and dispatch machinery for authentication recipes.
//!
//! A *recipe* is one authentication feature (passwordless login, third-party
//! login, email verification) packaged behind two replaceable tables:
//!
//! - an **Implementation Table** of business operations, built once from a
//!   default that talks to the remote core,
//! - an **API Table** of HTTP-level operations, each wrapping one
//!   implementation operation with parsing, validation and response shaping.
//!
//! The host application can transform either table exactly once at
//! initialization through an [`table::OverrideHook`], wrapping, replacing or
//! deleting any entry while retaining access to the original. Recipes are
//! exposed to the router as [`recipe::RecipeModule`] trait objects; a
//! composite recipe holds its children as a small ordered list and fans
//! requests out to whichever child owns the path.
//!
//! This crate is HTTP-framework agnostic: adapters translate their native
//! request type into [`http::Request`] and read the answer back out of a
//! [`http::ResponseSink`].

pub mod client;
pub mod error;
pub mod http;
pub mod recipe;
pub mod table;

pub use client::{CoreClient, CoreConnection, HttpCoreClient};
pub use error::{AuthKitError, Result};
pub use http::{ApiResponse, Method, NormalisedPath, Request, ResponseSink};
pub use recipe::{ApiDescriptor, DispatchOutcome, RecipeModule, RequestOutcome};
