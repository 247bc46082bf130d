//! Unified API Table for the composite recipe.
//!
//! Assembled from the children's default API Tables, each built over an
//! adapter-derived view of the (already overridden) unified Implementation
//! Table. The apis hook transforms this table; the children's own API Tables
//! are then re-derived from the transformed result.

use super::adapters;
use super::implementation::RecipeImplementation;
use crate::passwordless::api::ApiImplementation as PasswordlessApi;
use crate::passwordless::PasswordlessConfig;
use crate::thirdparty::api::ApiImplementation as ThirdPartyApi;
use crate::thirdparty::ThirdPartyConfig;
use authkit_core::http::{ApiResponse, Request};
use authkit_core::table::Slot;

/// The replaceable HTTP-level operations of the composite recipe: the union
/// of both children's API surfaces.
#[derive(Clone)]
pub struct ApiImplementation {
    /// `POST /signinup/code`
    pub create_code_post: Slot<Request, ApiResponse>,
    /// `POST /signinup/code/resend`
    pub resend_code_post: Slot<Request, ApiResponse>,
    /// `POST /signinup/code/consume`
    pub consume_code_post: Slot<Request, ApiResponse>,
    /// `GET /signup/email/exists`
    pub email_exists_get: Slot<Request, ApiResponse>,
    /// `GET /signup/phonenumber/exists`
    pub phone_number_exists_get: Slot<Request, ApiResponse>,
    /// `POST /signinup`. Null when no provider is configured.
    pub sign_in_up_post: Slot<Request, ApiResponse>,
    /// `GET /authorisationurl`. Null when no provider is configured.
    pub authorisation_url_get: Slot<Request, ApiResponse>,
}

impl ApiImplementation {
    /// Build the default unified API Table over an already-finalized unified
    /// Implementation Table.
    pub fn from_implementation(
        implementation: &RecipeImplementation,
        passwordless_config: &PasswordlessConfig,
        third_party_config: Option<&ThirdPartyConfig>,
    ) -> Self {
        let pl_shaped = adapters::passwordless_implementation(implementation);
        let PasswordlessApi {
            create_code_post,
            resend_code_post,
            consume_code_post,
            email_exists_get,
            phone_number_exists_get,
        } = PasswordlessApi::from_implementation(&pl_shaped, passwordless_config);

        let (sign_in_up_post, authorisation_url_get) = match third_party_config {
            Some(config) => {
                let tp_shaped = adapters::third_party_implementation(implementation);
                let ThirdPartyApi {
                    sign_in_up_post,
                    authorisation_url_get,
                } = ThirdPartyApi::from_implementation(&tp_shaped, config);
                (sign_in_up_post, authorisation_url_get)
            }
            None => (None, None),
        };

        Self {
            create_code_post,
            resend_code_post,
            consume_code_post,
            email_exists_get,
            phone_number_exists_get,
            sign_in_up_post,
            authorisation_url_get,
        }
    }
}
