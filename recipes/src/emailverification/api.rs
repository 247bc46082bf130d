//! Default API Table for the email verification recipe.
//!
//! Session handling is out of scope, so the APIs that the original protocol
//! keys off a session accept an explicit `userId` instead.

use super::implementation::{CreateTokenOutput, RecipeImplementation};
use super::recipe::RECIPE_ID;
use super::{EmailVerificationConfig, UserEmail};
use authkit_core::http::{ApiResponse, Request};
use authkit_core::table::{Slot, call, slot};
use authkit_core::AuthKitError;
use serde::Deserialize;
use serde_json::json;

fn bad_request(message: impl Into<String>) -> AuthKitError {
    AuthKitError::BadRequest {
        recipe_id: RECIPE_ID,
        message: message.into(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateTokenBody {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct VerifyEmailBody {
    method: String,
    token: String,
}

/// The replaceable HTTP-level operations of the email verification recipe.
#[derive(Clone)]
pub struct ApiImplementation {
    /// `POST /user/email/verify/token`
    pub generate_email_verify_token_post: Slot<Request, ApiResponse>,
    /// `POST /user/email/verify`
    pub verify_email_post: Slot<Request, ApiResponse>,
    /// `GET /user/email/verify`
    pub is_email_verified_get: Slot<Request, ApiResponse>,
}

impl ApiImplementation {
    /// Build the default API Table over an already-finalized Implementation
    /// Table.
    pub fn from_implementation(
        implementation: &RecipeImplementation,
        config: &EmailVerificationConfig,
    ) -> Self {
        let create_impl = implementation.create_email_verification_token.clone();
        let create_resolver = config.get_email_for_user_id.clone();
        let verify_impl = implementation.verify_email_using_token.clone();
        let is_verified_impl = implementation.is_email_verified.clone();
        let is_verified_resolver = config.get_email_for_user_id.clone();

        Self {
            generate_email_verify_token_post: slot(move |request: Request| {
                let create_token = create_impl.clone();
                let resolver = create_resolver.clone();
                async move {
                    let body: GenerateTokenBody = request.body_as(RECIPE_ID)?;
                    let email = resolver(body.user_id.clone()).await?;
                    let outcome = call(
                        &create_token,
                        "generate-email-verify-token",
                        UserEmail {
                            user_id: body.user_id,
                            email,
                        },
                    )
                    .await?;
                    match outcome {
                        CreateTokenOutput::Ok { token } => {
                            tracing::info!(token, "email verification token created");
                            Ok(ApiResponse::ok(json!({"status": "OK"})))
                        }
                        CreateTokenOutput::EmailAlreadyVerified => Ok(ApiResponse::ok(
                            json!({"status": "EMAIL_ALREADY_VERIFIED_ERROR"}),
                        )),
                    }
                }
            }),
            verify_email_post: slot(move |request: Request| {
                let verify = verify_impl.clone();
                async move {
                    let body: VerifyEmailBody = request.body_as(RECIPE_ID)?;
                    if body.method != "token" {
                        return Err(bad_request("unsupported verification method"));
                    }
                    let outcome = call(&verify, "verify-email", body.token).await?;
                    ApiResponse::ok_from(&outcome)
                }
            }),
            is_email_verified_get: slot(move |request: Request| {
                let is_verified = is_verified_impl.clone();
                let resolver = is_verified_resolver.clone();
                async move {
                    let user_id = request.require_query(RECIPE_ID, "userId")?.to_string();
                    let email = resolver(user_id.clone()).await?;
                    let verified =
                        call(&is_verified, "is-email-verified", UserEmail { user_id, email })
                            .await?;
                    Ok(ApiResponse::ok(
                        json!({"status": "OK", "isVerified": verified}),
                    ))
                }
            }),
        }
    }
}
