//! Default Implementation Table for the email verification recipe.

use super::{UserEmail, recipe::RECIPE_ID};
use authkit_core::client::CoreClient;
use authkit_core::http::Method;
use authkit_core::table::{Slot, slot};
use authkit_core::AuthKitError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Outcome of `create_email_verification_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum CreateTokenOutput {
    /// Token minted.
    #[serde(rename = "OK")]
    Ok {
        /// The opaque verification token.
        token: String,
    },
    /// Nothing to verify.
    #[serde(rename = "EMAIL_ALREADY_VERIFIED_ERROR")]
    EmailAlreadyVerified,
}

/// Outcome of `verify_email_using_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum VerifyEmailOutput {
    /// Verified.
    #[serde(rename = "OK")]
    Ok {
        /// The pair the token belonged to.
        user: UserEmail,
    },
    /// Unknown, expired or already-used token.
    #[serde(rename = "EMAIL_VERIFICATION_INVALID_TOKEN_ERROR")]
    InvalidToken,
}

/// The replaceable business operations of the email verification recipe.
#[derive(Clone)]
pub struct RecipeImplementation {
    /// Mint a verification token for a (user id, email) pair.
    pub create_email_verification_token: Slot<UserEmail, CreateTokenOutput>,
    /// Consume a token, marking its pair verified.
    pub verify_email_using_token: Slot<String, VerifyEmailOutput>,
    /// Whether a pair is verified.
    pub is_email_verified: Slot<UserEmail, bool>,
    /// Drop every outstanding token for a pair.
    pub revoke_email_verification_tokens: Slot<UserEmail, ()>,
    /// Forget a pair's verified status.
    pub unverify_email: Slot<UserEmail, ()>,
}

impl RecipeImplementation {
    /// The default table: every operation is a core call.
    pub fn from_core(core: Arc<dyn CoreClient>) -> Self {
        let create_core = Arc::clone(&core);
        let verify_core = Arc::clone(&core);
        let is_verified_core = Arc::clone(&core);
        let revoke_core = Arc::clone(&core);
        let unverify_core = core;

        Self {
            create_email_verification_token: slot(move |input: UserEmail| {
                let core = Arc::clone(&create_core);
                async move {
                    let body = serde_json::to_value(&input)?;
                    let value = core
                        .send(RECIPE_ID, Method::Post, "/user/email/verify/token", &[], body)
                        .await?;
                    Ok(serde_json::from_value(value)?)
                }
            }),
            verify_email_using_token: slot(move |token: String| {
                let core = Arc::clone(&verify_core);
                async move {
                    let body = json!({"method": "token", "token": token});
                    let value = core
                        .send(RECIPE_ID, Method::Post, "/user/email/verify", &[], body)
                        .await?;
                    Ok(serde_json::from_value(value)?)
                }
            }),
            is_email_verified: slot(move |input: UserEmail| {
                let core = Arc::clone(&is_verified_core);
                async move {
                    let value = core
                        .send(
                            RECIPE_ID,
                            Method::Get,
                            "/user/email/verify",
                            &[("userId", input.user_id), ("email", input.email)],
                            Value::Null,
                        )
                        .await?;
                    value
                        .get("isVerified")
                        .and_then(Value::as_bool)
                        .ok_or_else(|| {
                            AuthKitError::Serialization(
                                "verify lookup missing `isVerified`".to_string(),
                            )
                        })
                }
            }),
            revoke_email_verification_tokens: slot(move |input: UserEmail| {
                let core = Arc::clone(&revoke_core);
                async move {
                    let body = serde_json::to_value(&input)?;
                    core.send(
                        RECIPE_ID,
                        Method::Post,
                        "/user/email/verify/token/remove",
                        &[],
                        body,
                    )
                    .await?;
                    Ok(())
                }
            }),
            unverify_email: slot(move |input: UserEmail| {
                let core = Arc::clone(&unverify_core);
                async move {
                    let body = serde_json::to_value(&input)?;
                    core.send(RECIPE_ID, Method::Post, "/user/email/verify/remove", &[], body)
                        .await?;
                    Ok(())
                }
            }),
        }
    }
}
