//! Default Implementation Table for the passwordless recipe.
//!
//! Every default operation is a thin call to the remote core; domain
//! outcomes come back as success-shaped, status-tagged enums, never as
//! errors.

use super::{ContactId, PasswordlessUser, recipe::RECIPE_ID};
use authkit_core::client::CoreClient;
use authkit_core::http::Method;
use authkit_core::table::{Slot, slot};
use authkit_core::{AuthKitError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Input to `create_code`.
#[derive(Debug, Clone)]
pub struct CreateCodeInput {
    /// Contact to deliver against.
    pub contact: ContactId,
    /// Host-chosen code instead of a core-generated one.
    pub user_input_code: Option<String>,
}

/// A freshly minted login code, as the core reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDetails {
    /// Session the consume call must quote.
    pub pre_auth_session_id: String,
    /// Core id of this specific code.
    pub code_id: String,
    /// Device the code belongs to; resends reuse it.
    pub device_id: String,
    /// The short code.
    pub user_input_code: String,
    /// The opaque link code.
    pub link_code: String,
    /// Mint time, epoch millis.
    pub time_created: u64,
    /// Validity window in millis.
    pub code_lifetime: u64,
}

/// Input to `resend_code`.
#[derive(Debug, Clone)]
pub struct ResendCodeInput {
    /// Device whose latest code should be replaced.
    pub device_id: String,
    /// Session the device was created under.
    pub pre_auth_session_id: String,
    /// Host-chosen code instead of a core-generated one.
    pub user_input_code: Option<String>,
}

/// Outcome of `resend_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all_fields = "camelCase")]
pub enum ResendCodeOutput {
    /// A new code was minted for the device.
    #[serde(rename = "OK")]
    Ok {
        /// The replacement code.
        #[serde(flatten)]
        code: CodeDetails,
        /// The device's email contact, when it has one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        /// The device's phone contact, when it has one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phone_number: Option<String>,
    },
    /// The device is unknown or exhausted; the client must start over.
    #[serde(rename = "RESTART_FLOW_ERROR")]
    RestartFlow,
}

/// Input to `consume_code`: either (device id + typed code) or a link code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeCodeInput {
    /// Session quoted back from code creation.
    pub pre_auth_session_id: String,
    /// Device id, for the typed-code path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// The typed code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_input_code: Option<String>,
    /// The link code, for the magic-link path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_code: Option<String>,
}

/// Outcome of `consume_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all_fields = "camelCase")]
pub enum ConsumeCodeOutput {
    /// Code accepted; the user exists now if they did not before.
    #[serde(rename = "OK")]
    Ok {
        /// Whether this consume created the user.
        created_new_user: bool,
        /// The signed-in user.
        user: PasswordlessUser,
    },
    /// Wrong typed code; the device survives until attempts run out.
    #[serde(rename = "INCORRECT_USER_INPUT_CODE_ERROR")]
    IncorrectUserInputCode {
        /// Failed attempts so far.
        failed_code_input_attempt_count: u64,
        /// Attempt ceiling.
        maximum_code_input_attempt_count: u64,
    },
    /// The code expired; the device survives until attempts run out.
    #[serde(rename = "EXPIRED_USER_INPUT_CODE_ERROR")]
    ExpiredUserInputCode {
        /// Failed attempts so far.
        failed_code_input_attempt_count: u64,
        /// Attempt ceiling.
        maximum_code_input_attempt_count: u64,
    },
    /// The device is gone; the client must start over.
    #[serde(rename = "RESTART_FLOW_ERROR")]
    RestartFlow,
}

/// Input to `update_user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    /// User to update.
    pub user_id: String,
    /// New email, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New phone number, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

/// Outcome of `update_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum UpdateUserOutput {
    /// Updated.
    #[serde(rename = "OK")]
    Ok,
    /// No such user.
    #[serde(rename = "UNKNOWN_USER_ID_ERROR")]
    UnknownUserId,
    /// Another user already owns that email.
    #[serde(rename = "EMAIL_ALREADY_EXISTS_ERROR")]
    EmailAlreadyExists,
    /// Another user already owns that phone number.
    #[serde(rename = "PHONE_NUMBER_ALREADY_EXISTS_ERROR")]
    PhoneNumberAlreadyExists,
}

/// The replaceable business operations of the passwordless recipe.
///
/// Built once from [`RecipeImplementation::from_core`], optionally
/// transformed once by the host's functions hook, then frozen.
#[derive(Clone)]
pub struct RecipeImplementation {
    /// Mint a login code for a contact.
    pub create_code: Slot<CreateCodeInput, CodeDetails>,
    /// Mint a replacement code for an existing device.
    pub resend_code: Slot<ResendCodeInput, ResendCodeOutput>,
    /// Consume a code, creating the user on first success.
    pub consume_code: Slot<ConsumeCodeInput, ConsumeCodeOutput>,
    /// Look up a user by core id.
    pub get_user_by_id: Slot<String, Option<PasswordlessUser>>,
    /// Look up a user by email.
    pub get_user_by_email: Slot<String, Option<PasswordlessUser>>,
    /// Look up a user by phone number.
    pub get_user_by_phone_number: Slot<String, Option<PasswordlessUser>>,
    /// Change a user's contact details.
    pub update_user: Slot<UpdateUserInput, UpdateUserOutput>,
    /// Drop every outstanding code for a contact.
    pub revoke_all_codes: Slot<ContactId, ()>,
}

fn user_from_lookup(value: Value) -> Result<Option<PasswordlessUser>> {
    if value.get("status").and_then(Value::as_str) == Some("OK") {
        let user = value
            .get("user")
            .cloned()
            .ok_or_else(|| AuthKitError::Serialization("lookup missing `user`".to_string()))?;
        Ok(Some(serde_json::from_value(user)?))
    } else {
        Ok(None)
    }
}

impl RecipeImplementation {
    /// The default table: every operation is a core call.
    pub fn from_core(core: Arc<dyn CoreClient>) -> Self {
        let create_core = Arc::clone(&core);
        let resend_core = Arc::clone(&core);
        let consume_core = Arc::clone(&core);
        let by_id_core = Arc::clone(&core);
        let by_email_core = Arc::clone(&core);
        let by_phone_core = Arc::clone(&core);
        let update_core = Arc::clone(&core);
        let revoke_core = core;

        Self {
            create_code: slot(move |input: CreateCodeInput| {
                let core = Arc::clone(&create_core);
                async move {
                    let mut body = Map::new();
                    input.contact.write_into(&mut body);
                    if let Some(code) = input.user_input_code {
                        body.insert("userInputCode".to_string(), Value::String(code));
                    }
                    let value = core
                        .send(RECIPE_ID, Method::Post, "/signinup/code", &[], Value::Object(body))
                        .await?;
                    Ok(serde_json::from_value(value)?)
                }
            }),
            resend_code: slot(move |input: ResendCodeInput| {
                let core = Arc::clone(&resend_core);
                async move {
                    let mut body = Map::new();
                    body.insert("deviceId".to_string(), Value::String(input.device_id));
                    body.insert(
                        "preAuthSessionId".to_string(),
                        Value::String(input.pre_auth_session_id),
                    );
                    if let Some(code) = input.user_input_code {
                        body.insert("userInputCode".to_string(), Value::String(code));
                    }
                    let value = core
                        .send(RECIPE_ID, Method::Post, "/signinup/code", &[], Value::Object(body))
                        .await?;
                    Ok(serde_json::from_value(value)?)
                }
            }),
            consume_code: slot(move |input: ConsumeCodeInput| {
                let core = Arc::clone(&consume_core);
                async move {
                    let body = serde_json::to_value(&input)?;
                    let value = core
                        .send(RECIPE_ID, Method::Post, "/signinup/code/consume", &[], body)
                        .await?;
                    Ok(serde_json::from_value(value)?)
                }
            }),
            get_user_by_id: slot(move |user_id: String| {
                let core = Arc::clone(&by_id_core);
                async move {
                    let value = core
                        .send(
                            RECIPE_ID,
                            Method::Get,
                            "/user",
                            &[("userId", user_id)],
                            Value::Null,
                        )
                        .await?;
                    user_from_lookup(value)
                }
            }),
            get_user_by_email: slot(move |email: String| {
                let core = Arc::clone(&by_email_core);
                async move {
                    let value = core
                        .send(RECIPE_ID, Method::Get, "/user", &[("email", email)], Value::Null)
                        .await?;
                    user_from_lookup(value)
                }
            }),
            get_user_by_phone_number: slot(move |phone: String| {
                let core = Arc::clone(&by_phone_core);
                async move {
                    let value = core
                        .send(
                            RECIPE_ID,
                            Method::Get,
                            "/user",
                            &[("phoneNumber", phone)],
                            Value::Null,
                        )
                        .await?;
                    user_from_lookup(value)
                }
            }),
            update_user: slot(move |input: UpdateUserInput| {
                let core = Arc::clone(&update_core);
                async move {
                    let body = serde_json::to_value(&input)?;
                    let value = core.send(RECIPE_ID, Method::Put, "/user", &[], body).await?;
                    Ok(serde_json::from_value(value)?)
                }
            }),
            revoke_all_codes: slot(move |contact: ContactId| {
                let core = Arc::clone(&revoke_core);
                async move {
                    let mut body = Map::new();
                    contact.write_into(&mut body);
                    core.send(
                        RECIPE_ID,
                        Method::Post,
                        "/signinup/codes/remove",
                        &[],
                        Value::Object(body),
                    )
                    .await?;
                    Ok(())
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn consume_outcomes_deserialize_from_core_wire_format() {
        let ok: ConsumeCodeOutput = serde_json::from_value(json!({
            "status": "OK",
            "createdNewUser": true,
            "user": {"id": "u1", "email": "test@example.com", "timeJoined": 1_700_000_000_000_u64}
        }))
        .unwrap_or_else(|err| panic!("{err}"));
        assert!(matches!(ok, ConsumeCodeOutput::Ok { created_new_user: true, .. }));

        let wrong: ConsumeCodeOutput = serde_json::from_value(json!({
            "status": "INCORRECT_USER_INPUT_CODE_ERROR",
            "failedCodeInputAttemptCount": 2,
            "maximumCodeInputAttemptCount": 5
        }))
        .unwrap_or_else(|err| panic!("{err}"));
        assert!(matches!(
            wrong,
            ConsumeCodeOutput::IncorrectUserInputCode {
                failed_code_input_attempt_count: 2,
                maximum_code_input_attempt_count: 5
            }
        ));

        let restart: ConsumeCodeOutput =
            serde_json::from_value(json!({"status": "RESTART_FLOW_ERROR"}))
                .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(restart, ConsumeCodeOutput::RestartFlow);
    }

    #[test]
    fn lookup_miss_maps_to_none() {
        let miss = user_from_lookup(json!({"status": "UNKNOWN_USER_ID_ERROR"}))
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(miss, None);
    }
}
