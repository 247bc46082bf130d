//! Default API Table for the passwordless recipe.
//!
//! Each API operation wraps one Implementation Table operation with request
//! parsing, contact-method validation and response shaping. Implementation
//! slots are captured **by value** when this table is built, which is why the
//! functions hook must run before API construction.

use super::implementation::{
    ConsumeCodeInput, CreateCodeInput, RecipeImplementation, ResendCodeInput, ResendCodeOutput,
};
use super::recipe::RECIPE_ID;
use super::{CodeDeliveryDetails, ContactId, PasswordlessConfig};
use authkit_core::http::{ApiResponse, Request};
use authkit_core::table::{Slot, call, slot};
use authkit_core::{AuthKitError, Result};
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
struct CreateCodeBody {
    email: Option<String>,
    phone_number: Option<String>,
    user_input_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResendCodeBody {
    device_id: String,
    pre_auth_session_id: String,
}

/// The replaceable HTTP-level operations of the passwordless recipe.
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
}

fn contact_from_body(config: &PasswordlessConfig, body: &CreateCodeBody) -> Result<ContactId> {
    let contact = match (&body.email, &body.phone_number) {
        (Some(email), None) => ContactId::Email(email.clone()),
        (None, Some(phone)) => ContactId::PhoneNumber(phone.clone()),
        (Some(_), Some(_)) => {
            return Err(bad_request("provide exactly one of email / phoneNumber"));
        }
        (None, None) => return Err(bad_request("provide email or phoneNumber")),
    };
    if !config.contact_method.accepts(&contact) {
        return Err(bad_request("this contact kind is not enabled"));
    }
    Ok(contact)
}

impl ApiImplementation {
    /// Build the default API Table over an already-finalized Implementation
    /// Table.
    pub fn from_implementation(
        implementation: &RecipeImplementation,
        config: &PasswordlessConfig,
    ) -> Self {
        let create_impl = implementation.create_code.clone();
        let create_config = config.clone();
        let resend_impl = implementation.resend_code.clone();
        let resend_config = config.clone();
        let consume_impl = implementation.consume_code.clone();
        let email_lookup = implementation.get_user_by_email.clone();
        let phone_lookup = implementation.get_user_by_phone_number.clone();

        Self {
            create_code_post: slot(move |request: Request| {
                let create_code = create_impl.clone();
                let config = create_config.clone();
                async move {
                    let body: CreateCodeBody = request.body_as(RECIPE_ID)?;
                    let contact = contact_from_body(&config, &body)?;
                    let code = call(
                        &create_code,
                        "create-code",
                        CreateCodeInput {
                            contact: contact.clone(),
                            user_input_code: body.user_input_code,
                        },
                    )
                    .await?;

                    config
                        .delivery
                        .send(&CodeDeliveryDetails {
                            contact,
                            user_input_code: Some(code.user_input_code.clone()),
                            magic_link: config
                                .magic_link_for(&code.link_code, &code.pre_auth_session_id),
                            pre_auth_session_id: code.pre_auth_session_id.clone(),
                            code_lifetime: code.code_lifetime,
                        })
                        .await?;

                    Ok(ApiResponse::ok(json!({
                        "status": "OK",
                        "deviceId": code.device_id,
                        "preAuthSessionId": code.pre_auth_session_id,
                        "flowType": config.flow_type,
                    })))
                }
            }),
            resend_code_post: slot(move |request: Request| {
                let resend_code = resend_impl.clone();
                let config = resend_config.clone();
                async move {
                    let body: ResendCodeBody = request.body_as(RECIPE_ID)?;
                    let outcome = call(
                        &resend_code,
                        "resend-code",
                        ResendCodeInput {
                            device_id: body.device_id,
                            pre_auth_session_id: body.pre_auth_session_id,
                            user_input_code: None,
                        },
                    )
                    .await?;

                    match outcome {
                        ResendCodeOutput::Ok {
                            code,
                            email,
                            phone_number,
                        } => {
                            let contact = match (email, phone_number) {
                                (Some(email), _) => ContactId::Email(email),
                                (None, Some(phone)) => ContactId::PhoneNumber(phone),
                                (None, None) => {
                                    return Err(AuthKitError::Serialization(
                                        "resend response carries no contact".to_string(),
                                    ));
                                }
                            };
                            config
                                .delivery
                                .send(&CodeDeliveryDetails {
                                    contact,
                                    user_input_code: Some(code.user_input_code.clone()),
                                    magic_link: config
                                        .magic_link_for(&code.link_code, &code.pre_auth_session_id),
                                    pre_auth_session_id: code.pre_auth_session_id.clone(),
                                    code_lifetime: code.code_lifetime,
                                })
                                .await?;
                            Ok(ApiResponse::ok(json!({"status": "OK"})))
                        }
                        ResendCodeOutput::RestartFlow => {
                            Ok(ApiResponse::ok(json!({"status": "RESTART_FLOW_ERROR"})))
                        }
                    }
                }
            }),
            consume_code_post: slot(move |request: Request| {
                let consume_code = consume_impl.clone();
                async move {
                    let input: ConsumeCodeInput = request.body_as(RECIPE_ID)?;
                    let typed = input.device_id.is_some() && input.user_input_code.is_some();
                    let linked = input.link_code.is_some();
                    if typed == linked {
                        return Err(bad_request(
                            "provide either linkCode or deviceId with userInputCode",
                        ));
                    }
                    let outcome = call(&consume_code, "consume-code", input).await?;
                    ApiResponse::ok_from(&outcome)
                }
            }),
            email_exists_get: slot(move |request: Request| {
                let lookup = email_lookup.clone();
                async move {
                    let email = request.require_query(RECIPE_ID, "email")?.to_string();
                    let user = call(&lookup, "get-user-by-email", email).await?;
                    Ok(ApiResponse::ok(
                        json!({"status": "OK", "exists": user.is_some()}),
                    ))
                }
            }),
            phone_number_exists_get: slot(move |request: Request| {
                let lookup = phone_lookup.clone();
                async move {
                    let phone = request.require_query(RECIPE_ID, "phoneNumber")?.to_string();
                    let user = call(&lookup, "get-user-by-phone-number", phone).await?;
                    Ok(ApiResponse::ok(
                        json!({"status": "OK", "exists": user.is_some()}),
                    ))
                }
            }),
        }
    }
}
