//! Passwordless login recipe.
//!
//! Users authenticate by consuming a one-time code (or magic link) delivered
//! to an email address or phone number. The recipe never stores anything
//! itself: codes and users live in the remote core, reached through the
//! default Implementation Table.

pub mod api;
pub mod implementation;
pub mod recipe;

pub use api::ApiImplementation;
pub use implementation::RecipeImplementation;
pub use recipe::{PasswordlessRecipe, RECIPE_ID};

use async_trait::async_trait;
use authkit_core::Result;
use authkit_core::table::RecipeOverride;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The two optional host hooks for this recipe.
pub type PasswordlessOverride = RecipeOverride<RecipeImplementation, ApiImplementation>;

/// A passwordless user as the core reports it.
///
/// At least one of `email` / `phone_number` is present; a user may acquire
/// the other over time via `update_user`. Never carries a third-party
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordlessUser {
    /// Core-assigned identifier.
    #[serde(rename = "id")]
    pub user_id: String,
    /// Email, if this identity has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number, if this identity has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    /// Creation timestamp, epoch millis.
    pub time_joined: u64,
}

/// The contact a login code is created against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactId {
    /// Deliver to an email address.
    Email(String),
    /// Deliver to a phone number.
    PhoneNumber(String),
}

impl ContactId {
    /// Insert this contact into a JSON request body under the field name the
    /// core expects.
    pub fn write_into(&self, body: &mut serde_json::Map<String, serde_json::Value>) {
        match self {
            Self::Email(email) => {
                body.insert("email".to_string(), serde_json::Value::String(email.clone()));
            }
            Self::PhoneNumber(phone) => {
                body.insert(
                    "phoneNumber".to_string(),
                    serde_json::Value::String(phone.clone()),
                );
            }
        }
    }
}

/// Which contact kinds this deployment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactMethod {
    /// Email only.
    Email,
    /// Phone number only.
    PhoneNumber,
    /// Either.
    EmailOrPhone,
}

impl ContactMethod {
    /// Whether a given contact is acceptable under this method.
    pub const fn accepts(self, contact: &ContactId) -> bool {
        match (self, contact) {
            (Self::Email, ContactId::Email(_))
            | (Self::PhoneNumber, ContactId::PhoneNumber(_))
            | (Self::EmailOrPhone, _) => true,
            _ => false,
        }
    }
}

/// How the user proves possession of the contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowType {
    /// Short numeric code typed back in.
    #[serde(rename = "USER_INPUT_CODE")]
    UserInputCode,
    /// Clickable link carrying an opaque code.
    #[serde(rename = "MAGIC_LINK")]
    MagicLink,
    /// Both at once.
    #[serde(rename = "USER_INPUT_CODE_AND_MAGIC_LINK")]
    UserInputCodeAndMagicLink,
}

/// Everything a delivery hook needs to send one code.
#[derive(Debug, Clone)]
pub struct CodeDeliveryDetails {
    /// Where to send it.
    pub contact: ContactId,
    /// The short code, when the flow uses one.
    pub user_input_code: Option<String>,
    /// The fully-rendered magic link, when the flow uses one.
    pub magic_link: Option<String>,
    /// Session the code belongs to.
    pub pre_auth_session_id: String,
    /// Validity window in millis.
    pub code_lifetime: u64,
}

/// Sends login codes to users.
///
/// SMTP/SMS transport is the host's business; the default just logs the code,
/// which is what you want in development anyway.
#[async_trait]
pub trait CodeDelivery: Send + Sync {
    /// Deliver one code.
    async fn send(&self, details: &CodeDeliveryDetails) -> Result<()>;
}

/// Default delivery: write the code to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDelivery;

#[async_trait]
impl CodeDelivery for ConsoleDelivery {
    async fn send(&self, details: &CodeDeliveryDetails) -> Result<()> {
        let contact = match &details.contact {
            ContactId::Email(email) => format!("email {email}"),
            ContactId::PhoneNumber(phone) => format!("phone {phone}"),
        };
        tracing::info!(
            %contact,
            code = details.user_input_code.as_deref().unwrap_or("-"),
            link = details.magic_link.as_deref().unwrap_or("-"),
            "passwordless login code"
        );
        Ok(())
    }
}

/// Passwordless recipe configuration.
#[derive(Clone)]
pub struct PasswordlessConfig {
    /// Accepted contact kinds.
    pub contact_method: ContactMethod,
    /// Proof-of-possession flow.
    pub flow_type: FlowType,
    /// Base URL magic links are rendered against, e.g.
    /// `https://app.example.com/auth/verify`.
    pub magic_link_base_url: Option<String>,
    /// Delivery hook.
    pub delivery: Arc<dyn CodeDelivery>,
}

impl PasswordlessConfig {
    /// Config with the given contact method and flow, console delivery.
    pub fn new(contact_method: ContactMethod, flow_type: FlowType) -> Self {
        Self {
            contact_method,
            flow_type,
            magic_link_base_url: None,
            delivery: Arc::new(ConsoleDelivery),
        }
    }

    /// Set the magic-link base URL.
    #[must_use]
    pub fn with_magic_link_base_url(mut self, url: impl Into<String>) -> Self {
        self.magic_link_base_url = Some(url.into());
        self
    }

    /// Replace the delivery hook.
    #[must_use]
    pub fn with_delivery(mut self, delivery: Arc<dyn CodeDelivery>) -> Self {
        self.delivery = delivery;
        self
    }

    /// Render the magic link for a freshly created code, when the flow and
    /// config call for one.
    pub fn magic_link_for(&self, link_code: &str, pre_auth_session_id: &str) -> Option<String> {
        if matches!(self.flow_type, FlowType::UserInputCode) {
            return None;
        }
        let base = self.magic_link_base_url.as_deref()?;
        Some(format!(
            "{base}?preAuthSessionId={pre_auth_session_id}#{link_code}"
        ))
    }
}

impl Default for PasswordlessConfig {
    fn default() -> Self {
        Self::new(ContactMethod::EmailOrPhone, FlowType::UserInputCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_method_gating() {
        let email = ContactId::Email("a@b.c".into());
        let phone = ContactId::PhoneNumber("+15551234".into());
        assert!(ContactMethod::Email.accepts(&email));
        assert!(!ContactMethod::Email.accepts(&phone));
        assert!(ContactMethod::EmailOrPhone.accepts(&phone));
    }

    #[test]
    fn magic_link_only_rendered_for_link_flows() {
        let config = PasswordlessConfig::new(ContactMethod::Email, FlowType::UserInputCode)
            .with_magic_link_base_url("https://app.example.com/verify");
        assert_eq!(config.magic_link_for("abc", "s1"), None);

        let config = PasswordlessConfig::new(ContactMethod::Email, FlowType::MagicLink)
            .with_magic_link_base_url("https://app.example.com/verify");
        assert_eq!(
            config.magic_link_for("abc", "s1").as_deref(),
            Some("https://app.example.com/verify?preAuthSessionId=s1#abc")
        );
    }
}
