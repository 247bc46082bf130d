//! The email verification recipe module.

use super::api::ApiImplementation;
use super::implementation::RecipeImplementation;
use super::{EmailVerificationConfig, EmailVerificationOverride};
use async_trait::async_trait;
use authkit_core::http::{ApiResponse, Method, Request, ResponseSink};
use authkit_core::recipe::{ApiDescriptor, RecipeModule, RequestOutcome};
use authkit_core::table::{Slot, call};
use authkit_core::{AuthKitError, Result};
use serde_json::json;
use std::sync::Arc;

/// Stable recipe identifier.
pub const RECIPE_ID: &str = "emailverification";

/// Operation id for `POST /user/email/verify/token`.
pub const GENERATE_TOKEN_API: &str = "generate-email-verify-token";
/// Operation id for `POST /user/email/verify`.
pub const VERIFY_EMAIL_API: &str = "verify-email";
/// Operation id for `GET /user/email/verify`.
pub const IS_EMAIL_VERIFIED_API: &str = "is-email-verified";

/// Email verification behind one [`RecipeModule`].
pub struct EmailVerificationRecipe {
    implementation: RecipeImplementation,
    api: ApiImplementation,
    apis: Vec<ApiDescriptor>,
}

impl EmailVerificationRecipe {
    /// Standalone construction: default tables from the core, host override
    /// applied in the mandated order.
    pub fn new(
        core: Arc<dyn authkit_core::CoreClient>,
        config: EmailVerificationConfig,
        overrides: EmailVerificationOverride,
    ) -> Result<Arc<Self>> {
        let default_impl = RecipeImplementation::from_core(core);
        Self::with_default_apis(config, default_impl, overrides)
    }

    /// Construction from a caller-supplied default Implementation Table.
    /// Enforces the override ordering invariant.
    pub fn with_default_apis(
        config: EmailVerificationConfig,
        default_impl: RecipeImplementation,
        mut overrides: EmailVerificationOverride,
    ) -> Result<Arc<Self>> {
        let implementation = overrides.apply_functions(default_impl);
        let default_api = ApiImplementation::from_implementation(&implementation, &config);
        let api = overrides.apply_apis(default_api);
        Self::from_parts(implementation, api)
    }

    /// Construction from fully-finalized tables; no hooks run here.
    pub fn from_parts(
        implementation: RecipeImplementation,
        api: ApiImplementation,
    ) -> Result<Arc<Self>> {
        let apis = vec![
            ApiDescriptor::new(
                RECIPE_ID,
                Method::Post,
                "/user/email/verify/token",
                GENERATE_TOKEN_API,
            )?,
            ApiDescriptor::new(RECIPE_ID, Method::Post, "/user/email/verify", VERIFY_EMAIL_API)?,
            ApiDescriptor::new(
                RECIPE_ID,
                Method::Get,
                "/user/email/verify",
                IS_EMAIL_VERIFIED_API,
            )?,
        ];
        Ok(Arc::new(Self {
            implementation,
            api,
            apis,
        }))
    }

    /// The frozen Implementation Table.
    pub fn implementation(&self) -> &RecipeImplementation {
        &self.implementation
    }

    /// The frozen API Table.
    pub fn api(&self) -> &ApiImplementation {
        &self.api
    }

    fn api_slot(&self, operation_id: &str) -> Option<&Slot<Request, ApiResponse>> {
        match operation_id {
            GENERATE_TOKEN_API => Some(&self.api.generate_email_verify_token_post),
            VERIFY_EMAIL_API => Some(&self.api.verify_email_post),
            IS_EMAIL_VERIFIED_API => Some(&self.api.is_email_verified_get),
            _ => None,
        }
    }
}

#[async_trait]
impl RecipeModule for EmailVerificationRecipe {
    fn recipe_id(&self) -> &'static str {
        RECIPE_ID
    }

    fn apis_handled(&self) -> &[ApiDescriptor] {
        &self.apis
    }

    async fn handle_request(
        &self,
        operation_id: &str,
        request: &Request,
        sink: &mut ResponseSink,
    ) -> Result<RequestOutcome> {
        let Some(entry) = self.api_slot(operation_id) else {
            return Ok(RequestOutcome::Refused);
        };
        if entry.is_none() {
            return Ok(RequestOutcome::Refused);
        }
        let response = call(entry, operation_id, request.clone()).await?;
        sink.send_json(response.status, &response.body)?;
        Ok(RequestOutcome::Served)
    }

    fn cors_headers(&self) -> Vec<String> {
        vec!["rid".to_string(), "fdi-version".to_string()]
    }

    async fn handle_error(
        &self,
        err: &AuthKitError,
        _request: &Request,
        sink: &mut ResponseSink,
    ) -> Result<bool> {
        match err {
            AuthKitError::BadRequest { recipe_id, message } if *recipe_id == RECIPE_ID => {
                sink.send_json(400, &json!({"message": message}))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
