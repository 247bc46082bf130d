//! The passwordless recipe module.

use super::api::ApiImplementation;
use super::implementation::RecipeImplementation;
use super::{PasswordlessConfig, PasswordlessOverride};
use async_trait::async_trait;
use authkit_core::http::{ApiResponse, Method, Request, ResponseSink};
use authkit_core::recipe::{ApiDescriptor, RecipeModule, RequestOutcome};
use authkit_core::table::{Slot, call};
use authkit_core::{AuthKitError, Result};
use serde_json::json;
use std::sync::Arc;

/// Stable recipe identifier.
pub const RECIPE_ID: &str = "passwordless";

/// Operation id for `POST /signinup/code`.
pub const CREATE_CODE_API: &str = "create-code";
/// Operation id for `POST /signinup/code/resend`.
pub const RESEND_CODE_API: &str = "resend-code";
/// Operation id for `POST /signinup/code/consume`.
pub const CONSUME_CODE_API: &str = "consume-code";
/// Operation id for `GET /signup/email/exists`.
pub const EMAIL_EXISTS_API: &str = "email-exists";
/// Operation id for `GET /signup/phonenumber/exists`.
pub const PHONE_NUMBER_EXISTS_API: &str = "phone-number-exists";

/// Passwordless login behind one [`RecipeModule`].
pub struct PasswordlessRecipe {
    config: PasswordlessConfig,
    implementation: RecipeImplementation,
    api: ApiImplementation,
    apis: Vec<ApiDescriptor>,
}

impl PasswordlessRecipe {
    /// Standalone construction: default tables from the core, host override
    /// applied in the mandated order.
    pub fn new(
        core: Arc<dyn authkit_core::CoreClient>,
        config: PasswordlessConfig,
        overrides: PasswordlessOverride,
    ) -> Result<Arc<Self>> {
        let default_impl = RecipeImplementation::from_core(core);
        Self::with_default_apis(config, default_impl, overrides)
    }

    /// Construction from a caller-supplied default Implementation Table
    /// (a composite hands in an adapter-derived one). The override ordering
    /// invariant is enforced here: functions hook first, API Table built from
    /// the overridden implementation, apis hook last.
    pub fn with_default_apis(
        config: PasswordlessConfig,
        default_impl: RecipeImplementation,
        mut overrides: PasswordlessOverride,
    ) -> Result<Arc<Self>> {
        let implementation = overrides.apply_functions(default_impl);
        let default_api = ApiImplementation::from_implementation(&implementation, &config);
        let api = overrides.apply_apis(default_api);
        Self::from_parts(config, implementation, api)
    }

    /// Construction from fully-finalized tables; no hooks run here. Used by
    /// composites whose unified tables were already overridden.
    pub fn from_parts(
        config: PasswordlessConfig,
        implementation: RecipeImplementation,
        api: ApiImplementation,
    ) -> Result<Arc<Self>> {
        let apis = vec![
            ApiDescriptor::new(RECIPE_ID, Method::Post, "/signinup/code", CREATE_CODE_API)?,
            ApiDescriptor::new(
                RECIPE_ID,
                Method::Post,
                "/signinup/code/resend",
                RESEND_CODE_API,
            )?,
            ApiDescriptor::new(
                RECIPE_ID,
                Method::Post,
                "/signinup/code/consume",
                CONSUME_CODE_API,
            )?,
            ApiDescriptor::new(RECIPE_ID, Method::Get, "/signup/email/exists", EMAIL_EXISTS_API)?,
            ApiDescriptor::new(
                RECIPE_ID,
                Method::Get,
                "/signup/phonenumber/exists",
                PHONE_NUMBER_EXISTS_API,
            )?,
        ];
        Ok(Arc::new(Self {
            config,
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

    /// Recipe configuration.
    pub fn config(&self) -> &PasswordlessConfig {
        &self.config
    }

    fn api_slot(&self, operation_id: &str) -> Option<&Slot<Request, ApiResponse>> {
        match operation_id {
            CREATE_CODE_API => Some(&self.api.create_code_post),
            RESEND_CODE_API => Some(&self.api.resend_code_post),
            CONSUME_CODE_API => Some(&self.api.consume_code_post),
            EMAIL_EXISTS_API => Some(&self.api.email_exists_get),
            PHONE_NUMBER_EXISTS_API => Some(&self.api.phone_number_exists_get),
            _ => None,
        }
    }
}

#[async_trait]
impl RecipeModule for PasswordlessRecipe {
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
