//! The composite recipe module.
//!
//! Construction order breaks the composite↔child cycle: the unified tables
//! are finalized first (defaults assembled from child defaults, then host
//! hooks), and only then is each child constructed around adapter-derived
//! views of those tables. No child ever holds a reference to the composite
//! itself.

use super::adapters;
use super::api::ApiImplementation;
use super::implementation::RecipeImplementation;
use super::{ThirdPartyPasswordlessConfig, ThirdPartyPasswordlessOverride, User};
use crate::emailverification as ev;
use crate::emailverification::{
    EmailVerificationConfig, EmailVerificationRecipe, EmailResolver, UserEmail,
};
use crate::emailverification::implementation::CreateTokenOutput;
use crate::passwordless::PasswordlessRecipe;
use crate::thirdparty::providers::validate_providers;
use crate::thirdparty::{ThirdPartyConfig, ThirdPartyRecipe};
use async_trait::async_trait;
use authkit_core::client::CoreClient;
use authkit_core::http::{Request, ResponseSink};
use authkit_core::recipe::{
    ApiDescriptor, RecipeModule, RequestOutcome, ensure_disjoint_routes,
};
use authkit_core::table::{Slot, call, slot};
use authkit_core::{AuthKitError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Stable recipe identifier.
pub const RECIPE_ID: &str = "thirdpartypasswordless";

/// Third-party + passwordless behind one [`RecipeModule`].
///
/// Holds its children in fixed priority order: passwordless, then
/// third-party (when providers are configured), then email verification.
pub struct ThirdPartyPasswordlessRecipe {
    implementation: RecipeImplementation,
    api: ApiImplementation,
    passwordless: Arc<PasswordlessRecipe>,
    third_party: Option<Arc<ThirdPartyRecipe>>,
    email_verification: Arc<EmailVerificationRecipe>,
    modules: Vec<Arc<dyn RecipeModule>>,
    apis: Vec<ApiDescriptor>,
}

impl ThirdPartyPasswordlessRecipe {
    /// Build the composite.
    ///
    /// Ordering is load-bearing: (1) child default Implementation Tables,
    /// (2) unified default assembled from them, (3) functions hook, (4)
    /// unified API Table built over the overridden implementation, (5) apis
    /// hook, (6) children constructed from adapter-derived views of the
    /// finalized tables.
    pub fn new(
        core: Arc<dyn CoreClient>,
        config: ThirdPartyPasswordlessConfig,
    ) -> Result<Arc<Self>> {
        let ThirdPartyPasswordlessConfig {
            passwordless: passwordless_config,
            providers,
            email_verification_recipe,
            overrides,
        } = config;
        let ThirdPartyPasswordlessOverride {
            functions,
            apis,
            email_verification: mut email_verification_overrides,
        } = overrides;

        validate_providers(&providers)?;
        let third_party_config = if providers.is_empty() {
            None
        } else {
            Some(ThirdPartyConfig::new(providers))
        };

        let passwordless_default =
            crate::passwordless::RecipeImplementation::from_core(Arc::clone(&core));
        let third_party_default = third_party_config
            .as_ref()
            .map(|_| crate::thirdparty::RecipeImplementation::from_core(Arc::clone(&core)));

        let mut implementation =
            RecipeImplementation::new(passwordless_default, third_party_default);
        if let Some(hook) = functions {
            implementation = hook(implementation);
        }

        let mut api = ApiImplementation::from_implementation(
            &implementation,
            &passwordless_config,
            third_party_config.as_ref(),
        );
        if let Some(hook) = apis {
            api = hook(api);
        }

        let passwordless = PasswordlessRecipe::from_parts(
            passwordless_config,
            adapters::passwordless_implementation(&implementation),
            adapters::passwordless_api(&api),
        )?;

        let third_party = match &third_party_config {
            Some(config) => Some(ThirdPartyRecipe::from_parts(
                config.clone(),
                adapters::third_party_implementation(&implementation),
                adapters::third_party_api(&api),
            )?),
            None => None,
        };

        let email_verification = match email_verification_recipe {
            // A pre-built child is borrowed: wired into dispatch, but no
            // overrides are re-applied to it.
            Some(prebuilt) => prebuilt,
            None => {
                let resolver = email_resolver(implementation.get_user_by_id.clone());
                let shortcut = install_verification_shortcut(
                    ev::RecipeImplementation::from_core(core),
                    implementation.get_user_by_id.clone(),
                );
                let ev_implementation =
                    email_verification_overrides.apply_functions(shortcut);
                let ev_api_default = ev::ApiImplementation::from_implementation(
                    &ev_implementation,
                    &EmailVerificationConfig::new(resolver),
                );
                let ev_api = email_verification_overrides.apply_apis(ev_api_default);
                EmailVerificationRecipe::from_parts(ev_implementation, ev_api)?
            }
        };

        let mut modules: Vec<Arc<dyn RecipeModule>> = vec![passwordless.clone()];
        if let Some(third_party) = &third_party {
            modules.push(third_party.clone());
        }
        modules.push(email_verification.clone());
        ensure_disjoint_routes(&modules)?;

        let apis_handled = modules
            .iter()
            .flat_map(|module| module.apis_handled().iter().cloned())
            .collect();

        tracing::info!(
            children = modules.len(),
            third_party = third_party.is_some(),
            "composite recipe initialized"
        );

        Ok(Arc::new(Self {
            implementation,
            api,
            passwordless,
            third_party,
            email_verification,
            modules,
            apis: apis_handled,
        }))
    }

    /// The frozen unified Implementation Table.
    pub fn implementation(&self) -> &RecipeImplementation {
        &self.implementation
    }

    /// The frozen unified API Table.
    pub fn api(&self) -> &ApiImplementation {
        &self.api
    }

    /// The passwordless child.
    pub fn passwordless(&self) -> &Arc<PasswordlessRecipe> {
        &self.passwordless
    }

    /// The third-party child, present only when providers are configured.
    pub fn third_party(&self) -> Option<&Arc<ThirdPartyRecipe>> {
        self.third_party.as_ref()
    }

    /// The email verification child.
    pub fn email_verification(&self) -> &Arc<EmailVerificationRecipe> {
        &self.email_verification
    }

    /// The children in dispatch priority order.
    pub fn children(&self) -> &[Arc<dyn RecipeModule>] {
        &self.modules
    }
}

/// Resolve a user id to the email it verifies against, through the unified
/// lookup so overrides apply.
///
/// A phone-only user has no address to verify, so resolution fails with a
/// bad request before any verification operation runs. The verified-by-login
/// shortcut only answers for users that do carry an email.
fn email_resolver(get_user_by_id: Slot<String, Option<User>>) -> EmailResolver {
    Arc::new(move |user_id: String| {
        let get_user_by_id = get_user_by_id.clone();
        Box::pin(async move {
            match call(&get_user_by_id, "get-user-by-id", user_id).await? {
                Some(User {
                    email: Some(email), ..
                }) => Ok(email),
                Some(_) => Err(AuthKitError::BadRequest {
                    recipe_id: ev::RECIPE_ID,
                    message: "user has no email to verify".to_string(),
                }),
                None => Err(AuthKitError::BadRequest {
                    recipe_id: ev::RECIPE_ID,
                    message: "unknown user id".to_string(),
                }),
            }
        })
    })
}

/// The verification-status special case, installed through the ordinary
/// override mechanism.
///
/// A passwordless-only identity proves address ownership by consuming the
/// login code, so it short-circuits as verified; a third-party identity
/// delegates to the original operation unchanged.
fn install_verification_shortcut(
    mut table: ev::RecipeImplementation,
    get_user_by_id: Slot<String, Option<User>>,
) -> ev::RecipeImplementation {
    let is_verified_original = table.is_email_verified.take();
    let is_verified_lookup = get_user_by_id.clone();
    table.is_email_verified = slot(move |input: UserEmail| {
        let original = is_verified_original.clone();
        let lookup = is_verified_lookup.clone();
        async move {
            let user = call(&lookup, "get-user-by-id", input.user_id.clone()).await?;
            match user {
                Some(user) if user.third_party.is_none() => Ok(true),
                _ => call(&original, "is-email-verified", input).await,
            }
        }
    });

    let create_original = table.create_email_verification_token.take();
    let create_lookup = get_user_by_id;
    table.create_email_verification_token = slot(move |input: UserEmail| {
        let original = create_original.clone();
        let lookup = create_lookup.clone();
        async move {
            let user = call(&lookup, "get-user-by-id", input.user_id.clone()).await?;
            match user {
                Some(user) if user.third_party.is_none() => {
                    Ok(CreateTokenOutput::EmailAlreadyVerified)
                }
                _ => call(&original, "generate-email-verify-token", input).await,
            }
        }
    });

    table
}

#[async_trait]
impl RecipeModule for ThirdPartyPasswordlessRecipe {
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
        for module in &self.modules {
            if module
                .apis_handled()
                .iter()
                .any(|api| api.operation_id == operation_id)
            {
                return module.handle_request(operation_id, request, sink).await;
            }
        }
        Ok(RequestOutcome::Refused)
    }

    fn cors_headers(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut headers = Vec::new();
        for module in &self.modules {
            for header in module.cors_headers() {
                if seen.insert(header.clone()) {
                    headers.push(header);
                }
            }
        }
        headers
    }

    async fn handle_error(
        &self,
        err: &AuthKitError,
        request: &Request,
        sink: &mut ResponseSink,
    ) -> Result<bool> {
        for module in &self.modules {
            if module.handle_error(err, request, sink).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
