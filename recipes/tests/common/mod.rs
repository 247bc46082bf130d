//! Shared harness: a composite recipe wired to the in-memory core with a
//! capturing code delivery.

// Not every test binary uses every helper.
#![allow(dead_code)]

use authkit_core::http::{Request, ResponseSink};
use authkit_core::recipe::{DispatchOutcome, RecipeModule, dispatch};
use authkit_recipes::mocks::{CapturingDelivery, MockCore};
use authkit_recipes::passwordless::{ContactMethod, FlowType, PasswordlessConfig};
use authkit_recipes::thirdparty::ProviderConfig;
use authkit_recipes::{
    ThirdPartyPasswordlessConfig, ThirdPartyPasswordlessOverride, ThirdPartyPasswordlessRecipe,
};
use serde_json::Value;
use std::sync::Arc;

pub struct Harness {
    pub core: Arc<MockCore>,
    pub delivery: Arc<CapturingDelivery>,
    pub recipe: Arc<ThirdPartyPasswordlessRecipe>,
}

pub fn google_provider() -> ProviderConfig {
    ProviderConfig::new("google", "google-client-id")
        .with_authorization_url("https://accounts.google.com/o/oauth2/v2/auth")
}

pub fn harness(
    providers: Vec<ProviderConfig>,
    overrides: ThirdPartyPasswordlessOverride,
) -> Harness {
    let core = MockCore::new();
    let delivery = Arc::new(CapturingDelivery::new());
    let passwordless = PasswordlessConfig::new(
        ContactMethod::EmailOrPhone,
        FlowType::UserInputCodeAndMagicLink,
    )
    .with_magic_link_base_url("https://app.example.com/verify")
    .with_delivery(delivery.clone());
    let config = ThirdPartyPasswordlessConfig::new(passwordless)
        .with_providers(providers)
        .with_overrides(overrides);
    let recipe = ThirdPartyPasswordlessRecipe::new(core.clone(), config)
        .unwrap_or_else(|err| panic!("{err}"));
    Harness {
        core,
        delivery,
        recipe,
    }
}

/// Route one request through the composite the way a hosting adapter would.
pub async fn serve(
    recipe: &Arc<ThirdPartyPasswordlessRecipe>,
    request: Request,
) -> (DispatchOutcome, ResponseSink) {
    let modules: Vec<Arc<dyn RecipeModule>> = vec![recipe.clone()];
    let mut sink = ResponseSink::new();
    let outcome = dispatch(&modules, &request, &mut sink)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    (outcome, sink)
}

pub fn response_body(sink: &ResponseSink) -> Value {
    sink.body().cloned().unwrap_or(Value::Null)
}
