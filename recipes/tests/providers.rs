//! Provider configuration validation at composite construction.

mod common;

use authkit_core::AuthKitError;
use authkit_core::http::Request;
use authkit_core::recipe::DispatchOutcome;
use authkit_recipes::mocks::MockCore;
use authkit_recipes::passwordless::{ContactMethod, FlowType, PasswordlessConfig};
use authkit_recipes::thirdparty::ProviderConfig;
use authkit_recipes::{
    ThirdPartyPasswordlessConfig, ThirdPartyPasswordlessRecipe,
};

fn build(providers: Vec<ProviderConfig>) -> Result<(), AuthKitError> {
    let config = ThirdPartyPasswordlessConfig::new(PasswordlessConfig::new(
        ContactMethod::Email,
        FlowType::UserInputCode,
    ))
    .with_providers(providers);
    ThirdPartyPasswordlessRecipe::new(MockCore::new(), config).map(|_| ())
}

#[tokio::test]
async fn duplicate_provider_ids_without_a_default_are_rejected() {
    let result = build(vec![
        ProviderConfig::new("google", "web-client"),
        ProviderConfig::new("google", "mobile-client"),
    ]);
    assert!(matches!(
        result,
        Err(AuthKitError::DuplicateProvider { provider_id }) if provider_id == "google"
    ));
}

#[tokio::test]
async fn multiple_defaults_for_one_provider_id_are_rejected() {
    let result = build(vec![
        ProviderConfig::new("google", "web-client").as_default(),
        ProviderConfig::new("google", "mobile-client").as_default(),
    ]);
    assert!(matches!(
        result,
        Err(AuthKitError::MultipleDefaultProviders { provider_id }) if provider_id == "google"
    ));
}

#[tokio::test]
async fn duplicate_ids_with_exactly_one_default_are_accepted() {
    let result = build(vec![
        ProviderConfig::new("google", "web-client")
            .with_authorization_url("https://accounts.google.com/o/oauth2/v2/auth")
            .as_default(),
        ProviderConfig::new("google", "mobile-client"),
    ]);
    assert!(result.is_ok());
}

#[tokio::test]
async fn authorisation_url_uses_the_default_entry() {
    let harness = common::harness(
        vec![
            ProviderConfig::new("google", "mobile-client"),
            ProviderConfig::new("google", "web-client")
                .with_authorization_url("https://accounts.google.com/o/oauth2/v2/auth")
                .as_default(),
        ],
        authkit_recipes::ThirdPartyPasswordlessOverride::none(),
    );

    let (outcome, sink) = common::serve(
        &harness.recipe,
        Request::get("/authorisationurl").with_query("thirdPartyId", "google"),
    )
    .await;
    assert_eq!(outcome, DispatchOutcome::Served);
    let body = common::response_body(&sink);
    assert_eq!(body["status"], "OK");
    assert_eq!(
        body["url"],
        "https://accounts.google.com/o/oauth2/v2/auth?client_id=web-client"
    );
}

#[tokio::test]
async fn unknown_provider_id_is_a_recipe_error() {
    let harness = common::harness(
        vec![common::google_provider()],
        authkit_recipes::ThirdPartyPasswordlessOverride::none(),
    );

    let modules: Vec<std::sync::Arc<dyn authkit_core::recipe::RecipeModule>> =
        vec![harness.recipe.clone()];
    let request = Request::get("/authorisationurl").with_query("thirdPartyId", "github");
    let mut sink = authkit_core::http::ResponseSink::new();
    let Err(err) = authkit_core::recipe::dispatch(&modules, &request, &mut sink).await else {
        panic!("unconfigured provider must error");
    };
    assert!(matches!(
        &err,
        AuthKitError::BadRequest { recipe_id, .. } if *recipe_id == "thirdparty"
    ));
    let handled = authkit_core::recipe::route_error(&modules, &err, &request, &mut sink)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    assert!(handled);
    assert_eq!(sink.status(), Some(400));
}
