//! The process-wide init singleton.
//!
//! One test function drives the whole lifecycle sequentially: the singleton
//! is process-global, so splitting these assertions across tests would race.

mod common;

use authkit_core::AuthKitError;
use authkit_core::client::CoreConnection;
use authkit_core::http::Request;
use authkit_core::recipe::DispatchOutcome;
use authkit_recipes::mocks::MockCore;
use authkit_recipes::passwordless::{ContactMethod, FlowType, PasswordlessConfig};
use authkit_recipes::{
    AuthKitConfig, ThirdPartyPasswordlessConfig, ThirdPartyPasswordlessOverride, init, instance,
    reset,
};

fn config(app_name: &str) -> AuthKitConfig {
    config_with(app_name, ThirdPartyPasswordlessOverride::none())
}

fn config_with(app_name: &str, overrides: ThirdPartyPasswordlessOverride) -> AuthKitConfig {
    let recipe = ThirdPartyPasswordlessConfig::new(PasswordlessConfig::new(
        ContactMethod::Email,
        FlowType::UserInputCode,
    ))
    .with_overrides(overrides);
    AuthKitConfig::new(app_name, CoreConnection::new("http://localhost:3567"), recipe)
        .with_core_client(MockCore::new())
}

#[tokio::test]
async fn init_lifecycle() {
    reset();

    // Nothing before init.
    assert!(matches!(instance(), Err(AuthKitError::NotInitialized)));

    let kit = init(config("first")).unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(kit.app_name(), "first");
    assert_eq!(kit.api_base_path().as_str(), "/auth");
    assert!(std::sync::Arc::ptr_eq(
        &kit,
        &instance().unwrap_or_else(|err| panic!("{err}"))
    ));

    // A second init is a hard error, not a reconfiguration.
    assert!(matches!(
        init(config("second")),
        Err(AuthKitError::AlreadyInitialized)
    ));
    assert_eq!(
        instance().unwrap_or_else(|err| panic!("{err}")).app_name(),
        "first"
    );

    // Requests under the base path are served with the prefix stripped.
    let mut sink = authkit_core::http::ResponseSink::new();
    let outcome = kit
        .middleware(
            &Request::get("/auth/signup/email/exists").with_query("email", "a@example.com"),
            &mut sink,
        )
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(outcome, DispatchOutcome::Served);
    assert_eq!(sink.body().and_then(|b| b.get("exists")).cloned(), Some(serde_json::json!(false)));

    // Requests outside the base path fall through to the host.
    let mut sink = authkit_core::http::ResponseSink::new();
    let outcome = kit
        .middleware(&Request::get("/healthz"), &mut sink)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(outcome, DispatchOutcome::NotFound);
    assert!(!sink.written());

    // Reset releases the slot for a genuinely fresh instance.
    reset();
    assert!(matches!(instance(), Err(AuthKitError::NotInitialized)));
    let fresh = init(
        config("third").with_api_base_path("/api/auth"),
    )
    .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(fresh.app_name(), "third");
    assert_eq!(fresh.api_base_path().as_str(), "/api/auth");

    // Override state does not survive a reset: an instance whose hooks
    // deleted an API slot refuses the route, and the plain instance built
    // after the reset serves it again.
    reset();
    let overrides = ThirdPartyPasswordlessOverride::none().with_apis(|mut api| {
        api.create_code_post = None;
        api
    });
    let muted = init(config_with("muted", overrides)).unwrap_or_else(|err| panic!("{err}"));
    let request = Request::post(
        "/auth/signinup/code",
        serde_json::json!({"email": "a@example.com"}),
    );
    let mut sink = authkit_core::http::ResponseSink::new();
    let outcome = muted
        .middleware(&request, &mut sink)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(outcome, DispatchOutcome::NotFound);
    assert!(!sink.written());

    reset();
    let plain = init(config("plain")).unwrap_or_else(|err| panic!("{err}"));
    let mut sink = authkit_core::http::ResponseSink::new();
    let outcome = plain
        .middleware(&request, &mut sink)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(outcome, DispatchOutcome::Served);
    assert_eq!(
        sink.body().and_then(|b| b.get("status")).cloned(),
        Some(serde_json::json!("OK"))
    );

    reset();
}

#[tokio::test]
async fn recipe_raised_errors_are_claimed_by_the_owning_recipe() {
    // Goes through a local AuthKit built the same way init would, but held
    // directly so this test does not touch the global slot.
    let harness = common::harness(
        Vec::new(),
        authkit_recipes::ThirdPartyPasswordlessOverride::none(),
    );

    // Missing contact: the passwordless recipe raises a bad request and its
    // error handler renders it as a 400.
    let request = Request::post("/signinup/code", serde_json::json!({}));
    let modules: Vec<std::sync::Arc<dyn authkit_core::recipe::RecipeModule>> =
        vec![harness.recipe.clone()];
    let mut sink = authkit_core::http::ResponseSink::new();
    let Err(err) = authkit_core::recipe::dispatch(&modules, &request, &mut sink).await else {
        panic!("missing contact must error");
    };
    let handled = authkit_core::recipe::route_error(&modules, &err, &request, &mut sink)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    assert!(handled);
    assert_eq!(sink.status(), Some(400));
}
