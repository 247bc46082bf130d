//! How the composite assembles its children.

mod common;

use authkit_core::http::Method;
use authkit_core::recipe::{RecipeModule, aggregate_cors_headers};
use authkit_recipes::ThirdPartyPasswordlessOverride;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn three_children_when_providers_are_configured() {
    let harness = common::harness(
        vec![common::google_provider()],
        ThirdPartyPasswordlessOverride::none(),
    );
    let recipe = &harness.recipe;

    assert_eq!(recipe.children().len(), 3);
    assert!(recipe.third_party().is_some());

    // The route list is the literal concatenation of the children's lists,
    // in child priority order.
    let operations: Vec<&str> = recipe
        .apis_handled()
        .iter()
        .map(|api| api.operation_id)
        .collect();
    assert_eq!(
        operations,
        vec![
            "create-code",
            "resend-code",
            "consume-code",
            "email-exists",
            "phone-number-exists",
            "sign-in-up",
            "authorisation-url",
            "generate-email-verify-token",
            "verify-email",
            "is-email-verified",
        ]
    );
}

#[tokio::test]
async fn third_party_child_absent_without_providers() {
    let harness = common::harness(Vec::new(), ThirdPartyPasswordlessOverride::none());
    let recipe = &harness.recipe;

    assert_eq!(recipe.children().len(), 2);
    assert!(recipe.third_party().is_none());
    assert!(
        recipe
            .apis_handled()
            .iter()
            .all(|api| api.operation_id != "sign-in-up")
    );
}

#[tokio::test]
async fn routes_are_disjoint_across_children() {
    let harness = common::harness(
        vec![common::google_provider()],
        ThirdPartyPasswordlessOverride::none(),
    );
    let mut seen: HashSet<(Method, String)> = HashSet::new();
    for api in harness.recipe.apis_handled() {
        assert!(
            seen.insert((api.method, api.path.as_str().to_string())),
            "duplicate route {} {}",
            api.method,
            api.path
        );
    }
}

#[tokio::test]
async fn cors_headers_are_a_deduped_union() {
    let harness = common::harness(
        vec![common::google_provider()],
        ThirdPartyPasswordlessOverride::none(),
    );
    // Every child contributes the same two headers; the union carries each
    // once.
    let headers = harness.recipe.cors_headers();
    assert_eq!(headers, vec!["rid".to_string(), "fdi-version".to_string()]);

    let modules: Vec<Arc<dyn RecipeModule>> = vec![harness.recipe.clone()];
    let aggregated = aggregate_cors_headers(&modules);
    assert_eq!(
        aggregated,
        vec![
            "content-type".to_string(),
            "rid".to_string(),
            "fdi-version".to_string()
        ]
    );
}
