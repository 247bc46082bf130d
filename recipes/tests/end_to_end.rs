//! Whole-flow tests through the composite's HTTP surface.

mod common;

use authkit_core::http::Request;
use authkit_core::recipe::DispatchOutcome;
use authkit_core::table::call;
use authkit_recipes::ThirdPartyPasswordlessOverride;
use authkit_recipes::emailverification::UserEmail;
use authkit_recipes::emailverification::implementation::CreateTokenOutput;
use authkit_recipes::passwordless::ContactId;
use serde_json::{Value, json};

async fn create_code(harness: &common::Harness, email: &str) -> Value {
    let (outcome, sink) = common::serve(
        &harness.recipe,
        Request::post("/signinup/code", json!({"email": email})),
    )
    .await;
    assert_eq!(outcome, DispatchOutcome::Served);
    let body = common::response_body(&sink);
    assert_eq!(body["status"], "OK");
    body
}

fn last_delivered_code(harness: &common::Harness) -> String {
    let sent = harness.delivery.sent();
    sent.last()
        .and_then(|details| details.user_input_code.clone())
        .unwrap_or_else(|| panic!("no code was delivered"))
}

async fn consume(harness: &common::Harness, created: &Value, code: &str) -> Value {
    let (outcome, sink) = common::serve(
        &harness.recipe,
        Request::post(
            "/signinup/code/consume",
            json!({
                "preAuthSessionId": created["preAuthSessionId"],
                "deviceId": created["deviceId"],
                "userInputCode": code,
            }),
        ),
    )
    .await;
    assert_eq!(outcome, DispatchOutcome::Served);
    common::response_body(&sink)
}

#[tokio::test]
async fn passwordless_email_flow_creates_a_user() {
    let harness = common::harness(Vec::new(), ThirdPartyPasswordlessOverride::none());

    let created = create_code(&harness, "alice@example.com").await;
    assert_eq!(created["flowType"], "USER_INPUT_CODE_AND_MAGIC_LINK");

    let sent = harness.delivery.sent();
    assert_eq!(sent.len(), 1);
    assert!(
        sent[0]
            .magic_link
            .as_deref()
            .is_some_and(|link| link.starts_with("https://app.example.com/verify"))
    );

    let body = consume(&harness, &created, &last_delivered_code(&harness)).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["createdNewUser"], true);
    assert_eq!(body["user"]["email"], "alice@example.com");
    // A passwordless identity never grows third-party or phone fields.
    assert!(body["user"].get("phoneNumber").is_none());
    assert!(body["user"].get("thirdParty").is_none());

    // The device died with the successful consume.
    let replay = consume(&harness, &created, &last_delivered_code(&harness)).await;
    assert_eq!(replay["status"], "RESTART_FLOW_ERROR");

    // Second login with the same contact signs in, not up.
    let created = create_code(&harness, "alice@example.com").await;
    let body = consume(&harness, &created, &last_delivered_code(&harness)).await;
    assert_eq!(body["createdNewUser"], false);

    let (_, sink) = common::serve(
        &harness.recipe,
        Request::get("/signup/email/exists").with_query("email", "alice@example.com"),
    )
    .await;
    assert_eq!(common::response_body(&sink)["exists"], true);
}

#[tokio::test]
async fn resend_replaces_the_active_code() {
    let harness = common::harness(Vec::new(), ThirdPartyPasswordlessOverride::none());
    let created = create_code(&harness, "bob@example.com").await;
    let original_code = last_delivered_code(&harness);

    let (outcome, sink) = common::serve(
        &harness.recipe,
        Request::post(
            "/signinup/code/resend",
            json!({
                "deviceId": created["deviceId"],
                "preAuthSessionId": created["preAuthSessionId"],
            }),
        ),
    )
    .await;
    assert_eq!(outcome, DispatchOutcome::Served);
    assert_eq!(common::response_body(&sink)["status"], "OK");
    assert_eq!(harness.delivery.sent().len(), 2);

    // Only the replacement code consumes; the original now counts as a
    // failed attempt.
    let replacement = last_delivered_code(&harness);
    if original_code != replacement {
        let stale = consume(&harness, &created, &original_code).await;
        assert_eq!(stale["status"], "INCORRECT_USER_INPUT_CODE_ERROR");
        assert_eq!(stale["failedCodeInputAttemptCount"], 1);
    }
    let body = consume(&harness, &created, &replacement).await;
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn incorrect_code_reports_remaining_attempts() {
    let harness = common::harness(Vec::new(), ThirdPartyPasswordlessOverride::none());
    let created = create_code(&harness, "carol@example.com").await;

    let wrong = consume(&harness, &created, "not-the-code").await;
    assert_eq!(wrong["status"], "INCORRECT_USER_INPUT_CODE_ERROR");
    assert_eq!(wrong["failedCodeInputAttemptCount"], 1);
    assert_eq!(wrong["maximumCodeInputAttemptCount"], 5);

    // The device survives a wrong attempt.
    let body = consume(&harness, &created, &last_delivered_code(&harness)).await;
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn third_party_sign_in_up_round_trip() {
    let harness = common::harness(
        vec![common::google_provider()],
        ThirdPartyPasswordlessOverride::none(),
    );

    let sign_in = |created_expected: bool| {
        let harness = &harness;
        async move {
            let (outcome, sink) = common::serve(
                &harness.recipe,
                Request::post(
                    "/signinup",
                    json!({
                        "thirdPartyId": "google",
                        "thirdPartyUserId": "google-uid-1",
                        "email": {"id": "dora@example.com", "isVerified": true},
                    }),
                ),
            )
            .await;
            assert_eq!(outcome, DispatchOutcome::Served);
            let body = common::response_body(&sink);
            assert_eq!(body["status"], "OK");
            assert_eq!(body["createdNewUser"], Value::Bool(created_expected));
            assert_eq!(body["user"]["thirdParty"]["id"], "google");
            body
        }
    };

    let first = sign_in(true).await;
    let second = sign_in(false).await;
    assert_eq!(first["user"]["id"], second["user"]["id"]);
}

#[tokio::test]
async fn revoking_all_codes_forces_a_restart() {
    let harness = common::harness(Vec::new(), ThirdPartyPasswordlessOverride::none());
    let created = create_code(&harness, "grace@example.com").await;
    assert_eq!(harness.core.device_count(), 1);

    let revoke = &harness.recipe.implementation().revoke_all_codes;
    call(
        revoke,
        "revoke-all-codes",
        ContactId::Email("grace@example.com".to_string()),
    )
    .await
    .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(harness.core.device_count(), 0);

    let body = consume(&harness, &created, &last_delivered_code(&harness)).await;
    assert_eq!(body["status"], "RESTART_FLOW_ERROR");
}

#[tokio::test]
async fn revoked_verification_tokens_stop_verifying() {
    let harness = common::harness(
        vec![common::google_provider()],
        ThirdPartyPasswordlessOverride::none(),
    );
    let user_id = harness
        .core
        .seed_third_party_user("google", "google-uid-3", "heidi@example.com");
    let pair = UserEmail {
        user_id: user_id.clone(),
        email: "heidi@example.com".to_string(),
    };

    let ev = harness.recipe.email_verification().implementation();
    let outcome = call(
        &ev.create_email_verification_token,
        "generate-email-verify-token",
        pair.clone(),
    )
    .await
    .unwrap_or_else(|err| panic!("{err}"));
    let CreateTokenOutput::Ok { token } = outcome else {
        panic!("seeded third-party user must get a token");
    };

    call(
        &ev.revoke_email_verification_tokens,
        "revoke-email-verification-tokens",
        pair.clone(),
    )
    .await
    .unwrap_or_else(|err| panic!("{err}"));

    let (_, sink) = common::serve(
        &harness.recipe,
        Request::post("/user/email/verify", json!({"method": "token", "token": token})),
    )
    .await;
    assert_eq!(
        common::response_body(&sink)["status"],
        "EMAIL_VERIFICATION_INVALID_TOKEN_ERROR"
    );

    // A fresh token still works, and unverify undoes it.
    let outcome = call(
        &ev.create_email_verification_token,
        "generate-email-verify-token",
        pair.clone(),
    )
    .await
    .unwrap_or_else(|err| panic!("{err}"));
    let CreateTokenOutput::Ok { token } = outcome else {
        panic!("revocation must not verify the pair");
    };
    let (_, sink) = common::serve(
        &harness.recipe,
        Request::post("/user/email/verify", json!({"method": "token", "token": token})),
    )
    .await;
    assert_eq!(common::response_body(&sink)["status"], "OK");
    assert!(harness.core.pair_verified(&user_id, "heidi@example.com"));

    call(&ev.unverify_email, "unverify-email", pair)
        .await
        .unwrap_or_else(|err| panic!("{err}"));
    assert!(!harness.core.pair_verified(&user_id, "heidi@example.com"));
}

#[tokio::test]
async fn verification_status_depends_on_how_the_user_signed_up() {
    let harness = common::harness(
        vec![common::google_provider()],
        ThirdPartyPasswordlessOverride::none(),
    );

    // A passwordless user proved address ownership by consuming the code:
    // verified from the start, and token creation short-circuits.
    let created = create_code(&harness, "eve@example.com").await;
    let body = consume(&harness, &created, &last_delivered_code(&harness)).await;
    let passwordless_id = body["user"]["id"]
        .as_str()
        .unwrap_or_else(|| panic!("consume returned no user id"))
        .to_string();

    let (_, sink) = common::serve(
        &harness.recipe,
        Request::get("/user/email/verify").with_query("userId", &passwordless_id),
    )
    .await;
    let verified = common::response_body(&sink);
    assert_eq!(verified["status"], "OK");
    assert_eq!(verified["isVerified"], true);

    let (_, sink) = common::serve(
        &harness.recipe,
        Request::post("/user/email/verify/token", json!({"userId": passwordless_id})),
    )
    .await;
    assert_eq!(
        common::response_body(&sink)["status"],
        "EMAIL_ALREADY_VERIFIED_ERROR"
    );

    // A third-party user goes through the real verification flow.
    let (_, sink) = common::serve(
        &harness.recipe,
        Request::post(
            "/signinup",
            json!({
                "thirdPartyId": "google",
                "thirdPartyUserId": "google-uid-2",
                "email": {"id": "frank@example.com", "isVerified": false},
            }),
        ),
    )
    .await;
    let third_party_id = common::response_body(&sink)["user"]["id"]
        .as_str()
        .unwrap_or_else(|| panic!("sign in up returned no user id"))
        .to_string();

    let (_, sink) = common::serve(
        &harness.recipe,
        Request::get("/user/email/verify").with_query("userId", &third_party_id),
    )
    .await;
    assert_eq!(common::response_body(&sink)["isVerified"], false);

    // Mint a token through the frozen table (the HTTP API never echoes it)
    // and verify with it.
    let token_slot = &harness
        .recipe
        .email_verification()
        .implementation()
        .create_email_verification_token;
    let outcome = call(
        token_slot,
        "generate-email-verify-token",
        UserEmail {
            user_id: third_party_id.clone(),
            email: "frank@example.com".to_string(),
        },
    )
    .await
    .unwrap_or_else(|err| panic!("{err}"));
    let CreateTokenOutput::Ok { token } = outcome else {
        panic!("third-party user must get a real token");
    };

    let (_, sink) = common::serve(
        &harness.recipe,
        Request::post("/user/email/verify", json!({"method": "token", "token": token})),
    )
    .await;
    assert_eq!(common::response_body(&sink)["status"], "OK");

    let (_, sink) = common::serve(
        &harness.recipe,
        Request::get("/user/email/verify").with_query("userId", &third_party_id),
    )
    .await;
    assert_eq!(common::response_body(&sink)["isVerified"], true);
    assert!(harness.core.pair_verified(&third_party_id, "frank@example.com"));
}
