//! Outbound adapters: unified tables standing in for child tables.
//!
//! Each child recipe is an independent module defined against its own
//! narrower user shape. The composite re-derives each child's tables from
//! the already-finalized unified tables, so a host override on the unified
//! table is what the child ends up calling. Narrowing rules:
//!
//! - a user of the wrong kind (a third-party identity seen through the
//!   passwordless shape, or vice versa) narrows to "not found", never to a
//!   mangled user;
//! - a deleted (null) unified slot stays deleted in the child shape.

use super::api::ApiImplementation as UnifiedApi;
use super::implementation::RecipeImplementation as UnifiedImplementation;
use crate::passwordless::api::ApiImplementation as PasswordlessApi;
use crate::passwordless::implementation as pl;
use crate::thirdparty::api::ApiImplementation as ThirdPartyApi;
use crate::thirdparty::implementation as tp;
use authkit_core::AuthKitError;
use authkit_core::table::slot;

use super::User;

/// Derive a passwordless-shaped Implementation Table from the unified one.
pub fn passwordless_implementation(unified: &UnifiedImplementation) -> pl::RecipeImplementation {
    let consume_code = match unified.consume_code.clone() {
        Some(inner) => slot(move |input: pl::ConsumeCodeInput| {
            let inner = inner.clone();
            async move {
                let output = inner(input).await?;
                // The unified default can only hand an actual passwordless
                // user back here; an override manufacturing a cross-kind
                // user narrows to a restarted flow rather than leaking it.
                Ok(output
                    .narrow()
                    .unwrap_or(pl::ConsumeCodeOutput::RestartFlow))
            }
        }),
        None => None,
    };

    let get_user_by_id = match unified.get_user_by_id.clone() {
        Some(inner) => slot(move |user_id: String| {
            let inner = inner.clone();
            async move {
                let user = inner(user_id).await?;
                Ok(user.and_then(User::into_passwordless))
            }
        }),
        None => None,
    };

    let get_user_by_email = match unified.get_users_by_email.clone() {
        Some(inner) => slot(move |email: String| {
            let inner = inner.clone();
            async move {
                let users = inner(email).await?;
                Ok(users.into_iter().find_map(User::into_passwordless))
            }
        }),
        None => None,
    };

    let get_user_by_phone_number = match unified.get_user_by_phone_number.clone() {
        Some(inner) => slot(move |phone: String| {
            let inner = inner.clone();
            async move {
                let user = inner(phone).await?;
                Ok(user.and_then(User::into_passwordless))
            }
        }),
        None => None,
    };

    pl::RecipeImplementation {
        create_code: unified.create_code.clone(),
        resend_code: unified.resend_code.clone(),
        consume_code,
        get_user_by_id,
        get_user_by_email,
        get_user_by_phone_number,
        update_user: unified.update_passwordless_user.clone(),
        revoke_all_codes: unified.revoke_all_codes.clone(),
    }
}

/// Derive a third-party-shaped Implementation Table from the unified one.
pub fn third_party_implementation(unified: &UnifiedImplementation) -> tp::RecipeImplementation {
    let sign_in_up = match unified.third_party_sign_in_up.clone() {
        Some(inner) => slot(move |input: tp::SignInUpInput| {
            let inner = inner.clone();
            async move {
                let output = inner(input).await?;
                let created_new_user = output.created_new_user;
                output
                    .user
                    .into_third_party()
                    .map(|user| tp::SignInUpOutput {
                        created_new_user,
                        user,
                    })
                    .ok_or_else(|| {
                        AuthKitError::Serialization(
                            "sign-in-up produced a user without a third-party identity"
                                .to_string(),
                        )
                    })
            }
        }),
        None => None,
    };

    let get_user_by_id = match unified.get_user_by_id.clone() {
        Some(inner) => slot(move |user_id: String| {
            let inner = inner.clone();
            async move {
                let user = inner(user_id).await?;
                Ok(user.and_then(User::into_third_party))
            }
        }),
        None => None,
    };

    let get_users_by_email = match unified.get_users_by_email.clone() {
        Some(inner) => slot(move |email: String| {
            let inner = inner.clone();
            async move {
                let users = inner(email).await?;
                Ok(users
                    .into_iter()
                    .filter_map(User::into_third_party)
                    .collect())
            }
        }),
        None => None,
    };

    let get_user_by_third_party_info = match unified.get_user_by_third_party_info.clone() {
        Some(inner) => slot(move |lookup: tp::ThirdPartyLookup| {
            let inner = inner.clone();
            async move {
                let user = inner(lookup).await?;
                Ok(user.and_then(User::into_third_party))
            }
        }),
        None => None,
    };

    tp::RecipeImplementation {
        sign_in_up,
        get_user_by_id,
        get_users_by_email,
        get_user_by_third_party_info,
    }
}

/// Derive the passwordless child's API Table from the unified one.
///
/// API responses are shape-uniform (status + JSON), so this is slot
/// propagation: a unified slot deleted by an override stays deleted here,
/// which is how "delete an endpoint" reaches the child that owns the route.
pub fn passwordless_api(unified: &UnifiedApi) -> PasswordlessApi {
    PasswordlessApi {
        create_code_post: unified.create_code_post.clone(),
        resend_code_post: unified.resend_code_post.clone(),
        consume_code_post: unified.consume_code_post.clone(),
        email_exists_get: unified.email_exists_get.clone(),
        phone_number_exists_get: unified.phone_number_exists_get.clone(),
    }
}

/// Derive the third-party child's API Table from the unified one.
pub fn third_party_api(unified: &UnifiedApi) -> ThirdPartyApi {
    ThirdPartyApi {
        sign_in_up_post: unified.sign_in_up_post.clone(),
        authorisation_url_get: unified.authorisation_url_get.clone(),
    }
}
