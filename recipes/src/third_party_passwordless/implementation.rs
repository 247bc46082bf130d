//! Unified Implementation Table for the composite recipe.
//!
//! The default is assembled from the children's default tables: passwordless
//! operations delegate to the passwordless table, third-party operations to
//! the third-party table, and results are widened into the unified user
//! shape (absent fields stay `None`). The host's functions hook transforms
//! this table; the children are then re-derived from the transformed table,
//! which is how overrides become visible transitively.

use super::User;
use crate::passwordless::ContactId;
use crate::passwordless::implementation as pl;
use crate::thirdparty::implementation as tp;
use authkit_core::table::{Slot, call, slot};
use serde::{Deserialize, Serialize};

pub use crate::passwordless::implementation::{
    CodeDetails, CreateCodeInput, ResendCodeInput, ResendCodeOutput, UpdateUserInput,
    UpdateUserOutput,
};
pub use crate::thirdparty::implementation::{SignInUpInput, ThirdPartyLookup};

/// Input to the unified `consume_code`, same wire shape as the child's.
pub type ConsumeCodeInput = pl::ConsumeCodeInput;

/// Outcome of the unified `consume_code`; the user is the unified shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all_fields = "camelCase")]
pub enum ConsumeCodeOutput {
    /// Code accepted.
    #[serde(rename = "OK")]
    Ok {
        /// Whether this consume created the user.
        created_new_user: bool,
        /// The signed-in user, widened.
        user: User,
    },
    /// Wrong typed code.
    #[serde(rename = "INCORRECT_USER_INPUT_CODE_ERROR")]
    IncorrectUserInputCode {
        /// Failed attempts so far.
        failed_code_input_attempt_count: u64,
        /// Attempt ceiling.
        maximum_code_input_attempt_count: u64,
    },
    /// The code expired.
    #[serde(rename = "EXPIRED_USER_INPUT_CODE_ERROR")]
    ExpiredUserInputCode {
        /// Failed attempts so far.
        failed_code_input_attempt_count: u64,
        /// Attempt ceiling.
        maximum_code_input_attempt_count: u64,
    },
    /// The device is gone.
    #[serde(rename = "RESTART_FLOW_ERROR")]
    RestartFlow,
}

impl ConsumeCodeOutput {
    /// Widen a child outcome into the unified shape.
    pub fn widen(output: pl::ConsumeCodeOutput) -> Self {
        match output {
            pl::ConsumeCodeOutput::Ok {
                created_new_user,
                user,
            } => Self::Ok {
                created_new_user,
                user: User::from_passwordless(user),
            },
            pl::ConsumeCodeOutput::IncorrectUserInputCode {
                failed_code_input_attempt_count,
                maximum_code_input_attempt_count,
            } => Self::IncorrectUserInputCode {
                failed_code_input_attempt_count,
                maximum_code_input_attempt_count,
            },
            pl::ConsumeCodeOutput::ExpiredUserInputCode {
                failed_code_input_attempt_count,
                maximum_code_input_attempt_count,
            } => Self::ExpiredUserInputCode {
                failed_code_input_attempt_count,
                maximum_code_input_attempt_count,
            },
            pl::ConsumeCodeOutput::RestartFlow => Self::RestartFlow,
        }
    }

    /// Narrow back to the child shape. `None` only for an `Ok` carrying a
    /// cross-kind user, which the unified default never produces.
    pub fn narrow(self) -> Option<pl::ConsumeCodeOutput> {
        Some(match self {
            Self::Ok {
                created_new_user,
                user,
            } => pl::ConsumeCodeOutput::Ok {
                created_new_user,
                user: user.into_passwordless()?,
            },
            Self::IncorrectUserInputCode {
                failed_code_input_attempt_count,
                maximum_code_input_attempt_count,
            } => pl::ConsumeCodeOutput::IncorrectUserInputCode {
                failed_code_input_attempt_count,
                maximum_code_input_attempt_count,
            },
            Self::ExpiredUserInputCode {
                failed_code_input_attempt_count,
                maximum_code_input_attempt_count,
            } => pl::ConsumeCodeOutput::ExpiredUserInputCode {
                failed_code_input_attempt_count,
                maximum_code_input_attempt_count,
            },
            Self::RestartFlow => pl::ConsumeCodeOutput::RestartFlow,
        })
    }
}

/// Outcome of the unified `third_party_sign_in_up`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInUpOutput {
    /// Whether this call created the user.
    pub created_new_user: bool,
    /// The signed-in user, widened.
    pub user: User,
}

/// The replaceable business operations of the composite recipe.
///
/// One table, unified user shapes throughout. Built once, transformed at
/// most once by the host's functions hook, then frozen; every child table is
/// derived from it afterwards.
#[derive(Clone)]
pub struct RecipeImplementation {
    /// Mint a passwordless login code.
    pub create_code: Slot<CreateCodeInput, CodeDetails>,
    /// Mint a replacement code for a device.
    pub resend_code: Slot<ResendCodeInput, ResendCodeOutput>,
    /// Consume a passwordless code.
    pub consume_code: Slot<ConsumeCodeInput, ConsumeCodeOutput>,
    /// Sign a provider identity in. Null when no provider is configured.
    pub third_party_sign_in_up: Slot<SignInUpInput, SignInUpOutput>,
    /// Unified lookup: passwordless first, third-party fallback.
    pub get_user_by_id: Slot<String, Option<User>>,
    /// Every user carrying this email, both kinds.
    pub get_users_by_email: Slot<String, Vec<User>>,
    /// Passwordless lookup by phone number.
    pub get_user_by_phone_number: Slot<String, Option<User>>,
    /// Third-party lookup by provider identity. Null when no provider is
    /// configured.
    pub get_user_by_third_party_info: Slot<ThirdPartyLookup, Option<User>>,
    /// Change a passwordless user's contact details.
    pub update_passwordless_user: Slot<UpdateUserInput, UpdateUserOutput>,
    /// Drop every outstanding code for a contact.
    pub revoke_all_codes: Slot<ContactId, ()>,
}

impl RecipeImplementation {
    /// Assemble the unified default from the children's default tables.
    pub fn new(
        passwordless: pl::RecipeImplementation,
        third_party: Option<tp::RecipeImplementation>,
    ) -> Self {
        let consume_inner = passwordless.consume_code.clone();
        let consume_code = slot(move |input: ConsumeCodeInput| {
            let inner = consume_inner.clone();
            async move {
                let output = call(&inner, "consume-code", input).await?;
                Ok(ConsumeCodeOutput::widen(output))
            }
        });

        let third_party_sign_in_up = match &third_party {
            Some(table) => {
                let inner = table.sign_in_up.clone();
                slot(move |input: SignInUpInput| {
                    let inner = inner.clone();
                    async move {
                        let output = call(&inner, "sign-in-up", input).await?;
                        Ok(SignInUpOutput {
                            created_new_user: output.created_new_user,
                            user: User::from_third_party(output.user),
                        })
                    }
                })
            }
            None => None,
        };

        let by_id_pl = passwordless.get_user_by_id.clone();
        let by_id_tp = third_party.as_ref().and_then(|t| t.get_user_by_id.clone());
        let get_user_by_id = slot(move |user_id: String| {
            let by_id_pl = by_id_pl.clone();
            let by_id_tp = by_id_tp.clone();
            async move {
                if let Some(user) = call(&by_id_pl, "get-user-by-id", user_id.clone()).await? {
                    return Ok(Some(User::from_passwordless(user)));
                }
                if let Some(inner) = by_id_tp {
                    if let Some(user) = inner(user_id).await? {
                        return Ok(Some(User::from_third_party(user)));
                    }
                }
                Ok(None)
            }
        });

        let by_email_pl = passwordless.get_user_by_email.clone();
        let by_email_tp = third_party
            .as_ref()
            .and_then(|t| t.get_users_by_email.clone());
        let get_users_by_email = slot(move |email: String| {
            let by_email_pl = by_email_pl.clone();
            let by_email_tp = by_email_tp.clone();
            async move {
                let mut users: Vec<User> = Vec::new();
                if let Some(user) = call(&by_email_pl, "get-user-by-email", email.clone()).await? {
                    users.push(User::from_passwordless(user));
                }
                if let Some(inner) = by_email_tp {
                    users.extend(inner(email).await?.into_iter().map(User::from_third_party));
                }
                Ok(users)
            }
        });

        let by_phone_inner = passwordless.get_user_by_phone_number.clone();
        let get_user_by_phone_number = slot(move |phone: String| {
            let inner = by_phone_inner.clone();
            async move {
                let user = call(&inner, "get-user-by-phone-number", phone).await?;
                Ok(user.map(User::from_passwordless))
            }
        });

        let get_user_by_third_party_info = match third_party
            .as_ref()
            .and_then(|t| t.get_user_by_third_party_info.clone())
        {
            Some(inner) => slot(move |lookup: ThirdPartyLookup| {
                let inner = inner.clone();
                async move {
                    let user = inner(lookup).await?;
                    Ok(user.map(User::from_third_party))
                }
            }),
            None => None,
        };

        Self {
            create_code: passwordless.create_code,
            resend_code: passwordless.resend_code,
            consume_code,
            third_party_sign_in_up,
            get_user_by_id,
            get_users_by_email,
            get_user_by_phone_number,
            get_user_by_third_party_info,
            update_passwordless_user: passwordless.update_user,
            revoke_all_codes: passwordless.revoke_all_codes,
        }
    }
}
