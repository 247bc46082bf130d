//! In-memory stand-in for the remote core.
//!
//! Serves the same wire protocol the default Implementation Tables speak,
//! backed by plain maps behind a mutex. Passwordless and third-party users
//! live in separate stores: a lookup through the wrong recipe misses, same
//! as against the real core.

use async_trait::async_trait;
use authkit_core::client::CoreClient;
use authkit_core::http::Method;
use authkit_core::{AuthKitError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand::Rng;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Validity window the mock stamps on every code.
pub const CODE_LIFETIME_MS: u64 = 900_000;
/// Typed-code attempt ceiling before the device is destroyed.
pub const MAX_CODE_INPUT_ATTEMPTS: u64 = 5;

#[derive(Debug, Clone)]
struct Device {
    device_id: String,
    pre_auth_session_id: String,
    email: Option<String>,
    phone_number: Option<String>,
    code_id: String,
    user_input_code: String,
    link_code: String,
    time_created: u64,
    failed_attempts: u64,
}

#[derive(Debug, Clone)]
struct PasswordlessRecord {
    user_id: String,
    email: Option<String>,
    phone_number: Option<String>,
    time_joined: u64,
}

#[derive(Debug, Clone)]
struct ThirdPartyRecord {
    user_id: String,
    email: String,
    third_party_id: String,
    third_party_user_id: String,
    time_joined: u64,
}

#[derive(Debug, Default)]
struct State {
    devices: Vec<Device>,
    passwordless_users: Vec<PasswordlessRecord>,
    third_party_users: Vec<ThirdPartyRecord>,
    // token -> (user id, email)
    verification_tokens: HashMap<String, (String, String)>,
    verified: HashSet<(String, String)>,
    clock_offset_ms: u64,
}

/// In-memory [`CoreClient`].
#[derive(Debug, Default)]
pub struct MockCore {
    state: Mutex<State>,
}

fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}

fn query_map<'a>(query: &'a [(&'a str, String)]) -> HashMap<&'a str, &'a str> {
    query.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

fn passwordless_user_json(user: &PasswordlessRecord) -> Value {
    let mut map = Map::new();
    map.insert("id".to_string(), json!(user.user_id));
    if let Some(email) = &user.email {
        map.insert("email".to_string(), json!(email));
    }
    if let Some(phone) = &user.phone_number {
        map.insert("phoneNumber".to_string(), json!(phone));
    }
    map.insert("timeJoined".to_string(), json!(user.time_joined));
    Value::Object(map)
}

fn third_party_user_json(user: &ThirdPartyRecord) -> Value {
    json!({
        "id": user.user_id,
        "email": user.email,
        "timeJoined": user.time_joined,
        "thirdParty": {
            "id": user.third_party_id,
            "userId": user.third_party_user_id,
        }
    })
}

fn code_json(device: &Device) -> Value {
    let mut map = Map::new();
    map.insert("status".to_string(), json!("OK"));
    map.insert("preAuthSessionId".to_string(), json!(device.pre_auth_session_id));
    map.insert("codeId".to_string(), json!(device.code_id));
    map.insert("deviceId".to_string(), json!(device.device_id));
    map.insert("userInputCode".to_string(), json!(device.user_input_code));
    map.insert("linkCode".to_string(), json!(device.link_code));
    map.insert("timeCreated".to_string(), json!(device.time_created));
    map.insert("codeLifetime".to_string(), json!(CODE_LIFETIME_MS));
    if let Some(email) = &device.email {
        map.insert("email".to_string(), json!(email));
    }
    if let Some(phone) = &device.phone_number {
        map.insert("phoneNumber".to_string(), json!(phone));
    }
    Value::Object(map)
}

fn fresh_user_input_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

fn fresh_link_code() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl MockCore {
    /// Fresh, empty core.
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(state: &State) -> u64 {
        let wall = Utc::now().timestamp_millis().max(0) as u64;
        wall + state.clock_offset_ms
    }

    /// Push the mock clock forward, expiring codes without sleeping.
    pub fn advance_clock(&self, millis: u64) {
        self.lock().clock_offset_ms += millis;
    }

    /// The active (code, link code) pair for a device, if any.
    pub fn active_code(&self, device_id: &str) -> Option<(String, String)> {
        self.lock()
            .devices
            .iter()
            .find(|d| d.device_id == device_id)
            .map(|d| (d.user_input_code.clone(), d.link_code.clone()))
    }

    /// Number of live login devices.
    pub fn device_count(&self) -> usize {
        self.lock().devices.len()
    }

    /// Seed a third-party user directly, as if a prior sign-in created it.
    pub fn seed_third_party_user(
        &self,
        third_party_id: &str,
        third_party_user_id: &str,
        email: &str,
    ) -> String {
        let mut state = self.lock();
        let now = Self::now(&state);
        let user_id = Uuid::new_v4().to_string();
        state.third_party_users.push(ThirdPartyRecord {
            user_id: user_id.clone(),
            email: email.to_string(),
            third_party_id: third_party_id.to_string(),
            third_party_user_id: third_party_user_id.to_string(),
            time_joined: now,
        });
        user_id
    }

    /// Whether a (user id, email) pair is marked verified.
    pub fn pair_verified(&self, user_id: &str, email: &str) -> bool {
        self.lock()
            .verified
            .contains(&(user_id.to_string(), email.to_string()))
    }

    fn create_or_resend_code(&self, body: &Value) -> Result<Value> {
        let mut state = self.lock();
        let now = Self::now(&state);
        let user_input_code = str_field(body, "userInputCode")
            .map(str::to_string)
            .unwrap_or_else(fresh_user_input_code);

        if let Some(device_id) = str_field(body, "deviceId") {
            let session = str_field(body, "preAuthSessionId").unwrap_or_default();
            let Some(device) = state
                .devices
                .iter_mut()
                .find(|d| d.device_id == device_id && d.pre_auth_session_id == session)
            else {
                return Ok(json!({"status": "RESTART_FLOW_ERROR"}));
            };
            device.code_id = Uuid::new_v4().to_string();
            device.user_input_code = user_input_code;
            device.link_code = fresh_link_code();
            device.time_created = now;
            return Ok(code_json(device));
        }

        let email = str_field(body, "email").map(str::to_string);
        let phone_number = str_field(body, "phoneNumber").map(str::to_string);
        if email.is_none() && phone_number.is_none() {
            return Err(AuthKitError::CoreRequest {
                status: 400,
                message: "create code needs an email or a phone number".to_string(),
            });
        }
        let device = Device {
            device_id: Uuid::new_v4().to_string(),
            pre_auth_session_id: Uuid::new_v4().to_string(),
            email,
            phone_number,
            code_id: Uuid::new_v4().to_string(),
            user_input_code,
            link_code: fresh_link_code(),
            time_created: now,
            failed_attempts: 0,
        };
        let payload = code_json(&device);
        state.devices.push(device);
        Ok(payload)
    }

    fn consume_code(&self, body: &Value) -> Result<Value> {
        let mut state = self.lock();
        let now = Self::now(&state);
        let session = str_field(body, "preAuthSessionId").unwrap_or_default().to_string();
        let Some(index) = state
            .devices
            .iter()
            .position(|d| d.pre_auth_session_id == session)
        else {
            return Ok(json!({"status": "RESTART_FLOW_ERROR"}));
        };

        let expired = {
            let device = &state.devices[index];
            now.saturating_sub(device.time_created) > CODE_LIFETIME_MS
        };

        if let Some(link_code) = str_field(body, "linkCode") {
            let matches = state.devices[index].link_code == link_code;
            if !matches || expired {
                return Ok(json!({"status": "RESTART_FLOW_ERROR"}));
            }
        } else {
            let device_id = str_field(body, "deviceId").unwrap_or_default();
            let typed = str_field(body, "userInputCode").unwrap_or_default();
            if state.devices[index].device_id != device_id {
                return Ok(json!({"status": "RESTART_FLOW_ERROR"}));
            }
            let correct = state.devices[index].user_input_code == typed;
            if expired || !correct {
                let device = &mut state.devices[index];
                device.failed_attempts += 1;
                let failed = device.failed_attempts;
                let status = if expired {
                    "EXPIRED_USER_INPUT_CODE_ERROR"
                } else {
                    "INCORRECT_USER_INPUT_CODE_ERROR"
                };
                if failed >= MAX_CODE_INPUT_ATTEMPTS {
                    state.devices.remove(index);
                }
                return Ok(json!({
                    "status": status,
                    "failedCodeInputAttemptCount": failed,
                    "maximumCodeInputAttemptCount": MAX_CODE_INPUT_ATTEMPTS,
                }));
            }
        }

        let device = state.devices.remove(index);
        // One successful consume burns every other device on the same contact.
        state.devices.retain(|d| {
            !(d.email == device.email && d.phone_number == device.phone_number)
        });

        let existing = state.passwordless_users.iter().find(|u| match (&device.email, &device.phone_number) {
            (Some(email), _) => u.email.as_deref() == Some(email),
            (None, Some(phone)) => u.phone_number.as_deref() == Some(phone),
            (None, None) => false,
        });
        let (user, created_new_user) = match existing {
            Some(user) => (user.clone(), false),
            None => {
                let user = PasswordlessRecord {
                    user_id: Uuid::new_v4().to_string(),
                    email: device.email.clone(),
                    phone_number: device.phone_number.clone(),
                    time_joined: now,
                };
                state.passwordless_users.push(user.clone());
                (user, true)
            }
        };
        Ok(json!({
            "status": "OK",
            "createdNewUser": created_new_user,
            "user": passwordless_user_json(&user),
        }))
    }

    fn passwordless_lookup(&self, query: &HashMap<&str, &str>) -> Value {
        let state = self.lock();
        let found = state.passwordless_users.iter().find(|u| {
            if let Some(user_id) = query.get("userId") {
                u.user_id == *user_id
            } else if let Some(email) = query.get("email") {
                u.email.as_deref() == Some(*email)
            } else if let Some(phone) = query.get("phoneNumber") {
                u.phone_number.as_deref() == Some(*phone)
            } else {
                false
            }
        });
        match found {
            Some(user) => json!({"status": "OK", "user": passwordless_user_json(user)}),
            None => json!({"status": "UNKNOWN_USER_ID_ERROR"}),
        }
    }

    fn update_passwordless_user(&self, body: &Value) -> Value {
        let mut state = self.lock();
        let Some(user_id) = str_field(body, "userId").map(str::to_string) else {
            return json!({"status": "UNKNOWN_USER_ID_ERROR"});
        };
        if !state.passwordless_users.iter().any(|u| u.user_id == user_id) {
            return json!({"status": "UNKNOWN_USER_ID_ERROR"});
        }
        let email = str_field(body, "email").map(str::to_string);
        let phone = str_field(body, "phoneNumber").map(str::to_string);
        if let Some(email) = &email {
            if state
                .passwordless_users
                .iter()
                .any(|u| u.user_id != user_id && u.email.as_deref() == Some(email))
            {
                return json!({"status": "EMAIL_ALREADY_EXISTS_ERROR"});
            }
        }
        if let Some(phone) = &phone {
            if state
                .passwordless_users
                .iter()
                .any(|u| u.user_id != user_id && u.phone_number.as_deref() == Some(phone))
            {
                return json!({"status": "PHONE_NUMBER_ALREADY_EXISTS_ERROR"});
            }
        }
        if let Some(user) = state.passwordless_users.iter_mut().find(|u| u.user_id == user_id) {
            if email.is_some() {
                user.email = email;
            }
            if phone.is_some() {
                user.phone_number = phone;
            }
        }
        json!({"status": "OK"})
    }

    fn revoke_all_codes(&self, body: &Value) -> Value {
        let mut state = self.lock();
        let email = str_field(body, "email");
        let phone = str_field(body, "phoneNumber");
        state.devices.retain(|d| match (email, phone) {
            (Some(email), _) => d.email.as_deref() != Some(email),
            (None, Some(phone)) => d.phone_number.as_deref() != Some(phone),
            (None, None) => true,
        });
        json!({"status": "OK"})
    }

    fn third_party_sign_in_up(&self, body: &Value) -> Result<Value> {
        let mut state = self.lock();
        let now = Self::now(&state);
        let third_party_id = str_field(body, "thirdPartyId").unwrap_or_default().to_string();
        let third_party_user_id = str_field(body, "thirdPartyUserId")
            .unwrap_or_default()
            .to_string();
        let email = body
            .get("email")
            .and_then(|e| e.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| AuthKitError::CoreRequest {
                status: 400,
                message: "sign in up needs an email".to_string(),
            })?
            .to_string();

        let existing = state.third_party_users.iter_mut().find(|u| {
            u.third_party_id == third_party_id && u.third_party_user_id == third_party_user_id
        });
        let (user, created_new_user) = match existing {
            Some(user) => {
                user.email = email;
                (user.clone(), false)
            }
            None => {
                let user = ThirdPartyRecord {
                    user_id: Uuid::new_v4().to_string(),
                    email,
                    third_party_id,
                    third_party_user_id,
                    time_joined: now,
                };
                state.third_party_users.push(user.clone());
                (user, true)
            }
        };
        Ok(json!({
            "status": "OK",
            "createdNewUser": created_new_user,
            "user": third_party_user_json(&user),
        }))
    }

    fn third_party_lookup(&self, query: &HashMap<&str, &str>) -> Value {
        let state = self.lock();
        let found = state.third_party_users.iter().find(|u| {
            if let Some(user_id) = query.get("userId") {
                u.user_id == *user_id
            } else if let (Some(tp_id), Some(tp_user_id)) =
                (query.get("thirdPartyId"), query.get("thirdPartyUserId"))
            {
                u.third_party_id == *tp_id && u.third_party_user_id == *tp_user_id
            } else {
                false
            }
        });
        match found {
            Some(user) => json!({"status": "OK", "user": third_party_user_json(user)}),
            None => json!({"status": "UNKNOWN_USER_ID_ERROR"}),
        }
    }

    fn third_party_by_email(&self, query: &HashMap<&str, &str>) -> Value {
        let state = self.lock();
        let email = query.get("email").copied().unwrap_or_default();
        let users: Vec<Value> = state
            .third_party_users
            .iter()
            .filter(|u| u.email == email)
            .map(third_party_user_json)
            .collect();
        json!({"status": "OK", "users": users})
    }

    fn create_verification_token(&self, body: &Value) -> Value {
        let mut state = self.lock();
        let user_id = str_field(body, "userId").unwrap_or_default().to_string();
        let email = str_field(body, "email").unwrap_or_default().to_string();
        if state.verified.contains(&(user_id.clone(), email.clone())) {
            return json!({"status": "EMAIL_ALREADY_VERIFIED_ERROR"});
        }
        let token = fresh_link_code();
        state
            .verification_tokens
            .insert(token.clone(), (user_id, email));
        json!({"status": "OK", "token": token})
    }

    fn verify_email(&self, body: &Value) -> Value {
        let mut state = self.lock();
        let token = str_field(body, "token").unwrap_or_default();
        match state.verification_tokens.remove(token) {
            Some((user_id, email)) => {
                state.verified.insert((user_id.clone(), email.clone()));
                json!({"status": "OK", "user": {"userId": user_id, "email": email}})
            }
            None => json!({"status": "EMAIL_VERIFICATION_INVALID_TOKEN_ERROR"}),
        }
    }

    fn is_verified(&self, query: &HashMap<&str, &str>) -> Value {
        let state = self.lock();
        let user_id = query.get("userId").copied().unwrap_or_default();
        let email = query.get("email").copied().unwrap_or_default();
        let verified = state
            .verified
            .contains(&(user_id.to_string(), email.to_string()));
        json!({"status": "OK", "isVerified": verified})
    }

    fn revoke_verification_tokens(&self, body: &Value) -> Value {
        let mut state = self.lock();
        let user_id = str_field(body, "userId").unwrap_or_default();
        let email = str_field(body, "email").unwrap_or_default();
        state
            .verification_tokens
            .retain(|_, (uid, mail)| !(uid == user_id && mail == email));
        json!({"status": "OK"})
    }

    fn unverify_email(&self, body: &Value) -> Value {
        let mut state = self.lock();
        let user_id = str_field(body, "userId").unwrap_or_default().to_string();
        let email = str_field(body, "email").unwrap_or_default().to_string();
        state.verified.remove(&(user_id, email));
        json!({"status": "OK"})
    }
}

#[async_trait]
impl CoreClient for MockCore {
    async fn send(
        &self,
        recipe_id: &'static str,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Value,
    ) -> Result<Value> {
        let query = query_map(query);
        match (recipe_id, method, path) {
            ("passwordless", Method::Post, "/signinup/code") => {
                self.create_or_resend_code(&body)
            }
            ("passwordless", Method::Post, "/signinup/code/consume") => self.consume_code(&body),
            ("passwordless", Method::Post, "/signinup/codes/remove") => {
                Ok(self.revoke_all_codes(&body))
            }
            ("passwordless", Method::Get, "/user") => Ok(self.passwordless_lookup(&query)),
            ("passwordless", Method::Put, "/user") => Ok(self.update_passwordless_user(&body)),
            ("thirdparty", Method::Post, "/signinup") => self.third_party_sign_in_up(&body),
            ("thirdparty", Method::Get, "/user") => Ok(self.third_party_lookup(&query)),
            ("thirdparty", Method::Get, "/users/by-email") => {
                Ok(self.third_party_by_email(&query))
            }
            ("emailverification", Method::Post, "/user/email/verify/token") => {
                Ok(self.create_verification_token(&body))
            }
            ("emailverification", Method::Post, "/user/email/verify") => {
                Ok(self.verify_email(&body))
            }
            ("emailverification", Method::Get, "/user/email/verify") => {
                Ok(self.is_verified(&query))
            }
            ("emailverification", Method::Post, "/user/email/verify/token/remove") => {
                Ok(self.revoke_verification_tokens(&body))
            }
            ("emailverification", Method::Post, "/user/email/verify/remove") => {
                Ok(self.unverify_email(&body))
            }
            _ => Err(AuthKitError::CoreRequest {
                status: 404,
                message: format!("no mock route for {recipe_id} {method} {path}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_code_body(email: &str) -> Value {
        json!({"email": email})
    }

    #[tokio::test]
    async fn consume_with_correct_code_creates_user_once() {
        let core = MockCore::new();
        let minted = core
            .send(
                "passwordless",
                Method::Post,
                "/signinup/code",
                &[],
                create_code_body("a@example.com"),
            )
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        let consume = json!({
            "preAuthSessionId": minted["preAuthSessionId"],
            "deviceId": minted["deviceId"],
            "userInputCode": minted["userInputCode"],
        });
        let first = core
            .send(
                "passwordless",
                Method::Post,
                "/signinup/code/consume",
                &[],
                consume.clone(),
            )
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(first["status"], "OK");
        assert_eq!(first["createdNewUser"], true);
        assert_eq!(core.device_count(), 0);

        // The session died with the consume.
        let again = core
            .send("passwordless", Method::Post, "/signinup/code/consume", &[], consume)
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(again["status"], "RESTART_FLOW_ERROR");
    }

    #[tokio::test]
    async fn wrong_code_five_times_destroys_the_device() {
        let core = MockCore::new();
        let minted = core
            .send(
                "passwordless",
                Method::Post,
                "/signinup/code",
                &[],
                create_code_body("b@example.com"),
            )
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        for attempt in 1..=MAX_CODE_INPUT_ATTEMPTS {
            let outcome = core
                .send(
                    "passwordless",
                    Method::Post,
                    "/signinup/code/consume",
                    &[],
                    json!({
                        "preAuthSessionId": minted["preAuthSessionId"],
                        "deviceId": minted["deviceId"],
                        "userInputCode": "000000x",
                    }),
                )
                .await
                .unwrap_or_else(|err| panic!("{err}"));
            assert_eq!(outcome["status"], "INCORRECT_USER_INPUT_CODE_ERROR");
            assert_eq!(outcome["failedCodeInputAttemptCount"], attempt);
        }
        assert_eq!(core.device_count(), 0);
    }

    #[tokio::test]
    async fn expired_code_reports_expiry() {
        let core = MockCore::new();
        let minted = core
            .send(
                "passwordless",
                Method::Post,
                "/signinup/code",
                &[],
                create_code_body("c@example.com"),
            )
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        core.advance_clock(CODE_LIFETIME_MS + 1);
        let outcome = core
            .send(
                "passwordless",
                Method::Post,
                "/signinup/code/consume",
                &[],
                json!({
                    "preAuthSessionId": minted["preAuthSessionId"],
                    "deviceId": minted["deviceId"],
                    "userInputCode": minted["userInputCode"],
                }),
            )
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(outcome["status"], "EXPIRED_USER_INPUT_CODE_ERROR");
    }

    #[tokio::test]
    async fn verification_tokens_are_single_use() {
        let core = MockCore::new();
        let minted = core
            .send(
                "emailverification",
                Method::Post,
                "/user/email/verify/token",
                &[],
                json!({"userId": "u1", "email": "d@example.com"}),
            )
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        let token = minted["token"].clone();
        let verified = core
            .send(
                "emailverification",
                Method::Post,
                "/user/email/verify",
                &[],
                json!({"method": "token", "token": token}),
            )
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(verified["status"], "OK");
        assert!(core.pair_verified("u1", "d@example.com"));

        let replay = core
            .send(
                "emailverification",
                Method::Post,
                "/user/email/verify",
                &[],
                json!({"method": "token", "token": token}),
            )
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(replay["status"], "EMAIL_VERIFICATION_INVALID_TOKEN_ERROR");
    }
}
