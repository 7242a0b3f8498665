use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{next_record_id, Role, Session, StoredUser};
use crate::store;
use log::info;
use rusqlite::Connection;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

const SESSION_KEY: &str = "user";
const USERS_KEY: &str = "users";

struct DemoAccount {
    id: &'static str,
    name: &'static str,
    email: &'static str,
    password: &'static str,
    role: Role,
}

// Fixed demo logins. These never appear in the stored users list and
// cannot be claimed through auth.signup.
const DEMO_ACCOUNTS: [DemoAccount; 2] = [
    DemoAccount {
        id: "1",
        name: "Admin User",
        email: "admin@school.com",
        password: "password",
        role: Role::Admin,
    },
    DemoAccount {
        id: "2",
        name: "Teacher User",
        email: "teacher@school.com",
        password: "password",
        role: Role::Teacher,
    },
];

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
            details: None,
        })
}

fn invalid_credentials() -> HandlerErr {
    HandlerErr {
        code: "invalid_credentials",
        message: "email or password is incorrect".to_string(),
        details: None,
    }
}

fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn load_users(conn: &Connection) -> Vec<StoredUser> {
    store::get_global(conn, USERS_KEY, Vec::new())
}

/// Reloads the persisted session, if any. Malformed stored values count
/// as logged out.
pub fn restore_session(conn: &Connection) -> Option<Session> {
    store::get_global::<Option<Session>>(conn, SESSION_KEY, None)
}

fn login(conn: &Connection, params: &serde_json::Value) -> Result<Session, HandlerErr> {
    let email = get_required_str(params, "email")?.trim().to_string();
    let password = get_required_str(params, "password")?;

    for account in &DEMO_ACCOUNTS {
        if account.email.eq_ignore_ascii_case(&email) {
            if account.password == password {
                return Ok(Session {
                    id: account.id.to_string(),
                    name: account.name.to_string(),
                    email: account.email.to_string(),
                    role: account.role,
                });
            }
            return Err(invalid_credentials());
        }
    }

    let users = load_users(conn);
    let Some(user) = users.iter().find(|u| u.email.eq_ignore_ascii_case(&email)) else {
        return Err(invalid_credentials());
    };
    if password_digest(&user.salt, &password) != user.password_sha256 {
        return Err(invalid_credentials());
    }
    Ok(Session {
        id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
    })
}

fn signup(conn: &Connection, params: &serde_json::Value) -> Result<Session, HandlerErr> {
    let name = get_required_str(params, "name")?.trim().to_string();
    let email = get_required_str(params, "email")?.trim().to_string();
    let password = get_required_str(params, "password")?;

    if name.len() < 2 {
        return Err(HandlerErr {
            code: "bad_params",
            message: "name must be at least 2 characters".to_string(),
            details: None,
        });
    }
    if !email.contains('@') {
        return Err(HandlerErr {
            code: "bad_params",
            message: "email must be a valid address".to_string(),
            details: None,
        });
    }
    if password.len() < 6 {
        return Err(HandlerErr {
            code: "bad_params",
            message: "password must be at least 6 characters".to_string(),
            details: None,
        });
    }

    let mut users = load_users(conn);
    let taken = DEMO_ACCOUNTS
        .iter()
        .any(|a| a.email.eq_ignore_ascii_case(&email))
        || users.iter().any(|u| u.email.eq_ignore_ascii_case(&email));
    if taken {
        return Err(HandlerErr {
            code: "email_taken",
            message: "email is already registered".to_string(),
            details: None,
        });
    }

    let id = next_record_id(users.iter().map(|u| u.id.as_str()));
    let salt = Uuid::new_v4().simple().to_string();
    let password_sha256 = password_digest(&salt, &password);
    users.push(StoredUser {
        id: id.clone(),
        name: name.clone(),
        email: email.clone(),
        role: Role::Teacher,
        salt,
        password_sha256,
    });
    store::set_global(conn, USERS_KEY, &users).map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: None,
    })?;

    Ok(Session {
        id,
        name,
        email,
        role: Role::Teacher,
    })
}

fn handle_auth_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match login(conn, &req.params) {
        Ok(session) => {
            if let Err(e) = store::set_global(conn, SESSION_KEY, &session) {
                return err(&req.id, "db_update_failed", e.to_string(), None);
            }
            info!("login ok for {} ({})", session.email, session.role.as_str());
            state.session = Some(session.clone());
            ok(&req.id, json!({ "session": session }))
        }
        Err(error) => error.response(&req.id),
    }
}

fn handle_auth_signup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match signup(conn, &req.params) {
        Ok(session) => {
            if let Err(e) = store::set_global(conn, SESSION_KEY, &session) {
                return err(&req.id, "db_update_failed", e.to_string(), None);
            }
            info!("signed up {} as user {}", session.email, session.id);
            state.session = Some(session.clone());
            ok(&req.id, json!({ "session": session }))
        }
        Err(error) => error.response(&req.id),
    }
}

fn handle_auth_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = store::remove_global(conn, SESSION_KEY) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }
    if let Some(session) = state.session.take() {
        info!("logged out {}", session.email);
    }
    ok(&req.id, json!({ "ok": true }))
}

fn handle_auth_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.session.as_ref() {
        Some(session) => ok(&req.id, json!({ "session": session })),
        None => ok(&req.id, json!({ "session": null })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_auth_login(state, req)),
        "auth.signup" => Some(handle_auth_signup(state, req)),
        "auth.logout" => Some(handle_auth_logout(state, req)),
        "auth.session" => Some(handle_auth_session(state, req)),
        _ => None,
    }
}
