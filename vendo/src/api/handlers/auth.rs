use axum::{Json, extract::State, http::StatusCode};
use sha2::{Digest, Sha256};

use crate::{
    AppState,
    api::models::{
        auth::{
            AuthResponse, AuthSuccessResponse, ChangePasswordRequest, LoginInfo, LoginRequest, LoginResponse,
            LogoutResponse, PasswordResetConfirmRequest, PasswordResetRequest, PasswordResetResponse, RegisterRequest,
            RegisterResponse, RegistrationInfo,
        },
        users::{CurrentUser, Role, UserResponse},
    },
    auth::{password, session},
    crypto,
    db::{
        handlers::{PasswordResetTokens, Referrals, Repository, Users},
        models::{
            referrals::ReferralCreateDBRequest,
            users::{UserCreateDBRequest, UserUpdateDBRequest},
        },
    },
    email::EmailService,
    errors::Error,
};

/// Get registration information
#[utoipa::path(
    get,
    path = "/authentication/register",
    tag = "authentication",
    responses(
        (status = 200, description = "Registration info", body = RegistrationInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_registration_info(State(state): State<AppState>) -> Result<Json<RegistrationInfo>, Error> {
    let enabled = state.config.auth.native.enabled && state.config.auth.native.allow_registration;
    Ok(Json(RegistrationInfo {
        enabled,
        message: if enabled {
            "Registration is enabled".to_string()
        } else {
            "Registration is disabled".to_string()
        },
    }))
}

/// Register a new reseller account
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "User already exists"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    if !state.config.auth.native.allow_registration {
        return Err(Error::BadRequest {
            message: "User registration is disabled".to_string(),
        });
    }

    validate_password(&request.password, &state)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let mut user_repo = Users::new(&mut tx);
    if user_repo.get_user_by_email(&request.email).await?.is_some() {
        return Err(Error::Conflict {
            message: "An account with this email address already exists".to_string(),
        });
    }

    // Resolve the referrer before the new user row exists
    let referrer = match &request.referral_code {
        Some(code) if state.config.referrals.enabled => {
            Some(user_repo.get_by_referral_code(code).await?.ok_or_else(|| Error::BadRequest {
                message: "Unknown referral code".to_string(),
            })?)
        }
        Some(_) => None, // Referral program disabled, ignore the code
        None => None,
    };

    // Hash the password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || password::hash_string(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })??;

    let own_referral_code = state.config.referrals.enabled.then(crypto::generate_referral_code);

    let create_request = UserCreateDBRequest {
        username: request.username,
        email: request.email,
        display_name: request.display_name,
        business_name: request.business_name,
        phone: request.phone,
        is_admin: false,
        role: Role::Reseller,
        auth_source: "native".to_string(),
        password_hash: Some(password_hash),
        referral_code: own_referral_code,
        referred_by: referrer.as_ref().map(|u| u.id),
    };

    let created_user = user_repo.create(&create_request).await?;

    if let Some(referrer) = &referrer {
        let mut referral_repo = Referrals::new(&mut tx);
        referral_repo
            .create(&ReferralCreateDBRequest {
                referrer_id: referrer.id,
                referee_id: created_user.id,
            })
            .await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let current_user = CurrentUser::from(created_user.clone());
    let user_response = UserResponse::from(created_user);

    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(RegisterResponse {
        auth_response: AuthResponse {
            user: user_response,
            message: "Registration successful".to_string(),
        },
        cookie,
    })
}

/// Get login information
#[utoipa::path(
    get,
    path = "/authentication/login",
    tag = "authentication",
    responses(
        (status = 200, description = "Login info", body = LoginInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_login_info(State(state): State<AppState>) -> Result<Json<LoginInfo>, Error> {
    Ok(Json(LoginInfo {
        enabled: state.config.auth.native.enabled,
        message: if state.config.auth.native.enabled {
            "Native login is enabled".to_string()
        } else {
            "Native login is disabled".to_string()
        },
    }))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo
        .get_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let password_hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;

    // Verify password on a blocking thread to avoid blocking async runtime
    let password = request.password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(invalid_credentials());
    }

    let current_user = CurrentUser::from(user.clone());
    let user_response = UserResponse::from(user);

    let token = session::create_session_token(&current_user, &state.config)?;
    let cookie = create_session_cookie(&token, &state.config);

    Ok(LoginResponse {
        auth_response: AuthResponse {
            user: user_response,
            message: "Login successful".to_string(),
        },
        cookie,
    })
}

/// Logout (clear session)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = AuthSuccessResponse),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    // Expired cookie clears the session
    let session_config = &state.config.auth.native.session;
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age=0",
        session_config.cookie_name, session_config.cookie_same_site
    );
    if session_config.cookie_secure {
        cookie.push_str("; Secure");
    }

    Ok(LogoutResponse {
        auth_response: AuthSuccessResponse {
            message: "Logout successful".to_string(),
        },
        cookie,
    })
}

/// Request password reset (send email)
#[utoipa::path(
    post,
    path = "/authentication/password-resets",
    request_body = PasswordResetRequest,
    tag = "authentication",
    responses(
        (status = 202, description = "Accepted; an email is sent if the account exists", body = PasswordResetResponse),
        (status = 400, description = "Invalid request"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<(StatusCode, Json<PasswordResetResponse>), Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    // Always answer the same way so the endpoint can't be used to enumerate
    // accounts; only native-auth users actually get an email.
    let user = Users::new(&mut tx).get_user_by_email(&request.email).await?;

    if let Some(user) = user {
        if user.password_hash.is_some() {
            let raw_token = crypto::generate_reset_token();
            let token_hash = hash_reset_token(&raw_token);
            let expires_at = chrono::Utc::now() + state.config.auth.native.password_reset_token_duration;

            let mut token_repo = PasswordResetTokens::new(&mut tx);
            token_repo.invalidate_for_user(user.id).await?;
            token_repo
                .create(&crate::db::models::password_reset_tokens::PasswordResetTokenCreateDBRequest {
                    user_id: user.id,
                    token_hash,
                    expires_at,
                })
                .await?;

            // Delivery is best effort; surfacing a mail failure here would
            // turn the status code into an account-existence oracle.
            let sent = match EmailService::new(&state.config) {
                Ok(service) => {
                    service
                        .send_password_reset_email(&user.email, user.display_name.as_deref(), &raw_token)
                        .await
                }
                Err(error) => Err(error),
            };
            if let Err(error) = sent {
                tracing::warn!(%error, user_id = %user.id, "failed to send password reset email");
            }
        }
    }
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PasswordResetResponse {
            message: "If an account with that email exists, a password reset link has been sent.".to_string(),
        }),
    ))
}

/// Confirm password reset with token
#[utoipa::path(
    post,
    path = "/authentication/password-resets/confirm",
    request_body = PasswordResetConfirmRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Password reset successful", body = PasswordResetResponse),
        (status = 400, description = "Invalid or expired token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetConfirmRequest>,
) -> Result<Json<PasswordResetResponse>, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    validate_password(&request.new_password, &state)?;

    let new_password_hash = tokio::task::spawn_blocking({
        let password = request.new_password.clone();
        move || password::hash_string(&password)
    })
    .await
    .map_err(|e| Error::Internal {
        operation: format!("spawn password hashing task: {e}"),
    })??;

    let token_hash = hash_reset_token(&request.token);

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let token = {
        let mut token_repo = PasswordResetTokens::new(&mut tx);
        let token = token_repo
            .get_by_hash(&token_hash)
            .await?
            .filter(|t| t.is_usable(chrono::Utc::now()))
            .ok_or_else(|| Error::BadRequest {
                message: "Invalid or expired reset token".to_string(),
            })?;
        // Consume it atomically so two concurrent confirms cannot both win
        token_repo.mark_used(token.id).await?.ok_or_else(|| Error::BadRequest {
            message: "Invalid or expired reset token".to_string(),
        })?
    };

    {
        let mut user_repo = Users::new(&mut tx);
        user_repo
            .update(
                token.user_id,
                &UserUpdateDBRequest {
                    password_hash: Some(new_password_hash),
                    ..Default::default()
                },
            )
            .await?;
    }

    {
        // Invalidate all outstanding tokens for this user, including this one
        let mut token_repo = PasswordResetTokens::new(&mut tx);
        token_repo.invalidate_for_user(token.user_id).await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(PasswordResetResponse {
        message: "Password has been reset successfully".to_string(),
    }))
}

/// Change password for authenticated user
#[utoipa::path(
    post,
    path = "/authentication/password-change",
    request_body = ChangePasswordRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Password changed successfully", body = AuthSuccessResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Current password is incorrect"),
    ),
    security(
        ("session_token" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<AuthSuccessResponse>, Error> {
    if !state.config.auth.native.enabled {
        return Err(Error::BadRequest {
            message: "Native authentication is disabled".to_string(),
        });
    }

    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut pool_conn);

    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("User not found".to_string()),
    })?;

    let password_hash = user.password_hash.clone().ok_or_else(|| Error::BadRequest {
        message: "Cannot change password for non-native authentication users".to_string(),
    })?;

    let current_password = request.current_password.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&current_password, &password_hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(Error::Unauthenticated {
            message: Some("Current password is incorrect".to_string()),
        });
    }

    validate_password(&request.new_password, &state)?;

    let new_password_hash = tokio::task::spawn_blocking({
        let password = request.new_password.clone();
        move || password::hash_string(&password)
    })
    .await
    .map_err(|e| Error::Internal {
        operation: format!("spawn password hashing task: {e}"),
    })??;

    user_repo
        .update(
            current_user.id,
            &UserUpdateDBRequest {
                password_hash: Some(new_password_hash),
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(AuthSuccessResponse {
        message: "Password changed successfully".to_string(),
    }))
}

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    }
}

fn validate_password(password: &str, state: &AppState) -> Result<(), Error> {
    let password_config = &state.config.auth.native.password;
    if password.len() < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if password.len() > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }
    Ok(())
}

/// Only a hash of the reset token ever touches the database.
fn hash_reset_token(raw_token: &str) -> String {
    let digest = Sha256::digest(raw_token.as_bytes());
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Helper function to create a session cookie
fn create_session_cookie(token: &str, config: &crate::config::Config) -> String {
    let session_config = &config.auth.native.session;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session_config.cookie_name,
        token,
        session_config.cookie_same_site,
        session_config.timeout.as_secs()
    );
    if session_config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;
    use axum_test::TestServer;
    use sqlx::PgPool;

    fn register_router(state: AppState) -> axum::Router {
        axum::Router::new()
            .route("/auth/register", axum::routing::post(register))
            .route("/auth/password-resets", axum::routing::post(request_password_reset))
            .with_state(state)
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_success(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.native.enabled = true;
        config.auth.native.allow_registration = true;

        let state = AppState::builder().db(pool).config(config).build();
        let server = TestServer::new(register_router(state)).unwrap();

        let request = RegisterRequest {
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            display_name: Some("Test User".to_string()),
            business_name: Some("Test Trading Co".to_string()),
            phone: None,
            referral_code: None,
        };

        let response = server.post("/auth/register").json(&request).await;

        response.assert_status(axum::http::StatusCode::CREATED);
        assert!(response.headers().get("set-cookie").is_some());

        let body: AuthResponse = response.json();
        assert_eq!(body.user.email, "test@example.com");
        assert_eq!(body.user.role, Role::Reseller);
        assert!(body.user.referral_code.is_some());
        assert_eq!(body.message, "Registration successful");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_duplicate_email_is_conflict(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.native.enabled = true;
        config.auth.native.allow_registration = true;

        let state = AppState::builder().db(pool).config(config).build();
        let server = TestServer::new(register_router(state)).unwrap();

        let request = RegisterRequest {
            username: "original".to_string(),
            email: "taken@example.com".to_string(),
            password: "password123".to_string(),
            display_name: None,
            business_name: None,
            phone: None,
            referral_code: None,
        };
        let response = server.post("/auth/register").json(&request).await;
        response.assert_status(axum::http::StatusCode::CREATED);

        // Same email, different username: the account already exists
        let duplicate = RegisterRequest {
            username: "impostor".to_string(),
            ..request
        };
        let response = server.post("/auth/register").json(&duplicate).await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_disabled(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.native.enabled = false;

        let state = AppState::builder().db(pool).config(config).build();
        let server = TestServer::new(register_router(state)).unwrap();

        let request = RegisterRequest {
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            display_name: None,
            business_name: None,
            phone: None,
            referral_code: None,
        };

        let response = server.post("/auth/register").json(&request).await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_password_reset_request_is_always_accepted(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.native.enabled = true;
        config.auth.native.allow_registration = true;

        let state = AppState::builder().db(pool).config(config).build();
        let server = TestServer::new(register_router(state)).unwrap();

        let request = RegisterRequest {
            username: "forgetful".to_string(),
            email: "forgetful@example.com".to_string(),
            password: "password123".to_string(),
            display_name: None,
            business_name: None,
            phone: None,
            referral_code: None,
        };
        server.post("/auth/register").json(&request).await.assert_status(axum::http::StatusCode::CREATED);

        // The response must not reveal whether the account exists
        let response = server
            .post("/auth/password-resets")
            .json(&PasswordResetRequest {
                email: "forgetful@example.com".to_string(),
            })
            .await;
        response.assert_status(axum::http::StatusCode::ACCEPTED);

        let response = server
            .post("/auth/password-resets")
            .json(&PasswordResetRequest {
                email: "nobody@example.com".to_string(),
            })
            .await;
        response.assert_status(axum::http::StatusCode::ACCEPTED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_password_validation(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.native.enabled = true;
        config.auth.native.allow_registration = true;
        config.auth.native.password.min_length = 10;

        let state = AppState::builder().db(pool).config(config).build();
        let server = TestServer::new(register_router(state)).unwrap();

        let request = RegisterRequest {
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
            password: "short".to_string(),
            display_name: None,
            business_name: None,
            phone: None,
            referral_code: None,
        };

        let response = server.post("/auth/register").json(&request).await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_with_referral_code(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.native.enabled = true;
        config.auth.native.allow_registration = true;

        let state = AppState::builder().db(pool.clone()).config(config).build();
        let server = TestServer::new(register_router(state)).unwrap();

        // Register the referrer first
        let referrer = RegisterRequest {
            username: "referrer".to_string(),
            email: "referrer@example.com".to_string(),
            password: "password123".to_string(),
            display_name: None,
            business_name: None,
            phone: None,
            referral_code: None,
        };
        let response = server.post("/auth/register").json(&referrer).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let referrer_body: AuthResponse = response.json();
        let code = referrer_body.user.referral_code.clone().unwrap();

        // Register the referee with the referrer's code
        let referee = RegisterRequest {
            username: "referee".to_string(),
            email: "referee@example.com".to_string(),
            password: "password123".to_string(),
            display_name: None,
            business_name: None,
            phone: None,
            referral_code: Some(code),
        };
        let response = server.post("/auth/register").json(&referee).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let referee_body: AuthResponse = response.json();

        // A pending referral row must link the two accounts
        let mut conn = pool.acquire().await.unwrap();
        let referral = Referrals::new(&mut conn)
            .get_by_referee(referee_body.user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(referral.referrer_id, referrer_body.user.id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_with_unknown_referral_code(pool: PgPool) {
        let mut config = create_test_config();
        config.auth.native.enabled = true;
        config.auth.native.allow_registration = true;

        let state = AppState::builder().db(pool).config(config).build();
        let server = TestServer::new(register_router(state)).unwrap();

        let request = RegisterRequest {
            username: "lonely".to_string(),
            email: "lonely@example.com".to_string(),
            password: "password123".to_string(),
            display_name: None,
            business_name: None,
            phone: None,
            referral_code: Some("NOPE1234".to_string()),
        };

        let response = server.post("/auth/register").json(&request).await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
}
