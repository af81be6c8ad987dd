/// Account endpoints
use crate::{
    account::{
        RefreshSessionRequest, RequestPasswordResetRequest, ResetPasswordRequest, SessionInfo,
        SessionResponse, SignInRequest, SignUpRequest,
    },
    auth::AuthContext,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

/// Build account routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/account/sign-up", post(sign_up))
        .route("/api/account/sign-in", post(sign_in))
        .route("/api/account/sign-out", post(sign_out))
        .route("/api/account/session", get(get_session))
        .route("/api/account/refresh-session", post(refresh_session))
        .route(
            "/api/account/request-password-reset",
            post(request_password_reset),
        )
        .route("/api/account/reset-password", post(reset_password))
}

/// Sign-up endpoint
async fn sign_up(
    State(ctx): State<AppContext>,
    Json(req): Json<SignUpRequest>,
) -> AppResult<Json<SessionResponse>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let account = ctx
        .account_manager
        .create_account(&req.email, &req.password, &req.display_name)
        .await?;
    tracing::info!("Account created: {}", account.id);

    let session = ctx.account_manager.create_session(&account.id).await?;

    Ok(Json(SessionResponse {
        user_id: account.id,
        email: account.email,
        display_name: account.display_name,
        access_jwt: session.access_token,
        refresh_jwt: session.refresh_token,
    }))
}

/// Sign-in endpoint
async fn sign_in(
    State(ctx): State<AppContext>,
    Json(req): Json<SignInRequest>,
) -> AppResult<Json<SessionResponse>> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Please enter both email and password".to_string(),
        ));
    }

    let (account, session) = ctx.account_manager.login(&req.email, &req.password).await?;

    Ok(Json(SessionResponse {
        user_id: account.id,
        email: account.email,
        display_name: account.display_name,
        access_jwt: session.access_token,
        refresh_jwt: session.refresh_token,
    }))
}

/// Sign-out endpoint
async fn sign_out(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<serde_json::Value>> {
    ctx.account_manager
        .delete_session(&auth.session.session_id)
        .await?;

    Ok(Json(serde_json::json!({})))
}

/// Session info endpoint
async fn get_session(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> AppResult<Json<SessionInfo>> {
    let account = ctx.account_manager.get_account(&auth.user_id).await?;

    Ok(Json(SessionInfo {
        user_id: account.id,
        email: account.email,
        display_name: account.display_name,
    }))
}

/// Refresh session endpoint
async fn refresh_session(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshSessionRequest>,
) -> AppResult<Json<SessionResponse>> {
    let session = ctx.account_manager.refresh_session(&req.refresh_jwt).await?;

    let account = ctx.account_manager.get_account(&session.user_id).await?;

    Ok(Json(SessionResponse {
        user_id: account.id,
        email: account.email,
        display_name: account.display_name,
        access_jwt: session.access_token,
        refresh_jwt: session.refresh_token,
    }))
}

/// Request a password reset email
///
/// Always responds 200 so the endpoint cannot be used to probe which emails
/// have accounts.
async fn request_password_reset(
    State(ctx): State<AppContext>,
    Json(req): Json<RequestPasswordResetRequest>,
) -> AppResult<Json<serde_json::Value>> {
    match ctx
        .account_manager
        .generate_password_reset_token(&req.email)
        .await
    {
        Ok((token, account)) => {
            if ctx.mailer.is_configured() {
                let base_url = ctx.service_url();
                if let Err(e) = ctx
                    .mailer
                    .send_password_reset_email(
                        &account.email,
                        &account.display_name,
                        &token,
                        &base_url,
                    )
                    .await
                {
                    tracing::warn!("Failed to send password reset email: {}", e);
                }
            } else {
                tracing::warn!("Email not configured, reset token generated but not sent");
            }
        }
        Err(AppError::NotFound(_)) => {
            tracing::debug!("Password reset requested for unknown email");
        }
        Err(e) => return Err(e),
    }

    Ok(Json(serde_json::json!({})))
}

/// Redeem a password reset token
async fn reset_password(
    State(ctx): State<AppContext>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    ctx.account_manager
        .reset_password(&req.token, &req.new_password)
        .await?;

    Ok(Json(serde_json::json!({})))
}
