/// Account Routes
///
/// Registration, login, logout, token extension and the caller's own
/// profile. Handlers only translate between HTTP and the account and
/// session operations.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::accounts;
use crate::auth::{self, AuthenticatedSession, TokenCodec};
use crate::error::AppError;
use crate::models::{Friend, NewAccount, ProfileUpdate, UserProfile};
use crate::store::UserStore;

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub password: String,
}

/// Login response: the new session token and the account
#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Extend response: the replacement token
#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Deserialize)]
pub struct AddFriendRequest {
    #[serde(default)]
    pub friend_code: String,
    #[serde(default)]
    pub poked: bool,
}

#[derive(Serialize, Deserialize)]
pub struct FriendsResponse {
    pub friends: Vec<Friend>,
}

/// POST /users
///
/// # Errors
/// - 400: a field failed validation (the message names it)
/// - 409: account or email already registered
pub async fn register(
    payload: web::Json<NewAccount>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user = accounts::register(store.get_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(UserProfile::from(&user)))
}

/// POST /users/login
///
/// # Errors
/// - 400: account or password missing
/// - 401: unknown account or wrong password (indistinguishable)
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<dyn UserStore>,
    codec: web::Data<TokenCodec>,
) -> Result<HttpResponse, AppError> {
    let outcome = auth::login(store.get_ref(), codec.get_ref(), &form.account, &form.password).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token: outcome.token,
        token_type: "Bearer".to_string(),
        expires_in: codec.session_ttl().num_seconds(),
        user: UserProfile::from(&outcome.account),
    }))
}

/// DELETE /users/logout
///
/// Revokes the presented token only; other devices stay logged in.
pub async fn logout(
    session: web::ReqData<AuthenticatedSession>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    auth::logout(store.get_ref(), &session).await?;
    Ok(HttpResponse::Ok().finish())
}

/// PATCH /users/extend
///
/// # Errors
/// - 409: the presented token was revoked while this request was in flight
pub async fn extend(
    session: web::ReqData<AuthenticatedSession>,
    store: web::Data<dyn UserStore>,
    codec: web::Data<TokenCodec>,
) -> Result<HttpResponse, AppError> {
    let token = auth::extend(store.get_ref(), codec.get_ref(), &session).await?;

    Ok(HttpResponse::Ok().json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: codec.session_ttl().num_seconds(),
    }))
}

/// GET /users/me
pub async fn get_current_user(session: web::ReqData<AuthenticatedSession>) -> HttpResponse {
    HttpResponse::Ok().json(UserProfile::from(&session.account))
}

/// PATCH /users/me
pub async fn update_current_user(
    session: web::ReqData<AuthenticatedSession>,
    update: web::Json<ProfileUpdate>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user = accounts::update_profile(store.get_ref(), &session, update.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserProfile::from(&user)))
}

/// PATCH /users/friends
///
/// # Errors
/// - 404: no account holds the friend code
/// - 409: already a friend
pub async fn add_friend(
    session: web::ReqData<AuthenticatedSession>,
    form: web::Json<AddFriendRequest>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let friends = accounts::add_friend(store.get_ref(), &session, &form.friend_code, form.poked).await?;
    Ok(HttpResponse::Ok().json(FriendsResponse { friends }))
}
