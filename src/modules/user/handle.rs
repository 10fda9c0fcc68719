use actix_web::{delete, get, patch, post, web, HttpRequest};
use uuid::Uuid;

use crate::middlewares::get_claims;
use crate::modules::user::{model, service::UserService};
use crate::{
    api::{error, success},
    utils::{ValidatedJson, ValidatedQuery},
};

#[get("/profile")]
pub async fn get_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let id = get_claims(&req)?.sub;
    let user = user_service.get_by_id(id).await?;
    Ok(success::Success::ok(user).message("Profile retrieved successfully"))
}

#[patch("/profile")]
pub async fn update_profile(
    user_service: web::Data<UserService>,
    body: ValidatedJson<model::UpdateProfileModel>,
    req: HttpRequest,
) -> Result<success::Success<model::UserResponse>, error::Error> {
    let id = get_claims(&req)?.sub;
    let user = user_service.update_profile(id, body.0).await?;
    Ok(success::Success::ok(user).message("Profile updated successfully"))
}

#[delete("/profile")]
pub async fn delete_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let id = get_claims(&req)?.sub;
    user_service.delete_profile(id).await?;
    Ok(success::Success::no_content())
}

#[get("/search")]
pub async fn search_profiles(
    user_service: web::Data<UserService>,
    query: ValidatedQuery<model::SearchProfilesQuery>,
) -> Result<success::Success<model::UserSearchResponse>, error::Error> {
    let users = user_service.search(query.0).await?;
    Ok(success::Success::ok(users).message("Profiles retrieved successfully"))
}

#[get("/{id}")]
pub async fn get_user(
    user_service: web::Data<UserService>,
    user_id: web::Path<Uuid>,
) -> Result<success::Success<model::UserSummary>, error::Error> {
    let user = user_service.get_public(user_id.into_inner()).await?;
    Ok(success::Success::ok(user).message("User retrieved successfully"))
}

#[post("/signup")]
pub async fn sign_up(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignUpModel>,
) -> Result<success::Success<model::SignUpResponse>, error::Error> {
    let user_id = user_service.sign_up(user_data.0).await?;
    Ok(success::Success::created(model::SignUpResponse { id: user_id })
        .message("Signup successful"))
}

#[post("/signin")]
pub async fn sign_in(
    user_service: web::Data<UserService>,
    user_data: ValidatedJson<model::SignInModel>,
) -> Result<success::Success<model::SignInResponse>, error::Error> {
    let access_token = user_service.sign_in(user_data.0).await?;
    Ok(success::Success::ok(model::SignInResponse { access_token })
        .message("Signin successful"))
}
