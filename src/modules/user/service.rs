use log::info;
use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;

use crate::api::error;
use crate::constants::Env;
use crate::modules::user::model::{
    InsertUser, SearchProfilesQuery, SignInModel, SignUpModel, UpdateProfileModel, UserResponse,
    UserSearchResponse, UserSummary,
};
use crate::modules::user::repository::UserRepository;
use crate::utils::{fold_case, hash_password, verify_password, Claims};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    env: Arc<Env>,
}

fn clean_interests(interests: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    interests
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty() && seen.insert(fold_case(i)))
        .collect()
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl UserService {
    pub fn with_dependencies(repo: Arc<dyn UserRepository + Send + Sync>, env: Arc<Env>) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo, env }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<UserResponse, error::SystemError> {
        let user = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        Ok(UserResponse::from(user))
    }

    pub async fn get_public(&self, id: Uuid) -> Result<UserSummary, error::SystemError> {
        let user = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        Ok(UserSummary::from(user))
    }

    pub async fn update_profile(
        &self,
        id: Uuid,
        mut profile: UpdateProfileModel,
    ) -> Result<UserResponse, error::SystemError> {
        if profile.is_empty() {
            return Err(error::SystemError::bad_request("No fields to update"));
        }

        profile.interests = profile.interests.map(clean_interests);
        profile.university = profile.university.map(clean_optional);
        profile.major = profile.major.map(clean_optional);

        let user = self.repo.update_profile(&id, &profile).await?;
        info!("User {} updated profile", id);
        Ok(UserResponse::from(user))
    }

    pub async fn search(
        &self,
        query: SearchProfilesQuery,
    ) -> Result<UserSearchResponse, error::SystemError> {
        let criteria = query.criteria();
        let page = query.page();

        let (users, total) =
            tokio::try_join!(self.repo.search(&criteria, &page), self.repo.count_search(&criteria))?;

        Ok(UserSearchResponse {
            users: users.into_iter().map(UserSummary::from).collect(),
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// Soft-deletes the caller's account; its connections go with it.
    pub async fn delete_profile(&self, id: Uuid) -> Result<(), error::SystemError> {
        if !self.repo.deactivate(&id).await? {
            return Err(error::SystemError::not_found("User not found"));
        }
        info!("User {} deleted their account", id);
        Ok(())
    }

    pub async fn sign_up(&self, user: SignUpModel) -> Result<Uuid, error::SystemError> {
        let hash_password = hash_password(&user.password)?;

        let new_user = InsertUser {
            username: user.username.trim().to_string(),
            email: user.email.trim().to_lowercase(),
            hash_password,
            full_name: user.full_name.trim().to_string(),
            university: clean_optional(user.university),
            major: clean_optional(user.major),
            interests: clean_interests(user.interests),
        };

        let user_id = self.repo.create(&new_user).await?;
        info!("User {} signed up", user_id);
        Ok(user_id)
    }

    pub async fn sign_in(&self, user: SignInModel) -> Result<String, error::SystemError> {
        let user_entity = self
            .repo
            .find_by_username(&user.username)
            .await?
            .filter(|u| u.is_visible())
            .ok_or_else(|| error::SystemError::unauthorized("Invalid username or password"))?;

        let valid = verify_password(&user_entity.hash_password, &user.password)?;
        if !valid {
            return Err(error::SystemError::unauthorized("Invalid username or password"));
        }

        let access_token = Claims::new(&user_entity.id, self.env.access_token_expiration)
            .encode(self.env.jwt_secret.as_ref())?;

        Ok(access_token)
    }
}
