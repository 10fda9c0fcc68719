//! In-memory repositories and fixtures shared by the unit tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::error,
    constants::Env,
    modules::{
        connection::{
            model::PaginationQuery,
            repository::{ConnectionRepository, Decide, Side},
            rules::Transition,
            schema::{ConnectionEntity, ConnectionStatus},
            suggestion::SuggestionWeights,
        },
        post::{
            model::{InsertComment, InsertPost, UpdatePostModel},
            repository::PostRepository,
            schema::{CommentEntity, PostEntity, PostLikeEntity, PostPrivacy},
        },
        user::{
            model::{CandidateFilter, InsertUser, ProfileSearch, UpdateProfileModel},
            repository::UserRepository,
            schema::UserEntity,
        },
    },
    utils::fold_case,
};

pub fn test_env() -> Env {
    Env {
        jwt_secret: "test-secret".to_string(),
        access_token_expiration: 900,
        database_url: "postgres://localhost/test".to_string(),
        database_max_connections: 1,
        frontend_urls: vec!["http://localhost:5173".to_string()],
        ip: "127.0.0.1".to_string(),
        port: 8080,
        suggestion_pool_size: 500,
        suggestion_weights: SuggestionWeights::default(),
    }
}

pub fn user_fixture(username: &str) -> UserEntity {
    let now = Utc::now();
    UserEntity {
        id: Uuid::now_v7(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        hash_password: String::new(),
        full_name: username.to_uppercase(),
        university: None,
        major: None,
        interests: Vec::new(),
        bio: None,
        avatar_url: None,
        is_active: true,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    }
}

fn duplicate(constraint: &str) -> error::SystemError {
    error::SystemError::DuplicateKey(Some(error::DbErrorMeta {
        constraint: Some(constraint.to_string()),
        message: "duplicate key value violates unique constraint".to_string(),
    }))
}

#[derive(Default)]
pub struct InMemoryUserRepo {
    users: Mutex<HashMap<Uuid, UserEntity>>,
}

impl InMemoryUserRepo {
    pub fn insert(&self, user: UserEntity) -> Uuid {
        let id = user.id;
        self.users.lock().unwrap().insert(id, user);
        id
    }

    /// Raw row, deleted or not.
    pub fn stored(&self, id: &Uuid) -> Option<UserEntity> {
        self.users.lock().unwrap().get(id).cloned()
    }

    pub fn is_visible(&self, id: &Uuid) -> bool {
        self.users.lock().unwrap().get(id).is_some_and(|u| u.is_visible())
    }

    fn same_text(a: &Option<String>, b: &Option<String>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => {
                let a = fold_case(a);
                !a.is_empty() && a == fold_case(b)
            }
            _ => false,
        }
    }

    fn contains_text(value: &Option<String>, term: &Option<String>) -> bool {
        match term {
            None => true,
            Some(term) => value.as_deref().is_some_and(|v| fold_case(v).contains(&fold_case(term))),
        }
    }

    fn search_matches(user: &UserEntity, search: &ProfileSearch) -> bool {
        user.is_visible()
            && Self::contains_text(&user.university, &search.university)
            && Self::contains_text(&user.major, &search.major)
            && (search.interests.is_empty()
                || user.interests.iter().any(|i| search.interests.contains(&fold_case(i))))
    }
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepo {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.users.lock().unwrap().get(id).filter(|u| u.is_visible()).cloned())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.deleted_at.is_none() && fold_case(&u.username) == fold_case(username))
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError> {
        let users = self.users.lock().unwrap();
        Ok(ids.iter().filter_map(|id| users.get(id)).filter(|u| u.is_visible()).cloned().collect())
    }

    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError> {
        let mut users = self.users.lock().unwrap();
        let live = || users.values().filter(|u| u.deleted_at.is_none());
        if live().any(|u| fold_case(&u.username) == fold_case(&user.username)) {
            return Err(duplicate("uq_users_username"));
        }
        if live().any(|u| fold_case(&u.email) == fold_case(&user.email)) {
            return Err(duplicate("uq_users_email"));
        }

        let mut entity = user_fixture(&user.username);
        entity.email = user.email.clone();
        entity.hash_password = user.hash_password.clone();
        entity.full_name = user.full_name.clone();
        entity.university = user.university.clone();
        entity.major = user.major.clone();
        entity.interests = user.interests.clone();

        let id = entity.id;
        users.insert(id, entity);
        Ok(id)
    }

    async fn update_profile(
        &self,
        id: &Uuid,
        profile: &UpdateProfileModel,
    ) -> Result<UserEntity, error::SystemError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        if let Some(full_name) = &profile.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(university) = &profile.university {
            user.university = university.clone();
        }
        if let Some(major) = &profile.major {
            user.major = major.clone();
        }
        if let Some(interests) = &profile.interests {
            user.interests = interests.clone();
        }
        if let Some(bio) = &profile.bio {
            user.bio = bio.clone();
        }
        if let Some(avatar_url) = &profile.avatar_url {
            user.avatar_url = avatar_url.clone();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn find_suggestion_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let interests: HashSet<String> = filter.interests.iter().map(|i| fold_case(i)).collect();
        let mut candidates: Vec<UserEntity> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.is_visible() && !filter.exclude_ids.contains(&u.id))
            .filter(|u| {
                filter.mutual_ids.contains(&u.id)
                    || Self::same_text(&u.university, &filter.university)
                    || Self::same_text(&u.major, &filter.major)
                    || u.interests.iter().any(|i| interests.contains(&fold_case(i)))
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|u| (!filter.mutual_ids.contains(&u.id), u.id));
        candidates.truncate(filter.limit.max(0) as usize);
        Ok(candidates)
    }

    async fn search(
        &self,
        search: &ProfileSearch,
        page: &PaginationQuery,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let mut found: Vec<UserEntity> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| Self::search_matches(u, search))
            .cloned()
            .collect();
        found.sort_by_key(|u| (fold_case(&u.username), u.id));
        Ok(page.slice(found))
    }

    async fn count_search(&self, search: &ProfileSearch) -> Result<i64, error::SystemError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| Self::search_matches(u, search))
            .count() as i64)
    }

    async fn deactivate(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(id).filter(|u| u.deleted_at.is_none()) else {
            return Ok(false);
        };
        user.is_active = false;
        user.deleted_at = Some(Utc::now());
        user.updated_at = Utc::now();
        Ok(true)
    }
}

pub struct InMemoryConnectionRepo {
    edges: Mutex<Vec<ConnectionEntity>>,
    users: Option<Arc<InMemoryUserRepo>>,
}

impl InMemoryConnectionRepo {
    /// Listings skip edges whose other party is not an active user in `users`.
    pub fn with_users(users: Arc<InMemoryUserRepo>) -> Self {
        InMemoryConnectionRepo { edges: Mutex::default(), users: Some(users) }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.lock().unwrap().len()
    }

    fn other_visible(&self, edge: &ConnectionEntity, user_id: &Uuid) -> bool {
        match (&self.users, edge.other_party(*user_id)) {
            (None, _) => true,
            (Some(users), Some(other)) => users.is_visible(&other),
            (Some(_), None) => false,
        }
    }

    fn matches(edge: &ConnectionEntity, user_id: &Uuid, side: Side) -> bool {
        match side {
            Side::Either => edge.involves(*user_id),
            Side::Requester => edge.requester_id == *user_id,
            Side::Addressee => edge.addressee_id == *user_id,
        }
    }

    fn apply(
        edges: &mut Vec<ConnectionEntity>,
        existing: Option<ConnectionEntity>,
        decide: &Decide,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let now = Utc::now();
        match decide(existing.as_ref())? {
            Transition::Insert { requester_id, addressee_id, status } => {
                if edges.iter().any(|e| e.involves(requester_id) && e.involves(addressee_id)) {
                    return Err(duplicate("uq_connections_pair"));
                }
                let edge = ConnectionEntity {
                    id: Uuid::now_v7(),
                    requester_id,
                    addressee_id,
                    status,
                    created_at: now,
                    updated_at: now,
                    responded_at: (status != ConnectionStatus::Pending).then_some(now),
                };
                edges.push(edge.clone());
                Ok(Some(edge))
            }
            Transition::Update { id, requester_id, addressee_id, status } => {
                let edge = edges
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or_else(|| error::SystemError::not_found("Connection not found"))?;
                edge.requester_id = requester_id;
                edge.addressee_id = addressee_id;
                edge.status = status;
                edge.updated_at = now;
                edge.responded_at = (status != ConnectionStatus::Pending).then_some(now);
                Ok(Some(edge.clone()))
            }
            Transition::Delete { id } => {
                edges.retain(|e| e.id != id);
                Ok(None)
            }
            Transition::Keep(edge) => Ok(Some(edge)),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionRepository for InMemoryConnectionRepo {
    async fn find_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        Ok(self
            .edges
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.involves(*user_id_a) && e.involves(*user_id_b))
            .cloned())
    }

    async fn find_by_status(
        &self,
        user_id: &Uuid,
        side: Side,
        status: ConnectionStatus,
        page: &PaginationQuery,
    ) -> Result<Vec<ConnectionEntity>, error::SystemError> {
        let mut found: Vec<ConnectionEntity> = self
            .edges
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == status && Self::matches(e, user_id, side))
            .filter(|e| self.other_visible(e, user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page.slice(found))
    }

    async fn count_by_status(
        &self,
        user_id: &Uuid,
        side: Side,
        status: ConnectionStatus,
    ) -> Result<i64, error::SystemError> {
        Ok(self
            .edges
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == status && Self::matches(e, user_id, side))
            .filter(|e| self.other_visible(e, user_id))
            .count() as i64)
    }

    async fn find_connected_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        Ok(self
            .edges
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == ConnectionStatus::Accepted && self.other_visible(e, user_id))
            .filter_map(|e| e.other_party(*user_id))
            .collect())
    }

    async fn find_related_ids(&self, user_id: &Uuid) -> Result<Vec<Uuid>, error::SystemError> {
        Ok(self.edges.lock().unwrap().iter().filter_map(|e| e.other_party(*user_id)).collect())
    }

    async fn count_connections_among(
        &self,
        user_ids: &[Uuid],
    ) -> Result<Vec<(Uuid, i64)>, error::SystemError> {
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for edge in self.edges.lock().unwrap().iter() {
            if edge.status != ConnectionStatus::Accepted {
                continue;
            }
            if user_ids.contains(&edge.addressee_id) {
                *counts.entry(edge.requester_id).or_default() += 1;
            }
            if user_ids.contains(&edge.requester_id) {
                *counts.entry(edge.addressee_id).or_default() += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }

    async fn transition_by_id(
        &self,
        id: &Uuid,
        decide: &Decide,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let mut edges = self.edges.lock().unwrap();
        let existing = edges.iter().find(|e| e.id == *id).cloned();
        Self::apply(&mut edges, existing, decide)
    }

    async fn transition_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        decide: &Decide,
    ) -> Result<Option<ConnectionEntity>, error::SystemError> {
        let mut edges = self.edges.lock().unwrap();
        let existing =
            edges.iter().find(|e| e.involves(*user_id_a) && e.involves(*user_id_b)).cloned();
        Self::apply(&mut edges, existing, decide)
    }
}

/// Posts, likes and comments kept in memory. Authors are checked against
/// `users` the way the SQL joins do.
pub struct InMemoryPostRepo {
    posts: Mutex<Vec<PostEntity>>,
    likes: Mutex<Vec<PostLikeEntity>>,
    comments: Mutex<Vec<CommentEntity>>,
    users: Arc<InMemoryUserRepo>,
}

impl InMemoryPostRepo {
    pub fn new(users: Arc<InMemoryUserRepo>) -> Self {
        InMemoryPostRepo {
            posts: Mutex::default(),
            likes: Mutex::default(),
            comments: Mutex::default(),
            users,
        }
    }

    /// Raw row, deleted or not.
    pub fn stored(&self, id: &Uuid) -> Option<PostEntity> {
        self.posts.lock().unwrap().iter().find(|p| p.id == *id).cloned()
    }

    fn live_post(&self, post: &PostEntity) -> bool {
        post.deleted_at.is_none() && self.users.is_visible(&post.user_id)
    }

    fn live_comment(&self, comment: &CommentEntity) -> bool {
        comment.deleted_at.is_none() && self.users.is_visible(&comment.user_id)
    }

    fn by_authors(&self, author_ids: &[Uuid], privacies: &[PostPrivacy]) -> Vec<PostEntity> {
        let mut found: Vec<PostEntity> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| author_ids.contains(&p.user_id) && privacies.contains(&p.privacy))
            .filter(|p| self.live_post(p))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        found
    }

    fn top_level(&self, post_id: &Uuid) -> Vec<CommentEntity> {
        let mut found: Vec<CommentEntity> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.post_id == *post_id && c.parent_comment_id.is_none())
            .filter(|c| self.live_comment(c))
            .cloned()
            .collect();
        found.sort_by_key(|c| (c.created_at, c.id));
        found
    }

    fn live_likes(&self, post_id: &Uuid) -> Vec<PostLikeEntity> {
        let mut found: Vec<PostLikeEntity> = self
            .likes
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.post_id == *post_id && self.users.is_visible(&l.user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        found
    }
}

#[async_trait::async_trait]
impl PostRepository for InMemoryPostRepo {
    async fn create(&self, post: &InsertPost) -> Result<PostEntity, error::SystemError> {
        let now = Utc::now();
        let entity = PostEntity {
            id: Uuid::now_v7(),
            user_id: post.user_id,
            content: post.content.clone(),
            media_urls: post.media_urls.clone(),
            privacy: post.privacy,
            likes_count: 0,
            comments_count: 0,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.posts.lock().unwrap().push(entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<PostEntity>, error::SystemError> {
        Ok(self.stored(id).filter(|p| self.live_post(p)))
    }

    async fn update(
        &self,
        id: &Uuid,
        changes: &UpdatePostModel,
    ) -> Result<Option<PostEntity>, error::SystemError> {
        let mut posts = self.posts.lock().unwrap();
        let Some(post) = posts.iter_mut().find(|p| p.id == *id && p.deleted_at.is_none()) else {
            return Ok(None);
        };
        if let Some(content) = &changes.content {
            post.content = content.clone();
        }
        if let Some(media_urls) = &changes.media_urls {
            post.media_urls = media_urls.clone();
        }
        if let Some(privacy) = changes.privacy {
            post.privacy = privacy;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn soft_delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let mut posts = self.posts.lock().unwrap();
        match posts.iter_mut().find(|p| p.id == *id && p.deleted_at.is_none()) {
            Some(post) => {
                post.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_authors(
        &self,
        author_ids: &[Uuid],
        privacies: &[PostPrivacy],
        page: &PaginationQuery,
    ) -> Result<Vec<PostEntity>, error::SystemError> {
        Ok(page.slice(self.by_authors(author_ids, privacies)))
    }

    async fn count_by_authors(
        &self,
        author_ids: &[Uuid],
        privacies: &[PostPrivacy],
    ) -> Result<i64, error::SystemError> {
        Ok(self.by_authors(author_ids, privacies).len() as i64)
    }

    async fn toggle_like(
        &self,
        post_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<(bool, i32)>, error::SystemError> {
        let mut posts = self.posts.lock().unwrap();
        let Some(post) = posts.iter_mut().find(|p| p.id == *post_id && p.deleted_at.is_none())
        else {
            return Ok(None);
        };

        let mut likes = self.likes.lock().unwrap();
        let before = likes.len();
        likes.retain(|l| !(l.post_id == *post_id && l.user_id == *user_id));
        let liked = likes.len() == before;
        if liked {
            likes.push(PostLikeEntity {
                id: Uuid::now_v7(),
                post_id: *post_id,
                user_id: *user_id,
                created_at: Utc::now(),
            });
            post.likes_count += 1;
        } else {
            post.likes_count = (post.likes_count - 1).max(0);
        }
        Ok(Some((liked, post.likes_count)))
    }

    async fn liked_post_ids(
        &self,
        user_id: &Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, error::SystemError> {
        Ok(self
            .likes
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.user_id == *user_id && post_ids.contains(&l.post_id))
            .map(|l| l.post_id)
            .collect())
    }

    async fn find_likes(
        &self,
        post_id: &Uuid,
        page: &PaginationQuery,
    ) -> Result<Vec<PostLikeEntity>, error::SystemError> {
        Ok(page.slice(self.live_likes(post_id)))
    }

    async fn count_likes(&self, post_id: &Uuid) -> Result<i64, error::SystemError> {
        Ok(self.live_likes(post_id).len() as i64)
    }

    async fn create_comment(
        &self,
        comment: &InsertComment,
    ) -> Result<Option<CommentEntity>, error::SystemError> {
        let mut posts = self.posts.lock().unwrap();
        let Some(post) =
            posts.iter_mut().find(|p| p.id == comment.post_id && p.deleted_at.is_none())
        else {
            return Ok(None);
        };

        let now = Utc::now();
        let entity = CommentEntity {
            id: Uuid::now_v7(),
            post_id: comment.post_id,
            user_id: comment.user_id,
            parent_comment_id: comment.parent_comment_id,
            content: comment.content.clone(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.comments.lock().unwrap().push(entity.clone());
        post.comments_count += 1;
        Ok(Some(entity))
    }

    async fn find_comment(&self, id: &Uuid) -> Result<Option<CommentEntity>, error::SystemError> {
        let found = self.comments.lock().unwrap().iter().find(|c| c.id == *id).cloned();
        Ok(found.filter(|c| self.live_comment(c)))
    }

    async fn update_comment(
        &self,
        id: &Uuid,
        content: &str,
    ) -> Result<Option<CommentEntity>, error::SystemError> {
        let mut comments = self.comments.lock().unwrap();
        let Some(comment) = comments.iter_mut().find(|c| c.id == *id && c.deleted_at.is_none())
        else {
            return Ok(None);
        };
        comment.content = content.to_string();
        comment.updated_at = Utc::now();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, id: &Uuid) -> Result<i64, error::SystemError> {
        let now = Utc::now();
        let mut removed = 0;
        let mut post_id = None;
        for comment in self.comments.lock().unwrap().iter_mut() {
            let hit = comment.id == *id || comment.parent_comment_id == Some(*id);
            if hit && comment.deleted_at.is_none() {
                comment.deleted_at = Some(now);
                post_id = Some(comment.post_id);
                removed += 1;
            }
        }

        if let Some(post_id) = post_id {
            if let Some(post) = self.posts.lock().unwrap().iter_mut().find(|p| p.id == post_id) {
                post.comments_count = (post.comments_count - removed as i32).max(0);
            }
        }
        Ok(removed)
    }

    async fn find_comments(
        &self,
        post_id: &Uuid,
        page: &PaginationQuery,
    ) -> Result<Vec<CommentEntity>, error::SystemError> {
        Ok(page.slice(self.top_level(post_id)))
    }

    async fn count_comments(&self, post_id: &Uuid) -> Result<i64, error::SystemError> {
        Ok(self.top_level(post_id).len() as i64)
    }

    async fn find_replies(
        &self,
        parent_ids: &[Uuid],
        per_parent: i64,
    ) -> Result<Vec<CommentEntity>, error::SystemError> {
        let mut replies: Vec<CommentEntity> = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.parent_comment_id.is_some_and(|p| parent_ids.contains(&p)))
            .filter(|c| self.live_comment(c))
            .cloned()
            .collect();
        replies.sort_by_key(|c| (c.created_at, c.id));

        let mut taken: HashMap<Uuid, i64> = HashMap::new();
        replies.retain(|c| {
            let count = taken.entry(c.parent_comment_id.unwrap_or_default()).or_default();
            *count += 1;
            *count <= per_parent
        });
        Ok(replies)
    }
}
