use crate::modules::post::handle::*;
use actix_web::web::{scope, ServiceConfig};

/// Literal segments are registered ahead of `/{post_id}`.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/posts")
            .service(create_post)
            .service(feed)
            .service(user_posts)
            .service(update_comment)
            .service(delete_comment)
            .service(get_post)
            .service(update_post)
            .service(delete_post)
            .service(toggle_like)
            .service(post_likes)
            .service(add_comment)
            .service(post_comments),
    );
}
