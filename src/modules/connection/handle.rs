use actix_web::{delete, get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        connection::{
            model::{
                ConnectionListResponse, ConnectionResponse, ConnectionStatsResponse,
                ConnectionStatusResponse, MutualConnectionResponse, PaginationQuery,
                SuggestionListResponse, UserListResponse,
            },
            repository_pg::ConnectionRepositoryPg,
            service::ConnectionService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::ValidatedQuery,
};

pub type ConnectionSvc = ConnectionService<ConnectionRepositoryPg, UserRepositoryPg>;

#[post("/request/{user_id}")]
pub async fn send_request(
    connection_service: web::Data<ConnectionSvc>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let connection = connection_service.send_request(caller, *user_id).await?;
    Ok(success::Success::created(connection).message("Connection request sent successfully"))
}

#[post("/accept/{connection_id}")]
pub async fn accept_request(
    connection_service: web::Data<ConnectionSvc>,
    connection_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let connection = connection_service.accept(caller, *connection_id).await?;
    Ok(success::Success::ok(connection).message("Connection request accepted successfully"))
}

#[post("/reject/{connection_id}")]
pub async fn reject_request(
    connection_service: web::Data<ConnectionSvc>,
    connection_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let connection = connection_service.reject(caller, *connection_id).await?;
    Ok(success::Success::ok(connection).message("Connection request rejected"))
}

#[delete("/cancel/{connection_id}")]
pub async fn cancel_request(
    connection_service: web::Data<ConnectionSvc>,
    connection_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let caller = get_claims(&req)?.sub;
    connection_service.cancel(caller, *connection_id).await?;
    Ok(success::Success::no_content())
}

#[delete("/remove/{user_id}")]
pub async fn remove_connection(
    connection_service: web::Data<ConnectionSvc>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let caller = get_claims(&req)?.sub;
    connection_service.remove(caller, *user_id).await?;
    Ok(success::Success::no_content())
}

#[post("/block/{user_id}")]
pub async fn block_user(
    connection_service: web::Data<ConnectionSvc>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let connection = connection_service.block(caller, *user_id).await?;
    Ok(success::Success::ok(connection).message("User blocked"))
}

#[delete("/unblock/{user_id}")]
pub async fn unblock_user(
    connection_service: web::Data<ConnectionSvc>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let caller = get_claims(&req)?.sub;
    connection_service.unblock(caller, *user_id).await?;
    Ok(success::Success::no_content())
}

#[get("/my-connections")]
pub async fn my_connections(
    connection_service: web::Data<ConnectionSvc>,
    page: ValidatedQuery<PaginationQuery>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionListResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let list = connection_service.my_connections(caller, page.0).await?;
    Ok(success::Success::ok(list).message("Connections retrieved successfully"))
}

#[get("/requests/received")]
pub async fn requests_received(
    connection_service: web::Data<ConnectionSvc>,
    page: ValidatedQuery<PaginationQuery>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionListResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let list = connection_service.pending_received(caller, page.0).await?;
    Ok(success::Success::ok(list).message("Received requests retrieved successfully"))
}

#[get("/requests/sent")]
pub async fn requests_sent(
    connection_service: web::Data<ConnectionSvc>,
    page: ValidatedQuery<PaginationQuery>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionListResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let list = connection_service.pending_sent(caller, page.0).await?;
    Ok(success::Success::ok(list).message("Sent requests retrieved successfully"))
}

#[get("/status/{user_id}")]
pub async fn connection_status(
    connection_service: web::Data<ConnectionSvc>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionStatusResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let status = connection_service.get_status(caller, *user_id).await?;
    Ok(success::Success::ok(status))
}

#[get("/connections/user/{user_id}")]
pub async fn public_connections(
    connection_service: web::Data<ConnectionSvc>,
    user_id: web::Path<Uuid>,
    page: ValidatedQuery<PaginationQuery>,
) -> Result<success::Success<UserListResponse>, error::Error> {
    let list = connection_service.public_connections(*user_id, page.0).await?;
    Ok(success::Success::ok(list).message("Connections retrieved successfully"))
}

#[get("/mutual/{user_id}")]
pub async fn mutual_connections(
    connection_service: web::Data<ConnectionSvc>,
    user_id: web::Path<Uuid>,
    page: ValidatedQuery<PaginationQuery>,
    req: HttpRequest,
) -> Result<success::Success<MutualConnectionResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let mutual = connection_service.mutual_connections(caller, *user_id, page.0).await?;
    Ok(success::Success::ok(mutual).message("Mutual connections retrieved successfully"))
}

#[get("/suggestions")]
pub async fn suggestions(
    connection_service: web::Data<ConnectionSvc>,
    page: ValidatedQuery<PaginationQuery>,
    req: HttpRequest,
) -> Result<success::Success<SuggestionListResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let list = connection_service.suggestions(caller, page.0).await?;
    Ok(success::Success::ok(list).message("Suggestions retrieved successfully"))
}

#[get("/stats")]
pub async fn stats(
    connection_service: web::Data<ConnectionSvc>,
    req: HttpRequest,
) -> Result<success::Success<ConnectionStatsResponse>, error::Error> {
    let caller = get_claims(&req)?.sub;
    let stats = connection_service.stats(caller).await?;
    Ok(success::Success::ok(stats))
}
