use crate::modules::connection::handle::*;
use actix_web::web::{scope, ServiceConfig};

/// Routes reachable without a bearer token; registered as exact resources so
/// they never shadow the authenticated `/connections` scope.
pub fn public_api_configure(cfg: &mut ServiceConfig) {
    cfg.service(public_connections);
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/connections")
            .service(send_request)
            .service(accept_request)
            .service(reject_request)
            .service(cancel_request)
            .service(remove_connection)
            .service(block_user)
            .service(unblock_user)
            .service(my_connections)
            .service(requests_received)
            .service(requests_sent)
            .service(connection_status)
            .service(mutual_connections)
            .service(suggestions)
            .service(stats),
    );
}
