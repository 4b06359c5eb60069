use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

pub(crate) async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    if status.is_server_error() {
        log::error!("{} {} -> {} ({:.2?})", method, path, status.as_u16(), start.elapsed());
    } else {
        log::info!("{} {} -> {} ({:.2?})", method, path, status.as_u16(), start.elapsed());
    }
    response
}
