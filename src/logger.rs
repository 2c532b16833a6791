use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::time::Instant;
use tracing::Instrument;

/// Request logging middleware
///
/// Opens a span per request carrying a fresh request id and logs method,
/// path, status and latency on completion.
pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = LoggerMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(LoggerMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let span = tracing::info_span!(
            "http_request",
            request_id = %uuid::Uuid::new_v4(),
            method = %method,
            path = %path,
        );

        tracing::debug!(parent: &span, "Request started");

        let service = self.service.clone();

        Box::pin(
            async move {
                let result = service.call(req).await;
                let elapsed_ms = start_time.elapsed().as_millis() as u64;

                match &result {
                    Ok(res) => tracing::info!(
                        status = res.status().as_u16(),
                        elapsed_ms,
                        "Request completed"
                    ),
                    Err(e) => tracing::info!(
                        status = e.as_response_error().status_code().as_u16(),
                        elapsed_ms,
                        "Request rejected"
                    ),
                }

                result
            }
            .instrument(span),
        )
    }
}
