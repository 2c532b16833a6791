/// Bearer Authentication Middleware
///
/// Runs the bearer token strategy for every request it wraps and injects
/// the resulting `AuthenticatedSession` into request extensions.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::{authenticate_bearer, bearer_token, TokenCodec};
use crate::store::UserStore;

/// Token strategy guard for protected routes
#[derive(Clone)]
pub struct BearerAuth {
    store: Arc<dyn UserStore>,
    codec: Arc<TokenCodec>,
}

impl BearerAuth {
    pub fn new(store: Arc<dyn UserStore>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(BearerAuthService {
            service: Rc::new(service),
            store: self.store.clone(),
            codec: self.codec.clone(),
        }))
    }
}

pub struct BearerAuthService<S> {
    service: Rc<S>,
    store: Arc<dyn UserStore>,
    codec: Arc<TokenCodec>,
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
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
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let service = self.service.clone();
        let store = self.store.clone();
        let codec = self.codec.clone();

        Box::pin(async move {
            let session = authenticate_bearer(store.as_ref(), &codec, token.as_deref()).await?;

            tracing::debug!(user_id = %session.account.id, "Bearer token accepted");
            req.extensions_mut().insert(session);

            service.call(req).await
        })
    }
}
