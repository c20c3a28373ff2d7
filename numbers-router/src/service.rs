use crate::errors::NumbersRouterError;
use crate::response::HandlerBody;
use crate::router::Router;
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// Hyper service in front of the [`Router`]. Never fails a connection;
/// errors are turned into responses by the router.
pub struct NumbersService {
    router: Router,
}

impl NumbersService {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

impl Service<Request<Incoming>> for NumbersService {
    type Response = Response<HandlerBody>;
    type Error = NumbersRouterError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let router = self.router.clone();
        Box::pin(async move { Ok(router.handle(req).await) })
    }
}
