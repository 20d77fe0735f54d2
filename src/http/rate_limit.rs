use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tower::{Layer, Service};
use uuid::Uuid;

use super::identity::Identity;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A per-identity token bucket. Hand-rolled as a plain `tower::Layer`/
/// `Service` pair rather than pulling in a rate-limiting crate.
#[derive(Clone)]
pub struct RateLimitLayer {
    capacity: f64,
    refill_per_second: f64,
    buckets: Arc<DashMap<Uuid, Mutex<Bucket>>>,
}

impl RateLimitLayer {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            capacity: requests_per_second as f64,
            refill_per_second: requests_per_second as f64,
            buckets: Arc::new(DashMap::new()),
        }
    }

    fn try_acquire(&self, identity: Uuid) -> bool {
        let now = Instant::now();
        let entry = self.buckets.entry(identity).or_insert_with(|| {
            Mutex::new(Bucket { tokens: self.capacity, last_refill: now })
        });
        let mut bucket = entry.lock().unwrap();

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_second).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimit<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimit { inner, limiter: self.clone() }
    }
}

#[derive(Clone)]
pub struct RateLimit<S> {
    inner: S,
    limiter: RateLimitLayer,
}

impl<S> Service<Request<Body>> for RateLimit<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let identity = request.extensions().get::<Identity>().copied();
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();
        std::mem::swap(&mut self.inner, &mut inner);

        Box::pin(async move {
            let allowed = match identity {
                Some(Identity(id)) => limiter.try_acquire(id),
                // No identity on the request (identity middleware not
                // installed ahead of this layer). Fail open rather than
                // reject every request.
                None => true,
            };

            if allowed {
                inner.call(request).await
            } else {
                Ok((StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response())
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_n_requests_pass_then_the_bucket_empties() {
        let layer = RateLimitLayer::new(3);
        let id = Uuid::new_v4();
        assert!(layer.try_acquire(id));
        assert!(layer.try_acquire(id));
        assert!(layer.try_acquire(id));
        assert!(!layer.try_acquire(id));
    }

    #[test]
    fn separate_identities_have_independent_buckets() {
        let layer = RateLimitLayer::new(1);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(layer.try_acquire(a));
        assert!(layer.try_acquire(b));
    }
}
