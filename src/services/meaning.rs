//! Meaning Service Module
//!
//! A synchronous service, cached through the blocking interception path.

use std::sync::Arc;

use crate::cache::TypedCache;
use crate::interception::{CachingInterceptor, Invocation, MethodDescriptor, ReturnType};
use crate::services::ServiceError;

pub trait MeaningService: Send + Sync {
    /// Slow to compute, never changes.
    fn meaning_of_life(&self) -> Result<i32, ServiceError>;

    /// Has no result, so is never cached.
    fn ponder(&self);
}

impl<S: MeaningService + ?Sized> MeaningService for Arc<S> {
    fn meaning_of_life(&self) -> Result<i32, ServiceError> {
        (**self).meaning_of_life()
    }

    fn ponder(&self) {
        (**self).ponder()
    }
}

pub fn meaning_of_life_method() -> MethodDescriptor {
    MethodDescriptor::new(
        "MeaningService",
        "meaning_of_life",
        &[],
        ReturnType::value::<i32>(),
    )
}

pub fn ponder_method() -> MethodDescriptor {
    MethodDescriptor::new("MeaningService", "ponder", &[], ReturnType::unit())
}

// == Cached Meaning Service ==
pub struct CachedMeaningService<S, C> {
    inner: S,
    interceptor: CachingInterceptor<i32, C>,
    meaning_of_life: MethodDescriptor,
    ponder: MethodDescriptor,
}

impl<S, C> CachedMeaningService<S, C>
where
    S: MeaningService,
    C: TypedCache + 'static,
{
    pub fn new(inner: S, interceptor: CachingInterceptor<i32, C>) -> Self {
        Self {
            inner,
            interceptor,
            meaning_of_life: meaning_of_life_method(),
            ponder: ponder_method(),
        }
    }
}

impl<S, C> MeaningService for CachedMeaningService<S, C>
where
    S: MeaningService,
    C: TypedCache + 'static,
{
    fn meaning_of_life(&self) -> Result<i32, ServiceError> {
        let invocation = Invocation::new(&self.meaning_of_life, vec![]);
        self.interceptor
            .intercept(&invocation, || self.inner.meaning_of_life())
    }

    fn ponder(&self) {
        let invocation = Invocation::new(&self.ponder, vec![]);
        self.interceptor
            .intercept_unit(&invocation, || self.inner.ponder())
    }
}
