use crate::models::{DecodeOutcome, RasterImage};
use crate::pipeline::CancelToken;
use std::time::{Duration, Instant};

/// Wall-clock deadline and cancellation flag for one engine call
#[derive(Debug, Clone, Default)]
pub struct CallLimit {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl CallLimit {
    /// No deadline, not cancellable
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Stop at `deadline` or when `cancel` fires, whichever comes first
    pub fn new(deadline: Instant, cancel: CancelToken) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: Some(cancel),
        }
    }

    /// Stop after `timeout` from now
    pub fn within(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: None,
        }
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Deadline passed or scan cancelled
    pub fn is_expired(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
            || self.remaining().is_some_and(|left| left.is_zero())
    }
}

/// One barcode reading strategy
///
/// Engines never fail: anything that goes wrong inside one is reported as
/// [`DecodeOutcome::NotFound`] so the cascade can move on.
pub trait DecodeEngine: Send + Sync {
    /// Short stable name used in reports and logs
    fn name(&self) -> &'static str;

    /// Read one raster
    fn decode(&self, image: &RasterImage) -> DecodeOutcome;

    /// Read one raster, giving up once `limit` expires
    ///
    /// In-process engines finish their call; engines that wait on another
    /// process override this and stop waiting at the limit.
    fn decode_within(&self, image: &RasterImage, limit: &CallLimit) -> DecodeOutcome {
        let _ = limit;
        self.decode(image)
    }
}

impl<E: DecodeEngine + ?Sized> DecodeEngine for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode(&self, image: &RasterImage) -> DecodeOutcome {
        (**self).decode(image)
    }

    fn decode_within(&self, image: &RasterImage, limit: &CallLimit) -> DecodeOutcome {
        (**self).decode_within(image, limit)
    }
}

impl<E: DecodeEngine + ?Sized> DecodeEngine for std::sync::Arc<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode(&self, image: &RasterImage) -> DecodeOutcome {
        (**self).decode(image)
    }

    fn decode_within(&self, image: &RasterImage, limit: &CallLimit) -> DecodeOutcome {
        (**self).decode_within(image, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_limit_expiry() {
        assert!(!CallLimit::unbounded().is_expired());
        assert_eq!(CallLimit::unbounded().remaining(), None);
        assert!(CallLimit::within(Duration::ZERO).is_expired());
        assert!(!CallLimit::within(Duration::from_secs(60)).is_expired());

        let cancel = CancelToken::new();
        let limit = CallLimit::new(Instant::now() + Duration::from_secs(60), cancel.clone());
        assert!(!limit.is_expired());
        cancel.cancel();
        assert!(limit.is_expired());
    }
}
