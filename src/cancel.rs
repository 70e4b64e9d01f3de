use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared early-close signal for an input source.
///
/// Cloning yields a handle to the same flag. Once cancelled, a
/// [`Documents`](crate::reader::Documents) reader stops at the next document
/// boundary and an [`Engine`](crate::engine::Engine) stops before emitting
/// its next value.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[test]
fn test_clones_share_flag() {
    let token = CancelToken::new();
    let handle = token.clone();
    assert!(!handle.is_cancelled());
    token.cancel();
    assert!(handle.is_cancelled());
}
