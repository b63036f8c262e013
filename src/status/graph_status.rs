use parking_lot::Mutex;

use super::code::{combine, StatusCode, StatusKind};

#[derive(Debug, Default)]
struct Inner {
    current: StatusCode,
    errors: Vec<StatusCode>,
    worst_non_error: Option<StatusKind>,
    absorbed: usize,
}

/// Thread-safe accumulator for the graph-level verdict.
///
/// Every completion folds its status in through [`GraphStatus::absorb`] under a
/// single short lock, so concurrent completions are linearized. The reported
/// status follows [`combine`]: the first error absorbed becomes the verdict and
/// stays there. All errors are kept in arrival order for diagnostics.
#[derive(Debug, Default)]
pub struct GraphStatus {
    inner: Mutex<Inner>,
}

impl GraphStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one result in. Returns true when this call turned the verdict into
    /// an error.
    pub fn absorb(&self, status: &StatusCode) -> bool {
        let mut inner = self.inner.lock();
        let was_error = inner.current.is_error();
        inner.absorbed += 1;

        if status.is_error() {
            inner.errors.push(status.clone());
        } else if status.kind() != StatusKind::Ok {
            inner.worst_non_error = inner.worst_non_error.max(Some(status.kind()));
        }

        let current = std::mem::take(&mut inner.current);
        inner.current = combine(current, status.clone());
        !was_error && inner.current.is_error()
    }

    /// Snapshot of the verdict so far.
    pub fn current(&self) -> StatusCode {
        self.inner.lock().current.clone()
    }

    pub fn is_error(&self) -> bool {
        self.inner.lock().current.is_error()
    }

    pub fn is_ok(&self) -> bool {
        self.inner.lock().current.is_ok()
    }

    /// Errors in the order they were absorbed.
    pub fn errors(&self) -> Vec<StatusCode> {
        self.inner.lock().errors.clone()
    }

    /// The most recently absorbed error, if any.
    pub fn last_error(&self) -> Option<StatusCode> {
        self.inner.lock().errors.last().cloned()
    }

    /// Highest non-error severity seen (Info or Warning).
    pub fn worst_non_error(&self) -> Option<StatusKind> {
        self.inner.lock().worst_non_error
    }

    pub fn absorbed(&self) -> usize {
        self.inner.lock().absorbed
    }

    /// Clear back to the identity. Used between runs of the same graph.
    pub fn reset(&self) {
        *self.inner.lock() = Inner::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_starts_ok() {
        let status = GraphStatus::new();
        assert!(status.is_ok());
        assert_eq!(status.current(), StatusCode::ok());
        assert_eq!(status.absorbed(), 0);
    }

    #[test]
    fn test_errors_are_sticky() {
        let status = GraphStatus::new();
        assert!(!status.absorb(&StatusCode::ok()));
        assert!(status.absorb(&StatusCode::error("E1", "first")));
        assert!(!status.absorb(&StatusCode::ok()));
        assert!(!status.absorb(&StatusCode::error("E2", "second")));

        assert_eq!(status.current().code(), "E1");
        assert_eq!(status.last_error().unwrap().code(), "E2");
        assert_eq!(status.errors().len(), 2);
        assert_eq!(status.absorbed(), 4);
    }

    #[test]
    fn test_tracks_warnings() {
        let status = GraphStatus::new();
        status.absorb(&StatusCode::info("I", "k"));
        status.absorb(&StatusCode::warning("W", "k"));
        status.absorb(&StatusCode::info("I", "k"));
        assert_eq!(status.worst_non_error(), Some(StatusKind::Warning));
        assert!(!status.is_error());
    }

    #[test]
    fn test_reset() {
        let status = GraphStatus::new();
        status.absorb(&StatusCode::error("E", "k"));
        status.reset();
        assert!(status.is_ok());
        assert!(status.errors().is_empty());
    }

    #[test]
    fn test_concurrent_absorb_classification() {
        let status = Arc::new(GraphStatus::new());
        let mut handles = vec![];

        for i in 0..16 {
            let status = Arc::clone(&status);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let s = if i == 7 && j == 50 {
                        StatusCode::error("E", "only")
                    } else {
                        StatusCode::ok()
                    };
                    status.absorb(&s);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(status.is_error());
        assert_eq!(status.errors().len(), 1);
        assert_eq!(status.absorbed(), 1600);
    }
}
