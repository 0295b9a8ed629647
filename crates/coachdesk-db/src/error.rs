use coachdesk_core::AppError;
use coachdesk_store::StoreError;

/// Convert a store failure into an application error.
///
/// Path rejections keep their meaning; everything else is a transport
/// failure so callers can never mistake it for a negative answer.
pub(crate) fn from_store_error(context: &str, err: StoreError) -> AppError {
    match err {
        StoreError::InvalidPath(path) => AppError::InvalidPath(path),
        StoreError::NotFound(path) => AppError::NotFound(path),
        other => AppError::transport(context.to_string(), other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_become_transport_errors() {
        let err = from_store_error(
            "read roster",
            StoreError::Unavailable("connection reset".to_string()),
        );
        assert!(matches!(err, AppError::Transport { .. }));
        assert!(!err.is_access_denied());

        let err = from_store_error("read roster", StoreError::InvalidPath("a//b".to_string()));
        assert!(matches!(err, AppError::InvalidPath(_)));
    }
}
