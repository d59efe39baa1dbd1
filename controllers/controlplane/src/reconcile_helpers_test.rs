//! Unit tests for reconcile_helpers module

#[cfg(test)]
mod tests {
    use super::super::*;
    use gcp_client::GcpError;

    async fn found() -> Result<u32, ControllerError> {
        Ok(7)
    }

    async fn missing() -> Result<u32, ControllerError> {
        Err(ControllerError::NotFound("network demo".to_string()))
    }

    async fn unreachable() -> Result<u32, ControllerError> {
        Err(ControllerError::Transient(GcpError::Api {
            status: 503,
            message: "backend unavailable".to_string(),
        }))
    }

    #[tokio::test]
    async fn test_check_existing_found() {
        let result = check_existing("Network", "demo", found()).await.unwrap();
        assert_eq!(result, Some(7));
    }

    #[tokio::test]
    async fn test_check_existing_not_found_is_none() {
        let result = check_existing("Network", "demo", missing()).await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_check_existing_other_errors_propagate() {
        // Only NotFound means absent; a transport error must not look like "does not exist"
        let err = check_existing("Network", "demo", unreachable()).await.unwrap_err();
        assert!(matches!(err, ControllerError::Transient(_)));
    }

    #[tokio::test]
    async fn test_require_existing_missing_is_precondition_failure() {
        let err = require_existing("Cluster", "demo-controlplane", missing()).await.unwrap_err();
        match err {
            ControllerError::PreconditionFailed(message) => {
                assert!(message.contains("Cluster demo-controlplane"), "{}", message);
            }
            other => panic!("expected PreconditionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_require_field() {
        assert!(require_field("Network", "name", "demo").is_ok());
        assert!(matches!(
            require_field("Network", "project", "  "),
            Err(ControllerError::PreconditionFailed(_))
        ));
    }
}
