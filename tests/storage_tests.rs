use college_directory::storage::{MockStorageService, S3StorageClient, StorageService, sanitize_key};

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        let result = mock
            .upload("colleges/abc.png", "image/png", b"png".to_vec())
            .await;
        assert!(result.is_ok());

        let url = result.unwrap();
        assert_eq!(url, "http://localhost:9000/mock-bucket/colleges/abc.png");
        assert_eq!(mock.uploaded_keys(), vec!["colleges/abc.png".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        let result = mock.upload("colleges/abc.png", "image/png", vec![]).await;

        assert!(result.is_err());
        assert!(mock.uploaded_keys().is_empty());
    }

    #[tokio::test]
    async fn test_mock_remove_forgets_the_key() {
        let mock = MockStorageService::new();
        mock.upload("colleges/a.png", "image/png", vec![]).await.unwrap();
        mock.upload("colleges/b.png", "image/png", vec![]).await.unwrap();

        mock.remove("colleges/a.png").await.unwrap();

        assert_eq!(mock.uploaded_keys(), vec!["colleges/b.png".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();
        let url = mock
            .upload("../../etc/passwd", "text/plain", vec![])
            .await
            .unwrap();

        assert!(!url.contains(".."));
        assert!(url.ends_with("/etc/passwd"));
    }
}

#[cfg(test)]
mod key_tests {
    use super::*;

    #[test]
    fn test_sanitize_key_drops_navigation_and_empty_segments() {
        assert_eq!(sanitize_key("colleges/x.png"), "colleges/x.png");
        assert_eq!(sanitize_key("/colleges//./x.png"), "colleges/x.png");
        assert_eq!(sanitize_key("../../colleges/../x.png"), "colleges/x.png");
        assert_eq!(sanitize_key(".."), "");
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn test_s3_client_creation() {
        // Construction is offline; no request is sent until an upload.
        let _client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "admin",
            "password",
            "colleges-test",
            "http://localhost:9000/",
        )
        .await;
    }
}
