//! Integration tests for the net crate

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use httpmock::prelude::*;
    use indicatif::ProgressBar;
    use sfp_net::*;
    use tempfile::tempdir;

    fn sha_of(content: &[u8]) -> String {
        use sha2::{Digest, Sha256};
        hex::encode(Sha256::digest(content))
    }

    fn test_config() -> Config {
        Config::from_lookup(PathBuf::from("/pkg"), |_| None)
    }

    #[tokio::test]
    async fn manifest_is_fetched_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/manifest.json");
                then.status(200).body(
                    r#"{"version":"7.1.0-abc","builds":{"linux-amd64":{"url":"http://x/a.tar.xz","sha256":"00"}}}"#,
                );
            })
            .await;

        let client = build_http_client(&test_config()).unwrap();
        let fetcher = ManifestFetcher::new(server.url("/manifest.json"), client);

        assert_eq!(fetcher.version().await.unwrap(), "7.1.0-abc");
        let manifest = fetcher.get_manifest().await.unwrap();
        assert_eq!(manifest.builds.len(), 1);

        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn manifest_http_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/manifest.json");
                then.status(503);
            })
            .await;

        let client = build_http_client(&test_config()).unwrap();
        let fetcher = ManifestFetcher::new(server.url("/manifest.json"), client);
        let err = fetcher.get_manifest().await.unwrap_err();
        assert!(matches!(err, SfpError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn malformed_manifest_is_a_parse_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/manifest.json");
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let client = build_http_client(&test_config()).unwrap();
        let fetcher = ManifestFetcher::new(server.url("/manifest.json"), client);
        let err = fetcher.get_manifest().await.unwrap_err();
        assert!(matches!(err, SfpError::Parse(_, _)));
    }

    #[tokio::test]
    async fn download_verifies_and_moves_into_place() {
        let server = MockServer::start_async().await;
        let content = b"archive bytes";
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/sfdx.tar.xz");
                then.status(200)
                    .header("content-length", content.len().to_string())
                    .body(content);
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("sfdx.tar.xz");
        let client = build_http_client(&test_config()).unwrap();

        let path = download_artifact(
            &client,
            &server.url("/sfdx.tar.xz"),
            &dest,
            &sha_of(content),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(path, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), content);
        // Only the final artifact remains; the suffixed temp file was renamed.
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn download_with_wrong_checksum_leaves_nothing_behind() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/sfdx.tar.xz");
                then.status(200).body("tampered");
            })
            .await;

        let temp = tempdir().unwrap();
        let dest = temp.path().join("sfdx.tar.xz");
        let client = build_http_client(&test_config()).unwrap();

        let err = download_artifact(
            &client,
            &server.url("/sfdx.tar.xz"),
            &dest,
            &sha_of(b"the real thing"),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SfpError::ChecksumMismatch(_)));
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn download_status_error_is_fatal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.tar.xz");
                then.status(404);
            })
            .await;

        let temp = tempdir().unwrap();
        let client = build_http_client(&test_config()).unwrap();
        let err = download_artifact(
            &client,
            &server.url("/missing.tar.xz"),
            &temp.path().join("missing.tar.xz"),
            "00",
            &ProgressBar::hidden(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SfpError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn user_agent_from_config_is_sent() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/manifest.json")
                    .header("user-agent", "npm/10.2.0 node/v20.0.0 linux x64");
                then.status(200).body(r#"{"version":"1.0.0","builds":{}}"#);
            })
            .await;

        let mut config = test_config();
        config.user_agent = "npm/10.2.0 node/v20.0.0 linux x64".to_string();
        let client = build_http_client(&config).unwrap();
        let fetcher = ManifestFetcher::new(server.url("/manifest.json"), client);
        fetcher.get_manifest().await.unwrap();

        mock.assert_async().await;
    }
}
