//! End-to-end checks of the client over real HTTP against a mock server.

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use bytes::Bytes;
    use wiremock::{
        Match, Mock, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use crate::codec::{DEFAULT_FILENAME, FileHandle};
    use crate::error::{ClientError, FailureKind, TransportError};
    use crate::protocol::{Identifier, Operation, ProtocolVariant, RetrieveResult, StoreInput};
    use crate::test_utils::TestContext;

    /// Matches a multipart body carrying one `file` part with the given name.
    struct MultipartFile {
        filename: &'static str,
        content: &'static [u8],
    }

    impl Match for MultipartFile {
        fn matches(&self, request: &wiremock::Request) -> bool {
            let is_multipart = request
                .headers
                .get("content-type")
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.starts_with("multipart/form-data"));
            let body = String::from_utf8_lossy(&request.body);
            let disposition =
                format!(r#"name="file"; filename="{}""#, self.filename);
            let content = String::from_utf8_lossy(self.content);

            is_multipart && body.contains(&disposition) && body.contains(content.as_ref())
        }
    }

    /// Matches the JSON document embedded in the `data` query parameter.
    struct DataQuery(serde_json::Value);

    impl Match for DataQuery {
        fn matches(&self, request: &wiremock::Request) -> bool {
            request
                .url
                .query_pairs()
                .find(|(name, _)| name == "data")
                .and_then(|(_, value)| serde_json::from_str::<serde_json::Value>(&value).ok())
                .is_some_and(|data| data == self.0)
        }
    }

    #[tokio::test]
    async fn test_multipart_store_sends_one_file_part() {
        let test_ctx = TestContext::new(ProtocolVariant::Multipart).await;

        Mock::given(method("POST"))
            .and(path("/store/"))
            .and(MultipartFile {
                filename: "notes.txt",
                content: b"hello over the wire",
            })
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "hash": "abc123" })),
            )
            .expect(1)
            .mount(&test_ctx.mock_server)
            .await;

        let file = FileHandle::from_bytes("notes.txt", "text/plain", b"hello over the wire".to_vec());
        let stored = test_ctx.client.store(StoreInput::file(file)).await.unwrap();

        assert_eq!(stored.identifier, Identifier::Hash("abc123".into()));
        assert_eq!(stored.body["hash"], "abc123");
        assert_eq!(test_ctx.diagnostics.successes(), vec![Operation::Store]);
    }

    #[tokio::test]
    async fn test_multipart_store_streams_file_from_disk() {
        let test_ctx = TestContext::new(ProtocolVariant::Multipart).await;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("disk.csv");
        std::fs::write(&file_path, b"id,name\n1,blob\n").unwrap();

        Mock::given(method("POST"))
            .and(path("/store/"))
            .and(MultipartFile {
                filename: "disk.csv",
                content: b"id,name\n1,blob\n",
            })
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "hash": "csv1" })),
            )
            .expect(1)
            .mount(&test_ctx.mock_server)
            .await;

        let file = FileHandle::from_path(&file_path).unwrap();
        let stored = test_ctx.client.store(StoreInput::file(file)).await.unwrap();

        assert_eq!(stored.identifier, Identifier::Hash("csv1".into()));
    }

    #[tokio::test]
    async fn test_multipart_store_of_missing_file_sends_nothing() {
        let test_ctx = TestContext::new(ProtocolVariant::Multipart).await;
        test_ctx.mock_store_hash("unused").await;
        let dir = tempfile::tempdir().unwrap();

        let file = FileHandle::from_path(dir.path().join("gone.bin")).unwrap();
        let err = test_ctx.client.store(StoreInput::file(file)).await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::Read);
        assert!(test_ctx.mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_multipart_store_error_status() {
        let test_ctx = TestContext::new(ProtocolVariant::Multipart).await;
        test_ctx.mock_store_error(413, "payload too large").await;

        let file = FileHandle::from_bytes("big.bin", "", vec![0u8; 16]);
        let err = test_ctx.client.store(StoreInput::file(file)).await.unwrap_err();

        match err {
            ClientError::Transport(TransportError::Status { status, body }) => {
                assert_eq!(status, 413);
                assert_eq!(body, "payload too large");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            test_ctx.diagnostics.failures(),
            vec![(Operation::Store, FailureKind::Transport)]
        );
        assert!(test_ctx.client.can_store());
    }

    #[tokio::test]
    async fn test_data_url_store_uses_query_parameters() {
        let test_ctx = TestContext::new(ProtocolVariant::DataUrlQuery).await;

        Mock::given(method("GET"))
            .and(path("/store/"))
            .and(query_param("key", "greeting"))
            .and(DataQuery(serde_json::json!({
                "key": "greeting",
                "data": "hi.txt",
                "file": "data:text/plain;base64,aGk=",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .expect(1)
            .mount(&test_ctx.mock_server)
            .await;

        let file = FileHandle::from_bytes("hi.txt", "text/plain", b"hi".to_vec());
        let stored = test_ctx
            .client
            .store(StoreInput::file(file).with_key("greeting"))
            .await
            .unwrap();

        assert_eq!(stored.identifier, Identifier::Key("greeting".into()));
    }

    #[tokio::test]
    async fn test_retrieve_raw_with_spaced_filename() {
        let test_ctx = TestContext::new(ProtocolVariant::Multipart).await;
        test_ctx
            .mock_retrieve_raw("abc123", b"%PDF-1.7", Some("report final.pdf"))
            .await;

        let result = test_ctx
            .client
            .retrieve(&Identifier::Hash("abc123".into()))
            .await
            .unwrap();

        let file = result.into_file().unwrap();
        assert_eq!(file.filename, "report final.pdf");
        assert_eq!(file.mime_type, "application/octet-stream");
        assert_eq!(file.bytes, Bytes::from_static(b"%PDF-1.7"));
    }

    #[tokio::test]
    async fn test_retrieve_raw_without_disposition() {
        let test_ctx = TestContext::new(ProtocolVariant::Multipart).await;
        test_ctx.mock_retrieve_raw("abc123", b"\x00\x01", None).await;

        let file = test_ctx
            .client
            .retrieve(&Identifier::Hash("abc123".into()))
            .await
            .unwrap()
            .into_file()
            .unwrap();
        assert_eq!(file.filename, DEFAULT_FILENAME);
    }

    #[tokio::test]
    async fn test_retrieve_json_envelope() {
        let test_ctx = TestContext::new(ProtocolVariant::DataUrlQuery).await;
        test_ctx
            .mock_retrieve_json(
                "greeting",
                serde_json::json!({ "file": "data:image/png;base64,iVBORw==" }),
            )
            .await;

        let file = test_ctx
            .client
            .retrieve(&Identifier::Key("greeting".into()))
            .await
            .unwrap()
            .into_file()
            .unwrap();
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.bytes, Bytes::from_static(b"\x89PNG"));
        assert_eq!(file.filename, DEFAULT_FILENAME);
    }

    #[tokio::test]
    async fn test_retrieve_missing() {
        let test_ctx = TestContext::new(ProtocolVariant::Multipart).await;
        test_ctx.mock_retrieve_missing().await;

        let result = test_ctx
            .client
            .retrieve(&Identifier::Hash("nope".into()))
            .await
            .unwrap();
        assert_eq!(result, RetrieveResult::NotFound);
        assert!(test_ctx.diagnostics.failures().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_network_failure() {
        let test_ctx = TestContext::new(ProtocolVariant::Multipart).await;
        let uri = test_ctx.mock_server.uri();
        drop(test_ctx);

        let client = crate::StoreRetrieveClient::with_http(crate::ClientConfig::new(
            uri,
            ProtocolVariant::Multipart,
        ));
        let err = client
            .retrieve(&Identifier::Hash("abc".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(TransportError::Network(_))));
    }
}
