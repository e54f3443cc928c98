//! End-to-end tests of the session controller against a mock backend

mod test_utils;

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use marahel::backend::{BackendError, BackendFlavor};
    use marahel::session::{Role, Session, SessionState, Turn};

    use crate::test_utils::{test_batch, test_controller, unresponsive_server};

    /// Tests a successful ingest produces a session from the `data` object
    #[tokio::test]
    async fn it_creates_a_session_from_an_ingest() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/Ingestion_File")
            .match_query(Matcher::UrlEncoded("Embeddings_model".into(), "openai".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"filename="policy.txt""#.into()),
                Matcher::Regex(r#"filename="handbook.pdf""#.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": {"collection_name": "abc123", "Embeddings_model": "openai"}}"#)
            .create_async()
            .await;

        let (_dir, batch) = test_batch().await;
        let mut controller = test_controller(&server.url(), BackendFlavor::Collection, None);
        let session = controller.ingest(&batch, "openai", None).await.unwrap().clone();

        mock.assert_async().await;
        assert_eq!(session, Session::new("abc123").with_secondary_key("openai"));
        assert_eq!(controller.state(), SessionState::Active);
    }

    /// Tests a rejected ingest surfaces the backend message and leaves
    /// no session behind
    #[tokio::test]
    async fn it_reports_a_failed_ingest() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/Ingestion_File")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"message": "disk full"}"#)
            .create_async()
            .await;

        let (_dir, batch) = test_batch().await;
        let mut controller = test_controller(&server.url(), BackendFlavor::Collection, None);
        let err = controller.ingest(&batch, "openai", None).await.unwrap_err();

        assert!(err.is_application());
        assert!(err.to_string().contains("disk full"));
        assert!(controller.session().is_none());
        assert_eq!(controller.state(), SessionState::NoSession);
    }

    /// Tests a failed ingest after a successful one keeps the earlier
    /// session and its transcript
    #[tokio::test]
    async fn it_keeps_the_previous_session_when_a_later_ingest_fails() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("POST", "/api/Ingestion_File")
            .match_query(Matcher::UrlEncoded("Embeddings_model".into(), "openai".into()))
            .with_status(200)
            .with_body(r#"{"data": {"collection_name": "abc123", "Embeddings_model": "openai"}}"#)
            .create_async()
            .await;
        let _failed = server
            .mock("POST", "/api/Ingestion_File")
            .match_query(Matcher::UrlEncoded(
                "Embeddings_model".into(),
                "asafaya/bert-base-arabic".into(),
            ))
            .with_status(503)
            .with_body("Service Unavailable")
            .create_async()
            .await;
        let _chat = server
            .mock("POST", "/api/chat-bot")
            .with_status(200)
            .with_body(r#"{"data": "X is Y"}"#)
            .create_async()
            .await;

        let (_dir, batch) = test_batch().await;
        let mut controller = test_controller(&server.url(), BackendFlavor::Collection, None);
        controller.ingest(&batch, "openai", None).await.unwrap();
        controller.converse("What is X?").await.unwrap();

        let err = controller
            .ingest(&batch, "asafaya/bert-base-arabic", None)
            .await
            .unwrap_err();

        assert_eq!(err, BackendError::application(503, "request failed with HTTP status 503"));
        assert_eq!(controller.session().unwrap().session_key, "abc123");
        assert_eq!(controller.transcript().len(), 2);
    }

    /// Tests conversing records the question and the answer in order
    #[tokio::test]
    async fn it_records_a_conversation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat-bot")
            .match_body(Matcher::Json(json!({
                "query": "What is X?",
                "collection_name": "abc123",
                "Embeddings_model": "openai"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": "X is Y"}"#)
            .create_async()
            .await;

        let mut controller = test_controller(&server.url(), BackendFlavor::Collection, None);
        controller.attach(Session::new("abc123").with_secondary_key("openai"));
        let turn = controller.converse("What is X?").await.unwrap();

        mock.assert_async().await;
        assert_eq!(turn, Turn::assistant("X is Y"));
        assert_eq!(
            controller.transcript().turns(),
            &[Turn::user("What is X?"), Turn::assistant("X is Y")]
        );
    }

    /// Tests conversing without a session never reaches the backend
    #[tokio::test]
    async fn it_refuses_to_converse_without_a_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat-bot")
            .expect(0)
            .create_async()
            .await;

        let mut controller = test_controller(&server.url(), BackendFlavor::Collection, None);
        let err = controller.converse("What is X?").await.unwrap_err();

        mock.assert_async().await;
        assert!(err.is_validation());
        assert!(controller.transcript().is_empty());
    }

    /// Tests a timed out question still gets an assistant turn with
    /// the error text
    #[tokio::test]
    async fn it_records_a_timeout_in_the_transcript() {
        let url = unresponsive_server().await;
        let mut controller = test_controller(&url, BackendFlavor::Collection, None);
        controller.attach(Session::new("abc123").with_secondary_key("openai"));

        let err = controller.converse("What is X?").await.unwrap_err();

        assert!(err.is_transport());
        let turns = controller.transcript().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Turn::user("What is X?"));
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, err.to_string());
        assert_eq!(controller.state(), SessionState::Active);
    }

    /// Tests every question gets exactly one answer turn, whatever the
    /// outcome
    #[tokio::test]
    async fn it_appends_two_turns_per_question() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("POST", "/api/chat-bot")
            .match_body(Matcher::PartialJson(json!({"query": "good"})))
            .with_status(200)
            .with_body(r#"{"data": "fine"}"#)
            .create_async()
            .await;
        let _bad = server
            .mock("POST", "/api/chat-bot")
            .match_body(Matcher::PartialJson(json!({"query": "bad"})))
            .with_status(400)
            .with_body(r#"{"message": "collection not found"}"#)
            .create_async()
            .await;

        let mut controller = test_controller(&server.url(), BackendFlavor::Collection, None);
        controller.attach(Session::new("abc123").with_secondary_key("openai"));

        for (i, question) in ["good", "bad", "good"].iter().enumerate() {
            let _ = controller.converse(question).await;
            assert_eq!(controller.transcript().len(), (i + 1) * 2);
        }

        let contents: Vec<&str> = controller
            .transcript()
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(
            contents,
            vec!["good", "fine", "bad", "Error: collection not found", "good", "fine"]
        );
    }

    /// Tests deleting the active collection resets the controller
    #[tokio::test]
    async fn it_resets_after_deleting_a_collection() {
        let mut server = mockito::Server::new_async().await;
        let _chat = server
            .mock("POST", "/api/chat-bot")
            .with_status(200)
            .with_body(r#"{"data": "X is Y"}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/delete-collection")
            .match_query(Matcher::UrlEncoded("collection_name".into(), "abc123".into()))
            .with_status(200)
            .with_body(r#"{"message": "Collection deleted successfully"}"#)
            .create_async()
            .await;

        let mut controller = test_controller(&server.url(), BackendFlavor::Collection, None);
        controller.attach(Session::new("abc123").with_secondary_key("openai"));
        controller.converse("What is X?").await.unwrap();

        controller.delete_active_collection().await.unwrap();

        delete.assert_async().await;
        assert_eq!(controller.state(), SessionState::NoSession);
        assert!(controller.transcript().is_empty());
    }

    /// Tests a failed delete leaves the session and transcript alone
    #[tokio::test]
    async fn it_keeps_state_when_a_delete_fails() {
        let mut server = mockito::Server::new_async().await;
        let _chat = server
            .mock("POST", "/api/chat-bot")
            .with_status(200)
            .with_body(r#"{"data": "X is Y"}"#)
            .create_async()
            .await;
        let _delete = server
            .mock("DELETE", "/api/delete-collection")
            .match_body(Matcher::Json(json!({"uuid": "5f1c"})))
            .with_status(404)
            .with_body(r#"{"message": "no such collection"}"#)
            .create_async()
            .await;

        let mut controller = test_controller(&server.url(), BackendFlavor::Uuid, None);
        controller.attach(Session::new("5f1c").with_secondary_key("gpt-4o-mini"));
        controller.converse("What is X?").await.unwrap();

        let err = controller.delete_active_collection().await.unwrap_err();

        assert!(err.to_string().contains("no such collection"));
        assert_eq!(controller.session().unwrap().session_key, "5f1c");
        assert_eq!(controller.transcript().len(), 2);
    }

    /// Tests the uuid flavor ingests with form fields and converses
    /// with the configured language model
    #[tokio::test]
    async fn it_runs_the_uuid_flavor() {
        let mut server = mockito::Server::new_async().await;
        let ingest = server
            .mock("POST", "/api/Ingestion_File")
            .match_body(Matcher::Regex(r#"name="Embeddings_model""#.into()))
            .with_status(200)
            .with_body(r#"{"uuid": "5f1c-77"}"#)
            .create_async()
            .await;
        let chat = server
            .mock("POST", "/api/chat-bot")
            .match_body(Matcher::Json(json!({
                "query": "Summarise",
                "uuid": "5f1c-77",
                "llm_model": "gpt-4o-mini"
            })))
            .with_status(200)
            .with_body(r#"{"data": "A summary"}"#)
            .create_async()
            .await;

        let (_dir, batch) = test_batch().await;
        let mut controller = test_controller(&server.url(), BackendFlavor::Uuid, None);
        controller.ingest(&batch, "openai", None).await.unwrap();
        let turn = controller.converse("Summarise").await.unwrap();

        ingest.assert_async().await;
        chat.assert_async().await;
        assert_eq!(turn.content, "A summary");
    }

    /// Tests the chatbot flavor sends the hint on ingest and the user
    /// id on every question
    #[tokio::test]
    async fn it_runs_the_chatbot_flavor() {
        let mut server = mockito::Server::new_async().await;
        let ingest = server
            .mock("POST", "/api/Ingestion_File")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="chatbot_id""#.into()),
                Matcher::Regex("support-bot".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data": {"chatbot_id": "support-bot", "Embeddings_model": "openai"}}"#)
            .create_async()
            .await;
        let chat = server
            .mock("POST", "/api/chat-bot")
            .match_body(Matcher::Json(json!({
                "query": "Hello",
                "chatbot_id": "support-bot",
                "user_id": "user-1"
            })))
            .with_status(200)
            .with_body(r#"{"data": "Hi there"}"#)
            .create_async()
            .await;

        let (_dir, batch) = test_batch().await;
        let mut controller = test_controller(&server.url(), BackendFlavor::Chatbot, Some("user-1"));
        let session = controller
            .ingest(&batch, "openai", Some("support-bot"))
            .await
            .unwrap();
        assert_eq!(session.user_id.as_deref(), Some("user-1"));

        let turn = controller.converse("Hello").await.unwrap();

        ingest.assert_async().await;
        chat.assert_async().await;
        assert_eq!(turn.content, "Hi there");
    }

    /// Tests the chatbot flavor refuses to converse without a user id
    #[tokio::test]
    async fn it_requires_a_user_id_for_the_chatbot_flavor() {
        let mut server = mockito::Server::new_async().await;
        let chat = server
            .mock("POST", "/api/chat-bot")
            .expect(0)
            .create_async()
            .await;

        let mut controller = test_controller(&server.url(), BackendFlavor::Chatbot, None);
        controller.attach(Session::new("support-bot"));
        let err = controller.converse("Hello").await.unwrap_err();

        chat.assert_async().await;
        assert!(err.is_validation());
        assert!(controller.transcript().is_empty());
    }
}
