use serde_json::json;

use super::*;
use crate::models::{FunctionCall, JsonMap, Role, ToolCall};
use crate::views::NoticeKind;
use crate::views::fake::{Call, FakeApi};

fn form(id: &str, status: Option<i64>) -> Form {
    Form {
        id: id.to_string(),
        name: Some("Ada".to_string()),
        email: Some("ada@example.com".to_string()),
        phone_number: None,
        status,
        created_at: Some("2024-05-01T10:00:00".to_string()),
    }
}

fn assistant(text: &str) -> Message {
    Message {
        role: Role::Assistant,
        content: Some(Some(text.to_string())),
        tool_calls: None,
        extra: JsonMap::new(),
    }
}

fn assistant_calling(name: &str) -> Message {
    Message {
        role: Role::Assistant,
        content: Some(None),
        tool_calls: Some(Some(vec![ToolCall {
            function: FunctionCall {
                name: name.to_string(),
                arguments: r#"{"name":"Ada"}"#.to_string(),
                extra: JsonMap::new(),
            },
            extra: JsonMap::new(),
        }])),
        extra: JsonMap::new(),
    }
}

async fn loaded(api: &FakeApi) -> ChatDetail {
    let mut detail = ChatDetail::new("c1");
    detail.load(api).await;
    api.clear_calls();
    detail
}

mod send_tests {
    use super::*;

    #[tokio::test]
    async fn hello_replaces_transcript_and_raises_refetch() {
        let reply = vec![
            Message::user("hello"),
            assistant_calling("create_form"),
            assistant("Hi! I created a form for you."),
        ];
        let api = FakeApi::default().with_reply(reply.clone());
        let mut detail = loaded(&api).await;
        detail.set_input("hello");

        let outcome = detail.send_message(&api).await;
        assert!(matches!(outcome, SendOutcome::Sent));

        let calls = api.calls();
        let [Call::SendMessages(chat_id, sent)] = calls.as_slice() else {
            panic!("unexpected calls: {calls:?}");
        };
        assert_eq!(chat_id, "c1");
        assert_eq!(
            serde_json::to_value(sent).expect("serialize"),
            json!([{ "role": "user", "content": "hello" }])
        );

        assert_eq!(detail.transcript(), reply.as_slice());
        assert_eq!(detail.input(), "");
        assert!(detail.forms_refresh_pending());

        api.clear_calls();
        assert!(detail.revalidate(&api).await);
        assert_eq!(api.calls(), vec![Call::ListForms("c1".to_string(), None)]);
        assert!(!detail.forms_refresh_pending());
    }

    #[tokio::test]
    async fn whole_transcript_is_sent() {
        let api = FakeApi::default()
            .with_transcript(vec![Message::user("hi"), assistant("hello")])
            .with_reply(Vec::new());
        let mut detail = loaded(&api).await;
        detail.set_input("next");

        detail.send_message(&api).await;

        let calls = api.calls();
        let [Call::SendMessages(_, sent)] = calls.as_slice() else {
            panic!("unexpected calls: {calls:?}");
        };
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[2], Message::user("next"));
    }

    #[tokio::test]
    async fn empty_input_is_skipped() {
        let api = FakeApi::default();
        let mut detail = loaded(&api).await;

        assert!(matches!(
            detail.send_message(&api).await,
            SendOutcome::Skipped
        ));
        assert!(api.calls().is_empty());
        assert!(detail.transcript().is_empty());
    }

    #[tokio::test]
    async fn failed_send_keeps_optimistic_message() {
        let api = FakeApi::default().failing("send_messages", 500, json!({ "detail": "boom" }));
        let mut detail = loaded(&api).await;
        detail.set_input("hello");

        let outcome = detail.send_message(&api).await;
        assert!(matches!(outcome, SendOutcome::Failed(_)));
        assert_eq!(detail.transcript(), &[Message::user("hello")]);
        assert_eq!(detail.input(), "");
        assert!(!detail.forms_refresh_pending());
        assert!(detail.status().is_some());
    }

    #[tokio::test]
    async fn staged_message_is_visible_before_the_reply() {
        let api = FakeApi::default().with_transcript(vec![assistant("Welcome")]);
        let mut detail = loaded(&api).await;
        detail.set_input("hello");

        let body = detail.stage_message().expect("loaded").expect("input");
        assert_eq!(body, vec![assistant("Welcome"), Message::user("hello")]);
        assert_eq!(detail.transcript(), body.as_slice());
        assert_eq!(detail.input(), "");
        assert!(api.calls().is_empty());

        let reply = vec![
            assistant("Welcome"),
            Message::user("hello"),
            assistant("Hi!"),
        ];
        assert!(matches!(
            detail.apply_reply(Ok(reply.clone())),
            SendOutcome::Sent
        ));
        assert_eq!(detail.transcript(), reply.as_slice());
        assert!(detail.forms_refresh_pending());
    }

    #[test]
    fn staging_empty_input_does_nothing() {
        let mut detail = ChatDetail::new("c1");
        assert!(matches!(detail.stage_message(), Ok(None)));
        assert!(detail.transcript().is_empty());
    }

    #[tokio::test]
    async fn unloaded_history_is_never_overwritten() {
        let api = FakeApi::default()
            .with_transcript(vec![assistant("earlier")])
            .failing("get_chat", 500, json!({ "detail": "db down" }));
        let mut detail = ChatDetail::new("c1");
        detail.load_conversation(&api).await;
        assert!(!detail.conversation_loaded());
        api.clear_calls();
        detail.set_input("hello");

        let outcome = detail.send_message(&api).await;
        assert!(matches!(outcome, SendOutcome::Failed(Error::Other(_))));
        assert!(api.calls().is_empty());
        assert!(detail.transcript().is_empty());
        assert_eq!(detail.input(), "hello");
        assert_eq!(detail.status(), Some(HISTORY_NOT_LOADED));
    }
}

mod edit_tests {
    use super::*;

    #[tokio::test]
    async fn cancel_leaves_forms_untouched() {
        let api = FakeApi::default().with_forms(vec![form("f1", Some(1))]);
        let mut detail = loaded(&api).await;

        assert!(detail.begin_edit("f1"));
        detail.update_draft(DraftField::Name("Grace".to_string()));
        detail.update_draft(DraftField::Status(Some(FormStatus::Completed)));
        detail.cancel_edit();

        assert!(detail.editing().is_none());
        assert_eq!(detail.forms(), &[form("f1", Some(1))]);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_form_cannot_be_edited() {
        let api = FakeApi::default();
        let mut detail = loaded(&api).await;

        assert!(!detail.begin_edit("missing"));
        assert!(detail.editing().is_none());
    }

    #[tokio::test]
    async fn save_sends_full_draft() {
        let api = FakeApi::default().with_forms(vec![form("f1", None)]);
        let mut detail = loaded(&api).await;

        detail.begin_edit("f1");
        detail.update_draft(DraftField::PhoneNumber("555".to_string()));
        assert!(detail.save_edit(&api).await);

        let expected = FormUpdate {
            name: Some("Ada".to_string()),
            email: Some("ada@example.com".to_string()),
            phone_number: Some("555".to_string()),
            status: None,
        };
        assert_eq!(
            api.calls(),
            vec![Call::UpdateForm("f1".to_string(), expected)]
        );
        assert!(detail.editing().is_none());
        assert_eq!(detail.notice(), Some(&Notice::success(UPDATE_SUCCEEDED)));
        assert!(detail.forms_refresh_pending());
    }

    #[tokio::test]
    async fn failed_save_stays_in_edit_mode() {
        let api = FakeApi::default()
            .with_forms(vec![form("f1", None)])
            .failing("update_form", 404, json!({ "detail": "Form not found" }));
        let mut detail = loaded(&api).await;

        detail.begin_edit("f1");
        assert!(!detail.save_edit(&api).await);

        assert_eq!(detail.editing().map(|e| e.form_id.as_str()), Some("f1"));
        let notice = detail.dismiss_notice().expect("notice");
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Error: Form not found");
        assert!(!detail.forms_refresh_pending());
    }

    #[tokio::test]
    async fn save_error_without_detail_uses_fallback() {
        let api = FakeApi::default()
            .with_forms(vec![form("f1", None)])
            .failing("update_form", 422, json!({ "detail": [{ "msg": "bad" }] }));
        let mut detail = loaded(&api).await;

        detail.begin_edit("f1");
        detail.save_edit(&api).await;

        assert_eq!(
            detail.notice().map(|n| n.message.as_str()),
            Some("Error: Failed to update form")
        );
    }
}

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn declined_delete_sends_nothing() {
        let api = FakeApi::default().with_forms(vec![form("f1", None)]);
        let mut detail = loaded(&api).await;

        detail.request_delete("f1");
        assert_eq!(detail.pending_delete(), Some("f1"));
        detail.decline_delete();

        assert!(detail.pending_delete().is_none());
        assert!(!detail.confirm_delete(&api).await);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn confirmed_delete_refetches_forms() {
        let api = FakeApi::default().with_forms(vec![form("f1", None)]);
        let mut detail = loaded(&api).await;

        detail.request_delete("f1");
        assert!(detail.confirm_delete(&api).await);
        assert_eq!(detail.notice(), Some(&Notice::success(DELETE_SUCCEEDED)));

        detail.revalidate(&api).await;
        assert_eq!(
            api.calls(),
            vec![
                Call::DeleteForm("f1".to_string()),
                Call::ListForms("c1".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn failed_delete_reports_detail() {
        let api = FakeApi::default()
            .with_forms(vec![form("f1", None)])
            .failing("delete_form", 404, json!({ "detail": "Form not found" }));
        let mut detail = loaded(&api).await;

        detail.request_delete("f1");
        assert!(!detail.confirm_delete(&api).await);

        assert_eq!(
            detail.notice().map(|n| n.message.as_str()),
            Some("Error: Form not found")
        );
        assert!(!detail.forms_refresh_pending());
    }
}

mod refresh_tests {
    use super::*;

    #[tokio::test]
    async fn revalidate_without_signal_is_noop() {
        let api = FakeApi::default();
        let mut detail = loaded(&api).await;

        assert!(!detail.revalidate(&api).await);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn status_filter_is_passed_through() {
        let api = FakeApi::default().with_forms(vec![form("f1", Some(1)), form("f2", Some(3))]);
        let mut detail = loaded(&api).await;
        assert_eq!(detail.forms().len(), 2);

        detail.set_status_filter(Some(FormStatus::Completed));
        assert!(detail.revalidate(&api).await);

        assert_eq!(
            api.calls(),
            vec![Call::ListForms(
                "c1".to_string(),
                Some(FormStatus::Completed)
            )]
        );
        assert_eq!(detail.forms(), &[form("f2", Some(3))]);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_forms() {
        let api = FakeApi::default().with_forms(vec![form("f1", None)]);
        let mut detail = loaded(&api).await;

        let failing = FakeApi::default().failing("list_forms", 500, json!({}));
        detail.load_forms(&failing).await;

        assert_eq!(detail.forms(), &[form("f1", None)]);
        assert!(detail.status().is_some());
    }
}

#[test]
fn transport_failures_use_the_fallback_alone() {
    let err = Error::Other("connection refused".to_string());
    assert_eq!(failure_message(&err, DELETE_FAILED), "Failed to delete form");

    let err = Error::Request {
        status: 500,
        info: json!("Internal Server Error"),
    };
    assert_eq!(
        failure_message(&err, DELETE_FAILED),
        "Error: Failed to delete form"
    );
}
