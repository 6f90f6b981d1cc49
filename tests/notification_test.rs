//! Integration tests for the notification endpoints.

mod helpers;

use http::StatusCode;
use serde_json::json;

/// Sends `count` messages from `customer` to `provider`; each one leaves a
/// notification for the provider.
async fn send_messages(app: &helpers::TestApp, count: usize) -> String {
    let customer = app.create_user("Casey Customer").await;
    let provider = app.create_user("Pat Provider").await;
    let conversation = app.conversation(customer, provider).await;
    let token = app.token_for(customer);
    for i in 0..count {
        let response = app
            .request(
                "POST",
                &format!("/api/conversations/{conversation}/messages"),
                Some(json!({ "body": format!("message {i}") })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }
    app.token_for(provider)
}

#[tokio::test]
async fn test_message_creates_notification_for_recipient() {
    let app = helpers::TestApp::new();
    let token = send_messages(&app, 1).await;

    let count = app
        .request("GET", "/api/notifications/unread-count", None, Some(&token))
        .await;
    assert_eq!(count.status, StatusCode::OK);
    assert_eq!(count.body["data"]["count"], 1);

    let list = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    let item = &list.body["data"]["items"][0];
    assert_eq!(item["title"], "New message from Casey Customer");
    assert_eq!(item["body"], "message 0");
    assert_eq!(item["is_read"], false);
}

#[tokio::test]
async fn test_pagination_reports_has_more() {
    let app = helpers::TestApp::new();
    let token = send_messages(&app, 12).await;

    let first = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    assert_eq!(first.body["data"]["items"].as_array().map(Vec::len), Some(10));
    assert_eq!(first.body["data"]["total"], 12);
    assert_eq!(first.body["data"]["has_more"], true);

    let second = app
        .request("GET", "/api/notifications?page=2", None, Some(&token))
        .await;
    assert_eq!(second.body["data"]["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(second.body["data"]["has_more"], false);

    let small = app
        .request("GET", "/api/notifications?per_page=5", None, Some(&token))
        .await;
    assert_eq!(small.body["data"]["page_size"], 5);
}

#[tokio::test]
async fn test_mark_read_and_mark_all_read() {
    let app = helpers::TestApp::new();
    let token = send_messages(&app, 3).await;

    let list = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    let id = list.body["data"]["items"][0]["id"]
        .as_str()
        .expect("No notification id")
        .to_string();

    let marked = app
        .request("PUT", &format!("/api/notifications/{id}/read"), None, Some(&token))
        .await;
    assert_eq!(marked.status, StatusCode::OK);
    assert_eq!(marked.body["data"]["updated"], true);

    let again = app
        .request("PUT", &format!("/api/notifications/{id}/read"), None, Some(&token))
        .await;
    assert_eq!(again.body["data"]["updated"], false);

    let all = app
        .request("PUT", "/api/notifications/read-all", None, Some(&token))
        .await;
    assert_eq!(all.body["data"]["marked"], 2);

    let count = app
        .request("GET", "/api/notifications/unread-count", None, Some(&token))
        .await;
    assert_eq!(count.body["data"]["count"], 0);
}

#[tokio::test]
async fn test_cannot_mark_someone_elses_notification() {
    let app = helpers::TestApp::new();
    let token = send_messages(&app, 1).await;
    let list = app
        .request("GET", "/api/notifications", None, Some(&token))
        .await;
    let id = list.body["data"]["items"][0]["id"]
        .as_str()
        .expect("No notification id")
        .to_string();

    let stranger = app.create_user("Sam Stranger").await;
    let stranger_token = app.token_for(stranger);
    let response = app
        .request(
            "PUT",
            &format!("/api/notifications/{id}/read"),
            None,
            Some(&stranger_token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["updated"], false);

    let count = app
        .request("GET", "/api/notifications/unread-count", None, Some(&token))
        .await;
    assert_eq!(count.body["data"]["count"], 1);
}

#[tokio::test]
async fn test_huge_page_number_is_an_empty_page() {
    let app = helpers::TestApp::new();
    let token = send_messages(&app, 2).await;

    let response = app
        .request(
            "GET",
            "/api/notifications?page=18446744073709551615",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["items"].as_array().map(Vec::len), Some(0));
    assert_eq!(response.body["data"]["total"], 2);
    assert_eq!(response.body["data"]["has_more"], false);
}
