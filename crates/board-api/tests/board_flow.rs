mod common;

use std::sync::Arc;

use axum::http::StatusCode;

use common::{TestApp, body_string, cookie, location};

#[tokio::test]
async fn anonymous_visitor_sees_board_but_cannot_post() {
    let app = TestApp::new();

    let resp = app.get("/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Log in</a> to leave a message"));

    let resp = app.post_form("/", "content=hello", None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    assert_eq!(app.message_count(), 0);
}

#[tokio::test]
async fn register_post_and_list() {
    let app = TestApp::new();
    let session = app.register("alice", "wonderland").await;

    let resp = app.get("/", Some(&session)).await;
    let html = body_string(resp).await;
    assert!(html.contains("Signed in as alice"));

    let resp = app.post_form("/", "content=hello+world", Some(&session)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let html = body_string(app.get("/", None).await).await;
    assert!(html.contains("hello world"));
    assert!(html.contains("alice"));
    assert_eq!(app.message_count(), 1);
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let app = TestApp::new();
    let session = app.register("alice", "wonderland").await;

    let resp = app.get("/logout", Some(&session)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    // the old cookie no longer authenticates
    let resp = app.post_form("/", "content=ghost", Some(&session)).await;
    assert_eq!(location(&resp), "/login");
    assert_eq!(app.message_count(), 0);

    // logging out again just lands on the login page
    let resp = app.get("/logout", Some(&session)).await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn login_after_registration() {
    let app = TestApp::new();
    let first = app.register("alice", "wonderland").await;
    app.get("/logout", Some(&first)).await;

    let resp = app
        .post_form("/login", "username=alice&password=wonderland", None)
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    let session = cookie(&resp, "board_session").unwrap();

    let html = body_string(app.get("/", Some(&session)).await).await;
    assert!(html.contains("Signed in as alice"));
}

#[tokio::test]
async fn failed_logins_share_one_message() {
    let app = TestApp::new();
    app.register("alice", "wonderland").await;

    let wrong_password = app
        .post_form("/login", "username=alice&password=looking-glass", None)
        .await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert!(cookie(&wrong_password, "board_session").is_none());

    let unknown_user = app
        .post_form("/login", "username=mallory&password=wonderland", None)
        .await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let a = body_string(wrong_password).await;
    let b = body_string(unknown_user).await;
    assert!(a.contains("Invalid username or password"));
    assert!(b.contains("Invalid username or password"));
}

#[tokio::test]
async fn duplicate_username_is_reported() {
    let app = TestApp::new();
    app.register("alice", "wonderland").await;

    let resp = app
        .post_form("/register", "username=alice&password=other", None)
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert!(cookie(&resp, "board_session").is_none());
    assert!(body_string(resp).await.contains("Username already exists"));
    assert_eq!(app.user_count(), 1);
}

#[tokio::test]
async fn missing_credentials_rerender_the_form() {
    let app = TestApp::new();

    let resp = app.post_form("/register", "username=&password=", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("Username and password are required"));
    assert_eq!(app.user_count(), 0);
}

#[tokio::test]
async fn empty_browser_post_is_rejected_inline() {
    let app = TestApp::new();
    let session = app.register("alice", "wonderland").await;

    let resp = app.post_form("/", "content=+++", Some(&session)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("Message content cannot be empty"));
    assert_eq!(app.message_count(), 0);
}

#[tokio::test]
async fn protected_pages_redirect_anonymous_visitors() {
    let app = TestApp::new();

    for uri in ["/n8n-tools", "/logout"] {
        let resp = app.get(uri, None).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&resp), "/login");
    }

    let resp = app.post_form("/generate_report", "work_items=x", None).await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn forged_session_cookie_is_anonymous() {
    let app = TestApp::new();

    let resp = app
        .post_form("/", "content=hello", Some("board_session=forged.token.value"))
        .await;
    assert_eq!(location(&resp), "/login");
}

#[tokio::test]
async fn health_check() {
    let app = TestApp::new();
    let resp = app.get("/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_share_one_store() {
    let app = Arc::new(TestApp::new());
    let session = app.register("alice", "wonderland").await;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let app = app.clone();
        let session = session.clone();
        tasks.push(tokio::spawn(async move {
            let resp = app
                .post_form("/", &format!("content=note+{}", i), Some(&session))
                .await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
            assert_eq!(location(&resp), "/");

            let resp = app.get("/", Some(&session)).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(app.message_count(), 16);
    let html = body_string(app.get("/", None).await).await;
    assert!(html.contains("note 15"));
}
