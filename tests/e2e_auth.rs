//! E2E tests for the LinkedIn OAuth flow and session endpoints

mod common;

use common::{TestServer, cookie_value, set_cookie_values};

#[tokio::test]
async fn test_login_sets_state_cookie_and_redirects_to_provider() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/login"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.starts_with("https://www.linkedin.com/oauth/v2/authorization?"));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("client_id=test-client-id"));
    assert!(location.contains("scope=openid"));
    assert!(location.contains("state="));

    let set_cookie = set_cookie_values(&response);
    let state_cookie = set_cookie
        .iter()
        .find(|v| v.starts_with("oauth_state="))
        .expect("oauth_state cookie");
    assert!(state_cookie.contains("HttpOnly"));
    assert!(state_cookie.contains("Path=/auth"));
}

#[tokio::test]
async fn test_callback_with_provider_error_redirects_without_session() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/callback?error=access_denied&error_description=User%20denied"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.contains("error="));
    assert!(cookie_value(&response, "session").is_none());
}

#[tokio::test]
async fn test_callback_without_code_redirects_to_error_page() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/callback"))
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.contains("error="));
    assert!(cookie_value(&response, "session").is_none());
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/callback?code=test-code&state=forged"))
        .header("Cookie", "oauth_state=expected")
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.contains("error="));
    assert!(cookie_value(&response, "session").is_none());

    // The forged callback must not have created a user either.
    let user = server
        .state
        .db
        .get_user_by_email("user@example.com")
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_callback_completes_login_and_sets_session_cookie() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/callback?code=test-code&state=attempt-1"))
        .header("Cookie", "oauth_state=attempt-1")
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert_eq!(location, "/dashboard.html");

    let session = cookie_value(&response, "session").expect("session cookie");

    // The user record was created from the mock profile.
    let user = server
        .state
        .db
        .get_user_by_email("user@example.com")
        .await
        .unwrap()
        .expect("user created");
    assert_eq!(user.linkedin_id, "li-123");

    // A second login for the same email resolves to the same user.
    let response = server
        .client
        .get(server.url("/auth/callback?code=test-code-2&state=attempt-2"))
        .header("Cookie", "oauth_state=attempt-2")
        .send()
        .await
        .expect("request succeeds");
    assert!(response.status().is_redirection());
    let again = server
        .state
        .db
        .get_user_by_email("user@example.com")
        .await
        .unwrap()
        .expect("user still present");
    assert_eq!(again.id, user.id);

    // The issued cookie authenticates /auth/check.
    let response = server
        .client
        .get(server.url("/auth/check"))
        .header("Cookie", format!("session={session}"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["email"], "user@example.com");
    assert_eq!(body["user"]["name"], "Test User");
}

#[tokio::test]
async fn test_callback_denies_email_outside_allow_list() {
    let server = TestServer::with_config(|config| {
        config.auth.allowed_emails = vec!["someone-else@example.com".to_string()];
    })
    .await;

    let response = server
        .client
        .get(server.url("/auth/callback?code=test-code&state=attempt-1"))
        .header("Cookie", "oauth_state=attempt-1")
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.contains("error=Access%20denied"));
    assert!(cookie_value(&response, "session").is_none());

    // No user record may be created for the denied identity.
    let user = server
        .state
        .db
        .get_user_by_email("user@example.com")
        .await
        .unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_check_without_session_reports_unauthenticated() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/auth/check"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["authenticated"], false);
    assert!(body.get("user").is_none());
}

#[tokio::test]
async fn test_check_with_tampered_token_reports_unauthenticated() {
    let server = TestServer::new().await;
    let cookie = server.login_as("user@example.com").await;

    let response = server
        .client
        .get(server.url("/auth/check"))
        .header("Cookie", format!("{cookie}tampered"))
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn test_logout_clears_session_cookie() {
    let server = TestServer::new().await;
    let cookie = server.login_as("user@example.com").await;

    let response = server
        .client
        .post(server.url("/auth/logout"))
        .header("Cookie", cookie)
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let set_cookie = set_cookie_values(&response);
    assert!(
        set_cookie
            .iter()
            .any(|v| v.starts_with("session=") && v.contains("Max-Age=0")),
        "expected session removal header, got: {set_cookie:?}"
    );
}
