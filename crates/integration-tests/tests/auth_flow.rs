//! Registration, login, password reset and profile management.

use brana_client::ClientError;
use brana_core::api::{RegisterRequest, UpdateProfileRequest};
use brana_core::{Role, UserId};
use brana_integration_tests::{PASSWORD, TestServer};

fn registration(email: &str, username: Option<&str>, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_owned(),
        password: password.to_owned(),
        username: username.map(str::to_owned),
        display_name: None,
    }
}

#[tokio::test]
async fn test_register_rules() {
    let server = TestServer::spawn().await;
    let client = &server.client;

    let user = client
        .register(&registration("Marta@Example.com", Some("marta"), PASSWORD))
        .await
        .unwrap();
    assert_eq!(user.role, Role::User);
    assert_eq!(user.email.as_str(), "marta@example.com");

    let cases = [
        ("marta@example.com", Some("other"), PASSWORD, "duplicate email"),
        ("new@example.com", Some("marta"), PASSWORD, "duplicate username"),
        ("not-an-email", None, PASSWORD, "malformed email"),
        ("short@example.com", None, "12345", "short password"),
    ];
    for (email, username, password, why) in cases {
        let err = client
            .register(&registration(email, username, password))
            .await
            .unwrap_err();
        assert!(err.is_status(400), "{why}: {err}");
    }
}

#[tokio::test]
async fn test_login_and_token_checks() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (token, profile) = server.signup("kebede").await;

    assert_eq!(client.profile(&token).await.unwrap(), profile);

    let err = client
        .login("kebede@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(err.is_status(401));
    let err = client.login("nobody@example.com", PASSWORD).await.unwrap_err();
    assert!(err.is_status(401));

    let err = client.profile("not.a.token").await.unwrap_err();
    assert!(err.is_status(401));

    // Tokens of a deleted account stop working
    let (admin, _) = server.signup_admin("root").await;
    client.delete_user(&admin, profile.id).await.unwrap();
    let err = client.profile(&token).await.unwrap_err();
    assert!(err.is_status(401) || err.is_status(404), "{err}");
}

#[tokio::test]
async fn test_password_reset() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    server.signup("hana").await;

    // Unknown emails get the same answer and no mail
    let unknown = client.forgot_password("ghost@example.com").await.unwrap();
    let known = client.forgot_password("hana@example.com").await.unwrap();
    assert_eq!(unknown, known);
    assert!(server.reset_token_for("ghost@example.com").is_none());

    let token = server
        .reset_token_for("hana@example.com")
        .expect("reset link was not delivered");

    let err = client.reset_password(&token, "123").await.unwrap_err();
    assert!(err.is_status(400));

    // A rejected password leaves the token usable
    client.reset_password(&token, "new-secret").await.unwrap();

    let err = client.reset_password(&token, "another-one").await.unwrap_err();
    assert!(err.is_status(401));
    let err = client.reset_password("bogus", "another-one").await.unwrap_err();
    assert!(err.is_status(401));

    assert!(client.login("hana@example.com", PASSWORD).await.is_err());
    client.login("hana@example.com", "new-secret").await.unwrap();
}

#[tokio::test]
async fn test_newer_reset_token_replaces_older() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    server.signup("dawit").await;

    client.forgot_password("dawit@example.com").await.unwrap();
    let first = server.reset_token_for("dawit@example.com").unwrap();
    client.forgot_password("dawit@example.com").await.unwrap();
    let second = server.reset_token_for("dawit@example.com").unwrap();
    assert_ne!(first, second);

    assert!(client.reset_password(&first, "fresh-pass").await.unwrap_err().is_status(401));
    client.reset_password(&second, "fresh-pass").await.unwrap();
}

#[tokio::test]
async fn test_profile_update_and_visibility() {
    let server = TestServer::spawn().await;
    let client = &server.client;
    let (token, profile) = server.signup("tigist").await;
    let (other, _) = server.signup("yonas").await;
    let (admin, _) = server.signup_admin("admin").await;

    let updated = client
        .update_profile(
            &token,
            &UpdateProfileRequest {
                display_name: Some("Tigist Haile".to_owned()),
                bio: Some("Painter from Bahir Dar".to_owned()),
                phone: Some("+251922000000".to_owned()),
                ..UpdateProfileRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Tigist Haile"));
    assert_eq!(updated.username, profile.username);

    let err = client
        .update_profile(
            &token,
            &UpdateProfileRequest {
                username: Some("yonas".to_owned()),
                ..UpdateProfileRequest::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is_status(400));

    // Public view has no contact details
    let public = client.user(profile.id).await.unwrap();
    assert_eq!(public.bio.as_deref(), Some("Painter from Bahir Dar"));

    assert_eq!(client.user_full(&token, profile.id).await.unwrap().phone, updated.phone);
    assert!(client.user_full(&admin, profile.id).await.is_ok());
    assert!(matches!(
        client.user_full(&other, profile.id).await,
        Err(ClientError::Parse(_))
    ));

    assert!(client.user(UserId::new(5000)).await.unwrap_err().is_status(404));
    assert!(client.user_artworks(UserId::new(5000)).await.unwrap_err().is_status(404));
}
