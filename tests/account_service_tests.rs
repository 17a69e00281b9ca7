//! AccountService tests
//!
//! Signup, login, profile editing and password changes against a real
//! SQLite database.

mod common;

use agora::errors::AgoraError;
use agora::services::UpdateProfileRequest;

use common::{TEST_PASSWORD, create_user, png_upload, setup, signup_request};

#[tokio::test]
async fn test_signup_stores_hashed_password_and_default_picture() {
    let env = setup().await;
    let user = create_user(&env.services, "ada").await;

    assert!(user.id > 0);
    assert_eq!(user.username, "ada");
    assert_eq!(user.email, "ada@example.com");
    assert!(user.is_active);
    assert_ne!(user.password_hash, TEST_PASSWORD);
    assert_eq!(
        user.profile_picture,
        env.services.media.default_profile_picture()
    );
}

#[tokio::test]
async fn test_signup_lowercases_email() {
    let env = setup().await;
    let mut req = signup_request("grace");
    req.email = "  Grace@Example.COM ".to_string();

    let user = env.services.accounts.signup(req).await.unwrap();
    assert_eq!(user.email, "grace@example.com");
}

#[tokio::test]
async fn test_signup_rejects_password_mismatch() {
    let env = setup().await;
    let mut req = signup_request("linus");
    req.confirm_password = "something-else".to_string();

    let err = env.services.accounts.signup(req).await.unwrap_err();
    assert_eq!(err, AgoraError::validation("Passwords do not match"));
}

#[tokio::test]
async fn test_signup_rejects_duplicates() {
    let env = setup().await;
    create_user(&env.services, "ada").await;

    let err = env
        .services
        .accounts
        .signup(signup_request("ada"))
        .await
        .unwrap_err();
    assert_eq!(err, AgoraError::conflict("Username already taken"));

    let mut req = signup_request("ada2");
    req.email = "ADA@example.com".to_string();
    let err = env.services.accounts.signup(req).await.unwrap_err();
    assert_eq!(err, AgoraError::conflict("Email already registered"));
}

#[tokio::test]
async fn test_signup_validation() {
    let env = setup().await;

    let mut short_name = signup_request("ab");
    short_name.email = "ab@example.com".to_string();
    assert!(matches!(
        env.services.accounts.signup(short_name).await,
        Err(AgoraError::Validation(_))
    ));

    let mut bad_email = signup_request("valid_name");
    bad_email.email = "not-an-email".to_string();
    assert!(matches!(
        env.services.accounts.signup(bad_email).await,
        Err(AgoraError::Validation(_))
    ));

    let mut short_password = signup_request("another");
    short_password.password = "short".to_string();
    short_password.confirm_password = "short".to_string();
    assert!(matches!(
        env.services.accounts.signup(short_password).await,
        Err(AgoraError::Validation(_))
    ));
}

#[tokio::test]
async fn test_authenticate() {
    let env = setup().await;
    let user = create_user(&env.services, "ada").await;

    let logged_in = env
        .services
        .accounts
        .authenticate("ada", TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);

    let wrong = env
        .services
        .accounts
        .authenticate("ada", "wrong-password")
        .await
        .unwrap_err();
    let unknown = env
        .services
        .accounts
        .authenticate("nobody", TEST_PASSWORD)
        .await
        .unwrap_err();
    // 不区分“用户不存在”和“密码错误”
    assert_eq!(wrong, unknown);
    assert!(matches!(wrong, AgoraError::Unauthorized(_)));
}

#[tokio::test]
async fn test_update_profile_keeps_missing_fields() {
    let env = setup().await;
    let user = create_user(&env.services, "ada").await;
    let accounts = &env.services.accounts;

    let updated = accounts
        .update_profile(
            user.id,
            UpdateProfileRequest {
                full_name: Some("Ada Lovelace".into()),
                bio: Some("Analyst".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(updated.bio.as_deref(), Some("Analyst"));

    // bio 缺省保持不变，空字符串清空 full_name
    let updated = accounts
        .update_profile(
            user.id,
            UpdateProfileRequest {
                full_name: Some("   ".into()),
                bio: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name, None);
    assert_eq!(updated.bio.as_deref(), Some("Analyst"));

    let too_long = accounts
        .update_profile(
            user.id,
            UpdateProfileRequest {
                full_name: None,
                bio: Some("x".repeat(501)),
            },
        )
        .await;
    assert!(matches!(too_long, Err(AgoraError::Validation(_))));
}

#[tokio::test]
async fn test_profile_picture_upload() {
    let env = setup().await;
    let user = create_user(&env.services, "ada").await;

    let updated = env
        .services
        .accounts
        .update_profile_picture(user.id, png_upload())
        .await
        .unwrap();
    assert!(updated.profile_picture.starts_with("/static/uploads/profile_pictures/profile_"));
    assert!(updated.profile_picture.ends_with(".png"));

    let path = env.services.media.resolve(&updated.profile_picture).unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn test_profile_picture_rejects_video() {
    let env = setup().await;
    let user = create_user(&env.services, "ada").await;

    let result = env
        .services
        .accounts
        .update_profile_picture(user.id, common::mp4_upload())
        .await;
    assert!(matches!(result, Err(AgoraError::UnsupportedMedia(_))));
}

#[tokio::test]
async fn test_change_password() {
    let env = setup().await;
    let user = create_user(&env.services, "ada").await;
    let accounts = &env.services.accounts;

    let err = accounts
        .change_password(user.id, "not-the-password", "new-password-1")
        .await
        .unwrap_err();
    assert_eq!(err, AgoraError::validation("Current password is incorrect"));

    accounts
        .change_password(user.id, TEST_PASSWORD, "new-password-1")
        .await
        .unwrap();
    assert!(accounts.authenticate("ada", TEST_PASSWORD).await.is_err());
    assert!(accounts.authenticate("ada", "new-password-1").await.is_ok());
}

#[tokio::test]
async fn test_reset_password_and_list_users() {
    let env = setup().await;
    create_user(&env.services, "ada").await;
    create_user(&env.services, "grace").await;
    let accounts = &env.services.accounts;

    let user = accounts.reset_password("grace", "reset-password-9").await.unwrap();
    assert_eq!(user.username, "grace");
    assert!(accounts.authenticate("grace", "reset-password-9").await.is_ok());

    assert!(matches!(
        accounts.reset_password("ghost", "reset-password-9").await,
        Err(AgoraError::NotFound(_))
    ));

    let names: Vec<String> = accounts
        .list_users()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, vec!["ada", "grace"]);
}
