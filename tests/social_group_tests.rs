//! SocialService and GroupService tests
//!
//! Follow toggles, profiles, suggestions and group membership.

mod common;

use agora::errors::AgoraError;
use agora::services::{CreateGroup, CreatePost};

use common::{create_user, png_upload, setup};

fn group_named(name: &str) -> CreateGroup {
    CreateGroup {
        name: name.to_string(),
        description: Some(format!("All about {}", name)),
    }
}

// =============================================================================
// Follows & profiles
// =============================================================================

#[tokio::test]
async fn test_toggle_follow() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let bob = create_user(&env.services, "bob").await;
    let social = &env.services.social;

    let followed = social.toggle_follow(bob.id, ada.id).await.unwrap();
    assert!(followed.following);
    assert_eq!(followed.follower_count, 1);
    assert!(social.is_following(bob.id, ada.id).await.unwrap());
    assert!(!social.is_following(ada.id, bob.id).await.unwrap());

    let followers = social.followers("ada").await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].username, "bob");
    let following = social.following("bob").await.unwrap();
    assert_eq!(following[0].username, "ada");

    let unfollowed = social.toggle_follow(bob.id, ada.id).await.unwrap();
    assert!(!unfollowed.following);
    assert_eq!(unfollowed.follower_count, 0);
    assert!(social.followers("ada").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_follow_edge_cases() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let social = &env.services.social;

    assert_eq!(
        social.toggle_follow(ada.id, ada.id).await.unwrap_err(),
        AgoraError::validation("Cannot follow yourself")
    );
    assert!(matches!(
        social.toggle_follow(ada.id, 777).await,
        Err(AgoraError::NotFound(_))
    ));
    assert!(matches!(
        social.followers("ghost").await,
        Err(AgoraError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_profile_view() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let bob = create_user(&env.services, "bob").await;
    env.services
        .posts
        .create_post(
            ada.id,
            CreatePost {
                title: "hello".into(),
                content: "world".into(),
                group_id: None,
            },
            None,
        )
        .await
        .unwrap();
    env.services.social.toggle_follow(bob.id, ada.id).await.unwrap();

    let seen_by_bob = env.services.social.profile(bob.id, "ada").await.unwrap();
    assert_eq!(seen_by_bob.user.id, ada.id);
    assert_eq!(seen_by_bob.posts.len(), 1);
    assert_eq!(seen_by_bob.follower_count, 1);
    assert_eq!(seen_by_bob.following_count, 0);
    assert!(seen_by_bob.is_following);
    assert!(!seen_by_bob.is_self);
    assert_eq!(seen_by_bob.user.email, None);

    let own = env.services.social.profile(ada.id, "ada").await.unwrap();
    assert!(own.is_self);
    assert!(!own.is_following);
    assert_eq!(own.user.email.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn test_suggestions_exclude_self_and_followed() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let bob = create_user(&env.services, "bob").await;
    create_user(&env.services, "cyd").await;
    create_user(&env.services, "dee").await;
    let social = &env.services.social;

    social.toggle_follow(ada.id, bob.id).await.unwrap();

    let names: Vec<String> = social
        .suggestions(ada.id, 10)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert!(!names.contains(&"ada".to_string()));
    assert!(!names.contains(&"bob".to_string()));
    assert_eq!(names.len(), 2);

    assert_eq!(social.suggestions(ada.id, 1).await.unwrap().len(), 1);
}

// =============================================================================
// Groups
// =============================================================================

#[tokio::test]
async fn test_create_group_makes_creator_admin() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let groups = &env.services.groups;

    let group = groups
        .create_group(ada.id, group_named("Rust"), Some(png_upload()))
        .await
        .unwrap();
    assert_eq!(group.name, "Rust");
    assert_eq!(group.created_by, Some(ada.id));
    assert!(
        group
            .cover_image
            .as_deref()
            .is_some_and(|url| url.starts_with("/static/uploads/groups/group_"))
    );

    let detail = groups.group_detail(ada.id, group.id).await.unwrap();
    assert_eq!(detail.creator.username, "ada");
    assert_eq!(detail.member_count, 1);
    assert!(detail.is_member);
    assert!(detail.is_admin);
    assert!(detail.members[0].is_admin);
}

#[tokio::test]
async fn test_create_group_validation() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let groups = &env.services.groups;

    groups.create_group(ada.id, group_named("Rust"), None).await.unwrap();
    assert!(matches!(
        groups.create_group(ada.id, group_named("Rust"), None).await,
        Err(AgoraError::Conflict(_))
    ));
    assert!(matches!(
        groups.create_group(ada.id, group_named("  "), None).await,
        Err(AgoraError::Validation(_))
    ));
    assert!(matches!(
        groups
            .create_group(ada.id, group_named(&"g".repeat(101)), None)
            .await,
        Err(AgoraError::Validation(_))
    ));
    assert!(matches!(
        groups
            .create_group(ada.id, group_named("Clips"), Some(common::mp4_upload()))
            .await,
        Err(AgoraError::UnsupportedMedia(_))
    ));
}

#[tokio::test]
async fn test_toggle_membership() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let bob = create_user(&env.services, "bob").await;
    let groups = &env.services.groups;
    let group = groups.create_group(ada.id, group_named("Rust"), None).await.unwrap();

    let joined = groups.toggle_membership(bob.id, group.id).await.unwrap();
    assert!(joined.joined);
    assert_eq!(joined.member_count, 2);

    let detail = groups.group_detail(bob.id, group.id).await.unwrap();
    assert!(detail.is_member);
    assert!(!detail.is_admin);

    let mine = groups.groups_for_user(bob.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].member_count, 2);

    // 唯一管理员在还有成员时不能退出
    assert!(matches!(
        groups.toggle_membership(ada.id, group.id).await,
        Err(AgoraError::Validation(_))
    ));

    let left = groups.toggle_membership(bob.id, group.id).await.unwrap();
    assert!(!left.joined);
    assert_eq!(left.member_count, 1);
    assert!(groups.groups_for_user(bob.id).await.unwrap().is_empty());

    assert!(matches!(
        groups.toggle_membership(bob.id, 999).await,
        Err(AgoraError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_follows_and_joins() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let group = env
        .services
        .groups
        .create_group(ada.id, group_named("Rust"), None)
        .await
        .unwrap();

    let mut fans = Vec::new();
    for i in 0..20 {
        fans.push(create_user(&env.services, &format!("fan{}", i)).await.id);
    }

    let (ada_id, group_id) = (ada.id, group.id);
    let mut handles = Vec::new();
    for fan in fans {
        let social = env.services.social.clone();
        let groups = env.services.groups.clone();
        handles.push(tokio::spawn(async move {
            social.toggle_follow(fan, ada_id).await?;
            groups.toggle_membership(fan, group_id).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().joined);
    }

    assert_eq!(env.services.social.followers("ada").await.unwrap().len(), 20);
    let detail = env.services.groups.group_detail(ada_id, group_id).await.unwrap();
    assert_eq!(detail.member_count, 21);
}

#[tokio::test]
async fn test_group_detail_includes_posts_with_comments() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let groups = &env.services.groups;
    let group = groups.create_group(ada.id, group_named("Rust"), None).await.unwrap();

    let post = env
        .services
        .posts
        .create_post(
            ada.id,
            CreatePost {
                title: "Borrowck".into(),
                content: "is your friend".into(),
                group_id: Some(group.id),
            },
            None,
        )
        .await
        .unwrap();
    env.services
        .posts
        .add_comment(ada.id, post.id, "agreed")
        .await
        .unwrap();

    let detail = groups.group_detail(ada.id, group.id).await.unwrap();
    assert_eq!(detail.posts.len(), 1);
    assert_eq!(detail.posts[0].view.post.id, post.id);
    assert_eq!(detail.posts[0].comments.len(), 1);
}

#[tokio::test]
async fn test_group_listing_and_suggestions() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let groups = &env.services.groups;
    for name in ["One", "Two", "Three", "Four"] {
        groups.create_group(ada.id, group_named(name), None).await.unwrap();
    }

    let all = groups.list_groups().await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].group.name, "Four");

    let suggested = groups.suggestions(3).await.unwrap();
    assert_eq!(suggested.len(), 3);
    assert!(suggested.iter().all(|g| g.member_count == 1));
}
