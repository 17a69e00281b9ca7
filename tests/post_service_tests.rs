//! PostService tests
//!
//! Posts, feed pagination, likes, comments and sharing.

mod common;

use agora::errors::AgoraError;
use agora::services::{CreateGroup, CreatePost};

use common::{create_user, mp4_upload, png_upload, setup};

fn new_post(title: &str) -> CreatePost {
    CreatePost {
        title: title.to_string(),
        content: format!("{} body", title),
        group_id: None,
    }
}

#[tokio::test]
async fn test_create_post_with_image_and_video() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let posts = &env.services.posts;

    let plain = posts.create_post(ada.id, new_post("plain"), None).await.unwrap();
    assert_eq!(plain.image_url, None);
    assert_eq!(plain.video_url, None);
    assert_eq!(plain.owner_id, ada.id);

    let image = posts
        .create_post(ada.id, new_post("pic"), Some(png_upload()))
        .await
        .unwrap();
    let image_url = image.image_url.expect("image url");
    assert!(image_url.starts_with("/static/uploads/posts/post_image_"));
    assert!(image.video_url.is_none());

    let video = posts
        .create_post(ada.id, new_post("clip"), Some(mp4_upload()))
        .await
        .unwrap();
    assert!(video.image_url.is_none());
    assert!(video.video_url.expect("video url").ends_with(".mp4"));
}

#[tokio::test]
async fn test_create_post_requires_title_and_content() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let posts = &env.services.posts;

    let mut req = new_post("x");
    req.title = "   ".to_string();
    assert!(matches!(
        posts.create_post(ada.id, req, None).await,
        Err(AgoraError::Validation(_))
    ));

    let mut req = new_post("x");
    req.content = String::new();
    assert!(matches!(
        posts.create_post(ada.id, req, None).await,
        Err(AgoraError::Validation(_))
    ));

    let mut req = new_post("x");
    req.title = "t".repeat(201);
    assert!(matches!(
        posts.create_post(ada.id, req, None).await,
        Err(AgoraError::Validation(_))
    ));
}

#[tokio::test]
async fn test_group_posts_require_membership() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let bob = create_user(&env.services, "bob").await;
    let group = env
        .services
        .groups
        .create_group(
            ada.id,
            CreateGroup {
                name: "Rustaceans".into(),
                description: None,
            },
            None,
        )
        .await
        .unwrap();

    let mut req = new_post("in group");
    req.group_id = Some(group.id);
    let post = env
        .services
        .posts
        .create_post(ada.id, req.clone(), None)
        .await
        .unwrap();
    assert_eq!(post.group_id, Some(group.id));

    assert!(matches!(
        env.services.posts.create_post(bob.id, req, None).await,
        Err(AgoraError::Forbidden(_))
    ));

    let mut missing = new_post("nowhere");
    missing.group_id = Some(9999);
    assert!(matches!(
        env.services.posts.create_post(ada.id, missing, None).await,
        Err(AgoraError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_feed_pagination_newest_first() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let posts = &env.services.posts;

    for i in 0..5 {
        posts
            .create_post(ada.id, new_post(&format!("post {}", i)), None)
            .await
            .unwrap();
    }

    let first = posts.feed(ada.id, 1, 2).await.unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.posts.len(), 2);
    assert!(first.has_next);
    assert_eq!(first.posts[0].post.title, "post 4");
    assert_eq!(first.posts[1].post.title, "post 3");
    assert_eq!(first.posts[0].owner.username, "ada");

    let last = posts.feed(ada.id, 3, 2).await.unwrap();
    assert_eq!(last.posts.len(), 1);
    assert!(!last.has_next);
    assert_eq!(last.posts[0].post.title, "post 0");

    let beyond = posts.feed(ada.id, 10, 2).await.unwrap();
    assert!(beyond.posts.is_empty());
}

#[tokio::test]
async fn test_toggle_like() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let bob = create_user(&env.services, "bob").await;
    let posts = &env.services.posts;
    let post = posts.create_post(ada.id, new_post("likeable"), None).await.unwrap();

    let first = posts.toggle_like(bob.id, post.id).await.unwrap();
    assert!(first.liked);
    assert_eq!(first.like_count, 1);

    let second = posts.toggle_like(ada.id, post.id).await.unwrap();
    assert_eq!(second.like_count, 2);

    let view = posts.get_post(bob.id, post.id).await.unwrap();
    assert_eq!(view.view.like_count, 2);
    assert!(view.view.liked_by_viewer);

    let undo = posts.toggle_like(bob.id, post.id).await.unwrap();
    assert!(!undo.liked);
    assert_eq!(undo.like_count, 1);

    assert!(matches!(
        posts.toggle_like(bob.id, 4242).await,
        Err(AgoraError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_all_counted() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let post = env
        .services
        .posts
        .create_post(ada.id, new_post("popular"), None)
        .await
        .unwrap();

    let mut likers = Vec::new();
    for i in 0..30 {
        likers.push(create_user(&env.services, &format!("fan{}", i)).await.id);
    }

    let post_id = post.id;
    let handles: Vec<_> = likers
        .into_iter()
        .map(|user_id| {
            let posts = env.services.posts.clone();
            tokio::spawn(async move { posts.toggle_like(user_id, post_id).await })
        })
        .collect();
    for handle in handles {
        let toggle = handle.await.unwrap().unwrap();
        assert!(toggle.liked);
    }

    let view = env.services.posts.get_post(ada.id, post.id).await.unwrap();
    assert_eq!(view.view.like_count, 30);
}

#[tokio::test]
async fn test_feed_page_far_beyond_end_is_empty() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let posts = &env.services.posts;
    posts.create_post(ada.id, new_post("only"), None).await.unwrap();

    let page = posts.feed(ada.id, u64::MAX, 20).await.unwrap();
    assert!(page.posts.is_empty());
    assert!(!page.has_next);
    assert_eq!(page.total, 1);

    let page = posts.feed(ada.id, 184_467_440_737_095_516, u64::MAX).await.unwrap();
    assert!(page.posts.is_empty());

    let rows = env.services.storage.list_feed(u64::MAX, u64::MAX).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_comments() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let bob = create_user(&env.services, "bob").await;
    let posts = &env.services.posts;
    let post = posts.create_post(ada.id, new_post("talk"), None).await.unwrap();

    let first = posts.add_comment(bob.id, post.id, "  first!  ").await.unwrap();
    assert_eq!(first.content, "first!");
    assert_eq!(first.user.username, "bob");
    posts.add_comment(ada.id, post.id, "thanks").await.unwrap();

    assert!(matches!(
        posts.add_comment(bob.id, post.id, "   ").await,
        Err(AgoraError::Validation(_))
    ));
    assert!(matches!(
        posts.add_comment(bob.id, post.id, &"c".repeat(2001)).await,
        Err(AgoraError::Validation(_))
    ));

    let comments = posts.list_comments(post.id).await.unwrap();
    let contents: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["first!", "thanks"]);

    let detail = posts.get_post(ada.id, post.id).await.unwrap();
    assert_eq!(detail.view.comment_count, 2);
    assert_eq!(detail.comments.len(), 2);
}

#[tokio::test]
async fn test_delete_post_owner_only() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let bob = create_user(&env.services, "bob").await;
    let posts = &env.services.posts;
    let post = posts.create_post(ada.id, new_post("mine"), None).await.unwrap();
    posts.toggle_like(bob.id, post.id).await.unwrap();
    posts.add_comment(bob.id, post.id, "hi").await.unwrap();

    assert!(matches!(
        posts.delete_post(bob.id, post.id).await,
        Err(AgoraError::Forbidden(_))
    ));

    posts.delete_post(ada.id, post.id).await.unwrap();
    assert!(matches!(
        posts.get_post(ada.id, post.id).await,
        Err(AgoraError::NotFound(_))
    ));
    assert_eq!(posts.feed(ada.id, 1, 20).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_share_post_copies_media() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let bob = create_user(&env.services, "bob").await;
    let posts = &env.services.posts;
    let original = posts
        .create_post(ada.id, new_post("Sunset"), Some(png_upload()))
        .await
        .unwrap();

    let shared = posts.share_post(bob.id, original.id).await.unwrap();
    assert_eq!(shared.owner_id, bob.id);
    assert_eq!(shared.title, "Shared: Sunset");
    assert_eq!(shared.content, "Shared from @ada: Sunset body");
    assert_eq!(shared.image_url, original.image_url);
    assert_eq!(shared.group_id, None);

    // 删除原帖后分享帖的图片仍可访问
    posts.delete_post(ada.id, original.id).await.unwrap();
    let url = shared.image_url.expect("image url");
    assert!(env.services.media.resolve(&url).unwrap().exists());
}

#[tokio::test]
async fn test_share_truncates_long_titles() {
    let env = setup().await;
    let ada = create_user(&env.services, "ada").await;
    let posts = &env.services.posts;
    let original = posts
        .create_post(ada.id, new_post(&"t".repeat(200)), None)
        .await
        .unwrap();

    let shared = posts.share_post(ada.id, original.id).await.unwrap();
    assert_eq!(shared.title.chars().count(), 200);
    assert!(shared.title.starts_with("Shared: "));
}
