use sea_orm::ActiveValue::{NotSet, Set};

use crate::storage::models::{
    Comment, Group, Membership, NewGroup, NewPost, NewUser, Post, User,
};
use migration::entities::{comment, group, group_member, post, user};

pub fn model_to_user(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        email: model.email,
        password_hash: model.password_hash,
        full_name: model.full_name,
        profile_picture: model.profile_picture,
        bio: model.bio,
        is_active: model.is_active,
        created_at: model.created_at,
    }
}

pub fn model_to_post(model: post::Model) -> Post {
    Post {
        id: model.id,
        title: model.title,
        content: model.content,
        image_url: model.image_url,
        video_url: model.video_url,
        owner_id: model.owner_id,
        group_id: model.group_id,
        created_at: model.created_at,
    }
}

pub fn model_to_comment(model: comment::Model) -> Comment {
    Comment {
        id: model.id,
        content: model.content,
        user_id: model.user_id,
        post_id: model.post_id,
        created_at: model.created_at,
    }
}

pub fn model_to_group(model: group::Model) -> Group {
    Group {
        id: model.id,
        name: model.name,
        description: model.description,
        cover_image: model.cover_image,
        created_by: model.created_by,
        created_at: model.created_at,
    }
}

pub fn model_to_membership(model: group_member::Model) -> Membership {
    Membership {
        group_id: model.group_id,
        user_id: model.user_id,
        is_admin: model.is_admin,
        joined_at: model.joined_at,
    }
}

pub fn new_user_to_active_model(new: &NewUser) -> user::ActiveModel {
    user::ActiveModel {
        id: NotSet,
        username: Set(new.username.clone()),
        email: Set(new.email.clone()),
        password_hash: Set(new.password_hash.clone()),
        full_name: Set(new.full_name.clone()),
        profile_picture: Set(new.profile_picture.clone()),
        bio: Set(None),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
    }
}

pub fn new_post_to_active_model(new: &NewPost) -> post::ActiveModel {
    post::ActiveModel {
        id: NotSet,
        title: Set(new.title.clone()),
        content: Set(new.content.clone()),
        image_url: Set(new.image_url.clone()),
        video_url: Set(new.video_url.clone()),
        owner_id: Set(new.owner_id),
        group_id: Set(new.group_id),
        created_at: Set(chrono::Utc::now()),
    }
}

pub fn new_group_to_active_model(new: &NewGroup) -> group::ActiveModel {
    group::ActiveModel {
        id: NotSet,
        name: Set(new.name.clone()),
        description: Set(new.description.clone()),
        cover_image: Set(new.cover_image.clone()),
        created_by: Set(Some(new.created_by)),
        created_at: Set(chrono::Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::ActiveValue;

    #[test]
    fn test_model_to_user_keeps_hash() {
        let model = user::Model {
            id: 9,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$xyz".to_string(),
            full_name: Some("Ada Lovelace".to_string()),
            profile_picture: "/static/default_profile.png".to_string(),
            bio: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let user = model_to_user(model);
        assert_eq!(user.id, 9);
        assert_eq!(user.password_hash, "$argon2id$xyz");

        // 哈希不会出现在序列化结果里
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "ada");
    }

    #[test]
    fn test_new_post_active_model() {
        let new = NewPost {
            title: "Hello".to_string(),
            content: "World".to_string(),
            image_url: Some("/static/uploads/posts/a.png".to_string()),
            video_url: None,
            owner_id: 3,
            group_id: Some(4),
        };
        let am = new_post_to_active_model(&new);
        assert!(matches!(am.id, ActiveValue::NotSet));
        assert_eq!(am.owner_id, ActiveValue::Set(3));
        assert_eq!(am.group_id, ActiveValue::Set(Some(4)));
        assert_eq!(am.video_url, ActiveValue::Set(None));
    }

    #[test]
    fn test_new_group_records_creator() {
        let am = new_group_to_active_model(&NewGroup {
            name: "Rustaceans".to_string(),
            description: None,
            cover_image: None,
            created_by: 12,
        });
        assert_eq!(am.created_by, ActiveValue::Set(Some(12)));
    }
}
