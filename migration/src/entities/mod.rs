pub mod comment;
pub mod follow;
pub mod group;
pub mod group_member;
pub mod like;
pub mod post;
pub mod user;

pub use comment::Entity as CommentEntity;
pub use follow::Entity as FollowEntity;
pub use group::Entity as GroupEntity;
pub use group_member::Entity as GroupMemberEntity;
pub use like::Entity as LikeEntity;
pub use post::Entity as PostEntity;
pub use user::Entity as UserEntity;
