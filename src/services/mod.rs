//! Service layer for business logic
//!
//! Shared between the HTTP handlers and the CLI. Each service holds the
//! storage handle it needs; [`AppServices`] wires them together once at
//! start-up.

mod account_service;
mod group_service;
pub mod media;
mod post_service;
mod social_service;
pub mod theme;

use std::sync::Arc;

pub use account_service::*;
pub use group_service::*;
pub use media::{MediaCategory, MediaKind, MediaStore, StoredMedia, Upload};
pub use post_service::*;
pub use social_service::*;
pub use theme::Theme;

use crate::config::MediaConfig;
use crate::storage::SeaOrmStorage;

/// 全部业务服务
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub media: Arc<MediaStore>,
    pub accounts: Arc<AccountService>,
    pub posts: Arc<PostService>,
    pub social: Arc<SocialService>,
    pub groups: Arc<GroupService>,
}

impl AppServices {
    pub fn new(storage: Arc<SeaOrmStorage>, media_config: &MediaConfig) -> Self {
        let media = Arc::new(MediaStore::new(media_config));
        let accounts = Arc::new(AccountService::new(storage.clone(), media.clone()));
        let posts = Arc::new(PostService::new(storage.clone(), media.clone()));
        let social = Arc::new(SocialService::new(storage.clone(), posts.clone()));
        let groups = Arc::new(GroupService::new(
            storage.clone(),
            media.clone(),
            posts.clone(),
        ));

        Self {
            storage,
            media,
            accounts,
            posts,
            social,
            groups,
        }
    }
}
