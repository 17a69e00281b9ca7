//! 小组

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};

use crate::api::middleware::AuthenticatedUser;
use crate::errors::{AgoraError, Result};
use crate::services::{CreateGroup, GroupService, MediaStore};
use crate::storage::Group;

use super::helpers::{api_result, created_response, error_from_agora};
use super::types::GroupsView;
use super::upload::{FormFields, read_multipart};

const COVER_FIELD: &str = "cover_image";
const GROUP_FORM: FormFields = FormFields {
    text: &["name", "description"],
    file: COVER_FIELD,
};

/// GET /api/groups：全部小组 + 我加入的小组
pub async fn list_groups(
    user: AuthenticatedUser,
    groups: web::Data<Arc<GroupService>>,
) -> HttpResponse {
    let result = async {
        let all_groups = groups.list_groups().await?;
        let user_groups = groups.groups_for_user(user.id).await?;
        Ok::<_, AgoraError>(GroupsView {
            all_groups,
            user_groups,
        })
    }
    .await;
    api_result(result)
}

async fn create_from_form(
    creator: i64,
    payload: Multipart,
    groups: &GroupService,
    media: &MediaStore,
) -> Result<Group> {
    let mut form = read_multipart(payload, GROUP_FORM, media.max_upload_bytes()).await?;
    let req = CreateGroup {
        name: form.text("name").unwrap_or_default().to_string(),
        description: form.non_empty("description"),
    };
    let cover = form.take_file(COVER_FIELD);

    groups.create_group(creator, req, cover).await
}

/// POST /api/groups (multipart `name`, `description?`, `cover_image?`)
pub async fn create_group(
    user: AuthenticatedUser,
    payload: Multipart,
    groups: web::Data<Arc<GroupService>>,
    media: web::Data<Arc<MediaStore>>,
) -> HttpResponse {
    match create_from_form(user.id, payload, &groups, &media).await {
        Ok(group) => created_response(group),
        Err(e) => error_from_agora(&e),
    }
}

/// GET /api/groups/{id}
pub async fn get_group(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    groups: web::Data<Arc<GroupService>>,
) -> HttpResponse {
    api_result(groups.group_detail(user.id, path.into_inner()).await)
}

/// POST /api/groups/{id}/join：加入或退出
pub async fn toggle_membership(
    user: AuthenticatedUser,
    path: web::Path<i64>,
    groups: web::Data<Arc<GroupService>>,
) -> HttpResponse {
    api_result(groups.toggle_membership(user.id, path.into_inner()).await)
}
