//! 当前用户的个人资料

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;

use crate::api::middleware::AuthenticatedUser;
use crate::errors::{AgoraError, Result};
use crate::services::{AccountService, MediaStore, SocialService, UpdateProfileRequest};
use crate::storage::User;

use super::feed::current_theme;
use super::helpers::{JsonOrForm, api_result};
use super::types::{ChangePasswordRequest, MessageResponse, ProfilePage};
use super::upload::{FormFields, read_multipart};

const PICTURE_FIELD: &str = "profile_picture";
const PICTURE_FORM: FormFields = FormFields {
    text: &[],
    file: PICTURE_FIELD,
};

/// GET /api/profile
pub async fn get_profile(
    req: HttpRequest,
    user: AuthenticatedUser,
    accounts: web::Data<Arc<AccountService>>,
    social: web::Data<Arc<SocialService>>,
) -> HttpResponse {
    let theme = current_theme(&req);
    let result = async {
        let me = accounts.get_user(user.id).await?;
        let profile = social.profile_of(user.id, me).await?;
        Ok::<_, AgoraError>(ProfilePage { profile, theme })
    }
    .await;
    api_result(result)
}

/// PUT /api/profile
pub async fn update_profile(
    user: AuthenticatedUser,
    accounts: web::Data<Arc<AccountService>>,
    body: JsonOrForm<UpdateProfileRequest>,
) -> HttpResponse {
    api_result(accounts.update_profile(user.id, body.into_inner()).await)
}

async fn replace_picture(
    user_id: i64,
    payload: Multipart,
    accounts: &AccountService,
    media: &MediaStore,
) -> Result<User> {
    let mut form = read_multipart(payload, PICTURE_FORM, media.max_upload_bytes()).await?;
    let upload = form
        .take_file(PICTURE_FIELD)
        .ok_or_else(|| AgoraError::validation("No profile picture uploaded"))?;
    let user = accounts.update_profile_picture(user_id, upload).await?;
    info!("User {} updated profile picture", user_id);
    Ok(user)
}

/// POST /api/profile/picture (multipart `profile_picture`)
pub async fn upload_picture(
    user: AuthenticatedUser,
    payload: Multipart,
    accounts: web::Data<Arc<AccountService>>,
    media: web::Data<Arc<MediaStore>>,
) -> HttpResponse {
    api_result(replace_picture(user.id, payload, &accounts, &media).await)
}

/// POST /api/profile/password
pub async fn change_password(
    user: AuthenticatedUser,
    accounts: web::Data<Arc<AccountService>>,
    body: JsonOrForm<ChangePasswordRequest>,
) -> HttpResponse {
    let req = body.into_inner();
    let result = async {
        if req
            .confirm_password
            .as_deref()
            .is_some_and(|c| c != req.new_password)
        {
            return Err(AgoraError::validation("Passwords do not match"));
        }
        accounts
            .change_password(user.id, &req.current_password, &req.new_password)
            .await?;
        Ok::<_, AgoraError>(MessageResponse {
            message: "Password updated".to_string(),
        })
    }
    .await;
    api_result(result)
}
