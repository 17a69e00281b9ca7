//! 本地媒体存储
//!
//! 上传的图片和视频按类别写入 `upload_dir` 下的子目录，对外以
//! `public_prefix` 开头的 URL 暴露。

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use strum::{AsRefStr, EnumIter};
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::errors::{AgoraError, Result};

const MAX_EXTENSION_LEN: usize = 8;
const FALLBACK_EXTENSION: &str = "bin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// 根据 MIME 类型判断（`image/*` / `video/*`）
    ///
    /// SVG 可以内嵌脚本，同源提供会变成存储型 XSS，不当作图片接收。
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.split_once('/') {
            Some(("image", sub)) if sub.starts_with("svg") => None,
            Some(("image", sub)) if !sub.is_empty() => Some(MediaKind::Image),
            Some(("video", sub)) if !sub.is_empty() => Some(MediaKind::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum MediaCategory {
    ProfilePicture,
    Post,
    GroupCover,
}

impl MediaCategory {
    pub fn dir_name(&self) -> &'static str {
        match self {
            MediaCategory::ProfilePicture => "profile_pictures",
            MediaCategory::Post => "posts",
            MediaCategory::GroupCover => "groups",
        }
    }

    pub fn accepts(&self, kind: MediaKind) -> bool {
        match self {
            MediaCategory::Post => true,
            MediaCategory::ProfilePicture | MediaCategory::GroupCover => kind == MediaKind::Image,
        }
    }

    fn file_prefix(&self, kind: MediaKind) -> String {
        match self {
            MediaCategory::ProfilePicture => "profile".to_string(),
            MediaCategory::Post => format!("post_{}", kind.as_ref()),
            MediaCategory::GroupCover => "group".to_string(),
        }
    }
}

/// 一个已读入内存的上传文件
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredMedia {
    pub kind: MediaKind,
    pub url: String,
    #[serde(skip)]
    pub path: PathBuf,
}

pub struct MediaStore {
    upload_dir: PathBuf,
    public_prefix: String,
    max_image_bytes: u64,
    max_video_bytes: u64,
    default_profile_picture: String,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_dir),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
            max_image_bytes: config.max_image_bytes,
            max_video_bytes: config.max_video_bytes,
            default_profile_picture: config.default_profile_picture.clone(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    pub fn default_profile_picture(&self) -> &str {
        &self.default_profile_picture
    }

    /// 单个文件允许的最大字节数（视频上限更大）
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_image_bytes.max(self.max_video_bytes)
    }

    fn limit_for(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.max_image_bytes,
            MediaKind::Video => self.max_video_bytes,
        }
    }

    /// 启动时创建所有类别目录
    pub async fn ensure_dirs(&self) -> Result<()> {
        use strum::IntoEnumIterator;

        for category in MediaCategory::iter() {
            let dir = self.upload_dir.join(category.dir_name());
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                AgoraError::file_operation(format!(
                    "Failed to create media directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        debug!("Media directories ready under {}", self.upload_dir.display());
        Ok(())
    }

    /// 检查类型与大小，写入磁盘并返回公开 URL
    pub async fn save(
        &self,
        category: MediaCategory,
        owner: Option<i64>,
        upload: Upload,
    ) -> Result<StoredMedia> {
        let kind = MediaKind::from_content_type(&upload.content_type).ok_or_else(|| {
            AgoraError::unsupported_media(format!(
                "Unsupported content type '{}'",
                upload.content_type
            ))
        })?;
        if !category.accepts(kind) {
            return Err(AgoraError::unsupported_media(format!(
                "Only images are accepted here, got '{}'",
                upload.content_type
            )));
        }
        if upload.bytes.is_empty() {
            return Err(AgoraError::validation("Uploaded file is empty"));
        }
        let limit = self.limit_for(kind);
        if upload.bytes.len() as u64 > limit {
            return Err(AgoraError::payload_too_large(format!(
                "{} exceeds the {} byte limit",
                kind.as_ref(),
                limit
            )));
        }

        let ext = sanitize_extension(upload.filename.as_deref(), &upload.content_type);
        let filename = build_filename(&category.file_prefix(kind), owner, &ext);

        let dir = self.upload_dir.join(category.dir_name());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(&filename);
        tokio::fs::write(&path, &upload.bytes).await.map_err(|e| {
            AgoraError::file_operation(format!("Failed to write {}: {}", path.display(), e))
        })?;

        let url = format!("{}/{}/{}", self.public_prefix, category.dir_name(), filename);
        info!(
            "Stored {} upload ({} bytes) at {}",
            kind.as_ref(),
            upload.bytes.len(),
            url
        );
        Ok(StoredMedia { kind, url, path })
    }

    /// 尽力删除刚写入的文件（后续数据库写入失败时使用）
    pub async fn discard(&self, stored: &StoredMedia) {
        if let Err(e) = tokio::fs::remove_file(&stored.path).await {
            debug!("Failed to discard {}: {}", stored.path.display(), e);
        }
    }

    /// 把公开路径映射回磁盘文件，拒绝目录穿越
    ///
    /// 既接受完整 URL 路径（`/static/uploads/posts/a.png`），也接受前缀之后的部分。
    pub fn resolve(&self, public_path: &str) -> Result<PathBuf> {
        let relative = public_path
            .strip_prefix(self.public_prefix.as_str())
            .unwrap_or(public_path)
            .trim_start_matches('/');

        if relative.is_empty() || relative.contains('\\') || relative.contains('\0') {
            return Err(AgoraError::not_found("Media not found"));
        }

        let segments_ok = relative
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
        let rel_path = Path::new(relative);
        let components_ok = rel_path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !segments_ok || !components_ok {
            return Err(AgoraError::not_found("Media not found"));
        }

        Ok(self.upload_dir.join(rel_path))
    }
}

/// 取文件名最后一个点之后的部分；不合法时退回 MIME 子类型
fn sanitize_extension(filename: Option<&str>, content_type: &str) -> String {
    let valid = |ext: &str| {
        !ext.is_empty()
            && ext.len() <= MAX_EXTENSION_LEN
            && ext.chars().all(|c| c.is_ascii_alphanumeric())
    };

    if let Some((_, ext)) = filename.and_then(|f| f.rsplit_once('.'))
        && valid(ext)
    {
        return ext.to_ascii_lowercase();
    }

    let subtype = content_type
        .split(';')
        .next()
        .and_then(|essence| essence.split_once('/'))
        .map(|(_, sub)| sub.split('+').next().unwrap_or_default().trim())
        .unwrap_or_default();
    if valid(subtype) {
        subtype.to_ascii_lowercase()
    } else {
        FALLBACK_EXTENSION.to_string()
    }
}

fn build_filename(prefix: &str, owner: Option<i64>, ext: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];
    match owner {
        Some(owner) => format!("{}_{}_{}_{}.{}", prefix, owner, timestamp, suffix, ext),
        None => format!("{}_{}_{}.{}", prefix, timestamp, suffix, ext),
    }
}
