//! multipart 表单读取
//!
//! 每个端点声明自己接受的文本字段和唯一的文件字段；其他字段、重复字段
//! 以及超出总大小的请求体直接拒绝，不会先读进内存。

use std::collections::HashMap;

use actix_multipart::Multipart;
use futures_util::StreamExt;

use crate::errors::{AgoraError, Result};
use crate::services::Upload;

/// 单个文本字段上限
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;
/// 一个表单最多的分段数
const MAX_PARTS: usize = 8;

/// 端点接受的字段
#[derive(Debug, Clone, Copy)]
pub struct FormFields {
    pub text: &'static [&'static str],
    pub file: &'static str,
}

impl FormFields {
    fn accepts(&self, name: &str, is_file: bool) -> bool {
        if is_file {
            name == self.file
        } else {
            self.text.contains(&name)
        }
    }

    /// 所有文本字段加一个文件的总上限
    fn total_limit(&self, max_file_bytes: u64) -> u64 {
        max_file_bytes.saturating_add((self.text.len() * MAX_TEXT_FIELD_BYTES) as u64)
    }
}

#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Upload>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// 非空文本字段
    pub fn non_empty(&self, name: &str) -> Option<String> {
        self.text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// 取走上传文件；浏览器未选择文件时会发送空的文件字段，视为没有上传
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name).filter(|f| !f.bytes.is_empty())
    }

    fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.files.contains_key(name)
    }
}

/// 读取 multipart 请求体
///
/// 只收 `allowed` 里的字段；单个文件不超过 `max_file_bytes`，整个表单不超过
/// 文件上限加上所有文本字段的上限。
pub async fn read_multipart(
    mut payload: Multipart,
    allowed: FormFields,
    max_file_bytes: u64,
) -> Result<MultipartForm> {
    let mut form = MultipartForm::default();
    let total_limit = allowed.total_limit(max_file_bytes);
    let mut total: u64 = 0;
    let mut parts = 0usize;

    while let Some(item) = payload.next().await {
        let mut field = item
            .map_err(|e| AgoraError::invalid_multipart(format!("Invalid multipart data: {}", e)))?;

        parts += 1;
        if parts > MAX_PARTS {
            return Err(AgoraError::invalid_multipart(format!(
                "Too many form fields (max {})",
                MAX_PARTS
            )));
        }

        let name = field.name().unwrap_or("").to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        let is_file = filename.is_some()
            || content_type
                .as_deref()
                .is_some_and(|ct| !ct.starts_with("text/"));

        if !allowed.accepts(&name, is_file) {
            return Err(AgoraError::invalid_multipart(format!(
                "Unexpected form field '{}'",
                name
            )));
        }
        if form.contains(&name) {
            return Err(AgoraError::invalid_multipart(format!(
                "Duplicate form field '{}'",
                name
            )));
        }

        let limit = if is_file {
            max_file_bytes as usize
        } else {
            MAX_TEXT_FIELD_BYTES
        };

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let bytes = chunk
                .map_err(|e| AgoraError::invalid_multipart(format!("Failed to read upload: {}", e)))?;
            total = total.saturating_add(bytes.len() as u64);
            if data.len() + bytes.len() > limit || total > total_limit {
                return Err(AgoraError::payload_too_large(format!(
                    "Field '{}' exceeds the {} byte limit",
                    name, limit
                )));
            }
            data.extend_from_slice(&bytes);
        }

        if is_file {
            form.files.insert(
                name,
                Upload {
                    filename,
                    content_type: content_type
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                    bytes: data,
                },
            );
        } else {
            let value = String::from_utf8(data).map_err(|_| {
                AgoraError::invalid_multipart(format!("Field '{}' is not valid UTF-8", name))
            })?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
