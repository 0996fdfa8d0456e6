// src/services/media_services.rs - image attachments for posts
use std::io;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose};
use log::{info, warn};
use mime::Mime;
use uuid::Uuid;

use crate::dtos::post_dtos::ImageUpload;

/// Sub-directory (and reference prefix) for post images.
pub const UPLOAD_DIR: &str = "posts";

const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

pub const INVALID_TYPE: &str = "Invalid file type. Only JPEG, PNG, GIF, and WEBP are allowed.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Upload that passed validation, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

fn looks_like(extension: &str, bytes: &[u8]) -> bool {
    match extension {
        "jpg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "png" => bytes.starts_with(&[0x89, b'P', b'N', b'G']),
        "gif" => bytes.starts_with(b"GIF8"),
        "webp" => bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP",
        _ => false,
    }
}

/// Checks content type and payload. Errors are user-facing messages.
/// Without a content type, the file name's extension decides.
pub fn decode_image(upload: &ImageUpload) -> Result<DecodedImage, &'static str> {
    let content_type = match upload.content_type.trim() {
        "" => content_type_for(&upload.file_name).essence_str().to_string(),
        given => given.to_string(),
    };
    let extension = ALLOWED_TYPES
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
        .ok_or(INVALID_TYPE)?;

    // Remove data URL prefix if present (data:image/jpeg;base64,)
    let data = match upload.image_data.split_once(',') {
        Some((_, rest)) => rest,
        None => upload.image_data.as_str(),
    };
    let bytes = general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|_| INVALID_IMAGE)?;
    if !looks_like(extension, &bytes) {
        return Err(INVALID_IMAGE);
    }
    Ok(DecodedImage { bytes, extension })
}

pub fn content_type_for(file_name: &str) -> Mime {
    match Path::new(file_name).extension().and_then(|ext| ext.to_str()) {
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        Some("png") => mime::IMAGE_PNG,
        Some("gif") => mime::IMAGE_GIF,
        Some("webp") => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Local file storage rooted at `MEDIA_ROOT`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes the image and returns its reference, `posts/<file>`.
    pub fn save(&self, image: &DecodedImage) -> io::Result<String> {
        let dir = self.root.join(UPLOAD_DIR);
        std::fs::create_dir_all(&dir)?;
        let file_name = format!("{}.{}", Uuid::new_v4(), image.extension);
        std::fs::write(dir.join(&file_name), &image.bytes)?;
        info!("stored image {}/{} ({} bytes)", UPLOAD_DIR, file_name, image.bytes.len());
        Ok(format!("{UPLOAD_DIR}/{file_name}"))
    }

    /// Deletes a stored image by its reference. Best effort: failures are logged.
    pub fn remove(&self, reference: &str) {
        let Some(safe_name) = Path::new(reference).file_name() else {
            return;
        };
        if let Err(e) = std::fs::remove_file(self.root.join(UPLOAD_DIR).join(safe_name)) {
            warn!("could not remove image {}: {}", reference, e);
        }
    }

    /// Reads `posts/<file_name>`. `None` when missing.
    pub fn open(&self, file_name: &str) -> io::Result<Option<(Vec<u8>, Mime)>> {
        // Sanitize filename to prevent directory traversal
        let Some(safe_name) = Path::new(file_name).file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        match std::fs::read(self.root.join(UPLOAD_DIR).join(safe_name)) {
            Ok(data) => Ok(Some((data, content_type_for(safe_name)))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
