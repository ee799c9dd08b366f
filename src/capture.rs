use crate::{CaptureError, Note, NoteContent, Result};

use arboard::Clipboard;
use log::{debug, trace};
use std::fmt;
use std::fs;
use std::path::Path;

/// Image encodings accepted for image notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    WebP,
}

impl ImageFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::WebP => "webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
            Self::WebP => "WebP",
        };
        f.write_str(name)
    }
}

/// Detects the image format from the leading magic bytes
#[must_use]
pub fn image_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.starts_with(b"BM") && bytes.len() > 14 {
        Some(ImageFormat::Bmp)
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::WebP)
    } else {
        None
    }
}

/// Source of clipboard text for new notes
pub trait ClipboardSource {
    /// Current clipboard text, or `None` when there is nothing to save
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::ClipboardUnavailable` if the clipboard can't be read
    fn text(&self) -> Result<Option<String>>;
}

/// The desktop clipboard, read through `arboard`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl ClipboardSource for SystemClipboard {
    fn text(&self) -> Result<Option<String>> {
        clipboard_text()
    }
}

/// Reads text from the system clipboard.
///
/// Returns `Ok(None)` when the clipboard holds no text or only whitespace.
///
/// # Errors
///
/// Returns `CaptureError::ClipboardUnavailable` if the clipboard can't be accessed
pub fn clipboard_text() -> Result<Option<String>> {
    let mut clipboard =
        Clipboard::new().map_err(|e| CaptureError::ClipboardUnavailable(e.to_string()))?;

    match clipboard.get_text() {
        Ok(text) if text.trim().is_empty() => {
            trace!("Clipboard text is blank");
            Ok(None)
        }
        Ok(text) => {
            debug!("Read {} bytes of text from clipboard", text.len());
            Ok(Some(text))
        }
        Err(arboard::Error::ContentNotAvailable) => {
            trace!("Clipboard holds no text");
            Ok(None)
        }
        Err(e) => Err(CaptureError::ClipboardUnavailable(e.to_string()).into()),
    }
}

/// Reads an image file to store as an image note
///
/// # Errors
///
/// Returns:
/// - `CaptureError::ImageReadError` if the file can't be read.
/// - `CaptureError::UnsupportedImage` if the bytes are not a known image format.
pub fn image_file(path: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(path).map_err(|source| CaptureError::ImageReadError {
        path: path.to_path_buf(),
        source,
    })?;

    match image_format(&bytes) {
        Some(format) => {
            debug!("Read {format} image '{}' ({} bytes)", path.display(), bytes.len());
            Ok(bytes)
        }
        None => Err(CaptureError::UnsupportedImage(path.to_path_buf()).into()),
    }
}

/// Default export file name, e.g. `note-3.txt` or `note-7.png`
#[must_use]
pub fn suggested_file_name(note: &Note) -> String {
    let extension = match &note.content {
        NoteContent::Text(_) => "txt",
        NoteContent::Image(bytes) => image_format(bytes).map_or("bin", ImageFormat::extension),
    };
    format!("note-{}.{extension}", note.id)
}

/// Writes the note content to `path`. Text as UTF-8, images as their original bytes
///
/// # Errors
///
/// Returns `CaptureError::ExportWriteError` if the file can't be written
pub fn write_content(path: &Path, content: &NoteContent) -> Result<()> {
    fs::write(path, content.as_bytes()).map_err(|source| CaptureError::ExportWriteError {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {} bytes to '{}'", content.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoteError;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn sniffs_known_formats() {
        assert_eq!(image_format(PNG_HEADER), Some(ImageFormat::Png));
        assert_eq!(image_format(&[0xff, 0xd8, 0xff, 0xe0]), Some(ImageFormat::Jpeg));
        assert_eq!(image_format(b"GIF89a......"), Some(ImageFormat::Gif));
        assert_eq!(image_format(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageFormat::WebP));
        assert_eq!(image_format(b"BM"), None);
        assert_eq!(image_format(b"hello world"), None);
        assert_eq!(image_format(&[]), None);
    }

    #[test]
    fn image_file_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "not an image").unwrap();

        let err = image_file(&path).unwrap_err();
        assert!(matches!(
            err,
            NoteError::Capture(CaptureError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn image_file_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = image_file(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(
            err,
            NoteError::Capture(CaptureError::ImageReadError { .. })
        ));
    }

    #[test]
    fn image_file_returns_bytes_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        fs::write(&path, PNG_HEADER).unwrap();

        assert_eq!(image_file(&path).unwrap(), PNG_HEADER);
    }

    #[test]
    fn export_name_follows_content() {
        let text = Note {
            id: 3,
            title: "t".to_string(),
            content: NoteContent::Text("x".to_string()),
        };
        let image = Note {
            id: 7,
            title: "i".to_string(),
            content: NoteContent::Image(PNG_HEADER.to_vec()),
        };
        assert_eq!(suggested_file_name(&text), "note-3.txt");
        assert_eq!(suggested_file_name(&image), "note-7.png");
    }
}
