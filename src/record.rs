//! The unit of persistence: one fetched image plus the metadata describing it.

use crate::search::Descriptor;
use bytes::Bytes;
use image::ImageReader;
use std::io::Cursor;
use thiserror::Error;

/// A fully populated image, ready to be written.
///
/// Construction enforces that the source URL, title and content are all
/// non-empty, so holding an `ImageRecord` means it may be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    source_url: String,
    title: String,
    binary_content: Bytes,
    query_term: String,
    mime_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

impl ImageRecord {
    /// Builds a record from a descriptor and the bytes fetched for it.
    ///
    /// The MIME type is sniffed from the content. Dimensions are read from the
    /// image header, falling back to what the descriptor reports when the
    /// header is unreadable; they stay unset if neither source knows them.
    pub fn new(
        descriptor: &Descriptor,
        query_term: &str,
        binary_content: Bytes,
    ) -> Result<ImageRecord, RecordError> {
        if descriptor.source_url.trim().is_empty() {
            return Err(RecordError::Missing {
                field: "source_url",
            });
        }
        if descriptor.title.trim().is_empty() {
            return Err(RecordError::Missing { field: "title" });
        }
        if binary_content.is_empty() {
            return Err(RecordError::Missing {
                field: "binary_content",
            });
        }

        let mime_type = infer::get(&binary_content).map(|kind| kind.mime_type().to_string());

        let (width, height) = match header_dimensions(&binary_content) {
            Some((width, height)) => (Some(width), Some(height)),
            None => (descriptor.width, descriptor.height),
        };

        Ok(ImageRecord {
            source_url: descriptor.source_url.clone(),
            title: descriptor.title.clone(),
            binary_content,
            query_term: query_term.to_string(),
            mime_type,
            width,
            height,
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn binary_content(&self) -> &Bytes {
        &self.binary_content
    }

    pub fn query_term(&self) -> &str {
        &self.query_term
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }
}

/// Reads width and height from the image header without decoding pixels.
fn header_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// A required field was empty; the record is dropped.
    #[error("incomplete record: {field} is empty")]
    Missing { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::{ImageRecord, RecordError};
    use crate::search::Descriptor;
    use bytes::Bytes;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn descriptor(title: &str) -> Descriptor {
        Descriptor {
            source_url: "https://cdn.example.com/t/1.jpg".to_string(),
            title: title.to_string(),
            width: None,
            height: None,
        }
    }

    fn png(width: u32, height: u32) -> Bytes {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        Bytes::from(buf.into_inner())
    }

    #[test]
    fn test_metadata_is_read_from_content() {
        let record = ImageRecord::new(&descriptor("Red apple"), "red apple", png(3, 2)).unwrap();

        assert_eq!("https://cdn.example.com/t/1.jpg", record.source_url());
        assert_eq!("Red apple", record.title());
        assert_eq!("red apple", record.query_term());
        assert_eq!(Some("image/png"), record.mime_type());
        assert_eq!((Some(3), Some(2)), (record.width(), record.height()));
    }

    #[test]
    fn test_header_dimensions_win_over_descriptor() {
        let mut with_size = descriptor("Red apple");
        with_size.width = Some(1200);
        with_size.height = Some(800);

        let record = ImageRecord::new(&with_size, "red apple", png(3, 2)).unwrap();

        assert_eq!((Some(3), Some(2)), (record.width(), record.height()));
    }

    #[test]
    fn test_descriptor_dimensions_fill_unreadable_header() {
        let mut with_size = descriptor("Red apple");
        with_size.width = Some(1200);
        with_size.height = Some(800);

        let record = ImageRecord::new(
            &with_size,
            "red apple",
            Bytes::from_static(b"\xff\xd8\xff\xe0truncated"),
        )
        .unwrap();

        assert_eq!(Some("image/jpeg"), record.mime_type());
        assert_eq!((Some(1200), Some(800)), (record.width(), record.height()));
    }

    #[test]
    fn test_unknown_content_keeps_metadata_empty() {
        let record = ImageRecord::new(
            &descriptor("Red apple"),
            "red apple",
            Bytes::from_static(b"definitely not an image"),
        )
        .unwrap();

        assert_eq!(None, record.mime_type());
        assert_eq!((None, None), (record.width(), record.height()));
    }

    #[test]
    fn test_partial_records_are_rejected() {
        assert_eq!(
            Err(RecordError::Missing { field: "title" }),
            ImageRecord::new(&descriptor(" "), "red apple", png(1, 1))
        );
        assert_eq!(
            Err(RecordError::Missing {
                field: "binary_content"
            }),
            ImageRecord::new(&descriptor("Red apple"), "red apple", Bytes::new())
        );

        let mut no_url = descriptor("Red apple");
        no_url.source_url = String::new();
        assert_eq!(
            Err(RecordError::Missing {
                field: "source_url"
            }),
            ImageRecord::new(&no_url, "red apple", png(1, 1))
        );
    }
}
