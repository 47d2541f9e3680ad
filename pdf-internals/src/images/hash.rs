//! Content hashing for image deduplication.
//!
//! Images are hashed over a lossless PNG re-encoding of their pixels, so two
//! images embedded with different compression but identical pixels collide.

use std::fmt;
use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder, ImageError};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

/// SHA-256 digest used as a deduplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Compute SHA-256 of a byte slice.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    ContentHash(hasher.finalize().into())
}

/// Lossless PNG encoding of `image`, used as the canonical byte form.
pub fn canonical_png(image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    PngEncoder::new(&mut buffer).write_image(
        image.as_bytes(),
        image.width(),
        image.height(),
        image.color().into(),
    )?;
    Ok(buffer.into_inner())
}

/// Hash of the canonical encoding of `image`.
pub fn image_content_hash(image: &DynamicImage) -> Result<ContentHash, ImageError> {
    Ok(compute_content_hash(&canonical_png(image)?))
}
