/// Frame orientation and JPEG encoding for camera captures
///
/// Both the live preview and the captured image go through `orient`, so the
/// mirror setting is always the same for what the user sees and what gets
/// submitted.
use std::io::Cursor;

use image::{imageops, DynamicImage, ImageFormat, RgbaImage};

use super::device::Frame;

/// Build an image from the frame at native resolution, mirrored if asked
///
/// Returns `None` when the frame buffer does not match its dimensions.
pub fn orient(frame: &Frame, mirror: bool) -> Option<RgbaImage> {
    if frame.width == 0 || frame.height == 0 {
        return None;
    }
    let surface = RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())?;
    if mirror {
        Some(imageops::flip_horizontal(&surface))
    } else {
        Some(surface)
    }
}

/// Encode a captured frame as JPEG bytes
///
/// `None` means no blob was produced.
pub fn encode_capture(frame: &Frame, mirror: bool) -> Option<Vec<u8>> {
    let surface = orient(frame, mirror)?;
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(surface).to_rgb8();

    let mut bytes = Vec::new();
    match DynamicImage::ImageRgb8(rgb).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg) {
        Ok(()) => Some(bytes),
        Err(e) => {
            tracing::warn!(error = %e, "JPEG encode failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x1 frame: red pixel on the left, blue on the right
    fn two_pixel_frame() -> Frame {
        Frame {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 0, 255, 255],
        }
    }

    #[test]
    fn test_orient_without_mirror_keeps_layout() {
        let img = orient(&two_pixel_frame(), false).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_orient_with_mirror_flips_horizontally() {
        let img = orient(&two_pixel_frame(), true).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_encode_produces_jpeg_at_native_resolution() {
        let frame = Frame {
            width: 16,
            height: 8,
            rgba: vec![128; 16 * 8 * 4],
        };
        let bytes = encode_capture(&frame, true).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn test_mismatched_buffer_yields_no_blob() {
        let frame = Frame {
            width: 4,
            height: 4,
            rgba: vec![0; 10],
        };
        assert!(encode_capture(&frame, false).is_none());
    }

    #[test]
    fn test_empty_frame_yields_no_blob() {
        let frame = Frame {
            width: 0,
            height: 0,
            rgba: Vec::new(),
        };
        assert!(encode_capture(&frame, false).is_none());
    }
}
