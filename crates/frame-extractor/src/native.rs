//! In-process middle-frame extraction with ffmpeg-next
//!
//! Decodes sequentially up to the target index rather than seeking, so the
//! selected frame does not depend on keyframe placement.

use drone_locate_common::{ProcessingError, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use std::path::Path;
use tracing::{debug, info};

use crate::{discard_output, middle_frame_index, ExtractedFrame, FrameExtractor};

/// Frame extractor backed by linked FFmpeg libraries
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFrameExtractor;

fn ffmpeg_error(context: &str, e: ffmpeg::Error) -> ProcessingError {
    ProcessingError::FFmpegError(format!("{context}: {e}"))
}

/// Frame count from the stream header, or by counting packets when absent
fn count_frames(video: &Path) -> Result<u64> {
    let mut ictx =
        ffmpeg::format::input(&video).map_err(|e| ffmpeg_error("Failed to open input file", e))?;
    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or(ProcessingError::NoVideoStream)?;
    let stream_index = stream.index();

    if let Ok(frames) = u64::try_from(stream.frames()) {
        if frames > 0 {
            return Ok(frames);
        }
    }

    debug!("No frame count in header of {}, counting packets", video.display());
    let counted = ictx
        .packets()
        .filter(|(stream, _)| stream.index() == stream_index)
        .count();
    Ok(counted as u64)
}

/// Copy an RGB24 frame into a contiguous buffer, dropping row padding
fn rgb_image(frame: &ffmpeg::util::frame::video::Video) -> Result<RgbImage> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let stride = frame.stride(0);
    let plane_data = frame.data(0);

    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        data.extend_from_slice(&plane_data[row_start..row_start + width * 3]);
    }

    RgbImage::from_raw(frame.width(), frame.height(), data)
        .ok_or_else(|| ProcessingError::ImageError("Frame buffer size mismatch".to_string()))
}

fn decode_frame_at(video: &Path, target: u64) -> Result<RgbImage> {
    let mut ictx =
        ffmpeg::format::input(&video).map_err(|e| ffmpeg_error("Failed to open input file", e))?;
    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or(ProcessingError::NoVideoStream)?;
    let stream_index = stream.index();

    let mut decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .map_err(|e| ffmpeg_error("Failed to create context", e))?
        .decoder()
        .video()
        .map_err(|e| ffmpeg_error("Failed to create decoder", e))?;

    let mut scaler = ffmpeg::software::scaling::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg::format::Pixel::RGB24,
        decoder.width(),
        decoder.height(),
        ffmpeg::software::scaling::Flags::BILINEAR,
    )
    .map_err(|e| ffmpeg_error("Failed to create scaler", e))?;

    let mut decoded = ffmpeg::util::frame::video::Video::empty();
    let mut converted = ffmpeg::util::frame::video::Video::empty();
    let mut frame_number = 0u64;

    let mut take_target = |decoder: &mut ffmpeg::decoder::Video| -> Result<Option<RgbImage>> {
        while decoder.receive_frame(&mut decoded).is_ok() {
            if frame_number == target {
                scaler
                    .run(&decoded, &mut converted)
                    .map_err(|e| ffmpeg_error("Failed to convert frame", e))?;
                return rgb_image(&converted).map(Some);
            }
            frame_number += 1;
        }
        Ok(None)
    };

    for (stream, packet) in ictx.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if decoder.send_packet(&packet).is_ok() {
            if let Some(image) = take_target(&mut decoder)? {
                return Ok(image);
            }
        }
    }

    decoder.send_eof().ok();
    take_target(&mut decoder)?.ok_or(ProcessingError::FrameNotDecoded { index: target })
}

impl FrameExtractor for NativeFrameExtractor {
    fn extract_middle_frame(&self, video: &Path, dest: &Path) -> Result<ExtractedFrame> {
        ffmpeg::init().map_err(|e| ffmpeg_error("Failed to initialize FFmpeg", e))?;

        let total_frames = count_frames(video)?;
        if total_frames == 0 {
            return Err(ProcessingError::EmptyVideo(video.to_path_buf()));
        }
        let frame_index = middle_frame_index(total_frames);

        let image = decode_frame_at(video, frame_index)?;
        if let Err(e) = image.save(dest) {
            discard_output(dest);
            return Err(e.into());
        }

        info!(
            "Decoded frame {} of {} from {} to {}",
            frame_index,
            total_frames,
            video.display(),
            dest.display()
        );

        Ok(ExtractedFrame {
            path: dest.to_path_buf(),
            frame_index,
            total_frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("frame.jpg");
        let result = NativeFrameExtractor.extract_middle_frame(&dir.path().join("nope.mp4"), &dest);
        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
