use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg::util::frame::video::Video;
use ffmpeg::{codec, decoder, format, media, rescale, software, Error, Rescale};
use ffmpeg_next::{self as ffmpeg};
use image::codecs::jpeg;
use image::ImageBuffer;
use tracing::debug;

use super::PtsRange;
use crate::planner::BatchWindow;

const JPEG_QUALITY: u8 = 90;

/// Longest edge of a stored frame. Frames are resent with every later turn.
pub const MAX_FRAME_EDGE: u32 = 768;

/// File name of the `seq`-th frame (1-based) of a batch.
pub fn frame_file_name(batch: usize, seq: usize) -> String {
    format!("batch_{}_frame-{}.jpg", batch, seq)
}

/// Picks one frame per `step` on a grid anchored at the window start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameSampler {
    next: i64,
    step: i64,
}

impl FrameSampler {
    fn new(start: i64, step: i64) -> Self {
        Self {
            next: start,
            step: step.max(1),
        }
    }

    /// Whether the frame at `pts` is kept. After a gap the grid skips ahead instead of
    /// emitting the missed slots back to back.
    fn take(&mut self, pts: i64) -> bool {
        if pts < self.next {
            return false;
        }
        while self.next <= pts {
            self.next += self.step;
        }
        true
    }
}

/// Output size that fits within `max_edge` and keeps the aspect ratio. Never upscales.
fn scaled_size(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width, height);
    }
    let scale = |side: u32| ((side as u64 * max_edge as u64) / longest as u64).max(1) as u32;
    (scale(width), scale(height))
}

/// Decode the window and write one JPEG every `interval`, in temporal order.
pub(crate) fn capture_frames(
    input_path: &Path,
    window: &BatchWindow,
    interval: Duration,
    output_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut input = format::input(&input_path)?;

    let seek_pos = (window.start.as_millis() as i64).rescale((1, 1000), rescale::TIME_BASE);
    input.seek(seek_pos, ..seek_pos)?;

    let video_stream = input
        .streams()
        .best(media::Type::Video)
        .ok_or(anyhow::anyhow!(Error::StreamNotFound))?;
    let video_stream_index = video_stream.index();
    let time_base = video_stream.time_base();
    let mut decoder = codec::context::Context::from_parameters(video_stream.parameters())?
        .decoder()
        .video()?;

    let (width, height) = scaled_size(decoder.width(), decoder.height(), MAX_FRAME_EDGE);
    let mut scaler = software::scaling::context::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        format::Pixel::RGB24,
        width,
        height,
        software::scaling::Flags::BILINEAR,
    )?;

    let range = PtsRange::new(window, time_base);
    let step = (interval.as_millis().max(1) as i64).rescale((1, 1000), time_base);
    let mut sampler = FrameSampler::new(range.start, step);

    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();
    let mut finished = false;

    let mut receive_and_write_frames = |decoder: &mut decoder::Video| -> anyhow::Result<bool> {
        let mut decoded = Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let pts = decoded
                .timestamp()
                .ok_or(anyhow::anyhow!("No timestamp"))?;
            if range.is_past(pts) {
                return Ok(true);
            }
            if !sampler.take(pts) {
                continue;
            }

            let mut frame = Video::empty();
            scaler.run(&decoded, &mut frame)?;
            let image_buffer = ImageBuffer::<image::Rgb<u8>, _>::from_raw(
                frame.width(),
                frame.height(),
                packed_rgb(&frame),
            )
            .ok_or(anyhow::anyhow!("Failed to create image buffer"))?;

            let path = output_dir.join(frame_file_name(window.index, written.len() + 1));
            let mut jpeg_data = Vec::new();
            let mut encoder = jpeg::JpegEncoder::new_with_quality(&mut jpeg_data, JPEG_QUALITY);
            encoder.encode(
                &image_buffer,
                image_buffer.width(),
                image_buffer.height(),
                image::ExtendedColorType::Rgb8,
            )?;
            fs::write(&path, &jpeg_data)?;
            written.push(path);
        }
        Ok(false)
    };

    for (stream, packet) in input.packets() {
        if stream.index() != video_stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        if receive_and_write_frames(&mut decoder)? {
            finished = true;
            break;
        }
    }
    if !finished {
        decoder.send_eof()?;
        receive_and_write_frames(&mut decoder)?;
    }

    debug!(batch = window.index, frames = written.len(), "Captured frames");
    Ok(written)
}

/// Copy RGB24 rows without the scaler's line padding.
fn packed_rgb(frame: &Video) -> Vec<u8> {
    let width = frame.width() as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);
    if stride == width {
        return data[..width * frame.height() as usize].to_vec();
    }
    data.chunks(stride)
        .take(frame.height() as usize)
        .flat_map(|row| &row[..width])
        .copied()
        .collect()
}
