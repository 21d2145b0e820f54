use std::path::Path;

use anyhow::anyhow;
use ffmpeg::channel_layout::ChannelLayout;
use ffmpeg::encoder;
use ffmpeg::util::frame::audio::Audio;
use ffmpeg_next::{
    self as ffmpeg, codec, decoder, filter, format, media, rescale, Error, Packet, Rational,
    Rescale,
};
use tracing::debug;

use super::PtsRange;
use crate::planner::BatchWindow;

pub const AUDIO_MIME_TYPE: &str = "audio/aac";

/// Used when the source stream does not report a bit rate.
const DEFAULT_BIT_RATE: usize = 128_000;

/// File name of a batch's audio clip.
pub fn audio_file_name(batch: usize) -> String {
    format!("audio_chunk_{}.aac", batch)
}

/// Decodes the source audio stream and re-encodes the part inside one window to AAC.
struct ClipEncoder {
    decoder: decoder::Audio,
    encoder: encoder::Audio,
    graph: filter::Graph,
    time_base: Rational,
    range: PtsRange,
}

impl ClipEncoder {
    fn new(
        input_stream: &format::stream::Stream,
        output: &mut format::context::Output,
        window: &BatchWindow,
    ) -> anyhow::Result<Self> {
        let time_base = input_stream.time_base();
        let decoder = codec::context::Context::from_parameters(input_stream.parameters())?
            .decoder()
            .audio()?;
        let encoder = open_aac(&decoder, time_base, output)?;
        let graph = conversion_graph(&decoder, &encoder, time_base)?;

        Ok(Self {
            decoder,
            encoder,
            graph,
            time_base,
            range: PtsRange::new(window, time_base),
        })
    }

    fn send_packet(&mut self, packet: &Packet) -> anyhow::Result<()> {
        self.decoder.send_packet(packet).map_err(anyhow::Error::from)
    }

    fn drain_decoder(&mut self, output: &mut format::context::Output) -> anyhow::Result<()> {
        let mut frame = Audio::empty();
        while self.decoder.receive_frame(&mut frame).is_ok() {
            let Some(pts) = frame.timestamp() else {
                continue;
            };
            if self.range.is_before(pts) {
                continue;
            }
            frame.set_pts(Some(pts - self.range.start));
            node(&mut self.graph, "in")?.source().add(&frame)?;
            self.drain_filter(output)?;
        }
        Ok(())
    }

    fn drain_filter(&mut self, output: &mut format::context::Output) -> anyhow::Result<()> {
        let mut frame = Audio::empty();
        while node(&mut self.graph, "out")?.sink().frame(&mut frame).is_ok() {
            self.encoder.send_frame(&frame)?;
            self.drain_encoder(output)?;
        }
        Ok(())
    }

    fn drain_encoder(&mut self, output: &mut format::context::Output) -> anyhow::Result<()> {
        let output_time_base = output
            .stream(0)
            .ok_or(Error::StreamNotFound)?
            .time_base();
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(self.time_base, output_time_base);
            packet.write_interleaved(output)?;
        }
        Ok(())
    }

    fn finish(&mut self, output: &mut format::context::Output) -> anyhow::Result<()> {
        self.decoder.send_eof()?;
        self.drain_decoder(output)?;
        node(&mut self.graph, "in")?.source().flush()?;
        self.drain_filter(output)?;
        self.encoder.send_eof()?;
        self.drain_encoder(output)
    }
}

/// Add an AAC stream to `output` at the source sample rate and open its encoder.
fn open_aac(
    decoder: &decoder::Audio,
    time_base: Rational,
    output: &mut format::context::Output,
) -> anyhow::Result<encoder::Audio> {
    let aac = encoder::find(codec::Id::AAC)
        .ok_or(Error::EncoderNotFound)?
        .audio()?;
    let global_header = output
        .format()
        .flags()
        .contains(format::Flags::GLOBAL_HEADER);

    let mut stream = output.add_stream(aac)?;
    let mut encoder = codec::context::Context::from_parameters(stream.parameters())?
        .encoder()
        .audio()?;
    if global_header {
        encoder.set_flags(codec::Flags::GLOBAL_HEADER);
    }

    let layout = aac
        .channel_layouts()
        .map(|layouts| layouts.best(decoder.channel_layout().channels()))
        .unwrap_or(ChannelLayout::STEREO);
    let sample_format = aac
        .formats()
        .and_then(|mut formats| formats.next())
        .ok_or_else(|| anyhow!("AAC encoder lists no sample formats"))?;

    encoder.set_channel_layout(layout);
    encoder.set_format(sample_format);
    encoder.set_rate(decoder.rate() as _);
    encoder.set_bit_rate(match decoder.bit_rate() {
        0 => DEFAULT_BIT_RATE,
        rate => rate,
    });
    encoder.set_time_base(time_base);
    stream.set_time_base(time_base);

    let encoder = encoder.open_as(aac)?;
    stream.set_parameters(&encoder);
    Ok(encoder)
}

/// `abuffer -> aformat -> abuffersink`, converting decoded samples to what the encoder takes.
fn conversion_graph(
    decoder: &decoder::Audio,
    encoder: &encoder::Audio,
    time_base: Rational,
) -> anyhow::Result<filter::Graph> {
    let mut graph = filter::Graph::new();

    let source = format!(
        "time_base={}:sample_rate={}:sample_fmt={}:channel_layout=0x{:x}",
        time_base,
        decoder.rate(),
        decoder.format().name(),
        decoder.channel_layout().bits()
    );
    graph.add(&lookup("abuffer")?, "in", &source)?;
    graph.add(&lookup("abuffersink")?, "out", "")?;

    let conversion = format!(
        "aformat=sample_fmts={}:sample_rates={}:channel_layouts=0x{:x}",
        encoder.format().name(),
        encoder.rate(),
        encoder.channel_layout().bits()
    );
    graph.output("in", 0)?.input("out", 0)?.parse(&conversion)?;
    graph.validate()?;

    let fixed_frame_size = encoder.codec().map_or(true, |c| {
        !c.capabilities()
            .contains(codec::capabilities::Capabilities::VARIABLE_FRAME_SIZE)
    });
    if fixed_frame_size {
        node(&mut graph, "out")?
            .sink()
            .set_frame_size(encoder.frame_size());
    }
    Ok(graph)
}

fn lookup(name: &str) -> anyhow::Result<filter::Filter> {
    filter::find(name).ok_or_else(|| anyhow!("FFmpeg filter {} is not available", name))
}

fn node<'g>(graph: &'g mut filter::Graph, name: &str) -> anyhow::Result<filter::Context<'g>> {
    graph
        .get(name)
        .ok_or_else(|| anyhow!("Filter graph has no {} node", name))
}

/// Encode the window's audio track into `output_path`.
pub(crate) fn extract_audio(
    input_path: &Path,
    window: &BatchWindow,
    output_path: &Path,
) -> anyhow::Result<()> {
    let mut input = format::input(&input_path)?;
    let mut output = format::output(&output_path)?;

    let seek_pos = (window.start.as_millis() as i64).rescale((1, 1000), rescale::TIME_BASE);
    input.seek(seek_pos, ..seek_pos)?;

    let stream = input
        .streams()
        .best(media::Type::Audio)
        .ok_or_else(|| anyhow!("No audio stream in {}", input_path.display()))?;
    let stream_index = stream.index();
    let mut clip = ClipEncoder::new(&stream, &mut output, window)?;

    output.write_header()?;

    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        if packet.pts().is_some_and(|pts| clip.range.is_past(pts)) {
            break;
        }
        clip.send_packet(&packet)?;
        clip.drain_decoder(&mut output)?;
    }

    clip.finish(&mut output)?;
    output.write_trailer()?;

    debug!(batch = window.index, path = %output_path.display(), "Extracted audio clip");
    Ok(())
}
