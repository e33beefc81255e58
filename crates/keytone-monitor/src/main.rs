use std::fs::File;
use std::io::{self, BufReader, Read};

use clap::{Parser, ValueEnum};
use keytone_dtmf::{
    config::{DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE, DEFAULT_THRESHOLD},
    Analyzer, Config, DtmfTone, SampleSource,
};

const STDIN_PATH: &str = "-";
// Roughly matches the raw default of 35 for 205-sample blocks.
const DEFAULT_NORM_THRESHOLD: f32 = 1.0e-3;

#[derive(Parser, Debug)]
#[command(
    name = "keytone-monitor",
    about = "Report DTMF key presses found in a raw PCM stream"
)]
struct Args {
    /// Raw PCM input path, or "-" for stdin.
    input: String,

    /// Sample rate of the input in Hz.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    rate: u32,

    /// Number of interleaved channels.
    #[arg(long, default_value_t = 1)]
    channels: usize,

    /// Sample encoding of the input.
    #[arg(long, value_enum, default_value = "f32le")]
    format: SampleFormat,

    /// Samples per channel per detection block.
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block: usize,

    /// Detection threshold; defaults depend on --normalize.
    #[arg(long)]
    threshold: Option<f32>,

    /// Threshold the block-size-normalized response instead of the raw one.
    #[arg(long)]
    normalize: bool,

    /// Print merged tones with durations instead of raw transitions.
    #[arg(long)]
    tones: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SampleFormat {
    /// 32-bit float, little endian.
    F32le,
    /// Signed 16-bit, little endian.
    S16le,
}

impl SampleFormat {
    fn width(self) -> usize {
        match self {
            SampleFormat::F32le => 4,
            SampleFormat::S16le => 2,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let threshold = args.threshold.unwrap_or(if args.normalize {
        DEFAULT_NORM_THRESHOLD
    } else {
        DEFAULT_THRESHOLD
    });
    let config = Config::new(args.rate, args.block, threshold, args.normalize)?;

    let reader: Box<dyn Read> = if args.input == STDIN_PATH {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };
    let source = PcmSource::new(reader, args.format, args.channels, args.rate);
    let mut analyzer = Analyzer::new(source, config)?;

    if args.tones {
        let changes = analyzer.analyze_all();
        for tone in DtmfTone::from_changes(&changes) {
            println!(
                "{:9.3}s  ch{}  {}  {:.3}s",
                tone.position.as_secs_f64(),
                tone.channel,
                tone.key,
                tone.duration.as_secs_f64(),
            );
        }
    } else {
        while analyzer.more_samples_available() {
            for change in analyzer.analyze_next_block() {
                println!(
                    "{:9.3}s  ch{}  {}  {}",
                    change.position.as_secs_f64(),
                    change.channel,
                    if change.is_start { "start" } else { "stop " },
                    change.key,
                );
            }
        }
    }

    Ok(())
}

/// Sample source over raw little-endian PCM bytes from any reader.
struct PcmSource<R> {
    reader: R,
    format: SampleFormat,
    channels: usize,
    sample_rate: u32,
    bytes: Vec<u8>,
}

impl<R: Read> PcmSource<R> {
    fn new(reader: R, format: SampleFormat, channels: usize, sample_rate: u32) -> Self {
        Self {
            reader,
            format,
            channels,
            sample_rate,
            bytes: Vec::new(),
        }
    }
}

impl<R: Read> SampleSource for PcmSource<R> {
    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fill_block(&mut self, block: &mut [f32]) -> usize {
        let width = self.format.width();
        self.bytes.resize(block.len() * width, 0);
        let filled = read_fully(&mut self.reader, &mut self.bytes);

        // Drop any trailing partial sample or partial frame at EOF.
        let mut samples = filled / width;
        if self.channels > 0 {
            samples = samples / self.channels * self.channels;
        }

        for (slot, raw) in block[..samples]
            .iter_mut()
            .zip(self.bytes.chunks_exact(width))
        {
            *slot = decode_sample(self.format, raw);
        }
        samples
    }
}

fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                eprintln!("read error: {}", e);
                break;
            }
        }
    }
    filled
}

fn decode_sample(format: SampleFormat, raw: &[u8]) -> f32 {
    match format {
        SampleFormat::F32le => f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
        SampleFormat::S16le => f32::from(i16::from_le_bytes([raw[0], raw[1]])) / 32_768.0,
    }
}
