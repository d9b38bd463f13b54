//! Raw and WAV dumps of the synthesised buffer.
//!
//! Raw dumps are headerless little-endian i16, two bytes per sample.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use hb_synth::SampleBuffer;

pub fn write_raw(w: &mut impl Write, samples: &[i16]) -> io::Result<()> {
    for sample in samples {
        w.write_all(&sample.to_le_bytes())?;
    }
    Ok(())
}

pub fn buffer_to_raw(buffer: &SampleBuffer) -> Vec<u8> {
    buffer
        .samples()
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect()
}

/// Read a raw dump back. A trailing odd byte is an error.
pub fn read_raw(r: &mut impl Read) -> io::Result<Vec<i16>> {
    let mut bytes = Vec::new();
    r.read_to_end(&mut bytes)?;
    if bytes.len() % 2 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "raw dump has an odd number of bytes",
        ));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

/// Size of the RIFF, `fmt ` and `data` headers written by [`write_wav`].
pub const WAV_HEADER_LEN: usize = 44;

/// Mono 16-bit PCM WAV.
pub fn write_wav(w: &mut impl Write, samples: &[i16], sample_rate: u32) -> io::Result<()> {
    const BYTES_PER_SAMPLE: u16 = 2;
    let data_size = samples.len() as u32 * BYTES_PER_SAMPLE as u32;

    let mut header = Vec::with_capacity(WAV_HEADER_LEN);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&(WAV_HEADER_LEN as u32 - 8 + data_size).to_le_bytes());
    header.extend_from_slice(b"WAVEfmt ");
    // PCM fmt chunk: size 16, format 1, one channel
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&1u16.to_le_bytes());
    header.extend_from_slice(&sample_rate.to_le_bytes());
    header.extend_from_slice(&(sample_rate * BYTES_PER_SAMPLE as u32).to_le_bytes());
    header.extend_from_slice(&BYTES_PER_SAMPLE.to_le_bytes());
    header.extend_from_slice(&(BYTES_PER_SAMPLE * 8).to_le_bytes());
    header.extend_from_slice(b"data");
    header.extend_from_slice(&data_size.to_le_bytes());

    w.write_all(&header)?;
    write_raw(w, samples)
}

/// Dump `buffer` to `path`: WAV for a `.wav` extension, raw otherwise.
pub fn dump_buffer(path: &Path, buffer: &SampleBuffer) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    let is_wav = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        write_wav(&mut w, buffer.samples(), buffer.sample_rate())?;
    } else {
        write_raw(&mut w, buffer.samples())?;
    }
    w.flush()
}
