use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use taggame_core::FrameSnapshot;

/// Largest encoded frame accepted in a recording.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024; // 1 MiB

#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("recording I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("frame encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("frame decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("frame too large: {0} bytes (max {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),
    #[error("recording truncated inside frame {0}")]
    Truncated(u64),
}

/// Writes frames as a sequence of big-endian `u32` length prefixes, each
/// followed by one MessagePack-encoded `FrameSnapshot`.
pub struct FrameRecorder<W: Write> {
    writer: W,
    frames: u64,
}

impl FrameRecorder<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, RecordingError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> FrameRecorder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, frames: 0 }
    }

    pub fn record(&mut self, frame: &FrameSnapshot) -> Result<(), RecordingError> {
        let bytes = frame.encode()?;
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(RecordingError::FrameTooLarge(bytes.len()));
        }
        self.writer.write_all(&(bytes.len() as u32).to_be_bytes())?;
        self.writer.write_all(&bytes)?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W, RecordingError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Read every frame of a recording. A partial trailing frame is an error.
pub fn read_frames(mut reader: impl Read) -> Result<Vec<FrameSnapshot>, RecordingError> {
    let mut frames = Vec::new();
    loop {
        let mut len = [0u8; 4];
        match read_full(&mut reader, &mut len)? {
            0 => return Ok(frames),
            4 => {},
            _ => return Err(RecordingError::Truncated(frames.len() as u64)),
        }
        let len = u32::from_be_bytes(len) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(RecordingError::FrameTooLarge(len));
        }
        let mut buf = vec![0u8; len];
        if read_full(&mut reader, &mut buf)? != len {
            return Err(RecordingError::Truncated(frames.len() as u64));
        }
        frames.push(FrameSnapshot::decode(&buf)?);
    }
}

pub fn read_recording(path: impl AsRef<Path>) -> Result<Vec<FrameSnapshot>, RecordingError> {
    read_frames(BufReader::new(File::open(path)?))
}

/// Fill `buf` as far as the reader allows, returning how many bytes were read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use taggame_core::Role;
    use taggame_core::test_helpers::make_agent;

    use super::*;

    fn frame(tick: u64) -> FrameSnapshot {
        FrameSnapshot {
            tick,
            agents: vec![
                make_agent("agent", 100.0 + tick as f64, 300.0, 10.0, Role::Runner),
                make_agent("chaser-1", 400.0, 300.0, 10.0, Role::Tagger),
            ],
            arena_width: 800.0,
            arena_height: 600.0,
            rl_player_name: "agent".to_string(),
            cooldown_remaining_ms: 0.0,
        }
    }

    fn recorded(count: u64) -> Vec<u8> {
        let mut recorder = FrameRecorder::new(Vec::new());
        for tick in 1..=count {
            recorder.record(&frame(tick)).unwrap();
        }
        assert_eq!(recorder.frames(), count);
        recorder.finish().unwrap()
    }

    #[test]
    fn recording_replays_frames_in_order() {
        let bytes = recorded(3);
        let frames = read_frames(bytes.as_slice()).unwrap();
        assert_eq!(frames, vec![frame(1), frame(2), frame(3)]);
    }

    #[test]
    fn empty_recording_has_no_frames() {
        assert!(read_frames(io::empty()).unwrap().is_empty());
    }

    #[test]
    fn cut_recording_reports_truncation() {
        let bytes = recorded(2);
        // Inside the second frame's payload
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(
            read_frames(cut),
            Err(RecordingError::Truncated(1))
        ));
        // Inside the second frame's length prefix
        let first_len = 4 + u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert!(matches!(
            read_frames(&bytes[..first_len + 2]),
            Err(RecordingError::Truncated(1))
        ));
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut bytes = (MAX_FRAME_SIZE as u32 + 1).to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0; 16]);
        assert!(matches!(
            read_frames(bytes.as_slice()),
            Err(RecordingError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn garbage_payload_fails_to_decode() {
        let mut bytes = 4u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0xc1; 4]);
        assert!(matches!(
            read_frames(bytes.as_slice()),
            Err(RecordingError::Decode(_))
        ));
    }
}
