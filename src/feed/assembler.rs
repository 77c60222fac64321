//! Frame Reassembler
//!
//! The primary stream delivers frames back to back with no delimiter, and
//! the transport is free to split or coalesce them arbitrarily. The
//! assembler accumulates whatever arrives and hands out complete frames.

use super::wire::RECORD_FRAME_SIZE;

/// Reassembles fixed-size frames from an arbitrarily chunked byte stream.
///
/// Bytes go in via [`extend`](Self::extend); complete frames come out via
/// [`next_frame`](Self::next_frame). No byte is dropped or duplicated, and
/// no frame ever spans two outputs. Whatever is left when the stream ends
/// (always fewer than `RECORD_FRAME_SIZE` bytes if the caller drained all
/// frames) is reported by [`residual_len`](Self::residual_len).
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: Vec<u8>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Append a chunk of bytes in arrival order.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Take the next complete frame off the front, if one is buffered.
    pub fn next_frame(&mut self) -> Option<[u8; RECORD_FRAME_SIZE]> {
        if self.buf.len() < RECORD_FRAME_SIZE {
            return None;
        }
        let mut frame = [0u8; RECORD_FRAME_SIZE];
        frame.copy_from_slice(&self.buf[..RECORD_FRAME_SIZE]);
        self.buf.drain(..RECORD_FRAME_SIZE);
        Some(frame)
    }

    /// Bytes buffered but not yet forming a complete frame.
    pub fn residual_len(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(frames: usize) -> Vec<u8> {
        (0..frames * RECORD_FRAME_SIZE).map(|i| i as u8).collect()
    }

    fn drain(asm: &mut FrameAssembler) -> Vec<[u8; RECORD_FRAME_SIZE]> {
        let mut out = Vec::new();
        while let Some(f) = asm.next_frame() {
            out.push(f);
        }
        out
    }

    #[test]
    fn test_exact_frames() {
        let stream = stream_of(3);
        let mut asm = FrameAssembler::new();
        asm.extend(&stream);

        let frames = drain(&mut asm);
        assert_eq!(frames.len(), 3);
        for (i, f) in frames.iter().enumerate() {
            assert_eq!(&f[..], &stream[i * RECORD_FRAME_SIZE..(i + 1) * RECORD_FRAME_SIZE]);
        }
        assert_eq!(asm.residual_len(), 0);
    }

    #[test]
    fn test_arbitrary_partitions_preserve_frames() {
        let stream = stream_of(5);

        // Chunk sizes chosen to split inside and across frame boundaries.
        for chunk_sizes in [
            vec![1usize; stream.len()],
            vec![16, 18, 1, 33, 17],
            vec![stream.len()],
            vec![5, 40, 40],
        ] {
            let mut asm = FrameAssembler::new();
            let mut pos = 0;
            let mut frames = Vec::new();
            for size in chunk_sizes {
                let end = (pos + size).min(stream.len());
                asm.extend(&stream[pos..end]);
                frames.extend(drain(&mut asm));
                pos = end;
            }
            if pos < stream.len() {
                asm.extend(&stream[pos..]);
                frames.extend(drain(&mut asm));
            }

            assert_eq!(frames.len(), 5);
            for (i, f) in frames.iter().enumerate() {
                assert_eq!(
                    &f[..],
                    &stream[i * RECORD_FRAME_SIZE..(i + 1) * RECORD_FRAME_SIZE]
                );
            }
            assert_eq!(asm.residual_len(), 0);
        }
    }

    #[test]
    fn test_truncated_tail_is_retained_not_emitted() {
        let mut stream = stream_of(2);
        stream.extend_from_slice(&[0xAA; 5]);

        let mut asm = FrameAssembler::new();
        asm.extend(&stream);

        assert_eq!(drain(&mut asm).len(), 2);
        assert_eq!(asm.residual_len(), 5);
        assert!(asm.next_frame().is_none());
    }

    #[test]
    fn test_empty_input() {
        let mut asm = FrameAssembler::new();
        assert!(asm.next_frame().is_none());
        assert_eq!(asm.residual_len(), 0);
    }
}
