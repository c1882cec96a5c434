//! Chunk boundary strategies

use bytes::{Bytes, BytesMut};

use super::ChunkSplitter;

/// How [`LengthChunkSplitter`] treats lines at a chunk boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WholeLines {
    /// Cut exactly at the length limit
    #[default]
    None,

    /// Cut after the last newline that fits; a line longer than a whole
    /// chunk is cut at the limit
    Break,

    /// Cut after the last newline that fits; a line longer than a whole
    /// chunk is dropped up to and including its newline
    Skip,
}

/// Ends a chunk once it holds `max_length` bytes
#[derive(Debug, Clone)]
pub struct LengthChunkSplitter {
    max_length: usize,
    whole_lines: WholeLines,

    /// Bytes already in the current chunk
    seen: usize,
}

impl LengthChunkSplitter {
    /// Create a splitter; `max_length` must be non-zero
    pub fn new(max_length: usize, whole_lines: WholeLines) -> Self {
        Self {
            max_length: max_length.max(1),
            whole_lines,
            seen: 0,
        }
    }
}

impl ChunkSplitter for LengthChunkSplitter {
    fn split(&mut self, data: Bytes) -> (Bytes, Option<Bytes>) {
        let remaining = self.max_length - self.seen;
        if data.len() <= remaining {
            self.seen += data.len();
            return (data, None);
        }

        self.seen = 0;
        if self.whole_lines == WholeLines::None {
            return (data.slice(..remaining), Some(data.slice(remaining..)));
        }

        if let Some(newline) = data[..remaining].iter().rposition(|&b| b == b'\n') {
            return (data.slice(..=newline), Some(data.slice(newline + 1..)));
        }

        // No newline fits. A partly filled chunk ends here and the line
        // starts the next one.
        if remaining != self.max_length {
            return (Bytes::new(), Some(data));
        }

        match self.whole_lines {
            WholeLines::Skip => match data[remaining..].iter().position(|&b| b == b'\n') {
                Some(offset) => (Bytes::new(), Some(data.slice(remaining + offset + 1..))),
                None => (Bytes::new(), None),
            },
            _ => (data.slice(..remaining), Some(data.slice(remaining..))),
        }
    }
}

/// Ends a chunk after its `max_lines`-th newline
#[derive(Debug, Clone)]
pub struct LineChunkSplitter {
    max_lines: usize,
    seen: usize,
}

impl LineChunkSplitter {
    /// Create a splitter; `max_lines` must be non-zero
    pub fn new(max_lines: usize) -> Self {
        Self {
            max_lines: max_lines.max(1),
            seen: 0,
        }
    }
}

impl ChunkSplitter for LineChunkSplitter {
    fn split(&mut self, data: Bytes) -> (Bytes, Option<Bytes>) {
        let remaining = self.max_lines - self.seen;

        let boundary = data
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == b'\n')
            .nth(remaining - 1)
            .map(|(index, _)| index + 1);

        match boundary {
            Some(end) => {
                self.seen = 0;
                (data.slice(..end), Some(data.slice(end..)))
            }
            None => {
                self.seen += data.iter().filter(|&&b| b == b'\n').count();
                (data, None)
            }
        }
    }
}

/// Applies several splitters to the same chunk
///
/// Each splitter sees what the previous ones kept for the current chunk.
/// Remainders are joined into one, the last splitter's remainder first.
pub struct CombinedChunkSplitter {
    splitters: Vec<Box<dyn ChunkSplitter>>,
}

impl CombinedChunkSplitter {
    /// Combine `splitters`, applied in order
    pub fn new(splitters: Vec<Box<dyn ChunkSplitter>>) -> Self {
        Self { splitters }
    }
}

impl ChunkSplitter for CombinedChunkSplitter {
    fn split(&mut self, mut data: Bytes) -> (Bytes, Option<Bytes>) {
        let mut rest: Vec<Bytes> = Vec::new();

        for splitter in &mut self.splitters {
            let (current, remainder) = splitter.split(data);
            data = current;
            if let Some(remainder) = remainder {
                rest.insert(0, remainder);
            }
        }

        let remainder = match rest.len() {
            0 => None,
            1 => rest.pop(),
            _ => {
                let mut joined = BytesMut::with_capacity(rest.iter().map(Bytes::len).sum());
                for part in &rest {
                    joined.extend_from_slice(part);
                }
                Some(joined.freeze())
            }
        };

        (data, remainder)
    }
}

#[cfg(test)]
#[path = "splitter_test.rs"]
mod splitter_test;
