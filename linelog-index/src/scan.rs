//! Newline splitting over a byte stream.
//!
//! Only line lengths are produced; line content is never buffered.

use std::io::{self, BufRead};

/// What to do with bytes after the last `\n` at end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingFragment {
    /// Report the fragment as a line (full rebuild).
    Count,
    /// Leave the fragment unreported until its newline arrives (incremental).
    Defer,
}

/// Iterator over the byte lengths of the lines in `reader`, newline included.
pub struct LineLengths<R> {
    reader: R,
    mode: TrailingFragment,
    done: bool,
}

/// Split `reader` into line lengths using `mode` for the trailing fragment.
pub fn line_lengths<R: BufRead>(reader: R, mode: TrailingFragment) -> LineLengths<R> {
    LineLengths {
        reader,
        mode,
        done: false,
    }
}

impl<R: BufRead> Iterator for LineLengths<R> {
    type Item = io::Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut len = 0u64;
        loop {
            let (consumed, complete) = match self.reader.fill_buf() {
                Ok([]) => {
                    self.done = true;
                    return match self.mode {
                        _ if len == 0 => None,
                        TrailingFragment::Count => Some(Ok(len)),
                        TrailingFragment::Defer => None,
                    };
                }
                Ok(buf) => match buf.iter().position(|&b| b == b'\n') {
                    Some(i) => (i + 1, true),
                    None => (buf.len(), false),
                },
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };

            self.reader.consume(consumed);
            len += consumed as u64;
            if complete {
                return Some(Ok(len));
            }
        }
    }
}
