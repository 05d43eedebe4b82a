use crate::config::READ_BUFFER_SIZE;
use crate::error::ImportError;
use bzip2::read::MultiBzDecoder;
use memchr::memchr;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use tracing::{debug, trace};

/// Opens a dump for sequential reading. `.bz2` files are decompressed on the fly;
/// multistream archives are handled as one continuous stream.
pub fn open_dump(path: &Path) -> Result<Box<dyn BufRead>, ImportError> {
    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let compressed = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bz2"));
    debug!(path = %path.display(), compressed, "Opening dump");

    if compressed {
        Ok(Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            MultiBzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)))
    }
}

/// Splits a byte stream into trimmed text lines.
///
/// Lines are yielded only once their `\n` terminator has been read, so a
/// dangling partial line at end of stream is dropped. The iterator is fused
/// after the first read error.
pub struct DumpLines<R> {
    inner: R,
    line: Vec<u8>,
    lines_read: u64,
    done: bool,
}

impl<R: BufRead> DumpLines<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: Vec::with_capacity(1024),
            lines_read: 0,
            done: false,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    fn next_line(&mut self) -> Result<Option<String>, ImportError> {
        loop {
            let available = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ImportError::Io(e)),
            };

            if available.is_empty() {
                if !self.line.is_empty() {
                    trace!(bytes = self.line.len(), "Discarding partial final line");
                    self.line.clear();
                }
                return Ok(None);
            }

            match memchr(b'\n', available) {
                Some(pos) => {
                    self.line.extend_from_slice(&available[..pos]);
                    self.inner.consume(pos + 1);
                    let line = trim_line(&self.line);
                    self.line.clear();
                    self.lines_read += 1;
                    return Ok(Some(line));
                }
                None => {
                    let len = available.len();
                    self.line.extend_from_slice(available);
                    self.inner.consume(len);
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for DumpLines<R> {
    type Item = Result<String, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn trim_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\0'))
        .to_owned()
}
