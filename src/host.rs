//! Host adapter interfaces.
//!
//! The core calls out of the image through these narrow traits; their
//! implementations own the windowing surface, the file handles and the
//! clipboard. [`HeadlessHost`] is the batteries-included implementation
//! used by the CLI and the test suite: a monotonic clock, `std::fs`
//! files, an in-memory clipboard and no display.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Host file handle as seen by the image.
pub type Fd = u16;

/// Seconds between 1901-01-01 and the Unix epoch; Smalltalk-80 counts
/// wall-clock time from the former.
const EPOCH_1901_TO_1970: u64 = 2_177_452_800;

/// Display surface, input queue and clocks.
pub trait DisplayHost {
    /// Adopt `bits` as the live display raster.
    fn set_bitmap(&mut self, bits: &[u16], width: u16, height: u16);
    fn set_cursor_bitmap(&mut self, bits: &[u16], width: u16, height: u16);
    /// Invalidate a destination rectangle after a combination touched it.
    fn update_rect(&mut self, x: u16, y: u16, width: u16, height: u16);
    fn set_cursor_pos(&mut self, x: u16, y: u16);
    /// Milliseconds since VM start; monotonic, wraps at 32 bits.
    fn ticks_ms(&self) -> u32;
    fn seconds_since_1901(&self) -> u32;
    /// Give the host a chance to collect input.
    fn process_events(&mut self);
    /// Drain one 16-bit event word, if any.
    fn next_event(&mut self) -> Option<u16>;
    /// Cleared by the host to request shutdown.
    fn running(&self) -> bool;
}

/// Filesystem access behind integer handles.
pub trait FileHost {
    fn open(&mut self, path: &str) -> io::Result<Fd>;
    fn create(&mut self, path: &str) -> io::Result<Fd>;
    fn close(&mut self, fd: Fd) -> io::Result<()>;
    fn size(&mut self, fd: Fd) -> io::Result<u32>;
    fn seek(&mut self, fd: Fd, position: u32) -> io::Result<()>;
    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> io::Result<usize>;
    fn write(&mut self, fd: Fd, buffer: &[u8]) -> io::Result<usize>;
    fn truncate(&mut self, fd: Fd, size: u32) -> io::Result<()>;
    fn delete(&mut self, path: &str) -> io::Result<()>;
    fn rename(&mut self, from: &str, to: &str) -> io::Result<()>;
}

/// Clipboard bridge.
pub trait ClipboardHost {
    fn copy_to(&mut self, bytes: &[u8]);
    fn paste_from(&mut self) -> Vec<u8>;
}

/// Everything a running interpreter needs from its host.
pub trait Host: DisplayHost + FileHost + ClipboardHost {}

impl<T: DisplayHost + FileHost + ClipboardHost> Host for T {}

/// Headless host: no display, real files, fake clipboard.
pub struct HeadlessHost {
    started: Instant,
    files: HashMap<Fd, File>,
    next_fd: Fd,
    events: Vec<u16>,
    clipboard: Vec<u8>,
    /// Root for relative paths; defaults to the working directory.
    pub base_dir: PathBuf,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            files: HashMap::new(),
            next_fd: 1,
            events: Vec::new(),
            clipboard: Vec::new(),
            base_dir: PathBuf::new(),
        }
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn file(&mut self, fd: Fd) -> io::Result<&mut File> {
        self.files
            .get_mut(&fd)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown file handle"))
    }

    fn register(&mut self, file: File) -> Fd {
        let fd = self.next_fd;
        self.next_fd = self.next_fd.wrapping_add(1).max(1);
        self.files.insert(fd, file);
        fd
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Queue a synthetic input word, e.g. from tests.
    pub fn push_event(&mut self, word: u16) {
        self.events.push(word);
    }
}

impl DisplayHost for HeadlessHost {
    fn set_bitmap(&mut self, _bits: &[u16], _width: u16, _height: u16) {}

    fn set_cursor_bitmap(&mut self, _bits: &[u16], _width: u16, _height: u16) {}

    fn update_rect(&mut self, _x: u16, _y: u16, _width: u16, _height: u16) {}

    fn set_cursor_pos(&mut self, _x: u16, _y: u16) {}

    fn ticks_ms(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    fn seconds_since_1901(&self) -> u32 {
        let unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        (unix + EPOCH_1901_TO_1970) as u32
    }

    fn process_events(&mut self) {}

    fn next_event(&mut self) -> Option<u16> {
        if self.events.is_empty() {
            None
        } else {
            Some(self.events.remove(0))
        }
    }

    fn running(&self) -> bool {
        true
    }
}

impl FileHost for HeadlessHost {
    fn open(&mut self, path: &str) -> io::Result<Fd> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.resolve(path))?;
        Ok(self.register(file))
    }

    fn create(&mut self, path: &str) -> io::Result<Fd> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.resolve(path))?;
        Ok(self.register(file))
    }

    fn close(&mut self, fd: Fd) -> io::Result<()> {
        self.files
            .remove(&fd)
            .map(drop)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown file handle"))
    }

    fn size(&mut self, fd: Fd) -> io::Result<u32> {
        Ok(self.file(fd)?.metadata()?.len() as u32)
    }

    fn seek(&mut self, fd: Fd, position: u32) -> io::Result<()> {
        self.file(fd)?.seek(SeekFrom::Start(position.into())).map(drop)
    }

    fn read(&mut self, fd: Fd, buffer: &mut [u8]) -> io::Result<usize> {
        self.file(fd)?.read(buffer)
    }

    fn write(&mut self, fd: Fd, buffer: &[u8]) -> io::Result<usize> {
        self.file(fd)?.write(buffer)
    }

    fn truncate(&mut self, fd: Fd, size: u32) -> io::Result<()> {
        self.file(fd)?.set_len(size.into())
    }

    fn delete(&mut self, path: &str) -> io::Result<()> {
        std::fs::remove_file(self.resolve(path))
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        std::fs::rename(self.resolve(from), self.resolve(to))
    }
}

impl ClipboardHost for HeadlessHost {
    fn copy_to(&mut self, bytes: &[u8]) {
        self.clipboard = bytes.to_vec();
    }

    fn paste_from(&mut self) -> Vec<u8> {
        self.clipboard.clone()
    }
}
