use std::{
    io::{Cursor, Read},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// A body reader that records when it has been dropped, standing in for a network stream.
pub struct TrackingReader {
    inner: Cursor<Vec<u8>>,
    fail_after: Option<u64>,
    dropped: Arc<AtomicBool>,
}

impl TrackingReader {
    pub fn new(content: impl Into<Vec<u8>>) -> (Self, DropFlag) {
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = Self {
            inner: Cursor::new(content.into()),
            fail_after: None,
            dropped: dropped.clone(),
        };
        (reader, DropFlag(dropped))
    }

    /// A reader that yields `content`, then fails as a reset connection would.
    pub fn failing(content: impl Into<Vec<u8>>) -> (Self, DropFlag) {
        let content = content.into();
        let fail_after = content.len() as u64;
        let (mut reader, dropped) = Self::new(content);
        reader.fail_after = Some(fail_after);
        (reader, dropped)
    }
}

impl Read for TrackingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.fail_after {
            Some(limit) if self.inner.position() >= limit => Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset mid-body",
            )),
            _ => self.inner.read(buf),
        }
    }
}

impl Drop for TrackingReader {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

pub struct DropFlag(Arc<AtomicBool>);

impl DropFlag {
    pub fn is_dropped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
