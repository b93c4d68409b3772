//! Trait abstraction for serial port reads to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;

/// Trait for non-blocking serial reads
#[async_trait]
pub trait SerialSource: Send {
    /// Read whatever is already buffered into `buf`
    ///
    /// Returns `Ok(0)` when nothing is waiting; never waits for more data.
    async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialSource
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialSource for TokioSerialPort {
    async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;

        // The read future is polled once before the zero timeout is checked,
        // so buffered bytes are returned and an idle port yields Ok(0).
        match tokio::time::timeout(Duration::ZERO, self.port.read(buf)).await {
            Ok(result) => result,
            Err(_) => Ok(0),
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock serial port for testing
    ///
    /// Each queued chunk is handed out by one `read_available` call; an
    /// empty queue reads as an idle port.
    #[derive(Clone)]
    pub struct MockSerialSource {
        pub chunks: Arc<Mutex<VecDeque<Vec<u8>>>>,
        pub read_error: Arc<Mutex<Option<io::ErrorKind>>>,
    }

    impl MockSerialSource {
        pub fn new() -> Self {
            Self {
                chunks: Arc::new(Mutex::new(VecDeque::new())),
                read_error: Arc::new(Mutex::new(None)),
            }
        }

        pub fn push(&self, data: &[u8]) {
            self.chunks.lock().unwrap().push_back(data.to_vec());
        }

        pub fn set_read_error(&self, error: io::ErrorKind) {
            *self.read_error.lock().unwrap() = Some(error);
        }
    }

    #[async_trait]
    impl SerialSource for MockSerialSource {
        async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if let Some(error) = *self.read_error.lock().unwrap() {
                return Err(io::Error::new(error, "Mock read error"));
            }

            let mut chunks = self.chunks.lock().unwrap();
            let Some(mut chunk) = chunks.pop_front() else {
                return Ok(0);
            };

            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                let rest = chunk.split_off(n);
                chunks.push_front(rest);
            }
            Ok(n)
        }
    }
}
