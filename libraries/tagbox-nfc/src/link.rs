//! Hardware link to the tag reader
//!
//! [`TagLink`] is the seam between the workers and the physical reader:
//! the watcher, the registrar, and the HTTP surface all talk to the trait,
//! so tests substitute a scripted link and never touch a serial port.
//!
//! [`NfcLink`] is the production implementation over a PN532 on UART. It is
//! deliberately passive about failure: any transport error drops the device
//! handle, records the error string, and leaves reconnection to the caller.

use crate::error::{LinkError, ReadError, WriteError};
use crate::pn532::Pn532;
use crate::TAG_BLOCK_SIZE;
use std::io::{Read, Write};
use std::sync::Mutex;
use std::time::Duration;
use tagbox_core::TagUid;

/// Serial read timeout per byte-wait. Short so that poll deadlines are
/// enforced host-side rather than by the port.
const PORT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Byte transport the PN532 codec runs over. The boxed serial port in
/// production; in-memory doubles in tests.
trait SerialIo: Read + Write + Send {}

impl<T: Read + Write + Send> SerialIo for T {}

/// Contract between the reader hardware and everything above it.
///
/// All methods take `&self`; implementations serialize hardware access
/// internally so a multi-block sequence is never interleaved with another
/// caller's operation.
pub trait TagLink: Send + Sync {
    /// Establish the connection and perform the reader handshake.
    /// Idempotent: succeeds immediately when already connected.
    fn connect(&self) -> Result<(), LinkError>;

    /// Whether the link currently holds a live connection.
    fn is_connected(&self) -> bool;

    /// Drop the connection. Safe to call when already disconnected.
    fn disconnect(&self);

    /// Human-readable description of the most recent failure, if any.
    fn last_error(&self) -> Option<String>;

    /// Poll for a tag in the field, waiting at most `timeout`.
    /// `Ok(None)` means no tag; `Err` means the connection was lost.
    fn poll_uid(&self, timeout: Duration) -> Result<Option<TagUid>, LinkError>;

    /// Read `count` consecutive blocks starting at `start_block` from the
    /// tag currently in the field. All-or-nothing: a failed block aborts
    /// the sequence and no partial data is returned.
    fn read_blocks(&self, start_block: u8, count: u8) -> Result<Vec<u8>, ReadError>;

    /// Write `data` across consecutive blocks starting at `start_block`.
    /// `data` must be a multiple of the tag block size.
    fn write_blocks(&self, start_block: u8, data: &[u8]) -> Result<(), WriteError>;
}

struct Inner {
    device: Option<Pn532<Box<dyn SerialIo>>>,
    last_error: Option<String>,
}

/// PN532-over-serial implementation of [`TagLink`].
pub struct NfcLink {
    port_path: String,
    baud_rate: u32,
    inner: Mutex<Inner>,
}

impl NfcLink {
    /// Create a link for the given serial device. Does not connect.
    pub fn new(port_path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_path: port_path.into(),
            baud_rate,
            inner: Mutex::new(Inner {
                device: None,
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Inner holds no invariants that a panicked holder could break.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run `op` against the connected device under the hardware lock,
    /// translating any transport failure into a recorded disconnect. `op`
    /// covers an entire operation, multi-block sequences included, so it is
    /// never interleaved with another caller's commands.
    fn with_device<R>(
        &self,
        op: impl FnOnce(&mut Pn532<Box<dyn SerialIo>>) -> Result<R, LinkError>,
    ) -> Result<R, LinkError> {
        let mut inner = self.lock();
        let device = inner.device.as_mut().ok_or(LinkError::NotConnected)?;
        match op(device) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!("Reader transport failure: {}", e);
                inner.device = None;
                inner.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

impl TagLink for NfcLink {
    fn connect(&self) -> Result<(), LinkError> {
        let mut inner = self.lock();
        if inner.device.is_some() {
            return Ok(());
        }

        let open = serialport::new(&self.port_path, self.baud_rate)
            .timeout(PORT_READ_TIMEOUT)
            .open();
        let port = match open {
            Ok(port) => port,
            Err(source) => {
                let err = LinkError::Open {
                    path: self.port_path.clone(),
                    source,
                };
                inner.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        let transport: Box<dyn SerialIo> = Box::new(port);
        let mut device = Pn532::new(transport);
        let handshake = device
            .wakeup()
            .and_then(|()| device.firmware_version())
            .and_then(|fw| device.sam_configure().map(|()| fw));
        match handshake {
            Ok(fw) => {
                tracing::info!(
                    "Connected to PN532 on {} (firmware {})",
                    self.port_path,
                    fw
                );
                inner.device = Some(device);
                inner.last_error = None;
                Ok(())
            }
            Err(e) => {
                inner.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().device.is_some()
    }

    fn disconnect(&self) {
        let mut inner = self.lock();
        if inner.device.take().is_some() {
            tracing::info!("Disconnected from reader on {}", self.port_path);
        }
    }

    fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    fn poll_uid(&self, timeout: Duration) -> Result<Option<TagUid>, LinkError> {
        let uid = self.with_device(|device| device.read_passive_target(timeout))?;
        Ok(uid.map(|bytes| TagUid::from_bytes(&bytes)))
    }

    fn read_blocks(&self, start_block: u8, count: u8) -> Result<Vec<u8>, ReadError> {
        // The whole sequence runs under one lock acquisition so no other
        // caller can slip a command between blocks.
        let outcome = self.with_device(|device| {
            let mut data = Vec::with_capacity(count as usize * TAG_BLOCK_SIZE);
            for offset in 0..count {
                let block = start_block + offset;
                match device.ntag_read_block(block)? {
                    Some(bytes) => data.extend_from_slice(&bytes),
                    None => return Ok(Err(block)),
                }
            }
            Ok(Ok(data))
        })?;

        outcome.map_err(|block| {
            tracing::debug!("Tag read failed at block {}", block);
            ReadError::Block { block }
        })
    }

    fn write_blocks(&self, start_block: u8, data: &[u8]) -> Result<(), WriteError> {
        if data.len() % TAG_BLOCK_SIZE != 0 {
            return Err(WriteError::Alignment(data.len()));
        }

        let outcome = self.with_device(|device| {
            for (index, chunk) in data.chunks_exact(TAG_BLOCK_SIZE).enumerate() {
                let block = start_block + index as u8;
                let mut payload = [0u8; TAG_BLOCK_SIZE];
                payload.copy_from_slice(chunk);
                if !device.ntag_write_block(block, &payload)? {
                    return Ok(Err(block));
                }
            }
            Ok(Ok(()))
        })?;

        outcome.map_err(|block| {
            tracing::debug!("Tag write failed at block {}", block);
            WriteError::Block { block }
        })
    }
}

impl std::fmt::Debug for NfcLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfcLink")
            .field("port_path", &self.port_path)
            .field("baud_rate", &self.baud_rate)
            .field("connected", &self.is_connected())
            .finish()
    }
}
