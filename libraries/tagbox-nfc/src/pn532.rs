//! PN532 UART wire protocol
//!
//! Frame building/parsing and the handful of commands Tagbox needs:
//! firmware handshake, SAM configuration, passive target polling, and
//! NTAG2xx block read/write through `InDataExchange`.
//!
//! Generic over any `Read + Write` transport so the codec can be exercised
//! against in-memory scripts; the real transport is the serial port owned by
//! [`NfcLink`](crate::link::NfcLink).
//!
//! Timeouts are host-side: the chip answers `InListPassiveTarget` only once
//! a tag enters the field, so "no response before the deadline" is the
//! success-shaped "no tag" result, not an error.

use crate::error::LinkError;
use crate::TAG_BLOCK_SIZE;
use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

const PREAMBLE: u8 = 0x00;
const START_CODE: [u8; 2] = [0x00, 0xFF];
const POSTAMBLE: u8 = 0x00;

/// Frame identifier: host to reader.
const HOST_TO_READER: u8 = 0xD4;
/// Frame identifier: reader to host.
const READER_TO_HOST: u8 = 0xD5;

const ACK_FRAME: [u8; 6] = [0x00, 0x00, 0xFF, 0x00, 0xFF, 0x00];

const CMD_GET_FIRMWARE_VERSION: u8 = 0x02;
const CMD_SAM_CONFIGURATION: u8 = 0x14;
const CMD_IN_LIST_PASSIVE_TARGET: u8 = 0x4A;
const CMD_IN_DATA_EXCHANGE: u8 = 0x40;

/// NTAG2xx READ command: returns 16 bytes starting at the addressed block.
const NTAG_READ: u8 = 0x30;
/// NTAG2xx WRITE command: writes one 4-byte block.
const NTAG_WRITE: u8 = 0xA2;

/// ISO14443 Type A at 106 kbps.
const BAUD_ISO14443A: u8 = 0x00;

/// How long the chip gets to ACK a command before the link is presumed dead.
const ACK_TIMEOUT: Duration = Duration::from_secs(1);
/// Response deadline for commands that always answer promptly.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Firmware identification returned by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// IC identifier (0x32 for the PN532)
    pub ic: u8,
    /// Firmware major version
    pub version: u8,
    /// Firmware revision
    pub revision: u8,
    /// Supported protocols bitmask
    pub support: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} (IC: {:#04x}, support: {:#04x})",
            self.version, self.revision, self.ic, self.support
        )
    }
}

/// PN532 command layer over a byte transport.
pub struct Pn532<T> {
    transport: T,
}

impl<T: Read + Write> Pn532<T> {
    /// Wrap a transport. No I/O happens until the first command.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Nudge the chip out of low-power mode before the first command.
    ///
    /// The leading 0x55 bytes and trailing padding give the UART receiver
    /// time to synchronize; the chip ignores them otherwise.
    pub fn wakeup(&mut self) -> Result<(), LinkError> {
        let mut seq = [0u8; 16];
        seq[0] = 0x55;
        seq[1] = 0x55;
        self.transport.write_all(&seq)?;
        self.transport.flush()?;
        Ok(())
    }

    /// `GetFirmwareVersion` - the connection handshake.
    pub fn firmware_version(&mut self) -> Result<FirmwareVersion, LinkError> {
        let resp = self
            .call(CMD_GET_FIRMWARE_VERSION, &[], COMMAND_TIMEOUT)?
            .ok_or_else(|| LinkError::Handshake("no firmware version response".to_string()))?;
        if resp.len() < 4 {
            return Err(LinkError::Handshake(format!(
                "short firmware version response ({} bytes)",
                resp.len()
            )));
        }
        Ok(FirmwareVersion {
            ic: resp[0],
            version: resp[1],
            revision: resp[2],
            support: resp[3],
        })
    }

    /// `SAMConfiguration` - normal mode, 1 s virtual-card timeout, IRQ on.
    pub fn sam_configure(&mut self) -> Result<(), LinkError> {
        self.call(CMD_SAM_CONFIGURATION, &[0x01, 0x14, 0x01], COMMAND_TIMEOUT)?
            .ok_or_else(|| LinkError::Handshake("no SAM configuration response".to_string()))?;
        Ok(())
    }

    /// `InListPassiveTarget` for a single ISO14443A target.
    ///
    /// Returns the tag's UID bytes, or `None` if nothing entered the field
    /// before `timeout`.
    pub fn read_passive_target(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, LinkError> {
        let resp = match self.call(
            CMD_IN_LIST_PASSIVE_TARGET,
            &[0x01, BAUD_ISO14443A],
            timeout,
        )? {
            Some(resp) => resp,
            None => return Ok(None),
        };

        // [NbTg, Tg, SENS_RES(2), SEL_RES, NFCID length, NFCID1...]
        if resp.first() != Some(&0x01) {
            return Ok(None);
        }
        if resp.len() < 6 {
            return Err(LinkError::Protocol("short target data".to_string()));
        }
        let uid_len = resp[5] as usize;
        if resp.len() < 6 + uid_len {
            return Err(LinkError::Protocol("truncated target UID".to_string()));
        }
        Ok(Some(resp[6..6 + uid_len].to_vec()))
    }

    /// Read one 4-byte block from a present NTAG2xx tag.
    ///
    /// `Ok(None)` is a tag-level failure (bad status, tag moved away);
    /// `Err` is transport loss. The READ command returns 16 bytes, of which
    /// only the addressed block is used.
    pub fn ntag_read_block(&mut self, block: u8) -> Result<Option<[u8; TAG_BLOCK_SIZE]>, LinkError> {
        let resp = match self.call(
            CMD_IN_DATA_EXCHANGE,
            &[0x01, NTAG_READ, block],
            COMMAND_TIMEOUT,
        )? {
            Some(resp) => resp,
            None => return Ok(None),
        };
        if resp.first() != Some(&0x00) || resp.len() < 1 + TAG_BLOCK_SIZE {
            return Ok(None);
        }
        let mut out = [0u8; TAG_BLOCK_SIZE];
        out.copy_from_slice(&resp[1..1 + TAG_BLOCK_SIZE]);
        Ok(Some(out))
    }

    /// Write one 4-byte block to a present NTAG2xx tag.
    ///
    /// Returns whether the tag acknowledged the write; `Err` is transport
    /// loss.
    pub fn ntag_write_block(
        &mut self,
        block: u8,
        data: &[u8; TAG_BLOCK_SIZE],
    ) -> Result<bool, LinkError> {
        let mut params = Vec::with_capacity(3 + TAG_BLOCK_SIZE);
        params.push(0x01);
        params.push(NTAG_WRITE);
        params.push(block);
        params.extend_from_slice(data);

        let resp = match self.call(CMD_IN_DATA_EXCHANGE, &params, COMMAND_TIMEOUT)? {
            Some(resp) => resp,
            None => return Ok(false),
        };
        Ok(resp.first() == Some(&0x00))
    }

    /// Send a command, consume the ACK, and read the response frame.
    ///
    /// `Ok(None)` means the chip ACKed but produced no response before the
    /// deadline (the polling "no tag" case).
    fn call(
        &mut self,
        command: u8,
        params: &[u8],
        response_timeout: Duration,
    ) -> Result<Option<Vec<u8>>, LinkError> {
        self.write_frame(command, params)?;
        self.read_ack(Instant::now() + ACK_TIMEOUT)?;

        let body = match self.read_frame(Instant::now() + response_timeout)? {
            Some(body) => body,
            None => return Ok(None),
        };
        if body.len() < 2 || body[0] != READER_TO_HOST || body[1] != command.wrapping_add(1) {
            return Err(LinkError::Protocol(format!(
                "unexpected response to command {command:#04x}"
            )));
        }
        Ok(Some(body[2..].to_vec()))
    }

    fn write_frame(&mut self, command: u8, params: &[u8]) -> Result<(), LinkError> {
        let len = (params.len() + 2) as u8; // TFI + command + params
        let mut frame = Vec::with_capacity(params.len() + 9);
        frame.push(PREAMBLE);
        frame.extend_from_slice(&START_CODE);
        frame.push(len);
        frame.push(len.wrapping_neg()); // LCS: len + LCS == 0 mod 256
        frame.push(HOST_TO_READER);
        frame.push(command);
        frame.extend_from_slice(params);
        let sum = params
            .iter()
            .fold(HOST_TO_READER.wrapping_add(command), |acc, b| {
                acc.wrapping_add(*b)
            });
        frame.push(sum.wrapping_neg()); // DCS: sum(TFI..params) + DCS == 0 mod 256
        frame.push(POSTAMBLE);

        self.transport.write_all(&frame)?;
        self.transport.flush()?;
        Ok(())
    }

    fn read_ack(&mut self, deadline: Instant) -> Result<(), LinkError> {
        let mut window = [0u8; ACK_FRAME.len()];
        let mut seen = 0usize;
        while let Some(byte) = self.read_byte(deadline)? {
            window.rotate_left(1);
            window[ACK_FRAME.len() - 1] = byte;
            seen += 1;
            if seen >= ACK_FRAME.len() && window == ACK_FRAME {
                return Ok(());
            }
        }
        Err(LinkError::Protocol("no ACK from reader".to_string()))
    }

    /// Read one information frame body (TFI + payload), hunting past idle
    /// bytes for the start code. `Ok(None)` if no frame started before the
    /// deadline; a frame that starts but does not complete is a protocol
    /// error.
    fn read_frame(&mut self, deadline: Instant) -> Result<Option<Vec<u8>>, LinkError> {
        let mut prev = None;
        loop {
            match self.read_byte(deadline)? {
                None => return Ok(None),
                Some(0xFF) if prev == Some(0x00) => break,
                Some(byte) => prev = Some(byte),
            }
        }

        let len = self.frame_byte(deadline)?;
        let lcs = self.frame_byte(deadline)?;
        if len.wrapping_add(lcs) != 0 {
            return Err(LinkError::Protocol("length checksum mismatch".to_string()));
        }

        let mut body = vec![0u8; len as usize];
        for slot in &mut body {
            *slot = self.frame_byte(deadline)?;
        }
        let dcs = self.frame_byte(deadline)?;
        let sum = body.iter().fold(dcs, |acc, b| acc.wrapping_add(*b));
        if sum != 0 {
            return Err(LinkError::Protocol("data checksum mismatch".to_string()));
        }
        Ok(Some(body))
    }

    /// A byte that must arrive once a frame has started.
    fn frame_byte(&mut self, deadline: Instant) -> Result<u8, LinkError> {
        self.read_byte(deadline)?
            .ok_or_else(|| LinkError::Protocol("truncated frame".to_string()))
    }

    fn read_byte(&mut self, deadline: Instant) -> Result<Option<u8>, LinkError> {
        let mut buf = [0u8; 1];
        loop {
            match self.transport.read(&mut buf) {
                Ok(0) => {}
                Ok(_) => return Ok(Some(buf[0])),
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Transport fed from a fixed script; reads past the script time out.
    struct ScriptedPort {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
    }

    impl ScriptedPort {
        fn new(script: &[u8]) -> Self {
            Self {
                rx: script.iter().copied().collect(),
                tx: Vec::new(),
            }
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[0] = byte;
                    Ok(1)
                }
                None => Err(io::Error::new(io::ErrorKind::TimedOut, "script exhausted")),
            }
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.tx.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Build a valid reader-to-host frame around `body`.
    fn response_frame(body: &[u8]) -> Vec<u8> {
        let mut frame = vec![PREAMBLE, START_CODE[0], START_CODE[1]];
        let len = body.len() as u8;
        frame.push(len);
        frame.push(len.wrapping_neg());
        frame.extend_from_slice(body);
        let sum = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        frame.push(sum.wrapping_neg());
        frame.push(POSTAMBLE);
        frame
    }

    fn ack_then(body: &[u8]) -> Vec<u8> {
        let mut script = ACK_FRAME.to_vec();
        script.extend_from_slice(&response_frame(body));
        script
    }

    #[test]
    fn command_frame_is_checksummed() {
        let script = ack_then(&[READER_TO_HOST, 0x03, 0x32, 0x01, 0x06, 0x07]);
        let mut pn = Pn532::new(ScriptedPort::new(&script));
        pn.firmware_version().unwrap();

        // GetFirmwareVersion: len 2, LCS 0xFE, DCS = -(0xD4 + 0x02)
        let port = pn.transport;
        assert_eq!(
            port.tx,
            vec![0x00, 0x00, 0xFF, 0x02, 0xFE, 0xD4, 0x02, 0x2A, 0x00]
        );
    }

    #[test]
    fn firmware_version_parses_handshake() {
        let script = ack_then(&[READER_TO_HOST, 0x03, 0x32, 0x01, 0x06, 0x07]);
        let mut pn = Pn532::new(ScriptedPort::new(&script));
        let fw = pn.firmware_version().unwrap();
        assert_eq!(
            fw,
            FirmwareVersion {
                ic: 0x32,
                version: 1,
                revision: 6,
                support: 7
            }
        );
    }

    #[test]
    fn passive_target_returns_uid() {
        let script = ack_then(&[
            READER_TO_HOST,
            0x4B,
            0x01, // one target
            0x01, // target number
            0x00,
            0x44, // SENS_RES
            0x00, // SEL_RES
            0x04, // UID length
            0xDE,
            0xAD,
            0xBE,
            0xEF,
        ]);
        let mut pn = Pn532::new(ScriptedPort::new(&script));
        let uid = pn
            .read_passive_target(Duration::from_millis(10))
            .unwrap()
            .unwrap();
        assert_eq!(uid, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn passive_target_times_out_as_no_tag() {
        // ACK arrives, then silence: not an error, just nothing in the field.
        let mut pn = Pn532::new(ScriptedPort::new(&ACK_FRAME));
        let result = pn.read_passive_target(Duration::from_millis(10)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn corrupt_data_checksum_is_a_protocol_error() {
        let mut script = ACK_FRAME.to_vec();
        let mut frame = response_frame(&[READER_TO_HOST, 0x03, 0x32, 0x01, 0x06, 0x07]);
        let dcs_index = frame.len() - 2;
        frame[dcs_index] ^= 0xFF;
        script.extend_from_slice(&frame);

        let mut pn = Pn532::new(ScriptedPort::new(&script));
        let err = pn.firmware_version().unwrap_err();
        assert!(matches!(err, LinkError::Protocol(_)));
    }

    #[test]
    fn ntag_read_block_takes_first_four_of_sixteen() {
        let mut body = vec![READER_TO_HOST, 0x41, 0x00];
        body.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
        body.extend_from_slice(&[0u8; 12]); // the rest of the 16-byte READ answer
        let script = ack_then(&body);

        let mut pn = Pn532::new(ScriptedPort::new(&script));
        let block = pn.ntag_read_block(4).unwrap().unwrap();
        assert_eq!(block, [0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn ntag_read_block_bad_status_is_tag_level_failure() {
        let script = ack_then(&[READER_TO_HOST, 0x41, 0x14]); // timeout status
        let mut pn = Pn532::new(ScriptedPort::new(&script));
        assert!(pn.ntag_read_block(4).unwrap().is_none());
    }

    #[test]
    fn ntag_write_block_checks_status() {
        let script = ack_then(&[READER_TO_HOST, 0x41, 0x00]);
        let mut pn = Pn532::new(ScriptedPort::new(&script));
        assert!(pn.ntag_write_block(4, &[1, 2, 3, 4]).unwrap());

        let script = ack_then(&[READER_TO_HOST, 0x41, 0x14]);
        let mut pn = Pn532::new(ScriptedPort::new(&script));
        assert!(!pn.ntag_write_block(4, &[1, 2, 3, 4]).unwrap());
    }

    #[test]
    fn ack_is_found_past_leading_idle_bytes() {
        let mut script = vec![0x00, 0x00, 0x00]; // idle padding before the ACK
        script.extend_from_slice(&ACK_FRAME);
        script.extend_from_slice(&response_frame(&[
            READER_TO_HOST,
            0x03,
            0x32,
            0x01,
            0x06,
            0x07,
        ]));
        let mut pn = Pn532::new(ScriptedPort::new(&script));
        assert!(pn.firmware_version().is_ok());
    }
}
