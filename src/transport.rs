//! # Line Transport
//!
//! A thin wrapper over a TCP stream that speaks in lines of UTF-8 text, which
//! is all the player's telnet console needs:
//!
//! - [`LineTransport::write_line`] sends one newline-terminated line and flushes
//!   it immediately.
//! - [`LineTransport::read_until_line`] accumulates incoming lines until one of
//!   them contains a target substring, polling the socket at a short fixed
//!   interval.
//!
//! ## Soft timeouts
//!
//! The wait in `read_until_line` is bounded, but running out of time is not an
//! error: whatever arrived so far is returned and the caller decides whether
//! the response is complete. The console's prompt framing is not strictly
//! predictable, so the parsers downstream are where incompleteness is caught.
//!
//! ## Telnet negotiation
//!
//! The console wraps its password prompt in telnet option negotiation
//! (`IAC WILL ECHO` and friends). Those command sequences are stripped from the
//! inbound bytes before decoding; nothing is sent back in reply.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::error::AutoplayError;

const IAC: u8 = 255;
const DONT: u8 = 254;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TelnetState {
    Data,
    Command,
    OptionCode,
    Subnegotiation,
    SubnegotiationCommand,
}

/// Line-oriented text connection to the console.
#[derive(Debug)]
pub struct LineTransport {
    stream: TcpStream,
    peer: String,
    /// Bytes received (telnet commands already removed) but not yet handed out.
    buffer: Vec<u8>,
    telnet: TelnetState,
    poll_interval: Duration,
}

impl LineTransport {
    /// Resolves `host:port` and connects to the first address that answers
    /// within `connect_timeout`.
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, AutoplayError> {
        let address = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };

        let candidates = address
            .to_socket_addrs()
            .map_err(|source| AutoplayError::Connect {
                address: address.clone(),
                source,
            })?;

        let mut last_err = None;
        for addr in candidates {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => {
                    debug!("Connected to console at {addr}");
                    return Self::from_stream(stream, poll_interval);
                }
                Err(err) => {
                    debug!("Connection attempt to {addr} failed: {err}");
                    last_err = Some(err);
                }
            }
        }

        Err(AutoplayError::Connect {
            address,
            source: last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no socket addresses resolved")
            }),
        })
    }

    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream, poll_interval: Duration) -> Result<Self, AutoplayError> {
        // A zero read timeout is rejected by the OS layer.
        let poll_interval = poll_interval.max(Duration::from_millis(1));
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "console".to_string());

        stream
            .set_nodelay(true)
            .and_then(|_| stream.set_read_timeout(Some(poll_interval)))
            .map_err(|err| AutoplayError::transport("configuring the socket", err))?;

        Ok(Self {
            stream,
            peer,
            buffer: Vec::new(),
            telnet: TelnetState::Data,
            poll_interval,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Sends `line` followed by a newline, without buffering delay.
    pub fn write_line(&mut self, line: &str) -> Result<(), AutoplayError> {
        debug!("out: '{line}'");
        self.send(line, line)
    }

    /// Like [`write_line`](Self::write_line) but keeps the text out of the log.
    pub fn write_secret_line(&mut self, line: &str) -> Result<(), AutoplayError> {
        debug!("out: '********'");
        self.send(line, "<secret>")
    }

    fn send(&mut self, line: &str, shown: &str) -> Result<(), AutoplayError> {
        let mut payload = String::with_capacity(line.len() + 1);
        payload.push_str(line);
        payload.push('\n');

        self.stream
            .write_all(payload.as_bytes())
            .and_then(|_| self.stream.flush())
            .map_err(|err| AutoplayError::transport(&format!("sending `{shown}`"), err))
    }

    /// Reads until a received line contains `target`, or until `timeout` has
    /// elapsed since the call began.
    ///
    /// Returns everything received up to and including the matching line. On
    /// timeout the partial text is returned instead of an error. The tail of
    /// the stream is also checked, since the prompt is not newline-terminated.
    ///
    /// # Errors
    ///
    /// - [`AutoplayError::ConnectionClosed`] if the peer hangs up first
    /// - [`AutoplayError::Decode`] if the console sends invalid UTF-8
    /// - [`AutoplayError::Transport`] on any other socket failure
    pub fn read_until_line(&mut self, target: &str, timeout: Duration) -> Result<String, AutoplayError> {
        let begin = Instant::now();
        let mut received = String::new();

        loop {
            while let Some(line) = self.take_line()? {
                debug!("in : '{}'", line.trim_end());
                let found = line.contains(target);
                received.push_str(&line);
                if found {
                    return Ok(received);
                }
            }

            if decode_prefix(&self.buffer)?.contains(target) {
                let tail = self.take_pending()?;
                debug!("in : '{tail}'");
                received.push_str(&tail);
                return Ok(received);
            }

            if begin.elapsed() > timeout {
                let tail = self.take_pending()?;
                received.push_str(&tail);
                debug!(
                    "Gave up waiting for {target:?} from {} after {:?}; returning {} bytes",
                    self.peer,
                    begin.elapsed(),
                    received.len()
                );
                return Ok(received);
            }

            self.fill(target)?;
        }
    }

    /// Shuts the socket down in both directions. Failures are only logged.
    pub fn close(&mut self) {
        if let Err(err) = self.stream.shutdown(Shutdown::Both) {
            debug!("Shutdown of console socket {} failed: {err}", self.peer);
        }
    }

    /// One bounded read from the socket into the buffer.
    fn fill(&mut self, waiting_for: &str) -> Result<(), AutoplayError> {
        let mut chunk = [0u8; READ_CHUNK];
        match self.stream.read(&mut chunk) {
            Ok(0) => Err(AutoplayError::connection_closed(&format!(
                "waiting for {waiting_for:?}"
            ))),
            Ok(n) => {
                trace!("Received {n} bytes from {}", self.peer);
                self.absorb(&chunk[..n]);
                Ok(())
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                trace!("No data within {:?}", self.poll_interval);
                Ok(())
            }
            Err(err) => Err(AutoplayError::transport(
                &format!("waiting for {waiting_for:?}"),
                err,
            )),
        }
    }

    /// Appends raw socket bytes to the buffer, dropping telnet commands.
    fn absorb(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.telnet = match (self.telnet, byte) {
                (TelnetState::Data, IAC) => TelnetState::Command,
                (TelnetState::Data, data) => {
                    self.buffer.push(data);
                    TelnetState::Data
                }
                (TelnetState::Command, IAC) => {
                    self.buffer.push(IAC);
                    TelnetState::Data
                }
                (TelnetState::Command, WILL..=DONT) => TelnetState::OptionCode,
                (TelnetState::Command, SB) => TelnetState::Subnegotiation,
                (TelnetState::Command, _) => TelnetState::Data,
                (TelnetState::OptionCode, _) => TelnetState::Data,
                (TelnetState::Subnegotiation, IAC) => TelnetState::SubnegotiationCommand,
                (TelnetState::Subnegotiation, _) => TelnetState::Subnegotiation,
                (TelnetState::SubnegotiationCommand, SE) => TelnetState::Data,
                (TelnetState::SubnegotiationCommand, _) => TelnetState::Subnegotiation,
            };
        }
    }

    /// Removes and decodes the first complete line, newline included.
    fn take_line(&mut self) -> Result<Option<String>, AutoplayError> {
        let Some(end) = self.buffer.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let bytes: Vec<u8> = self.buffer.drain(..=end).collect();
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|err| AutoplayError::Decode {
                source: err.utf8_error(),
            })
    }

    /// Removes the decodable part of an unterminated tail.
    fn take_pending(&mut self) -> Result<String, AutoplayError> {
        let len = decode_prefix(&self.buffer)?.len();
        let bytes: Vec<u8> = self.buffer.drain(..len).collect();
        String::from_utf8(bytes).map_err(|err| AutoplayError::Decode {
            source: err.utf8_error(),
        })
    }
}

/// Decodes `bytes`, holding back a multi-byte sequence cut off at the end.
fn decode_prefix(bytes: &[u8]) -> Result<&str, AutoplayError> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) if err.error_len().is_none() => std::str::from_utf8(&bytes[..err.valid_up_to()])
            .map_err(|source| AutoplayError::Decode { source }),
        Err(source) => Err(AutoplayError::Decode { source }),
    }
}
