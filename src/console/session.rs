//! Authenticated command/response session shared by both console dialects.

use std::time::Duration;

use log::{debug, info, warn};

use crate::console::{ConsoleSettings, LOGOUT_COMMAND, PASSWORD_PROMPT, PROMPT};
use crate::error::AutoplayError;
use crate::transport::LineTransport;

/// One logged-in connection to the console.
///
/// Every command is answered by some text followed by the prompt, so each
/// call here writes one line and then reads through the next prompt. Queries
/// wait up to the query timeout; acknowledgements only up to the shorter ack
/// timeout.
#[derive(Debug)]
pub struct Session {
    transport: LineTransport,
    ack_timeout: Duration,
    query_timeout: Duration,
    closed: bool,
}

impl Session {
    /// Connects and logs in with the configured password.
    ///
    /// The console gives no explicit verdict on the password. Reaching the
    /// prompt counts as success; a rejected password shows up as failures of
    /// the commands that follow.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the socket cannot be opened or drops
    /// during the handshake.
    pub fn open(settings: &ConsoleSettings) -> Result<Self, AutoplayError> {
        info!("Connecting to console on {}:{}", settings.host, settings.port);
        let transport = LineTransport::connect(
            &settings.host,
            settings.port,
            settings.connect_timeout,
            settings.poll_interval,
        )?;

        let mut session = Self::with_transport(transport, settings);
        session.login(&settings.password)?;
        Ok(session)
    }

    pub fn with_transport(transport: LineTransport, settings: &ConsoleSettings) -> Self {
        Self {
            transport,
            ack_timeout: settings.ack_timeout,
            query_timeout: settings.query_timeout,
            closed: false,
        }
    }

    fn login(&mut self, password: &str) -> Result<(), AutoplayError> {
        let greeting = self.transport.read_until_line(PASSWORD_PROMPT, self.ack_timeout)?;
        if !greeting.contains(PASSWORD_PROMPT) {
            debug!("No password prompt within {:?}; sending password anyway", self.ack_timeout);
        }

        self.transport.write_secret_line(password)?;
        let banner = self.transport.read_until_line(PROMPT, self.ack_timeout)?;
        if banner.contains(PROMPT) {
            info!("Logged in to console at {}", self.transport.peer());
        } else {
            warn!(
                "No prompt from {} after sending the password; continuing anyway",
                self.transport.peer()
            );
        }
        Ok(())
    }

    /// Sends a command whose response carries data.
    pub fn query(&mut self, command: &str) -> Result<String, AutoplayError> {
        self.transport.write_line(command)?;
        self.transport.read_until_line(PROMPT, self.query_timeout)
    }

    /// Sends a command whose response is only an acknowledgement.
    pub fn acknowledge(&mut self, command: &str) -> Result<(), AutoplayError> {
        self.transport.write_line(command)?;
        let response = self.transport.read_until_line(PROMPT, self.ack_timeout)?;
        if !response.contains(PROMPT) {
            debug!("`{command}` not acknowledged within {:?}", self.ack_timeout);
        }
        Ok(())
    }

    /// Sends `logout` and closes the socket whether or not the write worked.
    /// Calling it again is a no-op.
    pub fn logout(&mut self) -> Result<(), AutoplayError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let sent = self.transport.write_line(LOGOUT_COMMAND);
        self.transport.close();
        info!("Closed console session with {}", self.transport.peer());
        sent
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
