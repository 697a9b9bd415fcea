//! Device protocol handling and command execution

use std::time::Duration;
use tokio::io::{ AsyncReadExt, AsyncWriteExt };
use crate::{
    cmd::Command,
    error::Error,
    response::{ decode, DecodeContext, Response },
};

/// Upper bound on any single read of one response line
///
/// A stuck instrument fails the read rather than hanging the caller forever.
pub const READ_TIMEOUT: Duration = Duration::from_secs(20);

/// Wait between busy-poll attempts while a metered reading settles
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Wait between the last setup command of a script and starting the reading
pub const PRE_READ_SETTLE: Duration = Duration::from_millis(500);

/// Wait after a `REMOTE`/`PAT` transition for the front panel to switch over
///
/// The firmware needs real wall-clock time here; commands sent sooner are
/// dropped on the floor by some revisions.
pub const REMOTE_SETTLE: Duration = Duration::from_secs(1);

/// Escape sequence that returns the instrument to idle after a metered reading
const CANCEL_SEQUENCE: [u8; 3] = [0x1B, 0x0D, 0x0A];

/// Exchange engine for the line-oriented wire protocol
///
/// Owns the I/O stream and a read buffer. Commands go out one per
/// CR-terminated line; responses come back one per LF-terminated line. All
/// exchanges are strictly sequential: one write, one read, no pipelining.
pub(crate) struct Executor<T>
{
    io_handle: T,
    read_buf: Vec<u8>,
}

impl <T> Executor<T>
    where T: AsyncReadExt + AsyncWriteExt + Unpin + Send
{
    pub fn with(io_handle: T) -> Self
    {
        Self {
            io_handle: io_handle,
            read_buf: Vec::with_capacity(128),
        }
    }

    pub fn into_inner(self) -> T
    {
        self.io_handle
    }

    /// Drops the first `n` bytes from the read buffer
    ///
    /// Drops all bytes if `n >= self.read_buf.len()`
    fn drop_first(&mut self, n: usize)
    {
        if n >= self.read_buf.len() {
            self.read_buf.clear();
        }
        else {
            // relocate any bytes after the Nth byte to index 0
            self.read_buf.rotate_left(n);
            // chop off the bytes we just consumed
            self.read_buf.truncate(self.read_buf.len() - n);
            self.read_buf.shrink_to(128);
        }
    }

    /// Returns the index of the first linefeed in the read buffer if any,
    /// starting the scan at the suggested index
    fn find_line_ending(&self, start_hint: usize) -> Option<usize>
    {
        for index in start_hint..self.read_buf.len() {
            if self.read_buf[index] == 0x0A {
                return Some(index);
            }
        }

        None
    }

    /// Reads bytes into the read buffer until it holds a complete line and
    /// returns the line's length including the terminator
    async fn fill_line(&mut self) -> Result<usize, Error>
    {
        let mut scanned = self.read_buf.len().saturating_sub(1);
        // try to find the ending in already-buffered data first
        let mut end_index = self.find_line_ending(0);

        while end_index.is_none() {
            let mut temp_buf = [0u8; 64];

            let bytes_read = self.io_handle.read(&mut temp_buf[..]).await?;
            if bytes_read == 0 {
                return Err(Error::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)));
            }

            self.read_buf.extend_from_slice(&temp_buf[..bytes_read]);
            end_index = self.find_line_ending(scanned);
            scanned = self.read_buf.len();
        }

        Ok(end_index.ok_or_else(|| std::io::Error::from(std::io::ErrorKind::UnexpectedEof))? + 1)
    }

    /// Reads exactly one response line, bounded by [`READ_TIMEOUT`]
    ///
    /// The trailing CR/LF is stripped before the line is returned.
    pub async fn read_line(&mut self) -> Result<String, Error>
    {
        let line_len = tokio::time::timeout(READ_TIMEOUT, self.fill_line())
            .await
            .map_err(|_| Error::Timeout(READ_TIMEOUT))??;

        let mut line_bytes = self.read_buf[..line_len].to_vec();
        self.drop_first(line_len);

        while line_bytes.last().map_or(false, |byte| *byte == 0x0A || *byte == 0x0D) {
            line_bytes.pop();
        }

        let line = String::from_utf8(line_bytes)?;
        log::debug!("<-- {:?}", line);

        Ok(line)
    }

    /// Writes one command line, CR terminated
    pub async fn send(&mut self, cmd: &Command) -> Result<(), Error>
    {
        let wire = format!("{}\r", cmd);
        log::debug!("--> {:?}", wire);
        self.io_handle.write_all(wire.as_bytes()).await?;

        Ok(())
    }

    /// Executes one setup command: send it, read one line, require the Ack
    ///
    /// Any other outcome aborts the current script with a protocol error.
    /// Never retried; there is no safe resynchronization point mid-script.
    pub async fn exec(&mut self, cmd: Command) -> Result<(), Error>
    {
        self.send(&cmd).await?;
        let line = self.read_line().await?;

        match decode(&line, DecodeContext::Command) {
            Response::Ack => Ok(()),
            _ => Err(Error::Protocol {
                cmd: cmd.to_string(),
                response: line,
            }),
        }
    }

    pub async fn exec_all(&mut self, cmds: &[Command]) -> Result<(), Error>
    {
        for cmd in cmds.iter() {
            self.exec(cmd.clone()).await?;
        }

        Ok(())
    }

    /// Sends the cancel escape sequence and discards the acknowledgement line
    pub async fn cancel_metering(&mut self) -> Result<(), Error>
    {
        self.io_handle.write_all(&CANCEL_SEQUENCE).await?;
        let _ = self.read_line().await?;

        Ok(())
    }

    /// Runs the busy-poll protocol for an asynchronous metered reading
    ///
    /// Sends `MREAD`, then reads until the device stops answering with the
    /// busy marker, waiting [`POLL_INTERVAL`] between attempts. Each attempt
    /// is individually bounded by [`READ_TIMEOUT`]. Once a terminal line
    /// arrives the metering is cancelled so the instrument returns to idle,
    /// and the raw line is handed back for classification.
    pub async fn poll_metered_line(&mut self) -> Result<String, Error>
    {
        self.send(&Command::MeterRead).await?;
        let mut line = self.read_line().await?;

        while matches!(decode(&line, DecodeContext::Poll), Response::Busy) {
            tokio::time::sleep(POLL_INTERVAL).await;
            line = self.read_line().await?;
        }

        self.cancel_metering().await?;

        Ok(line)
    }
}
