use std::{
    io::{self, ErrorKind, Read, Write},
    net::{Shutdown, TcpStream},
    time::Duration,
};

/// Byte stream to the debug server.
pub trait Transport: Read + Write {
    /// Bound the time a single `read` may block.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Drop everything that has already been received but not read.
    /// Returns the number of discarded bytes.
    fn discard_unread(&mut self) -> io::Result<usize>;

    /// Release the connection.
    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn discard_unread(&mut self) -> io::Result<usize> {
        self.set_nonblocking(true)?;
        let mut buf = [0u8; 256];
        let mut discarded = 0;
        let result = loop {
            match self.read(&mut buf) {
                Ok(0) => break Ok(discarded),
                Ok(n) => discarded += n,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break Ok(discarded),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => break Err(e),
            }
        };
        self.set_nonblocking(false)?;
        result
    }

    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}
