//! The kernel-offloaded receive path: a completion-queue seam and its
//! io_uring-backed implementation.

use std::{io, os::fd::RawFd};

use io_uring::{opcode, types, IoUring};

use crate::{Error, Result};

/// A completed receive, attributed back to the buffer that was posted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Completion {
    /// The tag the buffer was posted with.
    pub id: u64,
    /// The number of bytes received, `0` if the peer closed the connection,
    /// or a negated errno on transport failure.
    pub len: i32,
}

/// The interface the framing reader drives: post receive buffers, wait for
/// completions. Exactly one completion is eventually consumed for every
/// posted buffer.
pub(crate) trait RecvQueue {
    /// Posts `len` bytes at `buf` to be filled with received data, tagged
    /// with `id`.
    ///
    /// # Safety
    /// The buffer must remain valid, and must not be read or written by the
    /// caller, until the completion carrying `id` is returned by
    /// [`wait`](Self::wait).
    unsafe fn post(&mut self, id: u64, buf: *mut u8, len: usize) -> Result<()>;

    /// Blocks until a posted buffer completes. Returns `None` when the wait
    /// was interrupted by a signal before a completion arrived, which is not
    /// an error.
    fn wait(&mut self) -> Result<Option<Completion>>;
}

/// The number of submission entries: one per receive buffer.
const RING_ENTRIES: u32 = 2;

/// A [`RecvQueue`] backed by an io_uring instance issuing `recv` operations
/// against one socket. Receives overlap with userspace dispatch: while the
/// client walks the records of one buffer, the kernel fills the other.
pub(crate) struct Uring {
    ring: IoUring,
    fd: RawFd,
}

impl Uring {
    /// Creates a new ring for receiving from the socket `fd`.
    ///
    /// # Errors
    /// This function returns an error if the kernel rejects the io_uring
    /// setup.
    pub fn new(fd: RawFd) -> Result<Self> {
        Ok(Self {
            ring: IoUring::new(RING_ENTRIES).map_err(|e| Error::io(e, "initializing io_uring"))?,
            fd,
        })
    }
}

impl RecvQueue for Uring {
    unsafe fn post(&mut self, id: u64, buf: *mut u8, len: usize) -> Result<()> {
        let sqe = opcode::Recv::new(types::Fd(self.fd), buf, len as u32)
            .build()
            .user_data(id);
        // Safety: the caller guarantees the buffer outlives the operation.
        unsafe {
            self.ring
                .submission()
                .push(&sqe)
                .map_err(|_| Error::Buffer("io_uring submission queue is full".to_owned()))?;
        }
        self.ring
            .submit()
            .map_err(|e| Error::io(e, "submitting receive"))?;
        Ok(())
    }

    fn wait(&mut self) -> Result<Option<Completion>> {
        loop {
            if let Some(cqe) = self.ring.completion().next() {
                return Ok(Some(Completion {
                    id: cqe.user_data(),
                    len: cqe.result(),
                }));
            }
            if let Err(err) = self.ring.submit_and_wait(1) {
                if err.kind() == io::ErrorKind::Interrupted {
                    return Ok(None);
                }
                return Err(Error::io(err, "waiting on completion queue"));
            }
        }
    }
}
