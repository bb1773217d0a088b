//! Idle deadline for connection I/O.
//!
//! Every poll of a read or a write pushes the deadline `timeout` into the
//! future, for both directions. A read or write left pending until its
//! deadline passes fails with [`io::ErrorKind::TimedOut`], and every later
//! operation fails the same way.
//!
//! A dropped (cancelled) operation leaves its direction armed, but the next
//! operation started inside the window extends the deadline as usual.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep};

/// Stream wrapper enforcing an idle deadline.
#[derive(Debug)]
pub struct IdleTimeoutStream<S> {
    inner: S,
    timeout: Duration,
    // one timer per direction so split halves on different tasks each get woken
    read_deadline: Pin<Box<Sleep>>,
    write_deadline: Pin<Box<Sleep>>,
    // set while the last poll of that direction returned Pending
    read_armed: bool,
    write_armed: bool,
    expired: bool,
}

impl<S> IdleTimeoutStream<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            inner,
            timeout,
            read_deadline: Box::pin(tokio::time::sleep_until(deadline)),
            write_deadline: Box::pin(tokio::time::sleep_until(deadline)),
            read_armed: false,
            write_armed: false,
            expired: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether an operation has already hit the deadline.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn extend(&mut self) {
        let deadline = Instant::now() + self.timeout;
        self.read_deadline.as_mut().reset(deadline);
        self.write_deadline.as_mut().reset(deadline);
    }
}

fn past(deadline: &Pin<Box<Sleep>>) -> bool {
    Instant::now() >= deadline.deadline()
}

fn deadline_exceeded() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "idle deadline exceeded")
}

impl<S: AsyncRead + Unpin> AsyncRead for IdleTimeoutStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.expired || (this.read_armed && past(&this.read_deadline)) {
            this.expired = true;
            return Poll::Ready(Err(deadline_exceeded()));
        }
        this.extend();

        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => {
                this.read_armed = false;
                Poll::Ready(result)
            }
            Poll::Pending => {
                this.read_armed = true;
                // just extended, so this only registers the wakeup
                match this.read_deadline.as_mut().poll(cx) {
                    Poll::Ready(()) => {
                        this.expired = true;
                        Poll::Ready(Err(deadline_exceeded()))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for IdleTimeoutStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.expired || (this.write_armed && past(&this.write_deadline)) {
            this.expired = true;
            return Poll::Ready(Err(deadline_exceeded()));
        }
        this.extend();

        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                this.write_armed = false;
                Poll::Ready(result)
            }
            Poll::Pending => {
                this.write_armed = true;
                match this.write_deadline.as_mut().poll(cx) {
                    Poll::Ready(()) => {
                        this.expired = true;
                        Poll::Ready(Err(deadline_exceeded()))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
