//! Channel-backed `QueuedSpi`
//!
//! Units are handed to a transfer worker running in another execution
//! context (a higher-priority executor or the second core) through
//! `embassy-sync` channels. [`ChannelQueue::queue_transaction`] returns as
//! soon as the unit sits in the request channel; the worker clocks it out,
//! usually by DMA, and posts the outcome back. Collecting a completion
//! blocks until the worker has posted it.
//!
//! ```text
//!  caller                    TransferChannels                 worker
//!  queue_transaction ──► requests ──────────────────► next_request
//!                                                     (DC, DMA write)
//!  transaction_result ◄── completions ◄────────────── complete
//!  polling_transmit   ◄── polled ◄─────────────────── complete
//! ```
//!
//! Inline bytes are copied into the request. Borrowed bytes travel as an
//! address and a length; the worker turns them back into a slice, which is
//! sound only as long as callers keep the [`QueuedSpi`] contract.

use core::fmt::Debug;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use crate::spi::{DcLevel, QueuedSpi, SpiConfig, Transaction, INLINE_CAPACITY};

/// Where the worker posts the outcome of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// Completion channel, collected in FIFO order
    Queued,
    /// The polled signal, awaited by the sender
    Polled,
}

/// Bytes of one unit as seen by the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestBytes {
    /// Copied parameter bytes
    Inline { bytes: [u8; INLINE_CAPACITY], len: u8 },
    /// Caller buffer, valid until the completion is collected
    Buffer { address: usize, len: usize },
}

/// One unit on its way to the transfer worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferRequest {
    dc: DcLevel,
    bytes: RequestBytes,
    reply: Reply,
}

impl TransferRequest {
    pub fn new(transaction: &Transaction<'_>, reply: Reply) -> Self {
        let data = transaction.bytes();
        let bytes = if transaction.is_inline() {
            let mut inline = [0; INLINE_CAPACITY];
            inline[..data.len()].copy_from_slice(data);
            RequestBytes::Inline {
                bytes: inline,
                len: data.len() as u8,
            }
        } else {
            RequestBytes::Buffer {
                address: data.as_ptr() as usize,
                len: data.len(),
            }
        };
        Self {
            dc: transaction.dc(),
            bytes,
            reply,
        }
    }

    /// D/C level to drive while clocking this unit
    pub fn dc(&self) -> DcLevel {
        self.dc
    }

    pub fn bytes(&self) -> &RequestBytes {
        &self.bytes
    }

    pub fn reply(&self) -> Reply {
        self.reply
    }

    /// Number of bytes on the wire
    pub fn len(&self) -> usize {
        match self.bytes {
            RequestBytes::Inline { len, .. } => usize::from(len),
            RequestBytes::Buffer { len, .. } => len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copied bytes, `None` for a caller buffer
    pub fn inline_bytes(&self) -> Option<&[u8]> {
        match &self.bytes {
            RequestBytes::Inline { bytes, len } => Some(&bytes[..usize::from(*len)]),
            RequestBytes::Buffer { .. } => None,
        }
    }
}

/// Errors from the channel-backed queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelError<E> {
    /// The worker reported a bus error for this unit
    Bus(E),
    /// More transactions queued than the queue depth allows
    QueueFull,
    /// Result requested with no transaction in flight
    NothingQueued,
}

/// Channels shared between the queue and the transfer worker
///
/// Usually a `static`, so both sides can reach it from different executors.
pub struct TransferChannels<M: RawMutex, E, const N: usize> {
    requests: Channel<M, TransferRequest, N>,
    completions: Channel<M, Result<(), E>, N>,
    polled: Signal<M, Result<(), E>>,
}

impl<M: RawMutex, E, const N: usize> TransferChannels<M, E, N> {
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
            completions: Channel::new(),
            polled: Signal::new(),
        }
    }

    /// Worker side: wait for the next unit
    pub async fn next_request(&self) -> TransferRequest {
        self.requests.receive().await
    }

    /// Worker side: post the outcome of `request`
    pub async fn complete(&self, request: &TransferRequest, result: Result<(), E>) {
        match request.reply {
            Reply::Queued => self.completions.send(result).await,
            Reply::Polled => self.polled.signal(result),
        }
    }

    /// Units waiting for the worker
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }
}

impl<M: RawMutex, E, const N: usize> Default for TransferChannels<M, E, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// `QueuedSpi` that hands units to a transfer worker
pub struct ChannelQueue<'c, M: RawMutex, E, const N: usize> {
    channels: &'c TransferChannels<M, E, N>,
    depth: usize,
    outstanding: usize,
}

impl<'c, M: RawMutex, E, const N: usize> ChannelQueue<'c, M, E, N> {
    /// Queue with the depth from `config`, capped at the channel capacity
    pub fn new(channels: &'c TransferChannels<M, E, N>, config: &SpiConfig) -> Self {
        Self {
            channels,
            depth: config.bounded_queue_depth(N),
            outstanding: 0,
        }
    }

    /// Queued units whose completion has not been collected
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
}

impl<M: RawMutex, E: Debug, const N: usize> QueuedSpi for ChannelQueue<'_, M, E, N> {
    type Error = ChannelError<E>;

    fn queue_depth(&self) -> usize {
        self.depth
    }

    fn polling_transmit(&mut self, transaction: &Transaction<'_>) -> Result<(), Self::Error> {
        let request = TransferRequest::new(transaction, Reply::Polled);
        let channels = self.channels;
        block_on(async {
            channels.requests.send(request).await;
            channels.polled.wait().await
        })
        .map_err(ChannelError::Bus)
    }

    fn queue_transaction(&mut self, transaction: &Transaction<'_>) -> Result<(), Self::Error> {
        if self.outstanding >= self.depth {
            return Err(ChannelError::QueueFull);
        }
        self.channels
            .requests
            .try_send(TransferRequest::new(transaction, Reply::Queued))
            .map_err(|_| ChannelError::QueueFull)?;
        self.outstanding += 1;
        Ok(())
    }

    fn transaction_result(&mut self) -> Result<(), Self::Error> {
        if self.outstanding == 0 {
            return Err(ChannelError::NothingQueued);
        }
        let result = block_on(self.channels.completions.receive());
        self.outstanding -= 1;
        result.map_err(ChannelError::Bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct BusFault;

    type Channels = TransferChannels<NoopRawMutex, BusFault, 4>;

    /// Stand-in worker: take every waiting unit, count its bytes as clocked
    fn run_worker(channels: &Channels, clocked: &mut usize, result: Result<(), BusFault>) {
        while channels.pending_requests() > 0 {
            let request = block_on(channels.next_request());
            *clocked += request.len();
            block_on(channels.complete(&request, result));
        }
    }

    #[test]
    fn test_queue_returns_before_bytes_are_clocked() {
        let channels = Channels::new();
        let mut queue = ChannelQueue::new(&channels, &SpiConfig::default());
        let chunk = [0x5Au8; 25_600];
        let mut clocked = 0;

        queue.queue_transaction(&Transaction::command(0x2C)).unwrap();
        queue.queue_transaction(&Transaction::data(&chunk)).unwrap();

        assert_eq!(clocked, 0);
        assert_eq!(channels.pending_requests(), 2);
        assert_eq!(queue.outstanding(), 2);

        run_worker(&channels, &mut clocked, Ok(()));
        assert_eq!(clocked, 25_601);

        assert_eq!(queue.transaction_result(), Ok(()));
        assert_eq!(queue.transaction_result(), Ok(()));
        assert_eq!(queue.outstanding(), 0);
    }

    #[test]
    fn test_request_carries_buffer_address() {
        let channels = Channels::new();
        let mut queue = ChannelQueue::new(&channels, &SpiConfig::default());
        let chunk = [0u8; 640];

        queue.queue_transaction(&Transaction::data(&chunk)).unwrap();
        let request = block_on(channels.next_request());

        assert_eq!(request.dc(), DcLevel::Data);
        assert_eq!(request.reply(), Reply::Queued);
        assert_eq!(request.inline_bytes(), None);
        assert_eq!(
            *request.bytes(),
            RequestBytes::Buffer {
                address: chunk.as_ptr() as usize,
                len: 640
            }
        );
    }

    #[test]
    fn test_inline_bytes_are_copied() {
        let channels = Channels::new();
        let mut queue = ChannelQueue::new(&channels, &SpiConfig::default());

        {
            let transaction = Transaction::data_inline([0x00, 0x00, 0x01, 0x3F]);
            queue.queue_transaction(&transaction).unwrap();
        }
        let request = block_on(channels.next_request());

        assert_eq!(request.inline_bytes(), Some(&[0x00, 0x00, 0x01, 0x3F][..]));
        assert_eq!(request.len(), 4);
    }

    #[test]
    fn test_command_level_reaches_worker() {
        let channels = Channels::new();
        let mut queue = ChannelQueue::new(&channels, &SpiConfig::default());

        queue.queue_transaction(&Transaction::command(0x2A)).unwrap();
        let request = block_on(channels.next_request());

        assert_eq!(request.dc(), DcLevel::Command);
        assert_eq!(request.inline_bytes(), Some(&[0x2A][..]));
    }

    #[test]
    fn test_depth_from_config() {
        let channels = Channels::new();
        let config = SpiConfig {
            queue_depth: 2,
            ..SpiConfig::default()
        };
        let mut queue = ChannelQueue::new(&channels, &config);

        assert_eq!(queue.queue_depth(), 2);
        queue.queue_transaction(&Transaction::command(0x01)).unwrap();
        queue.queue_transaction(&Transaction::command(0x02)).unwrap();
        assert_eq!(
            queue.queue_transaction(&Transaction::command(0x03)),
            Err(ChannelError::QueueFull)
        );
    }

    #[test]
    fn test_depth_capped_at_channel_capacity() {
        let channels = Channels::new();
        // Default config asks for 12, the channels hold 4
        let queue = ChannelQueue::new(&channels, &SpiConfig::default());
        assert_eq!(queue.queue_depth(), 4);
    }

    #[test]
    fn test_nothing_queued() {
        let channels = Channels::new();
        let mut queue = ChannelQueue::new(&channels, &SpiConfig::default());
        assert_eq!(queue.transaction_result(), Err(ChannelError::NothingQueued));
    }

    #[test]
    fn test_bus_error_on_collection() {
        let channels = Channels::new();
        let mut queue = ChannelQueue::new(&channels, &SpiConfig::default());
        let mut clocked = 0;

        queue.queue_transaction(&Transaction::command(0x2C)).unwrap();
        run_worker(&channels, &mut clocked, Err(BusFault));

        assert_eq!(
            queue.transaction_result(),
            Err(ChannelError::Bus(BusFault))
        );
        assert_eq!(queue.outstanding(), 0);
    }

    #[test]
    fn test_polling_transmit_uses_polled_reply() {
        let channels = Channels::new();
        let mut queue = ChannelQueue::new(&channels, &SpiConfig::default());

        // Worker has already answered, so the wait returns at once
        let earlier = TransferRequest::new(&Transaction::command(0x00), Reply::Polled);
        block_on(channels.complete(&earlier, Ok(())));

        queue.polling_transmit(&Transaction::command(0x11)).unwrap();

        assert_eq!(queue.outstanding(), 0);
        let request = block_on(channels.next_request());
        assert_eq!(request.reply(), Reply::Polled);
        assert_eq!(request.inline_bytes(), Some(&[0x11][..]));
    }
}
