//! Splitting the DBN byte stream into records across a double-buffered
//! receive path.

use std::{mem, slice};

use crate::{
    live::ring::{Completion, RecvQueue},
    record::RecordHeader,
    Error, RecordRef, Result,
};

/// A receive buffer backed by `u64` storage so that every record view over it
/// is aligned for the common header. Records are multiples of 8 bytes, so
/// record starts stay aligned as long as the base is.
struct AlignedBuffer(Box<[u64]>);

impl AlignedBuffer {
    fn new(capacity: usize) -> Self {
        Self(vec![0u64; capacity.div_ceil(8)].into_boxed_slice())
    }

    fn len(&self) -> usize {
        self.0.len() * 8
    }

    fn as_mut_ptr(&mut self) -> *mut u8 {
        self.0.as_mut_ptr().cast()
    }

    fn bytes(&self) -> &[u8] {
        // Safety: any byte pattern is a valid `[u8]` and the region is owned.
        unsafe { slice::from_raw_parts(self.0.as_ptr().cast(), self.len()) }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        // Safety: any byte pattern is a valid `[u8]` and the region is owned.
        unsafe { slice::from_raw_parts_mut(self.0.as_mut_ptr().cast(), self.len()) }
    }
}

/// Reads a stream of length-prefixed DBN records out of two alternating
/// receive buffers, carrying any trailing partial record over to the next
/// completion. Records are dispatched to the sink in exactly the order they
/// were received: completions are consumed one at a time and a buffer is
/// re-posted only after its records have been dispatched.
pub(crate) struct FramedReader<Q> {
    queue: Q,
    buffers: [AlignedBuffer; 2],
    leftover: AlignedBuffer,
    leftover_len: usize,
}

impl<Q: RecvQueue> FramedReader<Q> {
    /// Creates a new reader over `queue` with two receive buffers and a
    /// carry-over buffer of `capacity` bytes each.
    pub fn new(queue: Q, capacity: usize) -> Self {
        Self {
            queue,
            buffers: [AlignedBuffer::new(capacity), AlignedBuffer::new(capacity)],
            leftover: AlignedBuffer::new(capacity),
            leftover_len: 0,
        }
    }

    /// Posts both receive buffers. Called once, at the point the stream turns
    /// from control messages to DBN records.
    pub fn prime(&mut self) -> Result<()> {
        self.post(0)?;
        self.post(1)
    }

    fn post(&mut self, id: usize) -> Result<()> {
        let buf = &mut self.buffers[id];
        let len = buf.len();
        // Safety: the buffer is owned by `self` and is not touched again
        // until the completion tagged `id` is consumed in `read`.
        unsafe { self.queue.post(id as u64, buf.as_mut_ptr(), len) }
    }

    /// Waits for one completion and dispatches every complete record in it to
    /// `sink`, in receive order. Returns the number of records dispatched,
    /// which is `0` when the wait was interrupted by a signal or the
    /// completion ends mid-record.
    ///
    /// # Errors
    /// This function returns [`Error::PeerClosed`] when the gateway closes
    /// the connection, [`Error::Decode`] on a malformed record length, and
    /// [`Error::Buffer`] if a carry-over would overflow the receive buffer.
    pub fn read<F>(&mut self, mut sink: F) -> Result<usize>
    where
        F: FnMut(RecordRef),
    {
        let Some(Completion { id, len }) = self.queue.wait()? else {
            return Ok(0);
        };
        if len == 0 {
            return Err(Error::PeerClosed);
        }
        if len < 0 {
            return Err(Error::io(
                std::io::Error::from_raw_os_error(-len),
                "receiving from socket",
            ));
        }
        let id = id as usize % self.buffers.len();
        let mut n = len as usize;

        // Prepend any partial record carried over from the previous
        // completion. This path is rare: gateway TCP packets contain whole
        // records, so a record only straddles completions when userland,
        // kernel, and NIC timing happen to misalign.
        if self.leftover_len > 0 {
            if self.leftover_len + n > self.buffers[id].len() {
                return Err(Error::Buffer(format!(
                    "carrying over {} bytes would overflow the receive buffer",
                    self.leftover_len
                )));
            }
            let buf = self.buffers[id].bytes_mut();
            buf.copy_within(..n, self.leftover_len);
            buf[..self.leftover_len].copy_from_slice(&self.leftover.bytes()[..self.leftover_len]);
            n += self.leftover_len;
            self.leftover_len = 0;
        }

        let mut num_records = 0;
        let mut offset = 0;
        let buf = self.buffers[id].bytes();
        while n >= mem::size_of::<RecordHeader>() {
            let length = RecordHeader::LENGTH_MULTIPLIER * buf[offset] as usize;
            if length < mem::size_of::<RecordHeader>() {
                return Err(Error::decode(format!("invalid record length {length}")));
            }
            if n < length {
                break;
            }
            // Safety: `buf[offset..]` begins with a header and holds the
            // complete record it describes.
            sink(unsafe { RecordRef::new(&buf[offset..offset + length]) });
            offset += length;
            n -= length;
            num_records += 1;
        }

        // Keep the partial tail for the next completion.
        if n > 0 {
            self.leftover.bytes_mut()[..n].copy_from_slice(&buf[offset..offset + n]);
            self.leftover_len = n;
        }

        self.post(id)?;
        Ok(num_records)
    }

    #[cfg(test)]
    fn leftover_len(&self) -> usize {
        self.leftover_len
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use rstest::rstest;

    use crate::{enums::rtype, Record};

    use super::*;

    /// A scripted stand-in for the io_uring queue: each [`Step::Data`] fills
    /// the oldest posted buffer with the given bytes.
    #[derive(Default)]
    struct ScriptQueue {
        script: VecDeque<Step>,
        posted: VecDeque<(u64, *mut u8, usize)>,
        num_posts: usize,
    }

    enum Step {
        Data(Vec<u8>),
        Interrupt,
        Close,
        Errno(i32),
    }

    impl ScriptQueue {
        fn scripted(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                script: steps.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    impl RecvQueue for ScriptQueue {
        unsafe fn post(&mut self, id: u64, buf: *mut u8, len: usize) -> Result<()> {
            self.num_posts += 1;
            self.posted.push_back((id, buf, len));
            Ok(())
        }

        fn wait(&mut self) -> Result<Option<Completion>> {
            match self.script.pop_front().expect("script exhausted") {
                Step::Interrupt => Ok(None),
                Step::Close => {
                    let (id, _, _) = self.posted.pop_front().unwrap();
                    Ok(Some(Completion { id, len: 0 }))
                }
                Step::Errno(errno) => {
                    let (id, _, _) = self.posted.pop_front().unwrap();
                    Ok(Some(Completion { id, len: -errno }))
                }
                Step::Data(bytes) => {
                    let (id, ptr, len) = self.posted.pop_front().unwrap();
                    assert!(bytes.len() <= len, "completion larger than buffer");
                    // Safety: the buffer was posted for filling and has
                    // capacity for `bytes`.
                    unsafe {
                        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
                    }
                    Ok(Some(Completion {
                        id,
                        len: bytes.len() as i32,
                    }))
                }
            }
        }
    }

    const CAPACITY: usize = 1024;

    /// Builds a well-formed record of `size` bytes (a multiple of 8, at least
    /// 16) with the given rtype and instrument ID.
    fn record(rtype: u8, instrument_id: u32, size: usize) -> Vec<u8> {
        assert!(size >= 16 && size % 8 == 0);
        let mut bytes = vec![0u8; size];
        bytes[0] = (size / 4) as u8;
        bytes[1] = rtype;
        bytes[2..4].copy_from_slice(&1u16.to_le_bytes());
        bytes[4..8].copy_from_slice(&instrument_id.to_le_bytes());
        bytes[8..16].copy_from_slice(&2u64.to_le_bytes());
        bytes
    }

    fn reader(steps: impl IntoIterator<Item = Step>) -> FramedReader<ScriptQueue> {
        let mut reader = FramedReader::new(ScriptQueue::scripted(steps), CAPACITY);
        reader.prime().unwrap();
        reader
    }

    fn drain(reader: &mut FramedReader<ScriptQueue>, reads: usize) -> Vec<u32> {
        let mut ids = Vec::new();
        for _ in 0..reads {
            reader.read(|rec| ids.push(rec.header().instrument_id)).unwrap();
        }
        ids
    }

    #[test]
    fn test_single_completion_dispatches_in_order() {
        let mut stream = record(rtype::SYSTEM, 1, 80);
        stream.extend(record(rtype::CMBP_1, 2, 80));
        stream.extend(record(rtype::CMBP_1, 3, 80));
        let mut target = reader([Step::Data(stream)]);
        let mut ids = Vec::new();
        let count = target
            .read(|rec| ids.push(rec.header().instrument_id))
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(target.leftover_len(), 0);
    }

    #[test]
    fn test_record_split_across_completions() {
        // One 16-byte record, then a record split down the middle, then a
        // 24-byte record.
        let a = record(rtype::MBP_0, 1, 16);
        let b = record(rtype::MBP_0, 2, 16);
        let c = record(rtype::MBP_0, 3, 24);
        let mut first = a.clone();
        first.extend_from_slice(&b[..8]);
        let mut second = b[8..].to_vec();
        second.extend_from_slice(&c);

        let mut target = reader([Step::Data(first), Step::Data(second)]);
        let mut ids = Vec::new();
        assert_eq!(target.read(|rec| ids.push(rec.header().instrument_id)).unwrap(), 1);
        assert_eq!(target.leftover_len(), 8);
        assert_eq!(target.read(|rec| ids.push(rec.header().instrument_id)).unwrap(), 2);
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!(target.leftover_len(), 0);
    }

    #[rstest]
    #[case::within_first_header(8)]
    #[case::at_record_boundary(16)]
    #[case::mid_second_record(35)]
    #[case::one_byte_short(39)]
    fn test_arbitrary_split_points_yield_same_records(#[case] split: usize) {
        let mut stream = record(rtype::MBP_0, 10, 16);
        stream.extend(record(rtype::MBP_0, 11, 24));
        assert_eq!(stream.len(), 40);
        let (first, second) = stream.split_at(split);
        let mut target = reader([Step::Data(first.to_vec()), Step::Data(second.to_vec())]);
        let ids = drain(&mut target, 2);
        assert_eq!(ids, [10, 11]);
        assert_eq!(target.leftover_len(), 0);
    }

    #[test]
    fn test_mid_record_split_leftover_accounting() {
        let mut stream = record(rtype::MBP_0, 1, 16);
        stream.extend(record(rtype::MBP_0, 2, 24));
        // Cut 5 bytes into the second record.
        let mut target = reader([Step::Data(stream[..21].to_vec())]);
        let count = target.read(|_| {}).unwrap();
        assert_eq!(count, 1);
        assert_eq!(target.leftover_len(), 5);
    }

    #[test]
    fn test_bad_record_length_fails_without_dispatch() {
        // rlength of 3 encodes a 12-byte record, below the header size.
        let mut bytes = record(rtype::SYSTEM, 1, 16);
        bytes[0] = 3;
        let mut target = reader([Step::Data(bytes)]);
        let mut dispatched = 0;
        let res = target.read(|_| dispatched += 1);
        assert!(matches!(res, Err(Error::Decode(msg)) if msg.contains("12")));
        assert_eq!(dispatched, 0);
    }

    #[test]
    fn test_interrupt_is_not_an_error() {
        let mut target = reader([Step::Interrupt, Step::Data(record(rtype::SYSTEM, 1, 80))]);
        assert_eq!(target.read(|_| {}).unwrap(), 0);
        assert_eq!(target.read(|_| {}).unwrap(), 1);
    }

    #[test]
    fn test_peer_close() {
        let mut target = reader([Step::Close]);
        assert!(matches!(target.read(|_| {}), Err(Error::PeerClosed)));
    }

    #[test]
    fn test_transport_error() {
        let mut target = reader([Step::Errno(104)]);
        assert!(matches!(
            target.read(|_| {}),
            Err(Error::Io { source, .. })
                if source.raw_os_error() == Some(104)
        ));
    }

    #[test]
    fn test_each_read_reposts_its_buffer() {
        let steps: Vec<Step> = (0..4)
            .map(|i| Step::Data(record(rtype::SYSTEM, i, 16)))
            .collect();
        let mut target = reader(steps);
        assert_eq!(target.queue.num_posts, 2);
        drain(&mut target, 4);
        // Two initial posts plus one re-post per completed read.
        assert_eq!(target.queue.num_posts, 6);
    }

    #[test]
    fn test_alternating_buffers_preserve_order() {
        let steps: Vec<Step> = (0..6)
            .map(|i| Step::Data(record(rtype::SYSTEM, i, 16)))
            .collect();
        let mut target = reader(steps);
        let ids = drain(&mut target, 6);
        assert_eq!(ids, [0, 1, 2, 3, 4, 5]);
    }
}
