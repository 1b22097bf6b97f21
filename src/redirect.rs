//! Redirection target vocabulary.
//!
//! The same vocabulary applies to all three standard streams: absence of a
//! target means the stream is inherited from the caller, an explicit null
//! binds it to the platform null device, and the remaining variants cover
//! files, open handles, in-memory buffers, record sinks, and callbacks.
//!
//! Targets are held behind `Arc` so a [`Callable`](crate::callable::Callable)
//! stays immutable and cheaply shareable after construction; mutation happens
//! only inside caller-owned buffers and callbacks.

use crate::records::split_records;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared string buffer used as a redirect target.
pub type SharedBuffer = Arc<Mutex<String>>;

/// Shared record sink used as an output redirect target.
pub type SharedRecords = Arc<Mutex<Vec<String>>>;

/// Shared writer used as a `show_cmd` sink.
pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Per-record output callback.
pub type RecordConsumer = Arc<Mutex<dyn FnMut(&str) + Send>>;

/// Input-producing callback: called repeatedly until it returns `None`.
pub type RecordProducer = Arc<Mutex<dyn FnMut() -> Option<String> + Send>>;

/// Lock a shared target, recovering from a poisoned mutex.
///
/// A panicking output callback must not wedge every later invocation
/// that shares the target.
pub(crate) fn lock_target<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Redirect target for the child's stdin.
#[derive(Clone)]
pub enum InputTarget {
    /// Bind stdin to the null device.
    Null,
    /// Read stdin from a file.
    File(std::path::PathBuf),
    /// Read stdin from an already-open handle.
    Handle(Arc<File>),
    /// Feed stdin from a string buffer. No line endings are added.
    Buffer(SharedBuffer),
    /// Pull records from a callback until it returns `None`.
    ///
    /// Records are fed verbatim, with no separators inserted.
    Producer(RecordProducer),
}

impl InputTarget {
    /// Wrap a closure as a stdin record producer.
    pub fn producer(f: impl FnMut() -> Option<String> + Send + 'static) -> Self {
        InputTarget::Producer(Arc::new(Mutex::new(f)))
    }
}

impl fmt::Debug for InputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputTarget::Null => f.write_str("Null"),
            InputTarget::File(path) => f.debug_tuple("File").field(path).finish(),
            InputTarget::Handle(_) => f.write_str("Handle(..)"),
            InputTarget::Buffer(_) => f.write_str("Buffer(..)"),
            InputTarget::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Redirect target for the child's stdout or stderr.
#[derive(Clone)]
pub enum OutputTarget {
    /// Write the stream to a file (honors the `append_*` options).
    File(std::path::PathBuf),
    /// Write the stream to an already-open handle.
    Handle(Arc<File>),
    /// Collect the stream into a string buffer.
    Buffer(SharedBuffer),
    /// Collect the stream as discrete records split on the record separator.
    Records(SharedRecords),
    /// Invoke a callback once per record produced.
    Consumer(RecordConsumer),
}

impl OutputTarget {
    /// Wrap a closure as a per-record output consumer.
    pub fn consumer(f: impl FnMut(&str) + Send + 'static) -> Self {
        OutputTarget::Consumer(Arc::new(Mutex::new(f)))
    }

    /// True if this target needs the stream captured in-process
    /// (rather than wired directly to a file descriptor).
    pub(crate) fn needs_capture(&self) -> bool {
        matches!(
            self,
            OutputTarget::Buffer(_) | OutputTarget::Records(_) | OutputTarget::Consumer(_)
        )
    }

    /// Deliver captured text to an in-process target.
    ///
    /// `sep` is the effective record separator; `None` means slurp mode
    /// (the whole capture forms a single record).
    pub(crate) fn deliver(&self, text: &str, sep: Option<&str>) {
        match self {
            OutputTarget::File(_) | OutputTarget::Handle(_) => {
                // Wired directly at spawn time; nothing captured to deliver.
            }
            OutputTarget::Buffer(buf) => {
                lock_target(buf).push_str(text);
            }
            OutputTarget::Records(records) => {
                let mut records = lock_target(records);
                for record in records_of(text, sep) {
                    records.push(record);
                }
            }
            OutputTarget::Consumer(callback) => {
                let mut callback = lock_target(callback);
                for record in records_of(text, sep) {
                    callback(&record);
                }
            }
        }
    }
}

impl fmt::Debug for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::File(path) => f.debug_tuple("File").field(path).finish(),
            OutputTarget::Handle(_) => f.write_str("Handle(..)"),
            OutputTarget::Buffer(_) => f.write_str("Buffer(..)"),
            OutputTarget::Records(_) => f.write_str("Records(..)"),
            OutputTarget::Consumer(_) => f.write_str("Consumer(..)"),
        }
    }
}

fn records_of(text: &str, sep: Option<&str>) -> Vec<String> {
    match sep {
        Some(sep) => split_records(text, sep),
        None if text.is_empty() => Vec::new(),
        None => vec![text.to_string()],
    }
}

/// Collect stdin bytes from an [`InputTarget`] that is fed in-process.
///
/// Returns `None` for targets that are wired directly at spawn time.
pub(crate) fn collect_input(target: &InputTarget) -> Option<Vec<u8>> {
    match target {
        InputTarget::Null | InputTarget::File(_) | InputTarget::Handle(_) => None,
        InputTarget::Buffer(buf) => Some(lock_target(buf).as_bytes().to_vec()),
        InputTarget::Producer(callback) => {
            let mut callback = lock_target(callback);
            let mut bytes = Vec::new();
            while let Some(record) = callback() {
                bytes.extend_from_slice(record.as_bytes());
            }
            Some(bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(s: &str) -> SharedBuffer {
        Arc::new(Mutex::new(s.to_string()))
    }

    #[test]
    fn test_buffer_delivery_appends() {
        let buf = shared("seed:");
        let target = OutputTarget::Buffer(buf.clone());
        target.deliver("out\n", Some("\n"));
        assert_eq!(*lock_target(&buf), "seed:out\n");
    }

    #[test]
    fn test_records_delivery_splits() {
        let records: SharedRecords = Arc::new(Mutex::new(Vec::new()));
        let target = OutputTarget::Records(records.clone());
        target.deliver("a\nb\nc", Some("\n"));
        assert_eq!(*lock_target(&records), vec!["a\n", "b\n", "c"]);
    }

    #[test]
    fn test_consumer_called_per_record() {
        let seen: SharedRecords = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let target = OutputTarget::consumer(move |record| {
            lock_target(&sink).push(record.to_string());
        });
        target.deliver("x-y-", Some("-"));
        assert_eq!(*lock_target(&seen), vec!["x-", "y-"]);
    }

    #[test]
    fn test_slurp_delivery_single_record() {
        let records: SharedRecords = Arc::new(Mutex::new(Vec::new()));
        let target = OutputTarget::Records(records.clone());
        target.deliver("a\nb", None);
        assert_eq!(*lock_target(&records), vec!["a\nb"]);
    }

    #[test]
    fn test_collect_input_from_buffer() {
        let target = InputTarget::Buffer(shared("hello"));
        assert_eq!(collect_input(&target), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_collect_input_from_producer_until_none() {
        let mut remaining = vec!["a".to_string(), "b".to_string()];
        let target = InputTarget::producer(move || {
            if remaining.is_empty() {
                None
            } else {
                Some(remaining.remove(0))
            }
        });
        assert_eq!(collect_input(&target), Some(b"ab".to_vec()));
    }

    #[test]
    fn test_direct_targets_collect_nothing() {
        assert_eq!(collect_input(&InputTarget::Null), None);
        assert_eq!(
            collect_input(&InputTarget::File("/dev/null".into())),
            None
        );
    }
}
