//! Buffer content storage
//!
//! Content is an ordered run of characters with its length tracked in
//! characters, not bytes. Capacity checks and slice offsets are all
//! expressed in characters.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::ThreadMode;

#[derive(Debug, Default)]
struct Chars {
    text: String,
    len: usize,
}

impl Chars {
    fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
        self.len += s.chars().count();
    }

    fn clear(&mut self) {
        self.text.clear();
        self.len = 0;
    }

    fn take(&mut self) -> String {
        self.len = 0;
        std::mem::take(&mut self.text)
    }

    fn remove_range(&mut self, start: usize, count: usize) -> String {
        let from = byte_offset(&self.text, start);
        let to = byte_offset(&self.text, start.saturating_add(count));
        let removed: String = self.text.drain(from..to).collect();
        self.len -= removed.chars().count();
        removed
    }
}

#[derive(Debug)]
enum Storage {
    Local(Chars),
    Synchronized(Arc<Mutex<Chars>>),
}

/// Characters waiting to be emitted, owned by one output buffer
#[derive(Debug)]
pub struct BufferContent {
    storage: Storage,
}

impl BufferContent {
    pub fn new(mode: ThreadMode) -> Self {
        let storage = match mode {
            ThreadMode::Local => Storage::Local(Chars::default()),
            ThreadMode::Synchronized => Storage::Synchronized(Arc::new(Mutex::new(Chars::default()))),
        };
        Self { storage }
    }

    pub fn thread_mode(&self) -> ThreadMode {
        match self.storage {
            Storage::Local(_) => ThreadMode::Local,
            Storage::Synchronized(_) => ThreadMode::Synchronized,
        }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Local(chars) => chars.len,
            Storage::Synchronized(shared) => lock(shared).len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against the current content without copying it
    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        match &self.storage {
            Storage::Local(chars) => f(&chars.text),
            Storage::Synchronized(shared) => f(&lock(shared).text),
        }
    }

    /// Copy of the current content
    pub fn snapshot(&self) -> String {
        self.with_str(str::to_string)
    }

    pub(crate) fn push_str(&mut self, s: &str) {
        match &mut self.storage {
            Storage::Local(chars) => chars.push_str(s),
            Storage::Synchronized(shared) => lock(shared).push_str(s),
        }
    }

    pub(crate) fn clear(&mut self) {
        match &mut self.storage {
            Storage::Local(chars) => chars.clear(),
            Storage::Synchronized(shared) => lock(shared).clear(),
        }
    }

    /// Remove and return the whole content
    pub(crate) fn take(&mut self) -> String {
        match &mut self.storage {
            Storage::Local(chars) => chars.take(),
            Storage::Synchronized(shared) => lock(shared).take(),
        }
    }

    /// Remove `count` characters starting at character `start`.
    /// The range is clipped to the content.
    pub(crate) fn remove_range(&mut self, start: usize, count: usize) -> String {
        match &mut self.storage {
            Storage::Local(chars) => chars.remove_range(start, count),
            Storage::Synchronized(shared) => lock(shared).remove_range(start, count),
        }
    }

    /// Read-only handle for other threads; only synchronized content has one
    pub fn handle(&self) -> Option<ContentHandle> {
        match &self.storage {
            Storage::Local(_) => None,
            Storage::Synchronized(shared) => Some(ContentHandle {
                shared: Arc::clone(shared),
            }),
        }
    }
}

/// Shared read access to synchronized buffer content
#[derive(Debug, Clone)]
pub struct ContentHandle {
    shared: Arc<Mutex<Chars>>,
}

impl ContentHandle {
    /// Length in characters at the time of the call
    pub fn len(&self) -> usize {
        lock(&self.shared).len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the pending content
    pub fn snapshot(&self) -> String {
        lock(&self.shared).text.clone()
    }
}

/// A poisoned lock only means another thread panicked mid-append;
/// the string itself is always valid UTF-8.
fn lock(shared: &Mutex<Chars>) -> MutexGuard<'_, Chars> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Byte offset of character `index`, or the end of `s`
pub(crate) fn byte_offset(s: &str, index: usize) -> usize {
    s.char_indices().nth(index).map_or(s.len(), |(i, _)| i)
}

/// Split `s` after `chars` characters
pub(crate) fn split_chars(s: &str, chars: usize) -> (&str, &str) {
    s.split_at(byte_offset(s, chars))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_counts_chars() {
        let mut content = BufferContent::new(ThreadMode::Local);
        content.push_str("héllo");
        assert_eq!(content.len(), 5);
        content.push_str("中文");
        assert_eq!(content.len(), 7);
    }

    #[test]
    fn test_take_empties() {
        let mut content = BufferContent::new(ThreadMode::Local);
        content.push_str("abc");
        assert_eq!(content.take(), "abc");
        assert!(content.is_empty());
        assert_eq!(content.snapshot(), "");
    }

    #[test]
    fn test_remove_range_interior() {
        let mut content = BufferContent::new(ThreadMode::Local);
        content.push_str("0123456789");
        assert_eq!(content.remove_range(2, 3), "234");
        assert_eq!(content.snapshot(), "0156789");
        assert_eq!(content.len(), 7);
    }

    #[test]
    fn test_remove_range_clipped() {
        let mut content = BufferContent::new(ThreadMode::Local);
        content.push_str("añb");
        assert_eq!(content.remove_range(1, 10), "ñb");
        assert_eq!(content.snapshot(), "a");
    }

    #[test]
    fn test_synchronized_handle_sees_appends() {
        let mut content = BufferContent::new(ThreadMode::Synchronized);
        let handle = content.handle().unwrap();
        content.push_str("abc");
        assert_eq!(handle.len(), 3);
        assert_eq!(handle.snapshot(), "abc");

        let reader = std::thread::spawn(move || handle.snapshot());
        assert_eq!(reader.join().unwrap(), "abc");

        content.clear();
        assert!(content.is_empty());
    }

    #[test]
    fn test_local_has_no_handle() {
        let content = BufferContent::new(ThreadMode::Local);
        assert!(content.handle().is_none());
        assert_eq!(content.thread_mode(), ThreadMode::Local);
    }

    #[test]
    fn test_split_chars() {
        assert_eq!(split_chars("héllo", 2), ("hé", "llo"));
        assert_eq!(split_chars("abc", 5), ("abc", ""));
        assert_eq!(split_chars("abc", 0), ("", "abc"));
    }
}
