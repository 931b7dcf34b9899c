//! Dictionary structures for the LZW coder.
//!
//! Both directions use flat arenas addressed by code, sized for the full
//! 12-bit code space, so a lookup never chases heap pointers. The forward
//! table maps byte strings to codes for the encoder; the reverse table maps
//! codes back to byte strings for the decoder.

/// The 12-bit code length bounds the dictionary to 4096 entries.
pub(crate) const MAX_CODES: usize = 4096;

const NO_CHILD: u16 = u16::MAX;

/// Outgoing edges of one trie node.
///
/// Most nodes have zero or one child, so the 256-slot table is only
/// allocated on the second divergent extension.
#[derive(Debug, Clone)]
enum Children {
    None,
    One(u8, u16),
    Many(Box<[u16; 256]>),
}

impl Children {
    fn get(&self, byte: u8) -> Option<u16> {
        match self {
            Children::None => None,
            Children::One(b, code) => (*b == byte).then_some(*code),
            Children::Many(codes) => {
                let code = codes[usize::from(byte)];
                (code != NO_CHILD).then_some(code)
            }
        }
    }

    fn set(&mut self, byte: u8, code: u16) {
        match self {
            Children::None => *self = Children::One(byte, code),
            Children::One(b, existing) => {
                let mut codes = Box::new([NO_CHILD; 256]);
                codes[usize::from(*b)] = *existing;
                codes[usize::from(byte)] = code;
                *self = Children::Many(codes);
            }
            Children::Many(codes) => codes[usize::from(byte)] = code,
        }
    }
}

/// Encoder dictionary: a trie over byte strings, one arena slot per code.
///
/// Codes are assigned by the caller; a slot is cleared when its code is
/// (re)defined, so stale children from a previous use of the code cannot
/// leak into lookups.
pub(crate) struct ForwardPrefixTable {
    root: Children,
    nodes: Vec<Children>,
}

impl ForwardPrefixTable {
    pub fn new() -> Self {
        Self {
            root: Children::None,
            nodes: vec![Children::None; MAX_CODES],
        }
    }

    /// Define `new_code` as the string of `parent` extended by `extra`,
    /// or the one-byte string `extra` when `parent` is `None`.
    pub fn add(&mut self, new_code: u16, parent: Option<u16>, extra: u8) {
        debug_assert!(usize::from(new_code) < MAX_CODES);
        self.nodes[usize::from(new_code)] = Children::None;
        match parent {
            Some(parent) => self.nodes[usize::from(parent)].set(extra, new_code),
            None => self.root.set(extra, new_code),
        }
    }

    /// Greedy longest-match lookup starting at `data[pos]`.
    ///
    /// Returns the code of the deepest known prefix and its length in
    /// bytes, or `(None, 0)` when even the first byte is unknown.
    pub fn find(&self, data: &[u8], pos: usize) -> (Option<u16>, usize) {
        let mut children = &self.root;
        let mut found = None;
        let mut length = 0;
        while pos + length < data.len() {
            match children.get(data[pos + length]) {
                Some(code) => {
                    found = Some(code);
                    length += 1;
                    children = &self.nodes[usize::from(code)];
                }
                None => break,
            }
        }
        (found, length)
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    parent: Option<u16>,
    byte: u8,
    len: u16,
    first: u8,
}

/// Decoder dictionary: per-code `(parent, byte)` records, resolved lazily.
///
/// A string is materialized only when looked up, by walking the parent
/// chain back-to-front into a scratch buffer. Chains are bounded by
/// [`MAX_CODES`] so the buffer never reallocates.
pub(crate) struct ReversePrefixTable {
    entries: Vec<Option<Entry>>,
    buffer: Box<[u8; MAX_CODES]>,
}

impl ReversePrefixTable {
    pub fn new() -> Self {
        Self {
            entries: vec![None; MAX_CODES],
            buffer: Box::new([0; MAX_CODES]),
        }
    }

    /// Define `code` as the one-byte string `byte`.
    pub fn add_root(&mut self, code: u16, byte: u8) {
        self.entries[usize::from(code)] = Some(Entry {
            parent: None,
            byte,
            len: 1,
            first: byte,
        });
    }

    /// Define `new_code` as the string of `parent` extended by `extra`.
    /// The parent must already be defined.
    pub fn add(&mut self, new_code: u16, parent: u16, extra: u8) {
        let parent_entry = self.entries[usize::from(parent)];
        debug_assert!(parent_entry.is_some(), "parent code must be defined");
        if let Some(parent_entry) = parent_entry {
            self.entries[usize::from(new_code)] = Some(Entry {
                parent: Some(parent),
                byte: extra,
                len: parent_entry.len + 1,
                first: parent_entry.first,
            });
        }
    }

    /// First byte of the string `code` resolves to, without materializing it.
    pub fn first_byte(&self, code: u16) -> Option<u8> {
        self.entries[usize::from(code)].map(|entry| entry.first)
    }

    /// Resolve `code` to its byte string, or `None` for an undefined code.
    pub fn find(&mut self, code: u16) -> Option<&[u8]> {
        let entry = self.entries[usize::from(code)]?;
        let len = usize::from(entry.len);
        let mut current = entry;
        let mut at = len;
        loop {
            at -= 1;
            self.buffer[at] = current.byte;
            match current.parent {
                Some(parent) => current = self.entries[usize::from(parent)]?,
                None => break,
            }
        }
        debug_assert_eq!(at, 0);
        Some(&self.buffer[..len])
    }
}
