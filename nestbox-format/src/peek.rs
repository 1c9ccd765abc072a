use std::io::{self, Chain, Cursor, Read};

/// A stream whose first bytes were read ahead and are replayed in front of
/// the rest, so readers still see it from byte 0.
pub(crate) struct Rewound<'a> {
    inner: Chain<Cursor<Vec<u8>>, &'a mut dyn Read>,
}

impl<'a> Rewound<'a> {
    /// Reads up to `len` bytes ahead. Shorter streams are peeked whole.
    pub(crate) fn new(stream: &'a mut dyn Read, len: usize) -> io::Result<Self> {
        let mut header = Vec::with_capacity(len);
        Read::take(&mut *stream, len as u64).read_to_end(&mut header)?;

        Ok(Rewound {
            inner: Cursor::new(header).chain(stream),
        })
    }

    /// The peeked bytes. Only meaningful before reading begins.
    pub(crate) fn header(&self) -> &[u8] {
        self.inner.get_ref().0.get_ref()
    }
}

impl Read for Rewound<'_> {
    #[inline(always)]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
