use core::fmt;
use memchr::memmem;

/// Facilities for searching bytes.
pub trait ByteSearcher {
    /// Search for ourselves in a slice of bytes.
    /// The length of the slice is unspecified and may be 0.
    /// \return the next index of ourselves in the slice, or None.
    fn find_in(&self, rhs: &[u8]) -> Option<usize>;
}

/// A literal byte string, searched with memchr's substring finder.
#[derive(Clone)]
pub struct LiteralSearcher {
    finder: memmem::Finder<'static>,
}

impl LiteralSearcher {
    pub fn new(bytes: &[u8]) -> LiteralSearcher {
        LiteralSearcher {
            finder: memmem::Finder::new(bytes).into_owned(),
        }
    }

    pub fn needle(&self) -> &[u8] {
        self.finder.needle()
    }
}

impl ByteSearcher for LiteralSearcher {
    #[inline(always)]
    fn find_in(&self, rhs: &[u8]) -> Option<usize> {
        match self.finder.needle() {
            [] => Some(0),
            [b] => memchr::memchr(*b, rhs),
            _ => self.finder.find(rhs),
        }
    }
}

impl fmt::Debug for LiteralSearcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Literal({:?})", self.needle())
    }
}

/// Up to three alternative bytes, searched with memchr2/memchr3.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ByteAlternatives {
    One(u8),
    Two(u8, u8),
    Three(u8, u8, u8),
}

impl ByteAlternatives {
    /// \return alternatives for the given bytes, or None if there are too many
    /// or none.
    pub fn new(bytes: &[u8]) -> Option<ByteAlternatives> {
        match *bytes {
            [a] => Some(ByteAlternatives::One(a)),
            [a, b] => Some(ByteAlternatives::Two(a, b)),
            [a, b, c] => Some(ByteAlternatives::Three(a, b, c)),
            _ => None,
        }
    }
}

impl ByteSearcher for ByteAlternatives {
    #[inline(always)]
    fn find_in(&self, rhs: &[u8]) -> Option<usize> {
        match *self {
            ByteAlternatives::One(a) => memchr::memchr(a, rhs),
            ByteAlternatives::Two(a, b) => memchr::memchr2(a, b, rhs),
            ByteAlternatives::Three(a, b, c) => memchr::memchr3(a, b, c, rhs),
        }
    }
}

/// A helper function for formatting bitmaps, using - ranges.
fn format_bitmap<Func>(name: &str, f: &mut fmt::Formatter<'_>, contains: Func) -> fmt::Result
where
    Func: Fn(u8) -> bool,
{
    write!(f, "{}[", name)?;
    let mut sep = "";
    let mut idx: usize = 0;
    while idx < 256 {
        if !contains(idx as u8) {
            idx += 1;
            continue;
        }
        let mut end = idx;
        while end + 1 < 256 && contains((end + 1) as u8) {
            end += 1;
        }
        if end == idx {
            write!(f, "{}{}", sep, idx)?;
        } else {
            write!(f, "{}{}-{}", sep, idx, end)?;
        }
        sep = " ";
        idx = end + 1;
    }
    write!(f, "]")
}

/// A bitmap covering ASCII characters.
#[derive(Default, Copy, Clone, PartialEq, Eq)]
pub struct AsciiBitmap(u128);

impl AsciiBitmap {
    #[inline(always)]
    pub fn set(&mut self, val: u8) {
        debug_assert!(val <= 127, "Value should be ASCII");
        self.0 |= 1u128 << val;
    }

    /// \return whether this bitmap contains a given value.
    /// The value does NOT have to be ASCII.
    #[inline(always)]
    pub fn contains(&self, val: u32) -> bool {
        val < 128 && (self.0 >> val) & 1 != 0
    }
}

impl fmt::Debug for AsciiBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_bitmap("AsciiBitmap", f, |v| self.contains(v as u32))
    }
}

/// A bitmap covering all bytes.
#[derive(Default, Copy, Clone, PartialEq, Eq)]
pub struct ByteBitmap([u64; 4]);

impl ByteBitmap {
    /// Construct from a sequence of bytes.
    pub fn new(bytes: &[u8]) -> ByteBitmap {
        let mut bb = ByteBitmap::default();
        for &b in bytes {
            bb.set(b)
        }
        bb
    }

    #[inline(always)]
    pub fn contains(&self, val: u8) -> bool {
        (self.0[(val >> 6) as usize] >> (val & 63)) & 1 != 0
    }

    #[inline(always)]
    pub fn set(&mut self, val: u8) {
        self.0[(val >> 6) as usize] |= 1 << (val & 63);
    }

    /// Update ourselves from another bitmap, in place.
    pub fn bitor(&mut self, rhs: &ByteBitmap) {
        for (lhs, rhs) in self.0.iter_mut().zip(rhs.0.iter()) {
            *lhs |= *rhs;
        }
    }

    /// Invert our bits, in place.
    pub fn bitnot(&mut self) -> &mut Self {
        for val in self.0.iter_mut() {
            *val = !*val;
        }
        self
    }

    pub fn count_bits(&self) -> u32 {
        self.0.iter().map(|v| v.count_ones()).sum()
    }

    pub fn is_full(&self) -> bool {
        self.0.iter().all(|&v| v == u64::MAX)
    }

    /// \return all set bytes, as a vec.
    #[allow(clippy::wrong_self_convention)]
    pub fn to_vec(&self) -> Vec<u8> {
        (0..=255).filter(|b| self.contains(*b)).collect()
    }
}

impl ByteSearcher for ByteBitmap {
    #[inline(always)]
    fn find_in(&self, bytes: &[u8]) -> Option<usize> {
        bytes.iter().position(|&b| self.contains(b))
    }
}

impl fmt::Debug for ByteBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_bitmap("ByteBitmap", f, |v| self.contains(v))
    }
}
