use crate::indexing::InputIndexer;

#[derive(Debug, Copy, Clone)]
pub struct Forward;

#[derive(Debug, Copy, Clone)]
pub struct Backward;

pub trait Direction: core::fmt::Debug + Copy + Clone {
    const FORWARD: bool;
    fn new() -> Self;
}

impl Direction for Forward {
    const FORWARD: bool = true;
    #[inline(always)]
    fn new() -> Self {
        Forward {}
    }
}

impl Direction for Backward {
    const FORWARD: bool = false;
    #[inline(always)]
    fn new() -> Self {
        Backward {}
    }
}

/// \return whether we match some literal bytes.
/// If so, update the position. If not, the position is unchanged.
#[inline(always)]
pub fn try_match_lit<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    _dir: Dir,
    pos: &mut usize,
    bytes: &[u8],
) -> bool {
    let contents = input.contents();
    if Dir::FORWARD {
        let end = *pos + bytes.len();
        if contents.get(*pos..end) == Some(bytes) {
            *pos = end;
            return true;
        }
    } else if *pos >= bytes.len() {
        let start = *pos - bytes.len();
        if &contents[start..*pos] == bytes {
            *pos = start;
            return true;
        }
    }
    false
}

/// \return whether a failed literal match ran out of subject: the rest of
/// the subject in the match direction is a proper prefix of \p bytes.
#[inline]
pub fn lit_hits_end<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    _dir: Dir,
    pos: usize,
    bytes: &[u8],
) -> bool {
    let contents = input.contents();
    if !Dir::FORWARD || pos > contents.len() {
        return false;
    }
    let rest = &contents[pos..];
    rest.len() < bytes.len() && bytes.starts_with(rest)
}

/// \return the next character, updating the position.
#[inline(always)]
pub fn next<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    _dir: Dir,
    pos: &mut usize,
) -> Option<u32> {
    if Dir::FORWARD {
        input.next_right(pos)
    } else {
        input.next_left(pos)
    }
}

/// \return whether the subject at \p pos matches the subject range
/// [start, end), moving \p pos past it.
#[inline]
pub fn subrange_eq<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    dir: Dir,
    pos: &mut usize,
    start: usize,
    end: usize,
) -> bool {
    let contents = input.contents();
    let copy = &contents[start..end];
    try_match_lit(input, dir, pos, copy)
}
