use crate::codepointset::{CodePointSet, Interval};
use smallvec::SmallVec;

// Simple (single code point) case folding.
// In UTF mode folding goes through the standard library's Unicode case
// mappings; in byte mode only ASCII letters fold.

/// Blocks which contain every code point with a simple case mapping.
const CASED_BLOCKS: [Interval; 17] = [
    Interval::new(0x0041, 0x058F),
    Interval::new(0x10A0, 0x10FF),
    Interval::new(0x13A0, 0x13FF),
    Interval::new(0x1C80, 0x1CBF),
    Interval::new(0x1E00, 0x1FFF),
    Interval::new(0x2100, 0x218F),
    Interval::new(0x24B6, 0x24E9),
    Interval::new(0x2C00, 0x2D2F),
    Interval::new(0xA640, 0xA7FF),
    Interval::new(0xAB70, 0xABBF),
    Interval::new(0xFF21, 0xFF5A),
    Interval::new(0x10400, 0x104FF),
    Interval::new(0x10570, 0x105BF),
    Interval::new(0x10C80, 0x10CFF),
    Interval::new(0x118A0, 0x118DF),
    Interval::new(0x16E40, 0x16E7F),
    Interval::new(0x1E900, 0x1E94F),
];

fn single_lower(c: char) -> char {
    let mut it = c.to_lowercase();
    match (it.next(), it.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn single_upper(c: char) -> char {
    let mut it = c.to_uppercase();
    match (it.next(), it.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Fold a code point. Two code points match caselessly iff their folds are
/// equal.
#[inline]
pub fn fold(cp: u32, utf: bool) -> u32 {
    if cp < 0x80 || !utf {
        return if (b'A' as u32..=b'Z' as u32).contains(&cp) {
            cp + 0x20
        } else {
            cp
        };
    }
    match char::from_u32(cp) {
        // Upper then lower, so that final sigma and long s join their class.
        Some(c) => single_lower(single_upper(c)) as u32,
        None => cp,
    }
}

/// \return every code point which folds to the same value as \p cp,
/// including \p cp itself, sorted.
pub fn case_variants(cp: u32, utf: bool) -> SmallVec<[u32; 4]> {
    let target = fold(cp, utf);
    let mut res: SmallVec<[u32; 4]> = SmallVec::new();
    let ascii_simple = !utf || (cp < 0x80 && !matches!(target, 0x6B | 0x73));
    if ascii_simple {
        res.push(cp);
        if target != cp {
            res.push(target);
        } else if (b'a' as u32..=b'z' as u32).contains(&cp) {
            res.push(cp - 0x20);
        }
    } else {
        res.push(cp);
        res.push(target);
        for block in CASED_BLOCKS.iter() {
            for other in block.first..=block.last {
                if fold(other, true) == target {
                    res.push(other);
                }
            }
        }
    }
    res.sort_unstable();
    res.dedup();
    res
}

/// \return the set closed under case folding: every code point whose fold
/// equals the fold of some member.
pub fn fold_code_points(input: &CodePointSet, utf: bool) -> CodePointSet {
    let mut res = input.clone();
    if !utf {
        for iv in input.intervals() {
            for cp in iv.first..=iv.last.min(0x7F) {
                for v in case_variants(cp, false) {
                    res.add_one(v);
                }
            }
        }
        return res;
    }
    // Collect the folds of every cased member.
    let mut targets = CodePointSet::new();
    for block in CASED_BLOCKS.iter() {
        for iv in input.intervals() {
            if !iv.overlaps(*block) {
                continue;
            }
            for cp in iv.first.max(block.first)..=iv.last.min(block.last) {
                targets.add_one(fold(cp, true));
            }
        }
    }
    res.add_set(&targets);
    for block in CASED_BLOCKS.iter() {
        for cp in block.first..=block.last {
            if !res.contains(cp) && targets.contains(fold(cp, true)) {
                res.add_one(cp);
            }
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folding_is_symmetric() {
        assert_eq!(fold('A' as u32, true), 'a' as u32);
        assert_eq!(fold('a' as u32, false), 'a' as u32);
        assert_eq!(fold(0xC9, true), 0xE9);
        // Byte mode does not fold Latin-1.
        assert_eq!(fold(0xC9, false), 0xC9);
        // Kelvin sign folds to k.
        assert_eq!(fold(0x212A, true), 'k' as u32);
        // Final sigma joins sigma.
        assert_eq!(fold(0x3C2, true), fold(0x3A3, true));
    }

    #[test]
    fn variants() {
        assert_eq!(case_variants('x' as u32, true).as_slice(), &['X' as u32, 'x' as u32]);
        assert_eq!(
            case_variants('k' as u32, true).as_slice(),
            &['K' as u32, 'k' as u32, 0x212A]
        );
        assert_eq!(case_variants('k' as u32, false).as_slice(), &['K' as u32, 'k' as u32]);
        assert_eq!(case_variants('7' as u32, true).as_slice(), &['7' as u32]);
    }

    #[test]
    fn closure_of_sets() {
        let set = CodePointSet::from_intervals([Interval::new('a' as u32, 'c' as u32)]);
        let folded = fold_code_points(&set, false);
        assert_eq!(
            folded.intervals(),
            &[
                Interval::new('A' as u32, 'C' as u32),
                Interval::new('a' as u32, 'c' as u32)
            ]
        );
        let set = CodePointSet::from_intervals([Interval::new('K' as u32, 'K' as u32)]);
        let folded = fold_code_points(&set, true);
        assert!(folded.contains('k' as u32) && folded.contains(0x212A));
    }
}
