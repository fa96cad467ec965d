//! Support for quickly finding potential match locations.
use crate::bytesearch::{ByteAlternatives, ByteBitmap, LiteralSearcher};
use crate::codepointset::CodePointSet;
use crate::insn::StartPredicate;
use crate::ir;
use crate::ir::{AnchorType, Node};
use crate::options::{directive_enabled, OptimizationDirective};
use crate::util::{add_first_bytes_to_bitmap, utf8_first_byte};

/// \return the anchor which every match of \p n begins with, if any.
fn leading_anchor(n: &Node) -> Option<AnchorType> {
    match n {
        Node::Anchor(anchor) => Some(*anchor),
        // For concatenation, check the first node which is not a callout or mark.
        Node::Cat(nodes) => nodes
            .iter()
            .find(|nn| !matches!(nn, Node::Callout(..) | Node::Mark(..)))
            .and_then(leading_anchor),
        Node::CaptureGroup(child, ..)
        | Node::NamedCaptureGroup(child, ..)
        | Node::Atomic {
            contents: child, ..
        } => leading_anchor(child),
        Node::Alt(left, right) => match (leading_anchor(left), leading_anchor(right)) {
            (Some(l), Some(r)) if l == r => Some(l),
            _ => None,
        },
        // Other nodes are not anchored
        _ => None,
    }
}

/// \return the leading node of \p n, looking through cats.
fn leading_node(n: &Node) -> &Node {
    match n {
        Node::Cat(nodes) => match nodes.first() {
            Some(first) => leading_node(first),
            None => n,
        },
        _ => n,
    }
}

/// Convert the code point set to a first-byte bitmap.
/// That is, make a list of all of the possible first bytes of every contained
/// code point, and store that in a bitmap.
fn cps_to_first_byte_bitmap(input: &CodePointSet, utf: bool) -> ByteBitmap {
    let mut bitmap = ByteBitmap::default();
    for iv in input.intervals() {
        add_first_bytes_to_bitmap(*iv, utf, &mut bitmap);
    }
    bitmap
}

/// The "IR" for a start predicate.
enum AbstractStartPredicate {
    /// No predicate.
    Arbitrary,

    /// Sequence of non-empty bytes.
    Sequence(Vec<u8>),

    /// Set of bytes.
    Set(ByteBitmap),
}

impl AbstractStartPredicate {
    /// \return the disjunction of two predicates.
    /// That is, a predicate that matches x OR y.
    fn disjunction(x: Self, y: Self) -> Self {
        match (x, y) {
            (Self::Arbitrary, _) => Self::Arbitrary,
            (_, Self::Arbitrary) => Self::Arbitrary,

            (Self::Sequence(mut s1), Self::Sequence(s2)) => {
                // Compute the length of the shared prefix.
                let shared_len = s1.iter().zip(s2.iter()).take_while(|(a, b)| a == b).count();
                if shared_len > 0 {
                    // Use the shared prefix.
                    s1.truncate(shared_len);
                    Self::Sequence(s1)
                } else {
                    // Use a set of their first byte.
                    Self::Set(ByteBitmap::new(&[s1[0], s2[0]]))
                }
            }

            (Self::Set(mut s1), Self::Set(s2)) => {
                s1.bitor(&s2);
                Self::Set(s1)
            }

            (Self::Set(mut s1), Self::Sequence(s2)) => {
                // Add first byte to set.
                s1.set(s2[0]);
                Self::Set(s1)
            }

            (Self::Sequence(s1), Self::Set(mut s2)) => {
                s2.set(s1[0]);
                Self::Set(s2)
            }
        }
    }

    /// Resolve ourselves to a concrete start predicate.
    fn resolve_to_insn(self) -> StartPredicate {
        match self {
            Self::Arbitrary => StartPredicate::Arbitrary,
            Self::Sequence(vals) => match vals.len() {
                0 => StartPredicate::Arbitrary,
                1 => ByteAlternatives::new(&vals)
                    .map_or(StartPredicate::Arbitrary, StartPredicate::Alternatives),
                _ => StartPredicate::Literal(LiteralSearcher::new(&vals)),
            },
            Self::Set(bm) => {
                if bm.count_bits() == 0 || bm.is_full() {
                    return StartPredicate::Arbitrary;
                }
                match ByteAlternatives::new(&bm.to_vec()) {
                    Some(alts) => StartPredicate::Alternatives(alts),
                    None => StartPredicate::Bitmap(bm),
                }
            }
        }
    }
}

/// Compute any start-predicate for a node.
/// If this returns None, then the instruction is conceptually zero-width (e.g.
/// lookahead assertion) and does not contribute to the predicate.
/// If this returns StartPredicate::Arbitrary, then there is no predicate.
fn compute_start_predicate(n: &Node, utf: bool) -> Option<AbstractStartPredicate> {
    let arbitrary = Some(AbstractStartPredicate::Arbitrary);
    match n {
        Node::ByteSequence(bytevec) => Some(AbstractStartPredicate::Sequence(bytevec.clone())),
        Node::ByteSet(bytes) => Some(AbstractStartPredicate::Set(ByteBitmap::new(bytes))),

        Node::Empty => arbitrary,
        Node::Goal => arbitrary,
        Node::BackRef { .. } | Node::NamedBackRef { .. } => arbitrary,

        Node::CharSet(chars) => {
            // Pick the first bytes out.
            let bytes = chars
                .iter()
                .map(|&c| if utf { utf8_first_byte(c) } else { c as u8 })
                .collect::<Vec<_>>();
            Some(AbstractStartPredicate::Set(ByteBitmap::new(&bytes)))
        }

        // We assume that most char nodes have been optimized to byte sequences.
        Node::Char { .. } => arbitrary,

        // Cats return the first non-None value, if any.
        Node::Cat(nodes) => nodes
            .iter()
            .filter_map(|n| compute_start_predicate(n, utf))
            .next(),

        // MatchAny (aka .) is too common to do a fast prefix search for.
        Node::MatchAny | Node::MatchAnyExceptNewline | Node::LineBreak => arbitrary,

        Node::Anchor(..) => arbitrary,
        Node::WordBoundary { .. } => arbitrary,

        // Groups delegate to their contents.
        Node::CaptureGroup(child, ..)
        | Node::NamedCaptureGroup(child, ..)
        | Node::Atomic {
            contents: child, ..
        } => compute_start_predicate(child, utf),

        // Zero-width things impose no start predicate. Skipped start positions
        // never reach their callouts.
        Node::LookaroundAssertion { .. } | Node::Callout(..) | Node::Mark(..) | Node::Commit => {
            None
        }

        Node::Loop { loopee, quant, .. } | Node::Loop1CharBody { loopee, quant, .. } => {
            if quant.min > 0 {
                compute_start_predicate(loopee, utf)
            } else {
                arbitrary
            }
        }

        // This one is interesting - we compute the disjunction of the predicates of our two arms.
        Node::Alt(left, right) => {
            if let (Some(x), Some(y)) = (
                compute_start_predicate(left, utf),
                compute_start_predicate(right, utf),
            ) {
                Some(AbstractStartPredicate::disjunction(x, y))
            } else {
                // This indicates that one of our branches could match the empty string.
                arbitrary
            }
        }

        // Brackets get a bitmap.
        Node::Bracket(bc) => Some(AbstractStartPredicate::Set(cps_to_first_byte_bitmap(
            &bc.positive_set(),
            utf,
        ))),
    }
}

/// \return the start predicate for a Regex.
/// An anchored pattern only ever needs trying at the search start, or at the
/// starts of lines.
pub fn predicate_for_re(re: &ir::Regex) -> StartPredicate {
    match leading_anchor(&re.node) {
        Some(AnchorType::SubjectStart | AnchorType::LineStart | AnchorType::SearchStart) => {
            return StartPredicate::StartAnchored
        }
        Some(AnchorType::MultilineStart) => return StartPredicate::AfterNewline,
        _ => {}
    }

    if !directive_enabled(&re.directives, OptimizationDirective::StartOptimize) {
        return StartPredicate::Arbitrary;
    }

    // A leading .* can only match at a line start, unless a backreference
    // could depend on where it started.
    if directive_enabled(&re.directives, OptimizationDirective::DotStarAnchor) && !re.has_backrefs
    {
        if let Node::Loop1CharBody { loopee, quant, .. } = leading_node(&re.node) {
            if quant.min == 0 && quant.max.is_none() {
                match **loopee {
                    Node::MatchAny => return StartPredicate::StartAnchored,
                    Node::MatchAnyExceptNewline => return StartPredicate::AfterNewline,
                    _ => {}
                }
            }
        }
    }

    compute_start_predicate(&re.node, re.utf)
        .unwrap_or(AbstractStartPredicate::Arbitrary)
        .resolve_to_insn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::optimize;
    use crate::options::CompileOptions;
    use crate::parse::try_parse;

    fn predicate(pattern: &str) -> StartPredicate {
        let mut re = match try_parse(pattern, &CompileOptions::default()) {
            Ok(re) => re,
            Err(err) => panic!("{:?}", err),
        };
        optimize(&mut re);
        predicate_for_re(&re)
    }

    #[test]
    fn literal_prefixes() {
        match predicate("abc|abd") {
            StartPredicate::Literal(lit) => assert_eq!(lit.needle(), b"ab"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            predicate("[xy]z"),
            StartPredicate::Alternatives(ByteAlternatives::Two(b'x', b'y'))
        ));
        assert!(matches!(predicate("a?b"), StartPredicate::Arbitrary));
    }

    #[test]
    fn anchors() {
        assert!(matches!(predicate("^abc"), StartPredicate::StartAnchored));
        assert!(matches!(predicate("(?m)^abc"), StartPredicate::AfterNewline));
        assert!(matches!(predicate(".*abc"), StartPredicate::AfterNewline));
        assert!(matches!(predicate("(?s).*abc"), StartPredicate::StartAnchored));
        assert!(matches!(predicate("(.*)\\1"), StartPredicate::Arbitrary));
        assert!(matches!(
            predicate("(*NO_DOTSTAR_ANCHOR).*a"),
            StartPredicate::Arbitrary
        ));
        assert!(matches!(
            predicate("(*NO_START_OPT)abc"),
            StartPredicate::Arbitrary
        ));
    }
}
