//! Optimizations on regex IR

use crate::codepointset::{CodePointSet, Interval, CODE_POINT_MAX};
use crate::folds;
use crate::insn::MAX_CHAR_SET_LENGTH;
use crate::ir::*;
use crate::options::{directive_enabled, OptimizationDirective};
use crate::types::BracketContents;
use crate::util::decode_utf8_right;

/// When unrolling a loop, the largest minimum count we will unroll.
const LOOP_UNROLL_THRESHOLD: usize = 5;

/// Things that a Pass may do.
pub enum PassAction {
    // Do nothing to the given node.
    Keep,

    // Notes that we modified the node in-place.
    Modified,

    // Remove the given node outright, effectively replacing it with empty.
    Remove,

    /// Replace the given node with a new Node.
    Replace(Node),
}

#[derive(Debug)]
struct Pass<'a, F>
where
    F: FnMut(&mut Node, &Walk) -> PassAction,
{
    // The function.
    func: &'a mut F,

    // Whether this pass has changed anything.
    changed: bool,

    // If the regex is in UTF-8 mode.
    utf: bool,
}

impl<'a, F> Pass<'a, F>
where
    F: FnMut(&mut Node, &Walk) -> PassAction,
{
    fn new(func: &'a mut F, utf: bool) -> Self {
        Pass {
            func,
            changed: false,
            utf,
        }
    }

    fn run_postorder(&mut self, start: &mut Node) {
        walk_mut(
            true,
            self.utf,
            start,
            &mut |n: &mut Node, walk: &mut Walk| match (self.func)(n, walk) {
                PassAction::Keep => {}
                PassAction::Modified => {
                    self.changed = true;
                }
                PassAction::Remove => {
                    *n = Node::Empty;
                    self.changed = true;
                }
                PassAction::Replace(newnode) => {
                    *n = newnode;
                    self.changed = true;
                }
            },
        )
    }

    fn run_to_fixpoint(&mut self, n: &mut Node) {
        debug_assert!(!self.changed, "Pass has already been run");
        loop {
            self.changed = false;
            self.run_postorder(n);
            if !self.changed {
                break;
            }
        }
    }
}

/// Run a "pass" on a regex, which is a function that takes a Node and maybe
/// returns a new node. \return true if something changed, false if nothing did.
fn run_pass<F>(r: &mut Regex, func: &mut F) -> bool
where
    F: FnMut(&mut Node, &Walk) -> PassAction,
{
    let mut p = Pass::new(func, r.utf);
    p.run_to_fixpoint(&mut r.node);
    p.changed
}

/// \return whether a node or any child invokes a callout or sets a mark.
/// Such nodes are observable even if they cannot match.
fn has_side_effects(node: &Node) -> bool {
    let mut found = false;
    walk(false, true, node, &mut |n, w| {
        if matches!(n, Node::Callout(..) | Node::Mark(..) | Node::Commit) {
            found = true;
        }
        w.skip_children = found;
    });
    found
}

// Here are some optimizations we support.

// Remove empty Nodes.
fn remove_empties(n: &mut Node, _w: &Walk) -> PassAction {
    match n {
        Node::ByteSequence(v) if v.is_empty() => PassAction::Remove,
        // Note: do not remove empty sets. These always match against one character; an empty set
        // should just fail.
        Node::Cat(nodes) => {
            let blen = nodes.len();
            nodes.retain(|nn| !nn.is_empty());
            if nodes.len() == blen {
                // Nothing was removed.
                PassAction::Keep
            } else {
                match nodes.pop() {
                    None => PassAction::Remove,
                    Some(last) if nodes.is_empty() => PassAction::Replace(last),
                    Some(last) => {
                        nodes.push(last);
                        PassAction::Modified
                    }
                }
            }
        }
        Node::Alt(left, right) => {
            // Empty alt may match the empty string.
            // Remove it only if both sides are empty.
            if left.is_empty() && right.is_empty() {
                PassAction::Remove
            } else {
                PassAction::Keep
            }
        }
        Node::Loop {
            quant,
            loopee,
            enclosed_groups,
        } => {
            // A loop is empty if it has an empty body, or 0 max iters.
            // But do not remove contained capture groups.
            if loopee.is_empty()
                || (quant.max == Some(0)
                    && enclosed_groups.start == enclosed_groups.end
                    && !has_side_effects(loopee))
            {
                PassAction::Remove
            } else {
                PassAction::Keep
            }
        }
        Node::LookaroundAssertion {
            negate, contents, ..
        } => {
            // Negative arounds that match empties could in principle be optimized to always
            // fail. Here we only optimize positive ones.
            if !*negate && contents.is_empty() {
                PassAction::Remove
            } else {
                PassAction::Keep
            }
        }
        Node::Atomic { contents, .. } if contents.is_empty() => PassAction::Remove,
        _ => PassAction::Keep,
    }
}

// If a node can never match, replace it with an always fails node.
fn propagate_early_fails(n: &mut Node, _w: &Walk) -> PassAction {
    // Don't optimize nodes containing capture groups to preserve user-visible group numbers,
    // nor nodes whose callouts would be skipped.
    if n.contains_capture_groups() || has_side_effects(n) {
        return PassAction::Keep;
    }

    match n {
        Node::Cat(nodes) => {
            // If any child is an early fail, we are an early fail.
            // Note this assumes that there is no node after a Goal node.
            if nodes.iter().any(|nn| nn.match_always_fails()) {
                PassAction::Replace(Node::make_always_fails())
            } else {
                PassAction::Keep
            }
        }
        Node::Alt(left, right) => {
            // If both sides are early fails, we are an early fail.
            let left_fails = left.match_always_fails();
            let right_fails = right.match_always_fails();
            match (left_fails, right_fails) {
                (true, true) => PassAction::Replace(Node::make_always_fails()),
                (false, false) => PassAction::Keep,
                (true, false) | (false, true) => {
                    // Here either our left or right node always fails.
                    // "Steal" the other and return it, replacing us.
                    let mut new_node = Node::Empty;
                    core::mem::swap(
                        &mut new_node,
                        if left_fails { &mut *right } else { &mut *left },
                    );
                    PassAction::Replace(new_node)
                }
            }
        }
        Node::Loop { loopee, quant, .. } => {
            // If the loop body always fails, we always fail.
            if quant.min > 0 && loopee.match_always_fails() {
                PassAction::Replace(Node::make_always_fails())
            } else {
                PassAction::Keep
            }
        }
        _ => PassAction::Keep,
    }
}

// Remove excess cats.
fn decat(n: &mut Node, _w: &Walk) -> PassAction {
    match n {
        Node::Cat(nodes) => {
            if nodes.len() <= 1 {
                match nodes.pop() {
                    None => PassAction::Remove,
                    Some(only) => PassAction::Replace(only),
                }
            } else if nodes.iter().any(|nn| nn.is_cat()) {
                // Flatmap child cats.
                // Avoid copying nodes by switching them into owned vec.
                let catted = core::mem::take(nodes);

                // Decat them.
                let mut decatted = Vec::new();
                for nn in catted {
                    match nn {
                        Node::Cat(mut nnodes) => {
                            decatted.append(&mut nnodes);
                        }
                        _ => decatted.push(nn),
                    }
                }
                PassAction::Replace(Node::Cat(decatted))
            } else {
                PassAction::Keep
            }
        }
        _ => PassAction::Keep,
    }
}

/// Unfold icase chars.
/// That means for case-insensitive characters, figure out everything that they
/// could match.
fn unfold_icase_chars(n: &mut Node, w: &Walk) -> PassAction {
    match *n {
        Node::Char { c, icase } if icase => {
            let unfolded = folds::case_variants(c, w.utf);
            debug_assert!(
                unfolded.contains(&c),
                "Char should always unfold to at least itself"
            );
            if unfolded.len() <= 1 {
                // Character does not fold or unfold at all.
                PassAction::Replace(Node::Char { c, icase: false })
            } else {
                PassAction::Replace(Node::CharSet(unfolded.into_vec()))
            }
        }
        _ => PassAction::Keep,
    }
}

// Perform simple unrolling of loops that have a minimum.
fn unroll_loops(n: &mut Node, _w: &Walk) -> PassAction {
    match n {
        Node::Loop {
            loopee,
            quant,
            enclosed_groups,
        } => {
            // Do not unroll loops with enclosed groups.
            if enclosed_groups.start < enclosed_groups.end {
                return PassAction::Keep;
            }
            // Do not unroll large loops, or loops which may execute zero times.
            if quant.min == 0 || quant.min > LOOP_UNROLL_THRESHOLD {
                return PassAction::Keep;
            }
            // Loops of single chars are better as 1Char loops.
            if loopee.matches_exactly_one_char() {
                return PassAction::Keep;
            }

            // We made it through. Replace us with a cat.
            let mut unrolled = Vec::new();
            for _ in 0..quant.min {
                let Some(node) = loopee.try_duplicate(0) else {
                    return PassAction::Keep;
                };
                unrolled.push(node);
            }

            // We unrolled 'min' elements.
            // Maybe our loop is now empty.
            quant.max = quant.max.map(|v| v - quant.min);
            quant.min = 0;
            if quant.max != Some(0) {
                // Move the loop to the end of unrolled.
                let loop_node = core::mem::replace(n, Node::Empty);
                unrolled.push(loop_node);
            }
            *n = Node::Cat(unrolled);
            PassAction::Modified
        }
        _ => PassAction::Keep,
    }
}

/// Replace Loops with 1Char loops whenever possible.
fn promote_1char_loops(n: &mut Node, _w: &Walk) -> PassAction {
    match n {
        Node::Loop {
            loopee,
            quant,
            enclosed_groups,
        } => {
            // Must be 1Char.
            if !loopee.matches_exactly_one_char() {
                return PassAction::Keep;
            }

            // The above check should be sufficient to ensure we have no enclosed groups.
            debug_assert!(
                enclosed_groups.start >= enclosed_groups.end,
                "Should have no enclosed groups"
            );

            let new_loopee = core::mem::replace(loopee, Box::new(Node::Empty));
            *n = Node::Loop1CharBody {
                loopee: new_loopee,
                quant: *quant,
                possessive: false,
            };
            PassAction::Modified
        }
        _ => PassAction::Keep,
    }
}

/// Simplify atomic groups whose contents cannot backtrack anyway, and make
/// a possessive 1Char loop of an atomic 1Char loop.
fn simplify_atomics(n: &mut Node, _w: &Walk) -> PassAction {
    match n {
        Node::Atomic {
            start_group,
            end_group,
            contents,
        } if start_group == end_group => {
            if contents.matches_exactly_one_char()
                || matches!(
                    **contents,
                    Node::ByteSequence(..) | Node::Anchor(..) | Node::WordBoundary { .. }
                )
            {
                let inner = core::mem::replace(&mut **contents, Node::Empty);
                return PassAction::Replace(inner);
            }
            match &mut **contents {
                Node::Loop1CharBody { loopee, quant, .. } if quant.greedy => {
                    let loopee = core::mem::replace(loopee, Box::new(Node::Empty));
                    PassAction::Replace(Node::Loop1CharBody {
                        loopee,
                        quant: *quant,
                        possessive: true,
                    })
                }
                _ => PassAction::Keep,
            }
        }
        _ => PassAction::Keep,
    }
}

/// \return the set of code points that a single-char node matches, or None
/// if it is not known.
fn single_char_set(n: &Node, utf: bool) -> Option<CodePointSet> {
    let mut set = CodePointSet::new();
    match n {
        &Node::Char { c, icase: false } => set.add_one(c),
        Node::CharSet(chars) => chars.iter().for_each(|&c| set.add_one(c)),
        Node::ByteSet(bytes) => bytes.iter().for_each(|&b| set.add_one(u32::from(b))),
        Node::Bracket(bc) => set = bc.positive_set(),
        Node::MatchAny | Node::MatchAnyExceptNewline => {
            set.add(Interval::new(0, CODE_POINT_MAX));
        }
        Node::ByteSequence(bytes) => {
            let first = if utf {
                decode_utf8_right(bytes, 0)?.0
            } else {
                u32::from(*bytes.first()?)
            };
            set.add_one(first);
        }
        _ => return None,
    }
    Some(set)
}

/// \return the first-char set of something which must consume at least one
/// char, or None if it is not known.
fn first_char_set(n: &Node, utf: bool) -> Option<CodePointSet> {
    match n {
        Node::Loop1CharBody { loopee, quant, .. } if quant.min > 0 => single_char_set(loopee, utf),
        Node::Cat(nodes) => first_char_set(nodes.first()?, utf),
        Node::CaptureGroup(contents, ..) | Node::NamedCaptureGroup(contents, ..) => {
            first_char_set(contents, utf)
        }
        Node::Alt(left, right) => {
            let mut set = first_char_set(left, utf)?;
            set.add_set(&first_char_set(right, utf)?);
            Some(set)
        }
        _ => single_char_set(n, utf),
    }
}

/// Make a greedy 1Char loop possessive when what follows it can never start
/// with a char the loop consumes, so giving chars back could never help.
fn auto_possessify(n: &mut Node, w: &Walk) -> PassAction {
    let Node::Cat(nodes) = n else {
        return PassAction::Keep;
    };
    let mut modified = false;
    for idx in 1..nodes.len() {
        let (prev, rest) = nodes.split_at_mut(idx);
        let Some(Node::Loop1CharBody {
            loopee,
            quant,
            possessive,
        }) = prev.last_mut()
        else {
            continue;
        };
        if *possessive || !quant.greedy {
            continue;
        }
        let (Some(body), Some(next)) = (
            single_char_set(loopee, w.utf),
            first_char_set(&rest[0], w.utf),
        ) else {
            continue;
        };
        if body.is_disjoint(&next) {
            *possessive = true;
            modified = true;
        }
    }
    if modified {
        PassAction::Modified
    } else {
        PassAction::Keep
    }
}

/// Replace Cat(Char) with ByteSeq.
/// Also replace chars with literal bytes.
fn form_literal_bytes(n: &mut Node, walk: &Walk) -> PassAction {
    // Helper to return a mutable reference to the nodes of a literal bytes.
    fn get_literal_bytes(n: &mut Node) -> Option<&mut Vec<u8>> {
        match n {
            Node::ByteSequence(v) => Some(v),
            _ => None,
        }
    }
    match n {
        Node::Char { c, icase } if !*icase => {
            if !walk.utf {
                // Byte mode chars are bytes.
                return match u8::try_from(*c) {
                    Ok(b) => PassAction::Replace(Node::ByteSequence(vec![b])),
                    Err(_) => PassAction::Keep,
                };
            }
            if let Some(c) = char::from_u32(*c) {
                let mut buff = [0; 4];
                PassAction::Replace(Node::ByteSequence(
                    c.encode_utf8(&mut buff).as_bytes().to_vec(),
                ))
            } else {
                PassAction::Keep
            }
        }
        Node::CharSet(chars) if chars.iter().all(|&c| c <= 0x7F || (!walk.utf && c <= 0xFF)) => {
            // All of our chars are single bytes; use a byte set instead.
            PassAction::Replace(Node::ByteSet(chars.iter().map(|&c| c as u8).collect()))
        }
        Node::Cat(nodes) => {
            // Find and merge adjacent ByteSeq.
            let mut modified = false;
            for idx in 1..nodes.len() {
                let (prev_slice, curr_slice) = nodes.split_at_mut(idx);
                let (Some(prev), Some(curr)) = (prev_slice.last_mut(), curr_slice.first_mut())
                else {
                    continue;
                };
                match (get_literal_bytes(prev), get_literal_bytes(curr)) {
                    (Some(prev_bytes), Some(curr_bytes))
                        if !prev_bytes.is_empty() && !curr_bytes.is_empty() =>
                    {
                        if walk.in_lookbehind {
                            // Our characters were already reversed; we need to reverse them again
                            // as literal bytes are always forwards. For
                            // example, if we have (<=ab), then we will get Cat(b, a) but we want
                            // literal bytes "ab".
                            curr_bytes.append(prev_bytes);
                        } else {
                            prev_bytes.append(curr_bytes);
                            core::mem::swap(prev_bytes, curr_bytes);
                        }
                        modified = true;
                    }
                    _ => (),
                }
            }
            if modified {
                PassAction::Modified
            } else {
                PassAction::Keep
            }
        }
        _ => PassAction::Keep,
    }
}

/// Try to reduce a bracket to something simpler.
fn try_reduce_bracket(bc: &BracketContents) -> Option<Node> {
    if bc.invert {
        // Give up.
        return None;
    }
    if bc.cps.count_codepoints() > MAX_CHAR_SET_LENGTH {
        // Too many code points.
        return None;
    }
    // Ok, we want to make a char set.
    let mut res = Vec::new();
    for iv in bc.cps.intervals() {
        res.extend(iv.first..=iv.last);
    }
    debug_assert!(res.len() <= MAX_CHAR_SET_LENGTH, "Unexpectedly many chars");
    Some(match res.as_slice() {
        &[c] => Node::Char { c, icase: false },
        _ => Node::CharSet(res),
    })
}

/// Optimize brackets like [a-b].
/// Optimize certain stupid brackets like `[a]` to a single char.
/// Invert a bracket if it would *reduce* the number of ranges.
/// Note we only run this once.
fn simplify_brackets(n: &mut Node, _walk: &Walk) -> PassAction {
    match n {
        Node::Bracket(bc) => {
            if let Some(new_node) = try_reduce_bracket(bc) {
                return PassAction::Replace(new_node);
            }
            let inverted = bc.cps.inverted();
            if bc.cps.intervals().len() > inverted.intervals().len() {
                bc.cps = inverted;
                bc.invert = !bc.invert;
                PassAction::Modified
            } else {
                PassAction::Keep
            }
        }
        _ => PassAction::Keep,
    }
}

pub fn optimize(r: &mut Regex) {
    run_pass(r, &mut simplify_brackets);
    let auto_possess = directive_enabled(&r.directives, OptimizationDirective::AutoPossess);
    loop {
        let mut changed = false;
        changed |= run_pass(r, &mut decat);
        changed |= run_pass(r, &mut unfold_icase_chars);
        changed |= run_pass(r, &mut unroll_loops);
        changed |= run_pass(r, &mut promote_1char_loops);
        changed |= run_pass(r, &mut simplify_atomics);
        if auto_possess {
            changed |= run_pass(r, &mut auto_possessify);
        }
        changed |= run_pass(r, &mut form_literal_bytes);
        changed |= run_pass(r, &mut remove_empties);
        changed |= run_pass(r, &mut propagate_early_fails);
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompileOptions;
    use crate::parse::try_parse;

    fn optimized(pattern: &str, options: &CompileOptions) -> Regex {
        let mut re = match try_parse(pattern, options) {
            Ok(re) => re,
            Err(err) => panic!("{:?}", err),
        };
        optimize(&mut re);
        re
    }

    #[test]
    fn literals_become_byte_sequences() {
        let re = optimized("abc", &CompileOptions::default());
        assert!(re.to_string().contains("ByteSeq3 0x616263"));
        let re = optimized("(?<=ab)c", &CompileOptions::default());
        assert!(re.to_string().contains("ByteSeq2 0x6162"));
    }

    #[test]
    fn auto_possession() {
        let re = optimized("a+b", &CompileOptions::default());
        assert!(re.to_string().contains("Loop1Char possessive"));
        let re = optimized("a+a", &CompileOptions::default());
        assert!(!re.to_string().contains("possessive"));
        let re = optimized("(*NO_AUTO_POSSESS)a+b", &CompileOptions::default());
        assert!(!re.to_string().contains("possessive"));
    }

    #[test]
    fn icase_unfolds_to_sets() {
        let re = optimized("k", &CompileOptions::from("i"));
        // k, K and the Kelvin sign.
        assert!(re.to_string().contains("CharSet 0x4b, 0x6b, 0x212a"));
    }

    #[test]
    fn callouts_survive_failures() {
        let re = optimized("(?C1)(*F)", &CompileOptions::default());
        assert!(re.to_string().contains("Callout"));
    }
}
