//! Regex compiler back-end: transforms IR into a CompiledRegex

use crate::bytesearch::{AsciiBitmap, ByteBitmap};
use crate::error::{CompileError, ErrorKind};
use crate::insn::{CompiledRegex, Insn, JumpTarget, LoopFields, StartPredicate, MAX_CHAR_SET_LENGTH};
use crate::ir;
use crate::ir::Node;
use crate::options::CompileOptions;
use crate::startpredicate;
use crate::types::{BracketContents, LoopID};
use crate::codepointset::CodePointSet;

/// \return an anchor instruction for a given IR anchor.
fn make_anchor(anchor_type: ir::AnchorType) -> Insn {
    match anchor_type {
        ir::AnchorType::SubjectStart => Insn::SubjectStart,
        ir::AnchorType::LineStart => Insn::LineStart,
        ir::AnchorType::MultilineStart => Insn::MultilineStart,
        ir::AnchorType::LineEnd => Insn::LineEnd,
        ir::AnchorType::LineEndOnly => Insn::LineEndOnly,
        ir::AnchorType::MultilineEnd => Insn::MultilineEnd,
        ir::AnchorType::FinalNewlineEnd => Insn::FinalNewlineEnd,
        ir::AnchorType::SubjectEnd => Insn::SubjectEnd,
        ir::AnchorType::SearchStart => Insn::SearchStart,
    }
}

/// If the given bracket can be represented as ASCII contents, return the
/// bitmap. Otherwise nothing.
fn bracket_as_ascii(bc: &BracketContents) -> Option<AsciiBitmap> {
    let mut result = AsciiBitmap::default();
    // We just assume that inverted brackets contain non-ASCII characters.
    if bc.invert {
        return None;
    }
    for r in bc.cps.intervals() {
        debug_assert!(r.first <= r.last);
        if r.last >= 128 {
            return None;
        }
        for bit in r.first..=r.last {
            result.set(bit as u8)
        }
    }
    Some(result)
}

/// Type which wraps up the context needed to emit a CompiledRegex.
struct Emitter {
    result: CompiledRegex,

    // Number of loops seen so far.
    next_loop_id: u32,
}

impl Emitter {
    /// Emit an instruction.
    fn emit_insn(&mut self, insn: Insn) {
        self.result.insns.push(insn);
    }

    /// Get an instruction at a given index.
    fn get_insn(&mut self, idx: JumpTarget) -> &mut Insn {
        &mut self.result.insns[idx as usize]
    }

    /// \return the offset of the next instruction emitted.
    fn next_offset(&self) -> JumpTarget {
        self.result.insns.len() as JumpTarget
    }

    fn emit_insn_offset(&mut self, insn: Insn) -> JumpTarget {
        let ret = self.next_offset();
        self.emit_insn(insn);
        ret
    }

    fn emit_bracket(&mut self, contents: &BracketContents) {
        if let Some(ascii_contents) = bracket_as_ascii(contents) {
            self.emit_insn(Insn::AsciiBracket(ascii_contents))
        } else {
            self.result.brackets.push(contents.clone());
            let idx = self.result.brackets.len() - 1;
            self.emit_insn(Insn::Bracket(idx))
        }
    }

    /// Emit a sub-program which runs to its own Goal, for lookarounds and
    /// atomic groups. \return the offset of the leading instruction.
    fn emit_subprogram(&mut self, lead: Insn, contents: &Node) -> JumpTarget {
        let lead_insn = self.emit_insn_offset(lead);
        self.emit_node(contents);
        self.emit_insn(Insn::Goal);

        // Fix up the continuation.
        let next_insn = self.next_offset();
        match self.get_insn(lead_insn) {
            Insn::Lookbehind { continuation, .. }
            | Insn::Lookahead { continuation, .. }
            | Insn::Atomic { continuation, .. } => *continuation = next_insn,
            _ => rs_unreachable!("Should be a sub-program instruction"),
        }
        lead_insn
    }

    /// Emit instructions corresponding to a given node.
    fn emit_node(&mut self, node: &Node) {
        match node {
            Node::Empty => {}
            Node::Goal => self.emit_insn(Insn::Goal),
            &Node::Char { c, icase } => {
                if !icase {
                    self.emit_insn(Insn::Char(c))
                } else {
                    self.emit_insn(Insn::CharICase(c))
                }
            }
            Node::Cat(children) => {
                for nn in children {
                    self.emit_node(nn)
                }
            }
            Node::Alt(left, right) => {
                // Alternation is followed by the primary branch and has a jump to secondary
                // branch. After primary branch, jump to the continuation.
                let alt_insn = self.emit_insn_offset(Insn::Alt { secondary: 0 });
                self.emit_node(left);
                let jump_insn = self.emit_insn_offset(Insn::Jump { target: 0 });
                let right_branch = self.next_offset();
                self.emit_node(right);
                let exit = self.next_offset();

                // Fix up our jump targets.
                match self.get_insn(alt_insn) {
                    Insn::Alt { secondary } => *secondary = right_branch,
                    _ => rs_unreachable!("Should be an Alt instruction"),
                }
                match self.get_insn(jump_insn) {
                    Insn::Jump { target } => *target = exit,
                    _ => rs_unreachable!("Should be a Jump instruction"),
                }
            }
            Node::Bracket(contents) => self.emit_bracket(contents),
            Node::MatchAny => self.emit_insn(Insn::MatchAny),
            Node::MatchAnyExceptNewline => self.emit_insn(Insn::MatchAnyExceptNewline),
            Node::LineBreak => self.emit_insn(Insn::LineBreak),
            Node::Anchor(anchor_type) => self.emit_insn(make_anchor(*anchor_type)),
            Node::Loop { loopee, quant, .. } => {
                let loop_id = self.next_loop_id as LoopID;
                self.next_loop_id += 1;
                let loop_insn = self.emit_insn_offset(Insn::EnterLoop(LoopFields {
                    loop_id,
                    min_iters: quant.min,
                    max_iters: quant.max.unwrap_or(usize::MAX),
                    greedy: quant.greedy,
                    exit: 0,
                }));
                self.result.loops += 1;
                self.emit_node(loopee);
                self.emit_insn(Insn::LoopAgain { begin: loop_insn });
                // Fix up our loop exit.
                let exit = self.next_offset();
                match self.get_insn(loop_insn) {
                    Insn::EnterLoop(fields) => fields.exit = exit,
                    _ => rs_unreachable!("Should be an EnterLoop instruction"),
                }
            }
            Node::Loop1CharBody {
                loopee,
                quant,
                possessive,
            } => {
                self.emit_insn(Insn::Loop1CharBody {
                    min_iters: quant.min,
                    max_iters: quant.max.unwrap_or(usize::MAX),
                    greedy: quant.greedy,
                    possessive: *possessive,
                });
                self.emit_node(loopee);
            }
            Node::CaptureGroup(contents, group) | Node::NamedCaptureGroup(contents, group, _) => {
                self.emit_insn(Insn::BeginCaptureGroup(*group));
                self.emit_node(contents);
                self.emit_insn(Insn::EndCaptureGroup(*group));
            }
            &Node::LookaroundAssertion {
                negate,
                backwards,
                start_group,
                end_group,
                ref contents,
            } => {
                let lead = if backwards {
                    Insn::Lookbehind {
                        negate,
                        start_group,
                        end_group,
                        continuation: 0,
                    }
                } else {
                    Insn::Lookahead {
                        negate,
                        start_group,
                        end_group,
                        continuation: 0,
                    }
                };
                self.emit_subprogram(lead, contents);
            }
            &Node::Atomic {
                start_group,
                end_group,
                ref contents,
            } => {
                let lead = Insn::Atomic {
                    start_group,
                    end_group,
                    continuation: 0,
                };
                self.emit_subprogram(lead, contents);
            }
            Node::WordBoundary { invert } => self.emit_insn(Insn::WordBoundary { invert: *invert }),
            Node::BackRef { groups, icase } => self.emit_insn(Insn::BackRef {
                groups: groups.iter().copied().collect(),
                icase: *icase,
            }),
            Node::NamedBackRef { .. } => {
                debug_assert!(false, "Named backreferences should be resolved");
                self.emit_insn(Insn::JustFail)
            }

            Node::ByteSet(bytes) => {
                if bytes.is_empty() {
                    self.emit_insn(Insn::JustFail)
                } else {
                    self.emit_insn(Insn::ByteSet(ByteBitmap::new(bytes)))
                }
            }

            Node::CharSet(chars) => {
                if chars.is_empty() {
                    self.emit_insn(Insn::JustFail)
                } else if chars.len() <= MAX_CHAR_SET_LENGTH {
                    self.emit_insn(Insn::CharSet(chars.clone().into_boxed_slice()))
                } else {
                    let mut cps = CodePointSet::new();
                    chars.iter().for_each(|&c| cps.add_one(c));
                    self.emit_bracket(&BracketContents { invert: false, cps })
                }
            }

            Node::ByteSequence(bytes) => {
                self.emit_insn(Insn::ByteSeq(bytes.clone().into_boxed_slice()))
            }

            &Node::Callout(idx) => self.emit_insn(Insn::Callout(idx)),
            &Node::Mark(idx) => self.emit_insn(Insn::Mark(idx)),
            Node::Commit => self.emit_insn(Insn::Commit),
        }
    }
}

/// Facts about a pattern measured before optimization.
#[derive(Debug, Copy, Clone, Default)]
pub struct Measurements {
    pub min_length: usize,
    pub max_lookbehind: Option<usize>,
}

impl Measurements {
    pub fn of(re: &ir::Regex) -> Measurements {
        Measurements {
            min_length: ir::min_width(&re.node),
            max_lookbehind: re.max_lookbehind(),
        }
    }
}

/// Compile the given IR to a CompiledRegex.
pub fn emit(
    re: &ir::Regex,
    options: &CompileOptions,
    measured: Measurements,
) -> Result<CompiledRegex, CompileError> {
    let start_pred = if options.anchored {
        StartPredicate::StartAnchored
    } else if options.no_optimize {
        StartPredicate::Arbitrary
    } else {
        startpredicate::predicate_for_re(re)
    };
    let anchored = matches!(start_pred, StartPredicate::StartAnchored);
    let group_names = if re.group_names.is_empty() {
        Box::default()
    } else {
        let mut names: Vec<Box<str>> = vec![Box::default(); re.group_count as usize];
        for (name, id) in &re.group_names {
            names[*id as usize] = name.as_str().into();
        }
        names.into_boxed_slice()
    };
    let mut emitter = Emitter {
        next_loop_id: 0,
        result: CompiledRegex {
            insns: Vec::new(),
            brackets: Vec::new(),
            start_pred,
            loops: 0,
            groups: u32::from(re.group_count),
            group_names,
            callouts: re.callouts.clone().into_boxed_slice(),
            marks: re.marks.clone().into_boxed_slice(),
            newline: re.newline,
            bsr: re.bsr,
            utf: re.utf,
            anchored,
            end_anchored: options.end_anchored,
            match_unset_backref: options.match_unset_backref,
            firstline: options.firstline,
            max_lookbehind: measured.max_lookbehind,
            min_length: measured.min_length,
            limits: re.limits,
        },
    };
    emitter.emit_node(&re.node);
    if let Some(max) = options.max_pattern_compiled_length {
        if emitter.result.insns.len() > max {
            return Err(CompileError::new(ErrorKind::CompiledPatternTooLong, 0));
        }
    }
    Ok(emitter.result)
}
