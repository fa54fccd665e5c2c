use crate::error::SysError;
use crate::opcode_tables;
use indexmap::IndexMap;
use log::debug;
use std::fmt::{Display, Error, Formatter};

/// Instruction classes, stored in the top four bits of a code word
pub const CLASS_STATEMENT: u32 = 0;
pub const CLASS_CONSTANT: u32 = 1;
pub const CLASS_CURVAR: u32 = 2;

const CLASS_SHIFT: u32 = 28;
const OP_MASK: u32 = 0x0FFF_FFFF;

/// Statement operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Print = 1,
    SayInt,
    SayStr,
    Say,
    GetStr,
    Dup,
    Pop,
    Quit,
    Save,
    Restore,
    Score,
    Visits,
    Schedule,
    Cancel,
    Make,
    Set,
    SetStr,
    SetSet,
    NewSet,
    Union,
    Incr,
    Decr,
    Include,
    Exclude,
    SetSize,
    SetMemb,
    InSet,
    ContSize,
    ContMemb,
    Attribute,
    AttrStr,
    AttrSet,
    Locate,
    Where,
    Location,
    In,
    If,
    Else,
    EndIf,
    And,
    Or,
    Ne,
    Eq,
    StrEq,
    StrExact,
    Le,
    Ge,
    Lt,
    Gt,
    Plus,
    Minus,
    Mult,
    Div,
    Not,
    Rnd,
    Btw,
    Concat,
    Contains,
    Max,
    Min,
    Sum,
    Count,
    Frame,
    GetLocal,
    SetLocal,
    EndFrame,
    Loop,
    LoopNext,
    LoopEnd,
    Return,
    Isa,
    At,
    Here,
    Near,
    Nearby,
    Empty,
    Depend,
    DepExec,
    DepCase,
    DepElse,
    EndDep,
    Use,
    Stop,
    Strip,
}

impl Op {
    pub const ALL: [Op; 84] = [
        Op::Print,
        Op::SayInt,
        Op::SayStr,
        Op::Say,
        Op::GetStr,
        Op::Dup,
        Op::Pop,
        Op::Quit,
        Op::Save,
        Op::Restore,
        Op::Score,
        Op::Visits,
        Op::Schedule,
        Op::Cancel,
        Op::Make,
        Op::Set,
        Op::SetStr,
        Op::SetSet,
        Op::NewSet,
        Op::Union,
        Op::Incr,
        Op::Decr,
        Op::Include,
        Op::Exclude,
        Op::SetSize,
        Op::SetMemb,
        Op::InSet,
        Op::ContSize,
        Op::ContMemb,
        Op::Attribute,
        Op::AttrStr,
        Op::AttrSet,
        Op::Locate,
        Op::Where,
        Op::Location,
        Op::In,
        Op::If,
        Op::Else,
        Op::EndIf,
        Op::And,
        Op::Or,
        Op::Ne,
        Op::Eq,
        Op::StrEq,
        Op::StrExact,
        Op::Le,
        Op::Ge,
        Op::Lt,
        Op::Gt,
        Op::Plus,
        Op::Minus,
        Op::Mult,
        Op::Div,
        Op::Not,
        Op::Rnd,
        Op::Btw,
        Op::Concat,
        Op::Contains,
        Op::Max,
        Op::Min,
        Op::Sum,
        Op::Count,
        Op::Frame,
        Op::GetLocal,
        Op::SetLocal,
        Op::EndFrame,
        Op::Loop,
        Op::LoopNext,
        Op::LoopEnd,
        Op::Return,
        Op::Isa,
        Op::At,
        Op::Here,
        Op::Near,
        Op::Nearby,
        Op::Empty,
        Op::Depend,
        Op::DepExec,
        Op::DepCase,
        Op::DepElse,
        Op::EndDep,
        Op::Use,
        Op::Stop,
        Op::Strip,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Op> {
        OPS_BY_CODE.get(&code).copied()
    }

    pub fn name(self) -> &'static str {
        opcode_tables::get_statement_name(self.code())
    }
}

lazy_static! {
    static ref OPS_BY_CODE: IndexMap<u32, Op> = Op::ALL.iter().map(|op| (op.code(), *op)).collect();
}

/// Current-variable reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurVar {
    Param = 1,
    CurLoc,
    CurAct,
    CurVrb,
    CurIns,
    Score,
    MaxInstance,
}

impl CurVar {
    pub fn from_code(code: u32) -> Option<CurVar> {
        match code {
            1 => Some(CurVar::Param),
            2 => Some(CurVar::CurLoc),
            3 => Some(CurVar::CurAct),
            4 => Some(CurVar::CurVrb),
            5 => Some(CurVar::CurIns),
            6 => Some(CurVar::Score),
            7 => Some(CurVar::MaxInstance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Statement(Op),
    Constant(i32),
    CurVar(CurVar),
}

impl Instruction {
    /// Decode one code word found at `address`
    pub fn decode(word: u32, address: usize) -> Result<Self, SysError> {
        let op = word & OP_MASK;
        match word >> CLASS_SHIFT {
            CLASS_STATEMENT => Op::from_code(op)
                .map(Instruction::Statement)
                .ok_or(SysError::UnknownInstruction(word, address)),
            // 28-bit two's complement payload
            CLASS_CONSTANT => Ok(Instruction::Constant(((op << 4) as i32) >> 4)),
            CLASS_CURVAR => CurVar::from_code(op)
                .map(Instruction::CurVar)
                .ok_or(SysError::UnknownVariable(op, address)),
            _ => Err(SysError::UnknownInstruction(word, address)),
        }
    }

    pub fn encode(&self) -> u32 {
        match self {
            Instruction::Statement(op) => (CLASS_STATEMENT << CLASS_SHIFT) | op.code(),
            Instruction::Constant(value) => (CLASS_CONSTANT << CLASS_SHIFT) | (*value as u32 & OP_MASK),
            Instruction::CurVar(var) => (CLASS_CURVAR << CLASS_SHIFT) | *var as u32,
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Instruction::Statement(op) => write!(f, "{}", op.name()),
            Instruction::Constant(value) => write!(f, "PUSH {}", value),
            Instruction::CurVar(var) => {
                write!(f, "CURVAR {}", opcode_tables::get_curvar_name(*var as u32))
            }
        }
    }
}

/// The decoded code area of a game image.
///
/// Block brackets (IF/ELSE/ENDIF, LOOP/LOOPNEXT/LOOPEND and the
/// DEPEND/DEPEXEC/DEPCASE/DEPELSE/ENDDEP switch) are matched once when the
/// code is loaded. `target(address)` then gives:
/// - IF: the matching ELSE, or the ENDIF when there is no ELSE
/// - ELSE: the matching ENDIF
/// - LOOP and LOOPNEXT: the LOOPEND of the innermost enclosing loop
/// - LOOPEND: the matching LOOP
/// - DEPEXEC: where to continue when its case does not match, which is
///   just past the next DEPCASE or DEPELSE, or the ENDDEP
/// - DEPEND, DEPCASE and DEPELSE: the matching ENDDEP
#[derive(Debug, Clone, Default)]
pub struct Code {
    instructions: Vec<Instruction>,
    targets: Vec<Option<usize>>,
}

impl Code {
    pub fn new(words: &[u32]) -> Result<Code, SysError> {
        let instructions = words
            .iter()
            .enumerate()
            .map(|(address, word)| Instruction::decode(*word, address))
            .collect::<Result<Vec<_>, _>>()?;

        let mut targets = vec![None; instructions.len()];
        let mut ifs: Vec<(usize, Option<usize>)> = Vec::new();
        let mut loops: Vec<(usize, Vec<usize>)> = Vec::new();
        // DEPEND address, DEPEXEC waiting for its next case, case addresses
        let mut depends: Vec<(usize, Option<usize>, Vec<usize>)> = Vec::new();

        for (address, instruction) in instructions.iter().enumerate() {
            let op = match instruction {
                Instruction::Statement(op) => *op,
                _ => continue,
            };
            match op {
                Op::If => ifs.push((address, None)),
                Op::Else => match ifs.last_mut() {
                    Some((_, branch @ None)) => *branch = Some(address),
                    _ => return Err(SysError::UnbalancedBlock("ELSE", address)),
                },
                Op::EndIf => {
                    let (start, branch) = ifs
                        .pop()
                        .ok_or(SysError::UnbalancedBlock("ENDIF", address))?;
                    match branch {
                        Some(else_address) => {
                            targets[start] = Some(else_address);
                            targets[else_address] = Some(address);
                        }
                        None => targets[start] = Some(address),
                    }
                }
                Op::Loop => loops.push((address, Vec::new())),
                Op::LoopNext => match loops.last_mut() {
                    Some((_, nexts)) => nexts.push(address),
                    None => return Err(SysError::UnbalancedBlock("LOOPNEXT", address)),
                },
                Op::LoopEnd => {
                    let (start, nexts) = loops
                        .pop()
                        .ok_or(SysError::UnbalancedBlock("LOOPEND", address))?;
                    targets[start] = Some(address);
                    targets[address] = Some(start);
                    for next in nexts {
                        targets[next] = Some(address);
                    }
                }
                Op::Depend => depends.push((address, None, Vec::new())),
                Op::DepExec => match depends.last_mut() {
                    Some((_, pending @ None, _)) => *pending = Some(address),
                    _ => return Err(SysError::UnbalancedBlock("DEPEXEC", address)),
                },
                Op::DepCase | Op::DepElse => match depends.last_mut() {
                    Some((_, pending, cases)) => {
                        if let Some(exec) = pending.take() {
                            targets[exec] = Some(address + 1);
                        }
                        cases.push(address);
                    }
                    None => {
                        let kind = if op == Op::DepCase { "DEPCASE" } else { "DEPELSE" };
                        return Err(SysError::UnbalancedBlock(kind, address));
                    }
                },
                Op::EndDep => {
                    let (start, pending, cases) = depends
                        .pop()
                        .ok_or(SysError::UnbalancedBlock("ENDDEP", address))?;
                    targets[start] = Some(address);
                    if let Some(exec) = pending {
                        targets[exec] = Some(address);
                    }
                    for case in cases {
                        targets[case] = Some(address);
                    }
                }
                _ => {}
            }
        }

        if let Some((address, _)) = ifs.first() {
            return Err(SysError::UnbalancedBlock("IF", *address));
        }
        if let Some((address, _)) = loops.first() {
            return Err(SysError::UnbalancedBlock("LOOP", *address));
        }
        if let Some((address, _, _)) = depends.first() {
            return Err(SysError::UnbalancedBlock("DEPEND", *address));
        }

        debug!("Decoded {} code words", instructions.len());
        Ok(Code {
            instructions,
            targets,
        })
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction(&self, address: usize) -> Result<Instruction, SysError> {
        self.instructions
            .get(address)
            .copied()
            .ok_or(SysError::OutsideProgram(address))
    }

    /// Resolved bracket target for the block instruction at `address`
    pub fn target(&self, address: usize) -> Result<usize, SysError> {
        self.targets
            .get(address)
            .copied()
            .flatten()
            .ok_or(SysError::UnbalancedBlock("unresolved", address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn stmt(op: Op) -> u32 {
        Instruction::Statement(op).encode()
    }

    #[test]
    fn test_decode_classes() {
        assert_eq!(
            Instruction::decode(stmt(Op::Plus), 0),
            Ok(Instruction::Statement(Op::Plus))
        );
        assert_eq!(
            Instruction::decode(0x1000_0005, 0),
            Ok(Instruction::Constant(5))
        );
        assert_eq!(
            Instruction::decode(0x2000_0002, 0),
            Ok(Instruction::CurVar(CurVar::CurLoc))
        );
    }

    #[test]
    fn test_negative_constant() {
        let word = Instruction::Constant(-3).encode();
        assert_eq!(word >> 28, CLASS_CONSTANT);
        assert_eq!(Instruction::decode(word, 0), Ok(Instruction::Constant(-3)));
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        assert_eq!(
            Instruction::decode(0x0000_0999, 7),
            Err(SysError::UnknownInstruction(0x999, 7))
        );
        assert!(Instruction::decode(0x7000_0000, 0).is_err());
        assert_eq!(
            Instruction::decode(0x2000_0063, 4),
            Err(SysError::UnknownVariable(0x63, 4))
        );
    }

    #[test]
    fn test_op_codes_are_unique() {
        assert_eq!(OPS_BY_CODE.len(), Op::ALL.len());
        for op in Op::ALL.iter() {
            assert_eq!(Op::from_code(op.code()), Some(*op));
            assert_ne!(op.name(), "unknown");
        }
    }

    #[test]
    fn test_if_else_targets() {
        // 0 IF, 1 ELSE, 2 IF, 3 ENDIF, 4 ENDIF
        let code = Code::new(&[
            stmt(Op::If),
            stmt(Op::Else),
            stmt(Op::If),
            stmt(Op::EndIf),
            stmt(Op::EndIf),
        ])
        .unwrap();
        assert_eq!(code.target(0), Ok(1));
        assert_eq!(code.target(1), Ok(4));
        assert_eq!(code.target(2), Ok(3));
    }

    #[test]
    fn test_loop_targets() {
        // 0 LOOP, 1 LOOP, 2 LOOPNEXT, 3 LOOPEND, 4 LOOPNEXT, 5 LOOPEND
        let code = Code::new(&[
            stmt(Op::Loop),
            stmt(Op::Loop),
            stmt(Op::LoopNext),
            stmt(Op::LoopEnd),
            stmt(Op::LoopNext),
            stmt(Op::LoopEnd),
        ])
        .unwrap();
        assert_eq!(code.target(0), Ok(5));
        assert_eq!(code.target(1), Ok(3));
        assert_eq!(code.target(2), Ok(3));
        assert_eq!(code.target(3), Ok(1));
        assert_eq!(code.target(4), Ok(5));
        assert_eq!(code.target(5), Ok(0));
    }

    #[test]
    fn test_depend_targets() {
        // 0 DEPEND, 1 DEPEXEC, 2 DEPCASE, 3 DEPEXEC, 4 DEPEND, 5 DEPEXEC,
        // 6 ENDDEP, 7 DEPELSE, 8 ENDDEP
        let code = Code::new(&[
            stmt(Op::Depend),
            stmt(Op::DepExec),
            stmt(Op::DepCase),
            stmt(Op::DepExec),
            stmt(Op::Depend),
            stmt(Op::DepExec),
            stmt(Op::EndDep),
            stmt(Op::DepElse),
            stmt(Op::EndDep),
        ])
        .unwrap();
        assert_eq!(code.target(0), Ok(8));
        assert_eq!(code.target(1), Ok(3));
        assert_eq!(code.target(2), Ok(8));
        assert_eq!(code.target(3), Ok(8));
        assert_eq!(code.target(4), Ok(6));
        assert_eq!(code.target(5), Ok(6));
        assert_eq!(code.target(7), Ok(8));
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert_eq!(
            Code::new(&[stmt(Op::Loop), stmt(Op::Return)]).unwrap_err(),
            SysError::UnbalancedBlock("LOOP", 0)
        );
        assert_eq!(
            Code::new(&[stmt(Op::EndIf)]).unwrap_err(),
            SysError::UnbalancedBlock("ENDIF", 0)
        );
        assert!(Code::new(&[stmt(Op::If), stmt(Op::Else), stmt(Op::Else), stmt(Op::EndIf)]).is_err());
        assert_eq!(
            Code::new(&[stmt(Op::Depend), stmt(Op::DepExec)]).unwrap_err(),
            SysError::UnbalancedBlock("DEPEND", 0)
        );
        assert_eq!(
            Code::new(&[stmt(Op::DepCase)]).unwrap_err(),
            SysError::UnbalancedBlock("DEPCASE", 0)
        );
    }
}
