//! Instruction Library - Every built-in handler the hardware can dispatch
//!
//! The library is the static catalogue an [`InstSet`] is assembled from.
//! Each entry pairs one [`InstFunction`] with its mnemonic, its
//! classification and a one-line description.
//!
//! ## Families
//!
//! | Family        | Examples                                        |
//! |---------------|-------------------------------------------------|
//! | Modifiers     | nop-A, nop-B, nop-C (operand decorations)       |
//! | Conditionals  | if-n-equ, if-less, if-label (skip next on false) |
//! | Flow          | jump-f, call, throw/catch, goto/label           |
//! | Registers     | inc, add, nand, val-grey, swap                  |
//! | Replication   | h-alloc, h-copy, h-divide, allocate, divide     |
//! | World         | IO, send, receive, rotate-l, move               |
//! | Threads       | fork-th, kill-th, id-th                         |
//! | Regulation    | promoter, terminate, regulate                   |
//! | Interrupts    | msg-handler, moved-handler, end-handler         |
//!
//! [`InstSet`]: super::InstSet

use serde::{Deserialize, Serialize};

/// How the label machinery treats an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstClass {
    /// Ordinary instruction
    Normal,
    /// Operand decoration carrying a register/head modifier value
    Nop(u8),
    /// Explicit marker consulted by marked-label search
    LabelMarker,
}

/// Built-in handler identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstFunction {
    NopA,
    NopB,
    NopC,
    NopX,
    // Conditionals
    IfEqu0,
    IfNot0,
    IfNEqu,
    IfEqu,
    IfGr0,
    IfGr,
    IfGrEqu0,
    IfGrEqu,
    IfLess0,
    IfLess,
    IfLsEqu0,
    IfLsEqu,
    IfANotEqB,
    IfBNotEqC,
    IfANotEqC,
    IfBit1,
    // Flow
    JumpF,
    JumpB,
    Call,
    Return,
    Throw,
    ThrowIf0,
    ThrowIfNot0,
    Catch,
    Goto,
    GotoIf0,
    GotoIfNot0,
    Label,
    // Stacks and registers
    Pop,
    Push,
    SwitchStack,
    FlipStack,
    Swap,
    SwapAB,
    SwapBC,
    SwapAC,
    CopyReg,
    Reset,
    // Arithmetic and logic
    ShiftR,
    ShiftL,
    Bit1,
    SetNum,
    ValGrey,
    ValDir,
    ValAddP,
    ValFib,
    ValPolyC,
    Inc,
    Dec,
    Zero,
    Neg,
    Square,
    Sqrt,
    Log,
    Log10,
    Not,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Nand,
    Nor,
    And,
    Order,
    Xor,
    // Register-addressed replication
    Copy,
    Read,
    Write,
    StackRead,
    StackWrite,
    Compare,
    IfNCpy,
    Allocate,
    Divide,
    CAlloc,
    CDivide,
    Repro,
    Die,
    Inject,
    SearchF,
    SearchB,
    MemSize,
    // World
    TaskGet,
    TaskPut,
    TaskIO,
    Send,
    Receive,
    RotateL,
    RotateR,
    RotateLabel,
    Tumble,
    Move,
    // Threads
    ForkThread,
    KillThread,
    ThreadId,
    // Heads
    MaxAlloc,
    HeadDivide,
    HeadRead,
    HeadWrite,
    HeadCopy,
    HeadSearch,
    HeadPush,
    HeadPop,
    SetHead,
    AdvanceHead,
    MoveHead,
    JumpHead,
    GetHead,
    IfLabel,
    IfLabel2,
    SetFlow,
    // Regulation
    Promoter,
    Terminate,
    Regulate,
    RegulateSpecific,
    // Interrupts
    MsgHandler,
    MovedHandler,
    EndHandler,
    Skip,
}

/// Library entry: handler, mnemonic, class, description
#[derive(Debug, Clone)]
pub struct InstEntry {
    pub function: InstFunction,
    pub mnemonic: &'static str,
    pub class: InstClass,
    pub description: &'static str,
}

impl InstEntry {
    const fn normal(function: InstFunction, mnemonic: &'static str, description: &'static str) -> Self {
        Self { function, mnemonic, class: InstClass::Normal, description }
    }

    const fn nop(function: InstFunction, mnemonic: &'static str, modifier: u8) -> Self {
        Self {
            function,
            mnemonic,
            class: InstClass::Nop(modifier),
            description: "No-operation instruction; modifies other instructions",
        }
    }

    const fn marker(function: InstFunction, mnemonic: &'static str, description: &'static str) -> Self {
        Self { function, mnemonic, class: InstClass::LabelMarker, description }
    }
}

use InstFunction as F;

/// The complete library, in `InstFunction` declaration order.
pub static LIBRARY: &[InstEntry] = &[
    InstEntry::nop(F::NopA, "nop-A", 0),
    InstEntry::nop(F::NopB, "nop-B", 1),
    InstEntry::nop(F::NopC, "nop-C", 2),
    InstEntry::normal(F::NopX, "nop-X", "True no-operation instruction: does nothing"),
    InstEntry::normal(F::IfEqu0, "if-equ-0", "Execute next instruction if ?BX?==0, else skip it"),
    InstEntry::normal(F::IfNot0, "if-not-0", "Execute next instruction if ?BX?!=0, else skip it"),
    InstEntry::normal(F::IfNEqu, "if-n-equ", "Execute next instruction if ?BX?!=?CX?, else skip it"),
    InstEntry::normal(F::IfEqu, "if-equ", "Execute next instruction if ?BX?==?CX?, else skip it"),
    InstEntry::normal(F::IfGr0, "if-grt-0", "Execute next instruction if ?BX?>0, else skip it"),
    InstEntry::normal(F::IfGr, "if-grt", "Execute next instruction if ?BX?>?CX?, else skip it"),
    InstEntry::normal(F::IfGrEqu0, "if->=-0", "Execute next instruction if ?BX?>=0, else skip it"),
    InstEntry::normal(F::IfGrEqu, "if->=", "Execute next instruction if ?BX?>=?CX?, else skip it"),
    InstEntry::normal(F::IfLess0, "if-les-0", "Execute next instruction if ?BX?<0, else skip it"),
    InstEntry::normal(F::IfLess, "if-less", "Execute next instruction if ?BX? < ?CX?, else skip it"),
    InstEntry::normal(F::IfLsEqu0, "if-<=-0", "Execute next instruction if ?BX?<=0, else skip it"),
    InstEntry::normal(F::IfLsEqu, "if-<=", "Execute next instruction if ?BX?<=?CX?, else skip it"),
    InstEntry::normal(F::IfANotEqB, "if-A!=B", "Execute next instruction if AX!=BX, else skip it"),
    InstEntry::normal(F::IfBNotEqC, "if-B!=C", "Execute next instruction if BX!=CX, else skip it"),
    InstEntry::normal(F::IfANotEqC, "if-A!=C", "Execute next instruction if AX!=CX, else skip it"),
    InstEntry::normal(F::IfBit1, "if-bit-1", "Execute next instruction if the low bit of ?BX? is set"),
    InstEntry::normal(F::JumpF, "jump-f", "Jump forward to the complement label (or BX lines)"),
    InstEntry::normal(F::JumpB, "jump-b", "Jump backward to the complement label (or BX lines)"),
    InstEntry::normal(F::Call, "call", "Push IP and jump forward to the complement label"),
    InstEntry::normal(F::Return, "return", "Pop the stack into the IP"),
    InstEntry::normal(F::Throw, "throw", "Jump to the next catch whose label matches"),
    InstEntry::normal(F::ThrowIf0, "throwif=0", "Throw if BX==0"),
    InstEntry::normal(F::ThrowIfNot0, "throwif!=0", "Throw if BX!=0"),
    InstEntry::normal(F::Catch, "catch", "Target of throw; does nothing when executed"),
    InstEntry::normal(F::Goto, "goto", "Jump to the label marker whose label matches exactly"),
    InstEntry::normal(F::GotoIf0, "goto-if=0", "Goto if BX==0"),
    InstEntry::normal(F::GotoIfNot0, "goto-if!=0", "Goto if BX!=0"),
    InstEntry::marker(F::Label, "label", "Marks the NOP label that follows as a goto target"),
    InstEntry::normal(F::Pop, "pop", "Remove top number from stack and place into ?BX?"),
    InstEntry::normal(F::Push, "push", "Copy number from ?BX? and place it into the stack"),
    InstEntry::normal(F::SwitchStack, "swap-stk", "Toggle which stack is currently being used"),
    InstEntry::normal(F::FlipStack, "flip-stk", "Reverse the order of the active stack"),
    InstEntry::normal(F::Swap, "swap", "Swap the contents of ?BX? with ?CX?"),
    InstEntry::normal(F::SwapAB, "swap-AB", "Swap AX with BX"),
    InstEntry::normal(F::SwapBC, "swap-BC", "Swap BX with CX"),
    InstEntry::normal(F::SwapAC, "swap-AC", "Swap AX with CX"),
    InstEntry::normal(F::CopyReg, "copy-reg", "Copy ?BX? into the next register"),
    InstEntry::normal(F::Reset, "reset", "Zero all registers and clear the active stack"),
    InstEntry::normal(F::ShiftR, "shift-r", "Shift bits in ?BX? right by one (divide by two)"),
    InstEntry::normal(F::ShiftL, "shift-l", "Shift bits in ?BX? left by one (multiply by two)"),
    InstEntry::normal(F::Bit1, "bit-1", "Set the low bit of ?BX?"),
    InstEntry::normal(F::SetNum, "set-num", "Read the following label as a base-N number into BX"),
    InstEntry::normal(F::ValGrey, "val-grey", "Read the following label as grey code into BX"),
    InstEntry::normal(F::ValDir, "val-dir", "Read the following label as a direct value into BX"),
    InstEntry::normal(F::ValAddP, "val-add-p", "Read the following label as an additive polynomial into BX"),
    InstEntry::normal(F::ValFib, "val-fib", "Read the following label as a Fibonacci sum into BX"),
    InstEntry::normal(F::ValPolyC, "val-poly-c", "Read the following label as polynomial coefficients into BX"),
    InstEntry::normal(F::Inc, "inc", "Increment ?BX? by one"),
    InstEntry::normal(F::Dec, "dec", "Decrement ?BX? by one"),
    InstEntry::normal(F::Zero, "zero", "Set ?BX? to zero"),
    InstEntry::normal(F::Neg, "neg", "Negate ?BX?"),
    InstEntry::normal(F::Square, "square", "Square ?BX?"),
    InstEntry::normal(F::Sqrt, "sqrt", "Integer square root of ?BX?"),
    InstEntry::normal(F::Log, "log", "Integer natural log of ?BX?"),
    InstEntry::normal(F::Log10, "log10", "Integer base-10 log of ?BX?"),
    InstEntry::normal(F::Not, "not", "Bitwise complement of ?BX?"),
    InstEntry::normal(F::Add, "add", "Add BX to CX and place the result in ?BX?"),
    InstEntry::normal(F::Sub, "sub", "Subtract CX from BX and place the result in ?BX?"),
    InstEntry::normal(F::Mult, "mult", "Multiple BX by CX and place the result in ?BX?"),
    InstEntry::normal(F::Div, "div", "Divide BX by CX and place the result in ?BX?"),
    InstEntry::normal(F::Mod, "mod", "BX modulo CX into ?BX?"),
    InstEntry::normal(F::Nand, "nand", "Nand BX by CX and place the result in ?BX?"),
    InstEntry::normal(F::Nor, "nor", "Nor BX by CX and place the result in ?BX?"),
    InstEntry::normal(F::And, "and", "And BX by CX and place the result in ?BX?"),
    InstEntry::normal(F::Order, "order", "Swap BX and CX if BX is larger"),
    InstEntry::normal(F::Xor, "xor", "Xor BX by CX and place the result in ?BX?"),
    InstEntry::normal(F::Copy, "copy", "Copy line BX to line AX+BX"),
    InstEntry::normal(F::Read, "read", "Read line BX into ?CX?"),
    InstEntry::normal(F::Write, "write", "Write ?CX? to line AX+BX"),
    InstEntry::normal(F::StackRead, "stk-read", "Push line ?CX? onto the stack"),
    InstEntry::normal(F::StackWrite, "stk-writ", "Pop the stack into line AX+?BX?"),
    InstEntry::normal(F::Compare, "compare", "Difference of lines BX and AX+BX into ?CX?"),
    InstEntry::normal(F::IfNCpy, "if-n-cpy", "Skip next unless lines BX and AX+BX differ"),
    InstEntry::normal(F::Allocate, "allocate", "Allocate BX more lines; old size into AX"),
    InstEntry::normal(F::Divide, "divide", "Divide off everything after line AX"),
    InstEntry::normal(F::CAlloc, "c-alloc", "Allocate as many lines as the current size"),
    InstEntry::normal(F::CDivide, "c-divide", "Divide memory in half"),
    InstEntry::normal(F::Repro, "repro", "Replicate the whole memory as a child"),
    InstEntry::normal(F::Die, "die", "Mark the organism for death"),
    InstEntry::normal(F::Inject, "inject", "Inject read..write code into the neighbour at the complement label"),
    InstEntry::normal(F::SearchF, "search-f", "Distance to the complement label forward into BX"),
    InstEntry::normal(F::SearchB, "search-b", "Distance to the complement label backward into BX"),
    InstEntry::normal(F::MemSize, "mem-size", "Memory size into ?BX?"),
    InstEntry::normal(F::TaskGet, "get", "Input a new number into ?CX?"),
    InstEntry::normal(F::TaskPut, "put", "Output ?BX? and zero it"),
    InstEntry::normal(F::TaskIO, "IO", "Output ?BX?, and input new number back into ?BX?"),
    InstEntry::normal(F::Send, "send", "Send ?BX? label and next-register data as a message"),
    InstEntry::normal(F::Receive, "receive", "Retrieve a message into ?BX? and the next register"),
    InstEntry::normal(F::RotateL, "rotate-l", "Rotate to face the next neighbour counter-clockwise"),
    InstEntry::normal(F::RotateR, "rotate-r", "Rotate to face the next neighbour clockwise"),
    InstEntry::normal(F::RotateLabel, "rotate-label", "Rotate to the facing encoded by the following label"),
    InstEntry::normal(F::Tumble, "tumble", "Rotate to a random facing"),
    InstEntry::normal(F::Move, "move", "Move into the faced cell"),
    InstEntry::normal(F::ForkThread, "fork-th", "Clone the current thread"),
    InstEntry::normal(F::KillThread, "kill-th", "Terminate the current thread"),
    InstEntry::normal(F::ThreadId, "id-th", "Thread id into ?BX?"),
    InstEntry::normal(F::MaxAlloc, "h-alloc", "Allocate maximum allowed space"),
    InstEntry::normal(F::HeadDivide, "h-divide", "Divide code between read and write heads."),
    InstEntry::normal(F::HeadRead, "h-read", "Read the instruction at ?READ? into BX"),
    InstEntry::normal(F::HeadWrite, "h-write", "Write BX at ?WRITE?"),
    InstEntry::normal(F::HeadCopy, "h-copy", "Copy from read-head to write-head; advance both"),
    InstEntry::normal(F::HeadSearch, "h-search", "Find complement label from genome start; place flow-head after it"),
    InstEntry::normal(F::HeadPush, "h-push", "Push the position of ?IP? onto the stack"),
    InstEntry::normal(F::HeadPop, "h-pop", "Pop the stack into ?IP?"),
    InstEntry::normal(F::SetHead, "set-head", "Make ?IP? the active head"),
    InstEntry::normal(F::AdvanceHead, "adv-head", "Advance ?WRITE? by one"),
    InstEntry::normal(F::MoveHead, "mov-head", "Move ?IP? to the flow-head"),
    InstEntry::normal(F::JumpHead, "jmp-head", "Move ?IP? by CX lines"),
    InstEntry::normal(F::GetHead, "get-head", "Position of ?IP? into CX"),
    InstEntry::normal(F::IfLabel, "if-label", "Execute next if the complement label was just copied"),
    InstEntry::normal(F::IfLabel2, "if-label2", "Like if-label, but also skips a trailing NOP"),
    InstEntry::normal(F::SetFlow, "set-flow", "Move the flow-head to line ?CX?"),
    InstEntry::normal(F::Promoter, "promoter", "Execution restart point; does nothing when executed"),
    InstEntry::normal(F::Terminate, "terminate", "Move execution to the next active promoter"),
    InstEntry::normal(F::Regulate, "regulate", "Set the regulation mask of every promoter to ?BX?"),
    InstEntry::normal(F::RegulateSpecific, "regulate-sp", "Set ?BX? as the mask of promoters whose code resembles the next register"),
    InstEntry::normal(F::MsgHandler, "msg-handler", "Entry point for message interrupts"),
    InstEntry::normal(F::MovedHandler, "moved-handler", "Entry point for movement interrupts"),
    InstEntry::normal(F::EndHandler, "end-handler", "Leave the active interrupt handler"),
    InstEntry::normal(F::Skip, "skip", "Skip the next instruction"),
];

impl InstFunction {
    /// Library entry for this handler
    pub fn entry(self) -> &'static InstEntry {
        &LIBRARY[self as usize]
    }

    pub fn mnemonic(self) -> &'static str {
        self.entry().mnemonic
    }

    /// Look up a handler by mnemonic (exact match)
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        LIBRARY
            .iter()
            .find(|entry| entry.mnemonic == mnemonic)
            .map(|entry| entry.function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_order_matches_enum() {
        for (i, entry) in LIBRARY.iter().enumerate() {
            assert_eq!(entry.function as usize, i, "entry {} out of order", entry.mnemonic);
        }
    }

    #[test]
    fn test_mnemonics_unique() {
        let mut seen = std::collections::HashSet::new();
        for entry in LIBRARY {
            assert!(seen.insert(entry.mnemonic), "duplicate {}", entry.mnemonic);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(InstFunction::from_mnemonic("h-copy"), Some(InstFunction::HeadCopy));
        assert_eq!(InstFunction::from_mnemonic("IO"), Some(InstFunction::TaskIO));
        assert_eq!(InstFunction::from_mnemonic("io"), None);
        assert_eq!(InstFunction::Label.entry().class, InstClass::LabelMarker);
        assert_eq!(InstFunction::NopC.entry().class, InstClass::Nop(2));
    }
}
