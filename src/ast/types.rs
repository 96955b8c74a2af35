//! AST node types
//!
//! The parsed form of a shell program: a closed family of variants, one per
//! construct. The executor pattern-matches over these; nothing here carries
//! behavior beyond small constructors and display helpers.

use std::fmt;

// =============================================================================
// PROGRAM STRUCTURE
// =============================================================================

/// Root node: a complete program (a command list).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub statements: Vec<Statement>,
}

/// An and-or list: pipelines joined by `&&` / `||`, optionally sent to the
/// background with a trailing `&`. Statements are separated by `;` or
/// newline at the `Script` level.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub pipelines: Vec<Pipeline>,
    /// Operator *before* `pipelines[i + 1]`; always one shorter than `pipelines`.
    pub operators: Vec<AndOrOp>,
    pub background: bool,
    /// Original source text, for history and `set -v`.
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndOrOp {
    And, // &&
    Or,  // ||
}

/// A pipeline: one or more commands connected by `|`.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    /// Leading `!` negates the final status.
    pub negated: bool,
    /// Leading `time` keyword.
    pub timed: bool,
    /// `time -p`: POSIX output format.
    pub time_posix: bool,
}

/// Union of everything that can appear as a pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Simple(SimpleCommand),
    Compound(CompoundCommand),
    FunctionDef(FunctionDef),
    Break { level: u32 },
    Continue { level: u32 },
}

/// Simple command: optional assignments, argv words, redirections.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCommand {
    pub assignments: Vec<Assignment>,
    /// argv before expansion; `words[0]` is the command name. May be empty
    /// for a pure-assignment command.
    pub words: Vec<Word>,
    pub redirects: Vec<Redirect>,
    /// Source line, for `$LINENO` and diagnostics.
    pub line: usize,
}

/// `NAME=value`, `NAME+=value`, `NAME[idx]=value`, or `NAME=(a b c)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    /// Subscript text for `NAME[idx]=…` (arithmetic for indexed arrays,
    /// literal key for associative ones).
    pub index: Option<Word>,
    pub value: Option<Word>,
    pub append: bool,
    /// `NAME=(a b c)` array literal.
    pub array: Option<Vec<Word>>,
}

// =============================================================================
// COMPOUND COMMANDS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CompoundCommand {
    If(IfCommand),
    While(LoopCommand),
    Until(LoopCommand),
    For(ForCommand),
    CStyleFor(CStyleForCommand),
    Case(CaseCommand),
    Select(SelectCommand),
    Subshell(GroupCommand),
    BraceGroup(GroupCommand),
    Arith(ArithCommand),
    Cond(CondCommand),
}

impl CompoundCommand {
    /// Redirections applied to the whole group.
    pub fn redirects(&self) -> &[Redirect] {
        match self {
            Self::If(n) => &n.redirects,
            Self::While(n) | Self::Until(n) => &n.redirects,
            Self::For(n) => &n.redirects,
            Self::CStyleFor(n) => &n.redirects,
            Self::Case(n) => &n.redirects,
            Self::Select(n) => &n.redirects,
            Self::Subshell(n) | Self::BraceGroup(n) => &n.redirects,
            Self::Arith(n) => &n.redirects,
            Self::Cond(n) => &n.redirects,
        }
    }

    pub fn redirects_mut(&mut self) -> &mut Vec<Redirect> {
        match self {
            Self::If(n) => &mut n.redirects,
            Self::While(n) | Self::Until(n) => &mut n.redirects,
            Self::For(n) => &mut n.redirects,
            Self::CStyleFor(n) => &mut n.redirects,
            Self::Case(n) => &mut n.redirects,
            Self::Select(n) => &mut n.redirects,
            Self::Subshell(n) | Self::BraceGroup(n) => &mut n.redirects,
            Self::Arith(n) => &mut n.redirects,
            Self::Cond(n) => &mut n.redirects,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfCommand {
    /// The `if` arm followed by any `elif` arms.
    pub arms: Vec<IfArm>,
    pub else_body: Option<Vec<Statement>>,
    pub redirects: Vec<Redirect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfArm {
    pub condition: Vec<Statement>,
    pub body: Vec<Statement>,
}

/// Shared by `while` and `until`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopCommand {
    pub condition: Vec<Statement>,
    pub body: Vec<Statement>,
    pub redirects: Vec<Redirect>,
}

/// `for VAR [in words]; do …; done`. `words == None` iterates `"$@"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForCommand {
    pub var: String,
    pub words: Option<Vec<Word>>,
    pub body: Vec<Statement>,
    pub redirects: Vec<Redirect>,
}

/// `for ((init; cond; update)); do …; done`.
#[derive(Debug, Clone, PartialEq)]
pub struct CStyleForCommand {
    pub init: Option<ArithExpr>,
    pub cond: Option<ArithExpr>,
    pub update: Option<ArithExpr>,
    pub body: Vec<Statement>,
    pub redirects: Vec<Redirect>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseCommand {
    pub subject: Word,
    pub arms: Vec<CaseArm>,
    pub redirects: Vec<Redirect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    pub patterns: Vec<Word>,
    pub body: Vec<Statement>,
    pub terminator: CaseTerminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTerminator {
    /// `;;` - stop after this arm.
    Break,
    /// `;&` - run the next arm's body without matching.
    FallThrough,
    /// `;;&` - keep testing subsequent patterns.
    ContinueMatching,
}

impl CaseTerminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Break => ";;",
            Self::FallThrough => ";&",
            Self::ContinueMatching => ";;&",
        }
    }
}

/// `select VAR [in words]; do …; done`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCommand {
    pub var: String,
    pub words: Option<Vec<Word>>,
    pub body: Vec<Statement>,
    pub redirects: Vec<Redirect>,
}

/// `( … )` subshell or `{ …; }` brace group, depending on the enclosing
/// `CompoundCommand` variant.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCommand {
    pub body: Vec<Statement>,
    pub redirects: Vec<Redirect>,
}

/// `(( expr ))` evaluated for its exit status.
#[derive(Debug, Clone, PartialEq)]
pub struct ArithCommand {
    pub expr: ArithExpr,
    pub redirects: Vec<Redirect>,
    pub line: usize,
}

/// `[[ expr ]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CondCommand {
    pub expr: CondExpr,
    pub redirects: Vec<Redirect>,
}

/// Function definition; the body is any compound command.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub body: Box<CompoundCommand>,
    pub redirects: Vec<Redirect>,
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    /// Explicit source fd (`2>`, `3<&-`); default depends on the operator.
    pub fd: Option<i32>,
    pub op: RedirectOp,
    pub target: RedirectTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    Read,        // <
    Write,       // >
    Append,      // >>
    ReadWrite,   // <>
    Clobber,     // >|
    DupIn,       // <&
    DupOut,      // >&
    HereDoc,     // <<
    HereDocDash, // <<-
    HereString,  // <<<
    WriteBoth,   // &>
    AppendBoth,  // &>>
}

impl fmt::Display for RedirectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "<",
            Self::Write => ">",
            Self::Append => ">>",
            Self::ReadWrite => "<>",
            Self::Clobber => ">|",
            Self::DupIn => "<&",
            Self::DupOut => ">&",
            Self::HereDoc => "<<",
            Self::HereDocDash => "<<-",
            Self::HereString => "<<<",
            Self::WriteBoth => "&>",
            Self::AppendBoth => "&>>",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RedirectTarget {
    Word(Word),
    HereDoc(HereDoc),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HereDoc {
    pub delimiter: String,
    /// Collected body. A quoted delimiter yields a single literal piece;
    /// otherwise the body is parsed for `$` expansions.
    pub body: Word,
    /// Delimiter was quoted: suppress expansion of the body.
    pub quoted: bool,
    /// `<<-`: leading tabs stripped from body lines.
    pub strip_tabs: bool,
}

// =============================================================================
// WORDS
// =============================================================================

/// A word: an ordered sequence of pieces with individual quoting, so the
/// expander can apply the correct rules per piece.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Word {
    pub pieces: Vec<WordPiece>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WordPiece {
    /// Unquoted text with no special meaning left after lexing.
    Literal(String),
    /// `'…'` - fully literal.
    SingleQuoted(String),
    /// `"…"` - inner pieces keep their own tags.
    DoubleQuoted(Vec<WordPiece>),
    /// A single backslash-escaped character.
    Escaped(String),
    /// `$NAME`, `${NAME…}` and the special parameters.
    Param(ParamExpansion),
    /// `$(…)` or `` `…` ``.
    CommandSub { script: Box<Script>, backquoted: bool },
    /// `$((…))`.
    ArithSub(ArithExpr),
    /// `<(…)` / `>(…)`.
    ProcessSub {
        script: Box<Script>,
        direction: ProcessSubDirection,
    },
    /// `{a,b}` / `{1..9}` alternation; expanded before everything else.
    Brace(BraceExpr),
    /// Leading `~` or `~user`.
    Tilde { user: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSubDirection {
    In,  // <(…)
    Out, // >(…)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BraceExpr {
    pub items: Vec<BraceItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BraceItem {
    Word(Word),
    NumericRange {
        start: i64,
        end: i64,
        step: i64,
        /// Zero-pad to this width when either endpoint had leading zeros.
        width: usize,
    },
    CharRange {
        start: char,
        end: char,
        step: i64,
    },
}

// =============================================================================
// PARAMETER EXPANSION
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ParamExpansion {
    /// Variable name or special parameter (`?`, `$`, `!`, `#`, `@`, `*`,
    /// `-`, `0`, positional digits).
    pub name: String,
    /// `${NAME[…]}` subscript.
    pub index: Option<ParamIndex>,
    pub op: Option<ParamOp>,
}

impl ParamExpansion {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
            op: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamIndex {
    /// `[@]`
    All,
    /// `[*]`
    Star,
    /// Arithmetic expression (indexed arrays) or literal key (associative).
    Expr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamOp {
    /// `${#NAME}`
    Length,
    /// `${NAME:-word}` / `${NAME-word}`
    Default { word: Word, check_null: bool },
    /// `${NAME:=word}` / `${NAME=word}`
    AssignDefault { word: Word, check_null: bool },
    /// `${NAME:?word}` / `${NAME?word}`
    ErrorIfUnset { word: Option<Word>, check_null: bool },
    /// `${NAME:+word}` / `${NAME+word}`
    Alternative { word: Word, check_null: bool },
    /// `${NAME#pat}` / `${NAME##pat}`
    RemovePrefix { pattern: Word, greedy: bool },
    /// `${NAME%pat}` / `${NAME%%pat}`
    RemoveSuffix { pattern: Word, greedy: bool },
    /// `${NAME/pat/rep}` family.
    Replace {
        pattern: Word,
        replacement: Option<Word>,
        all: bool,
        anchor: Option<ReplaceAnchor>,
    },
    /// `${NAME^pat}` / `${NAME^^pat}` / `${NAME,pat}` / `${NAME,,pat}`
    CaseMod {
        upper: bool,
        all: bool,
        pattern: Option<Word>,
    },
    /// `${NAME:offset}` / `${NAME:offset:length}`
    Substring {
        offset: ArithExpr,
        length: Option<ArithExpr>,
    },
    /// `${!prefix*}` / `${!prefix@}`
    Names { star: bool },
    /// `${!NAME[@]}` / `${!NAME[*]}`
    Keys { star: bool },
    /// `${!NAME}` indirection.
    Indirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceAnchor {
    Prefix, // /#pat
    Suffix, // /%pat
}

// =============================================================================
// ARITHMETIC EXPRESSIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ArithExpr {
    Number(i64),
    /// Identifier, optionally subscripted: `x`, `arr[i+1]`.
    Var {
        name: String,
        index: Option<Box<ArithExpr>>,
    },
    /// Raw `$…` text expanded (parameter/command/arithmetic) at evaluation
    /// time, then re-parsed as a value.
    Expansion(String),
    Unary {
        op: ArithUnaryOp,
        operand: Box<ArithExpr>,
        postfix: bool,
    },
    Binary {
        op: ArithBinaryOp,
        lhs: Box<ArithExpr>,
        rhs: Box<ArithExpr>,
    },
    Ternary {
        cond: Box<ArithExpr>,
        then: Box<ArithExpr>,
        otherwise: Box<ArithExpr>,
    },
    Assign {
        op: ArithAssignOp,
        name: String,
        index: Option<Box<ArithExpr>>,
        value: Box<ArithExpr>,
    },
    Group(Box<ArithExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithUnaryOp {
    Neg,    // -
    Pos,    // +
    Not,    // !
    BitNot, // ~
    Inc,    // ++
    Dec,    // --
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithAssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    And,
    Xor,
    Or,
}

// =============================================================================
// CONDITIONAL EXPRESSIONS ([[ … ]])
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CondExpr {
    Unary { op: CondUnaryOp, operand: Word },
    Binary { op: CondBinaryOp, lhs: Word, rhs: Word },
    Not(Box<CondExpr>),
    And(Box<CondExpr>, Box<CondExpr>),
    Or(Box<CondExpr>, Box<CondExpr>),
    Group(Box<CondExpr>),
    /// Bare word: true iff non-empty after expansion.
    Bare(Word),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondUnaryOp {
    BlockSpecial,    // -b
    CharSpecial,     // -c
    Directory,       // -d
    Exists,          // -e / -a
    RegularFile,     // -f
    SetGid,          // -g
    Symlink,         // -h / -L
    Sticky,          // -k
    Fifo,            // -p
    Readable,        // -r
    NonEmptyFile,    // -s
    Terminal,        // -t
    SetUid,          // -u
    Writable,        // -w
    Executable,      // -x
    OwnedByEuid,     // -O
    OwnedByEgid,     // -G
    Socket,          // -S
    NonZeroString,   // -n
    ZeroString,      // -z
    OptionSet,       // -o
    VarSet,          // -v
}

impl CondUnaryOp {
    pub fn from_flag(flag: &str) -> Option<Self> {
        Some(match flag {
            "-b" => Self::BlockSpecial,
            "-c" => Self::CharSpecial,
            "-d" => Self::Directory,
            "-e" | "-a" => Self::Exists,
            "-f" => Self::RegularFile,
            "-g" => Self::SetGid,
            "-h" | "-L" => Self::Symlink,
            "-k" => Self::Sticky,
            "-p" => Self::Fifo,
            "-r" => Self::Readable,
            "-s" => Self::NonEmptyFile,
            "-t" => Self::Terminal,
            "-u" => Self::SetUid,
            "-w" => Self::Writable,
            "-x" => Self::Executable,
            "-O" => Self::OwnedByEuid,
            "-G" => Self::OwnedByEgid,
            "-S" => Self::Socket,
            "-n" => Self::NonZeroString,
            "-z" => Self::ZeroString,
            "-o" => Self::OptionSet,
            "-v" => Self::VarSet,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondBinaryOp {
    Eq,        // = / ==  (pattern match)
    Ne,        // !=      (pattern non-match)
    Match,     // =~      (ERE match)
    Lt,        // <       (lexicographic)
    Gt,        // >
    NumEq,     // -eq
    NumNe,     // -ne
    NumLt,     // -lt
    NumLe,     // -le
    NumGt,     // -gt
    NumGe,     // -ge
    NewerThan, // -nt
    OlderThan, // -ot
    SameFile,  // -ef
}

impl CondBinaryOp {
    pub fn from_token(tok: &str) -> Option<Self> {
        Some(match tok {
            "=" | "==" => Self::Eq,
            "!=" => Self::Ne,
            "=~" => Self::Match,
            "<" => Self::Lt,
            ">" => Self::Gt,
            "-eq" => Self::NumEq,
            "-ne" => Self::NumNe,
            "-lt" => Self::NumLt,
            "-le" => Self::NumLe,
            "-gt" => Self::NumGt,
            "-ge" => Self::NumGe,
            "-nt" => Self::NewerThan,
            "-ot" => Self::OlderThan,
            "-ef" => Self::SameFile,
            _ => return None,
        })
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl Script {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl Statement {
    pub fn single(pipeline: Pipeline) -> Self {
        Self {
            pipelines: vec![pipeline],
            operators: Vec::new(),
            background: false,
            source: None,
        }
    }
}

impl Pipeline {
    pub fn single(command: Command) -> Self {
        Self {
            commands: vec![command],
            negated: false,
            timed: false,
            time_posix: false,
        }
    }
}

impl Word {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            pieces: vec![WordPiece::Literal(text.into())],
        }
    }

    pub fn single_quoted(text: impl Into<String>) -> Self {
        Self {
            pieces: vec![WordPiece::SingleQuoted(text.into())],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// True if any piece is quoted (the word can never be removed entirely
    /// by expansion).
    pub fn has_quoting(&self) -> bool {
        self.pieces.iter().any(|p| {
            matches!(
                p,
                WordPiece::SingleQuoted(_) | WordPiece::DoubleQuoted(_) | WordPiece::Escaped(_)
            )
        })
    }

    /// The literal text of the word if it consists only of literal pieces.
    pub fn as_literal(&self) -> Option<String> {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                WordPiece::Literal(s) => out.push_str(s),
                _ => return None,
            }
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_as_literal() {
        let w = Word::literal("hello");
        assert_eq!(w.as_literal().as_deref(), Some("hello"));

        let w = Word {
            pieces: vec![
                WordPiece::Literal("a".into()),
                WordPiece::Param(ParamExpansion::plain("x")),
            ],
        };
        assert_eq!(w.as_literal(), None);
    }

    #[test]
    fn cond_ops_from_tokens() {
        assert_eq!(CondBinaryOp::from_token("=~"), Some(CondBinaryOp::Match));
        assert_eq!(CondBinaryOp::from_token("-nt"), Some(CondBinaryOp::NewerThan));
        assert_eq!(CondBinaryOp::from_token("~="), None);
        assert_eq!(CondUnaryOp::from_flag("-f"), Some(CondUnaryOp::RegularFile));
        assert_eq!(CondUnaryOp::from_flag("-q"), None);
    }

    #[test]
    fn redirect_op_display() {
        assert_eq!(RedirectOp::Append.to_string(), ">>");
        assert_eq!(RedirectOp::HereDocDash.to_string(), "<<-");
        assert_eq!(RedirectOp::WriteBoth.to_string(), "&>");
    }
}
