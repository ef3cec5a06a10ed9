//! AST for the transform DSL.

/// A parsed transform routine: exactly one `def` with one parameter.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub param: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Assign { target: AssignTarget, value: Expr },
    AugAssign { name: String, op: BinOp, value: Expr },
    Return(Option<Expr>),
    If {
        /// `(condition, suite)` for the `if` and each `elif`, in order.
        branches: Vec<(Expr, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
    },
    For { var: String, iter: Expr, body: Vec<Stmt> },
    While { cond: Expr, body: Vec<Stmt> },
    Break,
    Continue,
    Pass,
    /// `import x` / `from x import y`: checked against the module
    /// allow-list at runtime, otherwise a no-op.
    Import(String),
    Expr(Expr),
}

/// Assignable places. Nested targets are intentionally not supported.
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Name(String),
    /// `name[key] = value`
    Index { name: String, index: Expr },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone)]
pub enum Expr {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    BoolChain {
        op: BoolOp,
        terms: Vec<Expr>,
    },
    Compare {
        lhs: Box<Expr>,
        /// Chained comparisons: `a < b <= c` evaluates pairwise.
        ops: Vec<(CmpOp, Expr)>,
    },
    /// `then if test else orelse`
    Cond {
        test: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Attr {
        obj: Box<Expr>,
        name: String,
    },
    Index {
        obj: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        obj: Box<Expr>,
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
}
