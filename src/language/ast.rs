use std::fmt;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// Every node kind the front end produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    NumberLiteral,
    BinaryOp,
    Identifier,
    ValueAssign,
    DeferredAssign,
    Block,
    If,
    While,
    FunctionDef,
    FunctionCall,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Produces a number when evaluated.
    Expression,
    /// Executed for effect only.
    Statement,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Expr(Expr),
    Block(Block),
    If(IfStatement),
    While(WhileStatement),
    Function(FunctionDef),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Identifier(String),
    Assign {
        name: String,
        value: Box<Expr>,
    },
    DeferredAssign {
        name: String,
        value: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStatement {
    pub condition: Expr,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStatement {
    pub condition: Expr,
    pub body: Box<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }
}

impl Statement {
    pub fn kind(&self) -> NodeKind {
        match self {
            Statement::Expr(expr) => expr.kind(),
            Statement::Block(_) => NodeKind::Block,
            Statement::If(_) => NodeKind::If,
            Statement::While(_) => NodeKind::While,
            Statement::Function(_) => NodeKind::FunctionDef,
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            Statement::Expr(_) => Capability::Expression,
            _ => Capability::Statement,
        }
    }
}

impl Expr {
    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Number(_) => NodeKind::NumberLiteral,
            Expr::Binary { .. } => NodeKind::BinaryOp,
            Expr::Identifier(_) => NodeKind::Identifier,
            Expr::Assign { .. } => NodeKind::ValueAssign,
            Expr::DeferredAssign { .. } => NodeKind::DeferredAssign,
            Expr::Call { .. } => NodeKind::FunctionCall,
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Expr::Assign {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn deferred(name: impl Into<String>, value: Expr) -> Self {
        Expr::DeferredAssign {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
        }
    }

    /// Native `f64` semantics; comparisons yield exactly 1.0 or 0.0.
    pub fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        let truth = |b: bool| if b { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Rem => lhs % rhs,
            BinaryOp::Gt => truth(lhs > rhs),
            BinaryOp::Lt => truth(lhs < rhs),
            BinaryOp::Ge => truth(lhs >= rhs),
            BinaryOp::Le => truth(lhs <= rhs),
            BinaryOp::Eq => truth(lhs == rhs),
            BinaryOp::Ne => truth(lhs != rhs),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::NumberLiteral => "NumberLiteral",
            NodeKind::BinaryOp => "BinaryOp",
            NodeKind::Identifier => "Identifier",
            NodeKind::ValueAssign => "ValueAssign",
            NodeKind::DeferredAssign => "DeferredAssign",
            NodeKind::Block => "Block",
            NodeKind::If => "If",
            NodeKind::While => "While",
            NodeKind::FunctionDef => "FunctionDef",
            NodeKind::FunctionCall => "FunctionCall",
        };
        f.write_str(name)
    }
}
