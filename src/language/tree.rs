//! Structured document view of a syntax tree, used for `--tree` dumps.
//!
//! The document mirrors the tree shape only; building it never touches any
//! interpreter or compiler state.

use crate::language::ast::*;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum TreeDocument<'a> {
    Program {
        children: Vec<TreeDocument<'a>>,
    },
    NumberLiteral {
        value: f64,
    },
    BinaryOp {
        operator: &'static str,
        lhs: Box<TreeDocument<'a>>,
        rhs: Box<TreeDocument<'a>>,
    },
    Identifier {
        name: &'a str,
    },
    ValueAssign {
        name: &'a str,
        value: Box<TreeDocument<'a>>,
    },
    DeferredAssign {
        name: &'a str,
        value: Box<TreeDocument<'a>>,
    },
    Block {
        children: Vec<TreeDocument<'a>>,
    },
    If {
        condition: Box<TreeDocument<'a>>,
        then: Box<TreeDocument<'a>>,
        #[serde(rename = "else", skip_serializing_if = "Option::is_none")]
        otherwise: Option<Box<TreeDocument<'a>>>,
    },
    While {
        condition: Box<TreeDocument<'a>>,
        body: Box<TreeDocument<'a>>,
    },
    FunctionDef {
        name: &'a str,
        params: &'a [String],
        body: Box<TreeDocument<'a>>,
    },
    FunctionCall {
        name: &'a str,
        arguments: Vec<TreeDocument<'a>>,
    },
}

impl<'a> TreeDocument<'a> {
    pub fn program(program: &'a Program) -> Self {
        TreeDocument::Program {
            children: program.statements.iter().map(Self::statement).collect(),
        }
    }

    pub fn statement(statement: &'a Statement) -> Self {
        match statement {
            Statement::Expr(expr) => Self::expr(expr),
            Statement::Block(block) => Self::block(block),
            Statement::If(branch) => TreeDocument::If {
                condition: Box::new(Self::expr(&branch.condition)),
                then: Box::new(Self::statement(&branch.then_branch)),
                otherwise: branch
                    .else_branch
                    .as_deref()
                    .map(|other| Box::new(Self::statement(other))),
            },
            Statement::While(node) => TreeDocument::While {
                condition: Box::new(Self::expr(&node.condition)),
                body: Box::new(Self::statement(&node.body)),
            },
            Statement::Function(def) => TreeDocument::FunctionDef {
                name: &def.name,
                params: &def.params,
                body: Box::new(Self::block(&def.body)),
            },
        }
    }

    pub fn expr(expr: &'a Expr) -> Self {
        match expr {
            Expr::Number(value) => TreeDocument::NumberLiteral { value: *value },
            Expr::Binary { op, left, right } => TreeDocument::BinaryOp {
                operator: op.symbol(),
                lhs: Box::new(Self::expr(left)),
                rhs: Box::new(Self::expr(right)),
            },
            Expr::Identifier(name) => TreeDocument::Identifier { name },
            Expr::Assign { name, value } => TreeDocument::ValueAssign {
                name,
                value: Box::new(Self::expr(value)),
            },
            Expr::DeferredAssign { name, value } => TreeDocument::DeferredAssign {
                name,
                value: Box::new(Self::expr(value)),
            },
            Expr::Call { name, args } => TreeDocument::FunctionCall {
                name,
                arguments: args.iter().map(Self::expr).collect(),
            },
        }
    }

    fn block(block: &'a Block) -> Self {
        TreeDocument::Block {
            children: block.statements.iter().map(Self::statement).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parser::parse_source;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn document_mirrors_tree_shape() {
        let program = parse_source("if (x >= 1) { y := x % 2; } f(3);").expect("parse");
        let document = serde_json::to_value(TreeDocument::program(&program)).expect("json");
        assert_eq!(
            document,
            json!({
                "type": "Program",
                "children": [
                    {
                        "type": "If",
                        "condition": {
                            "type": "BinaryOp",
                            "operator": ">=",
                            "lhs": { "type": "Identifier", "name": "x" },
                            "rhs": { "type": "NumberLiteral", "value": 1.0 }
                        },
                        "then": {
                            "type": "Block",
                            "children": [{
                                "type": "DeferredAssign",
                                "name": "y",
                                "value": {
                                    "type": "BinaryOp",
                                    "operator": "%",
                                    "lhs": { "type": "Identifier", "name": "x" },
                                    "rhs": { "type": "NumberLiteral", "value": 2.0 }
                                }
                            }]
                        }
                    },
                    {
                        "type": "FunctionCall",
                        "name": "f",
                        "arguments": [{ "type": "NumberLiteral", "value": 3.0 }]
                    }
                ]
            })
        );
    }

    #[test]
    fn function_document_lists_params() {
        let program = parse_source("fn id(a) { a; }").expect("parse");
        let document = serde_json::to_value(TreeDocument::program(&program)).expect("json");
        assert_eq!(document["children"][0]["type"], "FunctionDef");
        assert_eq!(document["children"][0]["params"], json!(["a"]));
        assert_eq!(document["children"][0]["body"]["type"], "Block");
    }
}
