use crate::language::ast::*;
use crate::runtime::{
    context::{Binding, Context},
    error::{RuntimeError, RuntimeResult},
};

/// Runs one top-level statement. Expression statements return (and surface)
/// their value; every other statement returns 0.
pub fn interpret<'ast>(statement: &'ast Statement, ctx: &mut Context<'ast>) -> RuntimeResult<f64> {
    ctx.interpret(statement)
}

impl<'ast> Context<'ast> {
    pub fn interpret(&mut self, statement: &'ast Statement) -> RuntimeResult<f64> {
        self.reset_steps();
        match statement {
            Statement::Expr(expr) => {
                self.tick()?;
                self.expression_statement(expr)
            }
            other => {
                self.execute(other)?;
                Ok(0.0)
            }
        }
    }

    pub fn execute(&mut self, statement: &'ast Statement) -> RuntimeResult<()> {
        self.tick()?;
        match statement {
            Statement::Expr(expr) => {
                self.expression_statement(expr)?;
            }
            Statement::Block(block) => self.execute_block(block)?,
            Statement::If(branch) => {
                if self.evaluate(&branch.condition)? != 0.0 {
                    self.execute(&branch.then_branch)?;
                } else if let Some(otherwise) = &branch.else_branch {
                    self.execute(otherwise)?;
                }
            }
            Statement::While(node) => {
                while self.evaluate(&node.condition)? != 0.0 {
                    self.execute(&node.body)?;
                }
            }
            Statement::Function(def) => self.register_function(def),
        }
        Ok(())
    }

    pub fn execute_block(&mut self, block: &'ast Block) -> RuntimeResult<()> {
        self.push_scope();
        let outcome = block
            .statements
            .iter()
            .try_for_each(|statement| self.execute(statement));
        self.pop_scope();
        outcome
    }

    pub fn evaluate(&mut self, expr: &'ast Expr) -> RuntimeResult<f64> {
        match expr {
            Expr::Number(value) => Ok(*value),
            Expr::Binary { op, left, right } => {
                let lhs = self.evaluate(left)?;
                let rhs = self.evaluate(right)?;
                Ok(op.apply(lhs, rhs))
            }
            Expr::Identifier(name) => self.read_variable(name),
            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.assign(name, value);
                Ok(value)
            }
            Expr::DeferredAssign { name, value } => {
                self.declare_deferred(name, value);
                self.evaluate(value)
            }
            Expr::Call { name, args } => self.call_function(name, args),
        }
    }

    fn expression_statement(&mut self, expr: &'ast Expr) -> RuntimeResult<f64> {
        let value = self.evaluate(expr)?;
        self.record_result(value);
        self.surface(value)?;
        Ok(value)
    }

    fn read_variable(&mut self, name: &str) -> RuntimeResult<f64> {
        match self.lookup(name) {
            Some(Binding::Number(value)) => Ok(value),
            Some(Binding::Deferred(expr)) => {
                self.descend()?;
                let value = self.evaluate(expr);
                self.ascend();
                value
            }
            None => {
                self.report(RuntimeError::UndefinedVariable {
                    name: name.to_string(),
                });
                Ok(0.0)
            }
        }
    }

    fn call_function(&mut self, name: &str, args: &'ast [Expr]) -> RuntimeResult<f64> {
        let Some(def) = self.function(name) else {
            self.report(RuntimeError::UndefinedFunction {
                name: name.to_string(),
            });
            return Ok(0.0);
        };
        if def.params.len() != args.len() {
            self.report(RuntimeError::ArityMismatch {
                name: name.to_string(),
                expected: def.params.len(),
                received: args.len(),
            });
            return Ok(0.0);
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }

        let frame = self.enter_frame()?;
        for (param, value) in def.params.iter().zip(values) {
            self.assign(param, value);
        }
        let outcome = self.execute_block(&def.body);
        let result = self.leave_frame(frame);
        outcome.map(|_| result)
    }
}
