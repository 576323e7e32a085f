use super::*;
use inkwell::{
    basic_block::BasicBlock,
    types::BasicMetadataTypeEnum,
    values::{BasicMetadataValueEnum, FloatValue, IntValue},
    FloatPredicate,
};

impl<'ast, 'ctx> Compiler<'ast, 'ctx> {
    pub(super) fn lower_expr(&mut self, expr: &'ast Expr) -> CodegenResult<FloatValue<'ctx>> {
        match expr {
            Expr::Number(value) => Ok(self.f64_type.const_float(*value)),
            Expr::Binary { op, left, right } => {
                let lhs = self.lower_expr(left)?;
                let rhs = self.lower_expr(right)?;
                self.lower_binary(*op, lhs, rhs)
            }
            Expr::Identifier(name) => self.load_variable(name),
            Expr::Assign { name, value } => {
                let value = self.lower_expr(value)?;
                let ptr = self.storage_for(name)?;
                self.builder.build_store(ptr, value)?;
                Ok(value)
            }
            Expr::DeferredAssign { name, value } => {
                self.bind_deferred(name, value)?;
                self.lower_expr(value)
            }
            Expr::Call { name, args } => self.lower_call(name, args),
        }
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        lhs: FloatValue<'ctx>,
        rhs: FloatValue<'ctx>,
    ) -> CodegenResult<FloatValue<'ctx>> {
        let predicate = match op {
            BinaryOp::Add => return Ok(self.builder.build_float_add(lhs, rhs, "addtmp")?),
            BinaryOp::Sub => return Ok(self.builder.build_float_sub(lhs, rhs, "subtmp")?),
            BinaryOp::Mul => return Ok(self.builder.build_float_mul(lhs, rhs, "multmp")?),
            BinaryOp::Div => return Ok(self.builder.build_float_div(lhs, rhs, "divtmp")?),
            BinaryOp::Rem => return Ok(self.builder.build_float_rem(lhs, rhs, "remtmp")?),
            BinaryOp::Gt => FloatPredicate::OGT,
            BinaryOp::Lt => FloatPredicate::OLT,
            BinaryOp::Ge => FloatPredicate::OGE,
            BinaryOp::Le => FloatPredicate::OLE,
            BinaryOp::Eq => FloatPredicate::OEQ,
            // Unordered so that NaN != NaN holds, as it does natively.
            BinaryOp::Ne => FloatPredicate::UNE,
        };
        let flag = self
            .builder
            .build_float_compare(predicate, lhs, rhs, "cmptmp")?;
        Ok(self
            .builder
            .build_unsigned_int_to_float(flag, self.f64_type, "booltmp")?)
    }

    fn lower_call(&mut self, name: &str, args: &'ast [Expr]) -> CodegenResult<FloatValue<'ctx>> {
        let zero = self.f64_type.const_zero();
        let Some(function) = self.function(name) else {
            self.warn(CodegenError::UnknownFunction {
                name: name.to_string(),
            });
            return Ok(zero);
        };
        let expected = function.count_params() as usize;
        if expected != args.len() {
            self.warn(CodegenError::ArityMismatch {
                name: name.to_string(),
                expected,
                received: args.len(),
            });
            return Ok(zero);
        }

        let mut values: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.lower_expr(arg)?.into());
        }
        let call = self.builder.build_call(function, &values, "calltmp")?;
        call.try_as_basic_value()
            .left()
            .map(|value| value.into_float_value())
            .ok_or_else(|| CodegenError::InvalidFunction {
                name: name.to_string(),
            })
    }

    pub(super) fn lower_statement(&mut self, statement: &'ast Statement) -> CodegenResult<()> {
        match statement {
            Statement::Expr(expr) => {
                let value = self.lower_expr(expr)?;
                if let Some(slot) = self.result_slot {
                    self.builder.build_store(slot, value)?;
                }
                Ok(())
            }
            Statement::Block(block) => self.lower_block(block),
            Statement::If(node) => self.lower_if(node),
            Statement::While(node) => self.lower_while(node),
            Statement::Function(def) => self.lower_function(def),
        }
    }

    fn lower_block(&mut self, block: &'ast Block) -> CodegenResult<()> {
        let function = self.current_function()?;
        let body = self.context.append_basic_block(function, "block");
        self.builder.build_unconditional_branch(body)?;
        self.builder.position_at_end(body);

        self.scopes.push_scope();
        let outcome = block
            .statements
            .iter()
            .try_for_each(|statement| self.lower_statement(statement));
        self.scopes.pop_scope();
        outcome
    }

    fn lower_if(&mut self, node: &'ast IfStatement) -> CodegenResult<()> {
        let function = self.current_function()?;
        let condition = self.lower_condition(&node.condition, "ifcond")?;

        let then_bb = self.context.append_basic_block(function, "then");
        let else_bb = node
            .else_branch
            .as_ref()
            .map(|_| self.context.append_basic_block(function, "else"));
        let merge_bb = self.context.append_basic_block(function, "ifcont");
        self.builder
            .build_conditional_branch(condition, then_bb, else_bb.unwrap_or(merge_bb))?;

        self.populate(function, then_bb)?;
        self.in_branch(|this| this.lower_statement(&node.then_branch))?;
        self.builder.build_unconditional_branch(merge_bb)?;

        if let (Some(else_bb), Some(otherwise)) = (else_bb, &node.else_branch) {
            self.populate(function, else_bb)?;
            self.in_branch(|this| this.lower_statement(otherwise))?;
            self.builder.build_unconditional_branch(merge_bb)?;
        }

        self.populate(function, merge_bb)
    }

    fn lower_while(&mut self, node: &'ast WhileStatement) -> CodegenResult<()> {
        let function = self.current_function()?;
        let cond_bb = self.context.append_basic_block(function, "loopcond");
        let body_bb = self.context.append_basic_block(function, "loop");
        let after_bb = self.context.append_basic_block(function, "afterloop");
        self.builder.build_unconditional_branch(cond_bb)?;

        self.populate(function, cond_bb)?;
        let condition = self.lower_condition(&node.condition, "loopcond")?;
        self.builder
            .build_conditional_branch(condition, body_bb, after_bb)?;

        self.populate(function, body_bb)?;
        self.in_branch(|this| this.lower_statement(&node.body))?;
        self.builder.build_unconditional_branch(cond_bb)?;

        self.populate(function, after_bb)
    }

    fn lower_condition(
        &mut self,
        condition: &'ast Expr,
        name: &str,
    ) -> CodegenResult<IntValue<'ctx>> {
        let value = self.lower_expr(condition)?;
        Ok(self.builder.build_float_compare(
            FloatPredicate::UNE,
            value,
            self.f64_type.const_zero(),
            name,
        )?)
    }

    /// Moves `block` behind everything emitted so far and makes it the cursor.
    fn populate(&self, function: FunctionValue<'ctx>, block: BasicBlock<'ctx>) -> CodegenResult<()> {
        if let Some(last) = function.get_last_basic_block() {
            if last != block {
                block
                    .move_after(last)
                    .map_err(|()| CodegenError::InvalidFunction {
                        name: function.get_name().to_string_lossy().into_owned(),
                    })?;
            }
        }
        self.builder.position_at_end(block);
        Ok(())
    }

    fn lower_function(&mut self, def: &'ast FunctionDef) -> CodegenResult<()> {
        let params: Vec<BasicMetadataTypeEnum<'ctx>> = vec![self.f64_type.into(); def.params.len()];
        let function = self
            .module
            .add_function(&def.name, self.f64_type.fn_type(&params, false), None);
        // Registered before the body so recursive calls resolve.
        let previous = self.functions.insert(def.name.clone(), function);

        let frame = self.enter_function(function);
        let outcome = self.lower_function_body(def, function);
        self.leave_function(frame);

        match outcome {
            Ok(()) => {
                tracing::debug!(
                    name = %def.name,
                    params = def.params.len(),
                    replaced = previous.is_some(),
                    "lowered function"
                );
                Ok(())
            }
            Err(err) => {
                match previous {
                    Some(previous) => self.functions.insert(def.name.clone(), previous),
                    None => self.functions.remove(&def.name),
                };
                // SAFETY: the half-built function is unreachable once unregistered;
                // calls to it from its own body are deleted with it.
                unsafe { function.delete() };
                Err(err)
            }
        }
    }

    fn lower_function_body(
        &mut self,
        def: &'ast FunctionDef,
        function: FunctionValue<'ctx>,
    ) -> CodegenResult<()> {
        let result = self.entry_alloca("result")?;
        self.result_slot = Some(result);

        for (index, name) in def.params.iter().enumerate() {
            let param = function
                .get_nth_param(index as u32)
                .ok_or_else(|| CodegenError::InvalidFunction {
                    name: def.name.clone(),
                })?
                .into_float_value();
            param.set_name(name);
            let slot = self.entry_alloca(name)?;
            self.builder.build_store(slot, param)?;
            self.bind_storage(name, slot);
        }

        self.lower_block(&def.body)?;
        let value = self.builder.build_load(result, "ret")?;
        self.builder.build_return(Some(&value))?;

        if function.verify(false) {
            Ok(())
        } else {
            Err(CodegenError::InvalidFunction {
                name: def.name.clone(),
            })
        }
    }
}
