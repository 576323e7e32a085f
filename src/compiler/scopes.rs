use super::*;
use inkwell::{basic_block::BasicBlock, values::FloatValue};

/// What a name is bound to while lowering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Slot<'ast, 'ctx> {
    /// A module global (session level) or an entry-block `alloca`.
    Storage(PointerValue<'ctx>),
    /// Lowered inline at every read.
    Deferred(&'ast Expr),
}

/// Generator state of the enclosing code, saved while a function body is lowered.
pub(super) struct FunctionFrame<'ast, 'ctx> {
    scopes: ScopeStack<Slot<'ast, 'ctx>>,
    block: Option<BasicBlock<'ctx>>,
    function: Option<FunctionValue<'ctx>>,
    result_slot: Option<PointerValue<'ctx>>,
    branch_floor: Option<usize>,
}

impl<'ast, 'ctx> Compiler<'ast, 'ctx> {
    pub(super) fn current_function(&self) -> CodegenResult<FunctionValue<'ctx>> {
        self.current_function
            .ok_or_else(|| CodegenError::InvalidFunction {
                name: "<no enclosing function>".to_string(),
            })
    }

    pub(super) fn enter_function(
        &mut self,
        function: FunctionValue<'ctx>,
    ) -> FunctionFrame<'ast, 'ctx> {
        let frame = FunctionFrame {
            scopes: std::mem::take(&mut self.scopes),
            block: self.builder.get_insert_block(),
            function: self.current_function.replace(function),
            result_slot: self.result_slot.take(),
            branch_floor: self.branch_floor.take(),
        };
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);
        frame
    }

    pub(super) fn leave_function(&mut self, frame: FunctionFrame<'ast, 'ctx>) {
        self.scopes = frame.scopes;
        self.current_function = frame.function;
        self.result_slot = frame.result_slot;
        self.branch_floor = frame.branch_floor;
        match frame.block {
            Some(block) => self.builder.position_at_end(block),
            None => self.builder.clear_insertion_position(),
        }
    }

    /// Storage for an assignment: the nearest existing slot, otherwise a new
    /// one in the innermost scope. A deferred slot is replaced in place.
    pub(super) fn storage_for(&mut self, name: &str) -> CodegenResult<PointerValue<'ctx>> {
        let found = self.scopes.resolve(name).map(|(index, slot)| (index, *slot));
        let index = match found {
            Some((_, Slot::Storage(ptr))) => return Ok(ptr),
            Some((index, Slot::Deferred(_))) => {
                self.check_unconditional(name, index)?;
                index
            }
            None => self.scopes.innermost(),
        };
        let ptr = self.allocate(name, index)?;
        self.scopes.insert_at(index, name, Slot::Storage(ptr));
        Ok(ptr)
    }

    pub(super) fn bind_deferred(&mut self, name: &str, expr: &'ast Expr) -> CodegenResult<()> {
        let index = self
            .scopes
            .resolve(name)
            .map(|(index, _)| index)
            .unwrap_or_else(|| self.scopes.innermost());
        self.check_unconditional(name, index)?;
        self.scopes.insert_at(index, name, Slot::Deferred(expr));
        Ok(())
    }

    /// Inside an `if`/`while` body a deferred slot may only change in a scope
    /// opened within that body.
    fn check_unconditional(&self, name: &str, scope: usize) -> CodegenResult<()> {
        match self.branch_floor {
            Some(floor) if scope < floor => Err(CodegenError::DeferredUnderBranch {
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Lowers `lower` as a conditionally executed body. Scopes opened inside
    /// it sit at or above the floor.
    pub(super) fn in_branch<T>(
        &mut self,
        lower: impl FnOnce(&mut Self) -> CodegenResult<T>,
    ) -> CodegenResult<T> {
        let outer = self.branch_floor.replace(self.scopes.depth());
        let outcome = lower(self);
        self.branch_floor = outer;
        outcome
    }

    pub(super) fn bind_storage(&mut self, name: &str, ptr: PointerValue<'ctx>) {
        self.scopes.insert_at(0, name, Slot::Storage(ptr));
    }

    pub(super) fn load_variable(&mut self, name: &str) -> CodegenResult<FloatValue<'ctx>> {
        match self.scopes.lookup(name).copied() {
            Some(Slot::Storage(ptr)) => Ok(self.builder.build_load(ptr, name)?.into_float_value()),
            Some(Slot::Deferred(expr)) => self.inline_deferred(name, expr),
            None => Err(CodegenError::UnknownVariable {
                name: name.to_string(),
            }),
        }
    }

    fn inline_deferred(&mut self, name: &str, expr: &'ast Expr) -> CodegenResult<FloatValue<'ctx>> {
        if self.inlining.iter().any(|active| std::ptr::eq(*active, expr)) {
            return Err(CodegenError::CyclicDeferred {
                name: name.to_string(),
            });
        }
        self.inlining.push(expr);
        let value = self.lower_expr(expr);
        self.inlining.pop();
        value
    }

    fn allocate(&mut self, name: &str, scope: usize) -> CodegenResult<PointerValue<'ctx>> {
        if scope == 0 && self.result_slot.is_none() {
            let global = self.module.add_global(self.f64_type, None, name);
            global.set_initializer(&self.f64_type.const_zero());
            tracing::debug!(name, "declared session global");
            return Ok(global.as_pointer_value());
        }
        self.entry_alloca(name)
    }

    /// Allocas live at the top of the entry block and start out as 0.0, which
    /// is what reading a never-assigned name yields.
    pub(super) fn entry_alloca(&self, name: &str) -> CodegenResult<PointerValue<'ctx>> {
        let function = self.current_function()?;
        let entry = function
            .get_first_basic_block()
            .ok_or_else(|| CodegenError::InvalidFunction {
                name: function.get_name().to_string_lossy().into_owned(),
            })?;
        let builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => builder.position_before(&first),
            None => builder.position_at_end(entry),
        }
        let slot = builder.build_alloca(self.f64_type, name)?;
        builder.build_store(slot, self.f64_type.const_zero())?;
        Ok(slot)
    }
}
