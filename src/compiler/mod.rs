mod emit;
mod error;
mod scopes;

pub use error::{CodegenError, CodegenResult};
pub use scopes::Slot;

use crate::{language::ast::*, runtime::scope::ScopeStack};
use inkwell::{
    builder::Builder,
    context::Context,
    module::Module,
    targets::{InitializationConfig, Target},
    types::FloatType,
    values::{FunctionValue, PointerValue},
    OptimizationLevel,
};
use std::{collections::HashMap, path::Path};

type InputFn = unsafe extern "C" fn() -> f64;

/// Lowers statements into an LLVM module. Like the interpreter's context, one
/// compiler spans a whole session: variables declared by one input stay
/// visible to the next through module globals.
pub struct Compiler<'ast, 'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    f64_type: FloatType<'ctx>,
    scopes: ScopeStack<Slot<'ast, 'ctx>>,
    functions: HashMap<String, FunctionValue<'ctx>>,
    current_function: Option<FunctionValue<'ctx>>,
    /// Result slot of the user function being lowered; `None` at session level.
    result_slot: Option<PointerValue<'ctx>>,
    /// Deferred expressions currently being inlined, for cycle detection.
    inlining: Vec<&'ast Expr>,
    /// Scope depth at the innermost open `if`/`while` body.
    branch_floor: Option<usize>,
    inputs: Vec<FunctionValue<'ctx>>,
    lowered: usize,
    diagnostics: Vec<CodegenError>,
}

impl<'ast, 'ctx> Compiler<'ast, 'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        Self {
            context,
            module: context.create_module(module_name),
            builder: context.create_builder(),
            f64_type: context.f64_type(),
            scopes: ScopeStack::new(),
            functions: HashMap::new(),
            current_function: None,
            result_slot: None,
            inlining: Vec::new(),
            branch_floor: None,
            inputs: Vec::new(),
            lowered: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    pub fn function(&self, name: &str) -> Option<FunctionValue<'ctx>> {
        self.functions.get(name).copied()
    }

    /// Successfully lowered `__input-N` functions, in input order.
    pub fn inputs(&self) -> &[FunctionValue<'ctx>] {
        &self.inputs
    }

    /// Lowers one top-level statement into a fresh `__input-N() -> f64`.
    /// On error the partial function is removed from the module.
    pub fn lower(&mut self, statement: &'ast Statement) -> CodegenResult<FunctionValue<'ctx>> {
        let name = format!("__input-{}", self.lowered);
        self.lowered += 1;
        let function = self
            .module
            .add_function(&name, self.f64_type.fn_type(&[], false), None);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        self.current_function = Some(function);
        let outcome = self.lower_input(statement, function, &name);
        self.current_function = None;

        match outcome {
            Ok(()) => {
                tracing::debug!(input = %name, kind = %statement.kind(), "lowered input");
                self.inputs.push(function);
                Ok(function)
            }
            Err(err) => {
                self.builder.clear_insertion_position();
                // SAFETY: the function was created above and nothing else refers to it.
                unsafe { function.delete() };
                Err(err)
            }
        }
    }

    fn lower_input(
        &mut self,
        statement: &'ast Statement,
        function: FunctionValue<'ctx>,
        name: &str,
    ) -> CodegenResult<()> {
        let value = match statement {
            Statement::Expr(expr) => self.lower_expr(expr)?,
            other => {
                self.lower_statement(other)?;
                self.f64_type.const_zero()
            }
        };
        self.builder.build_return(Some(&value))?;
        if !function.verify(false) {
            return Err(CodegenError::InvalidFunction {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// JIT-compiles the module and calls every input function in order.
    /// The module is handed to the execution engine, so this runs once per
    /// compiler.
    pub fn run(&self) -> CodegenResult<Vec<f64>> {
        Target::initialize_native(&InitializationConfig::default()).map_err(CodegenError::Jit)?;
        let engine = self
            .module
            .create_jit_execution_engine(OptimizationLevel::None)
            .map_err(|e| CodegenError::Jit(e.to_string()))?;

        let mut results = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let name = input.get_name().to_string_lossy().into_owned();
            // SAFETY: every input function is generated with the `() -> f64` signature.
            let value = unsafe {
                let compiled = engine
                    .get_function::<InputFn>(&name)
                    .map_err(|e| CodegenError::Jit(format!("{name}: {e}")))?;
                compiled.call()
            };
            results.push(value);
        }
        Ok(results)
    }

    pub fn print_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn write_ir_to<P: AsRef<Path>>(&self, path: P) -> CodegenResult<()> {
        self.module
            .print_to_file(path)
            .map_err(|e| CodegenError::WriteIr(e.to_string()))
    }

    pub fn verify(&self) -> CodegenResult<()> {
        self.module
            .verify()
            .map_err(|e| CodegenError::InvalidModule(e.to_string()))
    }

    pub fn diagnostics(&self) -> &[CodegenError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<CodegenError> {
        std::mem::take(&mut self.diagnostics)
    }

    fn warn(&mut self, warning: CodegenError) {
        tracing::warn!("{warning}");
        self.diagnostics.push(warning);
    }
}

/// Lowers one top-level statement against the compiler's session state.
pub fn lower<'ast, 'ctx>(
    statement: &'ast Statement,
    compiler: &mut Compiler<'ast, 'ctx>,
) -> CodegenResult<FunctionValue<'ctx>> {
    compiler.lower(statement)
}
