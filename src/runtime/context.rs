use crate::language::ast::{Expr, FunctionDef};
use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    scope::ScopeStack,
};
use std::collections::HashMap;
use std::io::{self, Write};

/// Reserved binding holding a function body's result.
pub const RETURN_SLOT: &str = "$ret";

pub const DEFAULT_MAX_DEPTH: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Binding<'ast> {
    Number(f64),
    /// Re-evaluated against the current context on every read.
    Deferred(&'ast Expr),
}

/// Interpreter state for one session. Trees evaluated against a context must
/// outlive it, since deferred bindings and registered functions borrow them.
pub struct Context<'ast> {
    scopes: ScopeStack<Binding<'ast>>,
    functions: HashMap<String, &'ast FunctionDef>,
    output: Box<dyn Write>,
    suppress_output: bool,
    frames: usize,
    depth: usize,
    max_depth: usize,
    step_limit: Option<u64>,
    steps: u64,
    diagnostics: Vec<RuntimeError>,
}

/// Caller state saved while a function body runs; hand it back to
/// [`Context::leave_frame`].
#[must_use]
pub struct Frame<'ast> {
    scopes: ScopeStack<Binding<'ast>>,
    suppress_output: bool,
}

impl<'ast> Default for Context<'ast> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ast> Context<'ast> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    pub fn with_output(output: impl Write + 'static) -> Self {
        Self {
            scopes: ScopeStack::new(),
            functions: HashMap::new(),
            output: Box::new(output),
            suppress_output: false,
            frames: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            step_limit: None,
            steps: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    pub fn push_scope(&mut self) {
        self.scopes.push_scope();
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop_scope();
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn lookup(&self, name: &str) -> Option<Binding<'ast>> {
        self.scopes.lookup(name).copied()
    }

    pub fn assign(&mut self, name: &str, value: f64) {
        self.scopes.assign(name, Binding::Number(value));
    }

    pub fn declare_deferred(&mut self, name: &str, expr: &'ast Expr) {
        self.scopes.assign(name, Binding::Deferred(expr));
    }

    pub fn register_function(&mut self, def: &'ast FunctionDef) {
        let previous = self.functions.insert(def.name.clone(), def);
        tracing::debug!(
            name = %def.name,
            params = def.params.len(),
            replaced = previous.is_some(),
            "registered function"
        );
    }

    pub fn function(&self, name: &str) -> Option<&'ast FunctionDef> {
        self.functions.get(name).copied()
    }

    pub fn output_suppressed(&self) -> bool {
        self.suppress_output
    }

    /// Swaps in a fresh scope stack and silences output for a call.
    pub fn enter_frame(&mut self) -> RuntimeResult<Frame<'ast>> {
        self.descend()?;
        self.frames += 1;
        let frame = Frame {
            scopes: std::mem::take(&mut self.scopes),
            suppress_output: self.suppress_output,
        };
        self.suppress_output = true;
        Ok(frame)
    }

    /// Restores the caller's state and returns the callee's return slot (0 if unset).
    pub fn leave_frame(&mut self, frame: Frame<'ast>) -> f64 {
        let result = match self.scopes.get_at(0, RETURN_SLOT) {
            Some(Binding::Number(value)) => *value,
            _ => 0.0,
        };
        self.scopes = frame.scopes;
        self.suppress_output = frame.suppress_output;
        self.frames -= 1;
        self.ascend();
        result
    }

    /// Stores an expression statement's value in the active frame's return slot.
    pub fn record_result(&mut self, value: f64) {
        if self.frames > 0 {
            self.scopes.insert_at(0, RETURN_SLOT, Binding::Number(value));
        }
    }

    pub fn surface(&mut self, value: f64) -> RuntimeResult<()> {
        if !self.suppress_output {
            writeln!(self.output, "=> {value}")?;
        }
        Ok(())
    }

    pub fn descend(&mut self) -> RuntimeResult<()> {
        if self.depth >= self.max_depth {
            return Err(RuntimeError::RecursionLimit {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn tick(&mut self) -> RuntimeResult<()> {
        self.steps += 1;
        match self.step_limit {
            Some(limit) if self.steps > limit => Err(RuntimeError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    /// Starts a fresh step budget; called once per top-level statement.
    pub fn reset_steps(&mut self) {
        self.steps = 0;
    }

    pub fn report(&mut self, error: RuntimeError) {
        tracing::warn!("{error}");
        self.diagnostics.push(error);
    }

    pub fn diagnostics(&self) -> &[RuntimeError] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<RuntimeError> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_isolates_and_restores_caller_scopes() {
        let mut ctx = Context::with_output(io::sink());
        ctx.assign("x", 1.0);
        let frame = ctx.enter_frame().expect("frame");
        assert!(ctx.output_suppressed());
        assert_eq!(ctx.lookup("x"), None);
        ctx.assign("x", 9.0);
        ctx.record_result(4.0);
        assert_eq!(ctx.leave_frame(frame), 4.0);
        assert!(!ctx.output_suppressed());
        assert_eq!(ctx.lookup("x"), Some(Binding::Number(1.0)));
        assert_eq!(ctx.lookup(RETURN_SLOT), None);
    }

    #[test]
    fn missing_return_slot_reads_as_zero() {
        let mut ctx = Context::with_output(io::sink());
        let frame = ctx.enter_frame().expect("frame");
        assert_eq!(ctx.leave_frame(frame), 0.0);
    }

    #[test]
    fn results_outside_frames_are_not_recorded() {
        let mut ctx = Context::with_output(io::sink());
        ctx.record_result(3.0);
        assert_eq!(ctx.lookup(RETURN_SLOT), None);
    }

    #[test]
    fn depth_limit_rejects_frames() {
        let mut ctx = Context::with_output(io::sink()).with_max_depth(1);
        let frame = ctx.enter_frame().expect("first frame");
        assert!(matches!(
            ctx.enter_frame(),
            Err(RuntimeError::RecursionLimit { limit: 1 })
        ));
        let _ = ctx.leave_frame(frame);
        assert!(ctx.enter_frame().is_ok());
    }

    #[test]
    fn step_limit_trips_after_budget() {
        let mut ctx = Context::with_output(io::sink()).with_step_limit(2);
        assert!(ctx.tick().is_ok());
        assert!(ctx.tick().is_ok());
        assert!(matches!(
            ctx.tick(),
            Err(RuntimeError::StepLimitExceeded { limit: 2 })
        ));
    }
}
