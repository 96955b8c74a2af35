//! AST execution
//!
//! Walks the parsed tree: statements and and-or lists with short-circuit
//! and errexit semantics, compound commands, loops with break/continue
//! catch points, case and select, subshells, and trap dispatch between
//! commands. Every node yields an exit status and updates `$?`.

use crate::ast::types::*;
use crate::exec::command_sub::flush_and_exit;
use crate::exec::error::ExecError;
use crate::exec::redirect;
use crate::expand::{arith, Expander};
use crate::jobs::signals;
use crate::state::{Function, ShellState, TrapAction};
use nix::unistd::{fork, ForkResult, Pid};
use std::io::{BufRead, Write};

const MAX_EXEC_DEPTH: usize = 500;

pub struct Executor {
    depth: usize,
    /// Inside an `if`/`while`/`until`/`&&`/`||` condition: errexit is
    /// suspended.
    in_condition: bool,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self {
            depth: 0,
            in_condition: false,
        }
    }

    /// Run a whole program; returns the last status.
    pub fn run_script(
        &mut self,
        state: &mut ShellState,
        script: &Script,
    ) -> Result<i32, ExecError> {
        let mut status = state.last_status;
        for statement in &script.statements {
            self.dispatch_traps(state)?;
            status = self.run_statement(state, statement)?;
        }
        Ok(status)
    }

    pub(crate) fn run_statement_list(
        &mut self,
        state: &mut ShellState,
        statements: &[Statement],
    ) -> Result<i32, ExecError> {
        let mut status = state.last_status;
        for statement in statements {
            status = self.run_statement(state, statement)?;
        }
        Ok(status)
    }

    /// Run trap actions for any signals that arrived since the last
    /// command; `$?` is preserved around them.
    fn dispatch_traps(&mut self, state: &mut ShellState) -> Result<(), ExecError> {
        for sig in signals::take_pending_traps() {
            let action = state.traps.get(&sig).cloned();
            if let Some(TrapAction::Command(text)) = action {
                let saved = state.last_status;
                if let Ok(script) = crate::parser::parse(&text) {
                    let _ = self.run_script(state, &script);
                }
                state.last_status = saved;
            }
        }
        Ok(())
    }

    // =========================================================================
    // STATEMENTS
    // =========================================================================

    pub(crate) fn run_statement(
        &mut self,
        state: &mut ShellState,
        statement: &Statement,
    ) -> Result<i32, ExecError> {
        self.enter()?;
        let result = self.run_statement_inner(state, statement);
        self.depth -= 1;
        result
    }

    fn enter(&mut self) -> Result<(), ExecError> {
        self.depth += 1;
        if self.depth > MAX_EXEC_DEPTH {
            return Err(ExecError::Expansion(
                "maximum execution depth exceeded".to_string(),
            ));
        }
        Ok(())
    }

    fn run_statement_inner(
        &mut self,
        state: &mut ShellState,
        statement: &Statement,
    ) -> Result<i32, ExecError> {
        if statement.background {
            return self.spawn_background(state, statement);
        }

        let mut status = 0;
        let mut executed_last = false;
        for (i, pipeline) in statement.pipelines.iter().enumerate() {
            if i > 0 {
                let proceed = match statement.operators[i - 1] {
                    AndOrOp::And => status == 0,
                    AndOrOp::Or => status != 0,
                };
                if !proceed {
                    continue;
                }
            }
            // Everything but the final pipeline is a condition.
            let is_last = i + 1 == statement.pipelines.len();
            let saved = self.in_condition;
            if !is_last {
                self.in_condition = true;
            }
            let result = self.run_pipeline(state, pipeline);
            self.in_condition = saved;
            status = result?;
            state.last_status = status;
            executed_last = is_last;
        }

        let negated = statement
            .pipelines
            .last()
            .map(|p| p.negated)
            .unwrap_or(false);
        if status != 0
            && executed_last
            && state.options.errexit
            && !self.in_condition
            && !negated
        {
            return Err(ExecError::Exit(status));
        }

        Ok(status)
    }

    /// `cmd &`: one forked child runs the whole and-or list in its own
    /// process group; a job is registered and `$!` updated.
    fn spawn_background(
        &mut self,
        state: &mut ShellState,
        statement: &Statement,
    ) -> Result<i32, ExecError> {
        let mut foreground = statement.clone();
        foreground.background = false;

        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                signals::reset_for_child();
                let _ = nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0));
                state.in_forked_child = true;
                state.interactive = false;
                let status = match self.run_statement(state, &foreground) {
                    Ok(status) => status,
                    Err(err) => err.status(),
                };
                flush_and_exit(status);
            }
            Ok(ForkResult::Parent { child }) => {
                let _ = nix::unistd::setpgid(child, child);
                let command_text = statement
                    .source
                    .clone()
                    .unwrap_or_else(|| "background job".to_string());
                let id = state.jobs.add(child, vec![child], command_text);
                state.last_bg_pid = Some(child.as_raw());
                if state.interactive {
                    eprintln!("[{}] {}", id, child.as_raw());
                }
                Ok(0)
            }
            Err(e) => {
                eprintln!("rush: fork failed: {}", e);
                Ok(1)
            }
        }
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    pub(crate) fn run_command_in_shell(
        &mut self,
        state: &mut ShellState,
        command: &Command,
    ) -> Result<i32, ExecError> {
        match command {
            Command::Simple(simple) => self.run_simple(state, simple),
            Command::Compound(compound) => self.run_compound(state, compound),
            Command::FunctionDef(def) => {
                if let Some(existing) = state.functions.get(&def.name) {
                    if existing.readonly {
                        eprintln!("rush: {}: readonly function", def.name);
                        return Ok(1);
                    }
                }
                state.functions.insert(
                    def.name.clone(),
                    Function {
                        body: (*def.body).clone(),
                        redirects: def.redirects.clone(),
                        readonly: false,
                    },
                );
                Ok(0)
            }
            Command::Break { level } => {
                if state.loop_depth == 0 {
                    eprintln!("rush: break: only meaningful in a `for', `while', or `until' loop");
                    return Ok(0);
                }
                Err(ExecError::Break((*level).max(1).min(state.loop_depth)))
            }
            Command::Continue { level } => {
                if state.loop_depth == 0 {
                    eprintln!(
                        "rush: continue: only meaningful in a `for', `while', or `until' loop"
                    );
                    return Ok(0);
                }
                Err(ExecError::Continue((*level).max(1).min(state.loop_depth)))
            }
        }
    }

    pub(crate) fn run_compound(
        &mut self,
        state: &mut ShellState,
        compound: &CompoundCommand,
    ) -> Result<i32, ExecError> {
        // Subshells apply their redirections in the child.
        if let CompoundCommand::Subshell(node) = compound {
            return self.run_subshell(state, node);
        }

        let guard = {
            let mut ex = Expander::new(state);
            match redirect::apply_redirects(&mut ex, compound.redirects(), false) {
                Ok(guard) => guard,
                Err(ExecError::Redirect(msg)) => {
                    eprintln!("rush: {}", msg);
                    return Ok(1);
                }
                Err(other) => return Err(other),
            }
        };

        let result = match compound {
            CompoundCommand::If(node) => self.run_if(state, node),
            CompoundCommand::While(node) => self.run_loop(state, node, false),
            CompoundCommand::Until(node) => self.run_loop(state, node, true),
            CompoundCommand::For(node) => self.run_for(state, node),
            CompoundCommand::CStyleFor(node) => self.run_c_for(state, node),
            CompoundCommand::Case(node) => self.run_case(state, node),
            CompoundCommand::Select(node) => self.run_select(state, node),
            CompoundCommand::BraceGroup(node) => self.run_statement_list(state, &node.body),
            CompoundCommand::Arith(node) => {
                state.current_line = node.line;
                let mut ex = Expander::new(state);
                let value = arith::eval_arith(&mut ex, &node.expr)?;
                Ok(if value != 0 { 0 } else { 1 })
            }
            CompoundCommand::Cond(node) => {
                let mut ex = Expander::new(state);
                let truth = crate::exec::cond::eval_cond(&mut ex, &node.expr)?;
                Ok(if truth { 0 } else { 1 })
            }
            CompoundCommand::Subshell(_) => unreachable!(),
        };

        drop(guard);
        result
    }

    fn run_condition(
        &mut self,
        state: &mut ShellState,
        statements: &[Statement],
    ) -> Result<i32, ExecError> {
        let saved = self.in_condition;
        self.in_condition = true;
        let result = self.run_statement_list(state, statements);
        self.in_condition = saved;
        result
    }

    fn run_if(&mut self, state: &mut ShellState, node: &IfCommand) -> Result<i32, ExecError> {
        for arm in &node.arms {
            let cond = self.run_condition(state, &arm.condition)?;
            state.last_status = cond;
            if cond == 0 {
                return self.run_statement_list(state, &arm.body);
            }
        }
        if let Some(else_body) = &node.else_body {
            return self.run_statement_list(state, else_body);
        }
        Ok(0)
    }

    fn run_loop(
        &mut self,
        state: &mut ShellState,
        node: &LoopCommand,
        until: bool,
    ) -> Result<i32, ExecError> {
        let mut status = 0;
        loop {
            if signals::take_sigint() {
                if state.interactive {
                    return Ok(130);
                }
                return Err(ExecError::Interrupted);
            }

            let cond = self.run_condition(state, &node.condition)?;
            let proceed = if until { cond != 0 } else { cond == 0 };
            if !proceed {
                break;
            }

            match self.run_loop_body(state, &node.body) {
                LoopOutcome::Normal(s) => status = s,
                LoopOutcome::Break => break,
                LoopOutcome::Continue => continue,
                LoopOutcome::Err(err) => return Err(err),
            }
        }
        Ok(status)
    }

    fn run_for(&mut self, state: &mut ShellState, node: &ForCommand) -> Result<i32, ExecError> {
        let items = match &node.words {
            Some(words) => {
                let mut ex = Expander::new(state);
                ex.expand_words(words)?
            }
            None => state.positional.clone(),
        };

        let mut status = 0;
        for item in items {
            state
                .vars
                .set_scalar(&node.var, item)
                .map_err(|e| ExecError::Expansion(e.to_string()))?;
            match self.run_loop_body(state, &node.body) {
                LoopOutcome::Normal(s) => status = s,
                LoopOutcome::Break => break,
                LoopOutcome::Continue => continue,
                LoopOutcome::Err(err) => return Err(err),
            }
        }
        Ok(status)
    }

    fn run_c_for(
        &mut self,
        state: &mut ShellState,
        node: &CStyleForCommand,
    ) -> Result<i32, ExecError> {
        state.current_line = node.line;
        if let Some(init) = &node.init {
            let mut ex = Expander::new(state);
            arith::eval_arith(&mut ex, init)?;
        }

        let mut status = 0;
        loop {
            if signals::take_sigint() {
                if state.interactive {
                    return Ok(130);
                }
                return Err(ExecError::Interrupted);
            }

            if let Some(cond) = &node.cond {
                let mut ex = Expander::new(state);
                if arith::eval_arith(&mut ex, cond)? == 0 {
                    break;
                }
            }

            let outcome = self.run_loop_body(state, &node.body);
            match outcome {
                LoopOutcome::Normal(s) => status = s,
                LoopOutcome::Break => break,
                LoopOutcome::Continue => {}
                LoopOutcome::Err(err) => return Err(err),
            }

            if let Some(update) = &node.update {
                let mut ex = Expander::new(state);
                arith::eval_arith(&mut ex, update)?;
            }
        }
        Ok(status)
    }

    /// One iteration of a loop body, turning break/continue sentinels into
    /// outcomes for this loop level.
    fn run_loop_body(&mut self, state: &mut ShellState, body: &[Statement]) -> LoopOutcome {
        state.loop_depth += 1;
        let result = self.run_statement_list(state, body);
        state.loop_depth -= 1;

        match result {
            Ok(status) => LoopOutcome::Normal(status),
            Err(ExecError::Break(n)) => {
                if n > 1 {
                    LoopOutcome::Err(ExecError::Break(n - 1))
                } else {
                    LoopOutcome::Break
                }
            }
            Err(ExecError::Continue(n)) => {
                if n > 1 {
                    LoopOutcome::Err(ExecError::Continue(n - 1))
                } else {
                    LoopOutcome::Continue
                }
            }
            Err(err) => LoopOutcome::Err(err),
        }
    }

    fn run_case(&mut self, state: &mut ShellState, node: &CaseCommand) -> Result<i32, ExecError> {
        let subject = {
            let mut ex = Expander::new(state);
            ex.expand_single(&node.subject)?
        };
        let nocase = state.shopts.nocasematch;

        let mut status = 0;
        let mut fall_through = false;
        for arm in &node.arms {
            let mut matched = fall_through;
            if !matched {
                for pattern_word in &arm.patterns {
                    let mut ex = Expander::new(state);
                    let pattern = ex.expand_pattern_word(pattern_word)?;
                    if crate::expand::pattern::pattern_match(&pattern, &subject, nocase) {
                        matched = true;
                        break;
                    }
                }
            }
            if !matched {
                continue;
            }

            status = self.run_statement_list(state, &arm.body)?;
            match arm.terminator {
                CaseTerminator::Break => return Ok(status),
                CaseTerminator::FallThrough => {
                    fall_through = true;
                }
                CaseTerminator::ContinueMatching => {
                    fall_through = false;
                }
            }
        }
        Ok(status)
    }

    fn run_select(
        &mut self,
        state: &mut ShellState,
        node: &SelectCommand,
    ) -> Result<i32, ExecError> {
        let items = match &node.words {
            Some(words) => {
                let mut ex = Expander::new(state);
                ex.expand_words(words)?
            }
            None => state.positional.clone(),
        };

        let mut status = 0;
        let mut show_menu = true;
        loop {
            if show_menu {
                for (i, item) in items.iter().enumerate() {
                    eprintln!("{}) {}", i + 1, item);
                }
                show_menu = false;
            }
            let ps3 = state.vars.get_string("PS3").unwrap_or_else(|| "#? ".into());
            eprint!("{}", ps3);
            let _ = std::io::stderr().flush();

            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let reply = line.trim().to_string();
            if reply.is_empty() {
                show_menu = true;
                continue;
            }
            let _ = state.vars.set_scalar("REPLY", reply.clone());

            let chosen = reply
                .parse::<usize>()
                .ok()
                .and_then(|n| items.get(n.wrapping_sub(1)))
                .cloned()
                .unwrap_or_default();
            state
                .vars
                .set_scalar(&node.var, chosen)
                .map_err(|e| ExecError::Expansion(e.to_string()))?;

            match self.run_loop_body(state, &node.body) {
                LoopOutcome::Normal(s) => status = s,
                LoopOutcome::Break => break,
                LoopOutcome::Continue => continue,
                LoopOutcome::Err(err) => return Err(err),
            }
        }
        Ok(status)
    }

    /// `( … )`: fork; the child executes in-process and exits; variable
    /// and directory changes never reach the parent.
    fn run_subshell(
        &mut self,
        state: &mut ShellState,
        node: &GroupCommand,
    ) -> Result<i32, ExecError> {
        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                state.in_forked_child = true;
                state.loop_depth = 0;
                {
                    let mut ex = Expander::new(state);
                    if let Err(err) = redirect::apply_redirects(&mut ex, &node.redirects, true) {
                        eprintln!("rush: {}", err);
                        flush_and_exit(1);
                    }
                }
                let status = match self.run_statement_list(state, &node.body) {
                    Ok(status) => status,
                    Err(err) => err.status(),
                };
                flush_and_exit(status);
            }
            Ok(ForkResult::Parent { child }) => {
                Ok(crate::exec::simple::wait_for_foreground(state, child))
            }
            Err(e) => {
                eprintln!("rush: fork failed: {}", e);
                Ok(1)
            }
        }
    }
}

enum LoopOutcome {
    Normal(i32),
    Break,
    Continue,
    Err(ExecError),
}
