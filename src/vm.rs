use crate::config::Options;
use crate::error::SysError;
use crate::game::Game;
use crate::host::Host;
use crate::instruction::{CurVar, Instruction, Op};
use crate::msg::Msg;
use crate::save::{restore_game, save_game};
use crate::set::Set;
use crate::stack::{Stack, Value};
use crate::state::UndoStack;
use crate::text::strip;
use crate::world::{AttributeValue, World};
use crate::zrand::ZRand;
use log::{debug, info, trace, warn};
use std::io::Write;

/// Deepest nesting of executing blocks
const MAX_DEPTH: usize = 1000;

/// Transitivity operand of WHERE, IN, AT, HERE, NEAR, NEARBY, CONTSIZE and CONTMEMB
pub const TRANSITIVE: i32 = 0;
pub const DIRECT: i32 = 1;

/// Outcome of executing an instruction or a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Continue with the next instruction
    Continue,
    /// Block finished with RETURN
    Returned,
    /// The player asked to quit
    Quit,
}

/// Values readable through CURVAR instructions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub location: i32,
    pub actor: i32,
    pub verb: i32,
    pub instance: i32,
    /// Instance ids of the command's parameters, literals included
    pub params: Vec<i32>,
    /// Visits mode set by the VISITS instruction
    pub visits: i32,
}

/// The bytecode machine and everything it executes against
pub struct Vm {
    pub game: Game,
    pub world: World,
    pub stack: Stack,
    pub undo: UndoStack,
    pub rand: ZRand,
    pub context: Context,
    pub options: Options,
    /// Start addresses of the blocks currently executing
    active: Vec<usize>,
    /// Lines printed since the last MORE pause
    lines: usize,
    save_name: String,
}

fn direct(transitivity: i32) -> bool {
    transitivity == DIRECT
}

impl Vm {
    pub fn new(game: Game, options: Options) -> Vm {
        let world = World::new(
            game.instances.clone(),
            game.attributes.clone(),
            game.scores.clone(),
            game.header.hero,
        )
        .with_map(game.classes.clone(), game.exits.clone());
        let rand = ZRand::from_seed(options.random_seed);
        let save_name = format!("lantern.{}", options.save_extension);
        Vm {
            game,
            world,
            stack: Stack::new(),
            undo: UndoStack::new(),
            rand,
            context: Context::default(),
            options,
            active: Vec::new(),
            lines: 0,
            save_name,
        }
    }

    pub fn save_name(&self) -> &str {
        &self.save_name
    }

    /// Default save file, used by SAVE/RESTORE instructions and bare `save`
    pub fn set_save_name(&mut self, name: &str) {
        self.save_name = self.save_file_name(name);
    }

    fn save_file_name(&self, name: &str) -> String {
        if name.contains('.') {
            name.to_string()
        } else {
            format!("{}.{}", name, self.options.save_extension)
        }
    }

    /// Forget any partially executed state after an aborted command
    pub fn reset_execution(&mut self) {
        self.stack.clear();
        self.active.clear();
    }

    /// Player has seen the output, restart the MORE count
    pub fn reset_more(&mut self) {
        self.lines = 0;
    }

    pub fn output(&mut self, host: &mut dyn Host, text: &str) -> Result<(), SysError> {
        if self.options.more_lines == 0 {
            return Ok(host.print(text)?);
        }
        let mut rest = text;
        while let Some(newline) = rest.find('\n') {
            host.print(&rest[..=newline])?;
            rest = &rest[newline + 1..];
            self.lines += 1;
            if self.lines >= self.options.more_lines {
                host.more()?;
                self.lines = 0;
            }
        }
        if !rest.is_empty() {
            host.print(rest)?;
        }
        Ok(())
    }

    pub fn message(&mut self, host: &mut dyn Host, msg: Msg) -> Result<(), SysError> {
        self.output(host, &format!("{}\n", msg))
    }

    /// Execute the code block starting at `block` until RETURN
    pub fn execute(
        &mut self,
        block: usize,
        host: &mut dyn Host,
    ) -> Result<ExecutionResult, SysError> {
        if self.active.contains(&block) {
            return Err(SysError::Recursion(block));
        }
        if self.active.len() >= MAX_DEPTH {
            return Err(SysError::CallStackTooDeep(self.active.len()));
        }
        self.active.push(block);
        let result = self.run_block(block, host);
        self.active.pop();
        result
    }

    fn run_block(
        &mut self,
        block: usize,
        host: &mut dyn Host,
    ) -> Result<ExecutionResult, SysError> {
        debug!("Executing block {:#06x}", block);
        let mut pc = block;
        loop {
            let address = pc;
            let instruction = self.game.code.instruction(address)?;
            if self.options.trace_instructions {
                trace!("{:5}: {}", address, instruction);
            }
            pc += 1;
            match instruction {
                Instruction::Constant(value) => self.stack.push(value)?,
                Instruction::CurVar(var) => {
                    let value = self.current_variable(var)?;
                    self.stack.push(value)?;
                }
                Instruction::Statement(op) => {
                    match self.execute_op(op, address, &mut pc, host)? {
                        ExecutionResult::Continue => {}
                        result => return Ok(result),
                    }
                }
            }
            if self.options.trace_stack {
                trace!("       stack: {}", self.stack);
            }
        }
    }

    fn current_variable(&mut self, var: CurVar) -> Result<i32, SysError> {
        Ok(match var {
            CurVar::Param => {
                let n = self.stack.pop_int()?;
                if n < 1 || n as usize > self.context.params.len() {
                    return Err(SysError::IndexOutOfRange(format!(
                        "parameter {} of {}",
                        n,
                        self.context.params.len()
                    )));
                }
                self.context.params[n as usize - 1]
            }
            CurVar::CurLoc => self.context.location,
            CurVar::CurAct => self.context.actor,
            CurVar::CurVrb => self.context.verb,
            CurVar::CurIns => self.context.instance,
            CurVar::Score => self.world.score,
            CurVar::MaxInstance => self.world.instance_max() as i32,
        })
    }

    /// Text for SAY of an instance or a literal
    fn instance_text(&self, id: i32) -> Result<String, SysError> {
        if self.world.is_literal(id) {
            return match self.world.get_attribute(id, 1) {
                Ok(n) => Ok(n.to_string()),
                Err(_) => self.world.get_string_attribute(id, 1),
            };
        }
        let id = self.world.verify_instance(id, "SAY")?;
        Ok(self.world.instances[id].name.clone())
    }

    fn jump_target(&self, address: usize) -> Result<usize, SysError> {
        self.game.code.target(address)
    }

    fn execute_op(
        &mut self,
        op: Op,
        address: usize,
        pc: &mut usize,
        host: &mut dyn Host,
    ) -> Result<ExecutionResult, SysError> {
        match op {
            // Output
            Op::Print => {
                let fpos = self.stack.pop_int()?;
                let len = self.stack.pop_int()?;
                let text = self.game.string(fpos, len)?;
                self.output(host, &text)?;
            }
            Op::SayInt => {
                let value = self.stack.pop_int()?;
                self.output(host, &value.to_string())?;
            }
            Op::SayStr => {
                let text = self.stack.pop_text()?;
                self.output(host, &text)?;
            }
            Op::Say => {
                let form = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                trace!("SAY {} form {}", id, form);
                let text = self.instance_text(id)?;
                self.output(host, &text)?;
            }
            Op::GetStr => {
                let fpos = self.stack.pop_int()?;
                let len = self.stack.pop_int()?;
                let text = self.game.string(fpos, len)?;
                self.stack.push(text)?;
            }

            // Stack
            Op::Dup => {
                let top = self.stack.top()?.clone();
                self.stack.push(top)?;
            }
            Op::Pop => {
                self.stack.pop()?;
            }

            // Session
            Op::Quit => return Ok(ExecutionResult::Quit),
            Op::Save => {
                let name = self.save_name.clone();
                let msg = self.save(host, &name)?;
                self.message(host, msg)?;
            }
            Op::Restore => {
                let name = self.save_name.clone();
                let msg = self.restore(host, &name)?;
                self.message(host, msg)?;
            }
            Op::Score => {
                let n = self.stack.pop_int()?;
                if n == 0 {
                    let msg = Msg::Score(self.world.score, self.game.header.maximum_score);
                    self.message(host, msg)?;
                } else {
                    self.world.add_score(n)?;
                }
            }
            Op::Visits => {
                self.context.visits = self.stack.pop_int()?;
            }

            // Events
            Op::Schedule => {
                let event = self.stack.pop_int()?;
                let whr = self.stack.pop_int()?;
                let after = self.stack.pop_int()?;
                self.event_block(event)?;
                self.world.schedule(event, whr, after)?;
                debug!("Scheduled event {} at {} after {}", event, whr, after);
            }
            Op::Cancel => {
                let event = self.stack.pop_int()?;
                self.world.cancel(event);
            }

            // Attributes
            Op::Make => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.stack.pop_bool()?;
                self.world
                    .set_attribute(id, atr, AttributeValue::Scalar(value as i32))?;
            }
            Op::Set => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.stack.pop_int()?;
                self.world.set_attribute(id, atr, AttributeValue::Scalar(value))?;
            }
            Op::SetStr => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.stack.pop_text()?;
                self.world.set_attribute(id, atr, AttributeValue::Text(value))?;
            }
            Op::SetSet => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.stack.pop_set()?;
                self.world.set_attribute(id, atr, AttributeValue::Set(value))?;
            }
            Op::Attribute => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.world.get_attribute(id, atr)?;
                self.stack.push(value)?;
            }
            Op::AttrStr => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.world.get_string_attribute(id, atr)?;
                self.stack.push(value)?;
            }
            Op::AttrSet => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let value = self.world.get_set_attribute(id, atr)?;
                self.stack.push(value)?;
            }

            // Sets
            Op::NewSet => self.stack.push(Set::new())?,
            Op::Union => {
                let set2 = self.stack.pop_set()?;
                let set1 = self.stack.pop_set()?;
                self.stack.push(set1.union(&set2))?;
            }
            Op::Include | Op::Exclude => {
                let member = self.stack.pop_int()?;
                match self.stack.top_mut()? {
                    Value::Set(set) if op == Op::Include => set.add(member as u32),
                    Value::Set(set) => set.remove(member as u32),
                    other => return Err(SysError::TypeMismatch("set", other.type_name())),
                }
            }
            Op::SetSize => {
                let set = self.stack.pop_set()?;
                self.stack.push(set.size() as i32)?;
            }
            Op::SetMemb => {
                let set = self.stack.pop_set()?;
                let index = self.stack.pop_int()?;
                let member = set.member(index.max(0) as usize).ok_or_else(|| {
                    SysError::IndexOutOfRange(format!("member {} of set {}", index, set))
                })?;
                self.stack.push(member as i32)?;
            }
            Op::InSet => {
                let set = self.stack.pop_set()?;
                let element = self.stack.pop_int()?;
                self.stack.push(set.contains(element as u32))?;
            }

            // Containment
            Op::ContSize => {
                let transitivity = self.stack.pop_int()?;
                let container = self.stack.pop_int()?;
                let size = self.world.container_size(container, direct(transitivity))?;
                self.stack.push(size)?;
            }
            Op::ContMemb => {
                let transitivity = self.stack.pop_int()?;
                let container = self.stack.pop_int()?;
                let index = self.stack.pop_int()?;
                let member =
                    self.world
                        .container_member(container, index, direct(transitivity))?;
                self.stack.push(member)?;
            }
            Op::Locate => {
                let id = self.stack.pop_int()?;
                let whr = self.stack.pop_int()?;
                self.world.locate(id, whr)?;
            }
            Op::Where => {
                let transitivity = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let whr = self.world.where_(id, direct(transitivity))?;
                self.stack.push(whr)?;
            }
            Op::Location => {
                let id = self.stack.pop_int()?;
                let location = self.world.location_of(id)?;
                self.stack.push(location)?;
            }
            Op::In => {
                let transitivity = self.stack.pop_int()?;
                let container = self.stack.pop_int()?;
                let instance = self.stack.pop_int()?;
                let inside = self
                    .world
                    .is_in(instance, container, direct(transitivity))?;
                self.stack.push(inside)?;
            }
            Op::At => {
                let transitivity = self.stack.pop_int()?;
                let other = self.stack.pop_int()?;
                let instance = self.stack.pop_int()?;
                let at = self.world.is_at(instance, other, direct(transitivity))?;
                self.stack.push(at)?;
            }
            Op::Here => {
                let transitivity = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                self.world.verify_instance(id, "check HERE for")?;
                let here = self
                    .world
                    .is_at(id, self.context.location, direct(transitivity))?;
                self.stack.push(here)?;
            }
            Op::Near => {
                let transitivity = self.stack.pop_int()?;
                let other = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let near = self.world.is_near(id, other, direct(transitivity))?;
                self.stack.push(near)?;
            }
            Op::Nearby => {
                let transitivity = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let nearby =
                    self.world
                        .is_nearby(id, self.context.location, direct(transitivity))?;
                self.stack.push(nearby)?;
            }
            Op::Empty => {
                let container = self.stack.pop_int()?;
                let whr = self.stack.pop_int()?;
                self.world.empty(container, whr)?;
            }
            Op::Isa => {
                let class = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let isa = self.world.is_a(id, class)?;
                self.stack.push(isa)?;
            }

            // Actors
            Op::Use => {
                let actor = self.stack.pop_int()?;
                let script = self.stack.pop_int()?;
                self.use_script(actor, script, host)?;
            }
            Op::Stop => {
                let actor = self.stack.pop_int()?;
                self.world.stop_script(actor)?;
            }

            // Conditionals
            Op::If => {
                if !self.stack.pop_bool()? {
                    *pc = self.jump_target(address)? + 1;
                }
            }
            Op::Else => *pc = self.jump_target(address)? + 1,
            Op::EndIf => {}

            // Depending on: the switch value stays on the stack until ENDDEP
            Op::Depend => {}
            Op::DepExec => {
                if !self.stack.pop_bool()? {
                    *pc = self.jump_target(address)?;
                }
            }
            Op::DepCase | Op::DepElse => *pc = self.jump_target(address)?,
            Op::EndDep => {
                self.stack.pop()?;
            }

            // Logic and comparison
            Op::And | Op::Or => {
                let rh = self.stack.pop_bool()?;
                let lh = self.stack.pop_bool()?;
                let result = if op == Op::And { lh && rh } else { lh || rh };
                self.stack.push(result)?;
            }
            Op::Eq | Op::Ne => {
                let rh = self.stack.pop()?;
                let lh = self.stack.pop()?;
                let equal = match (&lh, &rh) {
                    (Value::Int(a), Value::Int(b)) => a == b,
                    (Value::Set(a), Value::Set(b)) => a.same_members(b),
                    (Value::Text(a), Value::Text(b)) => a == b,
                    _ => return Err(SysError::TypeMismatch(lh.type_name(), rh.type_name())),
                };
                self.stack.push(if op == Op::Eq { equal } else { !equal })?;
            }
            Op::StrEq | Op::StrExact => {
                let rh = self.stack.pop_text()?;
                let lh = self.stack.pop_text()?;
                let equal = if op == Op::StrExact {
                    lh == rh
                } else {
                    lh.to_lowercase() == rh.to_lowercase()
                };
                self.stack.push(equal)?;
            }
            Op::Le | Op::Ge | Op::Lt | Op::Gt => {
                let rh = self.stack.pop_int()?;
                let lh = self.stack.pop_int()?;
                let result = match op {
                    Op::Le => lh <= rh,
                    Op::Ge => lh >= rh,
                    Op::Lt => lh < rh,
                    _ => lh > rh,
                };
                self.stack.push(result)?;
            }
            Op::Not => {
                let value = self.stack.pop_bool()?;
                self.stack.push(!value)?;
            }

            // Arithmetic
            Op::Plus | Op::Minus | Op::Mult | Op::Div => {
                let rh = self.stack.pop_int()?;
                let lh = self.stack.pop_int()?;
                let result = match op {
                    Op::Plus => lh.wrapping_add(rh),
                    Op::Minus => lh.wrapping_sub(rh),
                    Op::Mult => lh.wrapping_mul(rh),
                    _ => {
                        if rh == 0 {
                            return Err(SysError::DivisionByZero);
                        }
                        lh.wrapping_div(rh)
                    }
                };
                self.stack.push(result)?;
            }
            Op::Incr | Op::Decr => {
                let step = self.stack.pop_int()?;
                let value = self.stack.pop_int()?;
                let result = if op == Op::Incr {
                    value.wrapping_add(step)
                } else {
                    value.wrapping_sub(step)
                };
                self.stack.push(result)?;
            }
            Op::Rnd => {
                let from = self.stack.pop_int()?;
                let to = self.stack.pop_int()?;
                let value = self.rand.random_integer(from, to);
                self.stack.push(value)?;
            }
            Op::Btw => {
                let high = self.stack.pop_int()?;
                let low = self.stack.pop_int()?;
                let value = self.stack.pop_int()?;
                let (low, high) = if low <= high { (low, high) } else { (high, low) };
                self.stack.push(value >= low && value <= high)?;
            }

            // Strings
            Op::Concat => {
                let s2 = self.stack.pop_text()?;
                let mut s1 = self.stack.pop_text()?;
                s1.push_str(&s2);
                self.stack.push(s1)?;
            }
            Op::Contains => {
                let substring = self.stack.pop_text()?;
                let string = self.stack.pop_text()?;
                let found = string.to_lowercase().contains(&substring.to_lowercase());
                self.stack.push(found)?;
            }
            Op::Strip => {
                let atr = self.stack.pop_int()?;
                let id = self.stack.pop_int()?;
                let words = self.stack.pop_bool()?;
                let count = self.stack.pop_int()?;
                let from_start = self.stack.pop_bool()?;
                let text = self.world.get_string_attribute(id, atr)?;
                let (stripped, rest) = strip(&text, count.max(0) as usize, words, from_start);
                self.world.set_attribute(id, atr, AttributeValue::Text(rest))?;
                self.stack.push(stripped)?;
            }

            // Aggregates work on the loop record {accumulator, limit, index}
            Op::Max | Op::Min | Op::Sum => {
                let attribute = self.stack.pop_int()?;
                let index = self.stack.pop_int()?;
                let limit = self.stack.pop_int()?;
                let aggregate = self.stack.pop_int()?;
                let aggregate = match op {
                    Op::Max if aggregate < attribute => attribute,
                    Op::Min if aggregate > attribute => attribute,
                    Op::Sum => aggregate.wrapping_add(attribute),
                    _ => aggregate,
                };
                self.stack.push(aggregate)?;
                self.stack.push(limit)?;
                self.stack.push(index)?;
            }
            Op::Count => {
                let index = self.stack.pop_int()?;
                let limit = self.stack.pop_int()?;
                match self.stack.top_mut()? {
                    Value::Int(count) => *count = count.wrapping_add(1),
                    other => return Err(SysError::TypeMismatch("integer", other.type_name())),
                }
                self.stack.push(limit)?;
                self.stack.push(index)?;
            }

            // Frames
            Op::Frame => {
                let locals = self.stack.pop_int()?;
                self.stack.new_frame(locals.max(0) as usize)?;
            }
            Op::GetLocal => {
                let frames_below = self.stack.pop_int()?;
                let slot = self.stack.pop_int()?;
                let value = self.stack.get_local(frames_below, slot)?;
                self.stack.push(value)?;
            }
            Op::SetLocal => {
                let frames_below = self.stack.pop_int()?;
                let slot = self.stack.pop_int()?;
                let value = self.stack.pop_int()?;
                self.stack.set_local(frames_below, slot, value)?;
            }
            Op::EndFrame => self.stack.end_frame()?,

            // Loops
            Op::Loop => {
                let index = self.stack.pop_int()?;
                let limit = self.stack.pop_int()?;
                self.stack.push(limit)?;
                self.stack.push(index)?;
                if index > limit {
                    *pc = self.jump_target(address)?;
                }
            }
            Op::LoopNext => *pc = self.jump_target(address)?,
            Op::LoopEnd => {
                let index = self.stack.pop_int()?;
                let limit = self.stack.pop_int()?;
                if index < limit {
                    self.stack.push(limit)?;
                    self.stack.push(index + 1)?;
                    *pc = self.jump_target(address)? + 1;
                }
            }

            Op::Return => return Ok(ExecutionResult::Returned),
        }
        Ok(ExecutionResult::Continue)
    }

    /// Code block of a 1-based event number
    pub fn event_block(&self, event: i32) -> Result<usize, SysError> {
        if event < 1 {
            return Err(SysError::NoSuchEvent(event));
        }
        self.game
            .events
            .get(event as usize - 1)
            .copied()
            .ok_or(SysError::NoSuchEvent(event))
    }

    /// Execute a block that leaves one integer on the stack
    fn evaluate(&mut self, block: usize, host: &mut dyn Host) -> Result<i32, SysError> {
        self.execute(block, host)?;
        self.stack.pop_int()
    }

    /// Set an actor on the first step of `script`
    fn use_script(
        &mut self,
        actor: i32,
        script: i32,
        host: &mut dyn Host,
    ) -> Result<(), SysError> {
        self.world.verify_instance(actor, "USE script for")?;
        let first = self
            .game
            .script(script)
            .ok_or(SysError::NoSuchScript(script))?
            .steps
            .first()
            .copied();
        let wait = match first.and_then(|step| step.after) {
            Some(block) => self.evaluate(block, host)?,
            None => 0,
        };
        self.world.start_script(actor, script, wait)
    }

    /// Let every scripted actor other than the hero take its next step
    pub fn run_actors(&mut self, host: &mut dyn Host) -> Result<ExecutionResult, SysError> {
        let saved = self.context.clone();
        for actor in 1..=self.world.instance_max() {
            if actor == self.world.hero || self.world.admin[actor].script == 0 {
                continue;
            }
            if self.move_actor(actor, host)? == ExecutionResult::Quit {
                self.context = saved;
                return Ok(ExecutionResult::Quit);
            }
        }
        self.context = saved;
        Ok(ExecutionResult::Continue)
    }

    fn move_actor(
        &mut self,
        actor: usize,
        host: &mut dyn Host,
    ) -> Result<ExecutionResult, SysError> {
        let code = self.world.admin[actor].script;
        let steps = self
            .game
            .script(code)
            .ok_or(SysError::NoSuchScript(code))?
            .steps
            .clone();
        let index = self.world.admin[actor].step.max(0) as usize;
        let step = match steps.get(index) {
            Some(step) => *step,
            None => {
                self.world.admin[actor].script = 0;
                return Ok(ExecutionResult::Continue);
            }
        };

        self.context.actor = actor as i32;
        self.context.instance = actor as i32;
        self.context.location = self.world.where_(actor as i32, false)?;

        if self.world.admin[actor].wait_count > 0 {
            self.world.admin[actor].wait_count -= 1;
            self.world.changed = true;
            trace!("Actor {} waits, step {} of script {}", actor, index + 1, code);
            return Ok(ExecutionResult::Continue);
        }
        if let Some(condition) = step.condition {
            if self.evaluate(condition, host)? == 0 {
                return Ok(ExecutionResult::Continue);
            }
        }

        self.world.admin[actor].step += 1;
        self.world.changed = true;
        if let Some(after) = steps.get(index + 1).and_then(|next| next.after) {
            self.world.admin[actor].wait_count = self.evaluate(after, host)?;
        }
        debug!("Actor {} runs step {} of script {}", actor, index + 1, code);
        let result = self.execute(step.statements, host)?;

        let admin = &mut self.world.admin[actor];
        if admin.script == code && admin.step != 0 && admin.step as usize >= steps.len() {
            admin.script = 0;
        }
        Ok(result)
    }

    /// Run every event that has come due, then count the rest down one tick
    pub fn run_pending_events(
        &mut self,
        host: &mut dyn Host,
    ) -> Result<ExecutionResult, SysError> {
        while let Some(entry) = self.world.take_due_event() {
            let whr = entry.where_ as i32;
            self.context.location = if self.world.is_location(entry.where_) {
                whr
            } else {
                self.world.where_(whr, false)?
            };
            debug!("Running event {} at {}", entry.event, self.context.location);
            let block = self.event_block(entry.event)?;
            if self.execute(block, host)? == ExecutionResult::Quit {
                return Ok(ExecutionResult::Quit);
            }
        }
        self.world.tick_events();
        Ok(ExecutionResult::Continue)
    }

    /// Save to `name`; failures become a player message
    pub fn save(&mut self, host: &mut dyn Host, name: &str) -> Result<Msg, SysError> {
        let file_name = self.save_file_name(name);
        let result = match host.create_save(&file_name) {
            Ok(mut out) => save_game(
                &self.world,
                &self.game.set_init,
                &self.game.string_init,
                &mut *out,
            )
            .and_then(|_| out.flush().map_err(Into::into))
            .map_err(String::from),
            Err(e) => Err(e.into()),
        };
        Ok(match result {
            Ok(()) => {
                info!("Saved game to '{}'", file_name);
                Msg::Saved(file_name)
            }
            Err(reason) => {
                warn!("Save to '{}' failed: {}", file_name, reason);
                Msg::SaveFailed(reason)
            }
        })
    }

    /// Restore from `name`; the undo history is dropped on success
    pub fn restore(&mut self, host: &mut dyn Host, name: &str) -> Result<Msg, SysError> {
        let file_name = self.save_file_name(name);
        let result = match host.open_save(&file_name) {
            Ok(mut input) => restore_game(
                &mut self.world,
                &self.game.set_init,
                &self.game.string_init,
                &mut *input,
            )
            .map_err(String::from),
            Err(e) => Err(e.into()),
        };
        Ok(match result {
            Ok(()) => {
                self.undo.init_undo_stack();
                info!("Restored game from '{}'", file_name);
                Msg::Restored(file_name)
            }
            Err(reason) => {
                warn!("Restore from '{}' failed: {}", file_name, reason);
                Msg::RestoreFailed(reason)
            }
        })
    }
}
