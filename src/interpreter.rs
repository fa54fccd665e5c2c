use crate::config::Options;
use crate::dictionary::no_of_pronouns;
use crate::error::SysError;
use crate::game::Game;
use crate::host::Host;
use crate::msg::Msg;
use crate::parser::{ParamEntry, ParamRef, ParsedCommand, Parser, PronounEntry};
use crate::text::{tokenize, TokenizeError, Word};
use crate::vm::{ExecutionResult, Vm};
use log::{debug, error, info, warn};

/// Commands handled by the interpreter itself, before parsing
#[derive(Debug, Clone, PartialEq, Eq)]
enum MetaCommand {
    Undo,
    Save(Option<String>),
    Restore(Option<String>),
    Quit,
}

fn meta_command(line: &str) -> Option<MetaCommand> {
    let mut words = line.split_whitespace();
    let first = words.next()?.to_lowercase();
    let argument = words.next().map(|s| s.to_string());
    if words.next().is_some() {
        return None;
    }
    match (first.as_str(), argument) {
        ("undo", None) => Some(MetaCommand::Undo),
        ("save", name) => Some(MetaCommand::Save(name)),
        ("restore", name) => Some(MetaCommand::Restore(name)),
        ("quit", None) => Some(MetaCommand::Quit),
        _ => None,
    }
}

/// The play session: one loaded game, its live state and the host
pub struct Interpreter<H: Host> {
    pub vm: Vm,
    pub host: H,
    pronouns: Vec<PronounEntry>,
    finished: bool,
}

impl<H: Host> Interpreter<H> {
    /// Set up the initial world and run the start block
    pub fn new(game: Game, host: H, options: Options) -> Result<Self, SysError> {
        let start = game.header.start_block;
        let pronouns = Vec::with_capacity(no_of_pronouns(&game.dictionary));
        let mut interpreter = Interpreter {
            vm: Vm::new(game, options),
            host,
            pronouns,
            finished: false,
        };
        let hero = interpreter.vm.world.hero as i32;
        interpreter.vm.context.actor = hero;
        interpreter.vm.context.location = interpreter.vm.world.location_of(hero)?;

        info!("Running start block {:#06x}", start);
        let Interpreter { vm, host, .. } = &mut interpreter;
        if vm.execute(start, host)? == ExecutionResult::Quit
            || vm.run_pending_events(host)? == ExecutionResult::Quit
        {
            interpreter.finished = true;
        }
        Ok(interpreter)
    }

    /// Has the game ended, by QUIT or the player
    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn pronouns(&self) -> &[PronounEntry] {
        &self.pronouns
    }

    /// Read and play commands until the game ends or input runs out
    pub fn run(&mut self) -> Result<(), String> {
        while !self.finished {
            self.vm.reset_more();
            let line = match self.host.read_line()? {
                Some(line) => line,
                None => break,
            };
            self.turn(&line).map_err(|e| e.to_string())?;
        }
        info!("Session ended");
        Ok(())
    }

    /// Play one command line. Returns false once the game has ended.
    ///
    /// Fatal errors in game code are reported to the player and undo the
    /// command; only host failures are returned as errors.
    pub fn turn(&mut self, line: &str) -> Result<bool, SysError> {
        let command = line.trim();
        if self.finished {
            return Ok(false);
        }
        if command.is_empty() {
            return Ok(true);
        }
        if let Some(meta) = meta_command(command) {
            self.meta(meta)?;
            return Ok(!self.finished);
        }

        let undo = self.vm.options.undo;
        self.vm.world.changed = false;
        if undo {
            let vm = &mut self.vm;
            vm.undo
                .push_game_state(&vm.world, &vm.game.set_init, &vm.game.string_init, command)?;
        }

        match self.play(command) {
            Ok(ExecutionResult::Quit) => {
                self.forget_unchanged(undo);
                self.finished = true;
                return Ok(false);
            }
            Ok(_) => {}
            Err(error) => {
                self.system_error(&error)?;
                if undo {
                    let vm = &mut self.vm;
                    vm.undo.pop_game_state(
                        &mut vm.world,
                        &vm.game.set_init,
                        &vm.game.string_init,
                    )?;
                }
                return Ok(true);
            }
        }

        // Scripted actors move after the hero, then due events run
        match self.vm.run_actors(&mut self.host) {
            Ok(ExecutionResult::Quit) => self.finished = true,
            Ok(_) => {}
            Err(error) => self.system_error(&error)?,
        }
        if !self.finished {
            match self.vm.run_pending_events(&mut self.host) {
                Ok(ExecutionResult::Quit) => self.finished = true,
                Ok(_) => {}
                Err(error) => self.system_error(&error)?,
            }
        }
        self.forget_unchanged(undo);
        Ok(!self.finished)
    }

    /// A turn that changed nothing leaves no undo snapshot behind
    fn forget_unchanged(&mut self, undo: bool) {
        if undo && !self.vm.world.changed {
            self.vm.undo.forget_game_state();
        }
    }

    /// Restore the state from before the last command that changed it
    pub fn undo(&mut self) -> Result<(), SysError> {
        if !self.vm.options.undo {
            return self.vm.message(&mut self.host, Msg::NoUndo);
        }
        let vm = &mut self.vm;
        let undone =
            vm.undo
                .pop_game_state(&mut vm.world, &vm.game.set_init, &vm.game.string_init)?;
        let msg = match undone {
            Some(command) => {
                debug!("Undid '{}'", command);
                Msg::Undone(command)
            }
            None => Msg::CantUndo,
        };
        self.vm.message(&mut self.host, msg)
    }

    fn meta(&mut self, meta: MetaCommand) -> Result<(), SysError> {
        debug!("Meta command {:?}", meta);
        match meta {
            MetaCommand::Undo => self.undo(),
            MetaCommand::Save(name) => {
                let name = name.unwrap_or_else(|| self.vm.save_name().to_string());
                let msg = self.vm.save(&mut self.host, &name)?;
                self.vm.message(&mut self.host, msg)
            }
            MetaCommand::Restore(name) => {
                let name = name.unwrap_or_else(|| self.vm.save_name().to_string());
                let msg = self.vm.restore(&mut self.host, &name)?;
                self.vm.message(&mut self.host, msg)
            }
            MetaCommand::Quit => {
                self.finished = true;
                self.vm.message(&mut self.host, Msg::Goodbye)
            }
        }
    }

    /// The system-error hook: log, tell the player, abandon execution state
    fn system_error(&mut self, error: &SysError) -> Result<(), SysError> {
        error!("System error: {}", error);
        self.vm.reset_execution();
        if let SysError::Host(_) = error {
            return Err(error.clone());
        }
        self.vm
            .message(&mut self.host, Msg::SystemError(error.to_string()))
    }

    /// Parse and execute every command in `line`
    fn play(&mut self, line: &str) -> Result<ExecutionResult, SysError> {
        let words = match tokenize(line, &self.vm.game.dictionary) {
            Ok(words) => words,
            Err(TokenizeError::UnknownWord(word)) => {
                self.vm.message(&mut self.host, Msg::UnknownWord(word))?;
                return Ok(ExecutionResult::Continue);
            }
            Err(TokenizeError::UnterminatedString(_)) => {
                self.vm.message(&mut self.host, Msg::UnterminatedString)?;
                return Ok(ExecutionResult::Continue);
            }
        };

        let mut position = 0;
        while position < words.len() {
            if self.is_conjunction(&words[position]) {
                position += 1;
                continue;
            }
            let command = match self.parse(&words, position) {
                Some(command) => command,
                None => {
                    debug!("No syntax matched at word {}", position);
                    self.vm.message(&mut self.host, Msg::NotUnderstood)?;
                    return Ok(ExecutionResult::Continue);
                }
            };
            position += command.consumed;
            if self.perform(command)? == ExecutionResult::Quit {
                return Ok(ExecutionResult::Quit);
            }
        }
        Ok(ExecutionResult::Continue)
    }

    fn is_conjunction(&self, word: &Word) -> bool {
        word.dictionary_index()
            .and_then(|i| self.vm.game.dictionary.entry(i))
            .map(|e| e.classes.is_conjunction())
            .unwrap_or(false)
    }

    /// Objects are in scope when they share the hero's location
    fn parse(&self, words: &[Word], position: usize) -> Option<ParsedCommand> {
        let world = &self.vm.world;
        let hero = world.hero;
        let here = world.location_of(hero as i32).ok();
        let scope = |id: usize| id != hero && world.location_of(id as i32).ok() == here;
        let game = &self.vm.game;
        let mut parser = Parser::new(&game.dictionary, &game.elements, words)
            .with_scope(world.instance_max(), &scope)
            .with_pronouns(&self.pronouns);
        parser.set_position(position);
        parser.parse_command(&game.syntaxes)
    }

    /// Bind a parsed command and run its verb, once per object of a
    /// multiple parameter
    fn perform(&mut self, command: ParsedCommand) -> Result<ExecutionResult, SysError> {
        let action = match self.vm.game.verb_action(command.verb) {
            Some(action) => action,
            None => {
                warn!("Verb {} has no action", command.verb);
                self.vm.message(&mut self.host, Msg::NotUnderstood)?;
                return Ok(ExecutionResult::Continue);
            }
        };
        self.vm.world.literals = command.literals.clone();
        self.remember_pronouns(&command.params);

        let rounds: Vec<Vec<ParamEntry>> = if command.plural {
            let first_plural = command.params.iter().position(|p| p.plural);
            let singles: Vec<ParamEntry> =
                command.params.iter().filter(|p| !p.plural).copied().collect();
            command
                .params
                .iter()
                .filter(|p| p.plural)
                .map(|object| {
                    let mut params = singles.clone();
                    params.insert(first_plural.unwrap_or(0), *object);
                    params
                })
                .collect()
        } else {
            vec![command.params.clone()]
        };

        for params in rounds {
            let world = &self.vm.world;
            let ids: Vec<i32> = params
                .iter()
                .map(|p| match p.instance {
                    ParamRef::Object(id) => id as i32,
                    ParamRef::Literal(literal) => world.literal_instance(literal.0),
                })
                .collect();
            let hero = world.hero as i32;
            let location = world.location_of(hero)?;

            let context = &mut self.vm.context;
            context.verb = command.verb;
            context.actor = hero;
            context.location = location;
            context.instance = ids.first().copied().unwrap_or(0);
            context.params = ids;
            debug!(
                "Verb {} with parameters {:?}",
                command.verb, self.vm.context.params
            );

            let result = self.vm.execute(action, &mut self.host)?;
            if self.vm.stack.depth() != 0 {
                warn!(
                    "{} values left on the stack after verb {}",
                    self.vm.stack.depth(),
                    command.verb
                );
                self.vm.stack.clear();
            }
            if result == ExecutionResult::Quit {
                return Ok(result);
            }
        }
        Ok(ExecutionResult::Continue)
    }

    fn remember_pronouns(&mut self, params: &[ParamEntry]) {
        for param in params {
            if let ParamRef::Object(id) = param.instance {
                let pronoun = self
                    .vm
                    .world
                    .instances
                    .get(id)
                    .map(|i| i.pronoun)
                    .unwrap_or(0);
                if pronoun == 0 {
                    continue;
                }
                self.pronouns.retain(|p| p.pronoun != pronoun);
                self.pronouns.push(PronounEntry {
                    pronoun,
                    instance: id,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_meta_commands() {
        assert_eq!(meta_command("undo"), Some(MetaCommand::Undo));
        assert_eq!(meta_command("UNDO"), Some(MetaCommand::Undo));
        assert_eq!(meta_command("save"), Some(MetaCommand::Save(None)));
        assert_eq!(
            meta_command("restore game1"),
            Some(MetaCommand::Restore(Some("game1".to_string())))
        );
        assert_eq!(meta_command("quit"), Some(MetaCommand::Quit));
        assert_eq!(meta_command("quit now"), None);
        assert_eq!(meta_command("save a b"), None);
        assert_eq!(meta_command("take lamp"), None);
        assert_eq!(meta_command(""), None);
    }
}
