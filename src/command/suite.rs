//! Suite dispatcher: resolves a command line to a command and runs it.
//!
//! Dispatch of `argv = [suite, command, args…]`:
//!
//! 1. A [`Response`] is opened and immediately records the command name
//!    (`"<suite> <command>"`) and the argument tokens.
//! 2. The command is looked up among the builtins (`help`, `list`, `args`)
//!    first, then in the suite's table. An unknown name fails with
//!    `NotFound`.
//! 3. The argument count is checked against the command's arity.
//! 4. The handler runs against the suite context and the response.
//! 5. If the handler left the response in place the command completed
//!    synchronously: the response is closed and its status returned. If the
//!    handler [detached](Response::detach) it, the command continues
//!    asynchronously; [`Completion::Pending`] is returned and the completion
//!    callback fires when the response eventually closes (or just before
//!    dispatch returns, if the detached response already closed). A
//!    synchronous command never fires the callback, even when the handler
//!    closed the response itself.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use super::{Command, CommandArgDescriptor, CommandArgs, MaxArgs, Response, StatusCode};
use crate::system::console::Console;

/// Callback told the final status of a command that completed asynchronously.
pub type CompletionFn = Box<dyn FnOnce(StatusCode)>;

/// How a dispatched command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The response was closed before dispatch returned.
    Done(StatusCode),
    /// The response is owned elsewhere and will close later.
    Pending,
}

impl Completion {
    /// Code returned to the transport: the final status, or
    /// [`StatusCode::ExecutingContinue`] while pending.
    pub fn code(&self) -> StatusCode {
        match self {
            Completion::Done(status) => *status,
            Completion::Pending => StatusCode::ExecutingContinue,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Completion {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Completion::Done(status) => defmt::write!(f, "Done({})", status),
            Completion::Pending => defmt::write!(f, "Pending"),
        }
    }
}

/// A named group of commands the shell can route lines to.
///
/// Implemented by [`Suite`] for every context type, so a shell can hold
/// suites with different contexts side by side.
pub trait CommandSuite {
    /// The first word of the lines this suite handles.
    fn name(&self) -> &'static str;

    /// Run `argv` (suite name first) and report how it finished.
    ///
    /// `on_complete` is invoked only if the command completes
    /// asynchronously.
    fn dispatch(
        &mut self,
        argv: &[&str],
        console: &Console,
        on_complete: Option<CompletionFn>,
    ) -> Completion;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Help,
    List,
    Args,
}

struct BuiltinCommand {
    name: &'static str,
    help: &'static str,
    args: &'static [CommandArgDescriptor],
    kind: Builtin,
}

const COMMAND_NAME_ARG: &[CommandArgDescriptor] = &[CommandArgDescriptor::new(
    "string",
    "command",
    "name of the command to describe",
)];

static BUILTINS: [BuiltinCommand; 3] = [
    BuiltinCommand {
        name: "help",
        help: "Print the help text of a command",
        args: COMMAND_NAME_ARG,
        kind: Builtin::Help,
    },
    BuiltinCommand {
        name: "list",
        help: "List the commands of this suite",
        args: &[],
        kind: Builtin::List,
    },
    BuiltinCommand {
        name: "args",
        help: "Describe the arguments of a command",
        args: COMMAND_NAME_ARG,
        kind: Builtin::Args,
    },
];

/// A named command table plus the context its handlers share.
pub struct Suite<C> {
    name: &'static str,
    context: C,
    commands: Vec<Command<C>>,
}

impl<C: 'static> Suite<C> {
    /// Empty suite named `name` owning `context`.
    pub fn new(name: &'static str, context: C) -> Self {
        Self {
            name,
            context,
            commands: Vec::new(),
        }
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_command(mut self, command: Command<C>) -> Self {
        self.register(command);
        self
    }

    /// Append a command. Lookup is by exact name, first match; a command
    /// named like a builtin is never reached.
    pub fn register(&mut self, command: Command<C>) {
        if BUILTINS.iter().any(|builtin| builtin.name == command.name) {
            warn!("command {=str} is shadowed by a builtin", command.name);
        }
        self.commands.push(command);
    }

    /// The command table in registration order.
    pub fn commands(&self) -> &[Command<C>] {
        &self.commands
    }

    /// Shared handler context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Mutable handler context.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// Dispatch `argv`; see the [module documentation](self).
    pub fn dispatch(
        &mut self,
        argv: &[&str],
        console: &Console,
        on_complete: Option<CompletionFn>,
    ) -> Completion {
        let command_name = argv.get(1).copied();
        let args = CommandArgs::new(argv.get(2..).unwrap_or(&[]));

        let mut response = Response::new(console.clone());
        match command_name {
            Some(command) => response.set_command_name(format_args!("{} {}", self.name, command)),
            None => response.set_command_name(self.name),
        };
        response.set_arguments(args);

        // closes seen before the handler returns are held back until it is
        // known whether the response was detached
        let on_complete = Rc::new(RefCell::new(on_complete));
        let dispatching = Rc::new(Cell::new(true));
        let early_status = Rc::new(Cell::new(None));
        {
            let on_complete = on_complete.clone();
            let dispatching = dispatching.clone();
            let early_status = early_status.clone();
            response.set_on_close(move |closed| {
                let status = closed.status_code().unwrap_or(StatusCode::Fail);
                if dispatching.get() {
                    early_status.set(Some(status));
                    return;
                }
                let callback = on_complete.borrow_mut().take();
                if let Some(callback) = callback {
                    callback(status);
                }
            });
        }

        match command_name {
            Some(command) => self.execute(command, args, &mut response),
            None => {
                response.invalid_parameters_with("missing command name");
            }
        }
        dispatching.set(false);

        if response.is_detached() {
            debug!("{=str}: command continues asynchronously", self.name);
            if let Some(status) = early_status.take() {
                let callback = on_complete.borrow_mut().take();
                if let Some(callback) = callback {
                    callback(status);
                }
            }
            return Completion::Pending;
        }

        on_complete.borrow_mut().take();
        response.clear_on_close();
        response.close();
        let status = response.status_code().unwrap_or(StatusCode::Fail);
        trace!("{=str}: command done with {}", self.name, status);
        Completion::Done(status)
    }

    fn execute(&mut self, name: &str, args: CommandArgs<'_>, response: &mut Response) {
        if let Some(builtin) = BUILTINS.iter().find(|builtin| builtin.name == name) {
            if check_arity(builtin.args.len(), MaxArgs::Bounded(builtin.args.len()), args, response) {
                self.run_builtin(builtin.kind, args, response);
            }
            return;
        }

        let Some(command) = self.commands.iter().find(|command| command.name == name) else {
            debug!("{=str}: unknown command {=str}", self.name, name);
            response.complete_with(StatusCode::NotFound, "command not found");
            return;
        };

        if check_arity(command.min_args(), command.max_args, args, response) {
            debug!("{=str}: running {=str}", self.name, name);
            command.invoke(&mut self.context, args, response);
        }
    }

    fn run_builtin(&self, kind: Builtin, args: CommandArgs<'_>, response: &mut Response) {
        match kind {
            Builtin::List => {
                response.success();
                if let Some(writer) = response.result_stream() {
                    writer.start_array();
                    for builtin in BUILTINS.iter() {
                        writer.string(builtin.name);
                    }
                    for command in &self.commands {
                        writer.string(command.name);
                    }
                    writer.end_array();
                }
            }
            Builtin::Help => match args.get(0).and_then(|name| self.describe(name)) {
                Some((help, _)) => {
                    response.success_with(help);
                }
                None => {
                    response.invalid_parameters_with("unknown command");
                }
            },
            Builtin::Args => match args.get(0).and_then(|name| self.describe(name)) {
                Some((_, descriptors)) => {
                    response.success();
                    if let Some(writer) = response.result_stream() {
                        writer.start_array();
                        for descriptor in descriptors {
                            writer.start_object();
                            writer.key(descriptor.name).string(descriptor.description);
                            writer.end_object();
                        }
                        writer.end_array();
                    }
                }
                None => {
                    response.invalid_parameters_with("unknown command");
                }
            },
        }
    }

    /// Help text and argument descriptors of a builtin or table command.
    fn describe(&self, name: &str) -> Option<(&'static str, &'static [CommandArgDescriptor])> {
        BUILTINS
            .iter()
            .find(|builtin| builtin.name == name)
            .map(|builtin| (builtin.help, builtin.args))
            .or_else(|| {
                self.commands
                    .iter()
                    .find(|command| command.name == name)
                    .map(|command| (command.help, command.args))
            })
    }
}

impl<C> fmt::Debug for Suite<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl<C: 'static> CommandSuite for Suite<C> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn dispatch(
        &mut self,
        argv: &[&str],
        console: &Console,
        on_complete: Option<CompletionFn>,
    ) -> Completion {
        Suite::dispatch(self, argv, console, on_complete)
    }
}

/// Fail `response` if `args` does not satisfy `min..=max`.
fn check_arity(min: usize, max: MaxArgs, args: CommandArgs<'_>, response: &mut Response) -> bool {
    if args.len() < min {
        warn!("not enough arguments: {=usize} < {=usize}", args.len(), min);
        response.invalid_parameters_with("not enough arguments");
        return false;
    }
    if !max.admits(args.len()) {
        warn!("too many arguments: {=usize}", args.len());
        response.invalid_parameters_with("too many arguments");
        return false;
    }
    true
}
