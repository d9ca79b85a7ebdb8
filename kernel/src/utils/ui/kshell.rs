/*
 * Kernel Shell
 *
 * The simulator's command interpreter. One line in, one rendering out:
 * every command either queries a snapshot of some subsystem or performs an
 * operation and reports its outcome. Output goes to any fmt::Write sink, so
 * the same shell drives the interactive binary and the tests.
 *
 * Commands are grouped by subsystem:
 * - Scheduling: ps, create, switch, kill, policy, queues, cores, start, stop, cpus, battery
 * - Memory: pt, translate, mem, frag, swapout, swapin
 * - Synchronization: produce, consume, buffer
 * - Files: touch, write, cat, rm, mkdir, cd, ls, pwd, su, find, tree
 * - Shell: help, history, loglevel, exit
 */

use core::fmt::{self, Write};
use core::str::{FromStr, SplitWhitespace};

use crate::Kernel;
use crate::fs::{FsError, Permissions, User};
use crate::memory::MemoryError;
use crate::scheduler::{
    BatteryMode, ProcessId, SchedError, StartOutcome, StopOutcome, SwitchOutcome,
    TerminateOutcome,
};
use crate::sync::BufferError;
use crate::utils::debug::logger;

use super::history::CommandHistory;

/// What the caller should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellStatus {
    Continue,
    Exit,
}

/// Why a command produced no result
#[derive(Debug)]
enum CommandError {
    /// Missing or malformed arguments; carries the usage line
    Usage(&'static str),
    Sched(SchedError),
    Memory(MemoryError),
    Buffer(BufferError),
    Fs(FsError),
    /// The output sink refused the text
    Output(fmt::Error),
}

impl From<SchedError> for CommandError {
    fn from(e: SchedError) -> Self {
        CommandError::Sched(e)
    }
}

impl From<MemoryError> for CommandError {
    fn from(e: MemoryError) -> Self {
        CommandError::Memory(e)
    }
}

impl From<BufferError> for CommandError {
    fn from(e: BufferError) -> Self {
        CommandError::Buffer(e)
    }
}

impl From<FsError> for CommandError {
    fn from(e: FsError) -> Self {
        CommandError::Fs(e)
    }
}

impl From<fmt::Error> for CommandError {
    fn from(e: fmt::Error) -> Self {
        CommandError::Output(e)
    }
}

type CommandResult = Result<(), CommandError>;

/// Next argument, parsed; missing or unparsable yields the usage line
fn arg<T: FromStr>(args: &mut SplitWhitespace<'_>, usage: &'static str) -> Result<T, CommandError> {
    args.next()
        .and_then(|a| a.parse().ok())
        .ok_or(CommandError::Usage(usage))
}

fn pid_arg(args: &mut SplitWhitespace<'_>, usage: &'static str) -> Result<ProcessId, CommandError> {
    arg::<usize>(args, usage).map(ProcessId::new)
}

/// Decimal or 0x-prefixed hexadecimal address
fn parse_address(s: &str) -> Option<u64> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" => Some(true),
        "n" | "no" | "false" => Some(false),
        _ => None,
    }
}

pub struct KShell {
    kernel: Kernel,
    history: CommandHistory,
}

impl KShell {
    pub fn new(kernel: Kernel) -> Self {
        Self {
            kernel,
            history: CommandHistory::new(),
        }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut Kernel {
        &mut self.kernel
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Execute one command line, writing its output to `out`
    ///
    /// Command failures are reported in the output; only a failing sink
    /// is returned as an error.
    pub fn execute_command<W: Write>(&mut self, line: &str, out: &mut W) -> Result<ShellStatus, fmt::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ShellStatus::Continue);
        }
        self.history.push(line);

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("").to_ascii_lowercase();
        let args = &mut parts;

        let result = match command.as_str() {
            "help" => Self::cmd_help(out),
            "exit" | "quit" => return Ok(ShellStatus::Exit),
            "history" => self.cmd_history(out),
            "loglevel" => Self::cmd_log_level(args, out),

            "ps" => self.cmd_ps(out),
            "create" => self.cmd_create(args, out),
            "switch" => self.cmd_switch(out),
            "kill" => self.cmd_kill(args, out),
            "policy" => self.cmd_policy(args, out),
            "queues" => self.cmd_queues(out),
            "cores" => self.cmd_cores(args, out),
            "start" => self.cmd_start(out),
            "stop" => self.cmd_stop(out),
            "cpus" => self.cmd_cpus(out),
            "battery" => self.cmd_battery(args, out),

            "pt" => self.cmd_page_table(args, out),
            "translate" => self.cmd_translate(args, out),
            "mem" => self.cmd_mem(out),
            "frag" => self.cmd_frag(out),
            "swapout" => self.cmd_swap_out(args, out),
            "swapin" => self.cmd_swap_in(args, out),

            "produce" => self.cmd_produce(out),
            "consume" => self.cmd_consume(out),
            "buffer" => self.cmd_buffer(out),

            "touch" => self.cmd_touch(args, out),
            "write" => self.cmd_write(args, out),
            "cat" => self.cmd_cat(args, out),
            "rm" => self.cmd_rm(args, out),
            "mkdir" => self.cmd_mkdir(args, out),
            "cd" => self.cmd_cd(args, out),
            "ls" => self.cmd_ls(out),
            "pwd" => self.cmd_pwd(out),
            "su" => self.cmd_su(args, out),
            "find" => self.cmd_find(args, out),
            "tree" => self.cmd_tree(out),

            _ => {
                writeln!(out, "Unknown command: {}", command)?;
                writeln!(out, "Type 'help' for available commands")?;
                Ok(())
            }
        };

        match result {
            Ok(()) => {}
            Err(CommandError::Usage(usage)) => writeln!(out, "Usage: {}", usage)?,
            Err(CommandError::Sched(e)) => writeln!(out, "Error: {}", e)?,
            Err(CommandError::Memory(e)) => writeln!(out, "Error: {}", e)?,
            Err(CommandError::Buffer(e)) => writeln!(out, "Error: {}", e)?,
            Err(CommandError::Fs(e)) => writeln!(out, "Error: {}", e)?,
            Err(CommandError::Output(e)) => return Err(e),
        }
        Ok(ShellStatus::Continue)
    }

    fn cmd_help<W: Write>(out: &mut W) -> CommandResult {
        let commands = [
            ("ps", "List processes"),
            ("create <name> <low|medium|high>", "Create a process"),
            ("switch", "Requeue the console process and dispatch the next"),
            ("kill [pid]", "Terminate a running process"),
            ("policy [FIFO|RR|MLFQ|POWER]", "Show or change the scheduler"),
            ("queues", "Show the ready queues"),
            ("cores [n]", "Show or set the number of cores"),
            ("start / stop", "Start or stop the core workers"),
            ("cpus", "Show what every core is running"),
            ("battery <1-100|sim>", "Pin or simulate the battery level"),
            ("pt <pid> <pages>", "Create a page table"),
            ("translate <pid> <vaddr>", "Translate a virtual address"),
            ("mem / frag", "Show frames / count free fragments"),
            ("swapout <pid> / swapin <pid>", "Move a page table to or from disk"),
            ("produce / consume / buffer", "Producer/consumer buffer"),
            ("touch <name> [owner] [enc] [uperm] [aperm]", "Create a file"),
            ("write <name> <text...>", "Replace a file's content"),
            ("cat / rm <name>", "Read or delete a file"),
            ("mkdir / cd <name>", "Create or enter a directory"),
            ("ls / pwd / tree", "Inspect the file system"),
            ("su <user|admin>", "Switch user"),
            ("find <name>", "Search for a file"),
            ("history", "Show command history"),
            ("loglevel [off|error|warn|info|debug|trace]", "Show or change the log level"),
            ("exit", "Leave the shell"),
        ];

        writeln!(out, "Available commands:")?;
        for (cmd, desc) in commands {
            writeln!(out, "  {:<44} {}", cmd, desc)?;
        }
        Ok(())
    }

    fn cmd_history<W: Write>(&self, out: &mut W) -> CommandResult {
        for (i, entry) in self.history.entries().enumerate() {
            writeln!(out, "  {}: {}", i + 1, entry)?;
        }
        Ok(())
    }

    fn cmd_log_level<W: Write>(args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        if args.clone().next().is_none() {
            writeln!(out, "Log level: {}", log::max_level())?;
            return Ok(());
        }
        let level = arg(args, "loglevel [off|error|warn|info|debug|trace]")?;
        logger::set_level(level);
        writeln!(out, "Log level set to {}", level)?;
        Ok(())
    }

    // ========================================================================
    // SCHEDULING
    // ========================================================================

    fn cmd_ps<W: Write>(&self, out: &mut W) -> CommandResult {
        write!(out, "{}", self.kernel.processes.list_processes())?;
        Ok(())
    }

    fn cmd_create<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        const USAGE: &str = "create <name> <low|medium|high>";
        let name = args.next().ok_or(CommandError::Usage(USAGE))?;
        let profile = args.next().ok_or(CommandError::Usage(USAGE))?;
        let pid = self.kernel.processes.create_process(name, profile)?;
        writeln!(out, "Process {} created with PID {}", name, pid)?;
        Ok(())
    }

    fn cmd_switch<W: Write>(&self, out: &mut W) -> CommandResult {
        match self.kernel.processes.switch_process() {
            SwitchOutcome::Switched { previous, next } => {
                if let Some(prev) = previous {
                    writeln!(out, "PID {} returned to the ready queue", prev)?;
                }
                writeln!(out, "Switched to PID {} for {} tick(s)", next.pid, next.timeslice.get())?;
            }
            SwitchOutcome::Idle { previous } => {
                if let Some(prev) = previous {
                    writeln!(out, "PID {} returned to the ready queue", prev)?;
                }
                writeln!(out, "No processes in the ready queue")?;
            }
        }
        Ok(())
    }

    fn cmd_kill<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let outcome = if args.clone().next().is_some() {
            let pid = pid_arg(args, "kill [pid]")?;
            self.kernel.processes.terminate(pid)?
        } else {
            self.kernel.processes.terminate_running()
        };
        match outcome {
            TerminateOutcome::Terminated(pid) => writeln!(out, "Process {} terminated", pid)?,
            TerminateOutcome::Pending { pid, cpu } => {
                writeln!(out, "Process {} will terminate when its quantum on {} ends", pid, cpu)?
            }
            TerminateOutcome::NothingRunning => writeln!(out, "No process is running")?,
        }
        Ok(())
    }

    fn cmd_policy<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        match args.next() {
            Some(name) => {
                let old = self.kernel.processes.set_policy(name)?;
                writeln!(out, "Scheduler changed from {} to {}", old, self.kernel.processes.policy())?;
            }
            None => writeln!(out, "Scheduler: {}", self.kernel.processes.policy())?,
        }
        Ok(())
    }

    fn cmd_queues<W: Write>(&self, out: &mut W) -> CommandResult {
        write!(out, "{}", self.kernel.processes.visualize_queues())?;
        Ok(())
    }

    fn cmd_cores<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        if args.clone().next().is_none() {
            writeln!(out, "Cores: {}", self.kernel.processes.core_count())?;
            return Ok(());
        }
        let count: usize = arg(args, "cores [n]")?;
        self.kernel.processes.set_core_count(count)?;
        writeln!(out, "Core count set to {}", count)?;
        Ok(())
    }

    fn cmd_start<W: Write>(&mut self, out: &mut W) -> CommandResult {
        match self.kernel.processes.start_cores()? {
            StartOutcome::Started { cores } => writeln!(out, "Started {} core(s)", cores)?,
            StartOutcome::AlreadyRunning => writeln!(out, "Cores are already running")?,
        }
        Ok(())
    }

    fn cmd_stop<W: Write>(&mut self, out: &mut W) -> CommandResult {
        match self.kernel.processes.stop_cores()? {
            StopOutcome::Stopped { cores } => writeln!(out, "Stopped {} core(s)", cores)?,
            StopOutcome::NotRunning => writeln!(out, "Cores are not running")?,
        }
        Ok(())
    }

    fn cmd_cpus<W: Write>(&self, out: &mut W) -> CommandResult {
        write!(out, "{}", self.kernel.processes.show_cores())?;
        Ok(())
    }

    fn cmd_battery<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        const USAGE: &str = "battery <1-100|sim>";
        let level = args.next().ok_or(CommandError::Usage(USAGE))?;
        let mode = if level.eq_ignore_ascii_case("sim") {
            BatteryMode::Simulated
        } else {
            match level.parse::<u8>() {
                Ok(level @ 1..=100) => BatteryMode::Fixed(level),
                _ => return Err(CommandError::Usage(USAGE)),
            }
        };
        self.kernel.processes.set_battery(mode);
        match mode {
            BatteryMode::Simulated => writeln!(out, "Battery level is simulated")?,
            BatteryMode::Fixed(level) => writeln!(out, "Battery level pinned at {}%", level)?,
        }
        Ok(())
    }

    // ========================================================================
    // MEMORY
    // ========================================================================

    fn cmd_page_table<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        const USAGE: &str = "pt <pid> <pages>";
        let pid = pid_arg(args, USAGE)?;
        let pages: usize = arg(args, USAGE)?;
        self.kernel.memory.lock().create_page_table(pid, pages)?;
        writeln!(out, "Page table created for PID {} ({} page(s))", pid, pages)?;
        Ok(())
    }

    fn cmd_translate<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        const USAGE: &str = "translate <pid> <vaddr>";
        let pid = pid_arg(args, USAGE)?;
        let vaddr = args
            .next()
            .and_then(parse_address)
            .ok_or(CommandError::Usage(USAGE))?;
        let paddr = self.kernel.memory.lock().translate(pid, vaddr)?;
        writeln!(out, "PID {}: virtual {:#x} -> physical {:#x}", pid, vaddr, paddr)?;
        Ok(())
    }

    fn cmd_mem<W: Write>(&self, out: &mut W) -> CommandResult {
        write!(out, "{}", *self.kernel.memory.lock())?;
        Ok(())
    }

    fn cmd_frag<W: Write>(&self, out: &mut W) -> CommandResult {
        let fragments = self.kernel.memory.lock().fragment_count();
        writeln!(out, "Free memory fragments: {}", fragments)?;
        Ok(())
    }

    fn cmd_swap_out<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let pid = pid_arg(args, "swapout <pid>")?;
        self.kernel.memory.lock().swap_out(pid)?;
        writeln!(out, "PID {} swapped out to disk", pid)?;
        Ok(())
    }

    fn cmd_swap_in<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let pid = pid_arg(args, "swapin <pid>")?;
        self.kernel.memory.lock().swap_in(pid)?;
        writeln!(out, "PID {} swapped back into memory", pid)?;
        Ok(())
    }

    // ========================================================================
    // PRODUCER / CONSUMER
    // ========================================================================

    fn cmd_produce<W: Write>(&self, out: &mut W) -> CommandResult {
        let item = self.kernel.buffer.try_produce()?;
        writeln!(out, "Produced {}", item)?;
        Ok(())
    }

    fn cmd_consume<W: Write>(&self, out: &mut W) -> CommandResult {
        let item = self.kernel.buffer.try_consume()?;
        writeln!(out, "Consumed {}", item)?;
        Ok(())
    }

    fn cmd_buffer<W: Write>(&self, out: &mut W) -> CommandResult {
        let items = self.kernel.buffer.contents();
        if items.is_empty() {
            writeln!(out, "Buffer: (empty)")?;
        } else {
            writeln!(out, "Buffer: {}", items.join(", "))?;
        }
        Ok(())
    }

    // ========================================================================
    // FILES
    // ========================================================================

    fn cmd_touch<W: Write>(&mut self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        const USAGE: &str = "touch <name> [user|admin] [y|n] [user-perms] [admin-perms]";
        let name = args.next().ok_or(CommandError::Usage(USAGE))?;
        let owner = match args.next() {
            Some(owner) => owner.parse::<User>()?,
            None => self.kernel.fs.user(),
        };
        let encrypted = match args.next() {
            Some(flag) => parse_flag(flag).ok_or(CommandError::Usage(USAGE))?,
            None => false,
        };
        let user_perms = match args.next() {
            Some(perms) => perms.parse::<Permissions>()?,
            None => Permissions::all(),
        };
        let admin_perms = match args.next() {
            Some(perms) => perms.parse::<Permissions>()?,
            None => Permissions::all(),
        };

        self.kernel
            .fs
            .create_file(name, owner, encrypted, user_perms, admin_perms)?;
        writeln!(out, "File '{}' created", name)?;
        Ok(())
    }

    fn cmd_write<W: Write>(&mut self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let name = args
            .next()
            .ok_or(CommandError::Usage("write <name> <text...>"))?;
        let text = args.collect::<Vec<_>>().join(" ");
        self.kernel.fs.write_file(name, &text)?;
        writeln!(out, "Written to '{}'", name)?;
        Ok(())
    }

    fn cmd_cat<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let name = args.next().ok_or(CommandError::Usage("cat <name>"))?;
        writeln!(out, "{}", self.kernel.fs.read_file(name)?)?;
        Ok(())
    }

    fn cmd_rm<W: Write>(&mut self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let name = args.next().ok_or(CommandError::Usage("rm <name>"))?;
        self.kernel.fs.delete_file(name)?;
        writeln!(out, "File '{}' deleted", name)?;
        Ok(())
    }

    fn cmd_mkdir<W: Write>(&mut self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let name = args.next().ok_or(CommandError::Usage("mkdir <name>"))?;
        self.kernel.fs.create_dir(name)?;
        writeln!(out, "Directory '{}' created", name)?;
        Ok(())
    }

    fn cmd_cd<W: Write>(&mut self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let name = args.next().ok_or(CommandError::Usage("cd <name|..>"))?;
        self.kernel.fs.change_dir(name)?;
        writeln!(out, "{}", self.kernel.fs.pwd())?;
        Ok(())
    }

    fn cmd_ls<W: Write>(&self, out: &mut W) -> CommandResult {
        write!(out, "{}", self.kernel.fs.list()?)?;
        Ok(())
    }

    fn cmd_pwd<W: Write>(&self, out: &mut W) -> CommandResult {
        writeln!(out, "{}", self.kernel.fs.pwd())?;
        Ok(())
    }

    fn cmd_su<W: Write>(&mut self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let name = args.next().ok_or(CommandError::Usage("su <user|admin>"))?;
        let user = self.kernel.fs.set_user(name)?;
        writeln!(out, "Current user: {}", user)?;
        Ok(())
    }

    fn cmd_find<W: Write>(&self, args: &mut SplitWhitespace<'_>, out: &mut W) -> CommandResult {
        let name = args.next().ok_or(CommandError::Usage("find <name>"))?;
        let found = self.kernel.fs.search(name);
        if found.is_empty() {
            writeln!(out, "'{}' not found", name)?;
        }
        for path in found {
            writeln!(out, "{}", path)?;
        }
        Ok(())
    }

    fn cmd_tree<W: Write>(&self, out: &mut W) -> CommandResult {
        write!(out, "{}", self.kernel.fs.tree())?;
        Ok(())
    }
}
