/// Interactive flux image console application

use fluxtool::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::fs::File;
use std::io::{BufWriter, Write};

/// Command completer for the REPL
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "details",
                "disk",
                "dump",
                "exit",
                "help",
                "ignore-size",
                "info",
                "map",
                "merge",
                "output-range",
                "quit",
                "range",
                "read",
                "retry",
                "stats",
                "write",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Prints progress to stderr, overwriting the line until the summary
struct ConsoleReport;

impl ProgressReport for ConsoleReport {
    fn report(&mut self, info: &DiskInfo, summary: bool) {
        if summary {
            eprintln!("\r{:<72}", info.status_line(true));
            for line in info.error_details() {
                eprintln!("{}", line);
            }
        } else {
            eprint!("\r{:<72}", info.status_line(false));
        }
    }
}

/// Settings and results that live across commands
struct Session {
    disk: Disk,
    options: Options,
    dump_path: Option<String>,
    last: Option<DiskInfo>,
}

impl Session {
    fn new() -> Self {
        Self {
            disk: Disk::apple2_dos33(),
            options: Options::default(),
            dump_path: None,
            last: None,
        }
    }

    fn read(&mut self, image: &str, flux: &[String]) -> Result<()> {
        let mut files = Vec::with_capacity(flux.len());
        for path in flux {
            files.push(FluxFile::open(path)?);
        }
        let mut sources: Vec<&mut dyn FluxSource> =
            files.iter_mut().map(|f| f as &mut dyn FluxSource).collect();
        let mut dst = PlainImage::open(image, OpenMode::Write)?;

        let mut dump = match &self.dump_path {
            Some(path) => Some(BufWriter::new(File::create(path)?)),
            None => None,
        };
        let mut orchestrator = TrackOrchestrator::new(&self.disk, &self.options);
        if let Some(out) = dump.as_mut() {
            orchestrator = orchestrator.with_dump(out);
        }
        let info = orchestrator.read(&mut sources, &mut dst, &mut ConsoleReport)?;
        if orchestrator.dumped_blocks() > 0 {
            println!("{} blocks dumped", orchestrator.dumped_blocks());
        }
        if let Some(mut out) = dump {
            out.flush()?;
        }
        self.last = Some(info);
        Ok(())
    }

    fn write(&mut self, image: &str, flux: &str) -> Result<()> {
        let mut src = PlainImage::open(image, OpenMode::Read)?;
        let mut dst = FluxFile::create(flux)?;
        let info = TrackOrchestrator::new(&self.disk, &self.options).write(
            &mut src,
            &mut dst,
            &mut ConsoleReport,
        )?;
        self.last = Some(info);
        Ok(())
    }

    fn stats(&self, flux: &str) -> Result<()> {
        let mut source = FluxFile::open(flux)?;
        let stats = TrackOrchestrator::new(&self.disk, &self.options).statistics(&mut source)?;
        for track in &stats {
            print!("{}", track);
        }
        if stats.is_empty() {
            println!("No formatted tracks in range.");
        }
        Ok(())
    }

    fn select_disk(&mut self, parts: &[String]) -> Result<()> {
        match parts.first().map(|s| s.to_lowercase()).as_deref() {
            None => {}
            Some("dos33") => self.disk = Disk::apple2_dos33(),
            Some("raw") => {
                let first = parse_number(parts.get(1), 0)?;
                let last = parse_number(parts.get(2), first)?;
                self.disk = Disk::raw(first..=last)?;
            }
            Some(other) => {
                return Err(FluxError::config(format!("unknown disk layout '{}'", other)));
            }
        }
        print_disk(&self.disk);
        Ok(())
    }

    fn select_merge(&mut self, parts: &[String]) -> Result<()> {
        let fixup = parts.iter().skip(1).any(|p| p.eq_ignore_ascii_case("fixup"));
        let policy = match parts.first().map(|s| s.to_lowercase()).as_deref() {
            None => self.options.merge(),
            Some("none") | Some("off") => MergePolicy::none(),
            Some("pairwise") => MergePolicy::pairwise().with_fixup(fixup),
            Some("running") => MergePolicy::running().with_fixup(fixup),
            Some(other) => {
                return Err(FluxError::config(format!("unknown merge policy '{}'", other)));
            }
        };
        self.options.set_merge(policy);
        println!("Merge: {:?}", self.options.merge());
        Ok(())
    }

    fn print_info(&self) {
        print_disk(&self.disk);
        println!("Disk tracks:   {:?}", self.options.disk_tracks());
        println!("Output tracks: {:?}", self.options.output_tracks());
        println!("Retry:         {}", self.options.retry());
        println!("Ignore size:   {}", self.options.ignore_size());
        println!("Merge:         {:?}", self.options.merge());
        match &self.dump_path {
            Some(path) => println!("Dump:          {}", path),
            None => println!("Dump:          off"),
        }
        if let Some(ref info) = self.last {
            println!();
            print!("{}", info);
        }
    }
}

/// Get the path to the history file
fn history_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".fluxtool_history");
        p
    })
}

fn main() {
    env_logger::init();

    println!("=== FluxTool ===");
    println!("Interactive console for reading and writing flux images.");
    println!("Type 'help' for available commands\n");

    let mut rl = Editor::new().expect("Failed to create editor");
    rl.set_helper(Some(CommandCompleter::new()));

    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut session = Session::new();

    loop {
        let readline = rl.readline("> ");
        let input = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        if parts.is_empty() {
            continue;
        }
        let command = parts[0].to_lowercase();
        let args = &parts[1..];

        let result = match command.as_str() {
            "help" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" => {
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            "disk" => session.select_disk(args),
            "range" => parse_range(args).and_then(|(first, last)| {
                session.options.set_disk_track_range(first, last)
            }),
            "output-range" => parse_range(args).and_then(|(first, last)| {
                session.options.set_output_track_range(first, last)
            }),
            "retry" => parse_number(args.first(), session.options.retry())
                .and_then(|n| session.options.set_retry(n)),
            "ignore-size" => {
                let on = !matches!(args.first().map(String::as_str), Some("off") | Some("0"));
                session.options.set_ignore_size(on);
                Ok(())
            }
            "merge" => session.select_merge(args),
            "dump" => {
                match args.first().map(String::as_str) {
                    None | Some("off") => session.dump_path = None,
                    Some(path) => session.dump_path = Some(path.to_string()),
                }
                Ok(())
            }
            "read" => {
                if args.len() < 2 {
                    println!("Usage: read <image> <flux> [flux...]");
                    Ok(())
                } else {
                    session.read(&args[0], &args[1..])
                }
            }
            "write" => {
                if args.len() < 2 {
                    println!("Usage: write <image> <flux>");
                    Ok(())
                } else {
                    session.write(&args[0], &args[1])
                }
            }
            "stats" => {
                if let Some(path) = args.first() {
                    session.stats(path)
                } else {
                    println!("Usage: stats <flux>");
                    Ok(())
                }
            }
            "info" => {
                session.print_info();
                Ok(())
            }
            "details" => {
                match session.last {
                    Some(ref info) => {
                        let lines = info.error_details();
                        if lines.is_empty() {
                            println!("No bad or weak sectors.");
                        }
                        for line in lines {
                            println!("{}", line);
                        }
                    }
                    None => println!("Nothing read or written yet."),
                }
                Ok(())
            }
            "map" => {
                match session.last {
                    Some(ref info) => map::draw_sector_map(info),
                    None => println!("Nothing read or written yet."),
                }
                Ok(())
            }
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", command);
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("Error: {}", e);
        }
    }
}

fn parse_number(arg: Option<&String>, default: usize) -> Result<usize> {
    match arg {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| FluxError::config(format!("'{}' is not a number", s))),
    }
}

fn parse_range(args: &[String]) -> Result<(usize, usize)> {
    let first = parse_number(args.first(), 0)?;
    let last = parse_number(args.get(1), first)?;
    Ok((first, last))
}

fn print_disk(disk: &Disk) {
    println!("Disk: {} ({} tracks used)", disk.name, disk.tracks_used());
    if !disk.info.is_empty() {
        println!("  {}", disk.info);
    }
}

/// Parse command line input, respecting quoted strings
fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  disk [dos33|raw <first> [last]]  - Show or select the disk layout");
    println!("  range <first> [last]             - Limit the tracks read or written");
    println!("  output-range <first> [last]      - Limit the tracks that go to the dump");
    println!("  retry <n>                        - Extra read attempts for bad tracks");
    println!("  merge [none|pairwise|running] [fixup] - Merge captures of greedy tracks");
    println!("  ignore-size [on|off]             - Pad short image blocks instead of failing");
    println!("  dump [path|off]                  - Write raw text of bad sectors while reading");
    println!("  read <image> <flux> [flux...]    - Decode flux files into a sector image");
    println!("  write <image> <flux>             - Encode a sector image into a flux file");
    println!("  stats <flux>                     - Show pulse histograms per track");
    println!("  info                             - Show settings and the last result");
    println!("  details                          - List bad and weak sectors of the last run");
    println!("  map                              - Visual sector map of the last run");
    println!("  help                             - Show this help");
    println!("  quit, exit                       - Exit");
}
