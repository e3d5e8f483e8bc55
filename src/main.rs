use clap::{Args, Parser, Subcommand};
use crossterm::tty::IsTty;
use mathdrill::{
    assignment::{
        generator_from_spec, parse_assignment_specs, AssignmentDraft, AssignmentRecord,
    },
    config::{Config, ConfigStore, FileConfigStore},
    generator::{catalog, find_builtin, ProblemGenerator},
    runtime::{FixedTicker, Runner, StdinEventSource, SystemClock},
    scheduler::PromptScheduler,
    stats::{AttemptRecord, StatsDb},
    ui::{summary::summary_lines, terminal::TerminalUi},
    util::format_elapsed,
    DrillError, GameSession, ResultStats, SessionState,
};
use rand::{rngs::StdRng, SeedableRng};
use std::{
    error::Error,
    fs,
    io::{self, Write},
    path::PathBuf,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// arithmetic drills in the terminal with timed sessions and homework assignments
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Arithmetic drills in the terminal: multiplication, division, addition, subtraction and bracket expansion, with win conditions, a session time limit, result history and instructor-defined assignments."
)]
pub struct Cli {
    /// results database to use instead of the default location
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    /// config file to use instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// user id to record results for (overrides the configured one)
    #[clap(long, global = true)]
    user: Option<String>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// list the built-in games
    List,
    /// play a built-in game
    Play {
        /// game key, e.g. multiplication.v1 (defaults to the configured game)
        game: Option<String>,
        #[clap(flatten)]
        session: SessionArgs,
    },
    /// manage and play homework assignments
    Assignment {
        #[clap(subcommand)]
        action: AssignmentCommand,
    },
    /// show the latest result and attempt history
    Stats {
        /// only attempts played for this assignment
        #[clap(long)]
        assignment: Option<String>,
        /// write all attempts as CSV to stdout
        #[clap(long)]
        csv: bool,
    },
    /// show or change the configuration
    Config {
        #[clap(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct SessionArgs {
    /// points needed to win
    #[clap(long)]
    points: Option<i64>,
    /// problems that must be attempted before a win counts
    #[clap(long)]
    min_attempted: Option<u32>,
    /// session time limit in minutes
    #[clap(long)]
    minutes: Option<u64>,
    /// seed for reproducible problem sequences
    #[clap(long)]
    seed: Option<u64>,
    /// serve follow-up problems through the spaced scheduler
    #[clap(long)]
    spaced: bool,
}

#[derive(Args, Debug, Clone)]
struct SpecSource {
    /// generator specs as JSON, e.g. '[{"key":"multiplication.v1","params":{"min":1,"max":10}}]'
    #[clap(long, conflicts_with = "file")]
    json: Option<String>,
    /// read the generator specs from a file
    #[clap(long)]
    file: Option<PathBuf>,
}

impl SpecSource {
    fn read(&self) -> io::Result<Option<String>> {
        match (&self.json, &self.file) {
            (Some(json), _) => Ok(Some(json.clone())),
            (None, Some(path)) => fs::read_to_string(path).map(Some),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
enum AssignmentCommand {
    /// create an assignment
    Create {
        name: String,
        /// free-form due date text
        #[clap(long, default_value = "")]
        due: String,
        /// create the assignment as inactive
        #[clap(long)]
        inactive: bool,
        #[clap(flatten)]
        specs: SpecSource,
    },
    /// list assignments
    List,
    /// show one assignment and how its specs parse
    Show { id: String },
    /// change fields of an assignment
    Update {
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        due: Option<String>,
        #[clap(long)]
        active: Option<bool>,
        #[clap(long)]
        version: Option<u32>,
        #[clap(flatten)]
        specs: SpecSource,
    },
    /// delete an assignment
    Delete { id: String },
    /// play an assignment
    Play {
        id: String,
        #[clap(flatten)]
        session: SessionArgs,
    },
    /// check generator specs without storing them
    Validate {
        #[clap(flatten)]
        specs: SpecSource,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum ConfigCommand {
    /// print the effective configuration
    Show,
    /// set one configuration value
    Set { key: String, value: String },
    /// restore the defaults
    Reset,
}

struct Context {
    store: FileConfigStore,
    config: Config,
    user: String,
    db_path: Option<PathBuf>,
}

impl Context {
    fn new(cli: &Cli) -> Self {
        let store = match &cli.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let config = store.load();
        let user = cli.user.clone().unwrap_or_else(|| config.user_id.clone());
        Self {
            store,
            config,
            user,
            db_path: cli.db.clone(),
        }
    }

    fn open_db(&self) -> mathdrill::Result<StatsDb> {
        match &self.db_path {
            Some(path) => StatsDb::open(path),
            None => StatsDb::open_default(),
        }
    }

    fn session_config(&self, args: &SessionArgs) -> mathdrill::SessionConfig {
        let mut config = self.config.session_config();
        if let Some(points) = args.points {
            config.points_required_to_win = points;
        }
        if let Some(min) = args.min_attempted {
            config.min_problems_attempted_to_win = min;
        }
        if let Some(minutes) = args.minutes {
            config.max_session_duration_ms = minutes.saturating_mul(60_000);
        }
        config.route_through_scheduler |= args.spaced;
        config
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::new(&cli);

    match cli.command.clone() {
        None => play_builtin(&ctx, None, &SessionArgs::default()),
        Some(Command::List) => list_games(&mut io::stdout()),
        Some(Command::Play { game, session }) => play_builtin(&ctx, game, &session),
        Some(Command::Assignment { action }) => run_assignment_command(&ctx, action),
        Some(Command::Stats { assignment, csv }) => show_stats(&ctx, assignment, csv),
        Some(Command::Config { action }) => run_config_command(ctx, action),
    }
}

fn list_games<W: Write>(out: &mut W) -> Result<(), Box<dyn Error>> {
    let games = catalog();
    let grades = [
        ("5th grade", &games.fifth_grade),
        ("6th grade", &games.sixth_grade),
    ];
    for (grade, generators) in grades {
        writeln!(out, "{grade}")?;
        for g in generators {
            writeln!(out, "  {:<26} {}", g.persistency_key(), g.label())?;
        }
    }
    Ok(())
}

fn play_builtin(
    ctx: &Context,
    game: Option<String>,
    args: &SessionArgs,
) -> Result<(), Box<dyn Error>> {
    let key = game.unwrap_or_else(|| ctx.config.default_game.clone());
    let generator = find_builtin(&key).ok_or(DrillError::UnknownGame(key))?;
    play(ctx, generator, None, args)
}

fn play(
    ctx: &Context,
    generator: Box<dyn ProblemGenerator>,
    assignment_id: Option<String>,
    args: &SessionArgs,
) -> Result<(), Box<dyn Error>> {
    let db = ctx.open_db()?;
    let config = ctx.session_config(args);
    let scheduler = match args.seed {
        Some(seed) => PromptScheduler::with_rng(generator, StdRng::seed_from_u64(seed)),
        None => PromptScheduler::new(generator),
    };

    let stdout = io::stdout();
    let styled = stdout.is_tty();
    println!(
        "{}: answer with a number, '?' reveals the answer, 'q' quits.",
        scheduler.generator().label()
    );
    let ui = TerminalUi::new(stdout, styled);
    let mut session = GameSession::with_scheduler(scheduler, ui, config, Box::new(SystemClock));

    let runner = Runner::new(StdinEventSource::new(), FixedTicker::every_second());
    let Some(stats) = runner.drive(&mut session) else {
        info!("session abandoned");
        return Ok(());
    };

    if session.state() == SessionState::TimedOut {
        for line in summary_lines(&stats) {
            println!("{line}");
        }
    }
    persist_result(&db, &ctx.user, assignment_id, session.state(), &stats);
    Ok(())
}

/// Failures here are reported but never turn a finished session into an error.
fn persist_result(
    db: &StatsDb,
    user: &str,
    assignment_id: Option<String>,
    outcome: SessionState,
    stats: &ResultStats,
) {
    if let Err(e) = db.save_personal_best(user, stats) {
        error!(error = %e, "could not save the result summary");
        eprintln!("Could not save your result: {e}");
    }
    let attempt = AttemptRecord::new(user, assignment_id, outcome, stats.clone());
    if let Err(e) = db.record_attempt(&attempt) {
        error!(error = %e, "could not record the attempt");
        eprintln!("Could not record this attempt: {e}");
    }
}

fn required_assignment(
    db: &StatsDb,
    user: &str,
    id: &str,
) -> mathdrill::Result<AssignmentRecord> {
    db.assignment(user, id)?
        .ok_or_else(|| DrillError::AssignmentNotFound(id.to_string()))
}

fn print_assignment<W: Write>(out: &mut W, record: &AssignmentRecord) -> io::Result<()> {
    writeln!(
        out,
        "{}  {}{}  due: {}  v{}",
        record.id,
        record.name,
        if record.is_active { "" } else { " (inactive)" },
        if record.due_text.is_empty() {
            "-"
        } else {
            record.due_text.as_str()
        },
        record.version
    )
}

/// Describe how each spec resolves. Returns the number of usable generators.
fn report_specs<W: Write>(out: &mut W, json: &str) -> Result<usize, Box<dyn Error>> {
    let parsed = parse_assignment_specs(json);
    if let Some(message) = parsed.error {
        writeln!(out, "error: {message}")?;
        return Ok(0);
    }
    let mut usable = 0;
    for spec in &parsed.specs {
        let status = match generator_from_spec(spec) {
            Some(_) => {
                usable += 1;
                "ok"
            }
            None => "omitted",
        };
        writeln!(
            out,
            "  {:<26} p={:<6} {} {}",
            spec.key, spec.probability, spec.params, status
        )?;
    }
    writeln!(out, "{usable} of {} generators usable", parsed.specs.len())?;
    Ok(usable)
}

fn run_assignment_command(
    ctx: &Context,
    action: AssignmentCommand,
) -> Result<(), Box<dyn Error>> {
    let mut out = io::stdout();
    if let AssignmentCommand::Validate { specs } = &action {
        let json = specs.read()?.unwrap_or_else(|| "[]".to_string());
        if report_specs(&mut out, &json)? == 0 {
            return Err(DrillError::InvalidConfig("no usable generators".to_string()).into());
        }
        return Ok(());
    }

    let db = ctx.open_db()?;
    match action {
        AssignmentCommand::Create {
            name,
            due,
            inactive,
            specs,
        } => {
            let draft = AssignmentDraft {
                name,
                due_text: due,
                is_active: !inactive,
                game_types_json: specs.read()?.unwrap_or_else(|| "[]".to_string()),
                ..AssignmentDraft::default()
            };
            let record = db.create_assignment(&ctx.user, &draft)?;
            print_assignment(&mut out, &record)?;
        }
        AssignmentCommand::List => {
            let records = db.assignments(&ctx.user)?;
            if records.is_empty() {
                writeln!(out, "no assignments for {}", ctx.user)?;
            }
            for record in &records {
                print_assignment(&mut out, record)?;
            }
        }
        AssignmentCommand::Show { id } => {
            let record = required_assignment(&db, &ctx.user, &id)?;
            print_assignment(&mut out, &record)?;
            report_specs(&mut out, &record.game_types_json)?;
        }
        AssignmentCommand::Update {
            id,
            name,
            due,
            active,
            version,
            specs,
        } => {
            let mut draft = required_assignment(&db, &ctx.user, &id)?.draft();
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(due) = due {
                draft.due_text = due;
            }
            if let Some(active) = active {
                draft.is_active = active;
            }
            if let Some(version) = version {
                draft.version = version;
            }
            if let Some(json) = specs.read()? {
                draft.game_types_json = json;
            }
            let record = db.update_assignment(&ctx.user, &id, &draft)?;
            print_assignment(&mut out, &record)?;
        }
        AssignmentCommand::Delete { id } => {
            db.delete_assignment(&ctx.user, &id)?;
            writeln!(out, "deleted {id}")?;
        }
        AssignmentCommand::Play { id, session } => {
            let record = required_assignment(&db, &ctx.user, &id)?;
            if !record.is_active {
                return Err(DrillError::InvalidConfig(format!(
                    "assignment {id} is not active"
                ))
                .into());
            }
            let generator = record.generator()?;
            drop(db);
            play(ctx, Box::new(generator), Some(record.id), &session)?;
        }
        AssignmentCommand::Validate { .. } => {}
    }
    Ok(())
}

fn show_stats(
    ctx: &Context,
    assignment: Option<String>,
    csv: bool,
) -> Result<(), Box<dyn Error>> {
    let db = ctx.open_db()?;
    let mut out = io::stdout();
    if csv {
        db.export_attempts_csv(&ctx.user, &mut out)?;
        return Ok(());
    }

    match db.personal_best(&ctx.user)? {
        Some(best) => {
            writeln!(out, "Latest result ({})", best.timestamp.format("%Y-%m-%d %H:%M"))?;
            for line in summary_lines(&best.stats) {
                writeln!(out, "  {line}")?;
            }
        }
        None => writeln!(out, "No results yet for {}", ctx.user)?,
    }

    let attempts = db.attempts(&ctx.user, assignment.as_deref())?;
    if !attempts.is_empty() {
        writeln!(out, "\nAttempts")?;
    }
    for a in &attempts {
        writeln!(
            out,
            "  {}  {:<10} {:<26} {:>4} pts {:>3}% first try  {}",
            a.timestamp.format("%Y-%m-%d %H:%M"),
            a.outcome,
            a.stats.game_type_key,
            a.stats.points_toward_win,
            a.stats.percent_correct_on_first_try,
            format_elapsed(a.stats.time_elapsed_ms)
        )?;
    }
    Ok(())
}

fn run_config_command(mut ctx: Context, action: ConfigCommand) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigCommand::Show => {}
        ConfigCommand::Set { key, value } => {
            ctx.config.set(&key, &value)?;
            ctx.store.save(&ctx.config)?;
        }
        ConfigCommand::Reset => {
            ctx.config = Config::default();
            ctx.store.save(&ctx.config)?;
        }
    }
    println!("{}", serde_json::to_string_pretty(&ctx.config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_playing() {
        let cli = Cli::parse_from(["mathdrill"]);
        assert!(cli.command.is_none());
        assert!(cli.db.is_none());
        assert!(cli.user.is_none());
    }

    #[test]
    fn test_cli_play_with_overrides() {
        let cli = Cli::parse_from([
            "mathdrill",
            "play",
            "division.v1",
            "--points",
            "5",
            "--minutes",
            "2",
            "--seed",
            "7",
            "--spaced",
            "--user",
            "ana",
        ]);
        assert_eq!(cli.user.as_deref(), Some("ana"));
        match cli.command {
            Some(Command::Play { game, session }) => {
                assert_eq!(game.as_deref(), Some("division.v1"));
                assert_eq!(session.points, Some(5));
                assert_eq!(session.minutes, Some(2));
                assert_eq!(session.seed, Some(7));
                assert!(session.spaced);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_both_spec_sources() {
        let res = Cli::try_parse_from([
            "mathdrill",
            "assignment",
            "validate",
            "--json",
            "[]",
            "--file",
            "specs.json",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_session_args_override_config() {
        let cli = Cli::parse_from(["mathdrill", "--config", "/nonexistent/mathdrill.json"]);
        let ctx = Context::new(&cli);
        let args = SessionArgs {
            points: Some(3),
            min_attempted: Some(4),
            minutes: Some(1),
            seed: None,
            spaced: true,
        };
        let config = ctx.session_config(&args);
        assert_eq!(config.points_required_to_win, 3);
        assert_eq!(config.min_problems_attempted_to_win, 4);
        assert_eq!(config.max_session_duration_ms, 60_000);
        assert!(config.route_through_scheduler);
        assert_eq!(ctx.user, "local");
    }

    #[test]
    fn test_list_games_prints_every_key() {
        let mut out = Vec::new();
        list_games(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        for g in catalog().all() {
            assert!(text.contains(g.persistency_key()));
        }
        assert!(text.starts_with("5th grade"));
    }

    #[test]
    fn test_report_specs_counts_usable_generators() {
        let mut out = Vec::new();
        let usable = report_specs(
            &mut out,
            r#"[{"key":"multiplication.v1","params":{"min":1,"max":10}},{"key":"unknown.v1"}]"#,
        )
        .unwrap();
        assert_eq!(usable, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("omitted"));
        assert!(text.contains("1 of 2 generators usable"));

        let mut out = Vec::new();
        assert_eq!(report_specs(&mut out, "nope").unwrap(), 0);
        assert!(String::from_utf8(out).unwrap().starts_with("error:"));
    }
}
