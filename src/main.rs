use clap::{Parser, Subcommand};
use glucoaster::glucose::{self, RangeStats, TimeRange, IDEAL_RANGE};
use glucoaster::{
    catalog, BaselineSet, Character, Classification, CsvDirLoader, MealReport, Pipeline,
    Session, Slot, TableLoader,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "glucoaster")]
#[command(author, version, about = "Compare meal nutrients with baselines and explore the glucose day around them")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding male.csv (Jack) and female.csv (Jill)
    #[arg(long, global = true, default_value = ".")]
    data_dir: PathBuf,

    /// Baseline set: nih or meal-target
    #[arg(long, global = true, default_value = "nih")]
    baselines: BaselineSet,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the meals a character logged
    Meals {
        /// jack or jill
        character: Character,
    },

    /// Compare one meal with the baselines
    Analyze {
        character: Character,
        meal: String,

        /// Write the full report (.json, .csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the glucose day around a meal
    Glucose {
        character: Character,
        meal: String,

        /// Only keep samples from 17:00 to the end of the day
        #[arg(long)]
        evening: bool,

        /// Report the sample nearest to this time (HH:MM[:SS] or full timestamp)
        #[arg(long)]
        at: Option<String>,

        /// Start of a range to aggregate
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// End of a range to aggregate
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Put two evening meals side by side
    Compare {
        first_character: Character,
        first_meal: String,
        second_character: Character,
        second_meal: String,
    },

    /// Start the local JSON API
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3002")]
        port: u16,
    },
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(args) {
        eprintln!("\x1b[31mError:\x1b[0m {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> glucoaster::Result<()> {
    let loader = CsvDirLoader::new(&args.data_dir);
    let baselines = args.baselines;

    match args.command {
        Command::Meals { character } => list_meals(&loader, character),
        Command::Analyze { character, meal, output } => {
            analyze_meal(&loader, baselines, character, &meal, output)
        }
        Command::Glucose { character, meal, evening, at, from, to } => {
            let range = if evening { Some(TimeRange::evening()) } else { None };
            let span = from.zip(to);
            show_glucose(&loader, baselines, character, &meal, range, at.as_deref(), span)
        }
        Command::Compare { first_character, first_meal, second_character, second_meal } => {
            compare(
                &loader,
                baselines,
                [(first_character, first_meal), (second_character, second_meal)],
            )
        }
        #[cfg(feature = "server")]
        Command::Serve { port } => {
            glucoaster::serve::start(port, args.data_dir, baselines)?;
            Ok(())
        }
    }
}

fn list_meals(loader: &dyn TableLoader, character: Character) -> glucoaster::Result<()> {
    let mut view = Pipeline::new(Slot::Primary, BaselineSet::default().baselines());
    view.load_with(loader, character)?;

    eprintln!("\x1b[1m{} meals\x1b[0m", character.possessive());
    eprintln!("{}", "─".repeat(50));
    if view.meals().is_empty() {
        println!("No meals logged.");
    }
    for (i, meal) in view.meals().iter().enumerate() {
        println!("{:>3}. {:<30} {}", i + 1, catalog::display_name(meal), meal);
    }
    Ok(())
}

fn analyze_meal(
    loader: &dyn TableLoader,
    baselines: BaselineSet,
    character: Character,
    meal: &str,
    output: Option<PathBuf>,
) -> glucoaster::Result<()> {
    let mut view = Pipeline::new(Slot::Primary, baselines.baselines());
    view.load_with(loader, character)?;
    view.choose_meal(meal)?;

    eprintln!(
        "\x1b[1m{}: {}\x1b[0m  \x1b[90m({} baselines)\x1b[0m",
        character,
        catalog::display_name(meal),
        baselines
    );
    eprintln!("{}", "─".repeat(50));

    for r in view.readings() {
        let color = match r.classification {
            Classification::Above => "\x1b[31m", // Red
            Classification::At => "\x1b[32m",    // Green
            Classification::Below => "\x1b[33m", // Yellow
        };
        println!(
            "{:<8} {:>7.1}g  baseline {:>5.1}g  {}{:>+7.1}g {:<6}\x1b[0m",
            r.nutrient.name(),
            r.value,
            r.baseline,
            color,
            r.difference,
            r.classification
        );
    }

    let summary = glucoaster::nutrients::summarize(view.readings());
    eprintln!("\n{}", summary.takeaway());

    if let Some(path) = output {
        let report = MealReport::build(character, view.table(), meal, view.baselines(), None)?;
        glucoaster::report::generate(&path, &report)?;
        eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", path.display());
    }
    Ok(())
}

fn show_glucose(
    loader: &dyn TableLoader,
    baselines: BaselineSet,
    character: Character,
    meal: &str,
    range: Option<TimeRange>,
    at: Option<&str>,
    span: Option<(String, String)>,
) -> glucoaster::Result<()> {
    let table = loader.load(character)?;
    let report = MealReport::build(character, &table, meal, &baselines.baselines(), range)?;
    let window = &report.window;

    eprintln!(
        "\x1b[1m{}: {} on {}\x1b[0m",
        character,
        report.display_name,
        window.date
    );
    eprintln!("{}", "─".repeat(50));

    if window.is_empty() {
        println!("No glucose samples in this window.");
        return Ok(());
    }

    if let Some((first, last)) = window.extent() {
        println!(
            "{} samples from {} to {}",
            window.len(),
            first.format("%H:%M"),
            last.format("%H:%M")
        );
    }
    if let Some(ref stats) = report.stats {
        print_stats("Day", stats);
    }
    for marker in &report.markers {
        println!(
            "  {} {:<10} {}",
            marker.timestamp.format("%H:%M"),
            marker.meal_type.map(|t| t.to_string()).unwrap_or_default(),
            marker.meal.as_deref().unwrap_or("")
        );
    }

    if let Some(at) = at {
        let query = glucose::resolve_time(window.date, at)?;
        let sample = glucose::nearest(window, query)?;
        println!(
            "\nNearest to {}: {} mg/dL at {}",
            query.format("%H:%M:%S"),
            sample.glucose,
            sample.timestamp.format("%H:%M:%S")
        );
    }

    if let Some((from, to)) = span {
        let from = glucose::resolve_time(window.date, &from)?;
        let to = glucose::resolve_time(window.date, &to)?;
        println!();
        match glucose::aggregate(window, from, to) {
            Some(stats) => print_stats("Range", &stats),
            None => println!("Range: no samples between {} and {}", from, to),
        }
    }
    Ok(())
}

fn compare(
    loader: &dyn TableLoader,
    baselines: BaselineSet,
    picks: [(Character, String); 2],
) -> glucoaster::Result<()> {
    let mut session = Session::new(baselines.baselines());

    for (slot, (character, meal)) in [Slot::Comparison1, Slot::Comparison2].into_iter().zip(&picks) {
        let view = session.slot_mut(slot);
        view.load_with(loader, *character)?;
        view.choose_meal(meal)?;
        view.show_glucose()?;
    }

    eprintln!("\x1b[1mEvening comparison\x1b[0m");
    eprintln!("{}", "─".repeat(50));

    for (slot, (character, meal)) in [Slot::Comparison1, Slot::Comparison2].into_iter().zip(&picks) {
        let view = session.slot(slot);
        println!("\x1b[1m{}: {}\x1b[0m", character, catalog::display_name(meal));
        for r in view.readings() {
            println!("  {:<8} {:>7.1}g ({})", r.nutrient.name(), r.value, r.classification);
        }
        match view.window().and_then(|w| w.stats()) {
            Some(stats) => print_stats("  Evening", &stats),
            None => println!("  Evening: no glucose samples"),
        }
        println!();
    }
    Ok(())
}

fn print_stats(label: &str, stats: &RangeStats) {
    let color = if stats.within_ideal() { "\x1b[32m" } else { "\x1b[33m" };
    println!(
        "{}: {}mean {:.1}\x1b[0m  min {:.0}  max {:.0}  ({} samples, {}-{}, ideal {:.0}-{:.0} mg/dL)",
        label,
        color,
        stats.mean,
        stats.min,
        stats.max,
        stats.count,
        stats.start.timestamp.format("%H:%M"),
        stats.end.timestamp.format("%H:%M"),
        IDEAL_RANGE.start(),
        IDEAL_RANGE.end()
    );
}
