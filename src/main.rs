#[macro_use]
extern crate clap;

use std::io::Write;
use std::path;

use minisms::sat::minisat::{CCMinMode, CoreSettings, PhaseSaving};
use minisms::MainOptions;

fn main() {
    let ls012 = ["0", "1", "2"];
    let matches = clap::App::new("minisms-solve")
        .version(crate_version!())
        .about("CDCL SAT solver with an external-propagator hook for symmetry-breaking (SMS-style) search")
        .arg(clap::Arg::with_name("verb").long("verb").takes_value(true).possible_values(&ls012).help("Verbosity level (0=silent, 1=some, 2=more)"))
        .arg(clap::Arg::with_name("strict").long("strict").help("Validate the DIMACS header during parsing"))
        .arg(clap::Arg::with_name("no-pre").long("no-pre").help("Skip preprocessing (unit propagation + simplify at the root)"))
        .arg(clap::Arg::with_name("no-solve").long("no-solve").help("Stop after preprocessing; do not search"))
        .arg(clap::Arg::with_name("dimacs").long("dimacs").takes_value(true).requires("no-solve").help("Write the preprocessed instance here instead of solving"))
        .arg(clap::Arg::with_name("input").required(true))
        .arg(clap::Arg::with_name("output").required(false))
        .arg(clap::Arg::with_name("var-decay").long("var-decay").takes_value(true).help("Variable activity decay factor"))
        .arg(clap::Arg::with_name("cla-decay").long("cla-decay").takes_value(true).help("Clause activity decay factor"))
        .arg(clap::Arg::with_name("rnd-freq").long("rnd-freq").takes_value(true).help("Frequency of random variable decisions"))
        .arg(clap::Arg::with_name("rnd-seed").long("rnd-seed").takes_value(true).help("Seed for random variable selection"))
        .arg(clap::Arg::with_name("rnd-init").long("rnd-init").help("Randomize initial variable activity"))
        .arg(clap::Arg::with_name("ccmin-mode").long("ccmin-mode").takes_value(true).possible_values(&ls012).help("Conflict clause minimization (0=none, 1=basic, 2=deep)"))
        .arg(clap::Arg::with_name("phase-saving").long("phase-saving").takes_value(true).possible_values(&ls012).help("Phase saving (0=none, 1=limited, 2=full)"))
        .arg(clap::Arg::with_name("luby").long("luby").help("Use the Luby restart sequence"))
        .arg(clap::Arg::with_name("no-luby").long("no-luby").conflicts_with("luby").help("Use geometric restarts instead of Luby"))
        .arg(clap::Arg::with_name("rfirst").long("rfirst").takes_value(true).help("Base restart interval (in conflicts)"))
        .arg(clap::Arg::with_name("rinc").long("rinc").takes_value(true).help("Restart interval growth factor"))
        .arg(clap::Arg::with_name("gc-frac").long("gc-frac").takes_value(true).help("Fraction of wasted arena bytes allowed before a GC sweep"))
        .arg(clap::Arg::with_name("min-learnts").long("min-learnts").takes_value(true).help("Minimum learnt-clause ceiling"))
        .get_matches();

    {
        let mut builder = env_logger::Builder::new();
        builder.format(|buf, record| writeln!(buf, "{}", record.args()));
        builder.filter(
            None,
            match matches.value_of("verb") {
                Some("1") => log::LevelFilter::Info,
                Some("2") => log::LevelFilter::Trace,
                Some(_) => log::LevelFilter::Off,
                None => log::LevelFilter::Info,
            },
        );
        builder.init();
    }

    let core_settings = build_core_settings(&matches);

    let main_opts = MainOptions {
        strict: matches.is_present("strict"),
        pre: !matches.is_present("no-pre"),
        solve: !matches.is_present("no-solve"),
        in_path: path::PathBuf::from(matches.value_of("input").unwrap()),
        out_path: matches.value_of("output").map(path::PathBuf::from),
        dimacs_path: matches.value_of("dimacs").map(path::PathBuf::from),
    };

    minisms::solve(main_opts, core_settings).expect("solve failed");
}

fn build_core_settings(matches: &clap::ArgMatches) -> CoreSettings {
    let mut s = CoreSettings::default();

    if let Some(x) = matches.value_of("var-decay").and_then(|v| v.parse::<f64>().ok()) {
        if 0.0 < x && x < 1.0 {
            s.heur.var_decay = x;
        }
    }

    if let Some(x) = matches.value_of("cla-decay").and_then(|v| v.parse::<f64>().ok()) {
        if 0.0 < x && x < 1.0 {
            s.db.clause_decay = x;
        }
    }

    if let Some(x) = matches.value_of("rnd-freq").and_then(|v| v.parse::<f64>().ok()) {
        if 0.0 <= x && x <= 1.0 {
            s.heur.random_var_freq = x;
        }
    }

    if let Some(x) = matches.value_of("rnd-seed").and_then(|v| v.parse::<f64>().ok()) {
        if 0.0 < x {
            s.heur.random_seed = x;
        }
    }

    if matches.is_present("rnd-init") {
        s.heur.rnd_init_act = true;
    }

    match matches.value_of("ccmin-mode") {
        Some("0") => s.ccmin_mode = CCMinMode::None,
        Some("1") => s.ccmin_mode = CCMinMode::Basic,
        Some("2") => s.ccmin_mode = CCMinMode::Deep,
        _ => {}
    }

    match matches.value_of("phase-saving") {
        Some("0") => s.heur.phase_saving = PhaseSaving::None,
        Some("1") => s.heur.phase_saving = PhaseSaving::Limited,
        Some("2") => s.heur.phase_saving = PhaseSaving::Full,
        _ => {}
    }

    if matches.is_present("luby") {
        s.search.restart.luby_restart = true;
    }
    if matches.is_present("no-luby") {
        s.search.restart.luby_restart = false;
    }

    if let Some(x) = matches.value_of("rfirst").and_then(|v| v.parse::<f64>().ok()) {
        if x > 0.0 {
            s.search.restart.restart_first = x;
        }
    }

    if let Some(x) = matches.value_of("rinc").and_then(|v| v.parse::<f64>().ok()) {
        if x > 1.0 {
            s.search.restart.restart_inc = x;
        }
    }

    if let Some(x) = matches.value_of("gc-frac").and_then(|v| v.parse::<f64>().ok()) {
        if 0.0 < x && x <= 1.0 {
            s.core.garbage_frac = x;
        }
    }

    if let Some(x) = matches.value_of("min-learnts").and_then(|v| v.parse::<usize>().ok()) {
        s.search.learn.min_learnts_lim = x;
    }

    s
}
