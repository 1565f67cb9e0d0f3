use std::io::{self, Write};
use std::process::ExitCode;

use procsched::{
    Reporter, SchedError,
    cli::{self, Command, Invocation},
    config::Config,
    exec::{ForkExecutor, SimExecutor},
    logging,
    sim::{Sim, load_job_list},
};

fn main() -> ExitCode {
    let (config, warnings) = Config::from_lookup_with_warnings(|key| std::env::var(key).ok());
    if let Err(e) = logging::init(config.log_level) {
        eprintln!("logger already installed: {e}");
    }
    Config::log_warnings(&warnings);

    let exe = std::env::args().next().unwrap_or_else(|| "procsched".into());
    let invocation = match cli::parse_args(std::env::args_os().skip(1)) {
        Ok(Command::Run(invocation)) => invocation,
        Ok(Command::Help) => {
            println!("{}", cli::usage(&exe));
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!();
            eprintln!("{}", cli::usage(&exe));
            return ExitCode::from(1);
        }
    };

    let mut reporter = Reporter::new(io::stdout().lock());
    match execute(&invocation, &config, &mut reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(1)
        }
    }
}

fn execute<W: Write>(
    invocation: &Invocation,
    config: &Config,
    reporter: &mut Reporter<W>,
) -> Result<(), SchedError> {
    reporter.banner()?;
    let jobs = load_job_list(&invocation.input)?;
    reporter.policy_header(invocation.policy)?;

    let sim = Sim::new(invocation.policy, invocation.quantum);
    let report = if config.dry_run {
        sim.run(jobs, SimExecutor::new(), reporter)?
    } else {
        sim.run(jobs, ForkExecutor::new(config.tick), reporter)?
    };
    reporter.summary(&report)?;
    Ok(())
}
