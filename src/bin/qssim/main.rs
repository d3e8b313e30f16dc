use ansi_term::Color;
use qssim::error::Result;
use qssim::log::{init, LoglevelFilter, StdioLog};
use qssim::math::INFINITY;
use qssim::mdl;
use qssim::model::Model;
use qssim::options::{Method, Options, OutputFlags};
use qssim::simulate::Simulation;
use structopt::StructOpt;

/// Quantized state system (QSS) ODE solver.
#[derive(Debug, StructOpt)]
#[structopt(name = "qssim")]
struct Opt {
    /// QSS method [QSS1, QSS2, QSS3, LIQSS1, LIQSS2].
    #[structopt(long = "qss", default_value = "QSS2")]
    qss: Method,

    /// Relative tolerance.
    #[structopt(long = "rtol", default_value = "1e-4")]
    rtol: f64,

    /// Absolute tolerance.
    #[structopt(long = "atol", default_value = "1e-6")]
    atol: f64,

    /// Simulation end time (each model supplies a default when omitted).
    #[structopt(long = "tend")]
    tend: Option<f64>,

    /// Sampled output interval.
    #[structopt(long = "dtout", default_value = "1e-2")]
    dtout: f64,

    /// Minimum time step.
    #[structopt(long = "dtmin", default_value = "0")]
    dtmin: f64,

    /// Maximum time step (unbounded when omitted).
    #[structopt(long = "dtmax")]
    dtmax: Option<f64>,

    /// Deactivation time step (disabled when omitted).
    #[structopt(long = "dtinf")]
    dtinf: Option<f64>,

    /// Numeric differentiation probe offset.
    #[structopt(long = "dtnum", default_value = "1e-6")]
    dtnum: f64,

    /// Enable inflection-point requantization clamping.
    #[structopt(long = "inflection")]
    inflection: bool,

    /// Output selector flags, a subset of "xqrstoad": continuous,
    /// quantized, requantizations, samples, time events, observers, all
    /// variables, diagnostics.
    #[structopt(long = "out", default_value = "xqrst")]
    out: OutputFlags,

    /// Log level [Off, Fatal, Error, Warn, Note, Info, Debug, Trace].
    #[structopt(short = "l", long = "loglevel", default_value = "Note")]
    loglevel: LoglevelFilter,

    /// List the bundled example models and exit.
    #[structopt(long = "list")]
    list: bool,

    /// Model name.
    #[structopt(required_unless = "list")]
    model: Option<String>,
}

fn simulate(opt: Opt) -> Result<()> {
    let mut opts = Options {
        method: opt.qss,
        rtol: opt.rtol,
        atol: opt.atol,
        t_end: opt.tend.unwrap_or(1.0),
        t_end_set: opt.tend.is_some(),
        dt_out: opt.dtout,
        dt_min: opt.dtmin,
        dt_max: opt.dtmax.unwrap_or(INFINITY),
        dt_inf: opt.dtinf.unwrap_or(INFINITY),
        dt_num: opt.dtnum,
        inflection: opt.inflection,
        output: opt.out,
    };
    let name = opt.model.expect("model name enforced by the parser");
    let mut model = Model::new(&opts);
    mdl::build(&name, &mut opts, &mut model)?;
    let mut sim = Simulation::new(opts, model)?;
    sim.run()?;
    Ok(())
}

fn main() {
    let opt = Opt::from_args();
    init(vec![StdioLog::boxed(opt.loglevel)]).expect("failed to initialize logging");
    if opt.list {
        for name in mdl::names() {
            println!("{}", name);
        }
        return;
    }
    if let Err(e) = simulate(opt) {
        eprintln!("{} {}", Color::Red.bold().paint("Error:"), e);
        std::process::exit(1);
    }
}
