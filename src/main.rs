use std::io::{self, BufRead, IsTerminal};

use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    config::Config,
    optim::SgdConfig,
};
use wine_quality::{
    logger::install_logger,
    model::WineModelConfig,
    training::{self, WineTrainingConfig},
};

const DEFAULT_DATA_PATH: &str = "winequality.csv";

type MyBackend = Autodiff<NdArray<f32>>;

fn main() {
    install_logger();

    let code = match launch() {
        Ok(()) => 0,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            1
        }
    };

    wait_for_enter();
    std::process::exit(code);
}

/// Usage: `wine-quality [DATA_CSV] [CONFIG_JSON]`
fn launch() -> wine_quality::Result<()> {
    let mut args = std::env::args().skip(1);
    let data_path = args
        .next()
        .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string());

    let config = match args.next() {
        Some(path) => {
            log::info!("Loading training config from {path}");
            WineTrainingConfig::load(&path)?
        }
        None => WineTrainingConfig::new(WineModelConfig::new(), SgdConfig::new()),
    };

    let report = training::run::<MyBackend>(&data_path, &config, NdArrayDevice::Cpu)?;
    println!("Accuracy: {:.2}%", report.evaluation.accuracy());

    Ok(())
}

fn wait_for_enter() {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return;
    }

    println!("Press Enter to exit");
    let mut line = String::new();
    stdin.lock().read_line(&mut line).ok();
}
