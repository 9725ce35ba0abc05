//! Command handlers

use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use weighbridge_app::{SaveOutcome, WeighStation};
use weighbridge_domain::repository::TransactionStore;
use weighbridge_infra::{ConfigStore, FieldCipher, FileTransactionStore};
use weighbridge_serial::link::SerialPortOpener;
use weighbridge_serial::reader::WeighReader;
use weighbridge_types::{OutputFormat, RecordStatus, SerialConfig};

use crate::cli::{Cli, Commands, ConfigAction};
use crate::output;

type CliResult = Result<(), Box<dyn Error>>;

pub fn execute(cli: Cli) -> CliResult {
    match cli.command {
        Commands::Listen => listen(),
        Commands::WeighIn {
            lorry,
            customer,
            product,
            driver,
            wait,
        } => weigh_in(cli.plaintext, &lorry, &customer, &product, &driver, wait),
        Commands::WeighOut { lorry, wait } => weigh_out(cli.plaintext, &lorry, wait),
        Commands::Pending => list(cli.plaintext, cli.format, RecordStatus::Pending),
        Commands::Completed => list(cli.plaintext, cli.format, RecordStatus::Completed),
        Commands::Show { id } => show(cli.plaintext, cli.format, id),
        Commands::Config { action } => config(action),
    }
}

fn open_store(plaintext: bool) -> Result<Arc<dyn TransactionStore>, Box<dyn Error>> {
    let cipher = if plaintext {
        FieldCipher::plaintext()
    } else {
        FieldCipher::from_env()?
    };
    let dir = dirs::data_dir()
        .ok_or("no data directory available")?
        .join("weighbridge");
    Ok(Arc::new(FileTransactionStore::open(dir, cipher)?))
}

fn serial_config() -> Result<SerialConfig, Box<dyn Error>> {
    let store = ConfigStore::open_default()?;
    Ok(store.load_serial_config()?)
}

/// Stream every decoded sample to stdout until interrupted.
fn listen() -> CliResult {
    let config = serial_config()?;
    info!(port = %config.port_name, "listening for weight frames");

    let (live_tx, live_rx) = flume::unbounded();
    let reader =
        WeighReader::new(Box::new(SerialPortOpener::new(config))).with_live_channel(live_tx);

    thread::Builder::new()
        .name("weigh-reader".to_string())
        .spawn(move || {
            let mut reader = reader;
            reader.start();
        })?;

    for sample in live_rx.iter() {
        let marker = if sample.is_stable() { " stable" } else { "" };
        println!(
            "{:>7} kg  [{}]{}",
            sample.kg,
            sample.status.code(),
            marker
        );
    }
    Ok(())
}

fn weigh_in(
    plaintext: bool,
    lorry: &str,
    customer: &str,
    product: &str,
    driver: &str,
    wait: u64,
) -> CliResult {
    let mut station = WeighStation::start(serial_config()?, open_store(plaintext)?);
    wait_for_stable(&mut station, wait)?;

    let outcome = station.save(lorry, customer, product, driver)?;
    station.stop();

    match outcome {
        SaveOutcome::FirstWeight(record) => output::print_ticket("WEIGH-IN", &record),
        SaveOutcome::Completed(record) => output::print_ticket("WEIGH-OUT", &record),
    }
    Ok(())
}

fn weigh_out(plaintext: bool, lorry: &str, wait: u64) -> CliResult {
    let mut station = WeighStation::start(serial_config()?, open_store(plaintext)?);
    let pending = station.select_vehicle(lorry)?;
    info!(
        id = pending.id,
        first_weight = pending.first_weight,
        "pending record selected"
    );

    wait_for_stable(&mut station, wait)?;
    let outcome = station.save(lorry, "", "", "")?;
    station.stop();

    match outcome {
        SaveOutcome::Completed(record) => output::print_ticket("WEIGH-OUT", &record),
        SaveOutcome::FirstWeight(record) => output::print_ticket("WEIGH-IN", &record),
    }
    Ok(())
}

fn wait_for_stable(station: &mut WeighStation, wait: u64) -> CliResult {
    let deadline = Instant::now() + Duration::from_secs(wait);
    while station.current_weight().is_none() {
        if Instant::now() >= deadline {
            return Err(format!("no stable weight received within {wait}s").into());
        }
        thread::sleep(Duration::from_millis(100));
    }
    Ok(())
}

fn list(plaintext: bool, format: OutputFormat, status: RecordStatus) -> CliResult {
    let store = open_store(plaintext)?;
    let records = store.list_by_status(status)?;
    output::print_records(format, &records)?;
    Ok(())
}

fn show(plaintext: bool, format: OutputFormat, id: i64) -> CliResult {
    let store = open_store(plaintext)?;
    match store.find_by_id(id)? {
        Some(record) => output::print_records(format, std::slice::from_ref(&record))?,
        None => return Err(format!("no record with id {id}").into()),
    }
    Ok(())
}

fn config(action: ConfigAction) -> CliResult {
    let store = ConfigStore::open_default()?;
    match action {
        ConfigAction::Show => {
            let cfg = store.load_serial_config()?;
            output::print_serial_config(&cfg);
        }
        ConfigAction::Set {
            port,
            baud,
            data_bits,
            stop_bits,
            parity,
        } => {
            let mut cfg = store.load_serial_config()?;
            if let Some(port) = port {
                cfg.port_name = port;
            }
            if let Some(baud) = baud {
                cfg.baud_rate = baud;
            }
            if let Some(bits) = data_bits {
                cfg.data_bits = bits;
            }
            if let Some(bits) = stop_bits {
                cfg.stop_bits = bits;
            }
            if let Some(parity) = parity {
                cfg.parity = parity.parse()?;
            }
            store.save_serial_config(&cfg)?;
            output::print_serial_config(&cfg);
        }
    }
    Ok(())
}
