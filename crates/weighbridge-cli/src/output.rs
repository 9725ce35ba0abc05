//! Output formatting module

use weighbridge_domain::model::WeighRecord;
use weighbridge_types::{OutputFormat, SerialConfig};

pub fn print_records(
    format: OutputFormat,
    records: &[WeighRecord],
) -> Result<(), serde_json::Error> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No records.");
        return Ok(());
    }

    println!(
        "{:>5}  {:<12} {:<16} {:>7} {:>7} {:>7}  {:<10} {:<5}  {:<10} {:<5}  {}",
        "ID", "LORRY", "CUSTOMER", "FIRST", "SECOND", "NET", "DATE IN", "IN", "DATE OUT", "OUT", "STATUS"
    );
    for record in records {
        println!(
            "{:>5}  {:<12} {:<16} {:>7} {:>7} {:>7}  {:<10} {:<5}  {:<10} {:<5}  {}",
            record.id.unwrap_or(0),
            record.lorry_no,
            record.customer_name,
            weight(record.first_weight),
            weight(record.second_weight),
            weight(record.net_weight),
            text(&record.date_in),
            text(&record.time_in),
            text(&record.date_out),
            text(&record.time_out),
            record.status
        );
    }
    Ok(())
}

/// Plain-text weigh ticket, one per weigh-in/weigh-out.
pub fn print_ticket(kind: &str, record: &WeighRecord) {
    println!("========================================");
    println!("          WEIGHBRIDGE TICKET");
    println!("              {kind}");
    println!("========================================");
    println!("Record no:    {}", record.id.unwrap_or(0));
    println!("Lorry:        {}", record.lorry_no);
    println!("Customer:     {}", record.customer_name);
    println!("Product:      {}", record.product_name);
    println!("Driver:       {}", record.driver_name);
    println!(
        "First weight: {} kg  ({} {})",
        weight(record.first_weight),
        text(&record.date_in),
        text(&record.time_in)
    );
    if record.second_weight.is_some() {
        println!(
            "Second weight:{} kg  ({} {})",
            weight(record.second_weight),
            text(&record.date_out),
            text(&record.time_out)
        );
        println!("Net weight:   {} kg", weight(record.net_weight));
    }
    println!("Status:       {}", record.status);
    println!("========================================");
}

pub fn print_serial_config(cfg: &SerialConfig) {
    println!("Serial configuration");
    println!("====================");
    println!("Port:      {}", cfg.port_name);
    println!("Baud rate: {}", cfg.baud_rate);
    println!("Data bits: {}", cfg.data_bits);
    println!("Stop bits: {}", cfg.stop_bits);
    println!("Parity:    {}", cfg.parity);
}

fn weight(value: Option<i32>) -> String {
    value.map(|w| w.to_string()).unwrap_or_else(|| "-".to_string())
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}
