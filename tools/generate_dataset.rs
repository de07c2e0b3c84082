//! Synthetic Transaction Dataset Generator
//!
//! Writes a CSV of legitimate and suspicious transactions for exercising the
//! rule pipeline.
//!
//! Usage: generate_dataset <output.csv> [count] [fraud_rate] [users]

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Row layout expected by the loader
#[derive(Debug, Clone, Serialize)]
struct Row {
    #[serde(rename = "TransactionID")]
    transaction_id: String,
    #[serde(rename = "UserID")]
    user_id: u32,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Merchant")]
    merchant: String,
    #[serde(rename = "IPAddress")]
    ip_address: String,
    #[serde(rename = "Device")]
    device: String,
    #[serde(rename = "Location")]
    location: String,
}

/// Last seen activity per user, so consecutive rows share IP/device unless changed
struct UserState {
    last_seen: NaiveDateTime,
    ip_address: String,
    device: String,
    location: String,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    transaction_counter: u64,
    users: HashMap<u32, UserState>,
    start: NaiveDateTime,
}

impl TransactionGenerator {
    fn new() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MIN);
        Self {
            rng: rand::thread_rng(),
            transaction_counter: 0,
            users: HashMap::new(),
            start,
        }
    }

    fn random_ip(&mut self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.rng.gen_range(1..255),
            self.rng.gen_range(0..255),
            self.rng.gen_range(0..255),
            self.rng.gen_range(1..255)
        )
    }

    fn new_user_state(&mut self) -> UserState {
        let offset = Duration::minutes(self.rng.gen_range(0..60 * 24 * 7));
        UserState {
            last_seen: self.start + offset,
            ip_address: self.random_ip(),
            device: self.random_choice(&["iPhone", "Android", "Windows", "MacBook"]).to_string(),
            location: self
                .random_choice(&["New York", "London", "Berlin", "Toronto", "Sydney"])
                .to_string(),
        }
    }

    fn user_state(&mut self, user_id: u32) -> &mut UserState {
        let fresh = self.new_user_state();
        self.users.entry(user_id).or_insert(fresh)
    }

    fn next_id(&mut self) -> String {
        self.transaction_counter += 1;
        format!("TX{:08}", self.transaction_counter)
    }

    /// Generate a random legitimate transaction
    fn generate_legitimate(&mut self, user_id: u32) -> Row {
        let transaction_id = self.next_id();
        let gap = Duration::minutes(self.rng.gen_range(60..60 * 48));
        let amount = (self.rng.gen_range(5.0..900.0_f64) * 100.0).round() / 100.0;
        let merchant = self
            .random_choice(&["grocery_store", "coffee_shop", "online_books", "fuel_station", "pharmacy"])
            .to_string();

        let state = self.user_state(user_id);
        let mut at = state.last_seen + gap;
        // keep legitimate activity in daytime
        if at.hour() < 7 {
            at += Duration::hours(8);
        }
        state.last_seen = at;

        Row {
            transaction_id,
            user_id,
            timestamp: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            amount,
            merchant,
            ip_address: state.ip_address.clone(),
            device: state.device.clone(),
            location: state.location.clone(),
        }
    }

    /// Generate a suspicious transaction
    fn generate_suspicious(&mut self, user_id: u32) -> Row {
        let transaction_id = self.next_id();
        let gap = Duration::minutes(self.rng.gen_range(1..10)); // Rapid follow-up
        let amount = if self.rng.gen_bool(0.5) {
            self.rng.gen_range(11..50) as f64 * 1000.0 // High and rounded
        } else {
            self.rng.gen_range(1..10) as f64 * 1000.0 // Rounded
        };
        let merchant = self
            .random_choice(&["gambling_site", "shady_merchant", "online_books"])
            .to_string();
        let new_ip = self.rng.gen_bool(0.7).then(|| self.random_ip());
        let new_device = self
            .rng
            .gen_bool(0.5)
            .then(|| self.random_choice(&["Unknown", "Emulator", "Linux"]).to_string());
        let night_hour = self.rng.gen_range(0..6);
        let at_night = self.rng.gen_bool(0.5);

        let state = self.user_state(user_id);
        let mut at = state.last_seen + gap;
        if at_night && at.hour() >= 6 {
            // Move to the small hours of the next day
            let next_day = at.date() + Duration::days(1);
            at = next_day
                .and_hms_opt(night_hour, at.minute(), at.second())
                .unwrap_or(at);
        }
        state.last_seen = at;
        if let Some(ip) = new_ip {
            state.ip_address = ip;
        }
        if let Some(device) = new_device {
            state.device = device;
        }

        Row {
            transaction_id,
            user_id,
            timestamp: at.format("%Y-%m-%d %H:%M:%S").to_string(),
            amount,
            merchant,
            ip_address: state.ip_address.clone(),
            device: state.device.clone(),
            location: state.location.clone(),
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

/// Positional arguments: output path, row count, suspicious share, user count
#[derive(Debug, PartialEq)]
struct GeneratorArgs {
    output: String,
    count: u64,
    fraud_rate: f64,
    users: u32,
}

impl GeneratorArgs {
    /// Unparseable values fall back to defaults
    fn parse(args: &[String]) -> Self {
        let output = args
            .get(1)
            .cloned()
            .unwrap_or_else(|| "fraud_dataset.csv".to_string());
        let count = args
            .get(2)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(500);
        let fraud_rate = args
            .get(3)
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.1)
            .clamp(0.0, 1.0);
        let users = args
            .get(4)
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(50)
            .max(1);

        Self {
            output,
            count,
            fraud_rate,
            users,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("generate_dataset=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Synthetic Dataset Generator");

    let args: Vec<String> = std::env::args().collect();
    let GeneratorArgs {
        output,
        count,
        fraud_rate,
        users,
    } = GeneratorArgs::parse(&args);

    info!(
        output = %output,
        count = count,
        fraud_rate = fraud_rate,
        users = users,
        "Configuration loaded"
    );

    let mut writer = csv::Writer::from_path(&output)
        .with_context(|| format!("Failed to create {}", output))?;
    let mut generator = TransactionGenerator::new();
    let mut rng = rand::thread_rng();

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    for i in 0..count {
        let user_id = rng.gen_range(1..=users);
        let row = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious(user_id)
        } else {
            legitimate_count += 1;
            generator.generate_legitimate(user_id)
        };

        writer.serialize(&row)?;

        if (i + 1) % 100 == 0 {
            info!(
                "Generated {}/{} transactions ({} legitimate, {} suspicious)",
                i + 1,
                count,
                legitimate_count,
                suspicious_count
            );
        }
    }
    writer.flush()?;

    info!(
        "Completed! Wrote {} transactions ({} legitimate, {} suspicious) to {}",
        count, legitimate_count, suspicious_count, output
    );

    Ok(())
}
