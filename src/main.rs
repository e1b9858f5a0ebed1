use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pase_lista::attendance::{write_csv, AttendanceRecord, AttendanceStore};
use pase_lista::audio::{AudioBackendConfig, AudioSource, MicBackend};
use pase_lista::config::Config;
use pase_lista::gemini::GeminiClient;
use pase_lista::http::{create_router, AppState};
use pase_lista::session::{AttendanceSession, LiveAttendanceSession, SessionConfig};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "pase-lista", about = "Asistente de pase de lista por voz")]
struct Cli {
    /// Settings file (without extension), loaded via the config crate
    #[arg(long, default_value = "pase-lista")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record, transcribe, and extract attendance in one staged run
    Record {
        /// Recording duration in seconds
        #[arg(long, default_value_t = 30)]
        duration_secs: u64,

        /// Reference date for the records (default: today)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,

        /// Capture from a WAV file instead of the microphone
        #[arg(long)]
        input: Option<String>,

        /// Write the CSV export after extraction
        #[arg(long)]
        export: bool,
    },

    /// Run a live duplex session (streaming audio, incremental transcript)
    Live {
        /// Maximum session duration in seconds (Ctrl-C stops earlier)
        #[arg(long, default_value_t = 120)]
        duration_secs: u64,

        /// Reference date for the records (default: today)
        #[arg(long)]
        date: Option<chrono::NaiveDate>,
    },

    /// Export the persisted attendance list as CSV
    Export,

    /// Serve the HTTP control API
    Serve,

    /// List available microphone devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);

    info!("{} v{}", config.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Record {
            duration_secs,
            date,
            input,
            export,
        } => record(&config, duration_secs, date, input, export).await,
        Command::Live {
            duration_secs,
            date,
        } => live(&config, duration_secs, date).await,
        Command::Export => export_csv(&config),
        Command::Serve => serve(config).await,
        Command::Devices => devices(),
    }
}

async fn record(
    config: &Config,
    duration_secs: u64,
    date: Option<chrono::NaiveDate>,
    input: Option<String>,
    export: bool,
) -> Result<()> {
    let client = GeminiClient::from_config(&config.gemini)?;
    let store = AttendanceStore::new(&config.storage.snapshot_path);

    let session_config = SessionConfig {
        source: input.map(AudioSource::File).unwrap_or(AudioSource::Microphone),
        audio: AudioBackendConfig {
            target_sample_rate: config.audio.capture_sample_rate,
            target_channels: config.audio.channels,
            buffer_duration_ms: config.audio.buffer_duration_ms,
        },
        reference_date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        ..SessionConfig::default()
    };
    let reference_date = session_config.reference_date;

    let session = AttendanceSession::new(session_config, client, store);

    // A previous run may have left a usable snapshot
    if session.load_saved().await? {
        println!("Lista guardada encontrada:");
        print_records(&session.records().await);
        session.reset().await?;
    }

    session.start_recording().await?;
    println!("Grabando durante {duration_secs}s...");
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;

    session.stop_recording().await?;

    let transcript = session.transcribe().await?;
    println!("Transcripción:\n{transcript}\n");

    let records = session.extract().await?;
    print_records(&records);

    if export {
        let path = write_csv(&config.export.output_dir, reference_date, &records)?;
        println!("CSV: {}", path.display());
    }

    Ok(())
}

async fn live(
    config: &Config,
    duration_secs: u64,
    date: Option<chrono::NaiveDate>,
) -> Result<()> {
    let client = GeminiClient::from_config(&config.gemini)?;
    let store = AttendanceStore::new(&config.storage.snapshot_path);

    let session_config = SessionConfig {
        audio: AudioBackendConfig {
            target_sample_rate: config.audio.capture_sample_rate,
            target_channels: config.audio.channels,
            buffer_duration_ms: config.audio.buffer_duration_ms,
        },
        reference_date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        ..SessionConfig::default()
    };

    let session = LiveAttendanceSession::new(
        session_config,
        config.gemini.clone(),
        config.audio.playback_sample_rate,
        client,
        store,
    );

    session.start().await?;
    println!("Sesión en vivo iniciada (Ctrl-C para terminar)...");

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(duration_secs)) => {
            info!("Live session reached its duration limit");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, stopping live session");
        }
    }

    let records = session.stop().await?;
    println!("\nTranscripción:\n{}\n", session.transcript().await);
    print_records(&records);

    Ok(())
}

fn export_csv(config: &Config) -> Result<()> {
    let store = AttendanceStore::new(&config.storage.snapshot_path);
    let records = store.load();

    if records.is_empty() {
        println!("No hay lista guardada para exportar.");
        return Ok(());
    }

    let path = write_csv(
        &config.export.output_dir,
        chrono::Local::now().date_naive(),
        &records,
    )?;
    println!("CSV: {}", path.display());

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let bind = format!("{}:{}", config.service.http.bind, config.service.http.port);

    let state = AppState::new(config);
    let router = create_router(state);

    info!("HTTP API listening on {bind}");

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}

fn devices() -> Result<()> {
    for name in MicBackend::list_devices()? {
        println!("{name}");
    }
    Ok(())
}

fn print_records(records: &[AttendanceRecord]) {
    if records.is_empty() {
        println!("Sin registros de asistencia.");
        return;
    }

    println!("{:<30} {:<10} {:<12}", "Nombre", "Estado", "Fecha");
    for record in records {
        println!(
            "{:<30} {:<10} {:<12}",
            record.name, record.status, record.date
        );
    }
}
