use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use indicatif::ProgressBar;

/// Hide an encrypted payload in the free clusters of a FAT32 image.
///
/// The payload is recoverable only with the image, the passphrase, and
/// the placement offset used when it was stored. Nothing on the volume
/// points at it; any write by the host filesystem can destroy it.
#[derive(Debug, Parser)]
#[command(name = "fatstash", version)]
#[command(group(
    clap::ArgGroup::new("verb")
        .required(true)
        .args(["info", "check", "bleach", "get", "put"])
))]
struct Args {
    /// FAT32 block image to operate on
    #[arg(long, value_name = "IMAGE")]
    block: PathBuf,

    /// Passphrase protecting the payload; prompted for when omitted
    #[arg(long, value_name = "STR")]
    passphrase: Option<String>,

    /// Placement offset into the free-cluster list: sign picks the
    /// direction, magnitude skips leading entries
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    offset: i64,

    /// Log operation detail, and show progress while bleaching
    #[arg(short, long)]
    verbose: bool,

    /// Print volume geometry and free-space summary
    #[arg(long)]
    info: bool,

    /// Verify that the stored payload is recoverable
    #[arg(long)]
    check: bool,

    /// Overwrite every free cluster with random bytes
    #[arg(long)]
    bleach: bool,

    /// Recover the payload into PATH
    #[arg(long, value_name = "PATH")]
    get: Option<PathBuf>,

    /// Embed the file at PATH
    #[arg(long, value_name = "PATH")]
    put: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.info {
        let info = fatstash::ops::info(&args.block)?;
        println!("image:             {}", args.block.display());
        println!("image length:      {} bytes", info.image_len);
        println!("bytes per cluster: {}", info.bytes_per_cluster);
        println!("FAT entries:       {}", info.fat_entries);
        println!(
            "last FAT entry:    {}",
            info.last_fat_entry
                .map_or_else(|| "-".to_string(), |e| format!("{e:#010x}"))
        );
        println!("data clusters:     {}", info.data_clusters);
        println!("free clusters:     {}", info.free_clusters);
        return Ok(());
    }

    if args.bleach {
        let bleached = if args.verbose {
            let bar = ProgressBar::new(0);
            let bleached = fatstash::ops::bleach(&args.block, |done, total| {
                bar.set_length(total as u64);
                bar.set_position(done as u64);
            })?;
            bar.finish_and_clear();
            bleached
        } else {
            fatstash::ops::bleach(&args.block, |_, _| {})?
        };
        println!("bleached {bleached} free clusters");
        return Ok(());
    }

    // check, get and put all need a passphrase
    let passphrase = read_passphrase(args.passphrase)?;

    if args.check {
        if !fatstash::ops::check(&args.block, &passphrase, args.offset)? {
            bail!("stored payload failed verification");
        }
        println!("ok");
    } else if let Some(dst) = args.get {
        fatstash::ops::get(&args.block, &dst, &passphrase, args.offset)?;
        println!("recovered payload into {}", dst.display());
    } else if let Some(src) = args.put {
        fatstash::ops::put(&args.block, &src, &passphrase, args.offset)?;
        println!("embedded {}", src.display());
    }
    Ok(())
}

/// An omitted or empty `--passphrase` falls back to an interactive
/// prompt; check, get and put all refuse to run without one.
fn read_passphrase(arg: Option<String>) -> anyhow::Result<String> {
    match arg {
        Some(passphrase) if !passphrase.is_empty() => Ok(passphrase),
        _ => {
            let passphrase =
                rpassword::prompt_password("Passphrase: ").context("failed to read passphrase")?;
            if passphrase.is_empty() {
                bail!("a passphrase is required for --check, --get and --put");
            }
            Ok(passphrase)
        }
    }
}
