use clap::{Parser, ValueEnum};
use rv_emu::cache::{Cache, CacheConfig, CacheKind};
use rv_emu::cpu::{self, Machine};
use rv_emu::elf;
use rv_emu::mem::Memory;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CacheArg {
    /// No cache model
    None,
    /// Direct mapped
    Dm,
    /// Set associative
    Sa,
}

#[derive(Parser, Debug)]
struct Args {
    /// Path to the RISC-V ELF image holding the target function
    #[arg(long)]
    elf: String,

    /// Symbol of the function to call
    #[arg(long, default_value = "main")]
    func: String,

    /// Call this address instead of looking up --func
    #[arg(long, value_parser = parse_int)]
    entry: Option<u64>,

    /// Base address of emulated RAM
    #[arg(long, value_parser = parse_int, default_value = "0x80000000")]
    ram_base: u64,

    /// RAM size in MiB
    #[arg(long, default_value_t = 16)]
    ram_mib: usize,

    /// Print the dynamic instruction mix
    #[arg(long, default_value_t = false)]
    analyze: bool,

    /// Instruction cache model
    #[arg(long, value_enum, default_value_t = CacheArg::None)]
    cache: CacheArg,

    /// Cache size in words
    #[arg(long, default_value_t = 0)]
    cache_size: u32,

    /// Cache block size in words
    #[arg(long, default_value_t = 1)]
    block_size: u32,

    /// Ways per set (set associative only)
    #[arg(long, default_value_t = 4)]
    ways: u32,

    /// More output; -v logs cache traffic, -vv traces every instruction
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Up to four integer arguments, passed in a0..a3
    #[arg(value_parser = parse_int, allow_negative_numbers = true)]
    args: Vec<u64>,
}

/// Decimal (possibly negative) or 0x-prefixed hex.
fn parse_int(s: &str) -> Result<u64, String> {
    let s = s.replace('_', "");
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else if s.starts_with('-') {
        s.parse::<i64>().map(|v| v as u64).map_err(|e| e.to_string())
    } else {
        s.parse::<u64>().map_err(|e| e.to_string())
    }
}

fn init_logging(verbose: u8) {
    let mut builder = match verbose {
        0 => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")),
        1 => {
            let mut b = env_logger::Builder::new();
            b.filter_level(log::LevelFilter::Debug);
            b
        }
        _ => {
            let mut b = env_logger::Builder::new();
            b.filter_level(log::LevelFilter::Trace);
            b
        }
    };
    builder.init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.args.len() > 4 {
        return Err(format!("at most 4 arguments are supported, got {}", args.args.len()).into());
    }

    let kind = match args.cache {
        CacheArg::None => CacheKind::None,
        CacheArg::Dm => CacheKind::DirectMapped,
        CacheArg::Sa => CacheKind::SetAssociative,
    };
    let icache = Cache::new(CacheConfig {
        kind,
        size: args.cache_size,
        block_size: args.block_size,
        ways: args.ways,
    })?;

    let ram_len = args
        .ram_mib
        .checked_mul(1024 * 1024)
        .ok_or_else(|| format!("--ram-mib {} is too large", args.ram_mib))?;
    if cpu::overlaps_stack(args.ram_base, ram_len as u64) {
        return Err(format!(
            "RAM at 0x{:x} with {} MiB overlaps the stack at 0x{:x}",
            args.ram_base,
            args.ram_mib,
            cpu::STACK_BASE
        )
        .into());
    }

    let bytes = std::fs::read(&args.elf)
        .map_err(|e| format!("cannot read {}: {e}", args.elf))?;
    let mut mem = Memory::with_base(args.ram_base, ram_len);
    let elf_entry = elf::load_elf_into_memory(&bytes, &mut mem)?;
    log::debug!("loaded {} (ELF entry 0x{:016x})", args.elf, elf_entry);

    let entry = match args.entry {
        Some(addr) => addr,
        None => elf::find_symbol(&bytes, &args.func)?
            .ok_or_else(|| format!("symbol `{}` not found in {}", args.func, args.elf))?,
    };

    let mut a = [0u64; 4];
    a[..args.args.len()].copy_from_slice(&args.args);

    let mut machine = Machine::new(mem, entry, a).with_icache(icache);
    let r = machine.run()?;

    println!("r = {}", r as i64);
    if args.analyze {
        println!("{}", machine.analysis);
    }
    if machine.icache.is_enabled() {
        println!("{}", machine.icache.report("I"));
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
