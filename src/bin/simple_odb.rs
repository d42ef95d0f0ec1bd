//! `simple-odb`: a small CLI for exercising the loose object store directly,
//! grounded on `original_source/t/helper/test-simple-odb.c`'s `init` /
//! `write` / `add-alternate` commands, in the `clap::Parser` style used by
//! `tvix-store`'s binary.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use blobcas::object::ObjectKind;
use blobcas::store::LooseObjectStore;
use blobcas::HashAlgo;

#[derive(Parser)]
#[command(author, version, about = "loose object store test helper", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Hash algorithm the store operates under.
    #[arg(long, global = true, default_value = "sha256")]
    hash: HashAlgoArg,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum HashAlgoArg {
    Sha1,
    Sha256,
}

impl From<HashAlgoArg> for HashAlgo {
    fn from(value: HashAlgoArg) -> Self {
        match value {
            HashAlgoArg::Sha1 => HashAlgo::Sha1,
            HashAlgoArg::Sha256 => HashAlgo::Sha256,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Creates the object directory layout at `path`.
    Init { path: PathBuf },
    /// Writes one object of `kind`, read from `file` (or stdin if `-`),
    /// and prints its oid.
    Write {
        path: PathBuf,
        kind: String,
        file: String,
    },
    /// Registers `alternate` as an alternate object store for the store at
    /// `path`, by appending its (canonicalized) objects directory to
    /// `path/objects/info/alternates`.
    AddAlternate { path: PathBuf, alternate: PathBuf },
}

fn main() -> ExitCode {
    blobcas::logging::init();
    let cli = Cli::parse();
    let algo: HashAlgo = cli.hash.into();

    let result = match cli.command {
        Command::Init { path } => cmd_init(&path, algo),
        Command::Write { path, kind, file } => cmd_write(&path, algo, &kind, &file),
        Command::AddAlternate { path, alternate } => cmd_add_alternate(&path, &alternate, algo),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("simple-odb: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_init(path: &std::path::Path, algo: HashAlgo) -> blobcas::Result<()> {
    LooseObjectStore::prepare(path, algo)?;
    Ok(())
}

fn read_input(file: &str) -> io::Result<Vec<u8>> {
    if file == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read(file)
    }
}

fn cmd_write(path: &std::path::Path, algo: HashAlgo, kind: &str, file: &str) -> blobcas::Result<()> {
    let data = read_input(file)?;
    let store = LooseObjectStore::prepare(path, algo)?;
    let oid = store.store(&ObjectKind::parse(kind), &data)?;
    println!("{oid}");
    Ok(())
}

fn cmd_add_alternate(
    path: &std::path::Path,
    alternate: &std::path::Path,
    algo: HashAlgo,
) -> blobcas::Result<()> {
    let primary = LooseObjectStore::prepare(path, algo)?;
    let alternate_store = LooseObjectStore::prepare(alternate, algo)?;

    let alternates_path = primary.root().join("objects").join("info").join("alternates");
    let mut contents = std::fs::read_to_string(&alternates_path).unwrap_or_default();
    let alternate_objects_dir = alternate_store.root().join("objects");
    let line = alternate_objects_dir.display().to_string();

    if !contents.lines().any(|existing| existing == line) {
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str(&line);
        contents.push('\n');
        std::fs::write(&alternates_path, contents)?;
    }

    Ok(())
}
