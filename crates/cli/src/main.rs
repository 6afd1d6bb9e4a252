use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use mappings::dialect;
use merge::{Archive, ArchiveMergePolicy, ArchiveMerger, FlatCodec, ResourcePolicy};
use stabilize::{ArchiveIndex, Stabilizer};

#[derive(Parser)]
#[command(name = "seamster")]
#[command(about = "Merge split binary releases and rework their mappings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the client and server archives into one artifact tree.
    Merge {
        /// Client archive.
        client: PathBuf,
        /// Server archive.
        server: PathBuf,
        /// Merged output archive.
        output: PathBuf,
        /// Namespace prefix of the program's own types; foreign types are
        /// dropped. Empty keeps everything.
        #[arg(long, default_value = "")]
        namespace: String,
        /// Fail on divergent non-type entries instead of keeping the
        /// client copy.
        #[arg(long)]
        strict_resources: bool,
        /// Write merge statistics as JSON to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Invert a mapping (swap source and target namespaces).
    Invert {
        /// Input dialect tag (`directory` or `tabular:<from>:<to>`).
        src_dialect: String,
        src: PathBuf,
        /// Output dialect tag.
        dst_dialect: String,
        dst: PathBuf,
    },
    /// Compose two mappings a->b and b->c into a->c.
    Compose {
        left_dialect: String,
        left: PathBuf,
        right_dialect: String,
        right: PathBuf,
        dst_dialect: String,
        dst: PathBuf,
        /// Which unmatched entries to keep in the composition.
        #[arg(value_enum)]
        keep: Keep,
    },
    /// Convert a mapping from one dialect to another.
    Convert {
        /// Input dialect tag.
        src_dialect: String,
        src: PathBuf,
        /// Output dialect tag.
        dst_dialect: String,
        dst: PathBuf,
        /// Merged archive; when given, override methods are dropped so
        /// only the root declaration of each chain keeps its record.
        #[arg(long)]
        archive: Option<PathBuf>,
    },
    /// Allocate stable names for a release, carrying over the previous
    /// release's identifiers.
    Stabilize {
        /// Intermediary output file.
        output: PathBuf,
        /// Merged archive of the new release.
        archive: PathBuf,
        /// Deobfuscation mapping of the new release.
        new_mappings: PathBuf,
        /// Dialect of the new mapping.
        #[arg(long, default_value = "directory")]
        new_dialect: String,
        /// Deobfuscation mapping of the previous release, for matching
        /// renamed symbols across releases.
        #[arg(long)]
        old_mappings: Option<PathBuf>,
        /// Dialect of the previous mapping.
        #[arg(long, default_value = "directory")]
        old_dialect: String,
        /// Intermediary file of the previous release.
        #[arg(long)]
        old_intermediary: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Keep {
    /// Keep entries only the left mapping knows.
    Left,
    /// Keep entries only the right mapping knows.
    Right,
    /// Keep unmatched entries from both sides.
    Both,
    /// Drop everything unmatched.
    None,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Merge {
            client,
            server,
            output,
            namespace,
            strict_resources,
            report,
        } => cmd_merge(
            client,
            server,
            output,
            namespace,
            *strict_resources,
            report.as_deref(),
        )?,
        Commands::Invert {
            src_dialect,
            src,
            dst_dialect,
            dst,
        } => cmd_invert(src_dialect, src, dst_dialect, dst)?,
        Commands::Compose {
            left_dialect,
            left,
            right_dialect,
            right,
            dst_dialect,
            dst,
            keep,
        } => cmd_compose(left_dialect, left, right_dialect, right, dst_dialect, dst, *keep)?,
        Commands::Convert {
            src_dialect,
            src,
            dst_dialect,
            dst,
            archive,
        } => cmd_convert(src_dialect, src, dst_dialect, dst, archive.as_deref())?,
        Commands::Stabilize {
            output,
            archive,
            new_mappings,
            new_dialect,
            old_mappings,
            old_dialect,
            old_intermediary,
        } => cmd_stabilize(
            output,
            archive,
            new_mappings,
            new_dialect,
            old_mappings.as_deref(),
            old_dialect,
            old_intermediary.as_deref(),
        )?,
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

fn cmd_merge(
    client: &Path,
    server: &Path,
    output: &Path,
    namespace: &str,
    strict_resources: bool,
    report: Option<&Path>,
) -> anyhow::Result<()> {
    println!("Reading client archive: {}", client.display());
    let client = Archive::open(client).context("reading client archive")?;
    println!("Reading server archive: {}", server.display());
    let server = Archive::open(server).context("reading server archive")?;

    let mut policy = ArchiveMergePolicy::new(namespace);
    if strict_resources {
        policy.resources = ResourcePolicy::Error;
    }

    let codec = FlatCodec;
    let merger = ArchiveMerger::new(&codec, policy);
    let (merged, stats) = merger.merge(&client, &server)?;
    merged
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("+------------------------------------------+");
    println!("| SEAMSTER MERGE                           |");
    println!("+------------------------------------------+");
    println!("| Entries out    : {:>22} |", merged.len());
    println!("| Identical      : {:>22} |", stats.identical);
    println!("| Merged types   : {:>22} |", stats.merged_types);
    println!("| Client-only    : {:>22} |", stats.tagged_client);
    println!("| Server-only    : {:>22} |", stats.tagged_server);
    println!("| Foreign dropped: {:>22} |", stats.dropped_foreign);
    println!("+------------------------------------------+");

    if !stats.divergent_resources.is_empty() {
        println!("\nDIVERGENT RESOURCES (client copy kept):");
        for path in &stats.divergent_resources {
            println!("  {path}");
        }
    }

    if let Some(report) = report {
        let json = serde_json::to_string_pretty(&stats)?;
        fs::write(report, json).with_context(|| format!("writing {}", report.display()))?;
        println!("\nReport written to {}", report.display());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// invert
// ---------------------------------------------------------------------------

fn cmd_invert(
    src_dialect: &str,
    src: &Path,
    dst_dialect: &str,
    dst: &Path,
) -> anyhow::Result<()> {
    let tree = dialect::read_tree(src_dialect, src)
        .with_context(|| format!("reading {}", src.display()))?;
    println!("Read {} mapping nodes.", tree.len());

    let inverted = mappings::invert(&tree);

    dialect::delete_output(dst)?;
    dialect::write_tree(&inverted, dst_dialect, dst)
        .with_context(|| format!("writing {}", dst.display()))?;
    println!("Wrote {} nodes to {}", inverted.len(), dst.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// compose
// ---------------------------------------------------------------------------

fn cmd_compose(
    left_dialect: &str,
    left: &Path,
    right_dialect: &str,
    right: &Path,
    dst_dialect: &str,
    dst: &Path,
    keep: Keep,
) -> anyhow::Result<()> {
    let left_tree = dialect::read_tree(left_dialect, left)
        .with_context(|| format!("reading {}", left.display()))?;
    let right_tree = dialect::read_tree(right_dialect, right)
        .with_context(|| format!("reading {}", right.display()))?;
    println!(
        "Composing {} left nodes with {} right nodes.",
        left_tree.len(),
        right_tree.len()
    );

    let (keep_left, keep_right) = match keep {
        Keep::Left => (true, false),
        Keep::Right => (false, true),
        Keep::Both => (true, true),
        Keep::None => (false, false),
    };
    let composed = mappings::compose(&left_tree, &right_tree, keep_left, keep_right);

    dialect::delete_output(dst)?;
    dialect::write_tree(&composed, dst_dialect, dst)
        .with_context(|| format!("writing {}", dst.display()))?;
    println!("Wrote {} nodes to {}", composed.len(), dst.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// convert
// ---------------------------------------------------------------------------

fn cmd_convert(
    src_dialect: &str,
    src: &Path,
    dst_dialect: &str,
    dst: &Path,
    archive: Option<&Path>,
) -> anyhow::Result<()> {
    let mut tree = dialect::read_tree(src_dialect, src)
        .with_context(|| format!("reading {}", src.display()))?;
    println!("Read {} mapping nodes.", tree.len());

    if let Some(archive) = archive {
        let archive = Archive::open(archive).context("reading archive")?;
        let codec = FlatCodec;
        let index = ArchiveIndex::build(&archive, &codec).context("indexing archive")?;
        let before = tree.len();
        tree = stabilize::retain_method_roots(&index, &tree);
        println!("Dropped {} override methods.", before - tree.len());
    }

    dialect::delete_output(dst)?;
    dialect::write_tree(&tree, dst_dialect, dst)
        .with_context(|| format!("writing {}", dst.display()))?;
    println!("Wrote {} nodes to {}", tree.len(), dst.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// stabilize
// ---------------------------------------------------------------------------

fn cmd_stabilize(
    output: &Path,
    archive: &Path,
    new_mappings: &Path,
    new_dialect: &str,
    old_mappings: Option<&Path>,
    old_dialect: &str,
    old_intermediary: Option<&Path>,
) -> anyhow::Result<()> {
    println!("Reading archive: {}", archive.display());
    let archive = Archive::open(archive).context("reading archive")?;
    let codec = FlatCodec;
    let index = ArchiveIndex::build(&archive, &codec).context("indexing archive")?;
    println!("Indexed {} classes.", index.class_count());

    let new_tree = dialect::read_tree(new_dialect, new_mappings)
        .with_context(|| format!("reading {}", new_mappings.display()))?;

    let mut stabilizer = Stabilizer::new();

    if let Some(old_mappings) = old_mappings {
        let old_tree = dialect::read_tree(old_dialect, old_mappings)
            .with_context(|| format!("reading {}", old_mappings.display()))?;
        let matched = stabilizer.match_releases(&old_tree, &new_tree)?;
        println!("Matched {matched} symbols across releases.");
    }
    if let Some(previous) = old_intermediary {
        stabilizer
            .load_previous(previous)
            .with_context(|| format!("loading {}", previous.display()))?;
    }

    let file = fs::File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    let rows = stabilizer.run(&index, &new_tree, &mut writer)?;
    writer.flush().context("flushing intermediary file")?;

    println!("+------------------------------------------+");
    println!("| SEAMSTER STABILIZE                       |");
    println!("+------------------------------------------+");
    println!("| Symbol rows    : {:>22} |", rows);
    println!("+------------------------------------------+");
    println!("Intermediary written to {}", output.display());
    Ok(())
}
