//! mkfs.zealfs - Create ZealFS disk images
//!
//! Formats a fresh image (v1 up to 64 KiB, v2 up to 4 GiB, optionally
//! wrapped in an MBR partition), optionally copies a host directory tree
//! into it, and can list the result.
//!
//! Usage:
//!   mkfs.zealfs -o zfs.img -s 32K --fs-version 1      # v1 EEPROM image
//!   mkfs.zealfs -o disk.img -s 1M                     # v2 image
//!   mkfs.zealfs -o disk.img -s 1M --mbr -d ./rootfs   # partitioned + populated

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;

use zealfs_common::NAME_MAX_LEN;
use zealfs_fs::{EntryKind, Mount, MountOptions, Version, ZealFs};

#[derive(Parser)]
#[command(name = "mkfs.zealfs")]
#[command(about = "Create ZealFS disk images")]
struct Args {
    /// Output disk image file
    #[arg(short, long)]
    output: PathBuf,

    /// Size of a newly created image (e.g. 32K, 1M, 4G)
    #[arg(short, long, default_value = "32K")]
    size: String,

    /// On-disk format version (1 or 2)
    #[arg(long, default_value_t = 2)]
    fs_version: u8,

    /// Wrap the new image in an MBR with a single ZealFS partition (v2 only)
    #[arg(long)]
    mbr: bool,

    /// Directory to copy files from
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// List the image contents when done
    #[arg(short, long)]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim().to_uppercase();
    let (num_str, mult) = if s.ends_with('G') || s.ends_with("GB") {
        (s.trim_end_matches("GB").trim_end_matches('G'), 1024 * 1024 * 1024)
    } else if s.ends_with('M') || s.ends_with("MB") {
        (s.trim_end_matches("MB").trim_end_matches('M'), 1024 * 1024)
    } else if s.ends_with('K') || s.ends_with("KB") {
        (s.trim_end_matches("KB").trim_end_matches('K'), 1024)
    } else {
        (s.as_str(), 1)
    };

    num_str.parse::<u64>().ok().map(|n| n * mult)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let version = match args.fs_version {
        1 => Version::V1,
        2 => Version::V2,
        v => bail!("unsupported filesystem version {v}"),
    };
    if args.mbr && version != Version::V2 {
        bail!("--mbr requires a v2 image");
    }

    let size = parse_size(&args.size)
        .with_context(|| format!("invalid size {:?}", args.size))?;
    if size == 0 || size % 1024 != 0 {
        bail!("image size must be a whole number of KiB");
    }

    let mut opts = MountOptions::new(&args.output, version);
    opts.size_kib = (size / 1024) as u32;
    opts.mbr = args.mbr;

    let mut mount = Mount::open(&opts)
        .with_context(|| format!("could not open image {}", args.output.display()))?;

    if let Some(dir) = &args.dir {
        let mut counts = Counts::default();
        populate(mount.fs_mut(), dir, "", args.verbose, &mut counts)
            .with_context(|| format!("could not copy {}", dir.display()))?;
        println!("\nPopulation complete:");
        println!("  Files:   {}", counts.files);
        println!("  Dirs:    {}", counts.dirs);
        println!("  Skipped: {}", counts.skipped);
    }

    let stats = mount.fs().stats();
    println!(
        "{}: ZealFS v{}, {} pages of {} bytes, {} free",
        args.output.display(),
        args.fs_version,
        stats.total_pages,
        stats.page_size,
        stats.free_pages
    );

    if args.list {
        list_tree(mount.fs(), "/", 0)?;
    }

    mount.close().context("could not flush the image")?;
    Ok(())
}

#[derive(Default)]
struct Counts {
    files: usize,
    dirs: usize,
    skipped: usize,
}

/// Recursively copy a host directory into the image.
fn populate(
    fs: &mut ZealFs,
    host_dir: &Path,
    image_dir: &str,
    verbose: bool,
    counts: &mut Counts,
) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(host_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let metadata = entry.metadata()?;

        if name.len() > NAME_MAX_LEN {
            if verbose {
                println!("  SKIP: {name} (name longer than {NAME_MAX_LEN} bytes)");
            }
            counts.skipped += 1;
            continue;
        }

        let image_path = format!("{image_dir}/{name}");

        if metadata.is_dir() {
            if let Err(e) = fs.mkdir(&image_path) {
                eprintln!("Failed to create directory {image_path}: {e}");
                counts.skipped += 1;
                continue;
            }
            counts.dirs += 1;
            if verbose {
                println!("  DIR:  {image_path}");
            }
            populate(fs, &entry.path(), &image_path, verbose, counts)?;
        } else if metadata.is_file() {
            let data = std::fs::read(entry.path())?;
            let copied = fs
                .create(&image_path)
                .and_then(|file| fs.write(file, 0, &data));
            match copied {
                Ok(n) => {
                    counts.files += 1;
                    if verbose {
                        println!("  FILE: {image_path} ({n} bytes)");
                    }
                }
                Err(e) => {
                    eprintln!("Failed to copy {image_path}: {e}");
                    // A half-written file is useless, reclaim its pages
                    let _ = fs.unlink(&image_path);
                    counts.skipped += 1;
                }
            }
        }
    }
    Ok(())
}

/// Print the image tree, one entry per line.
fn list_tree(fs: &ZealFs, path: &str, depth: usize) -> anyhow::Result<()> {
    let handle = fs.opendir(path)?;
    for entry in fs.readdir(handle)? {
        if entry.name == "." || entry.name == ".." {
            continue;
        }
        let indent = "  ".repeat(depth);
        match entry.kind {
            EntryKind::Directory => {
                println!("{indent}{}/", entry.name);
                let child = if path == "/" {
                    format!("/{}", entry.name)
                } else {
                    format!("{path}/{}", entry.name)
                };
                list_tree(fs, &child, depth + 1)?;
            }
            EntryKind::File => {
                println!("{indent}{} ({} bytes)", entry.name, entry.size);
            }
        }
    }
    Ok(())
}
