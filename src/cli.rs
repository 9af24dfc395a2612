use clap::{Args, Parser, Subcommand};
use hashscan_config::Config;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hashscan", version, about = "Catalog files and archive contents by content hash")]
pub struct Cli {
    /// Config file (toml, yaml or json), layered over the defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Catalog database, overriding the configured one.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Walk directories and catalog every file found.
    Scan(ScanArgs),
    /// Report files with identical (or visually similar) content.
    Duplicates(DuplicatesArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directories (or single files) to scan.
    #[arg(required = true)]
    pub roots: Vec<PathBuf>,
    /// Number of parallel workers.
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,
    /// Don't compute perceptual hashes for plain files and container entries.
    #[arg(long)]
    pub no_phash: bool,
    /// Trust cataloged containers instead of re-hashing them.
    #[arg(long)]
    pub no_verify: bool,
    /// Scan and report without writing to the catalog.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct DuplicatesArgs {
    /// Also group images whose perceptual hashes differ by at most this many bits.
    #[arg(long, value_name = "DISTANCE")]
    pub similar: Option<u32>,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply(&self, config: &mut Config) {
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Command::Scan(args) = &self.command {
            if let Some(workers) = args.workers {
                config.workers = workers;
            }
            if args.no_phash {
                config.perceptual_hash = false;
            }
            if args.no_verify {
                config.verify_archive_integrity = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_scan_flags_override_config() {
        let cli = Cli::try_parse_from(["hashscan", "--database", "/tmp/c.sqlite", "scan", "/a", "/b", "-j", "3", "--no-phash"])
            .unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.database, PathBuf::from("/tmp/c.sqlite"));
        assert_eq!(config.workers, 3);
        assert!(!config.perceptual_hash);
        assert!(config.verify_archive_integrity);
        let Command::Scan(args) = cli.command else { panic!("expected scan") };
        assert_eq!(args.roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert!(!args.dry_run);
    }

    #[rstest]
    #[case(&["hashscan", "scan"])]
    #[case(&["hashscan", "duplicates", "--similar", "many"])]
    #[case(&["hashscan"])]
    fn test_rejected_arguments(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_duplicates_leaves_scan_settings_alone() {
        let cli = Cli::try_parse_from(["hashscan", "duplicates", "--similar", "6"]).unwrap();
        let mut config = Config::default();
        let before = config.clone();
        cli.apply(&mut config);
        assert_eq!(config, before);
        let Command::Duplicates(args) = cli.command else { panic!("expected duplicates") };
        assert_eq!(args.similar, Some(6));
    }
}
