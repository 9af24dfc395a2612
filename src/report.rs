//! The `duplicates` command.

use crate::cli::DuplicatesArgs;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use hashscan_config::Config;
use hashscan_hasher::hamming_distance;
use hashscan_store::{CatalogEntry, Repository};
use std::fmt::Write;

fn location(entry: &CatalogEntry) -> String {
    if entry.internal_name.is_empty() {
        entry.base_path.display().to_string()
    } else {
        format!("{} :: {}", entry.base_path.display(), entry.internal_name)
    }
}

/// Group images whose pHashes are within `max_distance` bits of each other,
/// transitively. Only groups of two or more are returned.
pub fn similar_groups(entries: &[CatalogEntry], max_distance: u32) -> Vec<Vec<&CatalogEntry>> {
    let mut parent: Vec<usize> = (0..entries.len()).collect();
    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            let (Some(a), Some(b)) = (&entries[i].phash, &entries[j].phash) else {
                continue;
            };
            if hamming_distance(a, b).is_some_and(|d| d <= max_distance) {
                let (ri, rj) = (root(&mut parent, i), root(&mut parent, j));
                parent[rj] = ri;
            }
        }
    }
    let mut groups: Vec<(usize, Vec<&CatalogEntry>)> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let r = root(&mut parent, i);
        match groups.iter_mut().find(|(g, _)| *g == r) {
            Some((_, members)) => members.push(entry),
            None => groups.push((r, vec![entry])),
        }
    }
    groups.into_iter().map(|(_, members)| members).filter(|m| m.len() > 1).collect()
}

/// Render the duplicate report for the catalog.
pub async fn render(repo: &Repository, args: &DuplicatesArgs) -> Result<String> {
    let mut out = String::new();
    let groups = repo.duplicate_groups().await.or_raise(|| ErrorKind::Report)?;
    for group in &groups {
        let _ = writeln!(out, "{} ({} copies)", group.content_hash, group.items.len());
        for entry in &group.items {
            let _ = writeln!(out, "    {}", location(entry));
        }
    }
    if let Some(distance) = args.similar {
        let images = repo.image_hashes().await.or_raise(|| ErrorKind::Report)?;
        for (n, group) in similar_groups(&images, distance).iter().enumerate() {
            let _ = writeln!(out, "similar images #{} (within {distance} bits)", n + 1);
            for entry in group {
                let _ = writeln!(out, "    {}", location(entry));
            }
        }
    }
    if out.is_empty() {
        out.push_str("no duplicates found\n");
    }
    Ok(out)
}

pub async fn run(config: &Config, args: &DuplicatesArgs) -> Result<String> {
    let db = crate::open_catalog(config).await?;
    let report = render(&Repository::from(&db), args).await;
    db.close().await;
    report
}
