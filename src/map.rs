/// Sector quality map visualization

use crate::image::ErrorFlags;
use crate::info::{DiskInfo, SectorInfo};

/// ANSI color codes for the sector map
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
    pub const BRIGHT_RED: &str = "\x1b[91m";
    pub const DARK_RED: &str = "\x1b[2;31m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
}

const BLOCK_MISSING: &str = "\u{2591}"; // ░
const BLOCK_READ: &str = "\u{2593}"; // ▓

fn cell(sector: &SectorInfo) -> (&'static str, &'static str) {
    match sector.flags.0 {
        0 if sector.warnings > 0 => (colors::BRIGHT_YELLOW, BLOCK_READ),
        0 => (colors::BRIGHT_WHITE, BLOCK_READ),
        ErrorFlags::NOT_FOUND => (colors::DARK_RED, BLOCK_MISSING),
        _ => (colors::BRIGHT_RED, BLOCK_READ),
    }
}

/// Render the map: one column per recorded track, one row per sector
///
/// Sector 0 is the bottom row. The axis below names every fifth column
/// with its physical track number.
pub fn render_sector_map(info: &DiskInfo) -> String {
    let tracks: Vec<usize> = info.tracks().collect();
    let max_sectors = tracks
        .iter()
        .filter_map(|&t| info.sectors(t))
        .map(<[SectorInfo]>::len)
        .max()
        .unwrap_or(0);
    if max_sectors == 0 {
        return "No sectors recorded.\n".to_string();
    }

    let mut out = String::new();
    out.push_str("=== Sector Map ===\n");
    out.push_str(&format!(
        "Legend: {}Good{} {}Weak{} {}Bad{} {}Not found{}\n\n",
        colors::BRIGHT_WHITE,
        colors::RESET,
        colors::BRIGHT_YELLOW,
        colors::RESET,
        colors::BRIGHT_RED,
        colors::RESET,
        colors::DARK_RED,
        colors::RESET
    ));

    for number in (0..max_sectors).rev() {
        out.push_str(&format!("{:>2} ", number));
        for &track in &tracks {
            match info.sectors(track).and_then(|s| s.get(number)) {
                Some(sector) => {
                    let (color, block) = cell(sector);
                    out.push_str(color);
                    out.push_str(block);
                    out.push_str(colors::RESET);
                }
                None => out.push(' '),
            }
        }
        out.push('\n');
    }

    // labels may run into the following columns
    out.push_str("   ");
    let mut axis = vec![' '; tracks.len()];
    for col in (0..tracks.len()).step_by(5) {
        for (i, digit) in tracks[col].to_string().chars().enumerate() {
            match axis.get_mut(col + i) {
                Some(slot) => *slot = digit,
                None => axis.push(digit),
            }
        }
    }
    out.extend(axis);
    out.push('\n');
    out
}

/// Print the sector map to stdout
pub fn draw_sector_map(info: &DiskInfo) {
    print!("{}", render_sector_map(info));
}
