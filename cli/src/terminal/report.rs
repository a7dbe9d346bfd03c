//! # Scan Report
//!
//! Renders a finished [`ScanResult`] as the terminal summary: resolution and
//! classification as a tree, one aligned line per permission probe, then the
//! listed objects as a table.

use bucketscout_common::model::instance::ClassifiedInstance;
use bucketscout_common::model::probe::{Listing, Outcome, OutcomeStatus, TransferSummary};
use bucketscout_common::model::scan::ScanResult;
use colored::*;
use unicode_width::UnicodeWidthStr;

use crate::bprint;
use crate::terminal::colors;
use crate::terminal::print::{self, GLOBAL_KEY_WIDTH};

type Detail = (String, ColoredString);

const PROBE_KEY_WIDTH: usize = 8;
const MAX_KEY_COLUMN: usize = 44;

pub fn render(result: &ScanResult, q_level: u8) {
    print::header("scan report", q_level);
    print::tree_head(0, result.target().host());
    print::as_tree_one_level(host_details(result));

    match result.skip_reason() {
        Some(reason) => {
            bprint!();
            print::print_status(format!(
                "Permission probes skipped: {}",
                reason.to_string().color(colors::ACCENT)
            ));
        }
        None => render_probes(result, q_level),
    }

    print::fat_separator();
    print::centerln(&verdict(result));
    print::end_of_program();
}

fn host_details(result: &ScanResult) -> Vec<Detail> {
    let resolved = result.resolved();
    let address = resolved.ip_address;
    let address_color = if address.is_ipv4() {
        colors::IPV4_ADDR
    } else {
        colors::IPV6_ADDR
    };

    let reverse = match &resolved.reverse_name {
        Some(name) => name.color(colors::HOSTNAME),
        None => "no PTR record".color(colors::NOT_ATTEMPTED),
    };

    let mut details: Vec<Detail> = vec![
        ("Address".to_string(), address.to_string().color(address_color)),
        ("PTR".to_string(), reverse),
        ("Type".to_string(), instance_label(result.instance()).normal()),
    ];
    if let Some(region) = result.instance().region() {
        details.push(("Region".to_string(), region.color(colors::REGION)));
    }
    details
}

pub fn instance_label(instance: &ClassifiedInstance) -> String {
    if instance.is_known() {
        instance.instance_type().to_string()
    } else {
        "unknown (not a recognised endpoint)".to_string()
    }
}

fn render_probes(result: &ScanResult, q_level: u8) {
    let probes = result.probes();
    bprint!();
    print::header("anonymous permissions", q_level);
    GLOBAL_KEY_WIDTH.set(PROBE_KEY_WIDTH);

    print::aligned_line("Upload", outcome_line(&probes.upload, transfer_detail));
    print::aligned_line("Listing", outcome_line(&probes.listing, listing_detail));
    print::aligned_line("Download", outcome_line(&probes.download, transfer_detail));

    if let Some(failure) = probes.download.failure() {
        for object in &failure.objects {
            print::print_status(format!(
                "  {} {}",
                object.key.color(colors::FAILED),
                format!("({})", object.reason).color(colors::SEPARATOR)
            ));
        }
    }

    if let Some(listing) = probes.listing.succeeded()
        && !listing.objects.is_empty()
        && q_level < 2
    {
        bprint!();
        print::header("bucket contents", q_level);
        for row in listing_table(listing) {
            print::print(&row);
        }
    }
}

pub fn outcome_label<T>(outcome: &Outcome<T>, detail: fn(&T) -> String) -> String {
    match outcome {
        Outcome::NotAttempted => "not attempted".to_string(),
        Outcome::Succeeded(value) => format!("ALLOWED ({})", detail(value)),
        Outcome::Denied => "denied".to_string(),
        Outcome::Failed(failure) => format!("failed: {failure}"),
    }
}

fn outcome_line<T>(outcome: &Outcome<T>, detail: fn(&T) -> String) -> ColoredString {
    let label = outcome_label(outcome, detail);
    match outcome.status() {
        OutcomeStatus::Succeeded => label.color(colors::ALLOWED).bold(),
        OutcomeStatus::Denied => label.color(colors::DENIED),
        OutcomeStatus::Failed => label.color(colors::FAILED),
        OutcomeStatus::NotAttempted => label.color(colors::NOT_ATTEMPTED),
    }
}

fn listing_detail(listing: &Listing) -> String {
    let truncated = if listing.truncated {
        ", first page only"
    } else {
        ""
    };
    format!("{} objects{truncated}", listing.objects.len())
}

fn transfer_detail(summary: &TransferSummary) -> String {
    let skipped = if summary.skipped > 0 {
        format!(", {} skipped", summary.skipped)
    } else {
        String::new()
    };
    format!(
        "{} objects, {}{skipped}",
        summary.objects,
        human_size(summary.bytes)
    )
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Key, size and last-modified columns. Long keys keep their tail, which is
/// usually the file name.
pub fn listing_table(listing: &Listing) -> Vec<String> {
    let keys: Vec<String> = listing
        .objects
        .iter()
        .map(|object| shorten(&object.key, MAX_KEY_COLUMN))
        .collect();
    let key_width = keys
        .iter()
        .map(|key| UnicodeWidthStr::width(key.as_str()))
        .max()
        .unwrap_or(0)
        .max(3);

    let mut rows = vec![format!(
        "{}{}  {:>10}  {}",
        "Key".color(colors::PRIMARY),
        " ".repeat(key_width - 3),
        "Size".color(colors::PRIMARY),
        "Last modified".color(colors::PRIMARY)
    )];

    for (object, key) in listing.objects.iter().zip(keys) {
        let pad = " ".repeat(key_width - UnicodeWidthStr::width(key.as_str()));
        let modified = object
            .last_modified
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        rows.push(format!(
            "{}{pad}  {:>10}  {}",
            key.color(colors::TEXT_DEFAULT),
            human_size(object.size),
            modified.color(colors::SEPARATOR)
        ));
    }
    rows
}

fn shorten(key: &str, max: usize) -> String {
    let count = key.chars().count();
    if count <= max {
        return key.to_string();
    }
    let tail: String = key.chars().skip(count - (max - 1)).collect();
    format!("…{tail}")
}

fn verdict(result: &ScanResult) -> String {
    if result.probes().exposed() {
        format!(
            "{}",
            "Anonymous access is ALLOWED on this bucket".color(colors::ALLOWED).bold()
        )
    } else if result.was_probed() {
        format!(
            "{}",
            "No anonymous access was granted".color(colors::DENIED)
        )
    } else {
        format!(
            "{}",
            "Target was not probed".color(colors::TEXT_DEFAULT)
        )
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
